// Copyright The FabSim Authors
// SPDX-License-Identifier: Apache-2.0

//! Entities and placement logic of the compute-fabric simulator.
//!
//! Data model:
//! - data center
//!   - nodes
//!     - containers
//!       - workloads
//!
//! Workloads are time-bounded four-dimensional demands (CPU cores, RAM MB,
//! disk MB, network bandwidth Mbps) admitted to containers. Containers
//! accumulate the demands of their active workloads plus random jitter;
//! nodes aggregate container usage, advertise a jittered availability
//! envelope and enforce capacity. A first-fit load balancer with optional
//! forward reservations assigns workload batches to containers.
//!
//! All per-tick behavior is expressed as [`fabsim_engine`] processes; the
//! [`simulation::Simulation`] driver wires a data center to the engine and
//! runs it to a virtual-time horizon.

pub mod container;
pub mod datacenter;
pub mod error;
pub mod history;
pub mod node;
pub mod placer;
pub mod resources;
pub mod runtime;
pub mod simulation;
pub mod units;
pub mod workload;

pub use container::{Container, ContainerHandle, ContainerId, ContainerSpec};
pub use datacenter::{DataCenter, DataCenterSummary};
pub use error::Error;
pub use node::{Node, NodeHandle, NodeId, NodeSpec};
pub use placer::{Assignment, FirstFitPlacer};
pub use resources::{Dimension, JitterSpec, ResourceSpec, ResourceUsage};
pub use simulation::Simulation;
pub use workload::{Workload, WorkloadId, WorkloadSpec};
