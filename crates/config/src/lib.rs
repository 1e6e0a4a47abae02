// Copyright The FabSim Authors
// SPDX-License-Identifier: Apache-2.0

//! Scenario configuration for the compute-fabric simulator.
//!
//! Data model:
//! - scenario
//!   - simulation settings (horizon, optional PRNG seed)
//!   - data center
//!     - nodes
//!       - containers
//!         - initial workloads
//!   - optional load-balancer block (strategy, targets, workload batch)
//!
//! Documents are YAML or JSON, detected by file extension. Parsed
//! scenarios are validated before use; see [`SimulationScenario::validate`].

pub mod error;
pub mod scenario;

pub use error::Error;
pub use scenario::{
    ContainerConfig, DataCenterConfig, LoadBalancerConfig, LoadBalancerKind, NodeConfig,
    SimulationScenario, SimulationSettings, WorkloadConfig,
};
