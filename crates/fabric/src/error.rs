// Copyright The FabSim Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors surfaced by the fabric.
//!
//! Capacity exhaustion is scoped to the node that observed it and only
//! escapes as a logged diagnostic when the node is configured to keep
//! running; placement and misconfiguration faults propagate synchronously
//! out of the orchestrating call.

use crate::resources::Dimension;
use fabsim_engine::SimTime;

/// All errors that can occur while placing workloads or driving a
/// simulation run.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// No candidate container can accommodate a workload; the whole
    /// placement batch is aborted.
    #[error("no suitable container found for '{workload_type}' workload at time {delay}")]
    PlacementInfeasible {
        /// The type label of the workload that could not be placed.
        workload_type: String,
        /// The workload's activation delay, identifying it in the batch.
        delay: SimTime,
    },

    /// Aggregate container demand exceeded a node's advertised
    /// availability for at least one dimension.
    #[error(
        "[{time}] node '{node}' out of {dimension}: required {required:.2}, available {available:.2}"
    )]
    CapacityExhausted {
        /// Virtual time of the monitor tick that observed the violation.
        time: SimTime,
        /// Name of the node that ran out of resources.
        node: String,
        /// The violated dimension.
        dimension: Dimension,
        /// Aggregate demand observed on the node.
        required: f64,
        /// Advertised availability at the same tick.
        available: f64,
    },

    /// `run` was invoked on a simulation without a data center attached.
    #[error("data center is not defined")]
    DataCenterNotAttached,
}
