// Copyright The FabSim Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors for the controller crate.

/// Errors that can occur while building or running a scenario.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A wrapper for configuration errors.
    #[error("A configuration error occurred: {0}")]
    Config(#[from] fabsim_config::Error),

    /// A wrapper for simulation errors (placement infeasibility,
    /// misconfigured runs).
    #[error("A simulation error occurred: {0}")]
    Simulation(#[from] fabsim_fabric::Error),
}
