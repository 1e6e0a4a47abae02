// Copyright The FabSim Authors
// SPDX-License-Identifier: Apache-2.0

//! Entry point of the compute-fabric simulator.
//!
//! Loads a scenario configuration, builds the entity graph, runs the
//! load balancer when enabled and drives the simulation to its horizon.
//! Exits zero on a completed horizon, non-zero on malformed configuration
//! or placement infeasibility.

use clap::Parser;
use fabsim_config::SimulationScenario;
use fabsim_controller::SimulationRunner;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "fabsim", version, about = "Discrete-event simulator of a containerized compute fabric")]
struct Cli {
    /// Path to the scenario configuration file (YAML or JSON).
    #[arg(long, value_name = "PATH")]
    config: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let scenario = match SimulationScenario::from_file(&cli.config) {
        Ok(scenario) => scenario,
        Err(fault) => {
            error!("{:?}", miette::Report::new(fault));
            return ExitCode::FAILURE;
        }
    };

    let mut runner = SimulationRunner::new(scenario);
    if let Err(fault) = runner.setup() {
        error!("{fault}");
        return ExitCode::FAILURE;
    }
    match runner.run() {
        Ok(_) => ExitCode::SUCCESS,
        Err(fault) => {
            error!("{fault}");
            ExitCode::FAILURE
        }
    }
}
