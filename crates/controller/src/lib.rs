// Copyright The FabSim Authors
// SPDX-License-Identifier: Apache-2.0

//! Orchestration: from a parsed scenario to a finished simulation run.
//!
//! The runner builds the entity graph against the engine context (ids and
//! jitter sampling stay engine-scoped), admits the initial workloads,
//! wires the load balancer when enabled, runs to the configured horizon
//! and renders the data-center summary.

pub mod error;

pub use error::Error;

use fabsim_config::{
    ContainerConfig, LoadBalancerKind, NodeConfig, SimulationScenario, WorkloadConfig,
};
use fabsim_fabric::container::{Container, ContainerHandle, ContainerSpec};
use fabsim_fabric::datacenter::{DataCenter, DataCenterSummary};
use fabsim_fabric::node::{Node, NodeSpec};
use fabsim_fabric::placer::{Assignment, FirstFitPlacer};
use fabsim_fabric::resources::JitterSpec;
use fabsim_fabric::simulation::Simulation;
use fabsim_fabric::workload::{Workload, WorkloadSpec};
use tracing::info;

/// Sets up and drives one simulation run from a parsed scenario.
pub struct SimulationRunner {
    scenario: SimulationScenario,
    simulation: Simulation,
    assignments: Vec<Assignment>,
}

impl SimulationRunner {
    /// Creates a runner; the engine PRNG is seeded from the scenario.
    #[must_use]
    pub fn new(scenario: SimulationScenario) -> Self {
        let simulation = Simulation::new(scenario.simulation.seed);
        Self {
            scenario,
            simulation,
            assignments: Vec::new(),
        }
    }

    /// The underlying simulation.
    #[must_use]
    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// The load-balancer assignments made during setup.
    #[must_use]
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// Builds the data center, admits initial workloads and runs the load
    /// balancer when enabled.
    pub fn setup(&mut self) -> Result<(), Error> {
        let mut all_containers: Vec<ContainerHandle> = Vec::new();
        let mut nodes = Vec::with_capacity(self.scenario.datacenter.nodes.len());
        for node_config in &self.scenario.datacenter.nodes {
            let ctx = self.simulation.context_mut();
            let mut containers = Vec::with_capacity(node_config.containers.len());
            for container_config in &node_config.containers {
                let container =
                    Container::new_handle(ctx, container_spec_from(container_config));
                for workload_config in &container_config.workloads {
                    let workload = Workload::new(ctx, workload_spec_from(workload_config));
                    let now = ctx.now();
                    container.borrow_mut().add_workload(workload, now);
                }
                containers.push(container);
            }
            let node = Node::new_handle(ctx, node_spec_from(node_config));
            node.borrow_mut().set_containers(containers.clone());
            all_containers.extend(containers);
            nodes.push(node);
        }
        let name = self.scenario.datacenter.name.clone();
        let datacenter = DataCenter::new(self.simulation.context_mut(), name, nodes);
        self.simulation.attach_datacenter(datacenter);

        if let Some(balancer) = &self.scenario.load_balancer {
            if balancer.enabled {
                // Candidate order follows the data center's container
                // order, filtered to the configured targets.
                for target in &balancer.target_containers {
                    if !all_containers.iter().any(|c| c.borrow().name() == target) {
                        return Err(Error::Config(
                            fabsim_config::Error::UnknownTargetContainer {
                                name: target.clone(),
                            },
                        ));
                    }
                }
                let targets: Vec<ContainerHandle> = all_containers
                    .iter()
                    .filter(|c| {
                        let name = c.borrow().name().to_owned();
                        balancer.target_containers.contains(&name)
                    })
                    .cloned()
                    .collect();
                let batch: Vec<Workload> = {
                    let ctx = self.simulation.context_mut();
                    balancer
                        .workloads
                        .iter()
                        .map(|w| Workload::new(ctx, workload_spec_from(w)))
                        .collect()
                };
                let placer = match balancer.kind {
                    LoadBalancerKind::FirstFitReservations => {
                        FirstFitPlacer::new(balancer.reservation_enabled.unwrap_or(true))
                    }
                };
                info!(
                    workloads = batch.len(),
                    targets = targets.len(),
                    reservations = placer.uses_reservations(),
                    "running load balancer"
                );
                self.assignments =
                    placer.place(self.simulation.context_mut(), batch, &targets)?;
            }
        }
        Ok(())
    }

    /// Runs the simulation to the configured horizon and returns the
    /// final data-center summary.
    pub fn run(&mut self) -> Result<DataCenterSummary, Error> {
        self.simulation.run(self.scenario.simulation.duration as f64)?;
        let summary = self.simulation.summary()?;
        info!("{summary}");
        Ok(summary)
    }
}

fn jitter_from(cpu: f64, ram: f64, disk: f64, bw: f64) -> JitterSpec {
    JitterSpec {
        cpu,
        ram,
        disk,
        bw,
    }
}

fn workload_spec_from(config: &WorkloadConfig) -> WorkloadSpec {
    WorkloadSpec {
        cpu: config.cpu,
        ram: config.ram,
        disk: config.disk,
        bw: config.bandwidth,
        delay: config.delay,
        duration: config.duration,
        jitter: jitter_from(
            config.cpu_jitter_percent,
            config.ram_jitter_percent,
            config.disk_jitter_percent,
            config.bandwidth_jitter_percent,
        ),
        priority: config.priority,
        workload_type: config.workload_type.clone(),
    }
}

fn container_spec_from(config: &ContainerConfig) -> ContainerSpec {
    ContainerSpec {
        name: config.name.clone(),
        cpu: config.cpu,
        ram: config.ram,
        disk: config.disk,
        bw: config.bandwidth,
        start_up_delay: config.start_up_delay,
        jitter: jitter_from(
            config.cpu_jitter_percent,
            config.ram_jitter_percent,
            config.disk_jitter_percent,
            config.bandwidth_jitter_percent,
        ),
    }
}

fn node_spec_from(config: &NodeConfig) -> NodeSpec {
    NodeSpec {
        name: config.name.clone(),
        cpu: config.cpu,
        ram: config.ram,
        disk: config.disk,
        bw: config.bandwidth,
        start_up_delay: config.start_up_delay,
        jitter: jitter_from(
            config.cpu_jitter_percent,
            config.ram_jitter_percent,
            config.disk_jitter_percent,
            config.bandwidth_jitter_percent,
        ),
        stop_lack_of_resource: config.stop_lack_of_resource,
    }
}
