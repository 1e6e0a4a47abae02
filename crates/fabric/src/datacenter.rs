// Copyright The FabSim Authors
// SPDX-License-Identifier: Apache-2.0

//! Data centers: passive, named collections of nodes.

use crate::node::NodeHandle;
use crate::resources::ResourceSpec;
use fabsim_engine::EngineContext;
use std::fmt;

/// A named, ordered collection of nodes. Pure aggregate with no per-tick
/// behavior of its own.
#[derive(Debug)]
pub struct DataCenter {
    id: u64,
    name: String,
    nodes: Vec<NodeHandle>,
}

impl DataCenter {
    /// Creates a data center, drawing its id from the engine context.
    pub fn new(ctx: &mut EngineContext, name: impl Into<String>, nodes: Vec<NodeHandle>) -> Self {
        Self {
            id: ctx.next_datacenter_id(),
            name: name.into(),
            nodes,
        }
    }

    /// The data-center id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// The data-center name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The nodes of this data center, in assignment order.
    #[must_use]
    pub fn nodes(&self) -> &[NodeHandle] {
        &self.nodes
    }

    /// Appends nodes to the data center.
    pub fn add_nodes(&mut self, nodes: Vec<NodeHandle>) {
        self.nodes.extend(nodes);
    }

    /// Captures the observation summary of the whole data center.
    #[must_use]
    pub fn summary(&self) -> DataCenterSummary {
        let nodes = self
            .nodes
            .iter()
            .map(|node| {
                let node = node.borrow();
                let containers = node
                    .containers()
                    .iter()
                    .map(|container| {
                        let container = container.borrow();
                        ContainerSummary {
                            name: container.name().to_owned(),
                            capacity: *container.capacity(),
                        }
                    })
                    .collect();
                NodeSummary {
                    name: node.name().to_owned(),
                    capacity: *node.capacity(),
                    available: ResourceSpec {
                        cpu: node.available_cpu(),
                        ram: node.available_ram(),
                        disk: node.available_disk(),
                        bw: node.available_bw(),
                    },
                    containers,
                }
            })
            .collect();
        DataCenterSummary {
            name: self.name.clone(),
            nodes,
        }
    }
}

/// Observation summary of one container.
#[derive(Debug, Clone)]
pub struct ContainerSummary {
    /// Container name.
    pub name: String,
    /// Declared base capacities.
    pub capacity: ResourceSpec,
}

/// Observation summary of one node.
#[derive(Debug, Clone)]
pub struct NodeSummary {
    /// Node name.
    pub name: String,
    /// Declared base capacities.
    pub capacity: ResourceSpec,
    /// Current availability per dimension.
    pub available: ResourceSpec,
    /// Hosted containers.
    pub containers: Vec<ContainerSummary>,
}

/// Observation summary of a data center, renderable as a report.
#[derive(Debug, Clone)]
pub struct DataCenterSummary {
    /// Data-center name.
    pub name: String,
    /// Per-node summaries.
    pub nodes: Vec<NodeSummary>,
}

impl fmt::Display for DataCenterSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "=".repeat(50))?;
        writeln!(f, "{:=^50}", format!(" Datacenter: {} ", self.name.to_uppercase()))?;
        writeln!(f, "{}", "=".repeat(50))?;
        writeln!(f, "Total nodes: {}", self.nodes.len())?;
        for node in &self.nodes {
            writeln!(f)?;
            writeln!(f, "{:-^50}", format!(" Node: {} ", node.name))?;
            writeln!(
                f,
                " CPU: {} cores | Available CPU: {:.2}",
                node.capacity.cpu, node.available.cpu
            )?;
            writeln!(
                f,
                " RAM: {} MB | Available RAM: {} MB",
                node.capacity.ram, node.available.ram
            )?;
            writeln!(
                f,
                " Disk: {} MB | Available Disk: {} MB",
                node.capacity.disk, node.available.disk
            )?;
            writeln!(
                f,
                " BW: {} Mbps | Available BW: {} Mbps",
                node.capacity.bw, node.available.bw
            )?;
            if node.containers.is_empty() {
                writeln!(f, "   No containers assigned.")?;
            } else {
                writeln!(f, "   Containers:")?;
                for container in &node.containers {
                    writeln!(
                        f,
                        "   - {:<15} | CPU: {:<4} | RAM: {} MB | Disk: {} MB | BW: {} Mbps",
                        container.name,
                        container.capacity.cpu,
                        container.capacity.ram,
                        container.capacity.disk,
                        container.capacity.bw
                    )?;
                }
            }
        }
        writeln!(f, "{}", "=".repeat(50))
    }
}
