// Copyright The FabSim Authors
// SPDX-License-Identifier: Apache-2.0

//! The scenario document model and its I/O entry points.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration for one simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationScenario {
    /// Engine-level settings.
    pub simulation: SimulationSettings,
    /// The data center to simulate.
    pub datacenter: DataCenterConfig,
    /// Optional load-balancer block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancer: Option<LoadBalancerConfig>,
}

/// Engine-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationSettings {
    /// Virtual-time horizon of the run.
    pub duration: u64,
    /// PRNG seed; absent means OS entropy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// A data center with its nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataCenterConfig {
    /// Data-center name.
    pub name: String,
    /// Member nodes.
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
}

/// One compute host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    /// Node name.
    pub name: String,
    /// CPU capacity in cores.
    pub cpu: f64,
    /// RAM capacity in MB.
    pub ram: i64,
    /// Disk capacity in MB.
    pub disk: i64,
    /// Bandwidth capacity in Mbps.
    pub bandwidth: i64,
    /// Startup delay in virtual-time units.
    #[serde(default = "default_node_start_up_delay")]
    pub start_up_delay: f64,
    /// CPU jitter percentage in `[0, 100]`.
    #[serde(default)]
    pub cpu_jitter_percent: f64,
    /// RAM jitter percentage in `[0, 100]`.
    #[serde(default)]
    pub ram_jitter_percent: f64,
    /// Disk jitter percentage in `[0, 100]`.
    #[serde(default)]
    pub disk_jitter_percent: f64,
    /// Bandwidth jitter percentage in `[0, 100]`.
    #[serde(default)]
    pub bandwidth_jitter_percent: f64,
    /// Whether capacity exhaustion halts the node.
    #[serde(default)]
    pub stop_lack_of_resource: bool,
    /// Hosted containers.
    #[serde(default)]
    pub containers: Vec<ContainerConfig>,
}

/// One container hosted on a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerConfig {
    /// Container name.
    pub name: String,
    /// CPU capacity in cores.
    pub cpu: f64,
    /// RAM capacity in MB.
    pub ram: i64,
    /// Disk capacity in MB.
    pub disk: i64,
    /// Bandwidth capacity in Mbps.
    pub bandwidth: i64,
    /// Startup delay in virtual-time units.
    #[serde(default = "default_container_start_up_delay")]
    pub start_up_delay: f64,
    /// CPU jitter percentage in `[0, 100]`.
    #[serde(default)]
    pub cpu_jitter_percent: f64,
    /// RAM jitter percentage in `[0, 100]`.
    #[serde(default)]
    pub ram_jitter_percent: f64,
    /// Disk jitter percentage in `[0, 100]`.
    #[serde(default)]
    pub disk_jitter_percent: f64,
    /// Bandwidth jitter percentage in `[0, 100]`.
    #[serde(default)]
    pub bandwidth_jitter_percent: f64,
    /// Workloads admitted to this container at simulation start.
    #[serde(default)]
    pub workloads: Vec<WorkloadConfig>,
}

/// One workload demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkloadConfig {
    /// Base CPU demand in cores.
    pub cpu: f64,
    /// Base RAM demand in MB.
    pub ram: i64,
    /// Base disk demand in MB.
    pub disk: i64,
    /// Base bandwidth demand in Mbps.
    pub bandwidth: i64,
    /// Offset from admission until activation.
    pub delay: f64,
    /// Length of the active interval.
    pub duration: f64,
    /// CPU jitter percentage in `[0, 100]`.
    #[serde(default)]
    pub cpu_jitter_percent: f64,
    /// RAM jitter percentage in `[0, 100]`.
    #[serde(default)]
    pub ram_jitter_percent: f64,
    /// Disk jitter percentage in `[0, 100]`.
    #[serde(default)]
    pub disk_jitter_percent: f64,
    /// Bandwidth jitter percentage in `[0, 100]`.
    #[serde(default)]
    pub bandwidth_jitter_percent: f64,
    /// Priority level, opaque to the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    /// Type label, opaque to the engine.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub workload_type: Option<String>,
}

/// Recognized load-balancer strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadBalancerKind {
    /// First-fit placement with forward capacity reservations.
    FirstFitReservations,
}

/// The load-balancer block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadBalancerConfig {
    /// Whether the load balancer runs before the simulation.
    pub enabled: bool,
    /// The placement strategy.
    #[serde(rename = "type")]
    pub kind: LoadBalancerKind,
    /// Whether time-indexed reservations are used; defaults to `true`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_enabled: Option<bool>,
    /// Names of the candidate containers, in first-fit order.
    #[serde(default)]
    pub target_containers: Vec<String>,
    /// The workload batch to place.
    #[serde(default)]
    pub workloads: Vec<WorkloadConfig>,
}

const fn default_node_start_up_delay() -> f64 {
    0.5
}

const fn default_container_start_up_delay() -> f64 {
    0.9
}

impl SimulationScenario {
    /// Creates a scenario from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let scenario: SimulationScenario =
            serde_json::from_str(json).map_err(|e| Error::DeserializationError {
                format: "JSON".to_string(),
                details: e.to_string(),
            })?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Creates a scenario from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, Error> {
        let scenario: SimulationScenario =
            serde_yaml::from_str(yaml).map_err(|e| Error::DeserializationError {
                format: "YAML".to_string(),
                details: e.to_string(),
            })?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Loads a scenario from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::FileReadError {
            details: e.to_string(),
        })?;
        Self::from_json(&contents)
    }

    /// Loads a scenario from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::FileReadError {
            details: e.to_string(),
        })?;
        Self::from_yaml(&contents)
    }

    /// Loads a scenario from a file, detecting the format from the
    /// extension.
    ///
    /// Supports:
    /// - JSON files: `.json`
    /// - YAML files: `.yaml`, `.yml`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());

        match extension.as_deref() {
            Some("json") => Self::from_json_file(path),
            Some("yaml") | Some("yml") => Self::from_yaml_file(path),
            _ => {
                let details = format!(
                    "Unsupported file extension: {}. Supported extensions are: .json, .yaml, .yml",
                    extension.unwrap_or_else(|| "<none>".to_string())
                );
                Err(Error::FileReadError { details })
            }
        }
    }

    /// Checks every validity rule of the document.
    ///
    /// Violations are collected so a single pass reports all of them.
    pub fn validate(&self) -> Result<(), Error> {
        let mut violations = Vec::new();

        if self.simulation.duration == 0 {
            violations.push("simulation.duration must be positive".to_string());
        }
        for node in &self.datacenter.nodes {
            let prefix = format!("node `{}`", node.name);
            check_magnitudes(
                &mut violations,
                &prefix,
                node.cpu,
                node.ram,
                node.disk,
                node.bandwidth,
            );
            check_delay(&mut violations, &prefix, node.start_up_delay);
            check_jitter(&mut violations, &prefix, "cpu", node.cpu_jitter_percent);
            check_jitter(&mut violations, &prefix, "ram", node.ram_jitter_percent);
            check_jitter(&mut violations, &prefix, "disk", node.disk_jitter_percent);
            check_jitter(
                &mut violations,
                &prefix,
                "bandwidth",
                node.bandwidth_jitter_percent,
            );
            for container in &node.containers {
                let prefix = format!("container `{}`", container.name);
                check_magnitudes(
                    &mut violations,
                    &prefix,
                    container.cpu,
                    container.ram,
                    container.disk,
                    container.bandwidth,
                );
                check_delay(&mut violations, &prefix, container.start_up_delay);
                check_jitter(&mut violations, &prefix, "cpu", container.cpu_jitter_percent);
                check_jitter(&mut violations, &prefix, "ram", container.ram_jitter_percent);
                check_jitter(
                    &mut violations,
                    &prefix,
                    "disk",
                    container.disk_jitter_percent,
                );
                check_jitter(
                    &mut violations,
                    &prefix,
                    "bandwidth",
                    container.bandwidth_jitter_percent,
                );
                for (index, workload) in container.workloads.iter().enumerate() {
                    let prefix = format!("container `{}` workload #{index}", container.name);
                    check_workload(&mut violations, &prefix, workload);
                }
            }
        }
        if let Some(balancer) = &self.load_balancer {
            if balancer.enabled {
                if balancer.target_containers.is_empty() {
                    violations
                        .push("load_balancer.target_containers must not be empty".to_string());
                }
                let known: Vec<&str> = self
                    .datacenter
                    .nodes
                    .iter()
                    .flat_map(|n| n.containers.iter())
                    .map(|c| c.name.as_str())
                    .collect();
                for target in &balancer.target_containers {
                    if !known.contains(&target.as_str()) {
                        violations.push(format!(
                            "load_balancer target `{target}` does not name a container"
                        ));
                    }
                }
            }
            for (index, workload) in balancer.workloads.iter().enumerate() {
                let prefix = format!("load_balancer workload #{index}");
                check_workload(&mut violations, &prefix, workload);
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidConfiguration { violations })
        }
    }
}

fn check_magnitudes(
    violations: &mut Vec<String>,
    prefix: &str,
    cpu: f64,
    ram: i64,
    disk: i64,
    bandwidth: i64,
) {
    if cpu < 0.0 {
        violations.push(format!("{prefix}: cpu must be non-negative"));
    }
    if ram < 0 {
        violations.push(format!("{prefix}: ram must be non-negative"));
    }
    if disk < 0 {
        violations.push(format!("{prefix}: disk must be non-negative"));
    }
    if bandwidth < 0 {
        violations.push(format!("{prefix}: bandwidth must be non-negative"));
    }
}

fn check_delay(violations: &mut Vec<String>, prefix: &str, delay: f64) {
    if delay < 0.0 {
        violations.push(format!("{prefix}: start_up_delay must be non-negative"));
    }
}

fn check_jitter(violations: &mut Vec<String>, prefix: &str, dimension: &str, pct: f64) {
    if !(0.0..=100.0).contains(&pct) {
        violations.push(format!(
            "{prefix}: {dimension} jitter percentage {pct} outside [0, 100]"
        ));
    }
}

fn check_workload(violations: &mut Vec<String>, prefix: &str, workload: &WorkloadConfig) {
    check_magnitudes(
        violations,
        prefix,
        workload.cpu,
        workload.ram,
        workload.disk,
        workload.bandwidth,
    );
    if workload.delay < 0.0 {
        violations.push(format!("{prefix}: delay must be non-negative"));
    }
    if workload.duration <= 0.0 {
        violations.push(format!("{prefix}: duration must be positive"));
    }
    check_jitter(violations, prefix, "cpu", workload.cpu_jitter_percent);
    check_jitter(violations, prefix, "ram", workload.ram_jitter_percent);
    check_jitter(violations, prefix, "disk", workload.disk_jitter_percent);
    check_jitter(
        violations,
        prefix,
        "bandwidth",
        workload.bandwidth_jitter_percent,
    );
}
