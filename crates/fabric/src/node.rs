// Copyright The FabSim Authors
// SPDX-License-Identifier: Apache-2.0

//! Nodes: container aggregation, availability envelope and capacity
//! enforcement.

use crate::container::ContainerHandle;
use crate::error::Error;
use crate::history::NodeHistory;
use crate::resources::{
    JitterSpec, ResourceSpec, ResourceUsage, uniform_delta_int, uniform_delta_real,
};
use fabsim_engine::{EngineContext, SimTime};
use rand::Rng;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, error};

/// Unique node identifier, monotone in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared handle to a node.
pub type NodeHandle = Rc<RefCell<Node>>;

/// Plain value struct describing a node to be created.
#[derive(Debug, Clone, Default)]
pub struct NodeSpec {
    /// Node name.
    pub name: String,
    /// CPU capacity in cores.
    pub cpu: f64,
    /// RAM capacity in MB.
    pub ram: i64,
    /// Disk capacity in MB.
    pub disk: i64,
    /// Bandwidth capacity in Mbps.
    pub bw: i64,
    /// Startup delay before the node activates.
    pub start_up_delay: SimTime,
    /// Per-dimension jitter percentages applied to the availability
    /// envelope.
    pub jitter: JitterSpec,
    /// Whether capacity exhaustion halts the node.
    pub stop_lack_of_resource: bool,
}

/// A compute host aggregating containers.
///
/// Base capacity is immutable; the per-tick jittered *envelope* (the
/// advertised upper bound of availability) lives in the history buffers.
/// The monitor records usage and envelope every two time units and halts
/// the node on exhaustion when so configured.
#[derive(Debug)]
pub struct Node {
    id: NodeId,
    name: String,
    capacity: ResourceSpec,
    jitter: JitterSpec,
    start_up_delay: SimTime,
    containers: Vec<ContainerHandle>,
    running: bool,
    halted: bool,
    stop_lack_of_resource: bool,
    history: NodeHistory,
}

impl Node {
    /// Creates a node, drawing its id from the engine context.
    pub fn new(ctx: &mut EngineContext, spec: NodeSpec) -> Self {
        Self {
            id: NodeId(ctx.next_node_id()),
            name: spec.name,
            capacity: ResourceSpec {
                cpu: spec.cpu,
                ram: spec.ram,
                disk: spec.disk,
                bw: spec.bw,
            },
            jitter: spec.jitter,
            start_up_delay: spec.start_up_delay,
            containers: Vec::new(),
            running: false,
            halted: false,
            stop_lack_of_resource: spec.stop_lack_of_resource,
            history: NodeHistory::default(),
        }
    }

    /// Creates a node wrapped in a shared handle.
    pub fn new_handle(ctx: &mut EngineContext, spec: NodeSpec) -> NodeHandle {
        Rc::new(RefCell::new(Self::new(ctx, spec)))
    }

    /// The node id.
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// The node name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared base capacities.
    #[must_use]
    pub const fn capacity(&self) -> &ResourceSpec {
        &self.capacity
    }

    /// Startup delay before the node activates.
    #[must_use]
    pub const fn start_up_delay(&self) -> SimTime {
        self.start_up_delay
    }

    /// Whether the node is running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Whether the node was irreversibly halted by capacity exhaustion.
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        self.halted
    }

    /// Whether capacity exhaustion halts this node.
    #[must_use]
    pub const fn stops_on_lack_of_resource(&self) -> bool {
        self.stop_lack_of_resource
    }

    /// The containers hosted on this node.
    #[must_use]
    pub fn containers(&self) -> &[ContainerHandle] {
        &self.containers
    }

    /// Assigns the hosted containers.
    pub fn set_containers(&mut self, containers: Vec<ContainerHandle>) {
        self.containers = containers;
    }

    /// Recorded monitor history.
    #[must_use]
    pub const fn history(&self) -> &NodeHistory {
        &self.history
    }

    /// Sums the current usage of all hosted containers.
    #[must_use]
    pub fn total_usage(&self) -> ResourceUsage {
        let mut total = ResourceUsage::default();
        for container in &self.containers {
            total.add_usage(container.borrow().usage());
        }
        total
    }

    /// Samples a fresh availability envelope: per dimension
    /// `base + U(-base*pct/100, +base*pct/100)`, clamped to `[0, base]`.
    fn sample_envelope<R: Rng>(&self, rng: &mut R) -> ResourceSpec {
        ResourceSpec {
            cpu: (self.capacity.cpu + uniform_delta_real(rng, self.capacity.cpu, self.jitter.cpu))
                .clamp(0.0, self.capacity.cpu),
            ram: (self.capacity.ram + uniform_delta_int(rng, self.capacity.ram, self.jitter.ram))
                .clamp(0, self.capacity.ram),
            disk: (self.capacity.disk
                + uniform_delta_int(rng, self.capacity.disk, self.jitter.disk))
            .clamp(0, self.capacity.disk),
            bw: (self.capacity.bw + uniform_delta_int(rng, self.capacity.bw, self.jitter.bw))
                .clamp(0, self.capacity.bw),
        }
    }

    /// CPU availability: last envelope sample (base before the first
    /// monitor tick) minus summed container usage, clamped at zero.
    #[must_use]
    pub fn available_cpu(&self) -> f64 {
        let envelope = self.history.last_envelope().unwrap_or(self.capacity);
        (envelope.cpu - self.total_usage().cpu).max(0.0)
    }

    /// RAM availability in MB.
    #[must_use]
    pub fn available_ram(&self) -> i64 {
        let envelope = self.history.last_envelope().unwrap_or(self.capacity);
        (envelope.ram - self.total_usage().ram).max(0)
    }

    /// Disk availability in MB.
    #[must_use]
    pub fn available_disk(&self) -> i64 {
        let envelope = self.history.last_envelope().unwrap_or(self.capacity);
        (envelope.disk - self.total_usage().disk).max(0)
    }

    /// Bandwidth availability in Mbps.
    #[must_use]
    pub fn available_bw(&self) -> i64 {
        let envelope = self.history.last_envelope().unwrap_or(self.capacity);
        (envelope.bw - self.total_usage().bw).max(0)
    }

    /// Checks that current summed container demand fits the base capacity.
    ///
    /// Used once before startup; failure aborts the start process.
    pub fn precheck_resources(&self, now: SimTime) -> Result<(), Error> {
        match self.total_usage().exceeds(&self.capacity) {
            Some((dimension, required, available)) => Err(Error::CapacityExhausted {
                time: now,
                node: self.name.clone(),
                dimension,
                required,
                available,
            }),
            None => Ok(()),
        }
    }

    /// Marks the node running; called by its start process.
    pub(crate) fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    /// One monitor tick: sample the envelope, record used and available
    /// history, then verify summed usage against the envelope.
    ///
    /// Returns the capacity violation, if any; the caller decides whether
    /// the node halts or keeps running.
    pub fn monitor_tick(&mut self, ctx: &mut EngineContext) -> Result<(), Error> {
        let now = ctx.now();
        let envelope = self.sample_envelope(ctx.rng());
        let total = self.total_usage();
        self.history.record(&total, &envelope, now);
        debug!(
            node = %self.name,
            time = now,
            containers = self.containers.len(),
            cpu = total.cpu,
            ram = total.ram,
            disk = total.disk,
            bw = total.bw,
            "node monitor tick"
        );
        match total.exceeds(&envelope) {
            Some((dimension, required, available)) => Err(Error::CapacityExhausted {
                time: now,
                node: self.name.clone(),
                dimension,
                required,
                available,
            }),
            None => Ok(()),
        }
    }

    /// Irreversibly halts the node and stops all its containers.
    pub fn stop(&mut self, now: SimTime) {
        self.running = false;
        self.halted = true;
        error!(
            node = %self.name,
            time = now,
            "node shutting down due to insufficient resources"
        );
        for container in &self.containers {
            let mut container = container.borrow_mut();
            container.stop();
            error!(container = %container.name(), time = now, "container stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{Container, ContainerSpec};
    use crate::resources::Dimension;
    use crate::workload::{Workload, WorkloadSpec};
    use fabsim_engine::testing::set_now;

    fn node_spec(stop_lack_of_resource: bool) -> NodeSpec {
        NodeSpec {
            name: "node-1".to_owned(),
            cpu: 2.0,
            ram: 1024,
            disk: 1024,
            bw: 1000,
            start_up_delay: 0.5,
            jitter: JitterSpec::default(),
            stop_lack_of_resource,
        }
    }

    fn hosted_container(ctx: &mut EngineContext) -> ContainerHandle {
        Container::new_handle(
            ctx,
            ContainerSpec {
                name: "web-1".to_owned(),
                cpu: 2.0,
                ram: 1024,
                disk: 1024,
                bw: 1000,
                start_up_delay: 0.9,
                jitter: JitterSpec::default(),
            },
        )
    }

    #[test]
    fn monitor_records_aligned_history() {
        let mut ctx = EngineContext::new(Some(3));
        let container = hosted_container(&mut ctx);
        let mut node = Node::new(&mut ctx, node_spec(true));
        node.set_containers(vec![container]);
        node.set_running(true);
        for t in [0.0, 2.0, 4.0] {
            set_now(&mut ctx, t);
            node.monitor_tick(&mut ctx).expect("no violation");
        }
        assert_eq!(node.history().len(), 3);
        assert_eq!(node.history().time, vec![0.0, 2.0, 4.0]);
        // Zero jitter: the envelope equals the base capacity.
        assert_eq!(node.history().available.cpu, vec![2.0, 2.0, 2.0]);
        assert_eq!(node.history().used.cpu, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn monitor_reports_exhaustion_when_demand_exceeds_envelope() {
        let mut ctx = EngineContext::new(Some(3));
        let container = hosted_container(&mut ctx);
        {
            let mut c = container.borrow_mut();
            c.set_running(true);
            let big = Workload::new(
                &mut ctx,
                WorkloadSpec {
                    cpu: 2.0,
                    ram: 1024,
                    disk: 1024,
                    bw: 1000,
                    delay: 0.0,
                    duration: 5.0,
                    ..WorkloadSpec::default()
                },
            );
            let small = Workload::new(
                &mut ctx,
                WorkloadSpec {
                    cpu: 0.1,
                    ram: 1,
                    disk: 1,
                    bw: 1,
                    delay: 0.0,
                    duration: 5.0,
                    ..WorkloadSpec::default()
                },
            );
            c.add_workload(big, 0.0);
            c.add_workload(small, 0.0);
            set_now(&mut ctx, 1.0);
            c.tick(&mut ctx);
        }
        let mut node = Node::new(&mut ctx, node_spec(true));
        node.set_containers(vec![container]);
        node.set_running(true);
        set_now(&mut ctx, 2.0);
        let violation = node.monitor_tick(&mut ctx).expect_err("must exceed");
        match violation {
            Error::CapacityExhausted {
                dimension,
                required,
                available,
                ..
            } => {
                assert_eq!(dimension, Dimension::Cpu);
                assert_eq!(required, 2.1);
                assert_eq!(available, 2.0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn stop_halts_node_and_containers() {
        let mut ctx = EngineContext::new(Some(3));
        let container = hosted_container(&mut ctx);
        container.borrow_mut().set_running(true);
        let mut node = Node::new(&mut ctx, node_spec(true));
        node.set_containers(vec![container.clone()]);
        node.set_running(true);
        node.stop(4.0);
        assert!(!node.is_running());
        assert!(node.is_halted());
        assert!(!container.borrow().is_running());
    }

    #[test]
    fn availability_subtracts_usage_from_last_envelope() {
        let mut ctx = EngineContext::new(Some(3));
        let container = hosted_container(&mut ctx);
        {
            let mut c = container.borrow_mut();
            c.set_running(true);
            let workload = Workload::new(
                &mut ctx,
                WorkloadSpec {
                    cpu: 0.5,
                    ram: 256,
                    disk: 128,
                    bw: 100,
                    delay: 0.0,
                    duration: 9.0,
                    ..WorkloadSpec::default()
                },
            );
            c.add_workload(workload, 0.0);
            set_now(&mut ctx, 0.0);
            c.tick(&mut ctx);
        }
        let mut node = Node::new(&mut ctx, node_spec(false));
        node.set_containers(vec![container]);
        // Before any monitor tick the envelope is the base capacity.
        assert_eq!(node.available_cpu(), 1.5);
        assert_eq!(node.available_ram(), 768);
        node.set_running(true);
        set_now(&mut ctx, 2.0);
        node.monitor_tick(&mut ctx).expect("fits");
        assert_eq!(node.available_cpu(), 1.5);
        assert_eq!(node.available_disk(), 896);
        assert_eq!(node.available_bw(), 900);
    }

    #[test]
    fn precheck_passes_on_idle_containers() {
        let mut ctx = EngineContext::new(Some(3));
        let container = hosted_container(&mut ctx);
        let mut node = Node::new(&mut ctx, node_spec(true));
        node.set_containers(vec![container]);
        assert!(node.precheck_resources(0.0).is_ok());
    }
}
