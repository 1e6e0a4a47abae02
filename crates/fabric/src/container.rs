// Copyright The FabSim Authors
// SPDX-License-Identifier: Apache-2.0

//! Containers: admission, activation and per-tick resource accounting.

use crate::history::ContainerHistory;
use crate::resources::{JitterSpec, ResourceSpec, ResourceUsage, sample_jitter};
use crate::workload::{Workload, WorkloadId};
use fabsim_engine::{EngineContext, SimTime};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// Unique container identifier, monotone in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContainerId(pub u64);

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared handle to a container, usable from processes and its owning node.
pub type ContainerHandle = Rc<RefCell<Container>>;

/// Plain value struct describing a container to be created.
#[derive(Debug, Clone, Default)]
pub struct ContainerSpec {
    /// Container name.
    pub name: String,
    /// CPU capacity in cores.
    pub cpu: f64,
    /// RAM capacity in MB.
    pub ram: i64,
    /// Disk capacity in MB.
    pub disk: i64,
    /// Bandwidth capacity in Mbps.
    pub bw: i64,
    /// Startup delay before the container starts ticking.
    pub start_up_delay: SimTime,
    /// Per-dimension jitter percentages applied to the base capacities.
    pub jitter: JitterSpec,
}

/// Workloads admitted at one virtual instant, in insertion order.
#[derive(Debug, Clone)]
struct AdmissionBucket {
    admitted_at: SimTime,
    workloads: Vec<Workload>,
}

/// A container hosted on a node.
///
/// Aggregates admitted workloads, materializes their activations and
/// deactivations at the scheduled moments, overlays base-level jitter,
/// clamps usage at zero and records one history entry per tick while
/// running.
#[derive(Debug)]
pub struct Container {
    id: ContainerId,
    name: String,
    capacity: ResourceSpec,
    jitter: JitterSpec,
    start_up_delay: SimTime,
    running: bool,
    usage: ResourceUsage,
    buckets: Vec<AdmissionBucket>,
    history: ContainerHistory,
}

impl Container {
    /// Creates a container, drawing its id from the engine context.
    pub fn new(ctx: &mut EngineContext, spec: ContainerSpec) -> Self {
        Self {
            id: ContainerId(ctx.next_container_id()),
            name: spec.name,
            capacity: ResourceSpec {
                cpu: spec.cpu,
                ram: spec.ram,
                disk: spec.disk,
                bw: spec.bw,
            },
            jitter: spec.jitter,
            start_up_delay: spec.start_up_delay,
            running: false,
            usage: ResourceUsage::default(),
            buckets: Vec::new(),
            history: ContainerHistory::default(),
        }
    }

    /// Creates a container wrapped in a shared handle.
    pub fn new_handle(ctx: &mut EngineContext, spec: ContainerSpec) -> ContainerHandle {
        Rc::new(RefCell::new(Self::new(ctx, spec)))
    }

    /// The container id.
    #[must_use]
    pub const fn id(&self) -> ContainerId {
        self.id
    }

    /// The container name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared base capacities.
    #[must_use]
    pub const fn capacity(&self) -> &ResourceSpec {
        &self.capacity
    }

    /// Startup delay before the container starts ticking.
    #[must_use]
    pub const fn start_up_delay(&self) -> SimTime {
        self.start_up_delay
    }

    /// Whether the container is running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Current instantaneous usage.
    #[must_use]
    pub const fn usage(&self) -> &ResourceUsage {
        &self.usage
    }

    /// Recorded per-tick history.
    #[must_use]
    pub const fn history(&self) -> &ContainerHistory {
        &self.history
    }

    /// CPU headroom: `max(0, capacity - usage)`.
    #[must_use]
    pub fn available_cpu(&self) -> f64 {
        (self.capacity.cpu - self.usage.cpu).max(0.0)
    }

    /// RAM headroom in MB.
    #[must_use]
    pub fn available_ram(&self) -> i64 {
        (self.capacity.ram - self.usage.ram).max(0)
    }

    /// Disk headroom in MB.
    #[must_use]
    pub fn available_disk(&self) -> i64 {
        (self.capacity.disk - self.usage.disk).max(0)
    }

    /// Bandwidth headroom in Mbps.
    #[must_use]
    pub fn available_bw(&self) -> i64 {
        (self.capacity.bw - self.usage.bw).max(0)
    }

    /// Whether a workload with this identity is already admitted.
    #[must_use]
    pub fn contains_workload(&self, id: WorkloadId) -> bool {
        self.buckets
            .iter()
            .any(|bucket| bucket.workloads.iter().any(|w| w.id() == id))
    }

    /// Number of admitted, not yet completed workloads.
    #[must_use]
    pub fn workload_count(&self) -> usize {
        self.buckets.iter().map(|b| b.workloads.len()).sum()
    }

    /// Admission times with at least one pending workload, in insertion
    /// order.
    #[must_use]
    pub fn admission_times(&self) -> Vec<SimTime> {
        self.buckets.iter().map(|b| b.admitted_at).collect()
    }

    /// Admits a workload under the given admission time.
    ///
    /// Re-admitting an already present identity leaves the workload map
    /// unchanged; the duplicate is skipped with a diagnostic.
    pub fn add_workload(&mut self, workload: Workload, now: SimTime) {
        if self.contains_workload(workload.id()) {
            debug!(
                container = %self.name,
                workload = %workload.id(),
                workload_type = workload.type_label(),
                "workload already assigned, skipping"
            );
            return;
        }
        debug!(
            container = %self.name,
            workload = %workload.id(),
            workload_type = workload.type_label(),
            time = now,
            "workload assigned"
        );
        match self
            .buckets
            .iter_mut()
            .find(|b| b.admitted_at.total_cmp(&now).is_eq())
        {
            Some(bucket) => bucket.workloads.push(workload),
            None => self.buckets.push(AdmissionBucket {
                admitted_at: now,
                workloads: vec![workload],
            }),
        }
    }

    /// Marks the container running; called by its start process once the
    /// startup delay elapsed.
    pub(crate) fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    /// One tick of the container at virtual time `ctx.now()`.
    ///
    /// Fixed order: workload activations and deactivations, per-workload
    /// jitter, base container jitter, clamp at zero, history append.
    /// Completed workloads are removed in the tick they deactivate and
    /// empty admission buckets are dropped.
    pub fn tick(&mut self, ctx: &mut EngineContext) {
        if !self.running {
            return;
        }
        let now = ctx.now();
        for bucket in &mut self.buckets {
            let mut completed: Vec<WorkloadId> = Vec::new();
            for workload in &mut bucket.workloads {
                let (start, end) = workload.live_window(bucket.admitted_at);
                if start <= now && now < end && !workload.is_active() {
                    let sample = workload.activate(ctx.rng());
                    self.usage.add_demand(&sample);
                } else if now >= end && workload.is_active() {
                    if let Some(sample) = workload.deactivate() {
                        self.usage.sub_demand(&sample);
                    }
                    completed.push(workload.id());
                } else if workload.is_active() {
                    let delta = workload.jitter_delta(ctx.rng());
                    self.usage.add_delta(&delta);
                }
            }
            if !completed.is_empty() {
                bucket.workloads.retain(|w| !completed.contains(&w.id()));
            }
        }
        self.buckets.retain(|b| !b.workloads.is_empty());

        let base_jitter = sample_jitter(ctx.rng(), &self.capacity, &self.jitter);
        self.usage.add_delta(&base_jitter);
        self.usage.clamp_non_negative();
        self.history.record(&self.usage, now);
        debug!(
            container = %self.name,
            time = now,
            cpu = self.usage.cpu,
            ram = self.usage.ram,
            disk = self.usage.disk,
            bw = self.usage.bw,
            "container tick"
        );
    }

    /// Stops the container.
    ///
    /// Still-active workloads give back their activation samples, usage is
    /// zeroed and the history stops growing. Calling this on an already
    /// stopped container is a no-op.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        for bucket in &mut self.buckets {
            for workload in &mut bucket.workloads {
                if workload.is_active() {
                    if let Some(sample) = workload.deactivate() {
                        self.usage.sub_demand(&sample);
                    }
                }
            }
        }
        self.usage.zero();
        self.running = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::WorkloadSpec;

    fn container_spec() -> ContainerSpec {
        ContainerSpec {
            name: "web-1".to_owned(),
            cpu: 2.0,
            ram: 1024,
            disk: 1024,
            bw: 1000,
            start_up_delay: 0.9,
            jitter: JitterSpec::default(),
        }
    }

    fn workload_spec() -> WorkloadSpec {
        WorkloadSpec {
            cpu: 1.0,
            ram: 512,
            disk: 512,
            bw: 400,
            delay: 3.0,
            duration: 8.0,
            ..WorkloadSpec::default()
        }
    }

    /// Ticks the container at integer times `[from, to]`.
    fn tick_range(container: &mut Container, ctx: &mut EngineContext, from: u64, to: u64) {
        for t in from..=to {
            fabsim_engine::testing::set_now(ctx, t as f64);
            container.tick(ctx);
        }
    }

    #[test]
    fn workload_activates_and_deactivates_in_window() {
        let mut ctx = EngineContext::new(Some(11));
        let mut container = Container::new(&mut ctx, container_spec());
        container.set_running(true);
        let workload = Workload::new(&mut ctx, workload_spec());
        container.add_workload(workload, 0.0);

        // Window is [3, 11): inactive before, active inside, removed after.
        tick_range(&mut container, &mut ctx, 0, 2);
        assert_eq!(container.usage().cpu, 0.0);
        tick_range(&mut container, &mut ctx, 3, 3);
        assert_eq!(container.usage().cpu, 1.0);
        assert_eq!(container.usage().ram, 512);
        tick_range(&mut container, &mut ctx, 4, 10);
        assert_eq!(container.usage().cpu, 1.0);
        tick_range(&mut container, &mut ctx, 11, 11);
        assert_eq!(container.usage().cpu, 0.0);
        assert_eq!(container.usage().ram, 0);
        assert_eq!(container.workload_count(), 0);
        assert!(container.admission_times().is_empty());
    }

    #[test]
    fn zero_jitter_usage_returns_to_zero_after_all_workloads() {
        let mut ctx = EngineContext::new(Some(11));
        let mut container = Container::new(&mut ctx, container_spec());
        container.set_running(true);
        let first = Workload::new(&mut ctx, workload_spec());
        let second = Workload::new(
            &mut ctx,
            WorkloadSpec {
                cpu: 0.5,
                ram: 128,
                disk: 64,
                bw: 100,
                delay: 1.0,
                duration: 4.0,
                ..WorkloadSpec::default()
            },
        );
        container.add_workload(first, 0.0);
        container.add_workload(second, 0.0);

        tick_range(&mut container, &mut ctx, 0, 4);
        assert_eq!(container.usage().cpu, 1.5);
        assert_eq!(container.usage().ram, 640);
        tick_range(&mut container, &mut ctx, 5, 20);
        assert_eq!(container.usage(), &ResourceUsage::default());
    }

    #[test]
    fn container_ids_are_monotone_in_creation_order() {
        let mut ctx = EngineContext::new(Some(11));
        let first = Container::new(&mut ctx, container_spec());
        let second = Container::new(&mut ctx, container_spec());
        assert_eq!(first.id(), ContainerId(0));
        assert_eq!(second.id(), ContainerId(1));
    }

    #[test]
    fn duplicate_admission_is_skipped() {
        let mut ctx = EngineContext::new(Some(11));
        let mut container = Container::new(&mut ctx, container_spec());
        let workload = Workload::new(&mut ctx, workload_spec());
        let duplicate = workload.clone();
        container.add_workload(workload, 0.0);
        container.add_workload(duplicate, 2.0);
        assert_eq!(container.workload_count(), 1);
        assert_eq!(container.admission_times(), vec![0.0]);
    }

    #[test]
    fn admission_preserves_insertion_order_within_an_instant() {
        let mut ctx = EngineContext::new(Some(11));
        let mut container = Container::new(&mut ctx, container_spec());
        let first = Workload::new(&mut ctx, workload_spec());
        let second = Workload::new(&mut ctx, workload_spec());
        let first_id = first.id();
        let second_id = second.id();
        container.add_workload(first, 0.0);
        container.add_workload(second, 0.0);
        assert_eq!(container.admission_times(), vec![0.0]);
        assert!(container.contains_workload(first_id));
        assert!(container.contains_workload(second_id));
    }

    #[test]
    fn history_grows_only_while_running() {
        let mut ctx = EngineContext::new(Some(11));
        let mut container = Container::new(&mut ctx, container_spec());
        container.tick(&mut ctx);
        assert!(container.history().is_empty());
        container.set_running(true);
        tick_range(&mut container, &mut ctx, 0, 4);
        assert_eq!(container.history().len(), 5);
        container.stop();
        container.tick(&mut ctx);
        assert_eq!(container.history().len(), 5);
    }

    #[test]
    fn stop_subtracts_activation_samples_and_zeroes_usage() {
        let mut ctx = EngineContext::new(Some(11));
        let mut container = Container::new(&mut ctx, container_spec());
        container.set_running(true);
        let workload = Workload::new(
            &mut ctx,
            WorkloadSpec {
                delay: 0.0,
                ..workload_spec()
            },
        );
        container.add_workload(workload, 0.0);
        tick_range(&mut container, &mut ctx, 0, 1);
        assert_eq!(container.usage().cpu, 1.0);
        container.stop();
        assert_eq!(container.usage(), &ResourceUsage::default());
        assert!(!container.is_running());
        // Idempotent.
        container.stop();
        assert_eq!(container.usage(), &ResourceUsage::default());
    }
}
