// Copyright The FabSim Authors
// SPDX-License-Identifier: Apache-2.0

//! Workloads: time-bounded four-dimensional demands.

use crate::resources::{
    JitterSpec, ResourceDelta, ResourceSpec, sample_jitter, uniform_level_int, uniform_level_real,
};
use fabsim_engine::{EngineContext, SimTime};
use rand::Rng;
use std::fmt;

/// Unique workload identifier, monotone in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkloadId(pub u64);

impl fmt::Display for WorkloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Plain value struct describing a workload to be created.
#[derive(Debug, Clone, Default)]
pub struct WorkloadSpec {
    /// Base CPU demand in cores.
    pub cpu: f64,
    /// Base RAM demand in MB.
    pub ram: i64,
    /// Base disk demand in MB.
    pub disk: i64,
    /// Base bandwidth demand in Mbps.
    pub bw: i64,
    /// Offset from admission until activation.
    pub delay: SimTime,
    /// Length of the active interval.
    pub duration: SimTime,
    /// Per-dimension jitter percentages.
    pub jitter: JitterSpec,
    /// Priority level, opaque to the engine.
    pub priority: Option<i64>,
    /// Type label, opaque to the engine.
    pub workload_type: Option<String>,
}

/// A demand admitted to a container.
///
/// Immutable after creation except for the activity state its hosting
/// container drives: the container activates the workload when its live
/// window opens and deactivates it when the window closes. The level
/// sampled at activation is remembered so that deactivation subtracts
/// exactly the quantity activation added.
#[derive(Debug, Clone)]
pub struct Workload {
    id: WorkloadId,
    demand: ResourceSpec,
    delay: SimTime,
    duration: SimTime,
    jitter: JitterSpec,
    priority: Option<i64>,
    workload_type: Option<String>,
    active: bool,
    activation_sample: Option<ResourceSpec>,
}

impl Workload {
    /// Creates a workload, drawing its id from the engine context.
    pub fn new(ctx: &mut EngineContext, spec: WorkloadSpec) -> Self {
        Self {
            id: WorkloadId(ctx.next_workload_id()),
            demand: ResourceSpec {
                cpu: spec.cpu,
                ram: spec.ram,
                disk: spec.disk,
                bw: spec.bw,
            },
            delay: spec.delay,
            duration: spec.duration,
            jitter: spec.jitter,
            priority: spec.priority,
            workload_type: spec.workload_type,
            active: false,
            activation_sample: None,
        }
    }

    /// The workload id.
    #[must_use]
    pub const fn id(&self) -> WorkloadId {
        self.id
    }

    /// The declared base demand.
    #[must_use]
    pub const fn demand(&self) -> &ResourceSpec {
        &self.demand
    }

    /// Offset from admission until activation.
    #[must_use]
    pub const fn delay(&self) -> SimTime {
        self.delay
    }

    /// Length of the active interval.
    #[must_use]
    pub const fn duration(&self) -> SimTime {
        self.duration
    }

    /// Whether the workload currently contributes to container usage.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Priority level, if declared.
    #[must_use]
    pub const fn priority(&self) -> Option<i64> {
        self.priority
    }

    /// Type label, if declared.
    #[must_use]
    pub fn workload_type(&self) -> Option<&str> {
        self.workload_type.as_deref()
    }

    /// Type label for diagnostics, `"untyped"` when absent.
    #[must_use]
    pub fn type_label(&self) -> &str {
        self.workload_type.as_deref().unwrap_or("untyped")
    }

    /// The live window `[start, end)` relative to the given admission time.
    #[must_use]
    pub fn live_window(&self, admitted_at: SimTime) -> (SimTime, SimTime) {
        let start = admitted_at + self.delay;
        (start, start + self.duration)
    }

    /// Samples the currently observed demand level per dimension.
    ///
    /// Each dimension is drawn uniformly from
    /// `[max(0, base - base*j/100), base + base*j/100]`; integral for the
    /// integer dimensions, real truncated to two decimals for CPU.
    #[must_use]
    pub fn current_demand<R: Rng>(&self, rng: &mut R) -> ResourceSpec {
        ResourceSpec {
            cpu: uniform_level_real(rng, self.demand.cpu, self.jitter.cpu),
            ram: uniform_level_int(rng, self.demand.ram, self.jitter.ram),
            disk: uniform_level_int(rng, self.demand.disk, self.jitter.disk),
            bw: uniform_level_int(rng, self.demand.bw, self.jitter.bw),
        }
    }

    /// Samples the per-tick jitter delta per dimension, uniformly from
    /// `[-base*j/100, +base*j/100]`.
    #[must_use]
    pub fn jitter_delta<R: Rng>(&self, rng: &mut R) -> ResourceDelta {
        sample_jitter(rng, &self.demand, &self.jitter)
    }

    /// Activates the workload and returns the stable activation sample.
    ///
    /// The sample is remembered; [`Workload::deactivate`] returns the same
    /// quantity so usage accounting conserves exactly.
    pub(crate) fn activate<R: Rng>(&mut self, rng: &mut R) -> ResourceSpec {
        let sample = self.current_demand(rng);
        self.activation_sample = Some(sample);
        self.active = true;
        sample
    }

    /// Deactivates the workload, yielding the remembered activation sample.
    pub(crate) fn deactivate(&mut self) -> Option<ResourceSpec> {
        self.active = false;
        self.activation_sample.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> EngineContext {
        EngineContext::new(Some(7))
    }

    fn spec() -> WorkloadSpec {
        WorkloadSpec {
            cpu: 2.0,
            ram: 1024,
            disk: 512,
            bw: 400,
            delay: 1.0,
            duration: 5.0,
            jitter: JitterSpec {
                cpu: 10.0,
                ram: 5.0,
                disk: 2.0,
                bw: 4.0,
            },
            priority: Some(1),
            workload_type: Some("user-request".to_owned()),
        }
    }

    #[test]
    fn ids_are_monotone_in_creation_order() {
        let mut ctx = ctx();
        let first = Workload::new(&mut ctx, spec());
        let second = Workload::new(&mut ctx, spec());
        let third = Workload::new(&mut ctx, spec());
        assert!(first.id() < second.id());
        assert!(second.id() < third.id());
        assert_eq!(first.id(), WorkloadId(0));
        assert_eq!(third.id(), WorkloadId(2));
    }

    #[test]
    fn live_window_offsets_from_admission() {
        let mut ctx = ctx();
        let workload = Workload::new(&mut ctx, spec());
        assert_eq!(workload.live_window(0.0), (1.0, 6.0));
        assert_eq!(workload.live_window(3.5), (4.5, 9.5));
    }

    #[test]
    fn deactivation_returns_the_activation_sample() {
        let mut ctx = ctx();
        let mut workload = Workload::new(&mut ctx, spec());
        let sample = workload.activate(ctx.rng());
        assert!(workload.is_active());
        // Regardless of jitter, the subtracted quantity equals the added one.
        assert_eq!(workload.deactivate(), Some(sample));
        assert!(!workload.is_active());
        assert_eq!(workload.deactivate(), None);
    }

    #[test]
    fn demand_samples_respect_jitter_bounds() {
        let mut ctx = ctx();
        let workload = Workload::new(&mut ctx, spec());
        for _ in 0..100 {
            let demand = workload.current_demand(ctx.rng());
            assert!((1.8..=2.2).contains(&demand.cpu));
            assert!((973..=1075).contains(&demand.ram));
            assert!((502..=522).contains(&demand.disk));
            assert!((384..=416).contains(&demand.bw));
        }
    }
}
