// Copyright The FabSim Authors
// SPDX-License-Identifier: Apache-2.0

//! Aligned per-tick history buffers.
//!
//! Every recording entity appends exactly once per tick to each of its
//! buffers, so a tick index is alignable across all of them.

use crate::resources::{ResourceSpec, ResourceUsage};
use fabsim_engine::SimTime;

/// One series per resource dimension.
#[derive(Debug, Default, Clone)]
pub struct SeriesSet {
    /// CPU series, in cores.
    pub cpu: Vec<f64>,
    /// RAM series, in MB.
    pub ram: Vec<i64>,
    /// Disk series, in MB.
    pub disk: Vec<i64>,
    /// Bandwidth series, in Mbps.
    pub bw: Vec<i64>,
}

impl SeriesSet {
    fn push_usage(&mut self, usage: &ResourceUsage) {
        self.cpu.push(usage.cpu);
        self.ram.push(usage.ram);
        self.disk.push(usage.disk);
        self.bw.push(usage.bw);
    }

    fn push_spec(&mut self, spec: &ResourceSpec) {
        self.cpu.push(spec.cpu);
        self.ram.push(spec.ram);
        self.disk.push(spec.disk);
        self.bw.push(spec.bw);
    }

    fn len(&self) -> usize {
        debug_assert_eq!(self.cpu.len(), self.ram.len());
        debug_assert_eq!(self.cpu.len(), self.disk.len());
        debug_assert_eq!(self.cpu.len(), self.bw.len());
        self.cpu.len()
    }
}

/// Container history: usage per dimension plus the tick timestamps.
#[derive(Debug, Default, Clone)]
pub struct ContainerHistory {
    /// Recorded usage series.
    pub usage: SeriesSet,
    /// Virtual timestamps, one per recorded tick.
    pub time: Vec<SimTime>,
}

impl ContainerHistory {
    /// Appends one tick of usage.
    pub fn record(&mut self, usage: &ResourceUsage, now: SimTime) {
        self.usage.push_usage(usage);
        self.time.push(now);
    }

    /// Number of recorded ticks; all buffers share this length.
    #[must_use]
    pub fn len(&self) -> usize {
        debug_assert_eq!(self.usage.len(), self.time.len());
        self.time.len()
    }

    /// Whether no tick has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Node history: summed usage, the jittered availability envelope, and the
/// tick timestamps — nine aligned buffers.
#[derive(Debug, Default, Clone)]
pub struct NodeHistory {
    /// Summed container usage series.
    pub used: SeriesSet,
    /// Sampled availability-envelope series.
    pub available: SeriesSet,
    /// Virtual timestamps, one per monitor tick.
    pub time: Vec<SimTime>,
}

impl NodeHistory {
    /// Appends one monitor tick.
    pub fn record(&mut self, used: &ResourceUsage, envelope: &ResourceSpec, now: SimTime) {
        self.used.push_usage(used);
        self.available.push_spec(envelope);
        self.time.push(now);
    }

    /// The most recent envelope sample, if any tick was recorded.
    #[must_use]
    pub fn last_envelope(&self) -> Option<ResourceSpec> {
        let index = self.time.len().checked_sub(1)?;
        Some(ResourceSpec {
            cpu: *self.available.cpu.get(index)?,
            ram: *self.available.ram.get(index)?,
            disk: *self.available.disk.get(index)?,
            bw: *self.available.bw.get(index)?,
        })
    }

    /// Number of recorded monitor ticks; all buffers share this length.
    #[must_use]
    pub fn len(&self) -> usize {
        debug_assert_eq!(self.used.len(), self.time.len());
        debug_assert_eq!(self.available.len(), self.time.len());
        self.time.len()
    }

    /// Whether no monitor tick has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
