// Copyright The FabSim Authors
// SPDX-License-Identifier: Apache-2.0

//! Four-dimensional resource vectors and jitter sampling.
//!
//! Every entity reasons about the same four dimensions: CPU in cores
//! (real-valued), RAM and disk in MB, network bandwidth in Mbps (all
//! integral). Jitter is a symmetric per-tick perturbation expressed as a
//! percentage of a base value.

use rand::Rng;
use rand::RngExt;
use std::fmt;

/// One of the four resource dimensions, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    /// CPU cores.
    Cpu,
    /// RAM in MB.
    Ram,
    /// Disk in MB.
    Disk,
    /// Network bandwidth in Mbps.
    Bandwidth,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Dimension::Cpu => "CPU",
            Dimension::Ram => "RAM",
            Dimension::Disk => "disk",
            Dimension::Bandwidth => "network bandwidth",
        };
        write!(f, "{label}")
    }
}

/// Declared base magnitudes per dimension.
///
/// Used both for entity capacities and for sampled demand levels.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ResourceSpec {
    /// CPU cores.
    pub cpu: f64,
    /// RAM in MB.
    pub ram: i64,
    /// Disk in MB.
    pub disk: i64,
    /// Network bandwidth in Mbps.
    pub bw: i64,
}

/// Symmetric jitter bounds per dimension, in percent of the base value.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct JitterSpec {
    /// CPU jitter percentage in `[0, 100]`.
    pub cpu: f64,
    /// RAM jitter percentage in `[0, 100]`.
    pub ram: f64,
    /// Disk jitter percentage in `[0, 100]`.
    pub disk: f64,
    /// Bandwidth jitter percentage in `[0, 100]`.
    pub bw: f64,
}

/// A signed per-tick change applied to an accumulator.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ResourceDelta {
    /// CPU cores.
    pub cpu: f64,
    /// RAM in MB.
    pub ram: i64,
    /// Disk in MB.
    pub disk: i64,
    /// Network bandwidth in Mbps.
    pub bw: i64,
}

/// Instantaneous resource usage of an entity.
///
/// Accumulators may go transiently negative while a tick applies jitter
/// deltas; they are clamped to zero before the tick's effects are observed.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ResourceUsage {
    /// CPU cores.
    pub cpu: f64,
    /// RAM in MB.
    pub ram: i64,
    /// Disk in MB.
    pub disk: i64,
    /// Network bandwidth in Mbps.
    pub bw: i64,
}

impl ResourceUsage {
    /// Adds a sampled demand level.
    pub fn add_demand(&mut self, demand: &ResourceSpec) {
        self.cpu += demand.cpu;
        self.ram += demand.ram;
        self.disk += demand.disk;
        self.bw += demand.bw;
    }

    /// Subtracts a previously added demand level.
    pub fn sub_demand(&mut self, demand: &ResourceSpec) {
        self.cpu -= demand.cpu;
        self.ram -= demand.ram;
        self.disk -= demand.disk;
        self.bw -= demand.bw;
    }

    /// Applies a signed jitter delta.
    pub fn add_delta(&mut self, delta: &ResourceDelta) {
        self.cpu += delta.cpu;
        self.ram += delta.ram;
        self.disk += delta.disk;
        self.bw += delta.bw;
    }

    /// Accumulates another usage vector (node totals over containers).
    pub fn add_usage(&mut self, other: &ResourceUsage) {
        self.cpu += other.cpu;
        self.ram += other.ram;
        self.disk += other.disk;
        self.bw += other.bw;
    }

    /// Clamps every dimension to be non-negative.
    pub fn clamp_non_negative(&mut self) {
        self.cpu = self.cpu.max(0.0);
        self.ram = self.ram.max(0);
        self.disk = self.disk.max(0);
        self.bw = self.bw.max(0);
    }

    /// Resets every dimension to zero.
    pub fn zero(&mut self) {
        *self = ResourceUsage::default();
    }

    /// Returns the first dimension (in cpu, ram, disk, bandwidth order)
    /// where this usage exceeds `limit`, with the required and available
    /// magnitudes.
    #[must_use]
    pub fn exceeds(&self, limit: &ResourceSpec) -> Option<(Dimension, f64, f64)> {
        if self.cpu > limit.cpu {
            return Some((Dimension::Cpu, self.cpu, limit.cpu));
        }
        if self.ram > limit.ram {
            return Some((Dimension::Ram, self.ram as f64, limit.ram as f64));
        }
        if self.disk > limit.disk {
            return Some((Dimension::Disk, self.disk as f64, limit.disk as f64));
        }
        if self.bw > limit.bw {
            return Some((Dimension::Bandwidth, self.bw as f64, limit.bw as f64));
        }
        None
    }
}

/// Truncates a real value to two decimal places.
pub(crate) fn truncate_centi(value: f64) -> f64 {
    (value * 100.0).trunc() / 100.0
}

/// Uniform sample from `[max(0, base - base*pct/100), base + base*pct/100]`,
/// truncated to two decimal places.
pub(crate) fn uniform_level_real<R: Rng>(rng: &mut R, base: f64, pct: f64) -> f64 {
    let saturation = base * (pct / 100.0);
    let lower = (base - saturation).max(0.0);
    let upper = base + saturation;
    truncate_centi(rng.random_range(lower..=upper))
}

/// Uniform integral sample from `[max(0, base - base*pct/100), base + base*pct/100]`.
pub(crate) fn uniform_level_int<R: Rng>(rng: &mut R, base: i64, pct: f64) -> i64 {
    let saturation = (base as f64 * (pct / 100.0)) as i64;
    let lower = (base - saturation).max(0);
    rng.random_range(lower..=base + saturation)
}

/// Uniform sample from `[-base*pct/100, +base*pct/100]`.
pub(crate) fn uniform_delta_real<R: Rng>(rng: &mut R, base: f64, pct: f64) -> f64 {
    let saturation = base * (pct / 100.0);
    rng.random_range(-saturation..=saturation)
}

/// Uniform integral sample from `[-base*pct/100, +base*pct/100]`.
pub(crate) fn uniform_delta_int<R: Rng>(rng: &mut R, base: i64, pct: f64) -> i64 {
    let saturation = (base as f64 * (pct / 100.0)) as i64;
    rng.random_range(-saturation..=saturation)
}

/// Samples one signed jitter delta for every dimension of `base`.
pub(crate) fn sample_jitter<R: Rng>(
    rng: &mut R,
    base: &ResourceSpec,
    jitter: &JitterSpec,
) -> ResourceDelta {
    ResourceDelta {
        cpu: uniform_delta_real(rng, base.cpu, jitter.cpu),
        ram: uniform_delta_int(rng, base.ram, jitter.ram),
        disk: uniform_delta_int(rng, base.disk, jitter.disk),
        bw: uniform_delta_int(rng, base.bw, jitter.bw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn zero_jitter_samples_are_exact() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(uniform_level_real(&mut rng, 2.5, 0.0), 2.5);
        assert_eq!(uniform_level_int(&mut rng, 1024, 0.0), 1024);
        assert_eq!(uniform_delta_real(&mut rng, 2.5, 0.0), 0.0);
        assert_eq!(uniform_delta_int(&mut rng, 1024, 0.0), 0);
    }

    #[test]
    fn level_samples_stay_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let cpu = uniform_level_real(&mut rng, 2.0, 50.0);
            assert!((1.0..=3.0).contains(&cpu), "cpu sample {cpu} out of bounds");
            let ram = uniform_level_int(&mut rng, 1000, 10.0);
            assert!((900..=1100).contains(&ram), "ram sample {ram} out of bounds");
        }
    }

    #[test]
    fn delta_samples_are_symmetric_around_zero() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let delta = uniform_delta_int(&mut rng, 1000, 10.0);
            assert!((-100..=100).contains(&delta));
        }
    }

    #[test]
    fn real_levels_are_truncated_to_two_decimals() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let cpu = uniform_level_real(&mut rng, 1.0, 80.0);
            assert_eq!(cpu, truncate_centi(cpu));
        }
    }

    #[test]
    fn level_lower_bound_never_negative() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            assert!(uniform_level_real(&mut rng, 0.5, 100.0) >= 0.0);
            assert!(uniform_level_int(&mut rng, 10, 100.0) >= 0);
        }
    }

    #[test]
    fn exceeds_reports_first_violated_dimension() {
        let limit = ResourceSpec {
            cpu: 2.0,
            ram: 1024,
            disk: 1024,
            bw: 1000,
        };
        let mut usage = ResourceUsage::default();
        assert_eq!(usage.exceeds(&limit), None);
        usage.ram = 2048;
        usage.bw = 4000;
        let (dimension, required, available) = usage.exceeds(&limit).expect("violation");
        assert_eq!(dimension, Dimension::Ram);
        assert_eq!(required, 2048.0);
        assert_eq!(available, 1024.0);
    }

    #[test]
    fn clamp_floors_negative_accumulators() {
        let mut usage = ResourceUsage {
            cpu: -0.5,
            ram: -12,
            disk: 3,
            bw: -1,
        };
        usage.clamp_non_negative();
        assert_eq!(usage.cpu, 0.0);
        assert_eq!(usage.ram, 0);
        assert_eq!(usage.disk, 3);
        assert_eq!(usage.bw, 0);
    }
}
