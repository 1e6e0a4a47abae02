// Copyright The FabSim Authors
// SPDX-License-Identifier: Apache-2.0

//! Engine-owned state threaded through every process step.

use crate::SimTime;
use crate::ids::EntityIds;
use crate::process::Process;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// State shared between the engine and the processes it drives.
///
/// The context owns the virtual clock (written only by the engine), the
/// PRNG every jitter sample in the simulation consults, and the id
/// sequences for all entity classes. Tests pin the seed to make runs
/// reproducible.
pub struct EngineContext {
    pub(crate) now: SimTime,
    rng: StdRng,
    ids: EntityIds,
    spawned: Vec<Box<dyn Process>>,
}

impl EngineContext {
    /// Creates a context with the given PRNG seed, or OS entropy when
    /// `seed` is `None`.
    #[must_use]
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => rand::make_rng(),
        };
        Self {
            now: 0.0,
            rng,
            ids: EntityIds::default(),
            spawned: Vec::new(),
        }
    }

    /// Current virtual time.
    #[must_use]
    pub const fn now(&self) -> SimTime {
        self.now
    }

    /// The engine-owned PRNG used for all jitter sampling.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Allocates the next workload id.
    pub fn next_workload_id(&mut self) -> u64 {
        self.ids.workloads.next_id()
    }

    /// Allocates the next container id.
    pub fn next_container_id(&mut self) -> u64 {
        self.ids.containers.next_id()
    }

    /// Allocates the next node id.
    pub fn next_node_id(&mut self) -> u64 {
        self.ids.nodes.next_id()
    }

    /// Allocates the next data-center id.
    pub fn next_datacenter_id(&mut self) -> u64 {
        self.ids.datacenters.next_id()
    }

    /// Schedules a child process starting at the current `now`.
    ///
    /// The child is enqueued behind every process currently due at this
    /// instant and first steps at the same virtual time.
    pub fn spawn(&mut self, process: Box<dyn Process>) {
        self.spawned.push(process);
    }

    /// Drains the processes spawned during the last step.
    pub(crate) fn take_spawned(&mut self) -> Vec<Box<dyn Process>> {
        std::mem::take(&mut self.spawned)
    }
}
