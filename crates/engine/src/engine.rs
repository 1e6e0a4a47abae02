// Copyright The FabSim Authors
// SPDX-License-Identifier: Apache-2.0

//! The event queue and the scheduling loop.

use crate::SimTime;
use crate::context::EngineContext;
use crate::process::{Process, Step};
use std::cmp::Ordering;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// A pending wakeup in the event queue.
///
/// Entries order by `(wake_at, round, pid)`. `pid` is the monotone
/// registration index of the process, which makes same-instant execution
/// follow registration order. `round` is a delta-round counter within one
/// instant: zero-delay re-enqueues and freshly spawned children get the
/// round after the one currently executing, placing them behind everything
/// already due.
struct EventEntry {
    wake_at: SimTime,
    round: u64,
    pid: usize,
}

impl PartialEq for EventEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for EventEntry {}

impl PartialOrd for EventEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.wake_at
            .total_cmp(&other.wake_at)
            .then_with(|| self.round.cmp(&other.round))
            .then_with(|| self.pid.cmp(&other.pid))
    }
}

/// Single-threaded cooperative discrete-event engine.
///
/// Owns the [`EngineContext`] (virtual clock, PRNG, id sequences), the
/// registered processes, and the wakeup queue.
pub struct SimEngine {
    ctx: EngineContext,
    queue: BinaryHeap<Reverse<EventEntry>>,
    slots: Vec<Option<Box<dyn Process>>>,
    current_round: u64,
}

impl SimEngine {
    /// Creates an engine at virtual time zero with the given PRNG seed
    /// (OS entropy when `None`).
    #[must_use]
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            ctx: EngineContext::new(seed),
            queue: BinaryHeap::new(),
            slots: Vec::new(),
            current_round: 0,
        }
    }

    /// Current virtual time.
    #[must_use]
    pub const fn now(&self) -> SimTime {
        self.ctx.now()
    }

    /// The engine context, for constructing entities against this engine.
    pub fn context_mut(&mut self) -> &mut EngineContext {
        &mut self.ctx
    }

    /// Registers a process starting at the current virtual time.
    ///
    /// Registration order is the tie-break for processes due at the same
    /// instant.
    pub fn schedule(&mut self, process: Box<dyn Process>) {
        let pid = self.register(process);
        self.enqueue(self.ctx.now, 0, pid);
    }

    fn register(&mut self, process: Box<dyn Process>) -> usize {
        let pid = self.slots.len();
        self.slots.push(Some(process));
        pid
    }

    fn enqueue(&mut self, wake_at: SimTime, round: u64, pid: usize) {
        self.queue.push(Reverse(EventEntry {
            wake_at,
            round,
            pid,
        }));
    }

    /// Runs every wakeup due at a time `<= horizon`, in order, then leaves
    /// the clock at `min(horizon, next_wakeup)` — which is `horizon` when
    /// the queue drains past it.
    pub fn advance_until(&mut self, horizon: SimTime) {
        loop {
            let Some(Reverse(head)) = self.queue.peek() else {
                break;
            };
            if head.wake_at > horizon {
                break;
            }
            let Some(Reverse(entry)) = self.queue.pop() else {
                break;
            };
            if entry.wake_at > self.ctx.now {
                self.ctx.now = entry.wake_at;
            }
            self.current_round = entry.round;
            let Some(mut process) = self.slots[entry.pid].take() else {
                // Terminated processes are not re-entered.
                continue;
            };
            match process.step(&mut self.ctx) {
                Step::Sleep(delay) => {
                    let delay = delay.max(0.0);
                    let round = if delay == 0.0 {
                        self.current_round + 1
                    } else {
                        0
                    };
                    self.slots[entry.pid] = Some(process);
                    self.enqueue(self.ctx.now + delay, round, entry.pid);
                }
                Step::Done => {}
            }
            let round = self.current_round + 1;
            for child in self.ctx.take_spawned() {
                let pid = self.register(child);
                self.enqueue(self.ctx.now, round, pid);
            }
        }
        if horizon > self.ctx.now {
            self.ctx.now = horizon;
        }
    }
}
