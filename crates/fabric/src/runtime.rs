// Copyright The FabSim Authors
// SPDX-License-Identifier: Apache-2.0

//! Engine processes driving the fabric entities.
//!
//! Suspension points are exactly the timeout yields of the conceptual tick
//! loops: container start (one yield of its startup delay), container run
//! (one unit per loop), node start (one yield of its startup delay), node
//! monitor (two units per loop). Registration order places container run
//! processes before node processes so that coincident instants update
//! container usage before the monitor reads the totals.

use crate::container::ContainerHandle;
use crate::node::NodeHandle;
use fabsim_engine::{EngineContext, Process, Step};
use tracing::{error, info, warn};

/// Interval between container ticks.
const CONTAINER_TICK: f64 = 1.0;
/// Interval between node monitor ticks.
const MONITOR_TICK: f64 = 2.0;

/// Per-container tick loop, gated by the container's running flag.
pub struct ContainerRun {
    container: ContainerHandle,
}

impl ContainerRun {
    /// Creates the run process for a container.
    #[must_use]
    pub fn new(container: ContainerHandle) -> Self {
        Self { container }
    }
}

impl Process for ContainerRun {
    fn step(&mut self, ctx: &mut EngineContext) -> Step {
        self.container.borrow_mut().tick(ctx);
        Step::Sleep(CONTAINER_TICK)
    }
}

/// One-shot container startup: wait the startup delay, then run.
pub struct ContainerStart {
    container: ContainerHandle,
    waited: bool,
}

impl ContainerStart {
    /// Creates the start process for a container.
    #[must_use]
    pub fn new(container: ContainerHandle) -> Self {
        Self {
            container,
            waited: false,
        }
    }
}

impl Process for ContainerStart {
    fn step(&mut self, ctx: &mut EngineContext) -> Step {
        if !self.waited {
            self.waited = true;
            let delay = self.container.borrow().start_up_delay();
            return Step::Sleep(delay);
        }
        let mut container = self.container.borrow_mut();
        container.set_running(true);
        info!(container = %container.name(), time = ctx.now(), "container started");
        Step::Done
    }
}

/// One-shot node startup: pre-check resources, wait the startup delay,
/// then activate the node and spawn its containers' start processes.
pub struct NodeStart {
    node: NodeHandle,
    waited: bool,
}

impl NodeStart {
    /// Creates the start process for a node.
    #[must_use]
    pub fn new(node: NodeHandle) -> Self {
        Self {
            node,
            waited: false,
        }
    }
}

impl Process for NodeStart {
    fn step(&mut self, ctx: &mut EngineContext) -> Step {
        if !self.waited {
            self.waited = true;
            let node = self.node.borrow();
            if let Err(fault) = node.precheck_resources(ctx.now()) {
                error!(node = %node.name(), "startup aborted: {fault}");
                return Step::Done;
            }
            return Step::Sleep(node.start_up_delay());
        }
        let containers: Vec<ContainerHandle> = {
            let mut node = self.node.borrow_mut();
            node.set_running(true);
            info!(node = %node.name(), time = ctx.now(), "node started");
            node.containers().to_vec()
        };
        for container in containers {
            ctx.spawn(Box::new(ContainerStart::new(container)));
        }
        Step::Done
    }
}

/// Periodic node monitor: records history and enforces capacity every two
/// time units while the node runs; terminates when the node halts.
pub struct NodeMonitor {
    node: NodeHandle,
}

impl NodeMonitor {
    /// Creates the monitor process for a node.
    #[must_use]
    pub fn new(node: NodeHandle) -> Self {
        Self { node }
    }
}

impl Process for NodeMonitor {
    fn step(&mut self, ctx: &mut EngineContext) -> Step {
        {
            let node = self.node.borrow();
            if node.is_halted() {
                return Step::Done;
            }
            if !node.is_running() {
                return Step::Sleep(MONITOR_TICK);
            }
        }
        let outcome = self.node.borrow_mut().monitor_tick(ctx);
        if let Err(fault) = outcome {
            let mut node = self.node.borrow_mut();
            if node.stops_on_lack_of_resource() {
                error!("{fault}");
                node.stop(ctx.now());
                return Step::Done;
            }
            warn!(node = %node.name(), "{fault}; node keeps running");
        }
        Step::Sleep(MONITOR_TICK)
    }
}
