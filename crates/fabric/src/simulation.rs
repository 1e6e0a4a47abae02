// Copyright The FabSim Authors
// SPDX-License-Identifier: Apache-2.0

//! The simulation driver: wires a data center to the engine and runs it.

use crate::datacenter::{DataCenter, DataCenterSummary};
use crate::error::Error;
use crate::runtime::{ContainerRun, NodeMonitor, NodeStart};
use fabsim_engine::{EngineContext, SimEngine, SimTime};
use tracing::info;

/// A compute-fabric simulation.
///
/// Owns the discrete-event engine and, once attached, the data center it
/// drives. Entities are constructed against the engine's context so that
/// ids and jitter sampling stay engine-scoped.
pub struct Simulation {
    engine: SimEngine,
    datacenter: Option<DataCenter>,
}

impl Simulation {
    /// Creates a simulation with the given PRNG seed (OS entropy when
    /// `None`).
    #[must_use]
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            engine: SimEngine::new(seed),
            datacenter: None,
        }
    }

    /// The engine context, for constructing entities and running the
    /// placer against this simulation.
    pub fn context_mut(&mut self) -> &mut EngineContext {
        self.engine.context_mut()
    }

    /// Current virtual time.
    #[must_use]
    pub const fn now(&self) -> SimTime {
        self.engine.now()
    }

    /// Attaches the data center to simulate.
    pub fn attach_datacenter(&mut self, datacenter: DataCenter) {
        self.datacenter = Some(datacenter);
    }

    /// The attached data center, if any.
    #[must_use]
    pub fn datacenter(&self) -> Option<&DataCenter> {
        self.datacenter.as_ref()
    }

    /// Runs the simulation until the given virtual-time horizon.
    ///
    /// Registers, per node: every container's run process, then the node's
    /// start process, then its monitor process — in that order, so that
    /// coincident instants update containers before the monitor observes
    /// them. Fails with [`Error::DataCenterNotAttached`] when no data
    /// center was attached.
    pub fn run(&mut self, simulation_time: SimTime) -> Result<(), Error> {
        let datacenter = self.datacenter.as_ref().ok_or(Error::DataCenterNotAttached)?;
        info!(
            datacenter = %datacenter.name(),
            nodes = datacenter.nodes().len(),
            horizon = simulation_time,
            "simulation starting"
        );
        for node in datacenter.nodes() {
            let containers = node.borrow().containers().to_vec();
            for container in containers {
                self.engine.schedule(Box::new(ContainerRun::new(container)));
            }
            self.engine.schedule(Box::new(NodeStart::new(node.clone())));
            self.engine.schedule(Box::new(NodeMonitor::new(node.clone())));
        }
        self.engine.advance_until(simulation_time);
        info!(time = self.engine.now(), "simulation horizon reached");
        Ok(())
    }

    /// Captures the observation summary of the attached data center.
    pub fn summary(&self) -> Result<DataCenterSummary, Error> {
        self.datacenter
            .as_ref()
            .map(DataCenter::summary)
            .ok_or(Error::DataCenterNotAttached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_without_datacenter_is_a_misconfiguration() {
        let mut simulation = Simulation::new(Some(1));
        let error = simulation.run(10.0).expect_err("no data center");
        assert!(matches!(error, Error::DataCenterNotAttached));
        assert!(simulation.summary().is_err());
    }
}
