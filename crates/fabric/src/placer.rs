// Copyright The FabSim Authors
// SPDX-License-Identifier: Apache-2.0

//! First-fit workload placement with optional forward reservations.
//!
//! The placer is a one-shot bulk assignment: each workload of an ordered
//! batch goes to the first candidate container that can accommodate it.
//! With reservations enabled, feasibility is checked for every integer
//! tick of the workload's live window against a per-container forecast of
//! already reserved demand; without, only the container's instantaneous
//! headroom is consulted.
//!
//! The forecast is indexed by workload-relative ticks (the live window
//! starts at `delay`, not at the absolute admission time). This keeps all
//! placements of one batch in a single reference frame and is deliberately
//! optimistic across batches placed at different admission times.

use crate::container::{ContainerHandle, ContainerId};
use crate::error::Error;
use crate::resources::ResourceUsage;
use crate::workload::{Workload, WorkloadId};
use fabsim_engine::EngineContext;
use std::collections::HashMap;
use tracing::info;

/// The disposition of one placed workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// The placed workload.
    pub workload: WorkloadId,
    /// The selected container.
    pub container: ContainerId,
    /// The selected container's name, for reporting.
    pub container_name: String,
}

/// Reserved demand per integer virtual-time tick for one container.
type Forecast = HashMap<i64, ResourceUsage>;

/// First-fit load balancer assigning workloads to containers.
#[derive(Debug, Clone, Copy)]
pub struct FirstFitPlacer {
    use_reservations: bool,
}

impl FirstFitPlacer {
    /// Creates a placer; `use_reservations` selects time-indexed
    /// feasibility checks over the classic instantaneous first-fit.
    #[must_use]
    pub const fn new(use_reservations: bool) -> Self {
        Self { use_reservations }
    }

    /// Whether reservations are enabled.
    #[must_use]
    pub const fn uses_reservations(&self) -> bool {
        self.use_reservations
    }

    /// Assigns every workload of the batch to a container, admitting it at
    /// the current engine time.
    ///
    /// Deterministic given input order; greedy and non-backtracking. The
    /// first workload with no qualifying container aborts the whole batch
    /// with [`Error::PlacementInfeasible`]; workloads placed before the
    /// failure remain admitted.
    pub fn place(
        &self,
        ctx: &mut EngineContext,
        workloads: Vec<Workload>,
        containers: &[ContainerHandle],
    ) -> Result<Vec<Assignment>, Error> {
        let mut forecasts: Vec<Forecast> = vec![Forecast::new(); containers.len()];
        let mut assignments = Vec::with_capacity(workloads.len());

        for workload in workloads {
            let selected = containers
                .iter()
                .enumerate()
                .find(|(index, container)| {
                    self.can_accommodate(&workload, container, &forecasts[*index])
                })
                .map(|(index, _)| index);
            let Some(index) = selected else {
                return Err(Error::PlacementInfeasible {
                    workload_type: workload.type_label().to_owned(),
                    delay: workload.delay(),
                });
            };
            self.reserve(&workload, &mut forecasts[index]);
            let mut container = containers[index].borrow_mut();
            info!(
                workload = %workload.id(),
                workload_type = workload.type_label(),
                container = %container.name(),
                "workload assigned"
            );
            assignments.push(Assignment {
                workload: workload.id(),
                container: container.id(),
                container_name: container.name().to_owned(),
            });
            container.add_workload(workload, ctx.now());
        }
        Ok(assignments)
    }

    /// The integer ticks of a workload's live window, relative to its
    /// admission: `floor(delay) ..= floor(delay + duration)`.
    fn window_ticks(workload: &Workload) -> std::ops::RangeInclusive<i64> {
        let start = workload.delay();
        let end = start + workload.duration();
        (start.floor() as i64)..=(end.floor() as i64)
    }

    fn can_accommodate(
        &self,
        workload: &Workload,
        container: &ContainerHandle,
        forecast: &Forecast,
    ) -> bool {
        let container = container.borrow();
        if !self.use_reservations {
            let demand = workload.demand();
            return demand.cpu <= container.available_cpu()
                && demand.ram <= container.available_ram()
                && demand.disk <= container.available_disk()
                && demand.bw <= container.available_bw();
        }

        let capacity = container.capacity();
        let demand = workload.demand();
        for tick in Self::window_ticks(workload) {
            let reserved = forecast.get(&tick).copied().unwrap_or_default();
            if reserved.cpu + demand.cpu > capacity.cpu
                || reserved.ram + demand.ram > capacity.ram
                || reserved.disk + demand.disk > capacity.disk
                || reserved.bw + demand.bw > capacity.bw
            {
                return false;
            }
        }
        true
    }

    fn reserve(&self, workload: &Workload, forecast: &mut Forecast) {
        if !self.use_reservations {
            return;
        }
        for tick in Self::window_ticks(workload) {
            forecast
                .entry(tick)
                .or_default()
                .add_demand(workload.demand());
        }
    }
}
