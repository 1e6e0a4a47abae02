// Copyright The FabSim Authors
// SPDX-License-Identifier: Apache-2.0

//! Utilities for driving engine state directly in tests.
//!
//! Entity unit tests exercise tick logic without running a full engine
//! loop; these helpers stand in for the scheduler.

use crate::SimTime;
use crate::context::EngineContext;

/// Moves the virtual clock of a context to `now`.
///
/// Only the engine writes the clock in production; tests use this to place
/// tick calls at chosen instants.
pub fn set_now(ctx: &mut EngineContext, now: SimTime) {
    ctx.now = now;
}
