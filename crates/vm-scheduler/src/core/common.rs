//! Common data structures: entity identifiers and the error taxonomy surfaced
//! synchronously to callers of the client facade.

use std::collections::HashMap;

use dslab_core::context::SimulationContext;
use serde::Serialize;

/// 128-bit identifier for flavors, images and servers.
///
/// Not related to `dslab_core::Id` (a `u32` component id) used for hosts and
/// other simulation components.
pub type Id = u128;

/// Opaque string-keyed label/metadata map, used verbatim for both labels and
/// metadata across flavors, images and servers.
pub type Labels = HashMap<String, String>;

/// Generates unique 128-bit ids from the simulated clock and the simulation's
/// own seeded RNG, so ids stay deterministic for a given seed without pulling
/// in a separate id-generation dependency.
pub struct IdGenerator;

impl IdGenerator {
    pub fn next(ctx: &SimulationContext) -> Id {
        let high = (ctx.time() * 1000.).round() as u128;
        let low: u64 = ctx.gen_range(0..u64::MAX);
        (high << 64) | low as u128
    }
}

/// Errors surfaced synchronously from client-facade operations.
///
/// The remaining kinds of the error taxonomy (structurally/transiently
/// unschedulable, host spawn failure, stale host event) never reach a caller
/// as a `Result` — they are internal dispatch-loop and listener control flow,
/// realized as state transitions, log statements and metrics.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ServiceError {
    #[error("unknown flavor id {0}")]
    UnknownFlavor(Id),
    #[error("unknown image id {0}")]
    UnknownImage(Id),
    #[error("cpu count must be positive, got {0}")]
    NonPositiveCpuCount(i64),
    #[error("the client is closed")]
    ClientClosed,
    #[error("the service is closed")]
    ServiceClosed,
}
