//! VM flavor: an immutable resource shape servers are created from.

use serde::Serialize;

use crate::core::common::{Id, Labels};

/// Immutable resource shape a server is created from. CPU count is positive
/// by construction (§3 invariant): `Service::new_flavor` validates it before
/// a `Flavor` is ever built.
#[derive(Serialize, Clone)]
pub struct Flavor {
    pub id: Id,
    pub name: String,
    pub cpu_count: u32,
    pub memory_size: u64,
    pub labels: Labels,
    pub meta: Labels,
}
