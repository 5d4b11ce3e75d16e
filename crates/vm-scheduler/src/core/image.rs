//! VM image: an immutable, opaque identity servers are created from.

use serde::Serialize;

use crate::core::common::{Id, Labels};

/// Immutable image record. The core never inspects image contents; it is
/// opaque identity plus labels/metadata, consumed only by `host.spawn`.
#[derive(Serialize, Clone)]
pub struct Image {
    pub id: Id,
    pub name: String,
    pub labels: Labels,
    pub meta: Labels,
}
