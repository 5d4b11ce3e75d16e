//! Component identifiers.

/// Identifier of a simulation component, unique within a [`Simulation`](crate::Simulation).
pub type Id = u32;
