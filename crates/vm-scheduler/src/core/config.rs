//! Scheduling core configuration (§10.4). Deliberately small: the on-disk
//! YAML layout, CLI flags and environment variables that the experiment
//! harness builds on top of this are out of scope (§1).

use serde::{Deserialize, Serialize};

/// Tunables the service is constructed with (§6 `newService`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchedulingConfig {
    /// Dispatch passes occur only at simulated times that are a multiple of
    /// this quantum (§4.E).
    pub scheduling_quantum_ms: f64,
    /// Trip time applied to every event the service emits to itself or to
    /// hosts, mirroring the engine's own `message_delay` convention.
    pub message_delay: f64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            scheduling_quantum_ms: 1000.,
            message_delay: 0.2,
        }
    }
}
