//! Compute scheduling core: a component that accepts VM provisioning
//! requests, maintains the set of physical hosts and their live capacity
//! accounting, and dispatches pending VMs onto hosts at fixed scheduling
//! quanta under a pluggable allocation policy.

pub mod core;
