//! HostView (§4.B): the scheduler-side mirror of a registered host.

use std::cell::RefCell;
use std::rc::Rc;

use dslab_core::component::Id as HostId;

use crate::core::flavor::Flavor;
use crate::core::host::{Host, HostModel};

/// Live counters the scheduler keeps per registered host, updated only from
/// the scheduler's own cooperative task (§5) — never concurrently.
///
/// `provisioned_cores` equals the sum of `flavor.cpu_count` over servers
/// currently assigned to this host; `available_memory` equals
/// `host.model.memory_size` minus the sum of their `flavor.memory_size`.
pub struct HostView {
    pub host_id: HostId,
    pub host: Rc<RefCell<dyn Host>>,
    model: HostModel,
    pub number_of_active_servers: u32,
    pub provisioned_cores: u32,
    pub available_memory: u64,
}

impl HostView {
    pub fn new(host_id: HostId, host: Rc<RefCell<dyn Host>>) -> Self {
        let model = host.borrow().model();
        Self {
            host_id,
            host,
            model,
            number_of_active_servers: 0,
            provisioned_cores: 0,
            available_memory: model.memory_size,
        }
    }

    pub fn model(&self) -> HostModel {
        self.model
    }

    pub fn has_capacity_for(&self, flavor: &Flavor) -> bool {
        self.provisioned_cores + flavor.cpu_count <= self.model.cpu_count && flavor.memory_size <= self.available_memory
    }

    /// Speculative reservation, applied before `host.spawn` is awaited
    /// (§4.B) so a single dispatch pass never over-commits a host.
    pub fn reserve(&mut self, flavor: &Flavor) {
        self.number_of_active_servers += 1;
        self.provisioned_cores += flavor.cpu_count;
        self.available_memory -= flavor.memory_size;
    }

    /// Reverses a reservation, on spawn failure or VM termination.
    pub fn release(&mut self, flavor: &Flavor) {
        self.number_of_active_servers = self.number_of_active_servers.saturating_sub(1);
        self.provisioned_cores = self.provisioned_cores.saturating_sub(flavor.cpu_count);
        self.available_memory += flavor.memory_size;
    }
}
