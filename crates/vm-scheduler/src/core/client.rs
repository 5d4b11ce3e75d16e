//! Client facade (§4.H): a per-caller session over a shared `Service`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::core::common::{Id, Labels, ServiceError};
use crate::core::flavor::Flavor;
use crate::core::image::Image;
use crate::core::service::Service;
use crate::core::vm::Server;

/// Holds no mutable state of its own beyond a closed flag (§3 Ownership);
/// every operation delegates straight to the shared `Service`.
pub struct Client {
    service: Rc<RefCell<Service>>,
    closed: Cell<bool>,
}

/// Mints a new client session over `service` (§6 `service.newClient()`).
pub fn new_client(service: Rc<RefCell<Service>>) -> Client {
    Client {
        service,
        closed: Cell::new(false),
    }
}

impl Client {
    fn check_open(&self) -> Result<(), ServiceError> {
        if self.closed.get() {
            return Err(ServiceError::ClientClosed);
        }
        Ok(())
    }

    pub fn new_flavor(
        &self,
        name: impl Into<String>,
        cpu_count: i64,
        memory_size: u64,
        labels: Labels,
        meta: Labels,
    ) -> Result<Rc<Flavor>, ServiceError> {
        self.check_open()?;
        self.service.borrow_mut().new_flavor(name.into(), cpu_count, memory_size, labels, meta)
    }

    pub fn find_flavor(&self, id: Id) -> Result<Option<Rc<Flavor>>, ServiceError> {
        self.check_open()?;
        Ok(self.service.borrow().find_flavor(id))
    }

    pub fn query_flavors(&self) -> Result<Vec<Rc<Flavor>>, ServiceError> {
        self.check_open()?;
        Ok(self.service.borrow().query_flavors())
    }

    pub fn new_image(&self, name: impl Into<String>, labels: Labels, meta: Labels) -> Result<Rc<Image>, ServiceError> {
        self.check_open()?;
        self.service.borrow_mut().new_image(name.into(), labels, meta)
    }

    pub fn find_image(&self, id: Id) -> Result<Option<Rc<Image>>, ServiceError> {
        self.check_open()?;
        Ok(self.service.borrow().find_image(id))
    }

    pub fn query_images(&self) -> Result<Vec<Rc<Image>>, ServiceError> {
        self.check_open()?;
        Ok(self.service.borrow().query_images())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new_server(
        &self,
        name: impl Into<String>,
        image_id: Id,
        flavor_id: Id,
        labels: Labels,
        meta: Labels,
        start: bool,
    ) -> Result<Rc<RefCell<Server>>, ServiceError> {
        self.check_open()?;
        self.service.borrow_mut().new_server(name.into(), image_id, flavor_id, labels, meta, start)
    }

    pub fn find_server(&self, id: Id) -> Result<Option<Rc<RefCell<Server>>>, ServiceError> {
        self.check_open()?;
        Ok(self.service.borrow().find_server(id))
    }

    pub fn query_servers(&self) -> Result<Vec<Rc<RefCell<Server>>>, ServiceError> {
        self.check_open()?;
        Ok(self.service.borrow().query_servers())
    }

    pub fn cancel_server(&self, id: Id) -> Result<(), ServiceError> {
        self.check_open()?;
        self.service.borrow_mut().cancel_server(id);
        Ok(())
    }

    pub fn delete_server(&self, id: Id) -> Result<(), ServiceError> {
        self.check_open()?;
        self.service.borrow_mut().delete_server(id)
    }

    /// Invalidates future calls through this session. Entities the client
    /// already created are untouched (§4.H).
    pub fn close(&self) {
        self.closed.set(true);
    }
}
