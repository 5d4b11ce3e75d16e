//! Server (VM) identity and lifecycle state.

use std::fmt::{Display, Formatter};
use std::rc::Rc;

use dslab_core::component::Id as HostId;
use serde::Serialize;

use crate::core::common::{Id, Labels};
use crate::core::flavor::Flavor;
use crate::core::image::Image;

/// Lifecycle state of a server (§3).
///
/// `PROVISIONING -> RUNNING` on a successful host spawn, `RUNNING ->
/// TERMINATED | ERROR` on host completion, any state `-> DELETED` on
/// explicit removal. Once a server reaches `TERMINATED`, `ERROR` or
/// `DELETED` it is terminal: no further transition is observable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ServerState {
    Provisioning,
    Running,
    Terminated,
    Error,
    Deleted,
}

impl ServerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServerState::Terminated | ServerState::Error | ServerState::Deleted)
    }
}

impl Display for ServerState {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            ServerState::Provisioning => write!(f, "provisioning"),
            ServerState::Running => write!(f, "running"),
            ServerState::Terminated => write!(f, "terminated"),
            ServerState::Error => write!(f, "error"),
            ServerState::Deleted => write!(f, "deleted"),
        }
    }
}

/// A virtual machine as tracked by the service registry.
pub struct Server {
    pub id: Id,
    pub name: String,
    pub flavor: Rc<Flavor>,
    pub image: Rc<Image>,
    pub labels: Labels,
    pub meta: Labels,
    state: ServerState,
    host: Option<HostId>,
}

impl Server {
    pub fn new(id: Id, name: String, flavor: Rc<Flavor>, image: Rc<Image>, labels: Labels, meta: Labels) -> Self {
        Self {
            id,
            name,
            flavor,
            image,
            labels,
            meta,
            state: ServerState::Provisioning,
            host: None,
        }
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub fn host(&self) -> Option<HostId> {
        self.host
    }

    /// Assigns the host a dispatch attempt is targeting. Set speculatively
    /// before the host's accept/reject is known (§4.F step 5), so that a
    /// later terminal event from that host is not mistaken for stale (§4.J).
    pub fn set_host(&mut self, host: Option<HostId>) {
        if self.state.is_terminal() {
            return;
        }
        self.host = host;
    }

    /// Transitions to a new state. No-op once terminal (§8 invariant 7).
    pub fn set_state(&mut self, state: ServerState) {
        if self.state.is_terminal() {
            return;
        }
        self.state = state;
    }
}
