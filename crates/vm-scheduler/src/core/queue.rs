//! Scheduling queue & request (§4.D): a plain FIFO with lazily-reaped
//! cancellations.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::core::common::Id as VmId;

/// A pending placement request for exactly one server. `cancelled` can be
/// set at any time; the request is only actually dropped once it reaches
/// the head of the queue (§4.D, §7 `TransientlyUnschedulable`/cancellation).
pub struct SchedulingRequest {
    pub vm_id: VmId,
    cancelled: Cell<bool>,
}

impl SchedulingRequest {
    pub fn new(vm_id: VmId) -> Rc<Self> {
        Rc::new(Self {
            vm_id,
            cancelled: Cell::new(false),
        })
    }

    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

/// FIFO of pending requests, no priority reordering (§4.D).
#[derive(Default)]
pub struct SchedulingQueue {
    requests: VecDeque<Rc<SchedulingRequest>>,
}

impl SchedulingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, request: Rc<SchedulingRequest>) {
        self.requests.push_back(request);
    }

    pub fn peek(&self) -> Option<Rc<SchedulingRequest>> {
        self.requests.front().cloned()
    }

    pub fn pop(&mut self) -> Option<Rc<SchedulingRequest>> {
        self.requests.pop_front()
    }

    /// Non-cancelled requests still sitting in the queue — used for the
    /// `queuedVms` counter-consistency invariant (§8 invariant 1).
    pub fn len_not_cancelled(&self) -> usize {
        self.requests.iter().filter(|r| !r.is_cancelled()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
