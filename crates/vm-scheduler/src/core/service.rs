//! The scheduling core: dispatch loop (§4.F), registries (§4.G), quantum
//! timer (§4.E) and host listener (§4.J), all wired onto a single
//! `EventHandler` component.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use dslab_core::async_core::shared_state::DetailsKey;
use dslab_core::cast;
use dslab_core::component::Id as HostId;
use dslab_core::context::SimulationContext;
use dslab_core::event::{Event, EventData};
use dslab_core::handler::EventHandler;
use dslab_core::{log_debug, log_trace, log_warn};

use crate::core::allocation_policy::AllocationPolicy;
use crate::core::common::{Id, IdGenerator, Labels, ServiceError};
use crate::core::config::SchedulingConfig;
use crate::core::events::{DispatchTick, HostSpawnResult, HostStateChangedEvt, VmStateChangedEvt};
use crate::core::flavor::Flavor;
use crate::core::host::{Host, HostState};
use crate::core::host_view::HostView;
use crate::core::image::Image;
use crate::core::metrics::{Counters, MetricsAvailable, MetricsBus};
use crate::core::queue::{SchedulingQueue, SchedulingRequest};
use crate::core::vm::{Server, ServerState};

fn host_spawn_result_vm_id(data: &dyn EventData) -> DetailsKey {
    data.downcast_ref::<HostSpawnResult>().unwrap().vm_id as DetailsKey
}

/// The scheduling core component (§2 components F/G/H-anchor/I/J in one).
pub struct Service {
    id: HostId,
    ctx: SimulationContext,
    config: Rc<SchedulingConfig>,
    policy: Box<dyn AllocationPolicy>,

    flavors: HashMap<Id, Rc<Flavor>>,
    images: HashMap<Id, Rc<Image>>,
    servers: HashMap<Id, Rc<RefCell<Server>>>,
    request_by_vm: HashMap<Id, Rc<SchedulingRequest>>,

    host_views: HashMap<HostId, Rc<RefCell<HostView>>>,
    available_hosts: HashSet<HostId>,
    max_cores: u32,
    max_memory: u64,

    queue: SchedulingQueue,
    dispatch_pending: bool,

    // Touched by `place`'s `&self` continuation after its await point, so
    // these two need interior mutability even though every other field is
    // mutated only from `&mut self` methods invoked through `EventHandler::on`.
    active_servers: RefCell<HashSet<Id>>,
    counters: RefCell<Counters>,

    metrics: MetricsBus,
    closed: bool,
}

impl Service {
    pub fn new(ctx: SimulationContext, config: Rc<SchedulingConfig>, policy: Box<dyn AllocationPolicy>) -> Self {
        ctx.register_details_getter_for::<HostSpawnResult>(host_spawn_result_vm_id);
        Self {
            id: ctx.id(),
            ctx,
            config,
            policy,
            flavors: HashMap::new(),
            images: HashMap::new(),
            servers: HashMap::new(),
            request_by_vm: HashMap::new(),
            host_views: HashMap::new(),
            available_hosts: HashSet::new(),
            max_cores: 0,
            max_memory: 0,
            queue: SchedulingQueue::new(),
            dispatch_pending: false,
            active_servers: RefCell::new(HashSet::new()),
            counters: RefCell::new(Counters::default()),
            metrics: MetricsBus::default(),
            closed: false,
        }
    }

    pub fn id(&self) -> HostId {
        self.id
    }

    // ---- host registry (§4.A/§4.G, §6 addHost/removeHost/hosts/hostCount) ----

    /// Idempotent: registering an already-known host is a no-op (§8 invariant 5).
    pub fn add_host(&mut self, host: Rc<RefCell<dyn Host>>) -> HostId {
        let host_id = host.borrow().id();
        if self.host_views.contains_key(&host_id) {
            return host_id;
        }
        host.borrow_mut().add_listener(self.id);
        let model = host.borrow().model();
        self.max_cores = self.max_cores.max(model.cpu_count);
        self.max_memory = self.max_memory.max(model.memory_size);
        let up = host.borrow().state() == HostState::Up;
        self.host_views.insert(host_id, Rc::new(RefCell::new(HostView::new(host_id, host))));
        if up {
            self.available_hosts.insert(host_id);
        }
        log_debug!(self.ctx, "host {} registered (up={})", host_id, up);
        self.emit_metrics();
        self.request_cycle();
        host_id
    }

    pub fn remove_host(&mut self, host_id: HostId) {
        if let Some(view) = self.host_views.remove(&host_id) {
            view.borrow().host.borrow_mut().remove_listener(self.id);
        }
        self.available_hosts.remove(&host_id);
        self.emit_metrics();
    }

    pub fn hosts(&self) -> Vec<HostId> {
        self.host_views.keys().copied().collect()
    }

    pub fn host_count(&self) -> usize {
        self.host_views.len()
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn events(&self) -> tokio::sync::broadcast::Receiver<MetricsAvailable> {
        self.metrics.subscribe()
    }

    // ---- client-facade operations (§4.H), delegated to by `Client` ----

    pub(crate) fn new_flavor(
        &mut self,
        name: String,
        cpu_count: i64,
        memory_size: u64,
        labels: Labels,
        meta: Labels,
    ) -> Result<Rc<Flavor>, ServiceError> {
        if self.closed {
            return Err(ServiceError::ServiceClosed);
        }
        if cpu_count < 1 {
            return Err(ServiceError::NonPositiveCpuCount(cpu_count));
        }
        let id = IdGenerator::next(&self.ctx);
        let flavor = Rc::new(Flavor {
            id,
            name,
            cpu_count: cpu_count as u32,
            memory_size,
            labels,
            meta,
        });
        self.flavors.insert(id, flavor.clone());
        Ok(flavor)
    }

    pub(crate) fn find_flavor(&self, id: Id) -> Option<Rc<Flavor>> {
        self.flavors.get(&id).cloned()
    }

    pub(crate) fn query_flavors(&self) -> Vec<Rc<Flavor>> {
        self.flavors.values().cloned().collect()
    }

    pub(crate) fn new_image(&mut self, name: String, labels: Labels, meta: Labels) -> Result<Rc<Image>, ServiceError> {
        if self.closed {
            return Err(ServiceError::ServiceClosed);
        }
        let id = IdGenerator::next(&self.ctx);
        let image = Rc::new(Image { id, name, labels, meta });
        self.images.insert(id, image.clone());
        Ok(image)
    }

    pub(crate) fn find_image(&self, id: Id) -> Option<Rc<Image>> {
        self.images.get(&id).cloned()
    }

    pub(crate) fn query_images(&self) -> Vec<Rc<Image>> {
        self.images.values().cloned().collect()
    }

    /// `submittedVms` is incremented unconditionally; `queuedVms` only when
    /// `start` (§4.H, §9 — the recommended resolution of the accounting
    /// ambiguity in the source).
    pub(crate) fn new_server(
        &mut self,
        name: String,
        image_id: Id,
        flavor_id: Id,
        labels: Labels,
        meta: Labels,
        start: bool,
    ) -> Result<Rc<RefCell<Server>>, ServiceError> {
        if self.closed {
            return Err(ServiceError::ServiceClosed);
        }
        let flavor = self.flavors.get(&flavor_id).cloned().ok_or(ServiceError::UnknownFlavor(flavor_id))?;
        let image = self.images.get(&image_id).cloned().ok_or(ServiceError::UnknownImage(image_id))?;
        let id = IdGenerator::next(&self.ctx);
        let server = Rc::new(RefCell::new(Server::new(id, name, flavor, image, labels, meta)));
        self.servers.insert(id, server.clone());
        self.counters.borrow_mut().submitted_vms += 1;
        if start {
            self.counters.borrow_mut().queued_vms += 1;
            let request = SchedulingRequest::new(id);
            self.request_by_vm.insert(id, request.clone());
            self.queue.push(request);
            self.request_cycle();
        }
        self.emit_metrics();
        Ok(server)
    }

    pub(crate) fn find_server(&self, id: Id) -> Option<Rc<RefCell<Server>>> {
        self.servers.get(&id).cloned()
    }

    pub(crate) fn query_servers(&self) -> Vec<Rc<RefCell<Server>>> {
        self.servers.values().cloned().collect()
    }

    /// Cancels a still-queued request (§4.D). Reaped lazily at the queue head.
    pub(crate) fn cancel_server(&mut self, id: Id) {
        if let Some(request) = self.request_by_vm.get(&id) {
            request.cancel();
        }
    }

    /// `delete(server)` is the only operation that removes a server from the
    /// registry (§9); terminal-state transitions alone never do.
    pub(crate) fn delete_server(&mut self, id: Id) -> Result<(), ServiceError> {
        if self.closed {
            return Err(ServiceError::ServiceClosed);
        }
        let Some(server) = self.servers.get(&id).cloned() else {
            return Ok(());
        };
        if server.borrow().state().is_terminal() {
            self.servers.remove(&id);
            return Ok(());
        }
        if let Some(request) = self.request_by_vm.remove(&id) {
            request.cancel();
        }
        if self.active_servers.borrow_mut().remove(&id) {
            if let Some(host_id) = server.borrow().host() {
                if let Some(view) = self.host_views.get(&host_id) {
                    view.borrow_mut().release(&server.borrow().flavor);
                }
            }
            let mut c = self.counters.borrow_mut();
            c.running_vms = c.running_vms.saturating_sub(1);
        }
        server.borrow_mut().set_state(ServerState::Deleted);
        self.servers.remove(&id);
        self.emit_metrics();
        Ok(())
    }

    // ---- quantum timer (§4.E) ----

    fn request_cycle(&mut self) {
        if self.dispatch_pending || self.queue.is_empty() {
            return;
        }
        let now = self.ctx.time();
        let quantum = self.config.scheduling_quantum_ms;
        let delay = quantum - (now % quantum);
        self.dispatch_pending = true;
        self.ctx.emit_self(DispatchTick {}, delay);
    }

    // ---- dispatch loop (§4.F) ----

    fn dispatch_pass(&mut self) {
        loop {
            let Some(request) = self.queue.peek() else {
                break;
            };
            if request.is_cancelled() {
                self.queue.pop();
                self.request_by_vm.remove(&request.vm_id);
                let mut c = self.counters.borrow_mut();
                c.queued_vms = c.queued_vms.saturating_sub(1);
                drop(c);
                self.emit_metrics();
                continue;
            }
            let Some(server) = self.servers.get(&request.vm_id).cloned() else {
                self.queue.pop();
                self.request_by_vm.remove(&request.vm_id);
                continue;
            };
            let flavor = server.borrow().flavor.clone();
            let candidates: Vec<Rc<RefCell<HostView>>> = self
                .available_hosts
                .iter()
                .filter_map(|host_id| self.host_views.get(host_id).cloned())
                .collect();
            // The policy is trusted to check fit, but a custom implementation
            // might not: verify independently before committing (§4.F step 3).
            let selected = self.policy.select(&candidates, &server.borrow()).filter(|host_id| {
                self.host_views
                    .get(host_id)
                    .map(|view| view.borrow().host.borrow().can_fit(&server.borrow()))
                    .unwrap_or(false)
            });

            match selected {
                Some(host_id) => {
                    self.queue.pop();
                    self.request_by_vm.remove(&request.vm_id);
                    let mut c = self.counters.borrow_mut();
                    c.queued_vms = c.queued_vms.saturating_sub(1);
                    drop(c);
                    let view = self.host_views.get(&host_id).unwrap().clone();
                    view.borrow_mut().reserve(&flavor);
                    log_debug!(self.ctx, "dispatching vm {} to host {}", request.vm_id, host_id);
                    self.emit_metrics();
                    self.ctx.spawn(self.place(host_id, server, view));
                }
                None if flavor.memory_size > self.max_memory || flavor.cpu_count > self.max_cores => {
                    self.queue.pop();
                    self.request_by_vm.remove(&request.vm_id);
                    let mut c = self.counters.borrow_mut();
                    c.queued_vms = c.queued_vms.saturating_sub(1);
                    c.unscheduled_vms += 1;
                    drop(c);
                    server.borrow_mut().set_state(ServerState::Error);
                    log_warn!(self.ctx, "vm {} is structurally unschedulable", request.vm_id);
                    self.emit_metrics();
                }
                None => {
                    // Fleet merely saturated: the request was only peeked, so
                    // it is still at the head; stop the pass without popping
                    // it and let the next capacity-releasing event retry.
                    log_trace!(self.ctx, "fleet saturated, leaving vm {} queued", request.vm_id);
                    break;
                }
            }
        }
    }

    /// Launches the asynchronous host-spawn attempt for a dequeued request
    /// (§4.F step 5). Spawned via `ctx.spawn`, which extends this `&self`
    /// borrow past the `&mut self` call in `dispatch_pass` — sound only
    /// because `Service` lives in `Rc<RefCell<Service>>` for the run's
    /// entire duration and is never moved (dslab-core's own invariant for
    /// spawning component methods as tasks).
    async fn place(&self, host_id: HostId, server: Rc<RefCell<Server>>, view: Rc<RefCell<HostView>>) {
        let vm_id = server.borrow().id;
        // Assigned before the outcome is known so a later terminal event for
        // this host is not mistaken for stale even if the spawn is rejected.
        server.borrow_mut().set_host(Some(host_id));
        let host = view.borrow().host.clone();
        host.borrow_mut().spawn(server.clone(), self.id);

        let (_, result) = self
            .ctx
            .async_detailed_handle_event::<HostSpawnResult>(host_id, vm_id as DetailsKey)
            .await;

        if result.accepted {
            self.active_servers.borrow_mut().insert(vm_id);
            server.borrow_mut().set_state(ServerState::Running);
            self.counters.borrow_mut().running_vms += 1;
            log_debug!(self.ctx, "vm {} is now running on host {}", vm_id, host_id);
            self.emit_metrics();
        } else {
            view.borrow_mut().release(&server.borrow().flavor);
            log_warn!(self.ctx, "host {} rejected spawn of vm {}", host_id, vm_id);
            self.emit_metrics();
            // Server stays Provisioning; the host will emit a terminal Error
            // event shortly, completing the lifecycle in `on_vm_state_changed`.
        }
    }

    // ---- host listener (§4.J) ----

    fn on_host_state_changed(&mut self, host_id: HostId, up: bool) {
        if !self.host_views.contains_key(&host_id) {
            // Preserve source behavior: a host must be added before its
            // events are honored (§9).
            return;
        }
        if up {
            self.available_hosts.insert(host_id);
        } else {
            self.available_hosts.remove(&host_id);
        }
        self.emit_metrics();
        self.request_cycle();
    }

    fn on_vm_state_changed(&mut self, host_id: HostId, vm_id: Id, new_state: ServerState) {
        let Some(server) = self.servers.get(&vm_id).cloned() else {
            return;
        };
        if server.borrow().host() != Some(host_id) {
            // StaleHostEvent: no longer owned by the host this arrived from.
            log_trace!(self.ctx, "ignoring stale vm state event for {} from host {}", vm_id, host_id);
            return;
        }
        if !matches!(new_state, ServerState::Terminated | ServerState::Error) {
            return;
        }
        server.borrow_mut().set_state(new_state);
        let was_active = self.active_servers.borrow_mut().remove(&vm_id);
        let mut c = self.counters.borrow_mut();
        if was_active {
            if let Some(view) = self.host_views.get(&host_id) {
                view.borrow_mut().release(&server.borrow().flavor);
            }
            c.running_vms = c.running_vms.saturating_sub(1);
            c.finished_vms += 1;
        } else {
            // Never reached Running: the tail of a HostSpawnFailure.
            c.unscheduled_vms += 1;
        }
        drop(c);
        self.emit_metrics();
        self.request_cycle();
    }

    fn emit_metrics(&self) {
        let c = *self.counters.borrow();
        self.metrics.publish(MetricsAvailable {
            host_count: self.host_views.len(),
            available_host_count: self.available_hosts.len(),
            submitted_vms: c.submitted_vms,
            running_vms: c.running_vms,
            finished_vms: c.finished_vms,
            queued_vms: c.queued_vms,
            unscheduled_vms: c.unscheduled_vms,
        });
    }
}

impl EventHandler for Service {
    fn on(&mut self, event: Event) {
        if self.closed {
            return;
        }
        let host_id = event.src;
        cast!(match event.data {
            DispatchTick {} => {
                self.dispatch_pending = false;
                self.dispatch_pass();
            }
            HostStateChangedEvt { up } => {
                self.on_host_state_changed(host_id, up);
            }
            VmStateChangedEvt { vm_id, state } => {
                self.on_vm_state_changed(host_id, vm_id, state);
            }
        })
    }
}
