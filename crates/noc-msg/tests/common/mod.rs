//! Shared fixtures for the engine integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;

use noc_hal_mock::MockHal;
use noc_msg::{
    AppId, EngineConfig, Halt, HandshakePacket, InputPipe, KernelBuffer, KernelPipes,
    LocationCache, LocationEntry, Mailbox, MessageEngine, Migration, Observer, OutputPipe,
    PeAddress, RpcDispatcher, Scheduler, Service, TaskHandle, TaskId, TaskTable, TelemetryRecord,
    TelemetrySink,
};

// ============================================================================
// Fixtures
// ============================================================================

/// The PE under test
pub const LOCAL: PeAddress = PeAddress::from_xy(1, 1);
/// A PE three hops away
pub const REMOTE: PeAddress = PeAddress::from_xy(3, 2);

pub const PRODUCER: TaskId = TaskId::new(AppId(1), 1);
pub const CONSUMER: TaskId = TaskId::new(AppId(1), 2);

pub fn engine() -> MessageEngine<MockHal> {
    engine_at(LOCAL)
}

pub fn engine_at(address: PeAddress) -> MessageEngine<MockHal> {
    MessageEngine::new(MockHal::new(address.0), EngineConfig::default()).unwrap()
}

pub fn handshake(
    service: Service,
    source: PeAddress,
    target: PeAddress,
    sender: TaskId,
    receiver: TaskId,
) -> [u8; HandshakePacket::WIRE_LEN] {
    HandshakePacket::new(service, source, target, sender, receiver).encode()
}

// ============================================================================
// Mock kernel
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wait {
    Running,
    DataAvailable,
    Request,
    Delivery,
}

pub struct MockTask {
    pub id: TaskId,
    pub generation: u32,
    pub alive: bool,
    pub mailbox: Mailbox,
    pub output: Option<OutputPipe>,
    pub input: Option<InputPipe>,
    pub wait: Wait,
    pub migrate: bool,
    pub exited: bool,
}

pub struct MockKernel {
    pub tasks: Vec<MockTask>,
    pub caches: BTreeMap<AppId, LocationCache>,
    pub migrated: BTreeMap<TaskId, PeAddress>,
    pub kernel_buffers: Vec<KernelBuffer>,
    pub halt_requested: bool,
    pub halt_ready: bool,
    pub halted: bool,
    pub rpc_status: i32,
    pub rpc_calls: Vec<Vec<u8>>,
    pub records: Vec<(Observer, TelemetryRecord)>,
    pub migrations: Vec<TaskId>,
    pub terminated: Vec<TaskId>,
    pub idle: bool,
}

impl MockKernel {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            caches: BTreeMap::new(),
            migrated: BTreeMap::new(),
            kernel_buffers: Vec::new(),
            halt_requested: false,
            halt_ready: false,
            halted: false,
            rpc_status: 0,
            rpc_calls: Vec::new(),
            records: Vec::new(),
            migrations: Vec::new(),
            terminated: Vec::new(),
            idle: false,
        }
    }

    /// Start a task on this PE
    pub fn add_task(&mut self, id: TaskId) -> TaskHandle {
        self.caches
            .entry(id.app())
            .or_insert_with(|| LocationCache::new(id.app()));
        self.tasks.push(MockTask {
            id,
            generation: 1,
            alive: true,
            mailbox: Mailbox::new(),
            output: None,
            input: None,
            wait: Wait::Running,
            migrate: false,
            exited: false,
        });
        TaskHandle {
            slot: (self.tasks.len() - 1) as u32,
            generation: 1,
        }
    }

    /// Start a task blocked in a read with a receive window of `capacity`
    pub fn add_reader(&mut self, id: TaskId, capacity: usize) -> TaskHandle {
        let handle = self.add_task(id);
        let task = self.task_mut(id);
        task.input = Some(InputPipe::new(capacity));
        task.wait = Wait::Delivery;
        handle
    }

    /// Record where a task of some application runs
    pub fn set_location(&mut self, id: TaskId, address: PeAddress) {
        self.caches
            .entry(id.app())
            .or_insert_with(|| LocationCache::new(id.app()))
            .insert(id, address);
    }

    pub fn task(&self, id: TaskId) -> &MockTask {
        self.tasks.iter().find(|t| t.id == id).unwrap()
    }

    pub fn task_mut(&mut self, id: TaskId) -> &mut MockTask {
        self.tasks.iter_mut().find(|t| t.id == id).unwrap()
    }

    fn slot(&self, handle: TaskHandle) -> Option<&MockTask> {
        self.tasks
            .get(handle.slot as usize)
            .filter(|t| t.alive && t.generation == handle.generation)
    }

    fn slot_mut(&mut self, handle: TaskHandle) -> Option<&mut MockTask> {
        self.tasks
            .get_mut(handle.slot as usize)
            .filter(|t| t.alive && t.generation == handle.generation)
    }
}

impl Default for MockKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskTable for MockKernel {
    fn resolve(&self, id: TaskId) -> Option<TaskHandle> {
        self.tasks
            .iter()
            .position(|t| t.alive && t.id == id)
            .map(|slot| TaskHandle {
                slot: slot as u32,
                generation: self.tasks[slot].generation,
            })
    }

    fn mailbox_mut(&mut self, task: TaskHandle) -> Option<&mut Mailbox> {
        self.slot_mut(task).map(|t| &mut t.mailbox)
    }

    fn location_cache_mut(&mut self, task: TaskHandle) -> Option<&mut LocationCache> {
        let app = self.slot(task)?.id.app();
        self.caches.get_mut(&app)
    }

    fn output_pipe(&self, task: TaskHandle) -> Option<&OutputPipe> {
        self.slot(task)?.output.as_ref()
    }

    fn set_output_pipe(&mut self, task: TaskHandle, pipe: OutputPipe) {
        if let Some(t) = self.slot_mut(task) {
            t.output = Some(pipe);
        }
    }

    fn take_output_pipe(&mut self, task: TaskHandle) -> Option<OutputPipe> {
        self.slot_mut(task)?.output.take()
    }

    fn input_pipe_mut(&mut self, task: TaskHandle) -> Option<&mut InputPipe> {
        self.slot_mut(task)?.input.as_mut()
    }

    fn needs_migration(&self, task: TaskHandle) -> bool {
        self.slot(task).is_some_and(|t| t.migrate)
    }

    fn has_called_exit(&self, task: TaskHandle) -> bool {
        self.slot(task).is_some_and(|t| t.exited)
    }

    fn terminate(&mut self, task: TaskHandle) {
        if let Some(t) = self.slot_mut(task) {
            t.alive = false;
            let id = t.id;
            self.terminated.push(id);
        }
    }
}

impl Scheduler for MockKernel {
    fn is_waiting_data_available(&self, task: TaskHandle) -> bool {
        self.slot(task).is_some_and(|t| t.wait == Wait::DataAvailable)
    }

    fn is_waiting_request(&self, task: TaskHandle) -> bool {
        self.slot(task).is_some_and(|t| t.wait == Wait::Request)
    }

    fn release_wait(&mut self, task: TaskHandle) {
        if let Some(t) = self.slot_mut(task) {
            t.wait = Wait::Running;
        }
    }

    fn is_idle(&self) -> bool {
        self.idle
    }
}

impl Migration for MockKernel {
    fn last_known_location(&self, id: TaskId) -> Option<LocationEntry> {
        self.migrated.get(&id).map(|&address| LocationEntry { peer: id, address })
    }

    fn migrate(&mut self, task: TaskHandle) {
        if let Some(t) = self.slot(task) {
            let id = t.id;
            self.migrations.push(id);
        }
    }
}

impl KernelPipes for MockKernel {
    fn find_kernel_buffer(&self, consumer: TaskId) -> Option<&KernelBuffer> {
        self.kernel_buffers.iter().find(|b| b.consumer == consumer)
    }

    fn remove_kernel_buffer(&mut self, consumer: TaskId) -> Option<KernelBuffer> {
        let pos = self.kernel_buffers.iter().position(|b| b.consumer == consumer)?;
        Some(self.kernel_buffers.remove(pos))
    }
}

impl Halt for MockKernel {
    fn halt_pending(&self) -> bool {
        self.halt_requested
    }

    fn try_halt(&mut self) -> bool {
        self.halted = self.halt_ready;
        self.halted
    }

    fn clear_halt(&mut self) {
        self.halt_requested = false;
    }
}

impl RpcDispatcher for MockKernel {
    fn dispatch_rpc(&mut self, message: &[u8]) -> i32 {
        self.rpc_calls.push(message.to_vec());
        self.rpc_status
    }
}

impl TelemetrySink for MockKernel {
    fn emit_record(&mut self, observer: &Observer, record: &TelemetryRecord) {
        self.records.push((*observer, *record));
    }
}
