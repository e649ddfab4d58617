//! Kernel collaborators the engine drives
//!
//! The engine owns no task state. Everything it needs from the rest of the
//! kernel is reached through these traits, bundled as [`KernelServices`].
//! Handles returned by [`TaskTable::resolve`] are only trusted for the
//! duration of one handler call.

use crate::pending::{LocationCache, LocationEntry, Mailbox};
use crate::pipe::{InputPipe, KernelBuffer, OutputPipe};
use crate::telemetry::{Observer, TelemetryRecord};
use crate::types::{TaskHandle, TaskId};

/// Task and application registry
pub trait TaskTable {
    /// Resolve a task id to a task running on this PE
    fn resolve(&self, id: TaskId) -> Option<TaskHandle>;

    /// Pending-entry lists of a task
    fn mailbox_mut(&mut self, task: TaskHandle) -> Option<&mut Mailbox>;

    /// Location cache of the task's application
    fn location_cache_mut(&mut self, task: TaskHandle) -> Option<&mut LocationCache>;

    /// Message the task produced and nobody requested yet
    fn output_pipe(&self, task: TaskHandle) -> Option<&OutputPipe>;

    /// Install a produced message
    fn set_output_pipe(&mut self, task: TaskHandle, pipe: OutputPipe);

    /// Remove and return the produced message
    fn take_output_pipe(&mut self, task: TaskHandle) -> Option<OutputPipe>;

    /// Receive window of a task blocked in a read
    fn input_pipe_mut(&mut self, task: TaskHandle) -> Option<&mut InputPipe>;

    /// Whether the task has been selected for migration
    fn needs_migration(&self, task: TaskHandle) -> bool;

    /// Whether the task already called exit
    fn has_called_exit(&self, task: TaskHandle) -> bool;

    /// Release every resource of the task
    fn terminate(&mut self, task: TaskHandle);
}

/// Scheduler wait conditions
pub trait Scheduler {
    /// Task is blocked until a `DataAvailable` arrives
    fn is_waiting_data_available(&self, task: TaskHandle) -> bool;

    /// Task is blocked until its produced message is requested
    fn is_waiting_request(&self, task: TaskHandle) -> bool;

    /// Make a blocked task ready again
    fn release_wait(&mut self, task: TaskHandle);

    /// Whether only the idle task is running
    fn is_idle(&self) -> bool;
}

/// Task migration subsystem
pub trait Migration {
    /// Where a task that left this PE went
    fn last_known_location(&self, id: TaskId) -> Option<LocationEntry>;

    /// Start moving a task to its new PE
    fn migrate(&mut self, task: TaskHandle);
}

/// Messages produced by the kernel itself
pub trait KernelPipes {
    /// Kernel message waiting for `consumer`
    fn find_kernel_buffer(&self, consumer: TaskId) -> Option<&KernelBuffer>;

    /// Drop the kernel message for `consumer`
    fn remove_kernel_buffer(&mut self, consumer: TaskId) -> Option<KernelBuffer>;
}

/// Deferred PE halt
pub trait Halt {
    /// Whether a halt was requested but is waiting for kernel traffic
    fn halt_pending(&self) -> bool;

    /// Try to halt now; returns whether it succeeded
    fn try_halt(&mut self) -> bool;

    /// Forget the pending request
    fn clear_halt(&mut self);
}

/// Remote procedure calls addressed to this kernel
pub trait RpcDispatcher {
    /// Handle one kernel message; returns 0, 1 or a negative errno
    fn dispatch_rpc(&mut self, message: &[u8]) -> i32;
}

/// Destination of monitoring records
pub trait TelemetrySink {
    /// Send a record to an observer
    fn emit_record(&mut self, observer: &Observer, record: &TelemetryRecord);
}

/// Every collaborator the engine needs
pub trait KernelServices:
    TaskTable + Scheduler + Migration + KernelPipes + Halt + RpcDispatcher + TelemetrySink
{
}

impl<T> KernelServices for T where
    T: TaskTable + Scheduler + Migration + KernelPipes + Halt + RpcDispatcher + TelemetrySink
{
}
