//! Engine errors and handler outcomes

use noc_hal::HalError;
use thiserror::Error;

const EIO: i32 = 5;
const ENOMEM: i32 = 12;
const EBUSY: i32 = 16;
const EINVAL: i32 = 22;
const ENODATA: i32 = 61;
const EBADMSG: i32 = 74;

/// Errors surfaced by the message engine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum MsgError {
    /// A task or pipe could not be resolved and no migration mapping exists
    #[error("task or pipe cannot be resolved")]
    InvalidTask,
    /// A request arrived before anything was produced for it
    #[error("no data produced for this request")]
    NoData,
    /// A pending entry, queued packet or receive buffer could not be allocated
    #[error("out of memory")]
    OutOfMemory,
    /// The producer's output pipe still holds an undelivered message
    #[error("output pipe is busy")]
    PipeBusy,
    /// A header could not be decoded
    #[error("malformed packet header")]
    InvalidPacket,
    /// The network interface refused a packet
    #[error("network interface error: {0}")]
    Hal(#[from] HalError),
    /// The RPC dispatcher reported a failure status
    #[error("rpc dispatcher returned {0}")]
    Rpc(i32),
}

impl MsgError {
    /// Negative errno form used by the integer ABI
    pub fn code(self) -> i32 {
        match self {
            MsgError::InvalidTask => -EINVAL,
            MsgError::NoData => -ENODATA,
            MsgError::OutOfMemory => -ENOMEM,
            MsgError::PipeBusy => -EBUSY,
            MsgError::InvalidPacket => -EBADMSG,
            MsgError::Hal(_) => -EIO,
            MsgError::Rpc(code) => code,
        }
    }

    /// Map a negative errno back to an error
    pub fn from_code(code: i32) -> Self {
        match -code {
            EINVAL => MsgError::InvalidTask,
            ENODATA => MsgError::NoData,
            ENOMEM => MsgError::OutOfMemory,
            EBUSY => MsgError::PipeBusy,
            EBADMSG => MsgError::InvalidPacket,
            _ => MsgError::Rpc(code),
        }
    }
}

/// Result of handling one packet
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Handled; the current task keeps running
    Handled,
    /// Handled; a task was released and the scheduler is idle
    RescheduleRequired,
    /// Handled; a released task must migrate before it runs again
    MigrationPending,
    /// Not handled
    Error(MsgError),
}

impl Outcome {
    /// Integer form: 0, 1 or a negative errno
    pub fn code(self) -> i32 {
        match self {
            Outcome::Handled => 0,
            Outcome::RescheduleRequired | Outcome::MigrationPending => 1,
            Outcome::Error(e) => e.code(),
        }
    }

    /// Interpret an integer status returned by a collaborator.
    ///
    /// The integer ABI has a single "reschedule" value, so every positive
    /// status maps to `RescheduleRequired` and reads back as 1. Zero and
    /// negative statuses round-trip through [`Outcome::code`] unchanged.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Outcome::Handled,
            c if c > 0 => Outcome::RescheduleRequired,
            c => Outcome::Error(MsgError::from_code(c)),
        }
    }

    /// Split the error case out
    pub fn into_result(self) -> Result<Outcome, MsgError> {
        match self {
            Outcome::Error(e) => Err(e),
            other => Ok(other),
        }
    }
}

impl From<Result<Outcome, MsgError>> for Outcome {
    fn from(result: Result<Outcome, MsgError>) -> Self {
        result.unwrap_or_else(Outcome::Error)
    }
}
