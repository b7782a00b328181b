//! Error types for ttyline.
//!
//! Timeouts are kept apart from every other failure: a readiness wait that
//! expires is a routine outcome for code that polls a device, while the
//! [`OperationError`] variants point at misconfiguration, a lost device or an
//! OS-level failure.

use std::io;

use nix::errno::Errno;
use thiserror::Error;

use crate::port::ControlLine;

/// Result type for ttyline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for ttyline operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The readiness wait expired before data arrived.
    #[error("Timeout while waiting for data")]
    Timeout,

    /// Any failure other than a timeout.
    #[error(transparent)]
    Operation(#[from] OperationError),
}

impl Error {
    /// Returns `true` for [`Error::Timeout`].
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` when a signal interrupted the readiness wait or the read.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        match self {
            Self::Operation(OperationError::PollFailed(errno)) => *errno == Errno::EINTR,
            Self::Operation(OperationError::ReadFailed(e)) => {
                e.kind() == io::ErrorKind::Interrupted
            },
            _ => false,
        }
    }

    /// Returns the hard-error reason, or `None` for a timeout.
    #[must_use]
    pub fn operation(&self) -> Option<&OperationError> {
        match self {
            Self::Timeout => None,
            Self::Operation(e) => Some(e),
        }
    }
}

/// Reason for a failed port operation.
#[derive(Debug, Error)]
pub enum OperationError {
    /// `open()` was called on a port that is already open.
    #[error("Serial port is already open")]
    AlreadyOpen,

    /// `close()` was called on a port that is not open.
    #[error("Serial port is already closed")]
    AlreadyClosed,

    /// An I/O or control-line operation was issued on a closed port.
    #[error("Serial port is closed")]
    NotOpen,

    /// The device node could not be opened.
    #[error("Unable to open serial port {path}: {source}")]
    OpenFailed {
        /// Device path that was opened.
        path: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Another holder has the exclusive advisory lock on the device.
    #[error("Serial port {path} is already locked by another process")]
    PortLocked {
        /// Device path that was locked.
        path: String,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },

    /// The stored baud rate is not in the supported table.
    #[error("Baud rate {0} is not supported")]
    UnsupportedBaudRate(u32),

    /// Reading or writing the terminal attributes failed.
    #[error("Failed to configure serial port: {0}")]
    ConfigFailed(#[source] Errno),

    /// Discarding queued input or output failed.
    #[error("Unable to flush serial port buffers: {0}")]
    FlushFailed(#[source] Errno),

    /// Releasing the lock or the device handle failed.
    #[error("Unable to close serial port: {0}")]
    CloseFailed(#[source] Errno),

    /// The OS rejected a write.
    #[error("Unable to write data on serial port: {0}")]
    WriteFailed(#[source] io::Error),

    /// The OS read returned an error or no data after signalling readiness.
    #[error("Unable to read data on serial port: {0}")]
    ReadFailed(#[source] io::Error),

    /// The readiness wait itself failed.
    #[error("Waiting for serial port data failed: {0}")]
    PollFailed(#[source] Errno),

    /// A modem-control ioctl failed.
    #[error("Unable to access {line} line: {source}")]
    ControlLineFailed {
        /// Line being written or read.
        line: ControlLine,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },

    /// A line did not fit in the readline buffer.
    #[error("Received line does not fit in {capacity} byte buffer")]
    BufferOverflow {
        /// Buffer capacity in bytes, including the reserved terminator slot.
        capacity: usize,
    },
}
