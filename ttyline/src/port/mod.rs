//! Serial port handle and lifecycle.
//!
//! [`SerialPort`] is the single entity of this crate: a configured, possibly
//! open connection to a POSIX tty device. Everything else hangs off it:
//!
//! ```text
//! +---------------------------------------------+
//! |                 SerialPort                  |
//! |  settings: path / baud_rate / timeout       |
//! |  handle:   Option<Flock<File>>              |
//! +------+-------------+-------------+----------+
//!        |             |             |
//!        v             v             v
//!   line (termios)  io (poll +     modem (TIOCM*
//!   baud table,     read/write,    ioctls)
//!   raw/canonical   buffer reset)
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use ttyline::{Error, SerialPort};
//!
//! fn example() -> ttyline::Result<()> {
//!     let mut port = SerialPort::new("/dev/ttyUSB0", 115200, 1.0);
//!     port.open()?;
//!
//!     port.write(b"AB\n")?;
//!     match port.read(3) {
//!         Ok(data) => println!("Received: {data:?}"),
//!         Err(Error::Timeout) => println!("Nothing received"),
//!         Err(e) => return Err(e),
//!     }
//!
//!     port.close()
//! }
//! ```

mod io;
mod line;
mod modem;

use std::fmt;
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::IntoRawFd;
use std::thread;
use std::time::Duration;

use log::debug;
use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use nix::libc;
use nix::sys::termios::{self, FlushArg};

use crate::error::{OperationError, Result};

pub use io::READLINE_CAPACITY;
pub use line::{is_supported_baud_rate, supported_baud_rates};
pub use modem::ControlLine;

/// Time the device gets to settle between configuration and the initial flush.
const SETTLE_DELAY: Duration = Duration::from_millis(10);

/// Construction parameters of a [`SerialPort`].
///
/// Values are stored as given; nothing is validated until
/// [`SerialPort::open`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PortSettings {
    /// Device node (e.g., "/dev/ttyUSB0").
    pub path: String,
    /// Baud rate, one of [`supported_baud_rates`].
    pub baud_rate: u32,
    /// Read timeout in seconds. Negative waits indefinitely.
    pub timeout: f64,
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            path: SerialPort::DEFAULT_PATH.to_string(),
            baud_rate: SerialPort::DEFAULT_BAUD_RATE,
            timeout: SerialPort::DEFAULT_TIMEOUT,
        }
    }
}

impl PortSettings {
    /// Create settings with path and baud rate and the default timeout.
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            ..Default::default()
        }
    }

    /// Set the timeout in seconds.
    #[must_use]
    pub fn with_timeout(mut self, timeout: f64) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A POSIX serial port.
///
/// The port owns its device handle exclusively. It is neither `Clone` nor
/// `Copy`, so only one owner can ever close a given handle. Dropping an open
/// port closes it and discards any close error.
///
/// The setters ([`set_path`](Self::set_path),
/// [`set_baud_rate`](Self::set_baud_rate)) only store the new value. An open
/// handle keeps the path and speed it was opened with until the port is
/// closed and opened again. [`set_timeout`](Self::set_timeout) is the
/// exception in practice: the timeout is read at the start of every I/O call.
pub struct SerialPort {
    settings: PortSettings,
    handle: Option<Flock<File>>,
}

impl SerialPort {
    /// Default device node.
    pub const DEFAULT_PATH: &'static str = "/dev/ttyUSB0";

    /// Default baud rate.
    pub const DEFAULT_BAUD_RATE: u32 = 9600;

    /// Default read timeout in seconds.
    pub const DEFAULT_TIMEOUT: f64 = 1.0;

    /// Create a closed port.
    pub fn new(path: impl Into<String>, baud_rate: u32, timeout: f64) -> Self {
        Self::with_settings(PortSettings {
            path: path.into(),
            baud_rate,
            timeout,
        })
    }

    /// Create a closed port from stored settings.
    pub fn with_settings(settings: PortSettings) -> Self {
        Self {
            settings,
            handle: None,
        }
    }

    /// Open the device, lock it, and apply 8-N-1 raw line settings.
    ///
    /// The device is opened non-blocking without becoming the controlling
    /// terminal, then an exclusive non-blocking `flock` is taken. After the
    /// line settings are applied the port waits briefly and discards
    /// whatever is queued in both directions.
    ///
    /// On any error the port stays closed and nothing acquired is leaked.
    pub fn open(&mut self) -> Result<()> {
        if self.handle.is_some() {
            return Err(OperationError::AlreadyOpen.into());
        }

        let path = &self.settings.path;
        debug!(
            "Opening {path} at {} Bd (timeout {} s)",
            self.settings.baud_rate, self.settings.timeout
        );

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(path)
            .map_err(|source| OperationError::OpenFailed {
                path: path.clone(),
                source,
            })?;

        let device = Flock::lock(file, FlockArg::LockExclusiveNonblock)
            .map_err(|(_file, errno)| lock_error(path, errno))?;

        line::configure(&device, self.settings.baud_rate)?;

        thread::sleep(SETTLE_DELAY);
        termios::tcflush(&*device, FlushArg::TCIOFLUSH).map_err(OperationError::FlushFailed)?;

        self.handle = Some(device);
        debug!("Opened {path}");
        Ok(())
    }

    /// Unlock and close the device.
    ///
    /// The port is closed afterwards even when releasing fails.
    pub fn close(&mut self) -> Result<()> {
        let device = self
            .handle
            .take()
            .ok_or(OperationError::AlreadyClosed)?;
        debug!("Closing {}", self.settings.path);

        let file = device
            .unlock()
            .map_err(|(_device, errno)| OperationError::CloseFailed(errno))?;
        nix::unistd::close(file.into_raw_fd()).map_err(OperationError::CloseFailed)?;
        Ok(())
    }

    /// Whether the port currently holds an open device handle.
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Device path.
    pub fn path(&self) -> &str {
        &self.settings.path
    }

    /// Store a new device path.
    ///
    /// Takes effect on the next [`open`](Self::open); an open handle is not
    /// touched.
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.settings.path = path.into();
    }

    /// Stored baud rate.
    pub fn baud_rate(&self) -> u32 {
        self.settings.baud_rate
    }

    /// Store a new baud rate.
    ///
    /// The value is validated by the next [`open`](Self::open). An open
    /// handle keeps running at the speed it was opened with.
    pub fn set_baud_rate(&mut self, baud_rate: u32) {
        self.settings.baud_rate = baud_rate;
    }

    /// Read timeout in seconds; negative means no timeout.
    pub fn timeout(&self) -> f64 {
        self.settings.timeout
    }

    /// Store a new read timeout in seconds; negative waits indefinitely.
    ///
    /// Used from the next read call on.
    pub fn set_timeout(&mut self, timeout: f64) {
        self.settings.timeout = timeout;
    }

    /// Current settings.
    pub fn settings(&self) -> &PortSettings {
        &self.settings
    }

    /// The open device, or `NotOpen`.
    fn device(&self) -> Result<&File> {
        self.handle
            .as_deref()
            .ok_or_else(|| OperationError::NotOpen.into())
    }
}

/// Only `EWOULDBLOCK` means another holder has the lock; any other `flock`
/// failure is reported as a failed open.
fn lock_error(path: &str, errno: Errno) -> OperationError {
    if errno == Errno::EWOULDBLOCK {
        OperationError::PortLocked {
            path: path.to_string(),
            source: errno,
        }
    } else {
        OperationError::OpenFailed {
            path: path.to_string(),
            source: errno.into(),
        }
    }
}

impl Default for SerialPort {
    fn default() -> Self {
        Self::with_settings(PortSettings::default())
    }
}

impl Drop for SerialPort {
    fn drop(&mut self) {
        if self.is_open() {
            if let Err(e) = self.close() {
                debug!("Ignoring close error for {}: {e}", self.settings.path);
            }
        }
    }
}

impl fmt::Debug for SerialPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialPort")
            .field("settings", &self.settings)
            .field("is_open", &self.is_open())
            .finish()
    }
}

impl fmt::Display for SerialPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Port name: {}", self.settings.path)?;
        writeln!(f, "Baudrate: {} Bd", self.settings.baud_rate)?;
        if self.settings.timeout < 0.0 {
            writeln!(f, "Timeout: None")?;
        } else {
            writeln!(f, "Timeout: {} s", self.settings.timeout)?;
        }
        if self.is_open() {
            write!(f, "Status: Open")
        } else {
            write!(f, "Status: Closed")
        }
    }
}
