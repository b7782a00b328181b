//! # ttyline
//!
//! Blocking, timeout-bounded access to POSIX serial ports.
//!
//! This crate wraps the termios, `flock`, `poll` and modem-control calls
//! needed to talk to a UART device (a USB-to-serial adapter, an on-board
//! UART, a pseudo-terminal) from a single thread:
//!
//! - Exclusive open with an advisory lock and 8-N-1 raw line settings
//! - Exact-length reads and single-round line reads, each bounded by a timeout
//! - RTS/DTR control and CTS/DSR status
//! - Input/output queue reset
//!
//! ## Supported Platforms
//!
//! Linux and other POSIX systems. The 1 000 000 Bd rate is only available
//! where the OS defines it (Linux, Android).
//!
//! ## Features
//!
//! - `serde`: Serialization support for [`PortSettings`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use ttyline::{Error, SerialPort};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut port = SerialPort::new("/dev/ttyUSB0", 115200, 1.0);
//!     port.open()?;
//!     println!("{port}");
//!
//!     port.set_rts(false)?;
//!     println!("CTS = {}", port.cts()?);
//!
//!     port.write("0123456789A\n")?;
//!     loop {
//!         match port.readline() {
//!             Ok(line) => print!("{line}"),
//!             Err(Error::Timeout) => break,
//!             Err(e) => return Err(e.into()),
//!         }
//!     }
//!
//!     port.close()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod port;

// Re-exports for convenience
pub use {
    error::{Error, OperationError, Result},
    port::{
        ControlLine, PortSettings, READLINE_CAPACITY, SerialPort, is_supported_baud_rate,
        supported_baud_rates,
    },
};
