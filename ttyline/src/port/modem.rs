//! Modem-control (handshake) lines via `TIOCMBIS`, `TIOCMBIC` and `TIOCMGET`.

use std::fmt;
use std::fs::File;
use std::os::unix::io::AsRawFd;

use log::trace;
use nix::libc::{self, c_int};

use super::SerialPort;
use crate::error::{OperationError, Result};

mod ioctl {
    use nix::libc;

    nix::ioctl_read_bad!(tiocmget, libc::TIOCMGET, libc::c_int);
    nix::ioctl_write_ptr_bad!(tiocmbis, libc::TIOCMBIS, libc::c_int);
    nix::ioctl_write_ptr_bad!(tiocmbic, libc::TIOCMBIC, libc::c_int);
}

/// A modem-control line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlLine {
    /// Request To Send (output).
    Rts,
    /// Data Terminal Ready (output).
    Dtr,
    /// Clear To Send (input).
    Cts,
    /// Data Set Ready (input).
    Dsr,
}

impl ControlLine {
    /// Status bit tested or driven for this line.
    ///
    /// `Dsr` maps to `TIOCM_LE` (line enable), not `TIOCM_DSR`.
    const fn status_bit(self) -> c_int {
        match self {
            Self::Rts => libc::TIOCM_RTS,
            Self::Dtr => libc::TIOCM_DTR,
            Self::Cts => libc::TIOCM_CTS,
            Self::Dsr => libc::TIOCM_LE,
        }
    }
}

impl fmt::Display for ControlLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rts => "RTS",
            Self::Dtr => "DTR",
            Self::Cts => "CTS",
            Self::Dsr => "DSR",
        })
    }
}

#[allow(unsafe_code)]
fn drive(device: &File, line: ControlLine, level: bool) -> Result<()> {
    let bits = line.status_bit();
    let fd = device.as_raw_fd();
    // SAFETY: `fd` is open for the lifetime of `device` and `bits` outlives the call.
    let result = unsafe {
        if level {
            ioctl::tiocmbis(fd, &bits)
        } else {
            ioctl::tiocmbic(fd, &bits)
        }
    };
    result.map_err(|source| OperationError::ControlLineFailed { line, source })?;
    trace!("Set {line} to {level}");
    Ok(())
}

#[allow(unsafe_code)]
fn sample(device: &File, line: ControlLine) -> Result<bool> {
    let mut bits: c_int = 0;
    // SAFETY: `fd` is open for the lifetime of `device` and `bits` outlives the call.
    unsafe { ioctl::tiocmget(device.as_raw_fd(), &mut bits) }
        .map_err(|source| OperationError::ControlLineFailed { line, source })?;
    Ok(bits & line.status_bit() != 0)
}

impl SerialPort {
    /// Assert (`true`) or clear (`false`) RTS.
    pub fn set_rts(&mut self, level: bool) -> Result<()> {
        drive(self.device()?, ControlLine::Rts, level)
    }

    /// Assert (`true`) or clear (`false`) DTR.
    pub fn set_dtr(&mut self, level: bool) -> Result<()> {
        drive(self.device()?, ControlLine::Dtr, level)
    }

    /// Current RTS output state.
    pub fn rts(&self) -> Result<bool> {
        sample(self.device()?, ControlLine::Rts)
    }

    /// Current DTR output state.
    pub fn dtr(&self) -> Result<bool> {
        sample(self.device()?, ControlLine::Dtr)
    }

    /// Current CTS input state.
    pub fn cts(&self) -> Result<bool> {
        sample(self.device()?, ControlLine::Cts)
    }

    /// Current DSR input state.
    ///
    /// Note: this reports the `TIOCM_LE` (line enable) status bit, not
    /// `TIOCM_DSR`. Existing callers depend on that bit, so it is kept
    /// until the discrepancy is confirmed to be a bug.
    pub fn dsr(&self) -> Result<bool> {
        sample(self.device()?, ControlLine::Dsr)
    }
}
