//! Timeout-bounded reads, writes and buffer resets.
//!
//! Reads never block inside `read(2)`: the line is configured with
//! VMIN = VTIME = 0 and every read is preceded by a `poll(2)` readiness
//! wait bounded by the port timeout. The wait limit is derived from the live
//! timeout on each call.

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::unix::io::AsFd;

use log::trace;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::sys::termios::{self, FlushArg};

use super::SerialPort;
use super::line::{self, LineMode};
use crate::error::{Error, OperationError, Result};

/// Bytes fetched by a single [`SerialPort::readline`], including one slot
/// reserved for a terminator. Lines of more than `READLINE_CAPACITY - 1`
/// bytes fail with `BufferOverflow`.
pub const READLINE_CAPACITY: usize = 256;

const MICROS_PER_SEC: i64 = 1_000_000;

/// Split a non-negative timeout into whole seconds and microseconds,
/// truncating both parts.
#[allow(clippy::cast_possible_truncation)]
fn split_timeout(timeout: f64) -> (i64, i64) {
    let secs = timeout as i64;
    let micros = (timeout * 1e6) as i64 % MICROS_PER_SEC;
    (secs, micros)
}

/// Readiness wait limit in milliseconds for `timeout` seconds; `None` waits
/// indefinitely. Sub-millisecond remainders are truncated.
fn wait_millis(timeout: f64) -> Option<i32> {
    if timeout < 0.0 {
        return None;
    }
    let (secs, micros) = split_timeout(timeout);
    let millis = secs.saturating_mul(1000).saturating_add(micros / 1000);
    Some(i32::try_from(millis).unwrap_or(i32::MAX))
}

/// Block until `device` is readable or the timeout expires.
fn wait_readable(device: &File, timeout: f64) -> Result<()> {
    let limit = wait_millis(timeout).map_or(PollTimeout::NONE, |millis| {
        PollTimeout::try_from(millis).unwrap_or(PollTimeout::MAX)
    });
    let mut fds = [PollFd::new(device.as_fd(), PollFlags::POLLIN)];

    let ready = poll(&mut fds, limit).map_err(OperationError::PollFailed)?;
    if ready == 0 {
        trace!("No data within {timeout} s");
        return Err(Error::Timeout);
    }
    Ok(())
}

/// One `read(2)` after readiness; zero bytes counts as a failure.
fn read_ready(mut device: &File, buf: &mut [u8]) -> Result<usize> {
    match device.read(buf) {
        Ok(0) => Err(OperationError::ReadFailed(io::ErrorKind::UnexpectedEof.into()).into()),
        Ok(count) => Ok(count),
        Err(e) => Err(OperationError::ReadFailed(e).into()),
    }
}

impl SerialPort {
    /// Write `data` with a single `write(2)` call.
    ///
    /// Returns the number of bytes the OS accepted, which may be fewer than
    /// `data.len()`. Nothing is retried.
    pub fn write(&mut self, data: impl AsRef<[u8]>) -> Result<usize> {
        let mut device = self.device()?;
        let data = data.as_ref();
        let count = device
            .write(data)
            .map_err(OperationError::WriteFailed)?;
        trace!("Wrote {count} of {} bytes", data.len());
        Ok(count)
    }

    /// Read exactly `size` bytes in raw mode.
    ///
    /// Each readiness wait is bounded by the port timeout. If any wait
    /// expires the call fails with [`Error::Timeout`] and bytes collected in
    /// earlier rounds are dropped; a short buffer is never returned.
    /// `read(0)` returns an empty vector without waiting.
    pub fn read(&mut self, size: usize) -> Result<Vec<u8>> {
        let timeout = self.settings.timeout;
        let device = self.device()?;
        if size == 0 {
            return Ok(Vec::new());
        }

        line::set_line_mode(device, LineMode::Raw)?;

        let mut data = vec![0u8; size];
        let mut filled = 0;
        while filled < size {
            wait_readable(device, timeout)?;
            let count = read_ready(device, &mut data[filled..])?;
            filled += count;
            trace!("Read {count} bytes ({filled}/{size})");
        }
        Ok(data)
    }

    /// Read one line in canonical mode.
    ///
    /// This is a single wait-then-read round: the result is whatever the
    /// driver delivered, normally a complete line ending in `\n`. Invalid
    /// UTF-8 is replaced with U+FFFD.
    pub fn readline(&mut self) -> Result<String> {
        let timeout = self.settings.timeout;
        let device = self.device()?;

        line::set_line_mode(device, LineMode::Canonical)?;
        wait_readable(device, timeout)?;

        let mut buffer = [0u8; READLINE_CAPACITY];
        let count = read_ready(device, &mut buffer)?;
        if count >= READLINE_CAPACITY {
            return Err(OperationError::BufferOverflow {
                capacity: READLINE_CAPACITY,
            }
            .into());
        }
        trace!("Read line of {count} bytes");
        Ok(String::from_utf8_lossy(&buffer[..count]).into_owned())
    }

    /// Discard received bytes that have not been read yet.
    pub fn reset_input_buffer(&mut self) -> Result<()> {
        let device = self.device()?;
        termios::tcflush(device, FlushArg::TCIFLUSH).map_err(OperationError::FlushFailed)?;
        Ok(())
    }

    /// Discard written bytes that have not been transmitted yet.
    pub fn reset_output_buffer(&mut self) -> Result<()> {
        let device = self.device()?;
        termios::tcflush(device, FlushArg::TCOFLUSH).map_err(OperationError::FlushFailed)?;
        Ok(())
    }
}
