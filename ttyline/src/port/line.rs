//! Line discipline and speed configuration (termios).

use std::fs::File;

use log::trace;
use nix::sys::termios::{
    self, BaudRate, ControlFlags, InputFlags, LocalFlags, OutputFlags, SetArg,
    SpecialCharacterIndices,
};

use crate::error::{OperationError, Result};

/// Supported baud rates and their termios speed symbols, in ascending order.
const BAUD_RATES: &[(u32, BaudRate)] = &[
    (9600, BaudRate::B9600),
    (19200, BaudRate::B19200),
    (38400, BaudRate::B38400),
    (57600, BaudRate::B57600),
    (115200, BaudRate::B115200),
    #[cfg(any(target_os = "linux", target_os = "android"))]
    (1_000_000, BaudRate::B1000000),
];

/// Line discipline used for a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineMode {
    /// Reads return whatever bytes are available.
    Raw,
    /// Reads return newline-terminated lines.
    Canonical,
}

/// Baud rates accepted by [`SerialPort::open`](crate::SerialPort::open).
pub fn supported_baud_rates() -> impl Iterator<Item = u32> {
    BAUD_RATES.iter().map(|&(rate, _)| rate)
}

/// Whether `baud_rate` is in the supported table.
pub fn is_supported_baud_rate(baud_rate: u32) -> bool {
    speed_for(baud_rate).is_some()
}

fn speed_for(baud_rate: u32) -> Option<BaudRate> {
    BAUD_RATES
        .iter()
        .find(|&&(rate, _)| rate == baud_rate)
        .map(|&(_, speed)| speed)
}

/// Apply 8-N-1, CLOCAL | CREAD, no processing and non-blocking reads
/// (VMIN = VTIME = 0) at `baud_rate` for both directions.
pub(crate) fn configure(device: &File, baud_rate: u32) -> Result<()> {
    let speed = speed_for(baud_rate).ok_or(OperationError::UnsupportedBaudRate(baud_rate))?;

    let mut settings = termios::tcgetattr(device).map_err(OperationError::ConfigFailed)?;

    settings.control_flags = ControlFlags::CS8 | ControlFlags::CLOCAL | ControlFlags::CREAD;
    settings.input_flags = InputFlags::empty();
    settings.output_flags = OutputFlags::empty();
    settings.local_flags = LocalFlags::empty();
    settings.control_chars[SpecialCharacterIndices::VMIN as usize] = 0;
    settings.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;

    termios::cfsetispeed(&mut settings, speed).map_err(OperationError::ConfigFailed)?;
    termios::cfsetospeed(&mut settings, speed).map_err(OperationError::ConfigFailed)?;

    termios::tcsetattr(device, SetArg::TCSANOW, &settings).map_err(OperationError::ConfigFailed)?;
    trace!("Applied 8-N-1 raw settings at {baud_rate} Bd");
    Ok(())
}

/// Switch between raw and canonical input, leaving every other flag alone.
pub(crate) fn set_line_mode(device: &File, mode: LineMode) -> Result<()> {
    let mut settings = termios::tcgetattr(device).map_err(OperationError::ConfigFailed)?;
    match mode {
        LineMode::Raw => settings.local_flags.remove(LocalFlags::ICANON),
        LineMode::Canonical => settings.local_flags.insert(LocalFlags::ICANON),
    }
    termios::tcsetattr(device, SetArg::TCSANOW, &settings).map_err(OperationError::ConfigFailed)?;
    trace!("Line mode set to {mode:?}");
    Ok(())
}
