//! Data transfer commands: send, read and readline.

use anyhow::{Context, Result, bail};
use console::style;
use log::{debug, warn};
use std::io::{self, Write as _};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use ttyline::SerialPort;

/// Write `data` to the port and print the accepted byte count.
pub(crate) fn cmd_send(port: &mut SerialPort, data: &str, hex: bool, newline: bool) -> Result<()> {
    let mut bytes = if hex {
        parse_hex(data)?
    } else {
        data.as_bytes().to_vec()
    };
    if newline {
        bytes.push(b'\n');
    }

    let written = port.write(&bytes).context("Failed to send data")?;
    if written < bytes.len() {
        warn!("Only {written} of {} bytes were accepted", bytes.len());
    }
    println!("{written}");
    Ok(())
}

/// Read exactly `count` bytes and print them.
pub(crate) fn cmd_read(port: &mut SerialPort, count: usize, hex: bool) -> Result<()> {
    let data = port
        .read(count)
        .with_context(|| format!("Failed to read {count} bytes"))?;

    let mut stdout = io::stdout().lock();
    if hex {
        writeln!(stdout, "{}", hex_dump(&data))?;
    } else {
        write!(stdout, "{}", String::from_utf8_lossy(&data))?;
    }
    stdout.flush()?;
    Ok(())
}

/// Print received lines until `count` lines arrived or Ctrl-C is pressed.
///
/// A timeout only ends the current round; the next round starts right away.
pub(crate) fn cmd_readline(port: &mut SerialPort, count: Option<usize>, quiet: bool) -> Result<()> {
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("Failed to set Ctrl-C handler")?;

    let mut received = 0usize;
    let mut stdout = io::stdout();
    while count.is_none_or(|limit| received < limit) {
        if interrupted.load(Ordering::SeqCst) {
            break;
        }
        match port.readline() {
            Ok(line) => {
                received += 1;
                write!(stdout, "{line}")?;
                stdout.flush()?;
            },
            // SIGINT may land before the handler thread has set the flag.
            Err(e) if e.is_interrupted() || interrupted.load(Ordering::SeqCst) => {
                debug!("Interrupted while reading: {e}");
                break;
            },
            Err(e) if e.is_timeout() => {
                if !quiet {
                    eprintln!("{} {}", style("⏱").yellow(), style(&e).dim());
                }
            },
            Err(e) => return Err(e).context("Failed to read line"),
        }
    }

    debug!("Received {received} line(s)");
    Ok(())
}

/// Parse hex bytes such as `"48 69 0a"`, `"48:69:0A"` or `"48690a"`.
fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let digits: Vec<u8> = text
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b':' && *b != b',')
        .collect();
    if digits.len() % 2 != 0 {
        bail!("Hex data must have an even number of digits: {text:?}");
    }

    digits
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .with_context(|| format!("Invalid hex byte {:?}", String::from_utf8_lossy(pair)))
        })
        .collect()
}

/// Render bytes as space-separated uppercase hex.
fn hex_dump(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}
