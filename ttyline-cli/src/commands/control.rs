//! Handshake lines and buffer reset.

use anyhow::{Context, Result};
use console::style;
use log::debug;
use ttyline::SerialPort;

/// Optionally drive RTS/DTR, then print the state of all four lines.
pub(crate) fn cmd_lines(port: &mut SerialPort, rts: Option<bool>, dtr: Option<bool>) -> Result<()> {
    if let Some(level) = rts {
        port.set_rts(level).context("Failed to set RTS")?;
        debug!("RTS set to {level}");
    }
    if let Some(level) = dtr {
        port.set_dtr(level).context("Failed to set DTR")?;
        debug!("DTR set to {level}");
    }

    let states = [
        ("RTS", port.rts()?),
        ("DTR", port.dtr()?),
        ("CTS", port.cts()?),
        ("DSR", port.dsr()?),
    ];
    for (name, asserted) in states {
        println!("{name}: {}", format_level(asserted));
    }
    Ok(())
}

/// Discard queued bytes; both directions when neither flag is given.
pub(crate) fn cmd_reset(port: &mut SerialPort, input: bool, output: bool, quiet: bool) -> Result<()> {
    let (input, output) = if input || output {
        (input, output)
    } else {
        (true, true)
    };

    if input {
        port.reset_input_buffer()
            .context("Failed to reset input buffer")?;
    }
    if output {
        port.reset_output_buffer()
            .context("Failed to reset output buffer")?;
    }

    if !quiet {
        let what = match (input, output) {
            (true, true) => "input and output buffers",
            (true, false) => "input buffer",
            _ => "output buffer",
        };
        eprintln!("{} Discarded {what}", style("✓").green());
    }
    Ok(())
}

fn format_level(asserted: bool) -> String {
    if asserted {
        style("on").green().to_string()
    } else {
        style("off").dim().to_string()
    }
}
