//! Port information display.

use anyhow::Result;
use ttyline::SerialPort;

/// Show the settings and status of an open port.
pub(crate) fn cmd_info(port: &SerialPort, json: bool) -> Result<()> {
    if json {
        let info = serde_json::json!({
            "settings": port.settings(),
            "open": port.is_open(),
        });
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("{port}");
    }
    Ok(())
}
