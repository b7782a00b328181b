//! Serial device enumeration.

use anyhow::{Context, Result};
use console::style;
use log::trace;
use serialport::{SerialPortInfo, SerialPortType};

/// List the serial ports known to the OS.
pub(crate) fn cmd_list_ports(json: bool) -> Result<()> {
    let ports = serialport::available_ports().context("Failed to enumerate serial ports")?;

    if json {
        let entries: Vec<serde_json::Value> = ports.iter().map(port_json).collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    eprintln!("{}", style("Available serial ports").bold().underlined());
    if ports.is_empty() {
        eprintln!("  {}", style("No serial ports found").dim());
    }
    for port in &ports {
        let detail = match &port.port_type {
            SerialPortType::UsbPort(usb) => {
                trace!(
                    "USB port {} (VID: {:04X}, PID: {:04X})",
                    port.port_name, usb.vid, usb.pid
                );
                let product = usb
                    .product
                    .as_deref()
                    .map(|p| format!(" - {}", style(p).dim()))
                    .unwrap_or_default();
                format!(" ({:04X}:{:04X}){product}", usb.vid, usb.pid)
            },
            SerialPortType::PciPort => " [PCI]".to_string(),
            SerialPortType::BluetoothPort => " [Bluetooth]".to_string(),
            SerialPortType::Unknown => String::new(),
        };
        // Port names go to stdout so they can be piped.
        println!("{}{detail}", style(&port.port_name).cyan());
    }
    Ok(())
}

fn port_json(port: &SerialPortInfo) -> serde_json::Value {
    match &port.port_type {
        SerialPortType::UsbPort(usb) => serde_json::json!({
            "name": port.port_name,
            "type": "usb",
            "vid": usb.vid,
            "pid": usb.pid,
            "manufacturer": usb.manufacturer,
            "product": usb.product,
            "serial": usb.serial_number,
        }),
        SerialPortType::PciPort => serde_json::json!({ "name": port.port_name, "type": "pci" }),
        SerialPortType::BluetoothPort => {
            serde_json::json!({ "name": port.port_name, "type": "bluetooth" })
        },
        SerialPortType::Unknown => serde_json::json!({ "name": port.port_name, "type": "unknown" }),
    }
}
