//! ttyline CLI - Command-line access to POSIX serial ports.
//!
//! ## Features
//!
//! - Send and receive raw bytes or hex
//! - Read lines with a per-line timeout
//! - Drive RTS/DTR and inspect the handshake lines
//! - List serial devices on the system
//! - Shell completion generation
//! - Environment variable and config file support

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use env_logger::Env;
use log::debug;
use std::env;
use std::path::PathBuf;
use ttyline::{PortSettings, SerialPort};

mod commands;
mod config;

use commands::{
    completions::cmd_completions,
    control::{cmd_lines, cmd_reset},
    info::cmd_info,
    list_ports::cmd_list_ports,
    transfer::{cmd_read, cmd_readline, cmd_send},
};
use config::Config;

/// ttyline - Talk to a serial port from the command line.
///
/// Environment variables:
///   TTYLINE_PORT      - Default serial port
///   TTYLINE_BAUD      - Default baud rate (default: 9600)
///   TTYLINE_TIMEOUT   - Default read timeout in seconds (negative waits forever)
#[derive(Parser)]
#[command(name = "ttyline")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Serial port device path.
    #[arg(short, long, global = true, env = "TTYLINE_PORT")]
    port: Option<String>,

    /// Baud rate.
    #[arg(short, long, global = true, env = "TTYLINE_BAUD")]
    baud: Option<u32>,

    /// Read timeout in seconds (negative waits forever).
    #[arg(
        short,
        long,
        global = true,
        env = "TTYLINE_TIMEOUT",
        allow_negative_numbers = true
    )]
    timeout: Option<f64>,

    /// Verbose output level (-v, -vv for increasing detail).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-essential output).
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to a configuration file.
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Signal level for a modem-control output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Level {
    /// Assert the line.
    On,
    /// Clear the line.
    Off,
}

impl From<Level> for bool {
    fn from(level: Level) -> Self {
        level == Level::On
    }
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Open the port and show its settings.
    Info {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Write data to the port.
    Send {
        /// Text to send (or hex bytes with --hex, e.g. "48 69 0a").
        data: String,

        /// Interpret DATA as hex bytes.
        #[arg(long)]
        hex: bool,

        /// Append a newline.
        #[arg(short, long)]
        newline: bool,
    },

    /// Read an exact number of bytes.
    Read {
        /// Number of bytes to read.
        count: usize,

        /// Print a hex dump instead of text.
        #[arg(long)]
        hex: bool,
    },

    /// Read newline-terminated lines.
    Readline {
        /// Stop after this many lines (default: until Ctrl-C).
        #[arg(short, long)]
        count: Option<usize>,
    },

    /// Drive RTS/DTR and show the handshake line states.
    Lines {
        /// Set RTS.
        #[arg(long, value_enum)]
        rts: Option<Level>,

        /// Set DTR.
        #[arg(long, value_enum)]
        dtr: Option<Level>,
    },

    /// Discard queued input and/or output.
    Reset {
        /// Discard received but unread bytes.
        #[arg(long)]
        input: bool,

        /// Discard written but untransmitted bytes.
        #[arg(long)]
        output: bool,
    },

    /// List available serial ports.
    ListPorts {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Shell type to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if env::var("NO_COLOR").is_ok() || !console::Term::stderr().is_term() {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    // Setup logging based on verbosity
    let log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_target(cli.verbose >= 2)
        .format_timestamp(if cli.verbose >= 2 {
            Some(env_logger::TimestampPrecision::Millis)
        } else {
            None
        })
        .init();

    debug!(
        "ttyline v{} (verbose level: {})",
        env!("CARGO_PKG_VERSION"),
        cli.verbose
    );

    match &cli.command {
        Commands::ListPorts { json } => {
            cmd_list_ports(*json)?;
            return Ok(());
        },
        Commands::Completions { shell } => {
            cmd_completions(*shell);
            return Ok(());
        },
        _ => {},
    }

    // Load configuration
    let config = if let Some(ref path) = cli.config_path {
        Config::load_from_path(path)
    } else {
        Config::load()
    };
    let settings = config.resolve(cli.port.as_deref(), cli.baud, cli.timeout);
    let mut port = open_port(settings)?;

    match &cli.command {
        Commands::Info { json } => cmd_info(&port, *json)?,
        Commands::Send { data, hex, newline } => {
            cmd_send(&mut port, data, *hex, *newline)?;
        },
        Commands::Read { count, hex } => cmd_read(&mut port, *count, *hex)?,
        Commands::Readline { count } => cmd_readline(&mut port, *count, cli.quiet)?,
        Commands::Lines { rts, dtr } => {
            cmd_lines(&mut port, rts.map(bool::from), dtr.map(bool::from))?;
        },
        Commands::Reset { input, output } => cmd_reset(&mut port, *input, *output, cli.quiet)?,
        // Handled above
        Commands::ListPorts { .. } | Commands::Completions { .. } => {},
    }

    port.close()
        .with_context(|| format!("Failed to close {}", port.path()))?;
    Ok(())
}

/// Open the port described by `settings`.
fn open_port(settings: PortSettings) -> Result<SerialPort> {
    debug!(
        "Opening {} at {} Bd (timeout {} s)",
        settings.path, settings.baud_rate, settings.timeout
    );
    let mut port = SerialPort::with_settings(settings);
    port.open()
        .with_context(|| format!("Failed to open {}", port.path()))?;
    Ok(port)
}
