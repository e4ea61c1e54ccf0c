//! CLI argument parsing

use crate::backends;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse an SPI mode number (0-3)
fn parse_mode(s: &str) -> Result<u8, String> {
    match s.parse::<u8>() {
        Ok(n) if n <= 3 => Ok(n),
        _ => Err(format!("Invalid SPI mode: {} (must be 0-3)", s)),
    }
}

/// Generate dynamic help text for the backend argument
fn backend_help() -> String {
    format!(
        "Backend to use, as name[:key=value,...] [available: {}]",
        backends::backend_names_short()
    )
}

#[derive(Parser)]
#[command(name = "spidev")]
#[command(author, version, about = "Talk to a SPI peripheral", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Device selection and connection settings shared across commands
///
/// Flags override values loaded from `--profile`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct DeviceArgs {
    /// Backend to use
    #[arg(short, long, help = backend_help())]
    pub backend: Option<String>,

    /// Profile file (TOML) with backend and connection settings
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// SPI controller number
    #[arg(long)]
    pub bus: Option<u32>,

    /// Chip-select line
    #[arg(long)]
    pub cs: Option<u32>,

    /// Clock frequency in Hz (hex or decimal)
    #[arg(long, value_parser = parse_hex_u32)]
    pub speed: Option<u32>,

    /// SPI mode (0-3)
    #[arg(long, value_parser = parse_mode)]
    pub mode: Option<u8>,

    /// Bits per word
    #[arg(long)]
    pub bits: Option<u8>,

    /// Shift least significant bit first
    #[arg(long)]
    pub lsb_first: bool,

    /// Chip-select is active high
    #[arg(long, conflicts_with = "no_cs")]
    pub cs_high: bool,

    /// Do not drive chip-select
    #[arg(long)]
    pub no_cs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the device and show its connection settings
    Info {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Receive bytes from the device
    Read {
        #[command(flatten)]
        device: DeviceArgs,

        /// Number of bytes to read (hex or decimal)
        #[arg(short = 'n', long, value_parser = parse_hex_u32)]
        len: u32,

        /// Write the received bytes to a file instead of printing them
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Transmit bytes to the device
    Write {
        #[command(flatten)]
        device: DeviceArgs,

        /// Bytes to send, e.g. "9f 00 00" or "0x06"
        #[arg(required_unless_present = "input")]
        data: Option<String>,

        /// Send the contents of a file
        #[arg(short, long, conflicts_with = "data")]
        input: Option<PathBuf>,
    },

    /// Full-duplex transfer: send bytes and print what was received
    Transfer {
        #[command(flatten)]
        device: DeviceArgs,

        /// Bytes to send, e.g. "9f 00 00 00"
        data: String,
    },

    /// List supported backends
    ListBackends,
}
