//! spidev - talk to a SPI peripheral from the command line
//!
//! # Architecture
//!
//! The CLI resolves a backend string and connection settings (from flags
//! and an optional profile file) into a `BoxedSpiDevice`, then runs one
//! command against it. Commands only use the device channel contract, so
//! they behave the same on every backend.

mod backends;
mod cli;
mod commands;
mod profile;

use clap::Parser;
use cli::{Cli, Commands, DeviceArgs};
use profile::Profile;
use spidevice_core::{BoxedSpiDevice, ChipSelect, ConnectionSettings, DataFlow, SpiMode};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let mut stdout = std::io::stdout();

    match cli.command {
        Commands::Info { device } => {
            let dev = open_device(&device)?;
            commands::transfer::run_info(&dev, &mut stdout)
        }
        Commands::Read {
            device,
            len,
            output,
        } => {
            let mut dev = open_device(&device)?;
            commands::transfer::run_read(&mut dev, len as usize, output.as_deref(), &mut stdout)
        }
        Commands::Write {
            device,
            data,
            input,
        } => {
            let bytes = match (&data, &input) {
                (_, Some(path)) => commands::transfer::load_input(path)?,
                (Some(text), None) => commands::parse_hex_bytes(text)?,
                (None, None) => return Err("Nothing to write".into()),
            };
            let mut dev = open_device(&device)?;
            commands::transfer::run_write(&mut dev, &bytes)
        }
        Commands::Transfer { device, data } => {
            let bytes = commands::parse_hex_bytes(&data)?;
            let mut dev = open_device(&device)?;
            commands::transfer::run_transfer(&mut dev, &bytes, &mut stdout)
        }
        Commands::ListBackends => {
            commands::list_backends();
            Ok(())
        }
    }
}

/// Resolve backend and settings from the command line and open the device
fn open_device(args: &DeviceArgs) -> Result<BoxedSpiDevice, Box<dyn std::error::Error>> {
    let profile = match &args.profile {
        Some(path) => Some(Profile::load(path)?),
        None => None,
    };

    let backend = args
        .backend
        .clone()
        .or_else(|| profile.as_ref().and_then(|p| p.backend.clone()))
        .ok_or("No backend specified. Use --backend or a profile with [device] backend")?;

    let base = profile.map(|p| p.settings).unwrap_or_default();
    let settings = apply_overrides(base, args);

    log::debug!("Using backend {} with {:?}", backend, settings);

    let dev = backends::open_device(&backend, settings)?;
    log::info!(
        "Opened {} (bus {}, cs {}, {} Hz)",
        backend,
        settings.bus_id,
        settings.chip_select_line,
        settings.clock_frequency
    );
    Ok(dev)
}

/// Apply command line flags on top of profile (or default) settings
fn apply_overrides(mut settings: ConnectionSettings, args: &DeviceArgs) -> ConnectionSettings {
    if let Some(bus) = args.bus {
        settings.bus_id = bus;
    }
    if let Some(cs) = args.cs {
        settings.chip_select_line = cs;
    }
    if let Some(speed) = args.speed {
        settings.clock_frequency = speed;
    }
    if let Some(mode) = args.mode.and_then(SpiMode::from_number) {
        settings.mode = mode;
    }
    if let Some(bits) = args.bits {
        settings.data_bit_length = bits;
    }
    if args.lsb_first {
        settings.data_flow = DataFlow::LsbFirst;
    }
    if args.cs_high {
        settings.chip_select = ChipSelect::ActiveHigh;
    }
    if args.no_cs {
        settings.chip_select = ChipSelect::None;
    }
    settings
}
