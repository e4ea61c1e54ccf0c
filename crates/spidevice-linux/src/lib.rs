//! spidevice-linux - Linux spidev backend
//!
//! This crate provides an `SpiBackend` for SPI controllers exposed by the
//! kernel's spidev driver at `/dev/spidevX.Y`, where X is the bus number and
//! Y is the chip select.
//!
//! # Example
//!
//! ```no_run
//! use spidevice_core::{ConnectionSettings, SpiMode};
//! use spidevice_linux::LinuxSpiConfig;
//!
//! let settings = ConnectionSettings::new(0, 0)
//!     .with_clock_frequency(4_000_000)
//!     .with_mode(SpiMode::Mode0);
//! let mut dev = spidevice_linux::open(&LinuxSpiConfig::new(settings))?;
//!
//! // Read JEDEC ID of a SPI NOR flash
//! let mut id = [0u8; 4];
//! dev.transfer_full_duplex(&[0x9F, 0, 0, 0], &mut id)?;
//! println!("JEDEC ID: {:02X} {:02X} {:02X}", id[1], id[2], id[3]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel with spidev support enabled (`CONFIG_SPI_SPIDEV`)
//! - Read/write access to `/dev/spidevX.Y`
//! - May require adding user to `spi` group or using udev rules

pub mod device;
pub mod error;

// Re-exports
pub use device::{
    default_device_path, mode_bits, mode_flags, open, parse_options, LinuxSpi, LinuxSpiConfig,
};
pub use error::{LinuxSpiError, Result};

use spidevice_core::{check_settings_supported, BoxedSpiBackend, BoxedSpiDevice, ConnectionSettings, SpiDevice};

/// Open a Linux spidev channel and return it type-erased
///
/// This is a convenience function for use in the CLI backend dispatch.
///
/// # Example Options
///
/// - `dev=/dev/spidev0.0` - Optional: device path (default derived from bus and chip select)
/// - `spispeed=4000` - Optional: speed in kHz, overrides the settings
/// - `mode=0` - Optional: SPI mode 0-3, overrides the settings
pub fn open_boxed(
    options: &[(&str, &str)],
    settings: ConnectionSettings,
) -> std::result::Result<BoxedSpiDevice, Box<dyn std::error::Error>> {
    let config = parse_options(options, settings)?;
    check_settings_supported(&config.settings, LinuxSpi::FEATURES)?;
    let backend: BoxedSpiBackend = Box::new(LinuxSpi::configure(&config)?);
    Ok(SpiDevice::open(config.settings, backend)?)
}
