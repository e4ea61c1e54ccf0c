//! Backend trait definitions
//!
//! A backend is the collaborator that moves bytes over a real or simulated
//! bus. Callers never use a backend directly: they go through
//! [`SpiDevice`](crate::SpiDevice), which owns the open/closed state and
//! checks preconditions before any backend method runs.

use crate::error::{Error, Result, UnsupportedSetting};
use crate::settings::{ChipSelect, ConnectionSettings, DataFlow, SpiMode};
use bitflags::bitflags;

bitflags! {
    /// SPI backend feature flags
    ///
    /// Mode 0, MSB first, active-low chip-select and 8-bit words are
    /// assumed to be available everywhere; the flags describe extras.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SpiFeatures: u32 {
        /// Supports mode 1 (CPOL=0, CPHA=1)
        const MODE_1     = 1 << 0;
        /// Supports mode 2 (CPOL=1, CPHA=0)
        const MODE_2     = 1 << 1;
        /// Supports mode 3 (CPOL=1, CPHA=1)
        const MODE_3     = 1 << 2;
        /// Can shift least significant bit first
        const LSB_FIRST  = 1 << 3;
        /// Can drive chip-select active high
        const CS_HIGH    = 1 << 4;
        /// Can run without asserting chip-select
        const NO_CS      = 1 << 5;
        /// Supports word lengths other than 8 bits
        const WIDE_WORDS = 1 << 6;

        /// Shorthand for all four clock modes
        const ALL_MODES = Self::MODE_1.bits() | Self::MODE_2.bits() | Self::MODE_3.bits();
    }
}

impl Default for SpiFeatures {
    fn default() -> Self {
        SpiFeatures::empty()
    }
}

/// Largest word length any backend is expected to shift
const MAX_DATA_BIT_LENGTH: u8 = 32;

/// Check that a backend with `features` can honour `settings`
///
/// Backend factories call this before touching hardware so that an
/// unsupported combination fails with `UnsupportedSettings` and leaves the
/// bus alone.
///
/// # Example
///
/// ```ignore
/// pub fn open(settings: ConnectionSettings) -> Result<SpiDevice<MyBackend>> {
///     check_settings_supported(&settings, MyBackend::FEATURES)?;
///     // ... open the hardware
/// }
/// ```
pub fn check_settings_supported(settings: &ConnectionSettings, features: SpiFeatures) -> Result<()> {
    let unsupported = |s| Err(Error::UnsupportedSettings(s));

    if settings.clock_frequency == 0 {
        return unsupported(UnsupportedSetting::ClockFrequency(0));
    }

    let bits = settings.data_bit_length;
    if bits == 0 || bits > MAX_DATA_BIT_LENGTH {
        return unsupported(UnsupportedSetting::DataBitLength(bits));
    }
    if bits != 8 && !features.contains(SpiFeatures::WIDE_WORDS) {
        return unsupported(UnsupportedSetting::DataBitLength(bits));
    }

    let mode_ok = match settings.mode {
        SpiMode::Mode0 => true,
        SpiMode::Mode1 => features.contains(SpiFeatures::MODE_1),
        SpiMode::Mode2 => features.contains(SpiFeatures::MODE_2),
        SpiMode::Mode3 => features.contains(SpiFeatures::MODE_3),
    };
    if !mode_ok {
        return unsupported(UnsupportedSetting::Mode(settings.mode));
    }

    let cs_ok = match settings.chip_select {
        ChipSelect::ActiveLow => true,
        ChipSelect::ActiveHigh => features.contains(SpiFeatures::CS_HIGH),
        ChipSelect::None => features.contains(SpiFeatures::NO_CS),
    };
    if !cs_ok {
        return unsupported(UnsupportedSetting::ChipSelect(settings.chip_select));
    }

    if settings.data_flow == DataFlow::LsbFirst && !features.contains(SpiFeatures::LSB_FIRST) {
        return unsupported(UnsupportedSetting::DataFlow(settings.data_flow));
    }

    Ok(())
}

/// SPI backend trait
///
/// Every method performs exactly one bus transaction: chip-select (if
/// enabled) is asserted once, all bytes are clocked, then chip-select is
/// released. Implementations never see zero-length requests, mismatched
/// full-duplex buffers, requests longer than `max_transfer_len()`, or calls
/// after `teardown()`; [`SpiDevice`](crate::SpiDevice) filters those out.
///
/// ## Example
///
/// ```ignore
/// impl SpiBackend for Loopback {
///     fn features(&self) -> SpiFeatures {
///         SpiFeatures::ALL_MODES
///     }
///
///     fn max_transfer_len(&self) -> usize {
///         usize::MAX
///     }
///
///     fn read(&mut self, buf: &mut [u8]) -> Result<()> {
///         buf.fill(0xFF);
///         Ok(())
///     }
///
///     fn write(&mut self, _data: &[u8]) -> Result<()> {
///         Ok(())
///     }
///
///     fn transfer(&mut self, write: &[u8], read: &mut [u8]) -> Result<()> {
///         read.copy_from_slice(write);
///         Ok(())
///     }
/// }
/// ```
pub trait SpiBackend {
    /// Get the optional features supported by this backend
    fn features(&self) -> SpiFeatures;

    /// Get the maximum number of bytes in a single atomic transaction
    fn max_transfer_len(&self) -> usize;

    /// Receive `buf.len()` bytes, clocking out the backend's filler pattern
    fn read(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Transmit `data`, discarding whatever is received
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Transmit `write[i]` while capturing `read[i]`, for every `i`
    ///
    /// Both slices have the same length.
    fn transfer(&mut self, write: &[u8], read: &mut [u8]) -> Result<()>;

    /// Receive a single word
    fn read_byte(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read(&mut buf)?;
        Ok(buf[0])
    }

    /// Transmit a single word
    fn write_byte(&mut self, data: u8) -> Result<()> {
        self.write(&[data])
    }

    /// Release backend resources
    ///
    /// Called exactly once, when the owning device is released. Errors are
    /// logged by the caller and never reach the user.
    fn teardown(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Type-erased backend, used when the backend is picked at runtime
#[cfg(feature = "alloc")]
pub type BoxedSpiBackend = alloc::boxed::Box<dyn SpiBackend + Send>;

// Forwarding impl so boxed trait objects can be wrapped in a device
#[cfg(feature = "alloc")]
impl<B: SpiBackend + ?Sized> SpiBackend for alloc::boxed::Box<B> {
    fn features(&self) -> SpiFeatures {
        (**self).features()
    }

    fn max_transfer_len(&self) -> usize {
        (**self).max_transfer_len()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).read(buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn transfer(&mut self, write: &[u8], read: &mut [u8]) -> Result<()> {
        (**self).transfer(write, read)
    }

    fn read_byte(&mut self) -> Result<u8> {
        (**self).read_byte()
    }

    fn write_byte(&mut self, data: u8) -> Result<()> {
        (**self).write_byte(data)
    }

    fn teardown(&mut self) -> Result<()> {
        (**self).teardown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_always_supported() {
        let settings = ConnectionSettings::default();
        assert!(check_settings_supported(&settings, SpiFeatures::empty()).is_ok());
    }

    #[test]
    fn test_zero_clock_rejected() {
        let settings = ConnectionSettings::default().with_clock_frequency(0);
        assert_eq!(
            check_settings_supported(&settings, SpiFeatures::all()),
            Err(Error::UnsupportedSettings(UnsupportedSetting::ClockFrequency(0)))
        );
    }

    #[test]
    fn test_mode_needs_feature() {
        let settings = ConnectionSettings::default().with_mode(SpiMode::Mode3);
        assert_eq!(
            check_settings_supported(&settings, SpiFeatures::MODE_1 | SpiFeatures::MODE_2),
            Err(Error::UnsupportedSettings(UnsupportedSetting::Mode(SpiMode::Mode3)))
        );
        assert!(check_settings_supported(&settings, SpiFeatures::ALL_MODES).is_ok());
    }

    #[test]
    fn test_word_length() {
        let wide = ConnectionSettings::default().with_data_bit_length(16);
        assert_eq!(
            check_settings_supported(&wide, SpiFeatures::empty()),
            Err(Error::UnsupportedSettings(UnsupportedSetting::DataBitLength(16)))
        );
        assert!(check_settings_supported(&wide, SpiFeatures::WIDE_WORDS).is_ok());

        let zero = ConnectionSettings::default().with_data_bit_length(0);
        assert!(check_settings_supported(&zero, SpiFeatures::all()).is_err());
        let huge = ConnectionSettings::default().with_data_bit_length(33);
        assert!(check_settings_supported(&huge, SpiFeatures::all()).is_err());
    }

    #[test]
    fn test_chip_select_and_bit_order() {
        let no_cs = ConnectionSettings::default().with_chip_select(ChipSelect::None);
        assert_eq!(
            check_settings_supported(&no_cs, SpiFeatures::CS_HIGH),
            Err(Error::UnsupportedSettings(UnsupportedSetting::ChipSelect(ChipSelect::None)))
        );
        assert!(check_settings_supported(&no_cs, SpiFeatures::NO_CS).is_ok());

        let lsb = ConnectionSettings::default().with_data_flow(DataFlow::LsbFirst);
        assert!(check_settings_supported(&lsb, SpiFeatures::empty()).is_err());
        assert!(check_settings_supported(&lsb, SpiFeatures::LSB_FIRST).is_ok());
    }
}
