//! SPI device channel
//!
//! [`SpiDevice`] is what callers hold. It owns a backend, the settings the
//! channel was opened with, and the open/closed state. Every precondition
//! that can be checked without touching the bus is checked here, so a
//! backend only ever sees well-formed requests on an open channel.

use crate::backend::{check_settings_supported, SpiBackend};
use crate::error::{ArgumentError, Error, Result};
use crate::settings::ConnectionSettings;

/// Lifecycle state of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// Transfers are allowed
    Open,
    /// Released; terminal
    Closed,
}

/// The communications channel to one device on a SPI bus
///
/// Created by a backend factory, used for any number of transfers, then
/// released either explicitly via [`release`](Self::release) or implicitly
/// on drop. Release runs the backend teardown exactly once.
///
/// Each transfer method is a single bus transaction. The channel takes
/// `&mut self` for every transfer; to share it between threads wrap it in
/// a `SharedSpiDevice` (feature `std`).
pub struct SpiDevice<B: SpiBackend> {
    settings: ConnectionSettings,
    backend: B,
    state: DeviceState,
}

/// Device with a type-erased backend
#[cfg(feature = "alloc")]
pub type BoxedSpiDevice = SpiDevice<crate::backend::BoxedSpiBackend>;

impl<B: SpiBackend> SpiDevice<B> {
    /// Wrap an already configured backend in an open channel
    ///
    /// `settings` must be the settings the backend was configured with. They
    /// are checked against the backend features; on failure the backend is
    /// torn down and `UnsupportedSettings` is returned.
    pub fn open(settings: ConnectionSettings, mut backend: B) -> Result<Self> {
        if let Err(e) = check_settings_supported(&settings, backend.features()) {
            log::debug!("spi: refusing settings {:?}: {}", settings, e);
            if let Err(te) = backend.teardown() {
                log::warn!("spi: teardown after rejected open failed: {}", te);
            }
            return Err(e);
        }

        log::debug!(
            "spi: opened bus {} cs {} ({:?}, {} Hz, {} bits)",
            settings.bus_id,
            settings.chip_select_line,
            settings.mode,
            settings.clock_frequency,
            settings.data_bit_length
        );

        Ok(Self {
            settings,
            backend,
            state: DeviceState::Open,
        })
    }

    /// The settings this channel was opened with
    pub fn connection_settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Current lifecycle state
    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Whether transfers are currently allowed
    pub fn is_open(&self) -> bool {
        self.state == DeviceState::Open
    }

    /// Shared access to the backend, e.g. to inspect a test double
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            DeviceState::Open => Ok(()),
            DeviceState::Closed => Err(Error::DeviceUnavailable),
        }
    }

    fn ensure_fits(&self, len: usize) -> Result<()> {
        let max = self.backend.max_transfer_len();
        if len > max {
            log::error!(
                "spi: transfer of {} bytes exceeds backend limit of {} bytes",
                len,
                max
            );
            return Err(Error::TransferFailure);
        }
        Ok(())
    }

    /// Read a byte from the device
    pub fn read_byte(&mut self) -> Result<u8> {
        self.ensure_open()?;
        self.ensure_fits(1)?;
        let data = self.backend.read_byte()?;
        log::trace!("spi: read byte 0x{:02X}", data);
        Ok(data)
    }

    /// Fill `buf` with data read from the device
    ///
    /// `buf[i]` receives the `i`-th byte clocked in. An empty buffer is a
    /// no-op and performs no bus activity.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        self.ensure_open()?;
        if buf.is_empty() {
            return Ok(());
        }
        self.ensure_fits(buf.len())?;
        log::trace!("spi: read {} bytes", buf.len());
        self.backend.read(buf)
    }

    /// Write a byte to the device
    pub fn write_byte(&mut self, data: u8) -> Result<()> {
        self.ensure_open()?;
        self.ensure_fits(1)?;
        log::trace!("spi: write byte 0x{:02X}", data);
        self.backend.write_byte(data)
    }

    /// Write `data` to the device, discarding received bytes
    ///
    /// An empty slice is a no-op.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_open()?;
        if data.is_empty() {
            return Ok(());
        }
        self.ensure_fits(data.len())?;
        log::trace!("spi: write {} bytes", data.len());
        self.backend.write(data)
    }

    /// Write `write_buf` while reading into `read_buf` in one transaction
    ///
    /// Both buffers must have the same length; otherwise `InvalidArgument`
    /// is returned before any bus activity.
    pub fn transfer_full_duplex(&mut self, write_buf: &[u8], read_buf: &mut [u8]) -> Result<()> {
        self.ensure_open()?;
        if write_buf.len() != read_buf.len() {
            return Err(Error::InvalidArgument(ArgumentError::LengthMismatch {
                write: write_buf.len(),
                read: read_buf.len(),
            }));
        }
        if write_buf.is_empty() {
            return Ok(());
        }
        self.ensure_fits(write_buf.len())?;
        log::trace!("spi: full-duplex transfer of {} bytes", write_buf.len());
        self.backend.transfer(write_buf, read_buf)
    }

    /// Release the channel
    ///
    /// Runs backend teardown the first time it is called; later calls do
    /// nothing. Never fails: teardown errors are logged.
    pub fn release(&mut self) {
        if self.state == DeviceState::Closed {
            return;
        }
        self.state = DeviceState::Closed;

        if let Err(e) = self.backend.teardown() {
            log::warn!(
                "spi: teardown of bus {} cs {} failed: {}",
                self.settings.bus_id,
                self.settings.chip_select_line,
                e
            );
        } else {
            log::debug!(
                "spi: released bus {} cs {}",
                self.settings.bus_id,
                self.settings.chip_select_line
            );
        }
    }
}

impl<B: SpiBackend> Drop for SpiDevice<B> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<B: SpiBackend> core::fmt::Debug for SpiDevice<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SpiDevice")
            .field("settings", &self.settings)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SpiFeatures;
    use crate::error::UnsupportedSetting;
    use crate::settings::SpiMode;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Loopback backend counting every call it receives
    #[derive(Default)]
    struct CountingLoopback {
        calls: usize,
        teardowns: Rc<Cell<usize>>,
        fail_teardown: bool,
        max_len: Option<usize>,
    }

    impl SpiBackend for CountingLoopback {
        fn features(&self) -> SpiFeatures {
            SpiFeatures::MODE_1
        }

        fn max_transfer_len(&self) -> usize {
            self.max_len.unwrap_or(usize::MAX)
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<()> {
            self.calls += 1;
            buf.fill(0x5A);
            Ok(())
        }

        fn write(&mut self, _data: &[u8]) -> Result<()> {
            self.calls += 1;
            Ok(())
        }

        fn transfer(&mut self, write: &[u8], read: &mut [u8]) -> Result<()> {
            self.calls += 1;
            read.copy_from_slice(write);
            Ok(())
        }

        fn teardown(&mut self) -> Result<()> {
            self.teardowns.set(self.teardowns.get() + 1);
            if self.fail_teardown {
                Err(Error::DeviceUnavailable)
            } else {
                Ok(())
            }
        }
    }

    fn open_default() -> SpiDevice<CountingLoopback> {
        SpiDevice::open(ConnectionSettings::default(), CountingLoopback::default()).unwrap()
    }

    #[test]
    fn test_settings_stable_across_transfers() {
        let settings = ConnectionSettings::new(0, 1).with_clock_frequency(1_000_000);
        let mut dev = SpiDevice::open(settings, CountingLoopback::default()).unwrap();
        assert_eq!(*dev.connection_settings(), settings);

        dev.write(&[1, 2, 3]).unwrap();
        let mut buf = [0u8; 2];
        dev.read(&mut buf).unwrap();
        dev.read_byte().unwrap();
        assert_eq!(*dev.connection_settings(), settings);
    }

    #[test]
    fn test_zero_length_is_noop() {
        let mut dev = open_default();
        let mut empty: [u8; 0] = [];
        dev.read(&mut empty).unwrap();
        dev.write(&[]).unwrap();
        dev.transfer_full_duplex(&[], &mut empty).unwrap();
        assert_eq!(dev.backend().calls, 0);
    }

    #[test]
    fn test_full_duplex_length_mismatch() {
        let mut dev = open_default();
        let mut read = [0xEEu8; 2];
        let err = dev.transfer_full_duplex(&[1, 2, 3], &mut read).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidArgument(ArgumentError::LengthMismatch { write: 3, read: 2 })
        );
        assert_eq!(read, [0xEE, 0xEE]);
        assert_eq!(dev.backend().calls, 0);
    }

    #[test]
    fn test_full_duplex_loopback() {
        let mut dev = open_default();
        let mut read = [0u8; 3];
        dev.transfer_full_duplex(&[0x01, 0x02, 0x03], &mut read).unwrap();
        assert_eq!(read, [0x01, 0x02, 0x03]);
        assert_eq!(dev.backend().calls, 1);
    }

    #[test]
    fn test_release_is_idempotent() {
        let teardowns = Rc::new(Cell::new(0));
        let backend = CountingLoopback {
            teardowns: teardowns.clone(),
            ..Default::default()
        };
        let mut dev = SpiDevice::open(ConnectionSettings::default(), backend).unwrap();

        dev.release();
        assert_eq!(dev.state(), DeviceState::Closed);
        assert_eq!(dev.read_byte(), Err(Error::DeviceUnavailable));
        dev.release();
        drop(dev);
        assert_eq!(teardowns.get(), 1);
    }

    #[test]
    fn test_drop_releases() {
        let teardowns = Rc::new(Cell::new(0));
        let backend = CountingLoopback {
            teardowns: teardowns.clone(),
            ..Default::default()
        };
        {
            let _dev = SpiDevice::open(ConnectionSettings::default(), backend).unwrap();
        }
        assert_eq!(teardowns.get(), 1);
    }

    #[test]
    fn test_teardown_failure_is_swallowed() {
        let backend = CountingLoopback {
            fail_teardown: true,
            ..Default::default()
        };
        let mut dev = SpiDevice::open(ConnectionSettings::default(), backend).unwrap();
        dev.release();
        assert!(!dev.is_open());
    }

    #[test]
    fn test_closed_channel_rejects_everything() {
        let mut dev = open_default();
        dev.release();

        let mut read = [0xA5u8; 4];
        assert_eq!(dev.read_byte(), Err(Error::DeviceUnavailable));
        assert_eq!(dev.read(&mut read), Err(Error::DeviceUnavailable));
        assert_eq!(dev.write_byte(0x11), Err(Error::DeviceUnavailable));
        assert_eq!(dev.write(&[1, 2]), Err(Error::DeviceUnavailable));
        assert_eq!(
            dev.transfer_full_duplex(&[1, 2, 3, 4], &mut read),
            Err(Error::DeviceUnavailable)
        );
        // Closed takes precedence over argument checks
        assert_eq!(
            dev.transfer_full_duplex(&[1], &mut read),
            Err(Error::DeviceUnavailable)
        );
        let mut empty: [u8; 0] = [];
        assert_eq!(dev.read(&mut empty), Err(Error::DeviceUnavailable));

        assert_eq!(read, [0xA5; 4]);
        assert_eq!(dev.backend().calls, 0);
    }

    #[test]
    fn test_open_rejects_unsupported_and_tears_down() {
        let teardowns = Rc::new(Cell::new(0));
        let backend = CountingLoopback {
            teardowns: teardowns.clone(),
            ..Default::default()
        };
        let settings = ConnectionSettings::default().with_mode(SpiMode::Mode2);
        let err = SpiDevice::open(settings, backend).unwrap_err();
        assert_eq!(
            err,
            Error::UnsupportedSettings(UnsupportedSetting::Mode(SpiMode::Mode2))
        );
        assert_eq!(teardowns.get(), 1);
    }

    #[test]
    fn test_oversized_transfer_fails_without_bus_activity() {
        let backend = CountingLoopback {
            max_len: Some(4),
            ..Default::default()
        };
        let mut dev = SpiDevice::open(ConnectionSettings::default(), backend).unwrap();
        assert_eq!(dev.write(&[0u8; 5]), Err(Error::TransferFailure));
        dev.write(&[0u8; 4]).unwrap();
        assert_eq!(dev.backend().calls, 1);
    }

    #[test]
    fn test_single_byte_respects_transfer_limit() {
        let backend = CountingLoopback {
            max_len: Some(0),
            ..Default::default()
        };
        let mut dev = SpiDevice::open(ConnectionSettings::default(), backend).unwrap();
        assert_eq!(dev.read_byte(), Err(Error::TransferFailure));
        assert_eq!(dev.write_byte(0xA5), Err(Error::TransferFailure));
        assert_eq!(dev.read(&mut [0u8; 1]), Err(Error::TransferFailure));
        assert_eq!(dev.backend().calls, 0);
    }
}
