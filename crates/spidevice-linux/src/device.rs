//! Linux spidev backend implementation
//!
//! This module provides the `LinuxSpi` backend that implements the
//! `SpiBackend` trait using Linux's spidev interface.

use crate::error::{LinuxSpiError, Result};

use spidevice_core::{
    check_settings_supported, ChipSelect, ConnectionSettings, DataFlow, Error as CoreError,
    Result as CoreResult, SpiBackend, SpiDevice, SpiFeatures,
};

use std::fs::{File, OpenOptions};
use std::os::unix::io::{AsRawFd, IntoRawFd};

/// Path to kernel spidev buffer size parameter
const BUF_SIZE_SYSFS: &str = "/sys/module/spidev/parameters/bufsiz";

/// Bits of the spidev mode byte
pub mod mode_flags {
    /// Clock phase
    pub const SPI_CPHA: u8 = 0x01;
    /// Clock polarity
    pub const SPI_CPOL: u8 = 0x02;
    /// Chip-select active high
    pub const SPI_CS_HIGH: u8 = 0x04;
    /// Shift least significant bit first
    pub const SPI_LSB_FIRST: u8 = 0x08;
    /// Do not drive chip-select
    pub const SPI_NO_CS: u8 = 0x40;
}

/// Linux spidev ioctl constants
mod ioctl {
    use nix::ioctl_read;
    use nix::ioctl_write_ptr;

    // SPI ioctl magic number
    const SPI_IOC_MAGIC: u8 = b'k';

    // SPI ioctl type numbers
    const SPI_IOC_TYPE_MODE: u8 = 1;
    const SPI_IOC_TYPE_BITS_PER_WORD: u8 = 3;
    const SPI_IOC_TYPE_MAX_SPEED_HZ: u8 = 4;

    ioctl_write_ptr!(spi_ioc_wr_mode, SPI_IOC_MAGIC, SPI_IOC_TYPE_MODE, u8);
    ioctl_write_ptr!(
        spi_ioc_wr_bits_per_word,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_BITS_PER_WORD,
        u8
    );
    ioctl_read!(
        spi_ioc_rd_max_speed_hz,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_MAX_SPEED_HZ,
        u32
    );
    ioctl_write_ptr!(
        spi_ioc_wr_max_speed_hz,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_MAX_SPEED_HZ,
        u32
    );

    // SPI_IOC_MESSAGE(n) = _IOW(SPI_IOC_MAGIC, 0, char[n * sizeof(struct spi_ioc_transfer)])

    /// Size of struct spi_ioc_transfer
    pub const SPI_IOC_TRANSFER_SIZE: usize = 32;

    /// Calculate ioctl number for SPI_IOC_MESSAGE(n)
    pub fn spi_ioc_message(n: u8) -> libc::c_ulong {
        let size = (n as usize) * SPI_IOC_TRANSFER_SIZE;
        // _IOC(dir, type, nr, size) = ((dir)<<30)|((size)<<16)|((type)<<8)|(nr), _IOC_WRITE = 1
        ((1u32 << 30) | ((size as u32) << 16) | ((SPI_IOC_MAGIC as u32) << 8)) as libc::c_ulong
    }
}

/// SPI transfer structure for ioctl
/// This must match the kernel's struct spi_ioc_transfer layout
#[repr(C)]
#[derive(Debug, Default, Clone)]
struct SpiIocTransfer {
    tx_buf: u64,          // __u64 tx_buf
    rx_buf: u64,          // __u64 rx_buf
    len: u32,             // __u32 len
    speed_hz: u32,        // __u32 speed_hz
    delay_usecs: u16,     // __u16 delay_usecs
    bits_per_word: u8,    // __u8 bits_per_word
    cs_change: u8,        // __u8 cs_change
    tx_nbits: u8,         // __u8 tx_nbits
    rx_nbits: u8,         // __u8 rx_nbits
    word_delay_usecs: u8, // __u8 word_delay_usecs
    _pad: u8,             // padding
}

/// Build the spidev mode byte for `settings`
pub fn mode_bits(settings: &ConnectionSettings) -> u8 {
    use mode_flags::*;

    let mut bits = settings.mode.number() & (SPI_CPHA | SPI_CPOL);
    match settings.chip_select {
        ChipSelect::ActiveLow => {}
        ChipSelect::ActiveHigh => bits |= SPI_CS_HIGH,
        ChipSelect::None => bits |= SPI_NO_CS,
    }
    if settings.data_flow == DataFlow::LsbFirst {
        bits |= SPI_LSB_FIRST;
    }
    bits
}

/// Default device node for a bus and chip-select line
pub fn default_device_path(settings: &ConnectionSettings) -> String {
    format!("/dev/spidev{}.{}", settings.bus_id, settings.chip_select_line)
}

/// Configuration for opening a Linux spidev channel
#[derive(Debug, Clone)]
pub struct LinuxSpiConfig {
    /// Device path (e.g., "/dev/spidev0.0")
    pub device: String,
    /// Connection settings to program into the controller
    pub settings: ConnectionSettings,
}

impl Default for LinuxSpiConfig {
    fn default() -> Self {
        Self::new(ConnectionSettings::default())
    }
}

impl LinuxSpiConfig {
    /// Create a configuration for the node matching the settings' bus and
    /// chip-select line
    pub fn new(settings: ConnectionSettings) -> Self {
        Self {
            device: default_device_path(&settings),
            settings,
        }
    }

    /// Use an explicit device node
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }
}

/// Linux SPI backend using the spidev interface
///
/// This struct implements the `SpiBackend` trait for Linux systems using
/// the `/dev/spidevX.Y` device interface. Each transfer is issued as a
/// single `SPI_IOC_MESSAGE(1)` so chip-select stays asserted for the whole
/// transaction.
pub struct LinuxSpi {
    /// File handle for spidev device, `None` after teardown
    file: Option<File>,
    /// Device path, kept for diagnostics
    path: String,
    /// Maximum kernel buffer size
    max_kernel_buf_size: usize,
    /// Clock speed in Hz
    speed_hz: u32,
    /// Bits per word
    bits_per_word: u8,
}

impl LinuxSpi {
    /// Features of the spidev interface
    pub const FEATURES: SpiFeatures = SpiFeatures::ALL_MODES
        .union(SpiFeatures::LSB_FIRST)
        .union(SpiFeatures::CS_HIGH)
        .union(SpiFeatures::NO_CS)
        .union(SpiFeatures::WIDE_WORDS);

    /// Open and configure a spidev node without wrapping it in a device
    pub fn configure(config: &LinuxSpiConfig) -> Result<Self> {
        if config.device.is_empty() {
            return Err(LinuxSpiError::InvalidParameter(
                "No device specified. Use dev=/dev/spidevX.Y".into(),
            ));
        }
        let settings = &config.settings;

        log::debug!("linux_spi: Opening device {}", config.device);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&config.device)
            .map_err(|e| LinuxSpiError::OpenFailed {
                path: config.device.clone(),
                source: e,
            })?;

        let fd = file.as_raw_fd();

        let mode = mode_bits(settings);
        unsafe {
            ioctl::spi_ioc_wr_mode(fd, &mode).map_err(|e| LinuxSpiError::SetModeFailed {
                mode,
                source: std::io::Error::from_raw_os_error(e as i32),
            })?;
        }

        let bits = settings.data_bit_length;
        unsafe {
            ioctl::spi_ioc_wr_bits_per_word(fd, &bits).map_err(|e| {
                LinuxSpiError::SetBitsPerWordFailed {
                    bits,
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }

        let speed = settings.clock_frequency;
        unsafe {
            ioctl::spi_ioc_wr_max_speed_hz(fd, &speed).map_err(|e| {
                LinuxSpiError::SetSpeedFailed {
                    speed,
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }

        // The controller may round the clock down; report what it chose
        let mut actual: u32 = 0;
        if unsafe { ioctl::spi_ioc_rd_max_speed_hz(fd, &mut actual) }.is_ok() && actual != speed {
            log::warn!(
                "linux_spi: Requested {} Hz, controller reports {} Hz",
                speed,
                actual
            );
        }

        log::info!(
            "linux_spi: Opened {} (mode flags=0x{:02X}, {} bits, speed={} kHz)",
            config.device,
            mode,
            bits,
            speed / 1000
        );

        let max_kernel_buf_size = get_max_kernel_buf_size();
        log::debug!(
            "linux_spi: Max kernel buffer size: {} bytes",
            max_kernel_buf_size
        );

        Ok(Self {
            file: Some(file),
            path: config.device.clone(),
            max_kernel_buf_size,
            speed_hz: speed,
            bits_per_word: bits,
        })
    }

    /// Perform one SPI_IOC_MESSAGE(1) transaction
    ///
    /// A null `tx_buf` makes the kernel clock out zeros; a null `rx_buf`
    /// discards what comes in.
    fn spi_message(&mut self, tx: Option<&[u8]>, rx: Option<&mut [u8]>, len: usize) -> Result<()> {
        let fd = match &self.file {
            Some(file) => file.as_raw_fd(),
            None => return Err(LinuxSpiError::Closed(self.path.clone())),
        };

        let transfer = SpiIocTransfer {
            tx_buf: tx.map_or(0, |b| b.as_ptr() as u64),
            rx_buf: rx.map_or(0, |b| b.as_mut_ptr() as u64),
            len: len as u32,
            speed_hz: self.speed_hz,
            bits_per_word: self.bits_per_word,
            ..Default::default()
        };

        let ioctl_num = ioctl::spi_ioc_message(1);
        let ret = unsafe { libc::ioctl(fd, ioctl_num, &transfer as *const SpiIocTransfer) };

        if ret < 0 {
            return Err(LinuxSpiError::TransferFailed(
                std::io::Error::last_os_error(),
            ));
        }
        if ret as usize != len {
            return Err(LinuxSpiError::ShortTransfer {
                done: ret as usize,
                expected: len,
            });
        }

        Ok(())
    }

    fn to_core(&self, e: LinuxSpiError) -> CoreError {
        match e {
            LinuxSpiError::Closed(_) => CoreError::DeviceUnavailable,
            LinuxSpiError::TransferFailed(ref source) if is_handle_gone(source) => {
                log::error!("linux_spi: {} is gone: {}", self.path, source);
                CoreError::DeviceUnavailable
            }
            e => {
                log::error!("linux_spi: {}: {}", self.path, e);
                CoreError::TransferFailure
            }
        }
    }
}

impl SpiBackend for LinuxSpi {
    fn features(&self) -> SpiFeatures {
        Self::FEATURES
    }

    fn max_transfer_len(&self) -> usize {
        self.max_kernel_buf_size
    }

    fn read(&mut self, buf: &mut [u8]) -> CoreResult<()> {
        let len = buf.len();
        self.spi_message(None, Some(buf), len)
            .map_err(|e| self.to_core(e))
    }

    fn write(&mut self, data: &[u8]) -> CoreResult<()> {
        self.spi_message(Some(data), None, data.len())
            .map_err(|e| self.to_core(e))
    }

    fn transfer(&mut self, write: &[u8], read: &mut [u8]) -> CoreResult<()> {
        self.spi_message(Some(write), Some(read), write.len())
            .map_err(|e| self.to_core(e))
    }

    fn teardown(&mut self) -> CoreResult<()> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };
        let fd = file.into_raw_fd();
        nix::unistd::close(fd).map_err(|e| {
            self.to_core(LinuxSpiError::CloseFailed {
                path: self.path.clone(),
                source: std::io::Error::from_raw_os_error(e as i32),
            })
        })?;
        log::debug!("linux_spi: Closed {}", self.path);
        Ok(())
    }
}

/// Whether an ioctl failure means the node or its controller went away
fn is_handle_gone(e: &std::io::Error) -> bool {
    matches!(
        e.raw_os_error(),
        Some(libc::ENODEV) | Some(libc::ENXIO) | Some(libc::EBADF)
    )
}

/// Open a spidev channel
///
/// The settings are checked against what spidev can do before the device
/// node is touched.
pub fn open(config: &LinuxSpiConfig) -> Result<SpiDevice<LinuxSpi>> {
    check_settings_supported(&config.settings, LinuxSpi::FEATURES)?;
    let backend = LinuxSpi::configure(config)?;
    Ok(SpiDevice::open(config.settings, backend)?)
}

/// Read the maximum kernel buffer size from sysfs, or use page size as fallback
fn get_max_kernel_buf_size() -> usize {
    if let Ok(content) = std::fs::read_to_string(BUF_SIZE_SYSFS) {
        if let Ok(size) = content.trim().parse::<usize>() {
            if size > 0 {
                log::debug!("linux_spi: Using buffer size {} from sysfs", size);
                return size;
            }
        }
        log::warn!("linux_spi: Invalid buffer size in {}", BUF_SIZE_SYSFS);
    } else {
        log::debug!("linux_spi: Cannot read {}, using page size", BUF_SIZE_SYSFS);
    }

    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
    log::debug!("linux_spi: Using page size {} as buffer size", page_size);
    page_size
}

/// Parse backend options from a list of key-value pairs
///
/// `settings` supplies the defaults; `spispeed` and `mode` override them.
pub fn parse_options(
    options: &[(&str, &str)],
    settings: ConnectionSettings,
) -> Result<LinuxSpiConfig> {
    let mut config = LinuxSpiConfig::new(settings);

    for (key, value) in options {
        match *key {
            "dev" => {
                config.device = value.to_string();
            }
            "spispeed" => {
                // Parse speed in kHz
                let speed_khz: u32 = value.parse().map_err(|_| {
                    LinuxSpiError::InvalidParameter(format!("Invalid spispeed value: {}", value))
                })?;
                config.settings.clock_frequency = speed_khz.saturating_mul(1000);
            }
            "mode" => {
                let mode = value
                    .parse::<u8>()
                    .ok()
                    .and_then(spidevice_core::SpiMode::from_number)
                    .ok_or_else(|| {
                        LinuxSpiError::InvalidParameter(format!(
                            "Invalid SPI mode: {} (must be 0-3)",
                            value
                        ))
                    })?;
                config.settings.mode = mode;
            }
            _ => {
                log::warn!("linux_spi: Unknown option: {}={}", key, value);
            }
        }
    }

    if config.device.is_empty() {
        return Err(LinuxSpiError::InvalidParameter(
            "No device specified. Use dev=/dev/spidevX.Y".into(),
        ));
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spidevice_core::{SpiMode, UnsupportedSetting};

    #[test]
    fn test_transfer_struct_matches_kernel() {
        assert_eq!(
            std::mem::size_of::<SpiIocTransfer>(),
            ioctl::SPI_IOC_TRANSFER_SIZE
        );
    }

    fn detached(path: &str) -> LinuxSpi {
        LinuxSpi {
            file: None,
            path: path.to_string(),
            max_kernel_buf_size: 4096,
            speed_hz: 500_000,
            bits_per_word: 8,
        }
    }

    fn os_error(errno: i32) -> LinuxSpiError {
        LinuxSpiError::TransferFailed(std::io::Error::from_raw_os_error(errno))
    }

    #[test]
    fn test_error_mapping() {
        let spi = detached("/dev/spidev9.9");
        assert_eq!(spi.to_core(os_error(libc::ENODEV)), CoreError::DeviceUnavailable);
        assert_eq!(spi.to_core(os_error(libc::ENXIO)), CoreError::DeviceUnavailable);
        assert_eq!(spi.to_core(os_error(libc::EBADF)), CoreError::DeviceUnavailable);
        assert_eq!(spi.to_core(os_error(libc::EIO)), CoreError::TransferFailure);
        assert_eq!(
            spi.to_core(LinuxSpiError::ShortTransfer {
                done: 1,
                expected: 4
            }),
            CoreError::TransferFailure
        );
        assert_eq!(
            spi.to_core(LinuxSpiError::Closed(spi.path.clone())),
            CoreError::DeviceUnavailable
        );
    }

    #[test]
    fn test_detached_handle_is_unavailable() {
        let mut spi = detached("/dev/spidev9.9");
        let mut buf = [0u8; 2];
        assert_eq!(spi.read(&mut buf), Err(CoreError::DeviceUnavailable));
        assert_eq!(spi.write(&[1]), Err(CoreError::DeviceUnavailable));
        assert_eq!(spi.teardown(), Ok(()));
    }

    #[test]
    fn test_ioc_message_number() {
        // SPI_IOC_MESSAGE(1) on Linux is 0x40206b00
        assert_eq!(ioctl::spi_ioc_message(1), 0x4020_6b00);
    }

    #[test]
    fn test_mode_bits() {
        let s = ConnectionSettings::default();
        assert_eq!(mode_bits(&s), 0);

        let s = s
            .with_mode(SpiMode::Mode3)
            .with_chip_select(ChipSelect::ActiveHigh)
            .with_data_flow(DataFlow::LsbFirst);
        assert_eq!(
            mode_bits(&s),
            mode_flags::SPI_CPHA | mode_flags::SPI_CPOL | mode_flags::SPI_CS_HIGH | mode_flags::SPI_LSB_FIRST
        );

        let s = ConnectionSettings::default()
            .with_mode(SpiMode::Mode2)
            .with_chip_select(ChipSelect::None);
        assert_eq!(mode_bits(&s), mode_flags::SPI_CPOL | mode_flags::SPI_NO_CS);
    }

    #[test]
    fn test_default_path() {
        let config = LinuxSpiConfig::new(ConnectionSettings::new(1, 2));
        assert_eq!(config.device, "/dev/spidev1.2");
    }

    #[test]
    fn test_parse_options() {
        let config = parse_options(
            &[("dev", "/dev/spidev3.1"), ("spispeed", "4000"), ("mode", "3")],
            ConnectionSettings::default(),
        )
        .unwrap();
        assert_eq!(config.device, "/dev/spidev3.1");
        assert_eq!(config.settings.clock_frequency, 4_000_000);
        assert_eq!(config.settings.mode, SpiMode::Mode3);
    }

    #[test]
    fn test_parse_options_defaults_from_settings() {
        let config = parse_options(&[], ConnectionSettings::new(0, 1)).unwrap();
        assert_eq!(config.device, "/dev/spidev0.1");
        assert_eq!(config.settings.clock_frequency, 500_000);
    }

    #[test]
    fn test_parse_options_rejects_bad_mode() {
        let err = parse_options(&[("mode", "4")], ConnectionSettings::default()).unwrap_err();
        assert!(matches!(err, LinuxSpiError::InvalidParameter(_)));
        assert!(parse_options(&[("dev", "")], ConnectionSettings::default()).is_err());
    }

    #[test]
    fn test_open_missing_node() {
        let config = LinuxSpiConfig::default().with_device("/nonexistent/spidev9.9");
        let err = open(&config).unwrap_err();
        assert!(matches!(err, LinuxSpiError::OpenFailed { .. }));
    }

    #[test]
    fn test_unsupported_settings_checked_before_open() {
        let settings = ConnectionSettings::default().with_data_bit_length(64);
        let config = LinuxSpiConfig::new(settings).with_device("/nonexistent/spidev9.9");
        let err = open(&config).unwrap_err();
        assert!(matches!(
            err,
            LinuxSpiError::Core(CoreError::UnsupportedSettings(
                UnsupportedSetting::DataBitLength(64)
            ))
        ));
    }
}
