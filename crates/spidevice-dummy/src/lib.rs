//! spidevice-dummy - In-memory SPI backend for testing
//!
//! This crate provides a dummy backend that records every transaction it
//! receives and answers from a scripted response queue. In loopback mode a
//! full-duplex transfer echoes the outgoing bytes, like a wire between MOSI
//! and MISO. It is useful for testing code written against
//! `spidevice_core::SpiDevice` without real hardware.

use std::collections::VecDeque;

use spidevice_core::{
    BoxedSpiBackend, BoxedSpiDevice, ConnectionSettings, Result, SpiBackend, SpiDevice, SpiFeatures,
};
use thiserror::Error;

/// Byte clocked in when nothing else is scripted (idle MISO pulled high)
pub const DEFAULT_FILL: u8 = 0xFF;

/// Errors raised while configuring a dummy device
#[derive(Debug, Error)]
pub enum DummyError {
    /// Invalid backend option
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The settings were refused
    #[error(transparent)]
    Core(#[from] spidevice_core::Error),
}

/// One transaction as seen on the emulated wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    /// Receive-only transfer of `len` bytes
    Read {
        /// Number of bytes clocked in
        len: usize,
    },
    /// Transmit-only transfer
    Write(Vec<u8>),
    /// Full-duplex transfer
    Transfer {
        /// Bytes clocked out
        sent: Vec<u8>,
        /// Bytes clocked in
        received: Vec<u8>,
    },
}

/// Configuration for the dummy backend
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Settings reported by the opened channel
    pub settings: ConnectionSettings,
    /// Echo outgoing bytes on full-duplex transfers
    pub loopback: bool,
    /// Byte returned when the response queue is empty
    pub fill: u8,
    /// Largest atomic transaction
    pub max_transfer_len: usize,
    /// Features the emulated controller advertises
    pub features: SpiFeatures,
    /// Fail every transfer with `TransferFailure`
    pub fail_transfers: bool,
    /// Fail teardown (the failure is logged, never surfaced)
    pub fail_teardown: bool,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            settings: ConnectionSettings::default(),
            loopback: false,
            fill: DEFAULT_FILL,
            max_transfer_len: 4096,
            features: SpiFeatures::all(),
            fail_transfers: false,
            fail_teardown: false,
        }
    }
}

impl DummyConfig {
    /// Create a configuration reporting the given settings
    pub fn new(settings: ConnectionSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    /// Echo outgoing bytes on full-duplex transfers
    pub fn with_loopback(mut self, loopback: bool) -> Self {
        self.loopback = loopback;
        self
    }

    /// Restrict the features the emulated controller advertises
    pub fn with_features(mut self, features: SpiFeatures) -> Self {
        self.features = features;
        self
    }
}

/// Dummy SPI backend
///
/// Keeps a log of transactions and a queue of bytes to hand out on reads.
/// Nothing written is ever read back, so consecutive transactions are
/// independent.
#[derive(Debug)]
pub struct DummySpi {
    config: DummyConfig,
    responses: VecDeque<u8>,
    transactions: Vec<Transaction>,
    teardowns: usize,
}

impl DummySpi {
    /// Create a new dummy backend with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        Self {
            config,
            responses: VecDeque::new(),
            transactions: Vec::new(),
            teardowns: 0,
        }
    }

    /// Create a dummy backend with default configuration
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Queue bytes the peripheral will send on subsequent reads
    pub fn with_responses(mut self, data: &[u8]) -> Self {
        self.responses.extend(data.iter().copied());
        self
    }

    /// Transactions recorded so far, oldest first
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Number of times teardown ran
    pub fn teardown_count(&self) -> usize {
        self.teardowns
    }

    fn next_rx(&mut self) -> u8 {
        self.responses.pop_front().unwrap_or(self.config.fill)
    }

    fn check_failure(&self) -> Result<()> {
        if self.config.fail_transfers {
            log::debug!("dummy: injected transfer failure");
            return Err(spidevice_core::Error::TransferFailure);
        }
        Ok(())
    }
}

impl SpiBackend for DummySpi {
    fn features(&self) -> SpiFeatures {
        self.config.features
    }

    fn max_transfer_len(&self) -> usize {
        self.config.max_transfer_len
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        self.check_failure()?;
        for byte in buf.iter_mut() {
            *byte = self.next_rx();
        }
        self.transactions.push(Transaction::Read { len: buf.len() });
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.check_failure()?;
        self.transactions.push(Transaction::Write(data.to_vec()));
        Ok(())
    }

    fn transfer(&mut self, write: &[u8], read: &mut [u8]) -> Result<()> {
        self.check_failure()?;
        if self.config.loopback {
            read.copy_from_slice(write);
        } else {
            for byte in read.iter_mut() {
                *byte = self.next_rx();
            }
        }
        self.transactions.push(Transaction::Transfer {
            sent: write.to_vec(),
            received: read.to_vec(),
        });
        Ok(())
    }

    fn teardown(&mut self) -> Result<()> {
        self.teardowns += 1;
        log::debug!(
            "dummy: teardown after {} transactions",
            self.transactions.len()
        );
        if self.config.fail_teardown {
            return Err(spidevice_core::Error::DeviceUnavailable);
        }
        Ok(())
    }
}

/// Open a dummy channel
pub fn open(config: DummyConfig) -> std::result::Result<SpiDevice<DummySpi>, DummyError> {
    open_with(DummySpi::new(config))
}

/// Open a channel over a prepared backend (e.g. one with queued responses)
pub fn open_with(backend: DummySpi) -> std::result::Result<SpiDevice<DummySpi>, DummyError> {
    let settings = backend.config.settings;
    Ok(SpiDevice::open(settings, backend)?)
}

/// Open a dummy channel and return it type-erased
///
/// This is a convenience function for use in the CLI backend dispatch.
pub fn open_boxed(
    options: &[(&str, &str)],
    settings: ConnectionSettings,
) -> std::result::Result<BoxedSpiDevice, Box<dyn std::error::Error>> {
    let config = parse_options(options, settings)?;
    let backend: BoxedSpiBackend = Box::new(DummySpi::new(config));
    Ok(SpiDevice::open(settings, backend)?)
}

/// Parse backend options from a list of key-value pairs
///
/// Recognised keys: `loopback` (0/1), `fill` (byte, hex or decimal),
/// `maxlen` (bytes).
pub fn parse_options(
    options: &[(&str, &str)],
    settings: ConnectionSettings,
) -> std::result::Result<DummyConfig, DummyError> {
    let mut config = DummyConfig::new(settings);

    for (key, value) in options {
        match *key {
            "loopback" => {
                config.loopback = match *value {
                    "1" | "yes" | "true" => true,
                    "0" | "no" | "false" => false,
                    _ => {
                        return Err(DummyError::InvalidParameter(format!(
                            "Invalid loopback value: {}",
                            value
                        )))
                    }
                };
            }
            "fill" => {
                let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
                    Some(hex) => u8::from_str_radix(hex, 16),
                    None => value.parse::<u8>(),
                };
                config.fill = parsed.map_err(|_| {
                    DummyError::InvalidParameter(format!("Invalid fill value: {}", value))
                })?;
            }
            "maxlen" => {
                config.max_transfer_len = value.parse().map_err(|_| {
                    DummyError::InvalidParameter(format!("Invalid maxlen value: {}", value))
                })?;
            }
            _ => {
                log::warn!("dummy: Unknown option: {}={}", key, value);
            }
        }
    }

    Ok(config)
}
