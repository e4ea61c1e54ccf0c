//! Error types for spidevice-core
//!
//! This module provides a no_std compatible error type shared by the device
//! channel and every backend.

use core::fmt;

use crate::settings::{ChipSelect, DataFlow, SpiMode};

/// Details about a violated call precondition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentError {
    /// Full-duplex buffers differ in length
    LengthMismatch {
        /// Length of the outgoing buffer
        write: usize,
        /// Length of the incoming buffer
        read: usize,
    },
}

/// A connection setting the backend cannot honour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedSetting {
    /// No such SPI controller
    BusId(u32),
    /// No such chip-select line on the bus
    ChipSelectLine(u32),
    /// Clock frequency out of range
    ClockFrequency(u32),
    /// Clock polarity/phase mode not available
    Mode(SpiMode),
    /// Word length not available
    DataBitLength(u8),
    /// Chip-select policy not available
    ChipSelect(ChipSelect),
    /// Bit ordering not available
    DataFlow(DataFlow),
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A precondition checkable without touching hardware was violated
    InvalidArgument(ArgumentError),
    /// The channel is closed or its handle became invalid
    DeviceUnavailable,
    /// The backend attempted the transaction and it failed
    TransferFailure,
    /// The requested connection settings cannot be configured
    UnsupportedSettings(UnsupportedSetting),
}

impl fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMismatch { write, read } => write!(
                f,
                "full-duplex buffers differ in length (write {} bytes, read {} bytes)",
                write, read
            ),
        }
    }
}

impl fmt::Display for UnsupportedSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusId(id) => write!(f, "bus {} does not exist", id),
            Self::ChipSelectLine(line) => write!(f, "chip-select line {} does not exist", line),
            Self::ClockFrequency(hz) => write!(f, "clock frequency {} Hz not supported", hz),
            Self::Mode(mode) => write!(f, "SPI {:?} not supported", mode),
            Self::DataBitLength(bits) => write!(f, "{} bits per word not supported", bits),
            Self::ChipSelect(cs) => write!(f, "chip-select policy {:?} not supported", cs),
            Self::DataFlow(flow) => write!(f, "bit order {:?} not supported", flow),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(e) => write!(f, "invalid argument: {}", e),
            Self::DeviceUnavailable => write!(f, "SPI device unavailable"),
            Self::TransferFailure => write!(f, "SPI transfer failed"),
            Self::UnsupportedSettings(s) => write!(f, "unsupported connection settings: {}", s),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
