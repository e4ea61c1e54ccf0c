//! Error types for Linux spidev operations

use thiserror::Error;

/// Linux spidev specific errors
#[derive(Debug, Error)]
pub enum LinuxSpiError {
    /// Failed to open device
    #[error("Failed to open {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to set SPI mode flags
    #[error("Failed to set SPI mode flags to 0x{mode:02X}: {source}")]
    SetModeFailed {
        mode: u8,
        #[source]
        source: std::io::Error,
    },

    /// Failed to set bits per word
    #[error("Failed to set bits per word to {bits}: {source}")]
    SetBitsPerWordFailed {
        bits: u8,
        #[source]
        source: std::io::Error,
    },

    /// Failed to set clock speed
    #[error("Failed to set clock speed to {speed} Hz: {source}")]
    SetSpeedFailed {
        speed: u32,
        #[source]
        source: std::io::Error,
    },

    /// SPI transfer failed
    #[error("SPI transfer failed: {0}")]
    TransferFailed(#[source] std::io::Error),

    /// Kernel clocked fewer bytes than requested
    #[error("Short SPI transfer: {done} of {expected} bytes")]
    ShortTransfer { done: usize, expected: usize },

    /// Device handle already closed
    #[error("Device {0} is closed")]
    Closed(String),

    /// Failed to close the device handle
    #[error("Failed to close {path}: {source}")]
    CloseFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Settings refused before touching the device
    #[error(transparent)]
    Core(#[from] spidevice_core::Error),
}

/// Result type for Linux spidev operations
pub type Result<T> = std::result::Result<T, LinuxSpiError>;
