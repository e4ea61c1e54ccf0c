//! spidevice-core - Backend-agnostic SPI device channel
//!
//! This crate defines the contract every SPI backend implements and the
//! device channel callers program against. It is `no_std` compatible so the
//! same contract can be used on microcontrollers and on Linux hosts.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`) and the
//!   thread-safe [`SharedSpiDevice`] wrapper
//! - `alloc` - Enable boxed backends (`BoxedSpiDevice`)
//! - `serde` - Derive `Serialize`/`Deserialize` for the settings types
//!
//! # Example
//!
//! ```ignore
//! use spidevice_core::{SpiBackend, SpiDevice};
//!
//! fn read_id<B: SpiBackend>(dev: &mut SpiDevice<B>) -> spidevice_core::Result<[u8; 3]> {
//!     let mut id = [0u8; 3];
//!     dev.transfer_full_duplex(&[0x9F, 0x00, 0x00], &mut id)?;
//!     Ok(id)
//! }
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod backend;
pub mod device;
pub mod error;
pub mod settings;
#[cfg(feature = "std")]
pub mod shared;

pub use backend::{check_settings_supported, SpiBackend, SpiFeatures};
#[cfg(feature = "alloc")]
pub use backend::BoxedSpiBackend;
pub use device::{DeviceState, SpiDevice};
#[cfg(feature = "alloc")]
pub use device::BoxedSpiDevice;
pub use error::{ArgumentError, Error, Result, UnsupportedSetting};
pub use settings::{ChipSelect, ClockPhase, ClockPolarity, ConnectionSettings, DataFlow, SpiMode};
#[cfg(feature = "std")]
pub use shared::{SharedSpiDevice, SpiBusLock};
