//! Thread-safe device handle
//!
//! A [`SpiDevice`] is single-owner. [`SharedSpiDevice`] puts it behind a
//! mutex so that clones can be handed to several threads, with every call
//! holding the lock for one whole transaction. Devices that share a
//! physical bus can additionally share a [`SpiBusLock`], which serializes
//! transactions across chip-select lines.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::SpiBackend;
use crate::device::{DeviceState, SpiDevice};
use crate::error::Result;
use crate::settings::ConnectionSettings;

/// Mutual exclusion for one physical SPI bus
#[derive(Debug, Clone, Default)]
pub struct SpiBusLock(Arc<Mutex<()>>);

impl SpiBusLock {
    /// Create a lock for a new bus
    pub fn new() -> Self {
        Self::default()
    }
}

/// Cloneable, thread-safe handle to a device channel
pub struct SharedSpiDevice<B: SpiBackend> {
    device: Arc<Mutex<SpiDevice<B>>>,
    bus: Option<SpiBusLock>,
}

impl<B: SpiBackend> Clone for SharedSpiDevice<B> {
    fn clone(&self) -> Self {
        Self {
            device: Arc::clone(&self.device),
            bus: self.bus.clone(),
        }
    }
}

impl<B: SpiBackend> SharedSpiDevice<B> {
    /// Share a device; transactions are serialized per channel
    pub fn new(device: SpiDevice<B>) -> Self {
        Self {
            device: Arc::new(Mutex::new(device)),
            bus: None,
        }
    }

    /// Share a device that sits on `bus` together with other devices
    ///
    /// Transactions are serialized against every device holding a clone
    /// of the same lock.
    pub fn on_bus(device: SpiDevice<B>, bus: &SpiBusLock) -> Self {
        Self {
            device: Arc::new(Mutex::new(device)),
            bus: Some(bus.clone()),
        }
    }

    // Lock order is always bus, then device.
    fn with_device<T>(&self, f: impl FnOnce(&mut SpiDevice<B>) -> T) -> T {
        let _bus = self.bus.as_ref().map(|b| b.0.lock());
        let mut device = self.device.lock();
        f(&mut device)
    }

    /// The settings the underlying channel was opened with
    pub fn connection_settings(&self) -> ConnectionSettings {
        *self.device.lock().connection_settings()
    }

    /// Current lifecycle state
    pub fn state(&self) -> DeviceState {
        self.device.lock().state()
    }

    /// See [`SpiDevice::read_byte`]
    pub fn read_byte(&self) -> Result<u8> {
        self.with_device(|d| d.read_byte())
    }

    /// See [`SpiDevice::read`]
    pub fn read(&self, buf: &mut [u8]) -> Result<()> {
        self.with_device(|d| d.read(buf))
    }

    /// See [`SpiDevice::write_byte`]
    pub fn write_byte(&self, data: u8) -> Result<()> {
        self.with_device(|d| d.write_byte(data))
    }

    /// See [`SpiDevice::write`]
    pub fn write(&self, data: &[u8]) -> Result<()> {
        self.with_device(|d| d.write(data))
    }

    /// See [`SpiDevice::transfer_full_duplex`]
    pub fn transfer_full_duplex(&self, write_buf: &[u8], read_buf: &mut [u8]) -> Result<()> {
        self.with_device(|d| d.transfer_full_duplex(write_buf, read_buf))
    }

    /// Release the channel for every clone of this handle
    pub fn release(&self) {
        self.with_device(|d| d.release())
    }

    /// Run `f` with exclusive access to the underlying device
    ///
    /// Useful for command sequences that must not be interleaved with other
    /// users of the bus, e.g. write-then-read register accesses.
    ///
    /// The locks are not re-entrant. Inside `f`, use the `&mut SpiDevice`
    /// argument only; calling into this handle, a clone of it, or any other
    /// handle sharing the same [`SpiBusLock`] deadlocks.
    pub fn lock<T>(&self, f: impl FnOnce(&mut SpiDevice<B>) -> T) -> T {
        self.with_device(f)
    }
}
