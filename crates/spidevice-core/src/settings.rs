//! Connection settings of a channel
//!
//! A [`ConnectionSettings`] value is fixed when a channel is opened and can
//! only be read afterwards.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default SPI clock speed in Hz (500 kHz)
pub const DEFAULT_CLOCK_FREQUENCY: u32 = 500_000;

/// Default number of bits per word
pub const DEFAULT_DATA_BIT_LENGTH: u8 = 8;

/// SPI clock polarity and phase
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SpiMode {
    /// CPOL=0, CPHA=0: clock idle low, sample on rising edge
    #[default]
    Mode0,
    /// CPOL=0, CPHA=1: clock idle low, sample on falling edge
    Mode1,
    /// CPOL=1, CPHA=0: clock idle high, sample on falling edge
    Mode2,
    /// CPOL=1, CPHA=1: clock idle high, sample on rising edge
    Mode3,
}

/// Clock polarity (CPOL)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockPolarity {
    /// Clock is low when idle
    IdleLow,
    /// Clock is high when idle
    IdleHigh,
}

/// Clock phase (CPHA)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockPhase {
    /// Data sampled on the first clock transition
    CaptureOnFirstTransition,
    /// Data sampled on the second clock transition
    CaptureOnSecondTransition,
}

impl SpiMode {
    /// Returns the mode number (0-3) as used by most drivers
    pub const fn number(&self) -> u8 {
        match self {
            Self::Mode0 => 0,
            Self::Mode1 => 1,
            Self::Mode2 => 2,
            Self::Mode3 => 3,
        }
    }

    /// Looks up a mode by its number
    pub const fn from_number(n: u8) -> Option<Self> {
        match n {
            0 => Some(Self::Mode0),
            1 => Some(Self::Mode1),
            2 => Some(Self::Mode2),
            3 => Some(Self::Mode3),
            _ => None,
        }
    }

    /// Returns the clock polarity of this mode
    pub const fn polarity(&self) -> ClockPolarity {
        match self {
            Self::Mode0 | Self::Mode1 => ClockPolarity::IdleLow,
            Self::Mode2 | Self::Mode3 => ClockPolarity::IdleHigh,
        }
    }

    /// Returns the clock phase of this mode
    pub const fn phase(&self) -> ClockPhase {
        match self {
            Self::Mode0 | Self::Mode2 => ClockPhase::CaptureOnFirstTransition,
            Self::Mode1 | Self::Mode3 => ClockPhase::CaptureOnSecondTransition,
        }
    }
}

/// How the chip-select line is driven during a transaction
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ChipSelect {
    /// Line is pulled low to select the peripheral
    #[default]
    ActiveLow,
    /// Line is pulled high to select the peripheral
    ActiveHigh,
    /// Line is never asserted by the backend
    None,
}

/// Bit ordering on the wire
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DataFlow {
    /// Most significant bit first
    #[default]
    MsbFirst,
    /// Least significant bit first
    LsbFirst,
}

/// How a channel is electrically and logically configured
///
/// Defaults: bus 0, chip-select line 0, 500 kHz, mode 0, 8 bits per word,
/// chip-select active low, MSB first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct ConnectionSettings {
    /// SPI controller number
    pub bus_id: u32,
    /// Chip-select line on the controller
    pub chip_select_line: u32,
    /// Clock frequency in Hz
    pub clock_frequency: u32,
    /// Clock polarity/phase mode
    pub mode: SpiMode,
    /// Bits per transferred word
    pub data_bit_length: u8,
    /// Chip-select active level or "never assert"
    pub chip_select: ChipSelect,
    /// Bit ordering
    pub data_flow: DataFlow,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            bus_id: 0,
            chip_select_line: 0,
            clock_frequency: DEFAULT_CLOCK_FREQUENCY,
            mode: SpiMode::Mode0,
            data_bit_length: DEFAULT_DATA_BIT_LENGTH,
            chip_select: ChipSelect::ActiveLow,
            data_flow: DataFlow::MsbFirst,
        }
    }
}

impl ConnectionSettings {
    /// Create settings for the given bus and chip-select line
    pub fn new(bus_id: u32, chip_select_line: u32) -> Self {
        Self {
            bus_id,
            chip_select_line,
            ..Default::default()
        }
    }

    /// Set the clock frequency in Hz
    pub fn with_clock_frequency(mut self, hz: u32) -> Self {
        self.clock_frequency = hz;
        self
    }

    /// Set the clock polarity/phase mode
    pub fn with_mode(mut self, mode: SpiMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the number of bits per word
    pub fn with_data_bit_length(mut self, bits: u8) -> Self {
        self.data_bit_length = bits;
        self
    }

    /// Set the chip-select policy
    pub fn with_chip_select(mut self, chip_select: ChipSelect) -> Self {
        self.chip_select = chip_select;
        self
    }

    /// Set the bit ordering
    pub fn with_data_flow(mut self, data_flow: DataFlow) -> Self {
        self.data_flow = data_flow;
        self
    }
}
