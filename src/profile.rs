//! Device profile files
//!
//! A profile stores the backend and connection settings for one peripheral
//! so they need not be repeated on every invocation:
//!
//! ```toml
//! [device]
//! backend = "linux_spi:dev=/dev/spidev0.1"
//!
//! [settings]
//! bus_id = 0
//! chip_select_line = 1
//! clock_frequency = 1000000
//! mode = "mode3"
//! data_bit_length = 8
//! chip_select = "active_low"
//! data_flow = "msb_first"
//! ```
//!
//! Every key is optional; missing settings take their defaults.

use serde::Deserialize;
use spidevice_core::ConnectionSettings;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors loading a profile
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Failed to read file
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not a valid profile
    #[error("Invalid profile {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// `[device]` table
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProfileDevice {
    backend: Option<String>,
}

/// Profile file structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProfileFile {
    #[serde(default)]
    device: ProfileDevice,
    #[serde(default)]
    settings: ConnectionSettings,
}

/// A loaded profile
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    /// Backend specification, if the profile names one
    pub backend: Option<String>,
    /// Connection settings
    pub settings: ConnectionSettings,
}

impl Profile {
    /// Parse a profile from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let file: ProfileFile = toml::from_str(content)?;
        Ok(Self {
            backend: file.device.backend,
            settings: file.settings,
        })
    }

    /// Load a profile from a file
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let content = fs::read_to_string(path).map_err(|e| ProfileError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let profile = Self::from_toml_str(&content).map_err(|e| ProfileError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        log::debug!("Loaded profile {}: {:?}", path.display(), profile);
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spidevice_core::{ChipSelect, DataFlow, SpiMode};

    #[test]
    fn test_full_profile() {
        let profile = Profile::from_toml_str(
            r#"
            [device]
            backend = "dummy:loopback=1"

            [settings]
            bus_id = 1
            chip_select_line = 2
            clock_frequency = 1000000
            mode = "mode3"
            data_bit_length = 8
            chip_select = "active_high"
            data_flow = "lsb_first"
            "#,
        )
        .unwrap();

        assert_eq!(profile.backend.as_deref(), Some("dummy:loopback=1"));
        assert_eq!(
            profile.settings,
            ConnectionSettings::new(1, 2)
                .with_clock_frequency(1_000_000)
                .with_mode(SpiMode::Mode3)
                .with_chip_select(ChipSelect::ActiveHigh)
                .with_data_flow(DataFlow::LsbFirst)
        );
    }

    #[test]
    fn test_partial_profile_uses_defaults() {
        let profile = Profile::from_toml_str("[settings]\nchip_select = \"none\"\n").unwrap();
        assert_eq!(profile.backend, None);
        assert_eq!(
            profile.settings,
            ConnectionSettings::default().with_chip_select(ChipSelect::None)
        );
    }

    #[test]
    fn test_empty_profile() {
        let profile = Profile::from_toml_str("").unwrap();
        assert_eq!(profile.settings, ConnectionSettings::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Profile::from_toml_str("[settings]\nspeed = 5\n").is_err());
        assert!(Profile::from_toml_str("[settings]\nmode = \"mode7\"\n").is_err());
    }
}
