//! Backend registry and dispatch
//!
//! This module maps backend specification strings to concrete backends and
//! hands back a type-erased device channel. Everything else in the CLI only
//! sees `BoxedSpiDevice`.

use spidevice_core::{BoxedSpiDevice, ConnectionSettings};
use std::collections::HashMap;

/// Information about a backend
pub struct BackendInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available backends (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_backends() -> Vec<BackendInfo> {
    let mut backends = Vec::new();

    #[cfg(feature = "dummy")]
    backends.push(BackendInfo {
        name: "dummy",
        aliases: &[],
        description: "In-memory recording backend (loopback=<0|1>,fill=<byte>,maxlen=<bytes>)",
    });

    #[cfg(feature = "linux-spi")]
    backends.push(BackendInfo {
        name: "linux_spi",
        aliases: &["linux-spi", "spidev"],
        description: "Linux spidev interface (dev=/dev/spidevX.Y,spispeed=<kHz>,mode=<0-3>)",
    });

    backends
}

/// Generate a short list of backend names for CLI help
pub fn backend_names_short() -> String {
    let backends = available_backends();
    let names: Vec<&str> = backends.iter().map(|b| b.name).collect();
    names.join(", ")
}

/// Resolve a name or alias to the canonical backend name
pub fn find_backend(name: &str) -> Option<&'static str> {
    available_backends()
        .into_iter()
        .find(|b| b.name == name || b.aliases.contains(&name))
        .map(|b| b.name)
}

/// Parsed backend parameters
#[derive(Debug)]
pub struct BackendParams {
    /// Backend name as given
    pub name: String,
    /// Key-value parameters
    pub params: HashMap<String, String>,
}

impl BackendParams {
    /// Parameters as borrowed pairs, the form backend crates accept
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        self.params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

/// Parse a backend string into name and parameters
///
/// Format: "name" or "name:key1=value1,key2=value2"
pub fn parse_backend_params(s: &str) -> Result<BackendParams, Box<dyn std::error::Error>> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

    let mut params = HashMap::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                params.insert(key.to_string(), value.to_string());
            } else {
                return Err(
                    format!("Invalid parameter format: '{}' (expected key=value)", opt).into(),
                );
            }
        }
    }

    Ok(BackendParams {
        name: name.to_string(),
        params,
    })
}

/// Open a device channel
///
/// # Arguments
/// * `backend` - Backend specification (e.g., "dummy:loopback=1" or
///   "linux_spi:dev=/dev/spidev0.0")
/// * `settings` - Connection settings requested by the user
#[allow(unused_variables)]
pub fn open_device(
    backend: &str,
    settings: ConnectionSettings,
) -> Result<BoxedSpiDevice, Box<dyn std::error::Error>> {
    let params = parse_backend_params(backend)?;
    let name = find_backend(&params.name).ok_or_else(|| {
        format!(
            "Unknown backend '{}' [available: {}]",
            params.name,
            backend_names_short()
        )
    })?;
    let options = params.pairs();

    log::debug!("Opening backend {} with {} option(s)", name, options.len());

    match name {
        #[cfg(feature = "dummy")]
        "dummy" => spidevice_dummy::open_boxed(&options, settings),
        #[cfg(feature = "linux-spi")]
        "linux_spi" => spidevice_linux::open_boxed(&options, settings),
        _ => Err(format!("Backend '{}' is not compiled in", name).into()),
    }
}
