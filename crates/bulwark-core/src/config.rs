//! Configuration management for Bulwark services.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (`BULWARK__` prefix, `__` section separator)
//! 2. Config file (`bulwark.toml` by default, optional)
//! 3. Serde defaults declared on the target type

use serde::de::DeserializeOwned;

use crate::error::BulwarkError;

/// Default config file prefix, resolved by the `config` crate to
/// `bulwark.toml`, `bulwark.yaml`, etc.
pub const DEFAULT_CONFIG_PREFIX: &str = "bulwark";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "BULWARK";

/// Load a configuration struct from the optional file `file_prefix` layered
/// under `BULWARK__*` environment variables.
pub fn load_layered<T: DeserializeOwned>(file_prefix: &str) -> Result<T, BulwarkError> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let loaded = cfg.try_deserialize::<T>()?;
    tracing::debug!(file_prefix, "Configuration loaded");
    Ok(loaded)
}
