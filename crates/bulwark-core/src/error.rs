use thiserror::Error;

/// Top-level error type for the Bulwark platform.
#[derive(Error, Debug)]
pub enum BulwarkError {
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for BulwarkError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
