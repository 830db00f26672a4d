use thiserror::Error;

/// Top-level error type for the RIM core crate.
#[derive(Error, Debug)]
pub enum RimError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] ::config::ConfigError),
}

pub type Result<T> = std::result::Result<T, RimError>;
