use std::io;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid maze dimension: {width}x{height}")]
    InvalidDimension { width: i32, height: i32 },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] SimError),
}

pub type SimResult<T> = Result<T, SimError>;
