//! Error types for Drishti

use thiserror::Error;

/// Drishti error type
#[derive(Error, Debug)]
pub enum DrishtiError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Classification error: {0}")]
    Classification(String),

    #[error("Service error: {0}")]
    Service(String),

    #[error("Parameter error: {0}")]
    Params(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for DrishtiError {
    fn from(e: toml::de::Error) -> Self {
        DrishtiError::Config(e.to_string())
    }
}

impl From<serde_yaml::Error> for DrishtiError {
    fn from(e: serde_yaml::Error) -> Self {
        DrishtiError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for DrishtiError {
    fn from(e: serde_json::Error) -> Self {
        DrishtiError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DrishtiError>;
