use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JscrError {
    #[error("Configuration file {path} is missing, cannot proceed")]
    ConfigNotFound { path: PathBuf },

    #[error("Output directory {path} not found")]
    InvalidOutputDirectory { path: PathBuf },

    #[error("Recorder binary not found as '{binary}': {source}")]
    BinaryNotFound {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No cameras defined")]
    NoCamerasDefined,

    #[error("Invalid setting {key}: {message}")]
    InvalidSetting { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to spawn recorder for camera {camera}: {source}")]
    Spawn {
        camera: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to signal process {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("System error: {message}")]
    System { message: String },
}

impl JscrError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn invalid_setting<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        Self::InvalidSetting {
            key: key.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, JscrError>;
