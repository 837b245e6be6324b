use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BootstrapError>;

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Unable to read connection profile '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unable to parse connection profile '{path}': {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid connection profile: {0}")]
    ConfigInvalid(String),
    #[error("Unable to load settings '{path}': {reason}")]
    Settings { path: PathBuf, reason: String },
    #[error("Unable to find private key for {org} under '{dir}'")]
    KeyNotFound { org: String, dir: PathBuf },
    #[error("Unable to read keystore '{dir}': {source}")]
    Keystore {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unable to read crypto content '{path}': {source}")]
    CryptoContent {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid key material: {0}")]
    KeyMaterial(String),
    #[error("Store error at '{path}': {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid store key: {0}")]
    InvalidStoreKey(String),
    #[error("Missing requirement: {0}")]
    MissingComponent(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("No peers found for organization {0}")]
    NoPeers(String),
    #[error("Network error: {0}")]
    Network(String),
}

impl BootstrapError {
    /// Configuration problems are fatal and detected before any store is touched.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            BootstrapError::ConfigRead { .. }
                | BootstrapError::ConfigParse { .. }
                | BootstrapError::ConfigInvalid(_)
                | BootstrapError::Settings { .. }
        )
    }
}

/// Final status of a run, mapped onto the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Failure,
    ConfigError,
    PartialFailure,
}

impl RunStatus {
    pub fn exit_code(self) -> u8 {
        match self {
            RunStatus::Success => 0,
            RunStatus::Failure => 1,
            RunStatus::ConfigError => 2,
            RunStatus::PartialFailure => 3,
        }
    }

    pub fn from_error(err: &BootstrapError) -> Self {
        if err.is_config_error() {
            RunStatus::ConfigError
        } else {
            RunStatus::Failure
        }
    }
}
