use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // `Display` for `toml::de::Error` embeds a snippet of the input; keep only the message.
        ConfigError::Toml(err.message().to_owned())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("a handler is already routed for type code {type_code:#06x}")]
    DuplicateTypeCode { type_code: u16 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("script cache payload is empty")]
    Empty,
    #[error("script cache payload is not valid UTF-8")]
    InvalidUtf8,
}

#[derive(Debug, Error)]
pub enum AttentionError {
    #[error("main window handle is unavailable")]
    NoWindow,
    #[error("window attention request failed: {0}")]
    Platform(String),
}

/// Why an optional capability module could not be loaded.
///
/// These never escape [`crate::plugins::find_optional_capability`]; they exist so
/// the loader can log a precise reason before returning `None`.
#[derive(Debug, Error)]
pub enum CapabilityLoadError {
    #[error("module candidate does not exist: {path:?}")]
    Missing { path: PathBuf },
    #[error("failed to load module {path:?}: {source}")]
    Library {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("module {path:?} does not export `{symbol}`")]
    MissingSymbol { path: PathBuf, symbol: String },
    #[error("module {path:?} targets plugin abi {found} (supported: {supported})")]
    AbiMismatch {
        path: PathBuf,
        found: u32,
        supported: u32,
    },
    #[error("module {path:?} returned no capability instance")]
    NullInstance { path: PathBuf },
    #[error("module {path:?} panicked while creating its capability")]
    Panicked { path: PathBuf },
    #[error("module {path:?} failed to initialize: {source}")]
    Initialize {
        path: PathBuf,
        #[source]
        source: CapabilityInitError,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CapabilityInitError(pub String);

impl CapabilityInitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
