use thiserror::Error;

#[derive(Error, Debug)]
pub enum HeapError {
    #[error("Configuration has not yet been set")]
    MissingConfiguration,

    #[error("The durable type of record parameters does not exist")]
    MissingDurableType,

    #[error("The durable entity proxy of record parameters does not exist")]
    MissingEntityFactoryProxy,

    #[error("Unrecognized durable type tag: {0}")]
    InvalidDurableType(String),

    #[error("Unrecognized entity factory proxy descriptor: {0}")]
    UnknownEntityFactoryProxy(String),

    #[error("Invalid value for configuration key {key}: {value}")]
    InvalidConfigValue { key: String, value: String },

    #[error("Invalid magic number in region header")]
    InvalidMagic,

    #[error("Unsupported region version: {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },

    #[error("Invalid block size: {0}")]
    InvalidBlockSize(u32),

    #[error("Region header checksum verification failed")]
    ChecksumMismatch,

    #[error("Region capacity exhausted: requested {requested} bytes, {available} available")]
    OutOfSpace { requested: u64, available: u64 },

    #[error("Unknown allocator service: {0}")]
    UnknownService(String),

    #[error("No slot registered under key id {0}")]
    UnknownSlot(u64),

    #[error("Invalid session state: {0}")]
    InvalidState(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HeapError {
    /// True for the configuration branch of the taxonomy: absent mapping,
    /// violated validation rules, or unparseable configuration values.
    /// Allocator-open failures are everything else and are propagated as-is.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            HeapError::MissingConfiguration
                | HeapError::MissingDurableType
                | HeapError::MissingEntityFactoryProxy
                | HeapError::InvalidDurableType(_)
                | HeapError::UnknownEntityFactoryProxy(_)
                | HeapError::InvalidConfigValue { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, HeapError>;
