//! Error types for module playback.
//!
//! Setup-time failures (reading module bytes, instantiating a decoder,
//! opening an audio device) are returned as [`PlayerError`]. Failures that
//! happen while a voice is rendering never surface here: the render loop
//! reports them through the `onError` event instead.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for playback setup and transport operations.
#[derive(Error, Debug)]
pub enum PlayerError {
    /// Raw module bytes could not be acquired.
    #[error("Failed to read module '{path}': {source}")]
    Acquisition {
        /// Where the bytes were being read from
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The decoder rejected the module bytes.
    #[error("Failed to initialize decoder: {0}")]
    DecoderInit(String),

    /// The process-wide decoding engine could not be brought up.
    #[error("Decoder engine unavailable: {0}")]
    Engine(String),

    /// Invalid player configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Audio device error.
    #[error("Audio device error: {0}")]
    AudioDevice(String),

    /// Offline rendering failed.
    #[error("Export failed: {0}")]
    Export(String),

    /// IO error from filesystem or device
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlayerError {
    /// Creates an acquisition error for the given path.
    pub fn acquisition(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PlayerError::Acquisition {
            path: path.into(),
            source,
        }
    }

    /// Creates a configuration error.
    pub fn config(reason: impl Into<String>) -> Self {
        PlayerError::Config(reason.into())
    }

    /// Creates an audio device error.
    pub fn audio_device(reason: impl Into<String>) -> Self {
        PlayerError::AudioDevice(reason.into())
    }
}

/// A decoder refused to instantiate from the supplied bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecoderError {
    /// The module data is empty.
    #[error("module data is empty")]
    Empty,

    /// The module data is corrupt or in an unsupported format.
    #[error("invalid module: {0}")]
    Invalid(String),
}

impl From<DecoderError> for PlayerError {
    fn from(err: DecoderError) -> Self {
        PlayerError::DecoderInit(err.to_string())
    }
}

/// Result type for player operations
pub type Result<T> = std::result::Result<T, PlayerError>;
