//! Decoder capability.
//!
//! The decoder is an opaque engine that turns module bytes into stereo float
//! PCM. Format parsing, mixing and resampling all live behind these traits;
//! the rest of the crate only drives them.
//!
//! # Trait Hierarchy
//!
//! - [`DecoderEngine`] - process-wide factory that instantiates decoders
//! - [`ModuleDecoder`] - one live decoder instance for one module
//!
//! Destroying a decoder is `Drop`. A [`Voice`](crate::Voice) owns its decoder
//! exclusively, so the native handle is destroyed exactly once.

#[cfg(feature = "libopenmpt")]
pub mod openmpt;

#[cfg(test)]
pub(crate) mod mock;

use crate::error::{DecoderError, PlayerError, Result};
use std::sync::OnceLock;
use thiserror::Error;

/// Tag carried by the `onError` payload for decode failures.
pub const DECODE_ERROR_KIND: &str = "openmpt";

/// A live decoder instance became unusable while producing audio.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("decoder fault: {0}")]
pub struct DecoderFault(pub String);

/// One decode session for a loaded module.
///
/// Query methods mirror the tracker view of the module: patterns are the
/// sequence blocks, rows the lines within a pattern. All indices are the
/// decoder's own and are only used for change notification.
pub trait ModuleDecoder: Send {
    /// Number of channels in the module (not the output channel count).
    fn num_channels(&self) -> i32;

    /// Render up to `left.len()` frames of stereo float PCM.
    ///
    /// `left` and `right` have equal length. Returns the number of frames
    /// written; `Ok(0)` is a clean end of stream. `Err` means the decoder
    /// handle is no longer valid and nothing further can be rendered.
    fn read_float_stereo(
        &mut self,
        sample_rate: u32,
        left: &mut [f32],
        right: &mut [f32],
    ) -> std::result::Result<usize, DecoderFault>;

    /// Pattern currently being played.
    fn current_pattern(&self) -> i32;

    /// Row currently being played within the current pattern.
    fn current_row(&self) -> i32;

    /// Total number of patterns.
    fn num_patterns(&self) -> i32;

    /// Number of rows in `pattern`, 0 if it does not exist.
    fn pattern_num_rows(&self, pattern: i32) -> i32;

    /// Estimated song length in seconds.
    fn duration_seconds(&self) -> f64;

    /// Current playback position in seconds.
    fn position_seconds(&self) -> f64;

    /// Jump to a position in seconds.
    fn set_position_seconds(&mut self, seconds: f64);

    /// Number of extra repeats (-1 loops forever, 0 plays once).
    fn set_repeat_count(&mut self, repeat_count: i32);

    /// `;`-delimited list of available metadata keys.
    fn metadata_keys(&self) -> String;

    /// Metadata value for `key`, empty if unknown.
    fn metadata(&self, key: &str) -> String;

    /// Textual rendering of one pattern cell.
    fn format_pattern_row_channel(
        &self,
        pattern: i32,
        row: i32,
        channel: i32,
        width: usize,
        pad: bool,
    ) -> String;
}

/// Factory for decoder instances.
pub trait DecoderEngine: Send + Sync + 'static {
    /// Decoder type produced by this engine.
    type Decoder: ModuleDecoder + 'static;

    /// Instantiate a decoder from raw module bytes.
    fn create(&self, bytes: &[u8]) -> std::result::Result<Self::Decoder, DecoderError>;
}

type EngineInit<E> = Box<dyn Fn() -> Result<E> + Send + Sync>;

/// Lazily initialised, initialise-once holder for a decoder engine.
///
/// The engine is brought up on first use and kept until the holder is
/// dropped. A failed initialisation is not cached, so the next call retries.
pub struct EngineCell<E: DecoderEngine> {
    engine: OnceLock<E>,
    init: EngineInit<E>,
}

impl<E: DecoderEngine> EngineCell<E> {
    /// Create a cell that runs `init` the first time the engine is needed.
    pub fn lazy<F>(init: F) -> Self
    where
        F: Fn() -> Result<E> + Send + Sync + 'static,
    {
        Self {
            engine: OnceLock::new(),
            init: Box::new(init),
        }
    }

    /// Create a cell around an engine that is already initialised.
    pub fn ready(engine: E) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(engine);
        Self {
            engine: cell,
            init: Box::new(|| Err(PlayerError::Engine("engine already consumed".into()))),
        }
    }

    /// Get the engine, initialising it if needed.
    pub fn get(&self) -> Result<&E> {
        if let Some(engine) = self.engine.get() {
            return Ok(engine);
        }
        let engine = (self.init)().inspect_err(|e| {
            tracing::warn!(error = %e, "decoder engine initialisation failed");
        })?;
        Ok(self.engine.get_or_init(|| engine))
    }

    /// Whether the engine has been initialised.
    pub fn is_initialized(&self) -> bool {
        self.engine.get().is_some()
    }
}

impl<E: DecoderEngine> std::fmt::Debug for EngineCell<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineCell")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
