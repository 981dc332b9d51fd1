//! Player configuration.
//!
//! Process-wide playback settings applied to every voice the player creates.
//! Configurations can be built in code or loaded from JSON:
//!
//! ```json
//! { "repeat_count": -1, "tick_frames": 1024 }
//! ```
//!
//! Missing fields fall back to their defaults.

use crate::error::{PlayerError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of frames requested from the decoder per chunk.
pub const DEFAULT_MAX_CHUNK_FRAMES: usize = 4096;

/// Default number of frames rendered per audio-callback tick.
pub const DEFAULT_TICK_FRAMES: usize = 2048;

/// Default output sample rate (44.1 kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Configuration for a [`ChiptunePlayer`](crate::ChiptunePlayer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Repeat count handed to each new decoder.
    /// 0 plays once, -1 loops forever, n > 0 plays n extra times.
    pub repeat_count: i32,

    /// Upper bound on frames per decoder call.
    /// Also the capacity of each voice scratch buffer.
    pub max_chunk_frames: usize,

    /// Frames rendered per tick by the real-time host.
    pub tick_frames: usize,

    /// Output sample rate in Hz
    pub sample_rate: u32,

    /// Linear output gain
    pub volume: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            repeat_count: 0,
            max_chunk_frames: DEFAULT_MAX_CHUNK_FRAMES,
            tick_frames: DEFAULT_TICK_FRAMES,
            sample_rate: DEFAULT_SAMPLE_RATE,
            volume: 1.0,
        }
    }
}

impl PlayerConfig {
    /// Set the repeat count.
    pub fn with_repeat_count(mut self, repeat_count: i32) -> Self {
        self.repeat_count = repeat_count;
        self
    }

    /// Set the maximum chunk length in frames.
    pub fn with_max_chunk_frames(mut self, frames: usize) -> Self {
        self.max_chunk_frames = frames;
        self
    }

    /// Set the tick length in frames.
    pub fn with_tick_frames(mut self, frames: usize) -> Self {
        self.tick_frames = frames;
        self
    }

    /// Set the output sample rate.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Set the output gain.
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    /// Check that the configuration can drive a voice.
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_frames == 0 {
            return Err(PlayerError::config("max_chunk_frames must be greater than 0"));
        }
        if self.tick_frames == 0 {
            return Err(PlayerError::config("tick_frames must be greater than 0"));
        }
        if self.sample_rate == 0 {
            return Err(PlayerError::config("sample_rate must be greater than 0"));
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(PlayerError::config(format!(
                "volume must be a finite non-negative number, got {}",
                self.volume
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PlayerConfig = serde_json::from_str(json)
            .map_err(|e| PlayerError::config(format!("malformed JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| PlayerError::acquisition(path, e))?;
        Self::from_json_str(&text)
    }

    /// Duration of one render tick in milliseconds.
    pub fn tick_latency_ms(&self) -> f32 {
        (self.tick_frames as f32 / self.sample_rate as f32) * 1000.0
    }
}
