//! Playback voice.
//!
//! A [`Voice`] is one live decode session: it owns a decoder and the two
//! scratch buffers the decoder renders into, and remembers the pause flag and
//! the last pattern reported to listeners.
//!
//! Decoder and scratch buffers are released together by [`Voice::release`],
//! which is idempotent. Dropping a voice releases it too, so every exit path
//! (explicit stop, natural end, decode fault, drop) converges on the same
//! single release.

use crate::decoder::{DecoderEngine, ModuleDecoder};
use crate::error::{PlayerError, Result};

/// Sentinel for "no pattern observed yet".
pub const NO_PATTERN: i32 = -1;

/// Outcome of a single chunked decode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkResult {
    /// Frames written to the scratch buffers (0 = end of stream).
    pub frames: usize,
    /// The decoder handle is no longer valid.
    pub errored: bool,
}

/// One live decode-and-render session.
pub struct Voice<D: ModuleDecoder> {
    decoder: Option<D>,
    left: Option<Box<[f32]>>,
    right: Option<Box<[f32]>>,
    max_chunk_frames: usize,
    channel_count: i32,
    last_pattern: i32,
    paused: bool,
    faulted: bool,
    chunk_frames: usize,
}

impl<D: ModuleDecoder> Voice<D> {
    /// Instantiate a decoder for `bytes` and allocate scratch buffers for
    /// chunks of up to `max_chunk_frames` frames.
    ///
    /// Fails without leaving anything allocated if the decoder rejects the
    /// module.
    pub fn create<E>(engine: &E, bytes: &[u8], max_chunk_frames: usize) -> Result<Self>
    where
        E: DecoderEngine<Decoder = D>,
    {
        if max_chunk_frames == 0 {
            return Err(PlayerError::config("max_chunk_frames must be greater than 0"));
        }

        let decoder = engine.create(bytes)?;
        let channel_count = decoder.num_channels();
        tracing::debug!(
            bytes = bytes.len(),
            channels = channel_count,
            max_chunk_frames,
            "voice created"
        );

        Ok(Self {
            decoder: Some(decoder),
            left: Some(vec![0.0; max_chunk_frames].into_boxed_slice()),
            right: Some(vec![0.0; max_chunk_frames].into_boxed_slice()),
            max_chunk_frames,
            channel_count,
            last_pattern: NO_PATTERN,
            paused: false,
            faulted: false,
            chunk_frames: 0,
        })
    }

    /// Decode up to `frames_requested` frames (capped at the chunk size) into
    /// the scratch buffers.
    ///
    /// A released or faulted voice makes no decoder call and reports
    /// `errored`.
    pub fn render_chunk(&mut self, sample_rate: u32, frames_requested: usize) -> ChunkResult {
        self.chunk_frames = 0;
        if self.faulted {
            return ChunkResult {
                frames: 0,
                errored: true,
            };
        }
        let (Some(decoder), Some(left), Some(right)) =
            (self.decoder.as_mut(), self.left.as_mut(), self.right.as_mut())
        else {
            return ChunkResult {
                frames: 0,
                errored: true,
            };
        };

        let count = frames_requested.min(self.max_chunk_frames);
        match decoder.read_float_stereo(sample_rate, &mut left[..count], &mut right[..count]) {
            Ok(frames) => {
                self.chunk_frames = frames.min(count);
                ChunkResult {
                    frames: self.chunk_frames,
                    errored: false,
                }
            }
            Err(fault) => {
                tracing::warn!(error = %fault, "decoder became invalid mid-stream");
                self.faulted = true;
                ChunkResult {
                    frames: 0,
                    errored: true,
                }
            }
        }
    }

    /// Left channel samples produced by the last [`render_chunk`](Self::render_chunk).
    pub fn chunk_left(&self) -> &[f32] {
        match self.left.as_deref() {
            Some(buf) => &buf[..self.chunk_frames],
            None => &[],
        }
    }

    /// Right channel samples produced by the last [`render_chunk`](Self::render_chunk).
    pub fn chunk_right(&self) -> &[f32] {
        match self.right.as_deref() {
            Some(buf) => &buf[..self.chunk_frames],
            None => &[],
        }
    }

    /// Free the decoder and both scratch buffers.
    ///
    /// Returns `true` if this call released anything; later calls are no-ops.
    pub fn release(&mut self) -> bool {
        let decoder = self.decoder.take();
        let left = self.left.take();
        let right = self.right.take();
        let released = decoder.is_some() || left.is_some() || right.is_some();

        drop(decoder);
        drop(left);
        drop(right);
        self.chunk_frames = 0;

        if released {
            tracing::debug!(faulted = self.faulted, "voice released");
        }
        released
    }

    /// Whether the voice has been released.
    pub fn is_released(&self) -> bool {
        self.decoder.is_none()
    }

    /// Whether the decoder reported a fault.
    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// Pause rendering. The decoder is not touched.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume rendering.
    pub fn unpause(&mut self) {
        self.paused = false;
    }

    /// Flip the pause flag.
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Whether the voice is paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Record `pattern` as the latest observed one.
    /// Returns `true` if it differs from the previous observation.
    pub fn observe_pattern(&mut self, pattern: i32) -> bool {
        if pattern == self.last_pattern {
            return false;
        }
        self.last_pattern = pattern;
        true
    }

    /// Last pattern reported to listeners, [`NO_PATTERN`] before the first tick.
    pub fn last_pattern(&self) -> i32 {
        self.last_pattern
    }

    /// Chunk size this voice was created with.
    pub fn max_chunk_frames(&self) -> usize {
        self.max_chunk_frames
    }

    /// Module channel count read at creation.
    pub fn channel_count(&self) -> i32 {
        self.channel_count
    }

    fn decoder(&self) -> Option<&D> {
        if self.faulted {
            None
        } else {
            self.decoder.as_ref()
        }
    }

    /// Current pattern, 0 once released.
    pub fn current_pattern(&self) -> i32 {
        self.decoder().map_or(0, |d| d.current_pattern())
    }

    /// Current row, 0 once released.
    pub fn current_row(&self) -> i32 {
        self.decoder().map_or(0, |d| d.current_row())
    }

    /// Pattern count, 0 once released.
    pub fn num_patterns(&self) -> i32 {
        self.decoder().map_or(0, |d| d.num_patterns())
    }

    /// Rows in `pattern`, 0 once released.
    pub fn pattern_num_rows(&self, pattern: i32) -> i32 {
        self.decoder().map_or(0, |d| d.pattern_num_rows(pattern))
    }

    /// Song length in seconds, 0 once released.
    pub fn duration_seconds(&self) -> f64 {
        self.decoder().map_or(0.0, |d| d.duration_seconds())
    }

    /// Playback position in seconds, 0 once released.
    pub fn position_seconds(&self) -> f64 {
        self.decoder().map_or(0.0, |d| d.position_seconds())
    }

    /// Formatted pattern cell, empty once released.
    pub fn pattern_row_channel(&self, pattern: i32, row: i32, channel: i32) -> String {
        self.decoder().map_or_else(String::new, |d| {
            d.format_pattern_row_channel(pattern, row, channel, 0, true)
        })
    }

    /// Seek the decoder. No-op once released.
    pub fn set_position_seconds(&mut self, seconds: f64) {
        if self.faulted {
            return;
        }
        if let Some(decoder) = self.decoder.as_mut() {
            decoder.set_position_seconds(seconds);
        }
    }

    /// Set the decoder repeat count. No-op once released.
    pub fn set_repeat_count(&mut self, repeat_count: i32) {
        if self.faulted {
            return;
        }
        if let Some(decoder) = self.decoder.as_mut() {
            decoder.set_repeat_count(repeat_count);
        }
    }

    /// Decoder access for metadata marshaling.
    pub(crate) fn live_decoder(&self) -> Option<&D> {
        self.decoder()
    }
}

impl<D: ModuleDecoder> Drop for Voice<D> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<D: ModuleDecoder> std::fmt::Debug for Voice<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Voice")
            .field("released", &self.is_released())
            .field("faulted", &self.faulted)
            .field("paused", &self.paused)
            .field("channel_count", &self.channel_count)
            .field("last_pattern", &self.last_pattern)
            .field("max_chunk_frames", &self.max_chunk_frames)
            .finish()
    }
}
