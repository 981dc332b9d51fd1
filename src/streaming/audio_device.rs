//! Audio device integration using rodio
//!
//! [`PlayerSource`] is the render callback: every time its interleaved batch
//! runs dry it locks the player and renders one tick.

use super::{RodioOutput, SharedPlayer};
use crate::config::PlayerConfig;
use crate::decoder::{DecoderEngine, EngineCell};
use crate::error::{PlayerError, Result};
use crate::player::ChiptunePlayer;
use parking_lot::Mutex;
use rodio::{OutputStream, Sink, Source};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const CHANNELS: u16 = 2;

/// Audio source that renders ticks from a shared player.
pub struct PlayerSource<E: DecoderEngine> {
    player: SharedPlayer<E>,
    sample_rate: u32,
    gate: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    left: Vec<f32>,
    right: Vec<f32>,
    /// Interleaved samples of the last tick
    batch: Vec<f32>,
    batch_pos: usize,
}

impl<E: DecoderEngine> PlayerSource<E> {
    /// Create a source rendering `tick_frames` frames per lock of the player.
    ///
    /// Nothing is rendered while `gate` is closed; once `finished` is set the
    /// source ends.
    pub fn new(
        player: SharedPlayer<E>,
        sample_rate: u32,
        tick_frames: usize,
        gate: Arc<AtomicBool>,
        finished: Arc<AtomicBool>,
    ) -> Self {
        let batch_len = tick_frames * CHANNELS as usize;
        Self {
            player,
            sample_rate,
            gate,
            finished,
            left: vec![0.0; tick_frames],
            right: vec![0.0; tick_frames],
            batch: vec![0.0; batch_len],
            batch_pos: batch_len, // Start by rendering a new tick
        }
    }

    fn refill(&mut self) {
        self.batch_pos = 0;
        if !self.gate.load(Ordering::Acquire) {
            self.batch.fill(0.0);
            return;
        }

        self.player.lock().render(&mut self.left, &mut self.right);

        for (frame, (&l, &r)) in self
            .batch
            .chunks_exact_mut(CHANNELS as usize)
            .zip(self.left.iter().zip(self.right.iter()))
        {
            frame[0] = l;
            frame[1] = r;
        }
    }
}

impl<E: DecoderEngine> Source for PlayerSource<E> {
    fn current_frame_len(&self) -> Option<usize> {
        let remaining = self.batch.len().saturating_sub(self.batch_pos);
        if remaining > 0 {
            Some(remaining)
        } else {
            Some(self.batch.len())
        }
    }

    fn channels(&self) -> u16 {
        CHANNELS
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

impl<E: DecoderEngine> Iterator for PlayerSource<E> {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.finished.load(Ordering::Relaxed) {
            return None;
        }

        if self.batch_pos >= self.batch.len() {
            self.refill();
        }

        let sample = self.batch.get(self.batch_pos).copied().unwrap_or(0.0);
        self.batch_pos += 1;
        Some(sample)
    }
}

/// Audio playback device using rodio
pub struct AudioDevice {
    _stream: OutputStream,
    sink: Sink,
    finished: Arc<AtomicBool>,
}

impl AudioDevice {
    /// Open the default output device and attach a new player to it.
    ///
    /// Returns the device together with the shared player; transport calls
    /// go through the player, device-level pause/resume through the device.
    pub fn open<E: DecoderEngine>(
        engine: EngineCell<E>,
        config: PlayerConfig,
    ) -> Result<(Self, SharedPlayer<E>)> {
        config.validate()?;

        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| PlayerError::audio_device(format!("failed to create audio stream: {e}")))?;
        let sink = Sink::try_new(&stream_handle)
            .map_err(|e| PlayerError::audio_device(format!("failed to create audio sink: {e}")))?;

        let gate = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));

        let output = RodioOutput::new(config.sample_rate, Arc::clone(&gate));
        let sample_rate = config.sample_rate;
        let tick_frames = config.tick_frames;
        let player = Arc::new(Mutex::new(ChiptunePlayer::new(
            engine,
            config,
            Box::new(output),
        )?));

        let source = PlayerSource::new(
            Arc::clone(&player),
            sample_rate,
            tick_frames,
            gate,
            Arc::clone(&finished),
        );
        sink.append(source);
        tracing::debug!(sample_rate, tick_frames, "audio device opened");

        let device = AudioDevice {
            _stream: stream,
            sink,
            finished,
        };
        Ok((device, player))
    }

    /// Pause the output stream
    pub fn pause(&self) {
        self.sink.pause();
    }

    /// Resume the output stream
    pub fn play(&self) {
        self.sink.play();
    }

    /// Check if audio device is running, i.e. [`finish`](Self::finish) has
    /// not been called yet
    pub fn is_running(&self) -> bool {
        !self.finished.load(Ordering::Relaxed)
    }

    /// End the source so the stream stops pulling ticks.
    pub fn finish(&self) {
        self.finished.store(true, Ordering::Relaxed);
    }
}

impl Drop for AudioDevice {
    fn drop(&mut self) {
        self.finish();
        self.pause();
    }
}
