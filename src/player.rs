//! Transport controller.
//!
//! [`ChiptunePlayer`] owns at most one active voice and the handler list.
//! Transport calls (`play`, `stop`, `seek`, ...) and [`ChiptunePlayer::render`]
//! both take `&mut self`, so a host driving rendering from another thread
//! must serialise them itself (the streaming host wraps the player in a
//! mutex).

use crate::config::PlayerConfig;
use crate::decoder::{DecoderEngine, EngineCell};
use crate::error::Result;
use crate::events::{EventContext, EventDispatcher, PlayerEvent};
use crate::metadata::ModuleMetadata;
use crate::render::{silence, RenderNode, TickOutcome};
use crate::voice::Voice;
use std::path::Path;

/// The host side of the output graph, as far as the controller cares.
pub trait AudioOutput: Send {
    /// Output sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Prime the backend so it will produce sound. Called before the first
    /// `play`; must be idempotent.
    fn unlock(&mut self);

    /// Whether [`unlock`](Self::unlock) has taken effect.
    fn is_unlocked(&self) -> bool;
}

/// Headless output with a fixed sample rate.
#[derive(Debug, Clone)]
pub struct NullOutput {
    sample_rate: u32,
    unlocked: bool,
}

impl NullOutput {
    /// Create a headless output running at `sample_rate`.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            unlocked: false,
        }
    }
}

impl AudioOutput for NullOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn unlock(&mut self) {
        self.unlocked = true;
    }

    fn is_unlocked(&self) -> bool {
        self.unlocked
    }
}

/// Single-voice module player.
pub struct ChiptunePlayer<E: DecoderEngine> {
    engine: EngineCell<E>,
    config: PlayerConfig,
    output: Box<dyn AudioOutput>,
    active: Option<RenderNode<E::Decoder>>,
    events: EventDispatcher,
}

impl<E: DecoderEngine> ChiptunePlayer<E> {
    /// Create a player. The configuration is validated here so that every
    /// later voice can rely on it.
    pub fn new(
        engine: EngineCell<E>,
        config: PlayerConfig,
        output: Box<dyn AudioOutput>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine,
            config,
            output,
            active: None,
            events: EventDispatcher::new(),
        })
    }

    /// Start playing `bytes`, replacing whatever was playing.
    ///
    /// The previous voice is released before the new decoder is created, so
    /// two decoders are never alive at once. On error nothing is playing.
    pub fn play(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.output.is_unlocked() {
            self.output.unlock();
            tracing::debug!("audio output unlocked");
        }

        self.stop();

        let engine = self.engine.get()?;
        let mut voice = Voice::create(engine, bytes, self.config.max_chunk_frames)?;
        voice.set_repeat_count(self.config.repeat_count);

        let mut node = RenderNode::new(voice);
        node.connect();
        tracing::info!(
            bytes = bytes.len(),
            channels = node.voice().channel_count(),
            repeat_count = self.config.repeat_count,
            "playback started"
        );
        self.active = Some(node);
        Ok(())
    }

    /// Read a module file and play it.
    pub fn play_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = crate::source::load_file(path)?;
        self.play(&bytes)
    }

    /// Stop and release the active voice. No-op when nothing is playing.
    pub fn stop(&mut self) {
        if let Some(mut node) = self.active.take() {
            node.stop();
            tracing::debug!("playback stopped");
        }
    }

    /// Render one tick into `left`/`right`.
    ///
    /// Both slices are always written over their full length. Once the
    /// voice ends or fails it is dropped from the controller, and following
    /// ticks are silence.
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) -> TickOutcome {
        let sample_rate = self.output.sample_rate();
        let Some(node) = self.active.as_mut().filter(|node| node.is_connected()) else {
            silence(left, right);
            return TickOutcome::Disconnected;
        };

        let outcome = node.process(sample_rate, left, right, &mut self.events);
        match outcome {
            TickOutcome::Rendered => apply_gain(self.config.volume, left, right),
            TickOutcome::Ended { .. } | TickOutcome::Errored { .. } => {
                apply_gain(self.config.volume, left, right);
                self.active = None;
            }
            TickOutcome::Disconnected => self.active = None,
            TickOutcome::Paused => {}
        }
        outcome
    }

    /// Flip pause on the active voice.
    pub fn toggle_pause(&mut self) {
        if let Some(node) = self.active.as_mut() {
            node.voice_mut().toggle_pause();
        }
    }

    /// Pause the active voice.
    pub fn pause(&mut self) {
        if let Some(node) = self.active.as_mut() {
            node.voice_mut().pause();
        }
    }

    /// Resume the active voice.
    pub fn unpause(&mut self) {
        if let Some(node) = self.active.as_mut() {
            node.voice_mut().unpause();
        }
    }

    /// Jump to `seconds` in the active module.
    pub fn seek(&mut self, seconds: f64) {
        if let Some(node) = self.active.as_mut() {
            tracing::debug!(seconds, "seek");
            node.voice_mut().set_position_seconds(seconds);
        }
    }

    /// Set the repeat count of the active module.
    ///
    /// Only affects the current voice; new voices use the configured count.
    pub fn repeat(&mut self, repeat_count: i32) {
        if let Some(node) = self.active.as_mut() {
            node.voice_mut().set_repeat_count(repeat_count);
        }
    }

    fn voice(&self) -> Option<&Voice<E::Decoder>> {
        self.active.as_ref().map(RenderNode::voice)
    }

    /// Whether a voice is active (playing or paused).
    pub fn is_playing(&self) -> bool {
        self.active.is_some()
    }

    /// Whether the active voice is paused. `false` with nothing playing.
    pub fn is_paused(&self) -> bool {
        self.voice().is_some_and(Voice::is_paused)
    }

    /// Playback position in seconds, 0 with nothing playing.
    pub fn position(&self) -> f64 {
        self.voice().map_or(0.0, Voice::position_seconds)
    }

    /// Song length in seconds, 0 with nothing playing.
    pub fn duration(&self) -> f64 {
        self.voice().map_or(0.0, Voice::duration_seconds)
    }

    /// Current pattern, 0 with nothing playing.
    pub fn pattern(&self) -> i32 {
        self.voice().map_or(0, Voice::current_pattern)
    }

    /// Current row, 0 with nothing playing.
    pub fn row(&self) -> i32 {
        self.voice().map_or(0, Voice::current_row)
    }

    /// Number of patterns, 0 with nothing playing.
    pub fn num_patterns(&self) -> i32 {
        self.voice().map_or(0, Voice::num_patterns)
    }

    /// Rows in `pattern`, 0 with nothing playing.
    pub fn pattern_num_rows(&self, pattern: i32) -> i32 {
        self.voice().map_or(0, |v| v.pattern_num_rows(pattern))
    }

    /// Formatted pattern cell, empty with nothing playing.
    pub fn pattern_row_channel(&self, pattern: i32, row: i32, channel: i32) -> String {
        self.voice()
            .map_or_else(String::new, |v| v.pattern_row_channel(pattern, row, channel))
    }

    /// Module channel count, 0 with nothing playing.
    pub fn channel_count(&self) -> i32 {
        self.voice().map_or(0, Voice::channel_count)
    }

    /// Metadata of the active module, empty with nothing playing.
    pub fn metadata(&self) -> ModuleMetadata {
        self.voice()
            .and_then(Voice::live_decoder)
            .map(ModuleMetadata::from_decoder)
            .unwrap_or_default()
    }

    /// Register a handler under an event name.
    pub fn add_handler<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: FnMut(Option<&EventContext>) + Send + 'static,
    {
        self.events.add_handler(name, handler);
    }

    /// Fire every handler registered under `name`.
    pub fn fire_event(&mut self, name: &str, context: Option<&EventContext>) -> usize {
        self.events.fire_event(name, context)
    }

    /// Remove every handler.
    pub fn clear_handlers(&mut self) {
        self.events.clear_handlers();
    }

    /// Called once when the module ends.
    pub fn on_ended<F>(&mut self, mut handler: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.events
            .add_handler(PlayerEvent::Ended.name(), move |_| handler());
    }

    /// Called once when decoding fails, with the failure tag.
    pub fn on_error<F>(&mut self, mut handler: F)
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.events.add_handler(PlayerEvent::Error.name(), move |ctx| {
            handler(ctx.and_then(|c| c.kind.as_deref()).unwrap_or_default())
        });
    }

    /// Called whenever playback enters a different pattern.
    pub fn on_pattern_change<F>(&mut self, mut handler: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.events
            .add_handler(PlayerEvent::PatternChange.name(), move |_| handler());
    }

    /// Called on every rendered tick with the current row.
    pub fn on_row_change<F>(&mut self, mut handler: F)
    where
        F: FnMut(i32) + Send + 'static,
    {
        self.events.add_handler(PlayerEvent::RowChange.name(), move |ctx| {
            handler(ctx.and_then(|c| c.index).unwrap_or_default())
        });
    }

    /// Active configuration.
    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Output sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.output.sample_rate()
    }

    /// Output gain.
    pub fn volume(&self) -> f32 {
        self.config.volume
    }

    /// Set the output gain. Negative and non-finite values are ignored.
    pub fn set_volume(&mut self, volume: f32) {
        if volume.is_finite() && volume >= 0.0 {
            self.config.volume = volume;
        } else {
            tracing::warn!(volume, "ignoring invalid volume");
        }
    }
}

impl<E: DecoderEngine> std::fmt::Debug for ChiptunePlayer<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChiptunePlayer")
            .field("engine", &self.engine)
            .field("config", &self.config)
            .field("playing", &self.is_playing())
            .field("events", &self.events)
            .finish()
    }
}

fn apply_gain(volume: f32, left: &mut [f32], right: &mut [f32]) {
    if volume == 1.0 {
        return;
    }
    for sample in left.iter_mut().chain(right.iter_mut()) {
        *sample *= volume;
    }
}
