//! Per-tick render loop.
//!
//! A [`RenderNode`] is a voice installed in the output graph. The host calls
//! [`RenderNode::process`] once per audio callback with a fixed-length stereo
//! destination; the node fills it completely, decoding in chunks of at most
//! the voice's chunk size, and reports pattern/row movement and the end of
//! the stream through the [`EventDispatcher`].
//!
//! The tick never fails. Decode faults end the voice and surface as
//! `onError`; the destination is always fully written.

use crate::decoder::{ModuleDecoder, DECODE_ERROR_KIND};
use crate::events::{EventContext, EventDispatcher, PlayerEvent};
use crate::voice::Voice;

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The voice was already released: silence, node disconnected.
    Disconnected,
    /// The voice is paused: silence, no decoder call.
    Paused,
    /// Audio was rendered and the voice is still live.
    Rendered,
    /// The module ended cleanly; `onEnded` fired.
    Ended {
        /// Frames of real audio at the start of the tick; the rest is padding.
        frames: usize,
    },
    /// The decoder failed; `onError` fired.
    Errored {
        /// Frames of real audio at the start of the tick; the rest is padding.
        frames: usize,
    },
}

impl TickOutcome {
    /// Whether this tick terminated the voice.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TickOutcome::Ended { .. } | TickOutcome::Errored { .. })
    }
}

/// A voice plus its connection to the output graph.
#[derive(Debug)]
pub struct RenderNode<D: ModuleDecoder> {
    voice: Voice<D>,
    connected: bool,
}

impl<D: ModuleDecoder> RenderNode<D> {
    /// Wrap a voice. The node starts disconnected.
    pub fn new(voice: Voice<D>) -> Self {
        Self {
            voice,
            connected: false,
        }
    }

    /// Attach the node to the output graph.
    pub fn connect(&mut self) {
        self.connected = true;
    }

    /// Detach the node from the output graph.
    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    /// Whether the host should keep calling [`process`](Self::process).
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// The voice driven by this node.
    pub fn voice(&self) -> &Voice<D> {
        &self.voice
    }

    /// Mutable access to the voice.
    pub fn voice_mut(&mut self) -> &mut Voice<D> {
        &mut self.voice
    }

    /// Disconnect and release the voice.
    pub fn stop(&mut self) {
        self.disconnect();
        self.voice.release();
    }

    /// Render one tick into `left`/`right`.
    ///
    /// Both slices are written over their whole length. If they differ in
    /// length, frames past the shorter one are silence.
    pub fn process(
        &mut self,
        sample_rate: u32,
        left: &mut [f32],
        right: &mut [f32],
        events: &mut EventDispatcher,
    ) -> TickOutcome {
        if self.voice.is_released() {
            silence(left, right);
            self.disconnect();
            return TickOutcome::Disconnected;
        }

        if self.voice.is_paused() {
            silence(left, right);
            return TickOutcome::Paused;
        }

        let pattern = self.voice.current_pattern();
        let row = self.voice.current_row();
        if self.voice.observe_pattern(pattern) {
            events.fire(PlayerEvent::PatternChange, None);
        }
        events.fire(PlayerEvent::RowChange, Some(&EventContext::row(row)));

        let total = left.len().min(right.len());
        left[total..].fill(0.0);
        right[total..].fill(0.0);

        let max_chunk = self.voice.max_chunk_frames();
        let mut offset = 0;
        let mut end = None;
        while offset < total {
            let requested = (total - offset).min(max_chunk);
            let chunk = self.voice.render_chunk(sample_rate, requested);
            let produced = chunk.frames;

            left[offset..offset + produced].copy_from_slice(self.voice.chunk_left());
            right[offset..offset + produced].copy_from_slice(self.voice.chunk_right());

            if produced < requested {
                // Short chunk: pad it and everything after it with silence.
                left[offset + produced..total].fill(0.0);
                right[offset + produced..total].fill(0.0);
                end = Some((offset + produced, chunk.errored));
                break;
            }
            offset += requested;
        }

        let Some((frames, errored)) = end else {
            return TickOutcome::Rendered;
        };

        self.disconnect();
        self.voice.release();
        if errored {
            tracing::warn!("voice terminated by decoder failure");
            events.fire(
                PlayerEvent::Error,
                Some(&EventContext::error(DECODE_ERROR_KIND)),
            );
            TickOutcome::Errored { frames }
        } else {
            tracing::debug!("voice reached end of stream");
            events.fire(PlayerEvent::Ended, None);
            TickOutcome::Ended { frames }
        }
    }
}

/// Zero both channels.
pub fn silence(left: &mut [f32], right: &mut [f32]) {
    left.fill(0.0);
    right.fill(0.0);
}
