//! Real-time playback through the system audio device.
//!
//! The host side of the render loop: a rodio [`Source`](rodio::Source) pulls
//! ticks from a shared [`ChiptunePlayer`] on the audio thread, while the
//! application issues transport calls on the same player from its own thread.
//! The mutex around the player is what serialises the two.

mod audio_device;

pub use audio_device::{AudioDevice, PlayerSource};

use crate::player::{AudioOutput, ChiptunePlayer};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Player shared between the audio thread and the application.
pub type SharedPlayer<E> = Arc<Mutex<ChiptunePlayer<E>>>;

/// Output port backed by a rodio stream.
///
/// Unlocking opens a gate: until then the source feeds silence without
/// touching the player.
#[derive(Debug, Clone)]
pub struct RodioOutput {
    sample_rate: u32,
    gate: Arc<AtomicBool>,
}

impl RodioOutput {
    /// Create an output running at `sample_rate`, controlling `gate`.
    pub fn new(sample_rate: u32, gate: Arc<AtomicBool>) -> Self {
        Self { sample_rate, gate }
    }
}

impl AudioOutput for RodioOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn unlock(&mut self) {
        self.gate.store(true, Ordering::Release);
    }

    fn is_unlocked(&self) -> bool {
        self.gate.load(Ordering::Acquire)
    }
}
