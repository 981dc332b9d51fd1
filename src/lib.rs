//! Chunked real-time streaming of tracker modules
//!
//! Plays tracker music modules (MOD, XM, S3M, IT and the other formats the
//! decoder understands) by pulling stereo float PCM from a decoder in bounded
//! chunks, once per audio callback tick. A single transport controller owns
//! the playing voice and reports pattern/row movement, the end of the song
//! and decode failures through named event handlers.
//!
//! # Features
//! - At most one live decoder at a time; back-to-back `play` calls release
//!   the previous voice first
//! - Fixed-size scratch buffers per voice, chunked decoding inside each tick
//! - Pause, seek, repeat count and zero-sentinel queries with nothing playing
//! - `onEnded`, `onError`, `onPatternChange` and `onRowChange` handlers
//! - Module metadata, offline WAV export and a rodio output host
//!
//! # Crate feature flags
//! - `libopenmpt` (opt-in): native decoder linked against the system libopenmpt
//! - `streaming` (opt-in): real-time audio output (enables optional `rodio` dep)
//! - `export-wav` (opt-in): offline rendering to WAV (enables optional `hound` dep)
//! - `cli` (opt-in): the `chiptune-play` command-line player
//!
//! # Quick start
//! ## Render ticks by hand
//! ```ignore
//! use chiptune_stream::{ChiptunePlayer, EngineCell, NullOutput, PlayerConfig};
//! use chiptune_stream::decoder::openmpt::OpenMptEngine;
//!
//! let engine = EngineCell::lazy(OpenMptEngine::initialize);
//! let output = Box::new(NullOutput::new(44_100));
//! let mut player = ChiptunePlayer::new(engine, PlayerConfig::default(), output)?;
//! player.on_row_change(|row| println!("row {row}"));
//! player.play_file("song.xm")?;
//!
//! let (mut left, mut right) = (vec![0.0; 2048], vec![0.0; 2048]);
//! while !player.render(&mut left, &mut right).is_terminal() {
//!     // hand the tick to the audio backend
//! }
//! ```
//!
//! ## Real-time streaming
//! ```ignore
//! use chiptune_stream::{AudioDevice, EngineCell, PlayerConfig};
//! use chiptune_stream::decoder::openmpt::OpenMptEngine;
//!
//! let engine = EngineCell::lazy(OpenMptEngine::initialize);
//! let (device, player) = AudioDevice::open(engine, PlayerConfig::default())?;
//! player.lock().play_file("song.it")?;
//! // ... later
//! player.lock().stop();
//! device.finish();
//! ```

#![warn(missing_docs)]

pub mod config; // Player Configuration
pub mod decoder; // Decoder Capability
pub mod error; // Error Types
pub mod events; // Playback Events
pub mod metadata; // Module Metadata
pub mod player; // Transport Controller
pub mod render; // Per-tick Render Loop
pub mod source; // Module Byte Acquisition
pub mod voice; // Playback Voice

#[cfg(feature = "export-wav")]
pub mod export; // WAV Export
#[cfg(feature = "streaming")]
pub mod streaming; // Audio Output & Streaming

// Public API exports
pub use config::PlayerConfig;
pub use decoder::{DecoderEngine, DecoderFault, EngineCell, ModuleDecoder, DECODE_ERROR_KIND};
pub use error::{DecoderError, PlayerError, Result};
pub use events::{EventContext, EventDispatcher, PlayerEvent};
pub use metadata::ModuleMetadata;
pub use player::{AudioOutput, ChiptunePlayer, NullOutput};
pub use render::{RenderNode, TickOutcome};
pub use voice::{ChunkResult, Voice};

#[cfg(feature = "export-wav")]
pub use export::{export_to_wav, export_to_wav_with_limit, ExportSummary};
#[cfg(feature = "streaming")]
pub use streaming::{AudioDevice, PlayerSource, RodioOutput, SharedPlayer};
