//! WAV file export
//!
//! Offline rendering runs the same tick loop the real-time host uses, just
//! as fast as the decoder allows, and writes the ticks to a 16-bit stereo
//! WAV file with hound.

use crate::decoder::DecoderEngine;
use crate::error::{PlayerError, Result};
use crate::player::ChiptunePlayer;
use crate::render::TickOutcome;
use std::path::Path;

/// What an export produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportSummary {
    /// Stereo frames written.
    pub frames: usize,
    /// Sample rate of the file.
    pub sample_rate: u32,
    /// Outcome of the last tick rendered.
    pub outcome: TickOutcome,
}

impl ExportSummary {
    /// Length of the written audio in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }
}

/// Render the active module to `output_path` until it ends.
///
/// The player must already be playing. Modules configured to loop forever
/// need [`export_to_wav_with_limit`] instead.
///
/// # Examples
///
/// ```ignore
/// use chiptune_stream::export::export_to_wav;
///
/// player.play(&bytes)?;
/// let summary = export_to_wav(&mut player, "song.wav")?;
/// println!("{:.1}s written", summary.duration_seconds());
/// ```
pub fn export_to_wav<E: DecoderEngine, P: AsRef<Path>>(
    player: &mut ChiptunePlayer<E>,
    output_path: P,
) -> Result<ExportSummary> {
    export_to_wav_with_limit(player, output_path, None)
}

/// Render the active module to `output_path`, stopping after `max_frames`
/// frames if the module has not ended by then.
pub fn export_to_wav_with_limit<E: DecoderEngine, P: AsRef<Path>>(
    player: &mut ChiptunePlayer<E>,
    output_path: P,
    max_frames: Option<usize>,
) -> Result<ExportSummary> {
    if !player.is_playing() {
        return Err(PlayerError::Export("nothing is playing".into()));
    }
    if player.is_paused() {
        return Err(PlayerError::Export("player is paused".into()));
    }

    let sample_rate = player.sample_rate();
    let tick_frames = player.config().tick_frames;
    let path = output_path.as_ref();

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| PlayerError::Export(format!("failed to create WAV file: {e}")))?;

    let mut left = vec![0.0f32; tick_frames];
    let mut right = vec![0.0f32; tick_frames];
    let mut frames = 0usize;
    let mut outcome = TickOutcome::Rendered;

    while outcome == TickOutcome::Rendered {
        let budget = max_frames.map_or(tick_frames, |max| max.saturating_sub(frames));
        if budget == 0 {
            break;
        }
        outcome = player.render(&mut left, &mut right);
        if outcome == TickOutcome::Disconnected || outcome == TickOutcome::Paused {
            break;
        }

        // Ticks ending the stream are zero-padded: keep only the audio.
        let produced = match outcome {
            TickOutcome::Ended { frames } | TickOutcome::Errored { frames } => frames,
            _ => tick_frames,
        };
        let count = produced.min(budget);
        for (&l, &r) in left[..count].iter().zip(&right[..count]) {
            writer
                .write_sample(to_i16(l))
                .and_then(|()| writer.write_sample(to_i16(r)))
                .map_err(|e| PlayerError::Export(format!("failed to write sample: {e}")))?;
        }
        frames += count;
    }

    writer
        .finalize()
        .map_err(|e| PlayerError::Export(format!("failed to finalize WAV file: {e}")))?;

    tracing::info!(path = %path.display(), frames, ?outcome, "export complete");
    Ok(ExportSummary {
        frames,
        sample_rate,
        outcome,
    })
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}
