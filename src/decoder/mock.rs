//! In-memory decoder used by the unit tests.

use super::{DecoderEngine, DecoderFault, ModuleDecoder};
use crate::error::DecoderError;
use parking_lot::Mutex;
use std::sync::Arc;

/// Everything the tests want to observe about decoder usage.
#[derive(Debug, Default)]
pub struct Usage {
    pub created: usize,
    pub destroyed: usize,
    pub live: usize,
    pub max_live: usize,
    pub reads: Vec<usize>,
    pub repeat_count: Option<i32>,
    pub position: Option<f64>,
}

/// Decoder behaviour shared by all decoders of one engine.
#[derive(Debug, Clone)]
pub struct Script {
    /// Frames available before a clean end.
    pub total_frames: usize,
    /// 1-based read call that faults, if any.
    pub fault_on_call: Option<usize>,
    /// Frames per tracker row.
    pub frames_per_row: usize,
    /// Rows per pattern.
    pub rows_per_pattern: usize,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            total_frames: usize::MAX,
            fault_on_call: None,
            frames_per_row: 1000,
            rows_per_pattern: 64,
        }
    }
}

#[derive(Debug, Default)]
pub struct MockEngine {
    pub script: Script,
    pub usage: Arc<Mutex<Usage>>,
}

impl MockEngine {
    pub fn with_script(script: Script) -> Self {
        Self {
            script,
            usage: Arc::default(),
        }
    }
}

impl DecoderEngine for MockEngine {
    type Decoder = MockDecoder;

    fn create(&self, bytes: &[u8]) -> Result<MockDecoder, DecoderError> {
        if bytes.is_empty() {
            return Err(DecoderError::Empty);
        }
        if bytes.starts_with(b"BAD") {
            return Err(DecoderError::Invalid("unrecognised header".into()));
        }
        let mut usage = self.usage.lock();
        usage.created += 1;
        usage.live += 1;
        usage.max_live = usage.max_live.max(usage.live);
        drop(usage);

        Ok(MockDecoder {
            script: self.script.clone(),
            usage: Arc::clone(&self.usage),
            rendered: 0,
            calls: 0,
        })
    }
}

pub struct MockDecoder {
    script: Script,
    usage: Arc<Mutex<Usage>>,
    rendered: usize,
    calls: usize,
}

impl ModuleDecoder for MockDecoder {
    fn num_channels(&self) -> i32 {
        4
    }

    fn read_float_stereo(
        &mut self,
        _sample_rate: u32,
        left: &mut [f32],
        right: &mut [f32],
    ) -> Result<usize, DecoderFault> {
        self.calls += 1;
        self.usage.lock().reads.push(left.len());
        if self.script.fault_on_call == Some(self.calls) {
            return Err(DecoderFault("module not valid".into()));
        }
        let remaining = self.script.total_frames.saturating_sub(self.rendered);
        let frames = left.len().min(remaining);
        left[..frames].fill(0.5);
        right[..frames].fill(-0.5);
        self.rendered += frames;
        Ok(frames)
    }

    fn current_pattern(&self) -> i32 {
        let frames_per_pattern = self.script.frames_per_row * self.script.rows_per_pattern;
        (self.rendered / frames_per_pattern) as i32
    }

    fn current_row(&self) -> i32 {
        ((self.rendered / self.script.frames_per_row) % self.script.rows_per_pattern) as i32
    }

    fn num_patterns(&self) -> i32 {
        8
    }

    fn pattern_num_rows(&self, pattern: i32) -> i32 {
        if (0..8).contains(&pattern) {
            self.script.rows_per_pattern as i32
        } else {
            0
        }
    }

    fn duration_seconds(&self) -> f64 {
        120.0
    }

    fn position_seconds(&self) -> f64 {
        self.rendered as f64 / 44_100.0
    }

    fn set_position_seconds(&mut self, seconds: f64) {
        self.usage.lock().position = Some(seconds);
        self.rendered = (seconds * 44_100.0) as usize;
    }

    fn set_repeat_count(&mut self, repeat_count: i32) {
        self.usage.lock().repeat_count = Some(repeat_count);
    }

    fn metadata_keys(&self) -> String {
        "type;title;artist;;message".to_string()
    }

    fn metadata(&self, key: &str) -> String {
        match key {
            "type" => "xm".into(),
            "title" => "Mock Tune".into(),
            "artist" => "Nobody".into(),
            _ => String::new(),
        }
    }

    fn format_pattern_row_channel(
        &self,
        pattern: i32,
        row: i32,
        channel: i32,
        _width: usize,
        _pad: bool,
    ) -> String {
        format!("{pattern}:{row}:{channel}")
    }
}

impl Drop for MockDecoder {
    fn drop(&mut self) {
        let mut usage = self.usage.lock();
        usage.destroyed += 1;
        usage.live -= 1;
    }
}
