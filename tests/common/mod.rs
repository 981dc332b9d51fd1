//! Scripted in-memory decoder shared by the integration suites.

#![allow(dead_code)]

use chiptune_stream::{
    ChiptunePlayer, DecoderEngine, DecoderError, DecoderFault, EngineCell, ModuleDecoder,
    NullOutput, PlayerConfig,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// What one `read_float_stereo` call does.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Read {
    /// Fill the whole request.
    Full,
    /// Produce at most this many frames.
    Frames(usize),
    /// Produce at most this many frames of digital silence.
    Silent(usize),
    /// The handle becomes invalid.
    Fault,
}

/// Chronological record of decoder activity across every instance.
#[derive(Debug, Default)]
pub struct Journal {
    pub entries: Vec<String>,
    pub live: usize,
    pub max_live: usize,
}

impl Journal {
    pub fn count(&self, prefix: &str) -> usize {
        self.entries.iter().filter(|e| e.starts_with(prefix)).count()
    }

    pub fn reads(&self) -> Vec<usize> {
        self.entries
            .iter()
            .filter_map(|e| e.strip_prefix("read ")?.parse().ok())
            .collect()
    }
}

/// Engine whose decoders replay a fixed list of read behaviours, then fill
/// every further request.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEngine {
    pub reads: Vec<Read>,
    pub journal: Arc<Mutex<Journal>>,
}

impl ScriptedEngine {
    pub fn new(reads: Vec<Read>) -> Self {
        Self {
            reads,
            journal: Arc::default(),
        }
    }
}

impl DecoderEngine for ScriptedEngine {
    type Decoder = ScriptedDecoder;

    fn create(&self, bytes: &[u8]) -> Result<ScriptedDecoder, DecoderError> {
        if bytes.is_empty() {
            return Err(DecoderError::Empty);
        }
        if !bytes.starts_with(b"MOD") {
            return Err(DecoderError::Invalid("not a module".into()));
        }
        let name = String::from_utf8_lossy(bytes).into_owned();
        let mut journal = self.journal.lock();
        journal.entries.push(format!("create {name}"));
        journal.live += 1;
        journal.max_live = journal.max_live.max(journal.live);
        drop(journal);

        Ok(ScriptedDecoder {
            name,
            reads: self.reads.iter().copied().collect(),
            journal: Arc::clone(&self.journal),
            frames: 0,
            repeat_count: 0,
        })
    }
}

pub struct ScriptedDecoder {
    name: String,
    reads: VecDeque<Read>,
    journal: Arc<Mutex<Journal>>,
    frames: usize,
    repeat_count: i32,
}

/// Frames per tracker row in every scripted module.
pub const FRAMES_PER_ROW: usize = 256;
/// Rows per pattern in every scripted module.
pub const ROWS_PER_PATTERN: usize = 4;

impl ModuleDecoder for ScriptedDecoder {
    fn num_channels(&self) -> i32 {
        8
    }

    fn read_float_stereo(
        &mut self,
        _sample_rate: u32,
        left: &mut [f32],
        right: &mut [f32],
    ) -> Result<usize, DecoderFault> {
        self.journal.lock().entries.push(format!("read {}", left.len()));
        let (frames, level) = match self.reads.pop_front().unwrap_or(Read::Full) {
            Read::Full => (left.len(), 1.0),
            Read::Frames(n) => (n.min(left.len()), 1.0),
            Read::Silent(n) => (n.min(left.len()), 0.0),
            Read::Fault => return Err(DecoderFault("handle invalidated".into())),
        };
        left[..frames].fill(0.25 * level);
        right[..frames].fill(0.75 * level);
        self.frames += frames;
        Ok(frames)
    }

    fn current_pattern(&self) -> i32 {
        (self.frames / (FRAMES_PER_ROW * ROWS_PER_PATTERN)) as i32
    }

    fn current_row(&self) -> i32 {
        ((self.frames / FRAMES_PER_ROW) % ROWS_PER_PATTERN) as i32
    }

    fn num_patterns(&self) -> i32 {
        16
    }

    fn pattern_num_rows(&self, pattern: i32) -> i32 {
        if (0..16).contains(&pattern) {
            ROWS_PER_PATTERN as i32
        } else {
            0
        }
    }

    fn duration_seconds(&self) -> f64 {
        64.0
    }

    fn position_seconds(&self) -> f64 {
        self.frames as f64 / 44_100.0
    }

    fn set_position_seconds(&mut self, seconds: f64) {
        self.frames = (seconds * 44_100.0) as usize;
    }

    fn set_repeat_count(&mut self, repeat_count: i32) {
        self.repeat_count = repeat_count;
        self.journal
            .lock()
            .entries
            .push(format!("repeat {repeat_count}"));
    }

    fn metadata_keys(&self) -> String {
        "type;title;artist;tracker;message".into()
    }

    fn metadata(&self, key: &str) -> String {
        match key {
            "type" => "it".into(),
            "title" => self.name.clone(),
            "tracker" => "Impulse Tracker 2.14".into(),
            _ => String::new(),
        }
    }

    fn format_pattern_row_channel(
        &self,
        pattern: i32,
        row: i32,
        channel: i32,
        width: usize,
        pad: bool,
    ) -> String {
        format!("{pattern}.{row}.{channel} w{width} {pad}")
    }
}

impl Drop for ScriptedDecoder {
    fn drop(&mut self) {
        let mut journal = self.journal.lock();
        journal.entries.push(format!("destroy {}", self.name));
        journal.live -= 1;
    }
}

/// Player over a scripted engine with a headless output.
pub fn player(engine: &ScriptedEngine, config: PlayerConfig) -> ChiptunePlayer<ScriptedEngine> {
    ChiptunePlayer::new(
        EngineCell::ready(engine.clone()),
        config,
        Box::new(NullOutput::new(44_100)),
    )
    .expect("valid config")
}

/// Collects event names in firing order.
pub fn record_events(player: &mut ChiptunePlayer<ScriptedEngine>) -> Arc<Mutex<Vec<String>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    for event in chiptune_stream::PlayerEvent::ALL {
        let log = Arc::clone(&log);
        player.add_handler(event.name(), move |ctx| {
            let entry = match ctx.and_then(|c| c.index) {
                Some(row) => format!("{}({row})", event.name()),
                None => event.name().to_string(),
            };
            log.lock().push(entry);
        });
    }
    log
}
