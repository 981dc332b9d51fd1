#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!(
        "The chiptune-play CLI requires the \"cli\" feature. Rebuild with `--features cli` to enable playback."
    );
}

#[cfg(feature = "cli")]
mod cli {
    use std::io::{self, Write};
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::{bail, Context, Result};
    use chiptune_stream::decoder::openmpt::OpenMptEngine;
    use chiptune_stream::{
        export_to_wav_with_limit, source, AudioDevice, ChiptunePlayer, EngineCell, ModuleMetadata,
        NullOutput, PlayerConfig,
    };
    use clap::Parser;

    const STATUS_INTERVAL: Duration = Duration::from_millis(100);

    /// Play or render tracker modules
    #[derive(Parser, Debug)]
    #[command(name = "chiptune-play", version, about)]
    struct Args {
        /// Module file (MOD, XM, S3M, IT, ...)
        file: PathBuf,

        /// Extra repeats: 0 plays once, -1 loops forever
        #[arg(short, long, allow_negative_numbers = true)]
        repeat: Option<i32>,

        /// JSON player configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Start position in seconds
        #[arg(long)]
        seek: Option<f64>,

        /// Output gain (1.0 = unchanged)
        #[arg(long)]
        volume: Option<f32>,

        /// Render to a WAV file instead of the audio device
        #[arg(short, long)]
        export: Option<PathBuf>,

        /// Stop exporting after this many seconds
        #[arg(long)]
        max_seconds: Option<f64>,

        /// Only print errors
        #[arg(short, long)]
        quiet: bool,
    }

    /// Shared flags written by the event handlers.
    #[derive(Default)]
    struct Progress {
        ended: AtomicBool,
        failed: AtomicBool,
        pattern_changes: AtomicI32,
        row: AtomicI32,
    }

    fn watch<E: chiptune_stream::DecoderEngine>(
        player: &mut ChiptunePlayer<E>,
    ) -> Arc<Progress> {
        let progress = Arc::new(Progress::default());

        let p = Arc::clone(&progress);
        player.on_ended(move || p.ended.store(true, Ordering::Relaxed));
        let p = Arc::clone(&progress);
        player.on_error(move |kind| {
            tracing::error!(kind, "playback failed");
            p.failed.store(true, Ordering::Relaxed);
        });
        let p = Arc::clone(&progress);
        player.on_pattern_change(move || {
            p.pattern_changes.fetch_add(1, Ordering::Relaxed);
        });
        let p = Arc::clone(&progress);
        player.on_row_change(move |row| p.row.store(row, Ordering::Relaxed));

        progress
    }

    fn print_metadata(path: &Path, metadata: &ModuleMetadata, duration: f64, channels: i32) {
        println!("File:     {}", path.display());
        if !metadata.title().is_empty() {
            println!("Title:    {}", metadata.title());
        }
        if !metadata.artist().is_empty() {
            println!("Artist:   {}", metadata.artist());
        }
        if !metadata.format().is_empty() {
            println!("Format:   {}", metadata.format());
        }
        if !metadata.tracker().is_empty() {
            println!("Tracker:  {}", metadata.tracker());
        }
        println!("Channels: {channels}");
        println!("Duration: {}", format_time(duration));
        if !metadata.message().is_empty() {
            println!("\n{}", metadata.message().trim_end());
        }
        println!();
    }

    fn format_time(seconds: f64) -> String {
        let total = seconds.max(0.0) as u64;
        format!("{}:{:02}", total / 60, total % 60)
    }

    fn load_config(args: &Args) -> Result<PlayerConfig> {
        let mut config = match &args.config {
            Some(path) => PlayerConfig::from_json_file(path)
                .with_context(|| format!("loading configuration {}", path.display()))?,
            None => PlayerConfig::default(),
        };
        if let Some(repeat) = args.repeat {
            config = config.with_repeat_count(repeat);
        }
        if let Some(volume) = args.volume {
            config = config.with_volume(volume);
        }
        config.validate()?;
        Ok(config)
    }

    fn export(args: &Args, config: PlayerConfig, bytes: &[u8], out: &Path) -> Result<()> {
        let max_frames = args
            .max_seconds
            .map(|secs| (secs.max(0.0) * config.sample_rate as f64) as usize);
        if config.repeat_count < 0 && max_frames.is_none() {
            bail!("exporting a module that loops forever needs --max-seconds");
        }

        let sample_rate = config.sample_rate;
        let engine = EngineCell::lazy(OpenMptEngine::initialize);
        let mut player =
            ChiptunePlayer::new(engine, config, Box::new(NullOutput::new(sample_rate)))?;
        let progress = watch(&mut player);
        player.play(bytes)?;
        if let Some(seconds) = args.seek {
            player.seek(seconds);
        }
        if !args.quiet {
            let channels = player.channel_count();
            print_metadata(&args.file, &player.metadata(), player.duration(), channels);
            println!("Rendering to {}...", out.display());
        }

        let summary = export_to_wav_with_limit(&mut player, out, max_frames)?;
        if progress.failed.load(Ordering::Relaxed) {
            bail!("decoder failed after {:.1}s", summary.duration_seconds());
        }
        if !args.quiet {
            println!(
                "Wrote {} frames ({}) across {} patterns",
                summary.frames,
                format_time(summary.duration_seconds()),
                progress.pattern_changes.load(Ordering::Relaxed)
            );
        }
        Ok(())
    }

    fn stream(args: &Args, config: PlayerConfig, bytes: &[u8]) -> Result<()> {
        let engine = EngineCell::lazy(OpenMptEngine::initialize);
        let (device, player) = AudioDevice::open(engine, config)?;

        let progress = {
            let mut player = player.lock();
            let progress = watch(&mut *player);
            player.play(bytes)?;
            if let Some(seconds) = args.seek {
                player.seek(seconds);
            }
            if !args.quiet {
                let channels = player.channel_count();
                print_metadata(&args.file, &player.metadata(), player.duration(), channels);
            }
            progress
        };

        loop {
            std::thread::sleep(STATUS_INTERVAL);
            if progress.ended.load(Ordering::Relaxed) || progress.failed.load(Ordering::Relaxed) {
                break;
            }
            if args.quiet {
                continue;
            }
            let (pattern, patterns, position, duration) = {
                let player = player.lock();
                (player.pattern(), player.num_patterns(), player.position(), player.duration())
            };
            print!(
                "\rPattern {:>3}/{:<3} Row {:>3}  {} / {}   ",
                pattern,
                patterns,
                progress.row.load(Ordering::Relaxed),
                format_time(position),
                format_time(duration)
            );
            io::stdout().flush().ok();
        }

        player.lock().stop();
        device.finish();
        if !args.quiet {
            println!();
        }
        if progress.failed.load(Ordering::Relaxed) {
            bail!("playback of {} stopped on a decoder error", args.file.display());
        }
        Ok(())
    }

    /// Log level used when `RUST_LOG` is not set.
    fn default_filter(quiet: bool) -> &'static str {
        if quiet {
            "warn"
        } else {
            "info"
        }
    }

    pub fn run() -> Result<()> {
        let args = Args::parse();

        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(default_filter(args.quiet))
                }),
            )
            .init();

        let config = load_config(&args)?;
        let bytes = source::load_file(&args.file)?;

        match &args.export {
            Some(out) => export(&args, config, &bytes, out),
            None => stream(&args, config, &bytes),
        }
    }

}

#[cfg(feature = "cli")]
fn main() -> anyhow::Result<()> {
    cli::run()
}
