use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use synthesia2midi::analysis;
use synthesia2midi::config::ExtractorConfig;
use synthesia2midi::extractor::Extractor;
use synthesia2midi::formatter::NoteListFormatter;
use synthesia2midi::midi_writer;

#[derive(Parser, Debug)]
#[command(version, about = "Extract MIDI from Synthesia-style piano tutorial videos")]
struct Args {
    #[arg(help = "Path to the video file")]
    video: PathBuf,

    #[arg(short, long, default_value = "output.mid", help = "Output MIDI file path")]
    output: PathBuf,

    #[arg(short, long, default_value_t = 5.0, help = "Seconds to skip at start")]
    skip: f64,

    #[arg(
        short = 'y',
        long,
        help = "Y coordinate for key detection on the reference frame (default: 500)"
    )]
    key_y: Option<f64>,

    #[arg(short, long, help = "TOML file with calibration and thresholds")]
    config: Option<PathBuf>,

    #[arg(long, help = "Save a debug calibration image")]
    debug: bool,

    #[arg(long, default_value_t = 14.0, help = "Video time of the debug image")]
    debug_at: f64,

    #[arg(long, default_value = "debug_calibration.png")]
    debug_output: PathBuf,

    #[arg(long, help = "Print note analysis after extraction")]
    analyze: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    println!("VIDEO FILE: {}", args.video.display());

    let mut config = match &args.config {
        Some(path) => ExtractorConfig::load(path)?,
        None => ExtractorConfig::default(),
    };
    if let Some(key_y) = args.key_y {
        config.keyboard.key_y = key_y;
    }
    config.validate().context("validate config")?;

    let mut extractor =
        Extractor::new(&args.video, &config, args.skip).context("open video")?;
    if args.debug {
        extractor = extractor.with_debug_capture(args.debug_at, args.debug_output.clone());
    }

    let output = extractor.run()?;
    midi_writer::save(&output.notes, &args.output)?;

    if args.analyze && !output.notes.is_empty() {
        println!(
            "\n{}",
            analysis::report(&output.notes, &NoteListFormatter::new(), 25)
        );
    }

    Ok(())
}
