use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::ExtractorConfig;
use crate::debug_image;
use crate::scanner::{ScanOutput, Scanner};
use crate::video::{TimedFrame, VideoDecoder};

// seconds of video between progress lines
const PROGRESS_INTERVAL_SEC: f64 = 20.0;

struct DebugCapture {
    at_sec: f64,
    path: PathBuf,
}

/// Drives a video through the scanner.
pub struct Extractor {
    decoder: VideoDecoder,
    scanner: Scanner,
    skip_sec: f64,
    debug_capture: Option<DebugCapture>,
}

impl Extractor {
    pub fn new(video_path: &Path, config: &ExtractorConfig, skip_sec: f64) -> Result<Self> {
        let decoder = VideoDecoder::open(video_path)?;
        let scanner = Scanner::new(config, decoder.width(), decoder.height())
            .context("prepare key scanner")?;

        Ok(Self {
            decoder,
            scanner,
            skip_sec,
            debug_capture: None,
        })
    }

    /// Save a calibration image of the first frame at or after `at_sec`.
    pub fn with_debug_capture(mut self, at_sec: f64, path: PathBuf) -> Self {
        self.debug_capture = Some(DebugCapture { at_sec, path });
        self
    }

    pub fn run(mut self) -> Result<ScanOutput> {
        let total = self.decoder.duration_secs();
        let mut next_progress = 0.0;

        log::info!("Processing from {:.1}s", self.skip_sec);

        loop {
            let frame = match self.decoder.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    log::warn!("Stopping early, video decode failed: {:#}", e);
                    break;
                }
            };

            self.capture_debug(&frame)?;

            if frame.timestamp < self.skip_sec {
                continue;
            }

            if frame.timestamp >= next_progress {
                match total {
                    Some(total) => log::info!("  {:.0}s / {:.0}s", frame.timestamp, total),
                    None => log::info!("  {:.0}s", frame.timestamp),
                }
                next_progress = frame.timestamp + PROGRESS_INTERVAL_SEC;
            }

            self.scanner
                .process_frame(&frame.image, frame.timestamp)
                .context("scan frame")?;
        }

        let output = self.scanner.finish();
        println!("Extracted {} notes", output.notes.len());
        Ok(output)
    }

    fn capture_debug(&mut self, frame: &TimedFrame) -> Result<()> {
        let due = matches!(&self.debug_capture, Some(capture) if frame.timestamp >= capture.at_sec);
        if !due {
            return Ok(());
        }
        let Some(capture) = self.debug_capture.take() else {
            return Ok(());
        };

        let readings = self.scanner.classify_frame(&frame.image)?;
        let vis = debug_image::render(
            &frame.image,
            self.scanner.keyboard(),
            &readings,
            self.scanner.patch_size(),
        );
        debug_image::save(&vis, &capture.path)
    }
}
