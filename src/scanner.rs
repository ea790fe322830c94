//! Frame-by-frame scan driving one tracker per key.
//!
//! Each frame is classified for all 88 keys in parallel, then every reading is
//! fed to its key's tracker in pitch order before the next frame is accepted.

use image::RgbImage;
use rayon::prelude::*;

use crate::classifier::{Classification, Classifier, Patch};
use crate::config::{ExtractorConfig, TrackerConfig};
use crate::error::{Error, Result};
use crate::keyboard::{Keyboard, KEY_COUNT, LOWEST_PITCH};
use crate::note_event::NoteEvent;
use crate::tracker::KeyTracker;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanStats {
    pub frames: u64,
    /// Readings where both colours crossed the threshold
    pub ambiguous_readings: u64,
    /// Notes dropped for being shorter than the minimum duration
    pub discarded_notes: u64,
    pub first_timestamp: Option<f64>,
    pub last_timestamp: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ScanOutput {
    /// Sorted by start time, then pitch
    pub notes: Vec<NoteEvent>,
    pub stats: ScanStats,
}

pub struct Scanner {
    keyboard: Keyboard,
    classifier: Classifier,
    tracker_config: TrackerConfig,
    trackers: [KeyTracker; KEY_COUNT],
    readings: Vec<Classification>,
    notes: Vec<NoteEvent>,
    stats: ScanStats,
}

impl Scanner {
    /// Validates `config` and maps the keyboard onto `width` x `height` frames.
    pub fn new(config: &ExtractorConfig, width: u32, height: u32) -> Result<Self> {
        config.validate()?;
        let keyboard = Keyboard::new(&config.keyboard, width, height)?;

        Ok(Self {
            keyboard,
            classifier: Classifier::new(config.classifier.clone()),
            tracker_config: config.tracker.clone(),
            trackers: std::array::from_fn(|i| KeyTracker::new(LOWEST_PITCH + i as u8)),
            readings: Vec::with_capacity(KEY_COUNT),
            notes: Vec::new(),
            stats: ScanStats::default(),
        })
    }

    pub fn keyboard(&self) -> &Keyboard {
        &self.keyboard
    }

    pub fn patch_size(&self) -> u32 {
        self.classifier.patch_size()
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    /// Number of keys currently holding an open note.
    pub fn active_keys(&self) -> usize {
        self.trackers.iter().filter(|t| t.is_active()).count()
    }

    /// Classifies every key on `frame` without touching tracker state.
    pub fn classify_frame(&self, frame: &RgbImage) -> Result<Vec<Classification>> {
        self.check_frame_size(frame)?;
        Ok(self
            .keyboard
            .keys()
            .par_iter()
            .map(|key| {
                let patch = Patch::extract(frame, key.sample, self.classifier.patch_size());
                self.classifier.classify_detailed(&patch)
            })
            .collect())
    }

    /// Scans one frame. Timestamps must strictly increase across calls.
    pub fn process_frame(&mut self, frame: &RgbImage, timestamp: f64) -> Result<()> {
        self.check_frame_size(frame)?;
        if let Some(previous) = self.stats.last_timestamp {
            if !(timestamp > previous) {
                return Err(Error::NonMonotonicTimestamp {
                    previous,
                    current: timestamp,
                });
            }
        }

        let classifier = &self.classifier;
        self.keyboard
            .keys()
            .par_iter()
            .map(|key| {
                let patch = Patch::extract(frame, key.sample, classifier.patch_size());
                classifier.classify_detailed(&patch)
            })
            .collect_into_vec(&mut self.readings);

        for (tracker, classification) in self.trackers.iter_mut().zip(&self.readings) {
            if classification.ambiguous {
                self.stats.ambiguous_readings += 1;
                log::trace!(
                    "Ambiguous reading on pitch {} at {:.3}s (green {:.2}, blue {:.2})",
                    tracker.pitch(),
                    timestamp,
                    classification.green_fraction,
                    classification.blue_fraction
                );
            }
            if let Some(note) =
                tracker.observe(classification.reading, timestamp, &self.tracker_config)
            {
                accept(note, &self.tracker_config, &mut self.notes, &mut self.stats);
            }
        }

        self.stats.frames += 1;
        self.stats.first_timestamp.get_or_insert(timestamp);
        self.stats.last_timestamp = Some(timestamp);
        Ok(())
    }

    /// Scans `frames` in order and finishes.
    pub fn scan<I>(mut self, frames: I) -> Result<ScanOutput>
    where
        I: IntoIterator<Item = (RgbImage, f64)>,
    {
        for (frame, timestamp) in frames {
            self.process_frame(&frame, timestamp)?;
        }
        Ok(self.finish())
    }

    /// Ends the scan, closing every open note at the last processed timestamp.
    /// Also the right call when the frame source stops early.
    pub fn finish(mut self) -> ScanOutput {
        if let Some(last) = self.stats.last_timestamp {
            for tracker in self.trackers.iter_mut() {
                if let Some(note) = tracker.flush(last, &self.tracker_config) {
                    accept(note, &self.tracker_config, &mut self.notes, &mut self.stats);
                }
            }
        }

        self.notes.sort_by(|a, b| {
            a.start_time
                .total_cmp(&b.start_time)
                .then(a.pitch.cmp(&b.pitch))
        });

        log::info!(
            "Scanned {} frames: {} notes, {} ambiguous readings, {} short notes dropped",
            self.stats.frames,
            self.notes.len(),
            self.stats.ambiguous_readings,
            self.stats.discarded_notes
        );

        ScanOutput {
            notes: self.notes,
            stats: self.stats,
        }
    }

    fn check_frame_size(&self, frame: &RgbImage) -> Result<()> {
        let expected = self.keyboard.frame_size();
        let actual = frame.dimensions();
        if expected != actual {
            return Err(Error::FrameSizeMismatch { expected, actual });
        }
        Ok(())
    }
}

fn accept(
    note: NoteEvent,
    config: &TrackerConfig,
    notes: &mut Vec<NoteEvent>,
    stats: &mut ScanStats,
) {
    if note.end_time > note.start_time && note.duration() >= config.min_duration {
        notes.push(note);
    } else {
        log::debug!(
            "Dropping short note {} at {:.3}s ({:.3}s)",
            note.pitch,
            note.start_time,
            note.duration()
        );
        stats.discarded_notes += 1;
    }
}
