// Configuration for the extractor
//
// Every knob has a default matching a 1276x720 Synthesia render. A TOML file
// can override any subset of fields; omitted fields keep their defaults.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Complete extractor configuration, validated once before a scan starts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractorConfig {
    pub keyboard: KeyboardConfig,
    pub classifier: ClassifierConfig,
    pub tracker: TrackerConfig,
}

/// Pixel x of the left edge of a white C key on the reference frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CalibrationAnchor {
    pub pitch: u8,
    pub x: f64,
}

/// Keyboard geometry calibration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KeyboardConfig {
    /// One anchor per calibrated octave, ascending in pitch and x
    pub anchors: Vec<CalibrationAnchor>,

    /// Frame size the anchors and y coordinates were measured on
    pub reference_width: u32,
    pub reference_height: u32,

    /// Sample row for white keys
    pub key_y: f64,

    /// Black-key illumination sits lower than the white-key row
    pub black_key_y_offset: f64,

    /// Applied to white-key centres only; negative moves left
    pub white_key_x_shift: f64,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        let anchors = [
            (24, 51.0),
            (36, 224.0),
            (48, 396.0),
            (60, 567.0),
            (72, 742.0),
            (84, 914.0),
            (96, 1086.0),
        ]
        .into_iter()
        .map(|(pitch, x)| CalibrationAnchor { pitch, x })
        .collect();

        Self {
            anchors,
            reference_width: 1276,
            reference_height: 720,
            key_y: 500.0,
            black_key_y_offset: 15.0,
            white_key_x_shift: -3.0,
        }
    }
}

impl KeyboardConfig {
    pub fn validate(&self) -> Result<()> {
        if self.anchors.len() < 2 {
            return Err(Error::MalformedCalibration(format!(
                "need at least 2 anchors, got {}",
                self.anchors.len()
            )));
        }
        for anchor in &self.anchors {
            if anchor.pitch % 12 != 0 || anchor.pitch > 120 {
                return Err(Error::MalformedCalibration(format!(
                    "anchor pitch {} is not a C",
                    anchor.pitch
                )));
            }
            if !anchor.x.is_finite() {
                return Err(Error::MalformedCalibration(format!(
                    "anchor for pitch {} has non-finite x",
                    anchor.pitch
                )));
            }
        }
        for pair in self.anchors.windows(2) {
            if pair[1].pitch <= pair[0].pitch || pair[1].x <= pair[0].x {
                return Err(Error::MalformedCalibration(format!(
                    "anchors must increase in pitch and x: ({}, {}) then ({}, {})",
                    pair[0].pitch, pair[0].x, pair[1].pitch, pair[1].x
                )));
            }
        }
        if self.reference_width == 0 || self.reference_height == 0 {
            return Err(Error::InvalidConfig("reference frame size must be non-zero".into()));
        }
        Ok(())
    }
}

/// Inclusive hue range on the 0..180 hue scale.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HueBand {
    pub min: u8,
    pub max: u8,
}

impl HueBand {
    pub fn contains(&self, hue: u8) -> bool {
        hue >= self.min && hue <= self.max
    }

    fn overlaps(&self, other: &HueBand) -> bool {
        self.min <= other.max && other.min <= self.max
    }
}

/// Colour classification thresholds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Side length of the square patch sampled per key (odd)
    pub patch_size: u32,

    pub green: HueBand,
    pub blue: HueBand,

    /// Pixels must exceed both of these (0..255) to count as lit
    pub min_saturation: u8,
    pub min_value: u8,

    /// Fraction of patch pixels a colour must exceed to be detected
    pub lit_threshold: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            patch_size: 7,
            green: HueBand { min: 35, max: 84 },
            blue: HueBand { min: 85, max: 135 },
            min_saturation: 50,
            min_value: 50,
            lit_threshold: 0.3,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<()> {
        if self.patch_size == 0 || self.patch_size % 2 == 0 {
            return Err(Error::InvalidConfig(format!(
                "patch size must be odd, got {}",
                self.patch_size
            )));
        }
        for (name, band) in [("green", &self.green), ("blue", &self.blue)] {
            if band.min > band.max || band.max >= 180 {
                return Err(Error::InvalidConfig(format!(
                    "{} hue band {}..={} is not within 0..180",
                    name, band.min, band.max
                )));
            }
        }
        if self.green.overlaps(&self.blue) {
            return Err(Error::InvalidConfig("green and blue hue bands overlap".into()));
        }
        if !(self.lit_threshold > 0.0 && self.lit_threshold < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "lit threshold must be within (0, 1), got {}",
                self.lit_threshold
            )));
        }
        Ok(())
    }
}

/// Which timestamp a debounced release (or colour switch) closes a note at.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseAnchor {
    /// The last frame the key was seen lit
    #[default]
    LastLit,
    /// The first frame of the unlit run
    FirstUnlit,
}

/// Per-key note tracking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    /// Consecutive unlit frames before a held key is released
    pub debounce_frames: u32,

    pub release_anchor: ReleaseAnchor,

    /// Notes shorter than this (seconds) are discarded
    pub min_duration: f64,

    pub velocity: u8,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            debounce_frames: 2,
            release_anchor: ReleaseAnchor::default(),
            min_duration: 0.03,
            velocity: 100,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.debounce_frames == 0 {
            return Err(Error::InvalidConfig("debounce must be at least 1 frame".into()));
        }
        if !(self.min_duration >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "minimum duration must be non-negative, got {}",
                self.min_duration
            )));
        }
        if self.velocity == 0 || self.velocity > 127 {
            return Err(Error::InvalidConfig(format!(
                "velocity must be within 1..=127, got {}",
                self.velocity
            )));
        }
        Ok(())
    }
}

impl ExtractorConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config: ExtractorConfig = toml::from_str(&contents)
            .with_context(|| format!("parse config {}", path.display()))?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.keyboard.validate()?;
        self.classifier.validate()?;
        self.tracker.validate()
    }
}
