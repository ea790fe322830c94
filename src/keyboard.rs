//! Keyboard geometry: where to sample each of the 88 keys on a frame.
//!
//! Positions come from a handful of calibrated C-key left edges. Each octave's
//! width is split evenly among its seven white keys. White keys are sampled at
//! their visual centre (nudged by a small x shift), black keys on the boundary
//! between the two white keys that flank them, a little lower on screen.

use crate::config::{CalibrationAnchor, KeyboardConfig};
use crate::error::{Error, Result};

pub const LOWEST_PITCH: u8 = 21;
pub const HIGHEST_PITCH: u8 = 108;
pub const KEY_COUNT: usize = (HIGHEST_PITCH - LOWEST_PITCH + 1) as usize;

const WHITE_SEMITONES: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];

// (semitone, index of the white key on its left)
const BLACK_SEMITONES: [(u8, u8); 5] = [(1, 0), (3, 1), (6, 3), (8, 4), (10, 5)];

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

pub fn is_black(pitch: u8) -> bool {
    matches!(pitch % 12, 1 | 3 | 6 | 8 | 10)
}

/// Scientific pitch name, e.g. 60 -> "C4".
pub fn note_name(pitch: u8) -> String {
    let octave = i32::from(pitch) / 12 - 1;
    format!("{}{}", NOTE_NAMES[usize::from(pitch % 12)], octave)
}

pub fn key_index(pitch: u8) -> Result<usize> {
    if !(LOWEST_PITCH..=HIGHEST_PITCH).contains(&pitch) {
        return Err(Error::InvalidPitch(pitch));
    }
    Ok(usize::from(pitch - LOWEST_PITCH))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplePoint {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Key {
    pub pitch: u8,
    pub is_black: bool,
    pub sample: SamplePoint,
}

#[derive(Debug, Clone)]
pub struct Keyboard {
    keys: Vec<Key>,
    width: u32,
    height: u32,
}

impl Keyboard {
    /// Geometry on the calibration's own reference frame size.
    pub fn reference(config: &KeyboardConfig) -> Result<Self> {
        Self::new(config, config.reference_width, config.reference_height)
    }

    /// Geometry scaled to a `width` x `height` frame.
    pub fn new(config: &KeyboardConfig, width: u32, height: u32) -> Result<Self> {
        config.validate()?;
        if width == 0 || height == 0 {
            return Err(Error::InvalidConfig(format!(
                "frame size {}x{} is empty",
                width, height
            )));
        }

        let scale_x = f64::from(width) / f64::from(config.reference_width);
        let scale_y = f64::from(height) / f64::from(config.reference_height);

        let keys: Vec<Key> = (LOWEST_PITCH..=HIGHEST_PITCH)
            .map(|pitch| {
                let black = is_black(pitch);
                let x = reference_x(&config.anchors, pitch, config.white_key_x_shift);
                let y = if black {
                    config.key_y + config.black_key_y_offset
                } else {
                    config.key_y
                };
                Key {
                    pitch,
                    is_black: black,
                    sample: SamplePoint {
                        x: (x * scale_x).floor() as i32,
                        y: (y * scale_y).floor() as i32,
                    },
                }
            })
            .collect();

        for pair in keys.windows(2) {
            if pair[1].sample.x <= pair[0].sample.x {
                return Err(Error::MalformedCalibration(format!(
                    "keys {} and {} collapse to x={} and x={} at {}x{}",
                    note_name(pair[0].pitch),
                    note_name(pair[1].pitch),
                    pair[0].sample.x,
                    pair[1].sample.x,
                    width,
                    height
                )));
            }
        }

        log::debug!("Mapped {} keys for {}x{} frames", keys.len(), width, height);

        Ok(Self {
            keys,
            width,
            height,
        })
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn key(&self, pitch: u8) -> Result<&Key> {
        Ok(&self.keys[key_index(pitch)?])
    }

    pub fn sample_point(&self, pitch: u8) -> Result<SamplePoint> {
        self.key(pitch).map(|key| key.sample)
    }

    pub fn frame_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Unscaled sample x for `pitch` on the reference frame.
fn reference_x(anchors: &[CalibrationAnchor], pitch: u8, white_shift: f64) -> f64 {
    let semitone = pitch % 12;
    let c_pitch = pitch - semitone;
    let left = c_left_edge(anchors, c_pitch);
    let white_width = (c_left_edge(anchors, c_pitch + 12) - left) / 7.0;

    if let Some(index) = WHITE_SEMITONES.iter().position(|&s| s == semitone) {
        left + (index as f64 + 0.5) * white_width + white_shift
    } else {
        let left_white = BLACK_SEMITONES
            .iter()
            .find(|(s, _)| *s == semitone)
            .map(|(_, w)| *w)
            .unwrap_or_default();
        left + f64::from(left_white + 1) * white_width
    }
}

/// Left edge of the C key at `c_pitch`, interpolated between the bracketing
/// anchors or extrapolated from the nearest pair.
fn c_left_edge(anchors: &[CalibrationAnchor], c_pitch: u8) -> f64 {
    if let Some(anchor) = anchors.iter().find(|a| a.pitch == c_pitch) {
        return anchor.x;
    }

    let upper = anchors.iter().position(|a| a.pitch > c_pitch);
    let (lo, hi) = match upper {
        Some(0) => (anchors[0], anchors[1]),
        Some(i) => (anchors[i - 1], anchors[i]),
        None => (anchors[anchors.len() - 2], anchors[anchors.len() - 1]),
    };

    let per_semitone = (hi.x - lo.x) / f64::from(hi.pitch - lo.pitch);
    lo.x + (f64::from(c_pitch) - f64::from(lo.pitch)) * per_semitone
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_keyboard() -> Keyboard {
        Keyboard::reference(&KeyboardConfig::default()).unwrap()
    }

    #[test]
    fn has_88_keys() {
        let keyboard = reference_keyboard();
        assert_eq!(keyboard.keys().len(), KEY_COUNT);
        assert_eq!(keyboard.keys()[0].pitch, 21);
        assert_eq!(keyboard.keys()[87].pitch, 108);
    }

    #[test]
    fn sample_x_strictly_increases_with_pitch() {
        let keyboard = reference_keyboard();
        for pitch in LOWEST_PITCH..HIGHEST_PITCH {
            let a = keyboard.sample_point(pitch).unwrap();
            let b = keyboard.sample_point(pitch + 1).unwrap();
            assert!(a.x < b.x, "pitch {} x={} vs {} x={}", pitch, a.x, pitch + 1, b.x);
        }
    }

    #[test]
    fn sample_points_fit_the_reference_frame() {
        let keyboard = reference_keyboard();
        for key in keyboard.keys() {
            assert!(key.sample.x >= 0 && key.sample.x < 1276, "{:?}", key);
        }
    }

    #[test]
    fn out_of_range_pitch_is_rejected() {
        let keyboard = reference_keyboard();
        assert_eq!(keyboard.sample_point(20), Err(Error::InvalidPitch(20)));
        assert_eq!(keyboard.sample_point(109), Err(Error::InvalidPitch(109)));
    }

    #[test]
    fn middle_c_octave_positions() {
        let keyboard = reference_keyboard();
        // C4 anchor at 567, octave width 175 -> white keys 25px wide
        assert_eq!(keyboard.sample_point(60).unwrap(), SamplePoint { x: 576, y: 500 });
        assert_eq!(keyboard.sample_point(61).unwrap(), SamplePoint { x: 592, y: 515 });
        assert_eq!(keyboard.sample_point(62).unwrap(), SamplePoint { x: 601, y: 500 });
        assert_eq!(keyboard.sample_point(66).unwrap(), SamplePoint { x: 667, y: 515 });
    }

    #[test]
    fn black_keys_sit_between_their_neighbours() {
        let keyboard = reference_keyboard();
        for key in keyboard.keys().iter().filter(|k| k.is_black) {
            let below = keyboard.sample_point(key.pitch - 1).unwrap();
            let above = keyboard.sample_point(key.pitch + 1).unwrap();
            assert!(below.x < key.sample.x && key.sample.x < above.x);
        }
    }

    #[test]
    fn keys_below_first_anchor_are_extrapolated() {
        let keyboard = reference_keyboard();
        let a0 = keyboard.sample_point(21).unwrap();
        let c1 = keyboard.sample_point(24).unwrap();
        assert!(a0.x >= 0);
        assert!(a0.x < c1.x);
    }

    #[test]
    fn missing_middle_anchor_is_interpolated() {
        let mut config = KeyboardConfig::default();
        config.anchors.retain(|a| a.pitch != 60);
        let sparse = Keyboard::reference(&config).unwrap();
        // 48 -> 396 and 72 -> 742: C4 interpolates to 569
        assert_eq!(sparse.sample_point(60).unwrap().x, 578);
    }

    #[test]
    fn scaling_follows_frame_size() {
        let config = KeyboardConfig::default();
        let reference = Keyboard::reference(&config).unwrap();
        let double = Keyboard::new(&config, 2552, 1440).unwrap();
        let r = reference.sample_point(60).unwrap();
        let d = double.sample_point(60).unwrap();
        assert!((d.x - 2 * r.x).abs() <= 1);
        assert_eq!(d.y, 1000);
        assert_eq!(double.frame_size(), (2552, 1440));
    }

    #[test]
    fn two_anchors_are_enough() {
        let config = KeyboardConfig {
            anchors: vec![
                CalibrationAnchor { pitch: 48, x: 396.0 },
                CalibrationAnchor { pitch: 60, x: 567.0 },
            ],
            ..Default::default()
        };
        let keyboard = Keyboard::reference(&config).unwrap();
        assert_eq!(keyboard.keys().len(), KEY_COUNT);
    }

    #[test]
    fn cramped_calibration_is_rejected() {
        let config = KeyboardConfig {
            anchors: vec![
                CalibrationAnchor { pitch: 48, x: 100.0 },
                CalibrationAnchor { pitch: 60, x: 110.0 },
            ],
            ..Default::default()
        };
        assert!(matches!(
            Keyboard::reference(&config),
            Err(Error::MalformedCalibration(_))
        ));
    }

    #[test]
    fn note_names() {
        assert_eq!(note_name(21), "A0");
        assert_eq!(note_name(60), "C4");
        assert_eq!(note_name(61), "C#4");
        assert_eq!(note_name(108), "C8");
    }
}
