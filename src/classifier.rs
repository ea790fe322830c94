//! Colour classification of a key patch.
//!
//! Pixels are converted to 8-bit HSV using the usual 0..180 hue scale and
//! 0..255 saturation/value. A colour is detected when the fraction of patch
//! pixels inside its hue band (and above the saturation and value floors)
//! exceeds the lit threshold.

use image::RgbImage;

use crate::config::ClassifierConfig;
use crate::keyboard::SamplePoint;
use crate::note_event::Hand;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Illumination {
    #[default]
    None,
    Green,
    Blue,
}

impl Illumination {
    pub fn hand(self) -> Option<Hand> {
        match self {
            Illumination::None => None,
            Illumination::Green => Some(Hand::Left),
            Illumination::Blue => Some(Hand::Right),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub reading: Illumination,
    pub green_fraction: f64,
    pub blue_fraction: f64,
    /// Both colours exceeded the threshold
    pub ambiguous: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = f32::from(max - min);

    let s = if max == 0 {
        0.0
    } else {
        255.0 * delta / f32::from(max)
    };

    let h = if max == min {
        0.0
    } else {
        let (rf, gf, bf) = (f32::from(r), f32::from(g), f32::from(b));
        let degrees = if max == r {
            60.0 * (gf - bf) / delta
        } else if max == g {
            120.0 + 60.0 * (bf - rf) / delta
        } else {
            240.0 + 60.0 * (rf - gf) / delta
        };
        if degrees < 0.0 {
            degrees + 360.0
        } else {
            degrees
        }
    };

    let mut h = (h / 2.0).round() as u16;
    if h >= 180 {
        h -= 180;
    }

    Hsv {
        h: h as u8,
        s: s.round() as u8,
        v: max,
    }
}

/// A square block of pixels around a key's sample point, clipped to the frame.
pub struct Patch<'a> {
    frame: &'a RgbImage,
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

impl<'a> Patch<'a> {
    pub fn extract(frame: &'a RgbImage, center: SamplePoint, size: u32) -> Self {
        let half = i64::from(size / 2);
        let clamp = |v: i64, limit: u32| v.clamp(0, i64::from(limit)) as u32;

        let x0 = clamp(i64::from(center.x) - half, frame.width());
        let x1 = clamp(i64::from(center.x) + half + 1, frame.width());
        let y0 = clamp(i64::from(center.y) - half, frame.height());
        let y1 = clamp(i64::from(center.y) + half + 1, frame.height());

        Self {
            frame,
            x0,
            y0,
            x1,
            y1,
        }
    }

    pub fn len(&self) -> usize {
        ((self.x1 - self.x0) * (self.y1 - self.y0)) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pixels(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        (self.y0..self.y1)
            .flat_map(move |y| (self.x0..self.x1).map(move |x| self.frame.get_pixel(x, y).0))
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    config: ClassifierConfig,
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn patch_size(&self) -> u32 {
        self.config.patch_size
    }

    pub fn classify(&self, patch: &Patch) -> Illumination {
        self.classify_detailed(patch).reading
    }

    pub fn classify_detailed(&self, patch: &Patch) -> Classification {
        if patch.is_empty() {
            return Classification {
                reading: Illumination::None,
                green_fraction: 0.0,
                blue_fraction: 0.0,
                ambiguous: false,
            };
        }

        let (mut green, mut blue) = (0usize, 0usize);
        for [r, g, b] in patch.pixels() {
            let hsv = rgb_to_hsv(r, g, b);
            if hsv.s <= self.config.min_saturation || hsv.v <= self.config.min_value {
                continue;
            }
            if self.config.green.contains(hsv.h) {
                green += 1;
            } else if self.config.blue.contains(hsv.h) {
                blue += 1;
            }
        }

        let total = patch.len() as f64;
        let green_fraction = green as f64 / total;
        let blue_fraction = blue as f64 / total;
        let green_lit = green_fraction > self.config.lit_threshold;
        let blue_lit = blue_fraction > self.config.lit_threshold;

        let reading = match (green_lit, blue_lit) {
            (true, false) => Illumination::Green,
            (false, true) => Illumination::Blue,
            (true, true) if green > blue => Illumination::Green,
            (true, true) if blue > green => Illumination::Blue,
            _ => Illumination::None,
        };

        Classification {
            reading,
            green_fraction,
            blue_fraction,
            ambiguous: green_lit && blue_lit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    const GREEN: Rgb<u8> = Rgb([40, 220, 60]);
    const BLUE: Rgb<u8> = Rgb([40, 90, 230]);
    const WHITE: Rgb<u8> = Rgb([240, 240, 240]);

    fn classifier() -> Classifier {
        Classifier::new(ClassifierConfig::default())
    }

    fn center() -> SamplePoint {
        SamplePoint { x: 10, y: 10 }
    }

    /// 21x21 frame of `base`, with the first `n` pixels of the central 7x7
    /// patch (row-major) painted `paint`.
    fn frame_with(base: Rgb<u8>, paint: &[(Rgb<u8>, usize)]) -> RgbImage {
        let mut frame = RgbImage::from_pixel(21, 21, base);
        let mut coords = (7..14).flat_map(|y| (7..14).map(move |x| (x, y)));
        for &(color, n) in paint {
            for (x, y) in coords.by_ref().take(n) {
                frame.put_pixel(x, y, color);
            }
        }
        frame
    }

    #[test]
    fn hsv_primaries() {
        assert_eq!(rgb_to_hsv(255, 0, 0), Hsv { h: 0, s: 255, v: 255 });
        assert_eq!(rgb_to_hsv(0, 255, 0), Hsv { h: 60, s: 255, v: 255 });
        assert_eq!(rgb_to_hsv(0, 0, 255), Hsv { h: 120, s: 255, v: 255 });
        assert_eq!(rgb_to_hsv(128, 128, 128), Hsv { h: 0, s: 0, v: 128 });
        assert_eq!(rgb_to_hsv(0, 0, 0), Hsv { h: 0, s: 0, v: 0 });
    }

    #[test]
    fn hsv_magenta_wraps_into_range() {
        let hsv = rgb_to_hsv(255, 0, 128);
        assert!(hsv.h < 180);
        assert!(hsv.h > 160);
    }

    #[test]
    fn solid_green_is_green() {
        let frame = frame_with(GREEN, &[]);
        let patch = Patch::extract(&frame, center(), 7);
        assert_eq!(patch.len(), 49);
        assert_eq!(classifier().classify(&patch), Illumination::Green);
    }

    #[test]
    fn solid_blue_is_blue() {
        let frame = frame_with(BLUE, &[]);
        let patch = Patch::extract(&frame, center(), 7);
        assert_eq!(classifier().classify(&patch), Illumination::Blue);
    }

    #[test]
    fn unlit_white_key_is_none() {
        let frame = frame_with(WHITE, &[]);
        let patch = Patch::extract(&frame, center(), 7);
        assert_eq!(classifier().classify(&patch), Illumination::None);
    }

    #[test]
    fn fraction_must_exceed_threshold() {
        // 14/49 = 0.286 stays below 0.3, 15/49 = 0.306 is above it
        let below = frame_with(WHITE, &[(GREEN, 14)]);
        let above = frame_with(WHITE, &[(GREEN, 15)]);
        let c = classifier();
        assert_eq!(c.classify(&Patch::extract(&below, center(), 7)), Illumination::None);
        assert_eq!(c.classify(&Patch::extract(&above, center(), 7)), Illumination::Green);
    }

    #[test]
    fn both_colours_lit_picks_the_larger_fraction() {
        let frame = frame_with(WHITE, &[(GREEN, 20), (BLUE, 25)]);
        let result = classifier().classify_detailed(&Patch::extract(&frame, center(), 7));
        assert!(result.ambiguous);
        assert_eq!(result.reading, Illumination::Blue);
    }

    #[test]
    fn exact_tie_is_rejected() {
        let frame = frame_with(WHITE, &[(GREEN, 20), (BLUE, 20)]);
        let result = classifier().classify_detailed(&Patch::extract(&frame, center(), 7));
        assert!(result.ambiguous);
        assert_eq!(result.reading, Illumination::None);
    }

    #[test]
    fn classification_is_repeatable() {
        let frame = frame_with(WHITE, &[(GREEN, 20), (BLUE, 18)]);
        let patch = Patch::extract(&frame, center(), 7);
        let c = classifier();
        assert_eq!(c.classify_detailed(&patch), c.classify_detailed(&patch));
    }

    #[test]
    fn dim_green_is_ignored() {
        let frame = frame_with(Rgb([5, 40, 8]), &[]);
        let patch = Patch::extract(&frame, center(), 7);
        assert_eq!(classifier().classify(&patch), Illumination::None);
    }

    #[test]
    fn patch_is_clipped_at_frame_edge() {
        let frame = RgbImage::from_pixel(21, 21, GREEN);
        let corner = Patch::extract(&frame, SamplePoint { x: 0, y: 0 }, 7);
        assert_eq!(corner.len(), 16);
        assert_eq!(classifier().classify(&corner), Illumination::Green);

        let outside = Patch::extract(&frame, SamplePoint { x: -20, y: 5 }, 7);
        assert!(outside.is_empty());
        assert_eq!(classifier().classify(&outside), Illumination::None);
    }

    #[test]
    fn colours_map_to_hands() {
        assert_eq!(Illumination::Green.hand(), Some(Hand::Left));
        assert_eq!(Illumination::Blue.hand(), Some(Hand::Right));
        assert_eq!(Illumination::None.hand(), None);
    }
}
