//! Calibration snapshot: one frame with every key's sample patch outlined.

use std::path::Path;

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};

use crate::classifier::{Classification, Illumination};
use crate::keyboard::Keyboard;

const WHITE_ROW: Rgb<u8> = Rgb([255, 255, 0]);
const BLACK_ROW: Rgb<u8> = Rgb([0, 255, 255]);
const LIT_GREEN: Rgb<u8> = Rgb([0, 255, 0]);
const LIT_BLUE: Rgb<u8> = Rgb([0, 0, 255]);
const UNLIT: Rgb<u8> = Rgb([128, 128, 128]);

/// Draws sample rows and key patches over a copy of `frame`.
/// `readings` are in keyboard order, as returned by `Scanner::classify_frame`.
pub fn render(
    frame: &RgbImage,
    keyboard: &Keyboard,
    readings: &[Classification],
    patch_size: u32,
) -> RgbImage {
    let mut vis = frame.clone();

    if let Some(white) = keyboard.keys().iter().find(|k| !k.is_black) {
        draw_row(&mut vis, white.sample.y, WHITE_ROW);
    }
    if let Some(black) = keyboard.keys().iter().find(|k| k.is_black) {
        draw_row(&mut vis, black.sample.y, BLACK_ROW);
    }

    let half = (patch_size / 2) as i32;
    for (key, classification) in keyboard.keys().iter().zip(readings) {
        let (color, thickness) = match classification.reading {
            Illumination::Green => (LIT_GREEN, 2),
            Illumination::Blue => (LIT_BLUE, 2),
            Illumination::None => (UNLIT, 1),
        };
        let p = key.sample;
        for inset in 0..thickness {
            draw_outline(
                &mut vis,
                (p.x - half - inset, p.y - half - inset),
                (p.x + half + inset, p.y + half + inset),
                color,
            );
        }
    }

    vis
}

pub fn save(image: &RgbImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    image
        .save(path)
        .with_context(|| format!("save debug image {}", path.display()))?;
    println!("Debug image: {}", path.display());
    Ok(())
}

fn put(image: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
        image.put_pixel(x as u32, y as u32, color);
    }
}

fn draw_row(image: &mut RgbImage, y: i32, color: Rgb<u8>) {
    for x in 0..image.width() as i32 {
        put(image, x, y, color);
    }
}

fn draw_outline(image: &mut RgbImage, (x0, y0): (i32, i32), (x1, y1): (i32, i32), color: Rgb<u8>) {
    for x in x0..=x1 {
        put(image, x, y0, color);
        put(image, x, y1, color);
    }
    for y in y0..=y1 {
        put(image, x0, y, color);
        put(image, x1, y, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::config::{ClassifierConfig, KeyboardConfig};
    use crate::classifier::Patch;

    #[test]
    fn outlines_lit_and_unlit_keys() {
        let keyboard = Keyboard::reference(&KeyboardConfig::default()).unwrap();
        let classifier = Classifier::new(ClassifierConfig::default());
        let mut frame = RgbImage::from_pixel(1276, 720, Rgb([10, 10, 10]));

        let c4 = keyboard.sample_point(60).unwrap();
        for y in c4.y - 3..=c4.y + 3 {
            for x in c4.x - 3..=c4.x + 3 {
                frame.put_pixel(x as u32, y as u32, Rgb([40, 220, 60]));
            }
        }

        let readings: Vec<Classification> = keyboard
            .keys()
            .iter()
            .map(|k| classifier.classify_detailed(&Patch::extract(&frame, k.sample, 7)))
            .collect();
        let vis = render(&frame, &keyboard, &readings, 7);

        // Lit key: outer ring drawn one pixel outside the patch
        assert_eq!(*vis.get_pixel((c4.x - 4) as u32, (c4.y + 2) as u32), LIT_GREEN);
        // Unlit neighbour keeps a single grey ring
        let d4 = keyboard.sample_point(62).unwrap();
        assert_eq!(*vis.get_pixel((d4.x - 3) as u32, (d4.y + 2) as u32), UNLIT);
        // Black-key sample row
        assert_eq!(*vis.get_pixel(0, 515), BLACK_ROW);
        // The source frame is untouched
        assert_eq!(*frame.get_pixel(0, 515), Rgb([10, 10, 10]));
    }

    #[test]
    fn saves_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("debug.png");
        save(&RgbImage::new(8, 8), &path).unwrap();
        assert!(path.exists());
    }
}
