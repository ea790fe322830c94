//! Convert Synthesia-style piano tutorial videos to MIDI.
//!
//! Each frame is sampled at a calibrated point on all 88 keys. A patch that
//! reads as green illumination is a left-hand key, blue a right-hand key. Per
//! key, a debounced tracker turns the per-frame readings into note events,
//! which are written as a two-track MIDI file.

pub mod analysis;
pub mod classifier;
pub mod config;
pub mod debug_image;
pub mod error;
pub mod extractor;
pub mod formatter;
pub mod keyboard;
pub mod midi_writer;
pub mod note_event;
pub mod scanner;
pub mod tracker;
pub mod video;

pub use classifier::{Classifier, Illumination};
pub use config::ExtractorConfig;
pub use error::{Error, Result};
pub use keyboard::Keyboard;
pub use note_event::{Hand, NoteEvent};
pub use scanner::{ScanOutput, ScanStats, Scanner};
