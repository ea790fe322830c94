//! Debounced on/off tracking for a single key.
//!
//! A key opens a note on its first lit frame and holds it while the same
//! colour keeps being detected. Short unlit runs (fewer than the debounce
//! count) are absorbed. A different colour closes the open note and opens a
//! new one on the same frame.

use crate::classifier::Illumination;
use crate::config::{ReleaseAnchor, TrackerConfig};
use crate::note_event::{Hand, NoteEvent};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum TrackState {
    #[default]
    Inactive,
    Active {
        hand: Hand,
        start: f64,
        last_lit: f64,
        unlit_run: u32,
        first_unlit: Option<f64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyTracker {
    pitch: u8,
    state: TrackState,
}

impl KeyTracker {
    pub fn new(pitch: u8) -> Self {
        Self {
            pitch,
            state: TrackState::Inactive,
        }
    }

    pub fn pitch(&self) -> u8 {
        self.pitch
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, TrackState::Active { .. })
    }

    pub fn active_hand(&self) -> Option<Hand> {
        match self.state {
            TrackState::Active { hand, .. } => Some(hand),
            TrackState::Inactive => None,
        }
    }

    /// Consecutive unlit frames seen since the key was last lit.
    pub fn unlit_run(&self) -> u32 {
        match self.state {
            TrackState::Active { unlit_run, .. } => unlit_run,
            TrackState::Inactive => 0,
        }
    }

    /// Feeds one frame's reading. Returns the note closed by this frame, if any.
    pub fn observe(
        &mut self,
        reading: Illumination,
        timestamp: f64,
        config: &TrackerConfig,
    ) -> Option<NoteEvent> {
        match (self.state, reading.hand()) {
            (TrackState::Inactive, None) => None,

            (TrackState::Inactive, Some(hand)) => {
                self.open(hand, timestamp);
                None
            }

            (TrackState::Active { hand, start, .. }, Some(lit)) if lit == hand => {
                self.state = TrackState::Active {
                    hand,
                    start,
                    last_lit: timestamp,
                    unlit_run: 0,
                    first_unlit: None,
                };
                None
            }

            (
                TrackState::Active {
                    hand,
                    start,
                    last_lit,
                    first_unlit,
                    ..
                },
                Some(lit),
            ) => {
                let end = release_time(
                    config.release_anchor,
                    last_lit,
                    first_unlit.unwrap_or(timestamp),
                );
                let closed = self.note(hand, start, end, config);
                self.open(lit, timestamp);
                Some(closed)
            }

            (
                TrackState::Active {
                    hand,
                    start,
                    last_lit,
                    unlit_run,
                    first_unlit,
                },
                None,
            ) => {
                let unlit_run = unlit_run + 1;
                let first_unlit = first_unlit.unwrap_or(timestamp);

                if unlit_run >= config.debounce_frames {
                    let end = release_time(config.release_anchor, last_lit, first_unlit);
                    self.state = TrackState::Inactive;
                    Some(self.note(hand, start, end, config))
                } else {
                    self.state = TrackState::Active {
                        hand,
                        start,
                        last_lit,
                        unlit_run,
                        first_unlit: Some(first_unlit),
                    };
                    None
                }
            }
        }
    }

    /// Closes any open note at `final_timestamp`, regardless of unlit state.
    pub fn flush(&mut self, final_timestamp: f64, config: &TrackerConfig) -> Option<NoteEvent> {
        match std::mem::take(&mut self.state) {
            TrackState::Active { hand, start, .. } => {
                Some(self.note(hand, start, final_timestamp, config))
            }
            TrackState::Inactive => None,
        }
    }

    fn open(&mut self, hand: Hand, timestamp: f64) {
        self.state = TrackState::Active {
            hand,
            start: timestamp,
            last_lit: timestamp,
            unlit_run: 0,
            first_unlit: None,
        };
    }

    fn note(&self, hand: Hand, start: f64, end: f64, config: &TrackerConfig) -> NoteEvent {
        NoteEvent {
            pitch: self.pitch,
            start_time: start,
            end_time: end,
            hand,
            velocity: config.velocity,
        }
    }
}

fn release_time(anchor: ReleaseAnchor, last_lit: f64, first_unlit: f64) -> f64 {
    match anchor {
        ReleaseAnchor::LastLit => last_lit,
        ReleaseAnchor::FirstUnlit => first_unlit,
    }
}
