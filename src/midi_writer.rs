use std::path::Path;

use anyhow::{bail, Context, Result};
use midi_file::core::{Channel, NoteNumber, Velocity};
use midi_file::file::{Division, QuartersPerMinute, Track};
use midi_file::MidiFile;

use crate::note_event::{Hand, NoteEvent};

pub const TEMPO_BPM: u8 = 120;

const HANDS: [(Hand, &str); 2] = [(Hand::Left, "Left Hand"), (Hand::Right, "Right Hand")];

/// Build a two-track file, one track per hand, at a fixed tempo.
pub fn build(notes: &[NoteEvent]) -> Result<MidiFile> {
    let mut midi_file = MidiFile::new();

    let pulses_per_qn: u16 = match midi_file.header().division() {
        Division::QuarterNote(qtr) => qtr.get(),
        Division::Smpte(smpte) => bail!("unexpected SMPTE division {:?}", smpte),
    };

    for (hand, name) in HANDS {
        let mut track = Track::default();
        track.set_name(name).context("set track name")?;
        if hand == Hand::Left {
            track
                .push_tempo(0, QuartersPerMinute::new(TEMPO_BPM))
                .context("push tempo")?;
        }

        let channel = Channel::new(hand.track());
        let mut last_tick = 0;
        for event in track_events(notes, hand, pulses_per_qn) {
            let delta = event.tick - last_tick;
            last_tick = event.tick;
            let note_number = NoteNumber::new(event.pitch);
            if event.on {
                track
                    .push_note_on(delta, channel, note_number, Velocity::new(event.velocity))
                    .context("push note on")?;
            } else {
                track
                    .push_note_off(delta, channel, note_number, Velocity::new(0))
                    .context("push note off")?;
            }
        }

        midi_file.push_track(track).context("add track")?;
    }

    Ok(midi_file)
}

pub fn save(notes: &[NoteEvent], path: &Path) -> Result<()> {
    let midi_file = build(notes)?;
    midi_file
        .save(path)
        .with_context(|| format!("save midi file {}", path.display()))?;
    println!("Saved: {}", path.display());
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TickEvent {
    tick: u32,
    on: bool,
    pitch: u8,
    velocity: u8,
}

/// Absolute-tick note on/off events for one hand, note-offs first on ties.
fn track_events(notes: &[NoteEvent], hand: Hand, pulses_per_qn: u16) -> Vec<TickEvent> {
    let mut events: Vec<TickEvent> = notes
        .iter()
        .filter(|n| n.hand == hand)
        .flat_map(|n| {
            let start = seconds_to_ticks(n.start_time, pulses_per_qn);
            let end = seconds_to_ticks(n.end_time, pulses_per_qn).max(start + 1);
            [
                TickEvent {
                    tick: start,
                    on: true,
                    pitch: n.pitch,
                    velocity: n.velocity,
                },
                TickEvent {
                    tick: end,
                    on: false,
                    pitch: n.pitch,
                    velocity: 0,
                },
            ]
        })
        .collect();

    events.sort_by_key(|e| (e.tick, e.on, e.pitch));
    events
}

fn seconds_to_ticks(seconds: f64, pulses_per_qn: u16) -> u32 {
    let quarters = seconds * f64::from(TEMPO_BPM) / 60.0;
    (quarters * f64::from(pulses_per_qn)).round().max(0.0) as u32
}
