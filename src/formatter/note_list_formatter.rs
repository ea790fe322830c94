use crate::formatter::NoteFormatter;
use crate::keyboard::note_name;
use crate::note_event::NoteEvent;
use std::time::Duration;

pub struct NoteListFormatter {}

impl NoteListFormatter {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for NoteListFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl NoteFormatter for NoteListFormatter {
    fn format(&self, note: &NoteEvent) -> String {
        // 00:06.000: L C4 (MIDI 60) dur=3.000s
        format!(
            "{timestamp}: {hand} {name} (MIDI {pitch}) dur={duration:.3}s",
            timestamp = format_note_time(note.start_time),
            hand = note.hand.short_name(),
            name = note_name(note.pitch),
            pitch = note.pitch,
            duration = note.duration(),
        )
    }
}

fn format_note_time(seconds: f64) -> String {
    let duration = Duration::from_secs_f64(seconds.max(0.0));
    let minutes = duration.as_secs() / 60;
    let seconds = duration.as_secs() % 60;
    let fractional = duration.subsec_millis();
    format!("{:02}:{:02}.{:03}", minutes, seconds, fractional)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note_event::Hand;

    #[test]
    fn formats_left_hand_note() {
        let note = NoteEvent {
            pitch: 60,
            start_time: 6.0,
            end_time: 9.0,
            hand: Hand::Left,
            velocity: 100,
        };
        assert_eq!(
            NoteListFormatter::new().format(&note),
            "00:06.000: L C4 (MIDI 60) dur=3.000s"
        );
    }

    #[test]
    fn formats_minutes_and_sharps() {
        let note = NoteEvent {
            pitch: 70,
            start_time: 125.25,
            end_time: 125.5,
            hand: Hand::Right,
            velocity: 100,
        };
        assert_eq!(
            NoteListFormatter::new().format(&note),
            "02:05.250: R A#4 (MIDI 70) dur=0.250s"
        );
    }
}
