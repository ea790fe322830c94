use std::fmt;

use crate::formatter::NoteFormatter;
use crate::note_event::{Hand, NoteEvent};

/// Overview of an extracted note list.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteSummary {
    pub total: usize,
    pub left: usize,
    pub right: usize,
    pub lowest_pitch: u8,
    pub highest_pitch: u8,
    pub shortest: f64,
    pub longest: f64,
    pub average: f64,
}

impl NoteSummary {
    /// `None` for an empty list.
    pub fn from_notes(notes: &[NoteEvent]) -> Option<Self> {
        let first = notes.first()?;
        let mut summary = NoteSummary {
            total: notes.len(),
            left: 0,
            right: 0,
            lowest_pitch: first.pitch,
            highest_pitch: first.pitch,
            shortest: f64::INFINITY,
            longest: 0.0,
            average: 0.0,
        };

        let mut total_duration = 0.0;
        for note in notes {
            match note.hand {
                Hand::Left => summary.left += 1,
                Hand::Right => summary.right += 1,
            }
            summary.lowest_pitch = summary.lowest_pitch.min(note.pitch);
            summary.highest_pitch = summary.highest_pitch.max(note.pitch);
            summary.shortest = summary.shortest.min(note.duration());
            summary.longest = summary.longest.max(note.duration());
            total_duration += note.duration();
        }
        summary.average = total_duration / notes.len() as f64;

        Some(summary)
    }
}

impl fmt::Display for NoteSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "  Total: {}, Left: {}, Right: {}",
            self.total, self.left, self.right
        )?;
        writeln!(
            f,
            "  MIDI range: {} - {}",
            self.lowest_pitch, self.highest_pitch
        )?;
        writeln!(
            f,
            "  Duration range: {:.3}s - {:.3}s",
            self.shortest, self.longest
        )?;
        write!(f, "  Avg duration: {:.3}s", self.average)
    }
}

/// Summary plus the first `limit` notes in start order, one per line.
pub fn report(notes: &[NoteEvent], formatter: &dyn NoteFormatter, limit: usize) -> String {
    let Some(summary) = NoteSummary::from_notes(notes) else {
        return "No notes extracted".to_string();
    };

    let mut sorted: Vec<&NoteEvent> = notes.iter().collect();
    sorted.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    let mut out = format!("Analysis:\n{}\n\nFirst {} notes:", summary, limit.min(notes.len()));
    for note in sorted.into_iter().take(limit) {
        out.push_str("\n  ");
        out.push_str(&formatter.format(note));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::NoteListFormatter;

    fn note(pitch: u8, start: f64, end: f64, hand: Hand) -> NoteEvent {
        NoteEvent {
            pitch,
            start_time: start,
            end_time: end,
            hand,
            velocity: 100,
        }
    }

    #[test]
    fn summarises_hands_and_ranges() {
        let notes = [
            note(48, 1.0, 2.0, Hand::Left),
            note(72, 1.5, 1.75, Hand::Right),
            note(76, 2.0, 2.75, Hand::Right),
        ];
        let summary = NoteSummary::from_notes(&notes).unwrap();
        assert_eq!(summary.total, 3);
        assert_eq!((summary.left, summary.right), (1, 2));
        assert_eq!((summary.lowest_pitch, summary.highest_pitch), (48, 76));
        assert_eq!((summary.shortest, summary.longest), (0.25, 1.0));
        assert!((summary.average - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn empty_list_has_no_summary() {
        assert_eq!(NoteSummary::from_notes(&[]), None);
        assert_eq!(report(&[], &NoteListFormatter::new(), 25), "No notes extracted");
    }

    #[test]
    fn report_lists_notes_in_start_order() {
        let notes = [
            note(64, 2.0, 3.0, Hand::Right),
            note(60, 1.0, 2.0, Hand::Left),
            note(67, 3.0, 4.0, Hand::Right),
        ];
        let text = report(&notes, &NoteListFormatter::new(), 2);
        let lines: Vec<&str> = text.lines().collect();
        assert!(text.contains("Total: 3, Left: 1, Right: 2"));
        assert!(text.contains("First 2 notes:"));
        assert_eq!(lines[lines.len() - 2].trim(), "00:01.000: L C4 (MIDI 60) dur=1.000s");
        assert_eq!(lines[lines.len() - 1].trim(), "00:02.000: R E4 (MIDI 64) dur=1.000s");
    }
}
