/// Which hand played a note. The illumination colour is the hand signal:
/// green keys are the left hand, blue keys the right hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    /// Output track index in the MIDI file.
    pub fn track(self) -> u8 {
        match self {
            Hand::Left => 0,
            Hand::Right => 1,
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Hand::Left => "L",
            Hand::Right => "R",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteEvent {
    pub pitch: u8,
    pub start_time: f64, // in seconds
    pub end_time: f64,   // in seconds
    pub hand: Hand,
    pub velocity: u8,
}

impl NoteEvent {
    pub fn track(&self) -> u8 {
        self.hand.track()
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}
