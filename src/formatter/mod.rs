use crate::note_event::NoteEvent;

mod note_list_formatter;

pub use note_list_formatter::NoteListFormatter;

pub trait NoteFormatter {
    fn format(&self, note: &NoteEvent) -> String;
}
