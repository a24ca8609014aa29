use std::io::Write;

use crate::ui::{SuggestionEntry, SuggestionView};

/// Prints suggestions as plain lines, one per row.
#[derive(Debug)]
pub struct TerminalView<W> {
    out: W,
    hint_text: String,
    query: String,
    is_open: bool,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W, hint_text: impl Into<String>) -> Self {
        Self {
            out,
            hint_text: hint_text.into(),
            query: String::new(),
            is_open: false,
        }
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    #[inline]
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, line: std::fmt::Arguments<'_>) {
        if let Err(err) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            tracing::warn!(error = %err, "could not write suggestions");
        }
    }
}

impl<W: Write + Send + 'static> SuggestionView for TerminalView<W> {
    fn query_text(&self) -> String {
        self.query.clone()
    }

    fn open(&mut self) {
        self.is_open = true;
    }

    fn close(&mut self, final_text: &str) {
        self.is_open = false;
        self.emit(format_args!("> {final_text}"));
    }

    fn render(&mut self, entries: Vec<SuggestionEntry>) {
        if entries.is_empty() {
            if self.query.is_empty() {
                let hint = std::mem::take(&mut self.hint_text);
                self.emit(format_args!("  ({hint})"));
                self.hint_text = hint;
            } else {
                self.emit(format_args!("  (no suggestions)"));
            }
            return;
        }

        for entry in entries {
            match entry.subtitle {
                Some(subtitle) => {
                    self.emit(format_args!("  [{}] {} ({subtitle})", entry.index, entry.title));
                }
                None => self.emit(format_args!("  [{}] {}", entry.index, entry.title)),
            }
        }
    }
}
