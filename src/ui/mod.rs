//! The boundary with whatever draws the search box.
//!
//! Drawing is not done here: a [`SuggestionView`] is told what to show, and
//! asked for the text currently typed.

pub mod search_adapter;
pub mod terminal;

use crate::catalog::Entry;

pub use self::search_adapter::{QueryUpdate, SearchAdapter};

pub trait SuggestionView: Send + 'static {
    fn query_text(&self) -> String;
    /// Show the suggestion list.
    fn open(&mut self);
    /// Hide the suggestion list, leaving `final_text` in the search box.
    fn close(&mut self, final_text: &str);
    fn render(&mut self, entries: Vec<SuggestionEntry>);
}

/// One row of the suggestion list, ready to draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionEntry {
    /// Position in the list, and the index to pass to [`SearchAdapter::select`].
    pub index: usize,
    pub title: String,
    pub subtitle: Option<String>,
    pub thumbnail: Option<String>,
}

type TitleBuilder<T> = Box<dyn Fn(&T) -> String + Send + Sync>;
type DetailBuilder<T> = Box<dyn Fn(&T) -> Option<String> + Send + Sync>;

/// Turns search results into [`SuggestionEntry`] rows.
pub struct Presenter<T> {
    title: TitleBuilder<T>,
    subtitle: Option<DetailBuilder<T>>,
    thumbnail: Option<DetailBuilder<T>>,
}

impl<T> Presenter<T> {
    pub fn new(title: impl Fn(&T) -> String + Send + Sync + 'static) -> Self {
        Self {
            title: Box::new(title),
            subtitle: None,
            thumbnail: None,
        }
    }

    #[must_use]
    pub fn subtitle(
        mut self,
        subtitle: impl Fn(&T) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.subtitle = Some(Box::new(subtitle));
        self
    }

    #[must_use]
    pub fn thumbnail(
        mut self,
        thumbnail: impl Fn(&T) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.thumbnail = Some(Box::new(thumbnail));
        self
    }

    #[must_use]
    pub fn present(&self, index: usize, item: &T) -> SuggestionEntry {
        SuggestionEntry {
            index,
            title: (self.title)(item),
            subtitle: self.subtitle.as_ref().and_then(|subtitle| subtitle(item)),
            thumbnail: self.thumbnail.as_ref().and_then(|thumbnail| thumbnail(item)),
        }
    }
}

impl Presenter<Entry> {
    #[must_use]
    pub fn entries() -> Self {
        Self::new(|entry: &Entry| entry.title.to_string())
            .subtitle(|entry| entry.subtitle.as_ref().map(ToString::to_string))
            .thumbnail(|entry| entry.thumbnail.as_ref().map(ToString::to_string))
    }
}

impl<T> std::fmt::Debug for Presenter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Presenter")
            .field("subtitle", &self.subtitle.is_some())
            .field("thumbnail", &self.thumbnail.is_some())
            .finish_non_exhaustive()
    }
}
