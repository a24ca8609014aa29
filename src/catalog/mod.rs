//! The searchable collection behind the suggestion list.

pub mod engine;

use std::path::Path;

use arcstr::ArcStr;
use rootcause::{Report, report};
use serde::{Deserialize, Serialize};

use crate::query::Query;

pub use self::engine::{CatalogSearch, SearchError};

/// One suggestion candidate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entry {
    pub title: ArcStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<ArcStr>,
    /// Path or URL of an image, left to the view to interpret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<ArcStr>,
}

impl Entry {
    #[must_use]
    pub fn new(title: impl Into<ArcStr>) -> Self {
        Self {
            title: title.into(),
            subtitle: None,
            thumbnail: None,
        }
    }

    #[must_use]
    pub fn with_subtitle(mut self, subtitle: impl Into<ArcStr>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    #[must_use]
    pub fn with_thumbnail(mut self, thumbnail: impl Into<ArcStr>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> Query {
        self.title.clone().into()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<Entry>,
}

impl Catalog {
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = Entry>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Reads a JSON array of entries.
    ///
    /// # Errors
    ///
    /// The file can't be read, or isn't a JSON array of entries.
    pub fn from_json_file(path: &Path) -> Result<Self, Report> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| report!(err).attach(format!("reading {}", path.display())))?;

        Self::from_json_str(&text)
            .map_err(|err| err.attach(format!("parsing catalog {}", path.display())))
    }

    /// # Errors
    ///
    /// `json` isn't an array of entries.
    pub fn from_json_str(json: &str) -> Result<Self, Report> {
        let entries: Vec<Entry> = serde_json::from_str(json)?;

        Ok(Self { entries })
    }

    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    #[inline]
    #[must_use]
    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
