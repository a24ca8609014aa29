use std::{fmt::Display, ops::Deref};

use arcstr::{ArcStr, Substr};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use unicase::UniCase;
use unicode_segmentation::UnicodeSegmentation;

/// NOTE: Case insensitive, cheaply clonable representation of an immutable string
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Query(UniCase<ArcStr>);

/// NOTE: Case insensitive slice of a [`Query`]
///
/// Obtained with [`Query::substring`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuerySubstr(UniCase<Substr>);

impl Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Query {
    #[inline]
    #[must_use]
    pub fn grapheme_len(&self) -> usize {
        self.0.graphemes(true).count()
    }

    /// `len` graphemes starting at grapheme `start`, clamped to the end of the string.
    #[must_use]
    pub fn substring(&self, start: usize, len: usize) -> QuerySubstr {
        let mut bounds = self
            .0
            .grapheme_indices(true)
            .map(|(i, _)| i)
            .chain(std::iter::once(self.0.len()))
            .skip(start);

        let from = bounds.next().unwrap_or(self.0.len());
        let to = if len == 0 {
            from
        } else {
            bounds.nth(len - 1).unwrap_or(self.0.len())
        };

        QuerySubstr(UniCase::new(self.0.substr(from..to)))
    }

    #[inline]
    #[must_use]
    pub fn as_arcstr(&self) -> &ArcStr {
        &self.0
    }
}

impl From<String> for Query {
    fn from(value: String) -> Self {
        Self(UniCase::new(ArcStr::from(value)))
    }
}

impl From<&str> for Query {
    fn from(value: &str) -> Self {
        Self(UniCase::new(ArcStr::from(value)))
    }
}

impl From<ArcStr> for Query {
    fn from(value: ArcStr) -> Self {
        Self(UniCase::new(value))
    }
}

impl Deref for Query {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.0.as_str()
    }
}

impl Serialize for Query {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self)
    }
}

impl<'de> Deserialize<'de> for Query {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

impl Deref for QuerySubstr {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.0.as_str()
    }
}

impl From<&str> for QuerySubstr {
    fn from(value: &str) -> Self {
        Self(UniCase::new(Substr::from(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparisons_ignore_case() {
        assert_eq!(Query::from("FireFox"), Query::from("firefox"));
        assert_eq!(QuerySubstr::from("FOX"), Query::from("Firefox").substring(4, 3));
    }

    #[test]
    fn substring_counts_graphemes() {
        let query = Query::from("café au lait");
        assert_eq!(query.grapheme_len(), 12);
        assert_eq!(&*query.substring(2, 3), "fé ");
        assert_eq!(&*query.substring(9, 10), "ait");
        assert_eq!(&*query.substring(20, 2), "");
        assert_eq!(&*query.substring(1, 0), "");
    }

    #[test]
    fn serializes_as_plain_string() {
        let query = Query::from("Hacker News");
        let json = serde_json::to_string(&query).expect("serializes");
        assert_eq!(json, "\"Hacker News\"");

        let back: Query = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(back, query);
    }
}
