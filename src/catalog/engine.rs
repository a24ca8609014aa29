use std::{
    collections::{BTreeMap, HashSet, VecDeque},
    sync::Arc,
};

use parking_lot::Mutex;
use rayon::{
    iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator},
    slice::ParallelSliceMut,
};
use rootcause::Report;
use scc::HashMap;
use unicode_segmentation::UnicodeSegmentation;

use crate::{
    catalog::{Catalog, Entry},
    fs::{
        config::Configuration,
        db::{FilesystemPersistence, Persistence},
    },
    query::{Query, QuerySubstr},
};

const LEARNED_KEY: &str = "learned_substring_index";
/// Queries kept for learning the next pick. Older ones are forgotten.
const HISTORY_LIMIT: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone)]
pub struct CatalogSearch {
    db: Option<Arc<Mutex<FilesystemPersistence>>>,
    entries: Arc<[Entry]>,
    max_suggestions: usize,
    /// Every substring of every entry title, pointing at the entries containing it.
    substring_index: Arc<HashMap<Query, Vec<usize>>>,
    /// Query to the title of the entry last picked for it.
    learned_index: Arc<HashMap<Query, Query>>,

    /// The latest queries searched since the last pick. For instance, if the
    /// user picks "Firefox" after typing "Fire", the history holds
    /// `["F", "Fi", "Fir", "Fire"]`. A search whose result got discarded
    /// because the user kept typing still counts, it was typed all the same.
    query_history: Arc<Mutex<VecDeque<Query>>>,
}

impl CatalogSearch {
    #[must_use]
    pub fn build(
        catalog: Catalog,
        config: &Configuration,
        db: Option<FilesystemPersistence>,
    ) -> Self {
        let learned_index = HashMap::new();

        if let Some(db) = &db {
            match db.get_data::<BTreeMap<Query, Query>>(LEARNED_KEY) {
                Ok(learned) => {
                    for (query, title) in learned {
                        let _ = learned_index.upsert_sync(query, title);
                    }
                }
                Err(err) => tracing::debug!(error = %err, "no learned picks loaded"),
            }
        }

        let engine = Self {
            db: db.map(|db| Arc::new(Mutex::new(db))),
            entries: catalog.into_entries().into(),
            max_suggestions: config.max_suggestions,
            substring_index: Arc::new(HashMap::new()),
            learned_index: Arc::new(learned_index),
            query_history: Arc::default(),
        };

        engine.index_entries();
        tracing::debug!(entries = engine.entries.len(), "catalog indexed");

        engine
    }

    /// Entries whose title contains `query`, best match first.
    #[must_use]
    pub fn search(&self, query: &Query) -> Vec<Entry> {
        self.remember(query);

        let Some(mut hits) = self
            .substring_index
            .get_sync(query)
            .map(|hits| hits.get().clone())
        else {
            return Vec::new();
        };
        hits.sort_unstable();

        let mut found: Vec<Entry> = hits
            .par_iter()
            .map(|&i| self.entries[i].clone())
            .collect();

        found.par_sort_by_cached_key(Entry::name);

        let prefix = query.substring(0, query.grapheme_len());
        found.par_sort_by_cached_key(|entry| {
            let name = entry.name();
            if *query == name {
                (0, 0, 0)
            } else {
                let (word, offset) = beginning_distance(&prefix, &name);
                (1, word, offset)
            }
        });

        if let Some(learned) = self.learned(query) {
            found.par_sort_by_key(|entry| entry.name() != learned);
        }

        found.truncate(self.max_suggestions);
        found
    }

    /// Runs [`Self::search`] on the blocking pool.
    ///
    /// # Errors
    ///
    /// The search worker panicked or was cancelled.
    pub async fn search_async(&self, query: String) -> Result<Vec<Entry>, SearchError> {
        let engine = self.clone();
        let found =
            tokio::task::spawn_blocking(move || engine.search(&Query::from(query))).await?;

        Ok(found)
    }

    /// Ends a search session. When an entry was picked, every query typed
    /// during the session learns it, and the learned picks are saved.
    ///
    /// # Errors
    ///
    /// The learned picks could not be persisted.
    pub fn after_search(&self, picked: Option<&Entry>) -> Result<(), Report> {
        let query_history = std::mem::take(&mut *self.query_history.lock());

        let Some(entry) = picked else {
            return Ok(());
        };

        for query in query_history {
            let _ = self.learned_index.upsert_sync(query, entry.name());
        }

        if let Some(db) = &self.db {
            db.lock().save_data(LEARNED_KEY, self.learned_snapshot())?;
        }

        Ok(())
    }

    #[must_use]
    pub fn learned(&self, query: &Query) -> Option<Query> {
        self.learned_index
            .get_sync(query)
            .map(|title| title.get().clone())
    }

    fn remember(&self, query: &Query) {
        let mut history = self.query_history.lock();
        if history.len() == HISTORY_LIMIT {
            history.pop_front();
        }
        history.push_back(query.clone());
    }

    fn learned_snapshot(&self) -> BTreeMap<Query, Query> {
        let mut snapshot = BTreeMap::new();
        self.learned_index.iter_sync(|query, title| {
            snapshot.insert(query.clone(), title.clone());
            true
        });

        snapshot
    }

    fn index_entries(&self) {
        self.entries.par_iter().enumerate().for_each(|(i, entry)| {
            let name = entry.name();
            let unique: HashSet<Query> = (1..=name.grapheme_len())
                .flat_map(|n| substrings(&name, n))
                .map(Query::from)
                .collect();

            for substr in unique {
                self.substring_index
                    .entry_sync(substr)
                    .or_default()
                    .get_mut()
                    .push(i);
            }
        });
    }
}

#[inline]
#[must_use]
pub fn substrings(string: &str, n: usize) -> Vec<String> {
    let graphemes = UnicodeSegmentation::graphemes(string, true).collect::<Vec<&str>>();
    if n == 0 || n > graphemes.len() {
        return Vec::new();
    }

    graphemes.windows(n).map(<[&str]>::concat).collect()
}

/// Word index and grapheme offset of the first word containing `substr`.
/// Users are expected to search starting from the beginning of a word
/// (For instance: "Ad" or "Ph" for "Adobe Photoshop")
#[inline]
fn beginning_distance(substr: &QuerySubstr, name: &Query) -> (usize, usize) {
    let substr_len = substr.graphemes(true).count();

    for (i, word) in name.split_whitespace().enumerate() {
        let word = Query::from(word);
        let word_len = word.grapheme_len();
        if substr_len > word_len {
            continue;
        }

        for j in 0..=(word_len - substr_len) {
            if *substr == word.substring(j, substr_len) {
                return (i, j);
            }
        }
    }

    (usize::MAX, name.grapheme_len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(titles: &[&str]) -> CatalogSearch {
        let catalog = Catalog::from_entries(titles.iter().copied().map(Entry::new));
        CatalogSearch::build(catalog, &Configuration::default(), None)
    }

    fn titles(found: &[Entry]) -> Vec<&str> {
        found.iter().map(|entry| entry.title.as_str()).collect()
    }

    #[test]
    fn test_substrings() {
        assert_eq!(substrings("abc", 0), Vec::<String>::new());
        assert_eq!(substrings("abc", 1), vec!["a", "b", "c"]);
        assert_eq!(substrings("abc", 2), vec!["ab", "bc"]);
        assert_eq!(substrings("abc", 3), vec!["abc"]);
        assert_eq!(substrings("abc", 4), Vec::<String>::new());

        assert_eq!(
            substrings("Firefox", 3),
            vec!["Fir", "ire", "ref", "efo", "fox"]
        );
        assert_eq!(substrings("née", 2), vec!["né", "ée"]);
    }

    #[test]
    fn test_substring_beginning_distance() {
        let name: Query = "Adobe Photoshop".into();
        assert_eq!(beginning_distance(&"Ado".into(), &name), (0, 0));
        assert_eq!(beginning_distance(&"ado".into(), &name), (0, 0));
        assert_eq!(beginning_distance(&"Pho".into(), &name), (1, 0));
        assert_eq!(beginning_distance(&"pho".into(), &name), (1, 0));
        assert_eq!(beginning_distance(&"dob".into(), &name), (0, 1));
        assert_eq!(beginning_distance(&"hot".into(), &name), (1, 1));
        assert_eq!(beginning_distance(&"oto".into(), &name), (1, 2));
        assert_eq!(beginning_distance(&"shop".into(), &name), (1, 5));
        assert_eq!(beginning_distance(&"e p".into(), &name), (usize::MAX, 15));
    }

    #[test]
    fn matches_substrings_case_insensitively() {
        let engine = engine(&["Firefox", "Finder", "Terminal"]);

        assert_eq!(titles(&engine.search(&"FI".into())), vec!["Finder", "Firefox"]);
        assert_eq!(titles(&engine.search(&"min".into())), vec!["Terminal"]);
        assert!(engine.search(&"zzz".into()).is_empty());
        assert!(engine.search(&"".into()).is_empty());
    }

    #[test]
    fn ranks_exact_then_word_starts() {
        let engine = engine(&["Photo Booth", "Adobe Photoshop", "Photo"]);

        assert_eq!(
            titles(&engine.search(&"photo".into())),
            vec!["Photo", "Photo Booth", "Adobe Photoshop"]
        );
    }

    #[test]
    fn truncates_to_max_suggestions() {
        let catalog = Catalog::from_entries((0..20).map(|i| Entry::new(format!("Item {i}"))));
        let config = Configuration {
            max_suggestions: 3,
            ..Configuration::default()
        };
        let engine = CatalogSearch::build(catalog, &config, None);

        assert_eq!(engine.search(&"item".into()).len(), 3);
    }

    #[test]
    fn picked_entry_ranks_first_for_the_typed_queries() {
        let engine = engine(&["Finder", "Firefox"]);

        let _ = engine.search(&"f".into());
        let _ = engine.search(&"fi".into());
        engine
            .after_search(Some(&Entry::new("Firefox")))
            .expect("nothing to persist");

        assert_eq!(engine.learned(&"FI".into()), Some("Firefox".into()));
        assert_eq!(titles(&engine.search(&"fi".into())), vec!["Firefox", "Finder"]);
        assert_eq!(engine.learned(&"fir".into()), None);
    }

    #[test]
    fn history_keeps_only_the_latest_queries() {
        let engine = engine(&["Finder", "Firefox"]);

        for i in 0..=HISTORY_LIMIT {
            let _ = engine.search(&format!("q{i}").into());
        }
        engine
            .after_search(Some(&Entry::new("Firefox")))
            .expect("nothing to persist");

        assert_eq!(engine.learned(&"q0".into()), None);
        assert_eq!(engine.learned(&"q1".into()), Some("Firefox".into()));
        assert_eq!(
            engine.learned(&format!("q{HISTORY_LIMIT}").into()),
            Some("Firefox".into())
        );
    }

    #[test]
    fn session_without_pick_learns_nothing() {
        let engine = engine(&["Finder", "Firefox"]);

        let _ = engine.search(&"fi".into());
        engine.after_search(None).expect("nothing to persist");

        assert_eq!(engine.learned(&"fi".into()), None);
    }

    #[test]
    fn learned_picks_survive_a_rebuild() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.json");
        let catalog = Catalog::from_entries(["Finder", "Firefox"].map(Entry::new));

        let first = CatalogSearch::build(
            catalog.clone(),
            &Configuration::default(),
            Some(FilesystemPersistence::open_at(&path).expect("opens")),
        );
        let _ = first.search(&"fi".into());
        first
            .after_search(Some(&Entry::new("Firefox")))
            .expect("persists");

        let second = CatalogSearch::build(
            catalog,
            &Configuration::default(),
            Some(FilesystemPersistence::open_at(&path).expect("opens")),
        );
        assert_eq!(second.learned(&"fi".into()), Some("Firefox".into()));
    }

    #[tokio::test]
    async fn async_search_matches_blocking_search() {
        let engine = engine(&["Firefox", "Finder"]);

        let found = engine.search_async("fox".to_owned()).await.expect("worker runs");
        assert_eq!(titles(&found), vec!["Firefox"]);
    }
}
