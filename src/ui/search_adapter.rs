use std::{
    fmt::Display,
    future::Future,
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;
use rootcause::{Report, report};

use crate::{
    debounce::{Debouncer, Outcome},
    ui::{Presenter, SuggestionView},
};

/// What a query change ended up doing to the suggestion list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryUpdate {
    /// The query was empty, the list was cleared without searching.
    Empty,
    /// This many suggestions were rendered.
    Rendered(usize),
    /// A newer query (or teardown) got there first. The list was left alone.
    Cancelled,
    /// The search failed and the list was cleared.
    Failed(String),
}

/// Wires a debounced search function to a [`SuggestionView`].
///
/// Cheap to clone. Once every handle is dropped (or [`Self::dispose`] is
/// called), no pending search renders anything anymore.
pub struct SearchAdapter<T, V, F> {
    shared: Arc<Shared<T, V, F>>,
}

struct Shared<T, V, F> {
    debouncer: Debouncer<String, F>,
    presenter: Presenter<T>,
    on_select: Box<dyn Fn(&T) + Send + Sync>,
    view: Mutex<V>,
    /// Items behind the rows currently rendered.
    results: Mutex<Arc<[T]>>,
    is_open: AtomicBool,
}

impl<T, V, F> Clone for SearchAdapter<T, V, F> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, V, F> SearchAdapter<T, V, F>
where
    V: SuggestionView,
{
    pub fn new(
        quiet_period: Duration,
        search: F,
        presenter: Presenter<T>,
        on_select: impl Fn(&T) + Send + Sync + 'static,
        view: V,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                debouncer: Debouncer::new(quiet_period, search),
                presenter,
                on_select: Box::new(on_select),
                view: Mutex::new(view),
                results: Mutex::new(Arc::from(Vec::new())),
                is_open: AtomicBool::new(false),
            }),
        }
    }

    pub fn with_view<R>(&self, f: impl FnOnce(&mut V) -> R) -> R {
        f(&mut self.shared.view.lock())
    }

    pub fn open(&self) {
        self.shared.open_view();
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.shared.is_open.load(Ordering::Acquire)
    }

    /// Hands the item behind row `index` to the selection callback, then
    /// closes the view with the current query text.
    ///
    /// # Errors
    ///
    /// No row `index` is currently rendered.
    pub fn select(&self, index: usize) -> Result<(), Report> {
        // The callback may re-enter the adapter, so it runs unlocked.
        let results = self.shared.results.lock().clone();
        let item = results
            .get(index)
            .ok_or_else(|| report!("no suggestion at index {index}"))?;

        (self.shared.on_select)(item);

        self.shared.debouncer.cancel();
        self.shared.close_view();

        Ok(())
    }

    /// Cancels the pending search, if any, and ignores every later query change.
    pub fn dispose(&self) {
        self.shared.debouncer.dispose();
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.shared.debouncer.is_disposed()
    }
}

impl<T, V, F, Fut, E> SearchAdapter<T, V, F>
where
    T: Send + Sync + 'static,
    V: SuggestionView,
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<T>, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    /// Reacts to the query text having changed.
    ///
    /// An empty query clears the list right away. Anything else is searched
    /// once the quiet period is over, unless another change comes first.
    pub fn query_changed(
        &self,
    ) -> impl Future<Output = QueryUpdate> + Send + use<T, V, F, Fut, E> {
        let shared = &self.shared;
        let query = shared.view.lock().query_text();

        let pending = if shared.debouncer.is_disposed() {
            Err(QueryUpdate::Cancelled)
        } else if query.is_empty() {
            shared.debouncer.cancel();
            shared.show(Vec::new());
            Err(QueryUpdate::Empty)
        } else {
            shared.open_view();
            Ok(shared.debouncer.schedule(query.clone()))
        };

        let shared: Weak<Shared<T, V, F>> = Arc::downgrade(shared);

        async move {
            let pending = match pending {
                Ok(pending) => pending,
                Err(update) => return update,
            };

            let outcome = pending.await;
            let Some(shared) = shared.upgrade() else {
                return QueryUpdate::Cancelled;
            };

            match outcome {
                Outcome::Cancelled => {
                    tracing::trace!(%query, "query superseded");
                    QueryUpdate::Cancelled
                }
                _ if shared.debouncer.is_disposed() => QueryUpdate::Cancelled,
                Outcome::Fired(Ok(items)) => {
                    let count = shared.show(items);
                    tracing::debug!(%query, suggestions = count, "rendered suggestions");
                    QueryUpdate::Rendered(count)
                }
                Outcome::Fired(Err(err)) => {
                    tracing::warn!(%query, error = %err, "search failed, showing no suggestions");
                    shared.show(Vec::new());
                    QueryUpdate::Failed(err.to_string())
                }
            }
        }
    }
}

impl<T, V, F> Shared<T, V, F>
where
    V: SuggestionView,
{
    fn show(&self, items: Vec<T>) -> usize {
        let entries = items
            .iter()
            .enumerate()
            .map(|(i, item)| self.presenter.present(i, item))
            .collect::<Vec<_>>();
        let count = entries.len();

        *self.results.lock() = items.into();
        self.view.lock().render(entries);

        count
    }

    fn open_view(&self) {
        if !self.is_open.swap(true, Ordering::AcqRel) {
            self.view.lock().open();
        }
    }

    fn close_view(&self) {
        self.is_open.store(false, Ordering::Release);

        let mut view = self.view.lock();
        let final_text = view.query_text();
        view.close(&final_text);
    }
}
