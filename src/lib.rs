//! Search-as-you-type suggestions.
//!
//! [`debounce::Debouncer`] collapses bursts of query changes into a single
//! search, and [`ui::SearchAdapter`] feeds the settled results to whatever
//! draws the suggestion list.

pub mod catalog;
pub mod debounce;
pub mod fs;
pub mod query;
pub mod ui;

pub use debounce::{CallState, DEFAULT_QUIET_PERIOD, Debouncer, Outcome};

/// Directory name under the platform config and data directories.
pub(crate) const APP_DIR: &str = "suggest";
