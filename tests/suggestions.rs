use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use suggest::{
    catalog::{Catalog, CatalogSearch, Entry},
    fs::config::Configuration,
    query::Query,
    ui::{Presenter, QueryUpdate, SearchAdapter, terminal::TerminalView},
};
use tokio::time;

const CATALOG: &str = r#"[
    {"title": "Firefox", "subtitle": "Web browser"},
    {"title": "Finder", "subtitle": "File manager"},
    {"title": "Terminal"}
]"#;

#[tokio::test(start_paused = true)]
async fn typing_burst_suggests_for_the_final_query() {
    let config = Configuration::default();
    let catalog = Catalog::from_json_str(CATALOG).expect("valid catalog");
    let engine = CatalogSearch::build(catalog, &config, None);
    let picked: Arc<Mutex<Option<Entry>>> = Arc::default();

    let search = {
        let engine = engine.clone();
        move |query: String| {
            let engine = engine.clone();
            async move { engine.search_async(query).await }
        }
    };
    let on_select = {
        let engine = engine.clone();
        let picked = Arc::clone(&picked);
        move |entry: &Entry| {
            engine.after_search(Some(entry)).expect("nothing to persist");
            *picked.lock() = Some(entry.clone());
        }
    };

    let adapter = SearchAdapter::new(
        config.debounce(),
        search,
        Presenter::entries(),
        on_select,
        TerminalView::new(Vec::<u8>::new(), config.hint_text.clone()),
    );

    let mut updates = Vec::new();
    for text in ["f", "fi", "fir"] {
        adapter.with_view(|view| view.set_query(text));
        updates.push(tokio::spawn(adapter.query_changed()));
        time::sleep(Duration::from_millis(50)).await;
    }

    let mut settled = Vec::new();
    for update in updates {
        settled.push(update.await.expect("task joins"));
    }
    assert_eq!(
        settled,
        vec![
            QueryUpdate::Cancelled,
            QueryUpdate::Cancelled,
            QueryUpdate::Rendered(1)
        ]
    );

    adapter.select(0).expect("one suggestion rendered");
    assert_eq!(
        picked.lock().as_ref().map(|entry| entry.title.as_str().to_owned()),
        Some("Firefox".to_owned())
    );
    assert!(!adapter.with_view(|view| view.is_open()));

    // Queries cancelled before their search started don't learn the pick.
    assert_eq!(engine.learned(&Query::from("FIR")), Some(Query::from("Firefox")));
    assert_eq!(engine.learned(&Query::from("fi")), None);
}

#[tokio::test(start_paused = true)]
async fn empty_then_unknown_query() {
    let config = Configuration::default();
    let engine = CatalogSearch::build(
        Catalog::from_json_str(CATALOG).expect("valid catalog"),
        &config,
        None,
    );

    let adapter = SearchAdapter::new(
        config.debounce(),
        move |query: String| {
            let engine = engine.clone();
            async move { engine.search_async(query).await }
        },
        Presenter::entries(),
        |_: &Entry| {},
        TerminalView::new(Vec::<u8>::new(), "Search"),
    );

    assert_eq!(adapter.query_changed().await, QueryUpdate::Empty);

    adapter.with_view(|view| view.set_query("zzz"));
    assert_eq!(adapter.query_changed().await, QueryUpdate::Rendered(0));
    assert!(adapter.select(0).is_err());
}

#[tokio::test(start_paused = true)]
async fn query_typed_over_a_running_search_still_learns_the_pick() {
    let config = Configuration::default();
    let engine = CatalogSearch::build(
        Catalog::from_json_str(CATALOG).expect("valid catalog"),
        &config,
        None,
    );

    let search = {
        let engine = engine.clone();
        move |query: String| {
            let engine = engine.clone();
            async move {
                time::sleep(Duration::from_millis(300)).await;
                engine.search_async(query).await
            }
        }
    };
    let on_select = {
        let engine = engine.clone();
        move |entry: &Entry| engine.after_search(Some(entry)).expect("nothing to persist")
    };

    let adapter = SearchAdapter::new(
        config.debounce(),
        search,
        Presenter::entries(),
        on_select,
        TerminalView::new(Vec::<u8>::new(), "Search"),
    );

    adapter.with_view(|view| view.set_query("f"));
    let running = tokio::spawn(adapter.query_changed());
    time::sleep(Duration::from_millis(600)).await;

    adapter.with_view(|view| view.set_query("fi"));
    let latest = tokio::spawn(adapter.query_changed());

    assert_eq!(running.await.expect("task joins"), QueryUpdate::Cancelled);
    assert_eq!(latest.await.expect("task joins"), QueryUpdate::Rendered(2));

    adapter.select(0).expect("two suggestions rendered");
    assert_eq!(engine.learned(&Query::from("fi")), Some(Query::from("Finder")));
    assert_eq!(engine.learned(&Query::from("f")), Some(Query::from("Finder")));
}
