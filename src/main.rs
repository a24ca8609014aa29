use std::path::PathBuf;

use clap::Parser;
use rootcause::Report;
use suggest::{
    catalog::{Catalog, CatalogSearch, Entry},
    fs::{config::Configuration, db::FilesystemPersistence},
    ui::{Presenter, SearchAdapter, terminal::TerminalView},
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    task::JoinSet,
};

/// Suggests catalog entries while you type.
///
/// Every line read from stdin replaces the query. `:<n>` picks suggestion
/// `n`, `:q` quits.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// JSON array of `{"title", "subtitle"?, "thumbnail"?}` entries
    #[arg(long)]
    catalog: PathBuf,

    /// Configuration file, instead of the one in the platform config directory
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the configured quiet period
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Neither load nor save learned picks
    #[arg(long)]
    no_persist: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Report> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Configuration::from_path(path)?,
        None => Configuration::load()?,
    };
    if let Some(debounce_ms) = cli.debounce_ms {
        config.debounce_ms = debounce_ms;
    }

    let persistence = if config.remember_selections && !cli.no_persist {
        Some(FilesystemPersistence::open()?)
    } else {
        None
    };
    let catalog = Catalog::from_json_file(&cli.catalog)?;
    let engine = CatalogSearch::build(catalog, &config, persistence);

    let search = {
        let engine = engine.clone();
        move |query: String| {
            let engine = engine.clone();
            async move { engine.search_async(query).await }
        }
    };
    let on_select = {
        let engine = engine.clone();
        move |entry: &Entry| {
            if let Err(err) = engine.after_search(Some(entry)) {
                tracing::warn!(error = %err, "could not save pick");
            }
        }
    };

    let adapter = SearchAdapter::new(
        config.debounce(),
        search,
        Presenter::entries(),
        on_select,
        TerminalView::new(std::io::stdout(), config.hint_text.clone()),
    );

    let mut in_flight = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();

        if line == ":q" {
            adapter.dispose();
            break;
        }

        if let Some(pick) = line.strip_prefix(':') {
            let picked = pick
                .parse::<usize>()
                .map_err(Report::from)
                .and_then(|index| adapter.select(index));
            if let Err(err) = picked {
                tracing::warn!(error = %err, command = line, "ignoring command");
            }
            continue;
        }

        adapter.with_view(|view| view.set_query(line));
        in_flight.spawn(adapter.query_changed());
    }

    // Let the last query settle before leaving.
    while let Some(update) = in_flight.join_next().await {
        tracing::trace!(?update, "query settled");
    }

    adapter.dispose();
    engine.after_search(None)?;

    Ok(())
}
