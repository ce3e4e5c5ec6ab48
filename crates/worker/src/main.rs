use anyhow::Context;
use clap::Parser;
use fundwatch_core::config::{self, Settings};
use fundwatch_core::domain::diff::{compare_snapshots, DiffOptions};
use fundwatch_core::domain::watch::{resolve_monitored, WatchList};
use fundwatch_core::feed;
use fundwatch_core::ingest::provider::{FeedFetcher, HttpFeedFetcher};
use fundwatch_core::report::{render_fund_details, RunSummary};
use fundwatch_core::storage::SnapshotStore;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "fundwatch_worker")]
struct Args {
    /// Watch-list file, one scheme name per line.
    #[arg(long)]
    watch_list: Option<String>,

    /// File holding the last observed snapshot of watched funds.
    #[arg(long)]
    snapshot_file: Option<String>,

    /// Bulk feed URL.
    #[arg(long)]
    feed_url: Option<String>,

    /// Parse an already-downloaded feed file instead of fetching.
    #[arg(long)]
    feed_file: Option<String>,

    /// Highlight threshold, in percent.
    #[arg(long)]
    threshold: Option<f64>,

    /// Do everything except writing the snapshot file.
    #[arg(long)]
    dry_run: bool,

    /// Emit the run summary as JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let result = run(&settings, &args).await;
    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %err, "run failed");
    }
    result
}

async fn run(settings: &Settings, args: &Args) -> anyhow::Result<()> {
    let watch_list_path = resolve_path(
        args.watch_list.as_deref(),
        settings.watch_list_file.as_deref(),
        config::DEFAULT_WATCH_LIST_FILE,
    );
    let snapshot_path = resolve_path(
        args.snapshot_file.as_deref(),
        settings.snapshot_file.as_deref(),
        config::DEFAULT_SNAPSHOT_FILE,
    );
    let threshold = args.threshold.unwrap_or_else(|| settings.highlight_threshold());

    // A missing or empty watch-list fails here, before anything is fetched.
    let watch = WatchList::load(&watch_list_path)?;
    tracing::info!(path = %watch_list_path, funds = watch.names().len(), "loaded watch-list");

    let feed_text = match &args.feed_file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading feed file {path}"))?,
        None => {
            let mut fetch_settings = settings.clone();
            if args.feed_url.is_some() {
                fetch_settings.feed_url = args.feed_url.clone();
            }
            let fetcher = HttpFeedFetcher::from_settings(&fetch_settings)?;
            tracing::info!(source = fetcher.source_name(), url = fetcher.url(), "fetching bulk feed");
            let text = fetcher.fetch_feed().await?;
            write_feed_cache(settings, &text);
            text
        }
    };

    let parsed = feed::parse(&feed_text)?;
    tracing::info!(
        total_rows = parsed.total_rows,
        kept = parsed.records.len(),
        dropped = parsed.dropped_rows,
        "parsed bulk feed"
    );

    let mut warnings = Vec::new();
    if parsed.schema_mismatch {
        tracing::warn!("feed header does not match the expected field layout; parsed best-effort");
        warnings.push("feed schema mismatch: header differs from the expected field layout".to_string());
    }
    anyhow::ensure!(
        !parsed.records.is_empty(),
        "no usable rows in the bulk feed; leaving the previous snapshot untouched"
    );

    let (current, status) = resolve_monitored(&parsed.records, &watch);

    let store = SnapshotStore::new(&snapshot_path);
    let previous = store.load()?;
    if previous.schema_mismatch {
        warnings.push(format!(
            "snapshot schema mismatch in {snapshot_path}: header differs from the expected field layout"
        ));
    }

    let opts = DiffOptions {
        highlight_threshold_pct: threshold,
    };
    let diff = compare_snapshots(&previous.records, &current, &opts)?;

    if diff.update_required {
        if args.dry_run {
            tracing::info!(dry_run = true, "snapshot update required; skipping write");
        } else {
            store.save(&current)?;
            tracing::info!(
                path = %store.path().display(),
                records = current.len(),
                "snapshot updated"
            );
        }
    } else {
        tracing::info!("snapshot unchanged");
    }

    let summary = RunSummary::build(&status, &diff, warnings);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        if diff.first_run && !current.is_empty() {
            print!("{}", render_fund_details(&current));
        }
        print!("{}", summary.render());
    }

    Ok(())
}

fn resolve_path(arg: Option<&str>, env: Option<&str>, default: &str) -> String {
    arg.or(env).unwrap_or(default).to_string()
}

fn write_feed_cache(settings: &Settings, text: &str) {
    let path = settings
        .feed_cache_file
        .clone()
        .unwrap_or_else(|| config::DEFAULT_FEED_CACHE_FILE.to_string());

    // Best-effort local copy of the downloaded feed, for audit and --feed-file.
    match std::fs::write(&path, text) {
        Ok(()) => tracing::info!(path = %path, "saved feed copy"),
        Err(err) => tracing::warn!(path = %path, error = %err, "failed to write feed copy"),
    }
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_arg_beats_env_beats_default() {
        assert_eq!(resolve_path(Some("a"), Some("b"), "c"), "a");
        assert_eq!(resolve_path(None, Some("b"), "c"), "b");
        assert_eq!(resolve_path(None, None, "c"), "c");
    }
}
