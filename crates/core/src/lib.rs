pub mod domain;
pub mod feed;
pub mod ingest;
pub mod report;
pub mod storage;

pub mod config {
    use anyhow::Context;

    pub const DEFAULT_FEED_URL: &str = "https://www.amfiindia.com/spages/NAVAll.txt";
    pub const DEFAULT_WATCH_LIST_FILE: &str = "funds_to_monitor.txt";
    pub const DEFAULT_SNAPSHOT_FILE: &str = "last_tracked_details.txt";
    pub const DEFAULT_FEED_CACHE_FILE: &str = "mutual_funds.txt";
    pub const DEFAULT_HIGHLIGHT_THRESHOLD_PCT: f64 = 3.0;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub feed_url: Option<String>,
        pub watch_list_file: Option<String>,
        pub snapshot_file: Option<String>,
        pub feed_cache_file: Option<String>,
        pub highlight_threshold_pct: Option<f64>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let highlight_threshold_pct = match std::env::var("HIGHLIGHT_THRESHOLD_PCT") {
                Ok(s) => Some(
                    s.parse::<f64>()
                        .with_context(|| format!("HIGHLIGHT_THRESHOLD_PCT is not a number: {s}"))?,
                ),
                Err(_) => None,
            };

            Ok(Self {
                feed_url: std::env::var("FEED_URL").ok(),
                watch_list_file: std::env::var("WATCH_LIST_FILE").ok(),
                snapshot_file: std::env::var("SNAPSHOT_FILE").ok(),
                feed_cache_file: std::env::var("FEED_CACHE_FILE").ok(),
                highlight_threshold_pct,
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }

        pub fn highlight_threshold(&self) -> f64 {
            self.highlight_threshold_pct
                .unwrap_or(DEFAULT_HIGHLIGHT_THRESHOLD_PCT)
        }
    }
}
