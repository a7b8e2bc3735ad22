use anyhow::{Context, Result};
use clap::Parser;
use pagemeta_app::{Feedback, Workflow};
use pagemeta_cache::FileCache;
use pagemeta_common::observability::init_logging;
use pagemeta_config::{PageMetaConfig, PageMetaConfigLoader};
use pagemeta_http::{FetchOptions, PageFetcher};
use std::io::Write;
use std::path::PathBuf;

const DEFAULT_CONFIG_FILE: &str = "pagemeta.yaml";

/// Look up the title, description, preview image and site name of a web page.
#[derive(Debug, Parser)]
#[command(name = "pagemeta", version)]
struct Args {
    /// A web address, `help`, or nothing.
    #[arg(default_value = "", allow_hyphen_values = true)]
    query: String,

    /// YAML config file; without it `pagemeta.yaml` is read when present.
    #[arg(long, env = "PAGEMETA_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Reject invalid or self-signed certificates.
    #[arg(long)]
    verify_tls: bool,

    #[arg(long)]
    max_age_days: Option<u64>,
}

impl Args {
    fn apply(&self, cfg: &mut PageMetaConfig) {
        if let Some(dir) = &self.cache_dir {
            cfg.cache_dir = Some(dir.clone());
        }
        if self.verify_tls {
            cfg.verify_tls = true;
        }
        if let Some(days) = self.max_age_days {
            cfg.max_cache_age_days = days;
        }
    }
}

fn fetch_options(cfg: &PageMetaConfig) -> FetchOptions {
    let mut opts = FetchOptions::default()
        .with_verify_tls(cfg.verify_tls)
        .with_timeout(cfg.timeout())
        .with_connect_timeout(cfg.connect_timeout());
    if let Some(ua) = &cfg.user_agent {
        opts = opts.with_user_agent(ua.clone());
    }
    opts
}

fn load_config(args: &Args) -> Result<PageMetaConfig> {
    // file, then PAGEMETA__* env, then CLI flags
    let loader = match &args.config {
        Some(path) => PageMetaConfigLoader::new().with_file(path),
        None => PageMetaConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
    };
    let mut cfg = loader.load().context("failed to load configuration")?;
    args.apply(&mut cfg);
    Ok(cfg)
}

/// Logging is best effort: without a usable log directory the query is
/// still answered, only the file sink is missing.
fn start_logging(cfg: &PageMetaConfig) -> Option<PathBuf> {
    match init_logging(cfg.log.to_log_config()) {
        Ok(path) => Some(path),
        Err(err) => {
            eprintln!("pagemeta: logging disabled: {err:#}");
            None
        }
    }
}

/// Answer one invocation. Startup faults are rendered as an `error` item so
/// the launcher always has something to show.
async fn run(args: &Args) -> Feedback {
    let cfg = match load_config(args) {
        Ok(cfg) => cfg,
        Err(err) => return Feedback::error(format!("{err:#}")),
    };
    let log_path = start_logging(&cfg);

    let fetcher = match PageFetcher::new(fetch_options(&cfg)) {
        Ok(fetcher) => fetcher,
        Err(err) => {
            tracing::error!(message = %err, "pagemeta.client.build_failed");
            return Feedback::error(err.to_string());
        }
    };

    let store = FileCache::new(cfg.resolved_cache_dir());
    tracing::debug!(
        log_path = ?log_path,
        cache_dir = %store.dir().display(),
        verify_tls = fetcher.options().verify_tls,
        "pagemeta.start"
    );

    Workflow::new(fetcher, store)
        .with_max_age(cfg.max_cache_age())
        .run(&args.query)
        .await
}

fn emit(feedback: &Feedback) -> Result<()> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer(&mut out, feedback).context("failed to write feedback")?;
    writeln!(out)?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let feedback = run(&args).await;
    emit(&feedback)
}
