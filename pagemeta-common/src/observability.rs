//! Logging setup for the `pagemeta` binary.
//!
//! Stdout carries the launcher feedback, so events go to a daily rolling
//! file and optionally to `stderr`, never to stdout.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use chrono::Local;
use serde::Deserialize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

const LOG_DIR_ENV: &str = "PAGEMETA_LOG_DIR";
// Set by Alfred for every workflow run.
const ALFRED_DATA_ENV: &str = "alfred_workflow_data";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log file stem and last segment of the fallback directory.
    pub app_name: &'static str,
    pub log_dir: Option<PathBuf>,
    pub emit_stderr: bool,
    pub format: LogFormat,
    /// Directive used when `RUST_LOG` is unset, e.g. `info,http=debug`.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "pagemeta",
            log_dir: None,
            emit_stderr: false,
            format: LogFormat::Text,
            default_filter: "info".to_string(),
        }
    }
}

/// Install the global subscriber: an [`EnvFilter`] (`RUST_LOG` wins over
/// [`LogConfig::default_filter`]) in front of a daily rolling file, plus an
/// optional `stderr` copy in the same format.
///
/// Returns today's log file. Later calls keep the first subscriber and
/// return the same path.
pub fn init_logging(config: LogConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = LOG_PATH.get() {
        return Ok(path.clone());
    }

    let dir = resolve_log_dir(config.app_name, config.log_dir.as_deref());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("cannot create log directory {}", dir.display()))?;

    let file_name = format!("{}.log", config.app_name);
    // the daily appender writes to `<file_name>.<YYYY-MM-DD>`
    let today = dir.join(format!("{file_name}.{}", Local::now().format("%Y-%m-%d")));
    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&dir, &file_name));

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let file_layer = match config.format {
        LogFormat::Text => fmt::layer().with_writer(writer).with_ansi(false).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
    };
    let stderr_layer = config.emit_stderr.then(|| match config.format {
        LogFormat::Text => fmt::layer().with_writer(std::io::stderr).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))?;

    let _ = LOG_GUARD.set(guard);
    let _ = LOG_PATH.set(today.clone());
    Ok(today)
}

/// Explicit directory, `PAGEMETA_LOG_DIR`, Alfred's workflow data folder,
/// then `~/.local/share/<app_name>`.
fn resolve_log_dir(app_name: &str, explicit: Option<&Path>) -> PathBuf {
    let env_dir = |key: &str| std::env::var_os(key).filter(|v| !v.is_empty()).map(PathBuf::from);

    explicit
        .map(Path::to_path_buf)
        .or_else(|| env_dir(LOG_DIR_ENV))
        .map(|dir| expand_home(&dir))
        .or_else(|| env_dir(ALFRED_DATA_ENV).map(|dir| dir.join("logs")))
        .unwrap_or_else(|| match env_dir("HOME") {
            Some(home) => home.join(".local/share").join(app_name),
            None => PathBuf::from(app_name),
        })
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}
