//! Loader for workspace configuration with YAML + environment overlays.
//!
//! Every key is optional: an empty source set yields [`PageMetaConfig::default`].
//! Environment variables prefixed `PAGEMETA__` override file values, with
//! `__` separating nested keys (`PAGEMETA__LOG__FILTER=debug`). String values
//! may reference other variables as `${VAR}`; those are expanded after merge.
use config::{Config, ConfigError, Environment, File};
use pagemeta_common::observability::{LogConfig, LogFormat};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const DEFAULT_MAX_CACHE_AGE_DAYS: u64 = 90;
const SECS_PER_DAY: u64 = 24 * 60 * 60;
// Set by Alfred for every workflow run.
const ALFRED_CACHE_ENV: &str = "alfred_workflow_cache";

#[derive(Debug, Clone, Deserialize)]
pub struct PageMetaConfig {
    #[serde(default)]
    pub version: Option<String>,
    /// Directory holding one JSON file per cached URL.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Validity window of a cached record.
    #[serde(default = "default_max_cache_age_days")]
    pub max_cache_age_days: u64,
    /// Off by default so sites with broken certificates still resolve.
    #[serde(default)]
    pub verify_tls: bool,
    /// Overrides the fetcher's built-in browser identity.
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub dir: Option<PathBuf>,
    pub format: LogFormat,
    pub filter: String,
    pub stderr: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            dir: None,
            format: LogFormat::Text,
            filter: "info".into(),
            stderr: false,
        }
    }
}

impl LogSettings {
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            log_dir: self.dir.clone(),
            emit_stderr: self.stderr,
            format: self.format,
            default_filter: self.filter.clone(),
            ..LogConfig::default()
        }
    }
}

impl Default for PageMetaConfig {
    fn default() -> Self {
        Self {
            version: None,
            cache_dir: None,
            max_cache_age_days: DEFAULT_MAX_CACHE_AGE_DAYS,
            verify_tls: false,
            user_agent: None,
            timeout_secs: None,
            connect_timeout_secs: None,
            log: LogSettings::default(),
        }
    }
}

impl PageMetaConfig {
    pub fn max_cache_age(&self) -> Duration {
        Duration::from_secs(self.max_cache_age_days.saturating_mul(SECS_PER_DAY))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    /// Explicit `cache_dir`, then Alfred's per-workflow cache directory,
    /// then the platform cache directory.
    pub fn resolved_cache_dir(&self) -> PathBuf {
        if let Some(dir) = &self.cache_dir {
            return dir.clone();
        }
        if let Ok(dir) = std::env::var(ALFRED_CACHE_ENV) {
            return PathBuf::from(dir);
        }
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pagemeta")
    }
}

fn default_max_cache_age_days() -> u64 {
    DEFAULT_MAX_CACHE_AGE_DAYS
}

/// Expand `$VAR`/`${VAR}` in every string of the merged tree. Values that
/// themselves contain placeholders are re-expanded up to a fixed depth, so
/// cycles terminate; unknown variables stay as written.
fn expand_placeholders(value: &mut Value) {
    match value {
        Value::String(s) if s.contains('$') => *s = expand_str(s),
        Value::Array(items) => items.iter_mut().for_each(expand_placeholders),
        Value::Object(map) => map.values_mut().for_each(expand_placeholders),
        _ => {}
    }
}

fn expand_str(raw: &str) -> String {
    let mut current = raw.to_string();
    for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
        let next = match shellexpand::env(&current) {
            Ok(expanded) if expanded != current => expanded.into_owned(),
            _ => break,
        };
        current = next;
    }
    current
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct PageMetaConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for PageMetaConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl PageMetaConfigLoader {
    /// Start with no file sources; `PAGEMETA__` env overrides are applied at load.
    ///
    /// ```
    /// use pagemeta_config::PageMetaConfigLoader;
    ///
    /// let config = PageMetaConfigLoader::new()
    ///     .with_yaml_str("version: '1'")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert_eq!(config.max_cache_age_days, 90);
    /// assert!(!config.verify_tls);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; the `config` crate
    /// infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is silently skipped when absent.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use pagemeta_config::PageMetaConfigLoader;
    ///
    /// let cfg = PageMetaConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// verify_tls: true
    /// max_cache_age_days: 7
    /// log:
    ///   format: json
    ///   filter: debug
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert!(cfg.verify_tls);
    /// assert_eq!(cfg.max_cache_age_days, 7);
    /// assert_eq!(cfg.log.filter, "debug");
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    ///
    /// Environment overrides are merged last, then `${VAR}` placeholders are
    /// expanded before the typed structs are built.
    pub fn load(self) -> Result<PageMetaConfig, ConfigError> {
        // Env goes last so it wins over every file source.
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("PAGEMETA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_placeholders(&mut v);

        let typed: PageMetaConfig =
            serde_json::from_value(v).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}
