//! Loader for `nlm` configuration with YAML + environment overlays.
//!
//! Sources are merged in order: config file(s), inline YAML, then `NLM_`-prefixed
//! environment variables (`NLM_SERVICE__TIMEOUT_SECS=30`). String values may
//! reference other environment variables as `${VAR}`; these are expanded after
//! merging. Every section has defaults, so an empty document is valid.
use config::{Config, ConfigError, Environment, File};
use nlm_common::OutputFormat;
use nlm_common::observability::{LogConfig, LogFormat};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

pub const DEFAULT_BASE_URL: &str = "https://notebooklm.google.com/";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct NlmConfig {
    pub version: Option<String>,
    pub service: ServiceConfig,
    pub profile: ProfileConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Endpoints and transport limits for the notebook service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    /// Path (relative to `base_url`) of the artifact listing endpoint.
    pub list_path: String,
    /// Query parameter carrying the notebook id on the listing endpoint.
    pub notebook_param: String,
    pub user_agent: String,
    pub referer: String,
    pub timeout_secs: u64,
    pub max_redirects: usize,
    pub retries: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            list_path: "api/artifacts".into(),
            notebook_param: "notebook_id".into(),
            user_agent: DEFAULT_USER_AGENT.into(),
            referer: DEFAULT_BASE_URL.into(),
            timeout_secs: 120,
            max_redirects: 20,
            retries: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProfileConfig {
    /// Location of the saved browser profile (cookies, CSRF token, session id).
    pub path: Option<String>,
}

impl ProfileConfig {
    /// Resolved profile path: the configured one (with `~` expanded) or
    /// `~/.nlm/profile.json`.
    pub fn resolved_path(&self) -> PathBuf {
        match &self.path {
            Some(p) => PathBuf::from(shellexpand::tilde(p).into_owned()),
            None => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".nlm")
                .join("profile.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub stderr: bool,
    pub filter: String,
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            stderr: false,
            filter: "info".into(),
            dir: None,
        }
    }
}

impl LoggingConfig {
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

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => break,
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (YAML + env overrides).
pub struct NlmConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    files: Vec<PathBuf>,
    inline: Vec<String>,
}

impl Default for NlmConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl NlmConfigLoader {
    /// Start with defaults only; sources are attached by the `with_*` methods.
    ///
    /// ```
    /// use nlm_config::NlmConfigLoader;
    ///
    /// let cfg = NlmConfigLoader::new()
    ///     .with_yaml_str("version: '1'")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(cfg.version.as_deref(), Some("1"));
    /// assert_eq!(cfg.service.max_redirects, 20);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            files: Vec::new(),
            inline: Vec::new(),
        }
    }

    /// Attach a required file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push(path.as_ref().to_path_buf());
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is silently skipped when missing.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet (tests, CLI overrides).
    ///
    /// ```
    /// use nlm_common::OutputFormat;
    /// use nlm_config::NlmConfigLoader;
    ///
    /// let cfg = NlmConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// service:
    ///   timeout_secs: 30
    /// output:
    ///   format: json
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.service.timeout_secs, 30);
    /// assert_eq!(cfg.service.retries, 2);
    /// assert_eq!(cfg.output.format, OutputFormat::Json);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.inline.push(yaml.to_string());
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources.
    pub fn load(self) -> Result<NlmConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("NLM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| {
            ConfigError::Message(format!(
                "{e} (files: {:?}, inline snippets: {})",
                self.files,
                self.inline.len()
            ))
        })
    }
}
