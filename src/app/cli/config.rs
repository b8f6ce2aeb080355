//! Run configuration
//!
//! Resolves the final settings from three layers: command line and
//! environment first, then the TOML configuration file, then built-in
//! defaults.

use super::args::Args;
use crate::core::logging::{LogFormat, LogOutput, LogSettings};
use crate::core::validation::{require_setting, validate_http_url};
use crate::directory::client::DirectorySettings;
use crate::discovery::filter::{FilterPolicy, DEFAULT_SIZE_LIMIT_KB};
use crate::discovery::DEFAULT_GHE_CONCURRENCY;
use crate::metrics::MetricsSettings;
use crate::output::{OutputFormat, DEFAULT_OUTPUT_FILE};
use crate::scan::types::{
    ScanConfig, DEFAULT_LAVA_BINARY_PATH, DEFAULT_LAVA_CHECK_IMAGE, DEFAULT_LAVA_CONCURRENCY,
};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const REDACTED: &str = "REDACTED";
const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Invalid or unavailable configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{message}")]
    FileNotFound { message: String },

    #[error("{message}")]
    FileRead { message: String },

    #[error("{message}")]
    FileParse { message: String },

    #[error("{message}")]
    Missing { message: String },

    #[error("{message}")]
    Invalid { message: String },
}

impl ConfigError {
    fn invalid(key: &str, detail: impl std::fmt::Display) -> Self {
        ConfigError::Invalid {
            message: format!("invalid value for '{}': {}", key, detail),
        }
    }

    fn message(&self) -> &str {
        match self {
            ConfigError::FileNotFound { message }
            | ConfigError::FileRead { message }
            | ConfigError::FileParse { message }
            | ConfigError::Missing { message }
            | ConfigError::Invalid { message } => message,
        }
    }
}

impl crate::core::error_handling::ContextualError for ConfigError {
    fn is_user_actionable(&self) -> bool {
        true
    }

    fn user_message(&self) -> Option<&str> {
        Some(self.message())
    }
}

/// Default configuration file location, when a config directory exists
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("Reposec").join("reposec.toml"))
}

/// Load the configuration file
///
/// An explicitly named file must exist. Without one, the default location is
/// used only when present.
pub async fn load_config_file(explicit: Option<&Path>) -> Result<Option<toml::Table>, ConfigError> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::FileNotFound {
                    message: format!(
                        "the specified configuration file does not exist: {}",
                        path.display()
                    ),
                });
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(None),
        },
    };

    let contents =
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ConfigError::FileRead {
                message: format!("error reading configuration file {}: {}", path.display(), e),
            })?;
    let table = toml::from_str::<toml::Table>(&contents).map_err(|e| ConfigError::FileParse {
        message: format!("error parsing configuration file {}: {}", path.display(), e),
    })?;
    Ok(Some(table))
}

/// Fully resolved settings for one run
#[derive(Debug, Clone)]
pub struct Config {
    pub directory: DirectorySettings,
    pub ghe_concurrency: i64,
    pub filter: FilterPolicy,
    pub scan: ScanConfig,
    pub target_org: Option<String>,
    pub output_file: PathBuf,
    pub output_format: OutputFormat,
    pub logging: LogSettings,
    pub metrics: MetricsSettings,
}

impl Config {
    /// Merge arguments over the file table over defaults, then validate
    pub fn resolve(args: Args, file: Option<&toml::Table>) -> Result<Self, ConfigError> {
        let empty = toml::Table::new();
        let file = FileValues(file.unwrap_or(&empty));

        let token = args.ghe_token.or(file.string("ghe-token")?);
        let token = require_setting(token.as_deref(), "GitHub Enterprise token (REPOSEC_GHE_TOKEN)")
            .map_err(|message| ConfigError::Missing { message })?
            .to_string();

        let base_url = args.ghe_base_url.or(file.string("ghe-base-url")?);
        let base_url =
            require_setting(base_url.as_deref(), "GitHub Enterprise base URL (REPOSEC_GHE_BASE_URL)")
                .map_err(|message| ConfigError::Missing { message })?
                .to_string();
        validate_http_url(&base_url).map_err(|e| ConfigError::invalid("ghe-base-url", e))?;

        let filter = FilterPolicy {
            size_limit_kb: match args.repository_size_limit {
                Some(limit) => limit,
                None => file
                    .unsigned("repository-size-limit")?
                    .unwrap_or(DEFAULT_SIZE_LIMIT_KB),
            },
            include_archived: flag(args.include_archived, &file, "include-archived")?,
            include_empty: flag(args.include_empty, &file, "include-empty")?,
            include_forks: flag(args.include_forks, &file, "include-forks")?,
            include_templates: flag(args.include_templates, &file, "include-templates")?,
            include_disabled: flag(args.include_disabled, &file, "include-disabled")?,
            min_last_activity_days: args
                .min_last_activity_days
                .or(file.integer("min-last-activity-days")?)
                .unwrap_or(0),
        };

        let results_path = args
            .lava_results_path
            .or(file.string("lava-results-path")?.map(PathBuf::from))
            .filter(|p| !p.as_os_str().is_empty());

        let scan = ScanConfig {
            endpoint: base_url.clone(),
            token: token.clone(),
            concurrency: args
                .lava_concurrency
                .or(file.integer("lava-concurrency")?)
                .unwrap_or(DEFAULT_LAVA_CONCURRENCY),
            binary_path: args
                .lava_binary_path
                .or(file.string("lava-binary-path")?)
                .unwrap_or_else(|| DEFAULT_LAVA_BINARY_PATH.to_string()),
            check_image: args
                .lava_check_image
                .or(file.string("lava-check-image")?)
                .unwrap_or_else(|| DEFAULT_LAVA_CHECK_IMAGE.to_string()),
            results_path,
        };

        let target_org = args
            .target_org
            .or(file.string("target-org")?)
            .map(|org| org.trim().to_string())
            .filter(|org| !org.is_empty());

        let output_file = args
            .output_file
            .or(file.string("output-file")?.map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_FILE));
        if output_file.as_os_str().is_empty() {
            return Err(ConfigError::Missing {
                message: "output file is required and was not provided".to_string(),
            });
        }
        let output_format = args
            .output_format
            .or(file.string("output-format")?)
            .unwrap_or_else(|| OutputFormat::default().to_string());
        let output_format = OutputFormat::parse(&output_format)
            .map_err(|e| ConfigError::invalid("output-format", e))?;

        let logging = resolve_logging(
            args.log_level,
            args.log_format,
            args.log_output,
            args.log_file,
            args.color,
            &file,
        )?;

        let metrics_defaults = MetricsSettings::default();
        let metrics = MetricsSettings {
            enabled: flag(args.metrics_enabled, &file, "metrics-enabled")?,
            namespace: args
                .metrics_namespace
                .or(file.string("metrics-namespace")?)
                .unwrap_or(metrics_defaults.namespace),
            tags: if args.metrics_tags.is_empty() {
                file.strings("metrics-tags")?.unwrap_or_default()
            } else {
                args.metrics_tags
            },
            address: args
                .metrics_address
                .or(file.string("metrics-address")?)
                .unwrap_or(metrics_defaults.address),
        };

        Ok(Self {
            directory: DirectorySettings { base_url, token },
            ghe_concurrency: args
                .ghe_concurrency
                .or(file.integer("ghe-concurrency")?)
                .unwrap_or(DEFAULT_GHE_CONCURRENCY),
            filter,
            scan,
            target_org,
            output_file,
            output_format,
            logging,
            metrics,
        })
    }

    /// Copy safe to log: every credential replaced
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.directory.token = REDACTED.to_string();
        copy.scan.token = REDACTED.to_string();
        copy
    }
}

fn flag(cli: Option<bool>, file: &FileValues<'_>, key: &str) -> Result<bool, ConfigError> {
    Ok(match cli {
        Some(value) => value,
        None => file.boolean(key)?.unwrap_or(false),
    })
}

fn resolve_logging(
    level: Option<String>,
    format: Option<String>,
    output: Option<String>,
    log_file: Option<PathBuf>,
    color: Option<bool>,
    file: &FileValues<'_>,
) -> Result<LogSettings, ConfigError> {
    let level = level
        .or(file.string("log-level")?)
        .unwrap_or_else(|| "info".to_string())
        .to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        return Err(ConfigError::invalid("log-level", &level));
    }

    let format = match format.or(file.string("log-format")?) {
        Some(f) => LogFormat::from_str(&f).map_err(|_| ConfigError::invalid("log-format", &f))?,
        None => LogFormat::Text,
    };
    let output = match output.or(file.string("log-output")?) {
        Some(o) => LogOutput::from_str(&o).map_err(|_| ConfigError::invalid("log-output", &o))?,
        None => LogOutput::Stdout,
    };

    // Magic values "none" and "-" disable file logging.
    let log_file = log_file
        .or(file.string("log-file")?.map(PathBuf::from))
        .filter(|p| {
            let s = p.to_string_lossy();
            !(s.is_empty() || s.eq_ignore_ascii_case("none") || s == "-")
        });

    let color = match color.or(file.boolean("color")?) {
        Some(color) => color,
        None => {
            log_file.is_none()
                && match output {
                    LogOutput::Stdout => std::io::stdout().is_terminal(),
                    LogOutput::Stderr => std::io::stderr().is_terminal(),
                }
        }
    };

    Ok(LogSettings {
        level,
        format,
        output,
        file: log_file,
        color,
    })
}

/// Typed accessors over the configuration file table
struct FileValues<'a>(&'a toml::Table);

impl FileValues<'_> {
    fn string(&self, key: &str) -> Result<Option<String>, ConfigError> {
        match self.0.get(key) {
            None => Ok(None),
            Some(toml::Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(ConfigError::invalid(key, format!("expected a string, found {}", other.type_str()))),
        }
    }

    fn integer(&self, key: &str) -> Result<Option<i64>, ConfigError> {
        match self.0.get(key) {
            None => Ok(None),
            Some(toml::Value::Integer(i)) => Ok(Some(*i)),
            Some(other) => Err(ConfigError::invalid(key, format!("expected an integer, found {}", other.type_str()))),
        }
    }

    fn unsigned(&self, key: &str) -> Result<Option<u64>, ConfigError> {
        match self.integer(key)? {
            None => Ok(None),
            Some(i) => u64::try_from(i)
                .map(Some)
                .map_err(|_| ConfigError::invalid(key, "must not be negative")),
        }
    }

    fn boolean(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        match self.0.get(key) {
            None => Ok(None),
            Some(toml::Value::Boolean(b)) => Ok(Some(*b)),
            Some(other) => Err(ConfigError::invalid(key, format!("expected a boolean, found {}", other.type_str()))),
        }
    }

    /// A single string (comma separated) or an array of strings
    fn strings(&self, key: &str) -> Result<Option<Vec<String>>, ConfigError> {
        let split = |s: &str| -> Vec<String> {
            s.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        };
        match self.0.get(key) {
            None => Ok(None),
            Some(toml::Value::String(s)) => Ok(Some(split(s))),
            Some(toml::Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(split)
                        .ok_or_else(|| ConfigError::invalid(key, "expected an array of strings"))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(|nested| Some(nested.into_iter().flatten().collect())),
            Some(other) => Err(ConfigError::invalid(key, format!("expected a string or array, found {}", other.type_str()))),
        }
    }
}
