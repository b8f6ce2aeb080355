//! Command line arguments
//!
//! Every setting is optional here so that a value given on the command line
//! (or through its `REPOSEC_*` environment variable) can be told apart from
//! one that should come from the configuration file or the default.

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "reposec")]
#[command(about = "Scan GitHub Enterprise repositories for security controls")]
#[command(version, long_version = crate::core::version::long_version())]
#[command(after_help = "Every option can also be set through the REPOSEC_* variable shown next to it.")]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config-file", value_name = "FILE", env = "REPOSEC_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// GitHub Enterprise access token
    #[arg(
        long = "ghe-token",
        value_name = "TOKEN",
        env = "REPOSEC_GHE_TOKEN",
        hide_env_values = true
    )]
    pub ghe_token: Option<String>,

    /// GitHub Enterprise base URL (the API lives under /api/v3/)
    #[arg(long = "ghe-base-url", value_name = "URL", env = "REPOSEC_GHE_BASE_URL")]
    pub ghe_base_url: Option<String>,

    /// Simultaneous organization listings (values below 1 mean 1)
    #[arg(
        long = "ghe-concurrency",
        value_name = "COUNT",
        env = "REPOSEC_GHE_CONCURRENCY",
        allow_negative_numbers = true
    )]
    pub ghe_concurrency: Option<i64>,

    /// Largest repository to scan, in KB
    #[arg(
        long = "repository-size-limit",
        value_name = "KB",
        env = "REPOSEC_GHE_REPOSITORY_SIZE_LIMIT"
    )]
    pub repository_size_limit: Option<u64>,

    /// Scan archived repositories
    #[arg(long = "include-archived", env = "REPOSEC_GHE_INCLUDE_ARCHIVED",
          value_name = "BOOL", num_args = 0..=1, default_missing_value = "true",
          value_parser = BoolishValueParser::new())]
    pub include_archived: Option<bool>,

    /// Scan empty repositories
    #[arg(long = "include-empty", env = "REPOSEC_GHE_INCLUDE_EMPTY",
          value_name = "BOOL", num_args = 0..=1, default_missing_value = "true",
          value_parser = BoolishValueParser::new())]
    pub include_empty: Option<bool>,

    /// Scan forks
    #[arg(long = "include-forks", env = "REPOSEC_GHE_INCLUDE_FORKS",
          value_name = "BOOL", num_args = 0..=1, default_missing_value = "true",
          value_parser = BoolishValueParser::new())]
    pub include_forks: Option<bool>,

    /// Scan template repositories
    #[arg(long = "include-templates", env = "REPOSEC_GHE_INCLUDE_TEMPLATES",
          value_name = "BOOL", num_args = 0..=1, default_missing_value = "true",
          value_parser = BoolishValueParser::new())]
    pub include_templates: Option<bool>,

    /// Scan disabled repositories
    #[arg(long = "include-disabled", env = "REPOSEC_GHE_INCLUDE_DISABLED",
          value_name = "BOOL", num_args = 0..=1, default_missing_value = "true",
          value_parser = BoolishValueParser::new())]
    pub include_disabled: Option<bool>,

    /// Skip repositories with no update and no push in this many days (0 disables)
    #[arg(
        long = "min-last-activity-days",
        value_name = "DAYS",
        env = "REPOSEC_GHE_MIN_LAST_ACTIVITY_DAYS",
        allow_negative_numbers = true
    )]
    pub min_last_activity_days: Option<i64>,

    /// Simultaneous scanner processes (values below 1 mean 1)
    #[arg(
        long = "lava-concurrency",
        value_name = "COUNT",
        env = "REPOSEC_LAVA_CONCURRENCY",
        allow_negative_numbers = true
    )]
    pub lava_concurrency: Option<i64>,

    /// Lava binary, as a path or a name looked up on PATH
    #[arg(long = "lava-binary-path", value_name = "PATH", env = "REPOSEC_LAVA_BINARY_PATH")]
    pub lava_binary_path: Option<String>,

    /// Compliance check image run by Lava
    #[arg(long = "lava-check-image", value_name = "IMAGE", env = "REPOSEC_LAVA_CHECK_IMAGE")]
    pub lava_check_image: Option<String>,

    /// Directory receiving raw scanner output per repository
    #[arg(long = "lava-results-path", value_name = "DIR", env = "REPOSEC_LAVA_RESULTS_PATH")]
    pub lava_results_path: Option<PathBuf>,

    /// Only scan this organization
    #[arg(short = 't', long = "target-org", value_name = "ORG", env = "REPOSEC_TARGET_ORG")]
    pub target_org: Option<String>,

    /// Output file
    #[arg(short = 'o', long = "output-file", value_name = "FILE", env = "REPOSEC_OUTPUT_FILE")]
    pub output_file: Option<PathBuf>,

    /// Output format
    #[arg(long = "output-format", value_name = "FORMAT", env = "REPOSEC_OUTPUT_FORMAT")]
    pub output_format: Option<String>,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", env = "REPOSEC_LOG_LEVEL",
          value_parser = ["trace", "debug", "info", "warn", "error", "off"], ignore_case = true)]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long = "log-format", value_name = "FORMAT", env = "REPOSEC_LOG_OUTPUT_FORMAT",
          value_parser = ["text", "ext", "json"], ignore_case = true)]
    pub log_format: Option<String>,

    /// Log stream when no log file is set
    #[arg(long = "log-output", value_name = "STREAM", env = "REPOSEC_LOG_OUTPUT",
          value_parser = ["stdout", "stderr"], ignore_case = true)]
    pub log_output: Option<String>,

    /// Log file path (use 'none' to disable file logging)
    #[arg(long = "log-file", value_name = "FILE", env = "REPOSEC_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Colored log output (defaults to on when the log stream is a terminal)
    #[arg(long = "color", env = "REPOSEC_COLOR", value_name = "BOOL", num_args = 0..=1,
          default_missing_value = "true", value_parser = BoolishValueParser::new())]
    pub color: Option<bool>,

    /// Report run metrics
    #[arg(long = "metrics-enabled", env = "REPOSEC_METRICS_ENABLED",
          value_name = "BOOL", num_args = 0..=1, default_missing_value = "true",
          value_parser = BoolishValueParser::new())]
    pub metrics_enabled: Option<bool>,

    /// Metric name prefix
    #[arg(long = "metrics-namespace", value_name = "NAME", env = "REPOSEC_METRICS_NAMESPACE")]
    pub metrics_namespace: Option<String>,

    /// StatsD agent address (host:port)
    #[arg(long = "metrics-address", value_name = "ADDR", env = "REPOSEC_METRICS_ADDRESS")]
    pub metrics_address: Option<String>,

    /// Tags added to every metric (key:value, comma separated)
    #[arg(long = "metrics-tags", value_name = "TAGS", env = "REPOSEC_METRICS_TAGS",
          value_delimiter = ',', action = ArgAction::Append)]
    pub metrics_tags: Vec<String>,
}

impl Args {
    /// Parse the process arguments and environment
    pub fn from_env() -> Self {
        Self::parse()
    }
}
