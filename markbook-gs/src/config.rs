//! markbook-gs specific configuration
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (clap)
//! 2. Environment variable (`MARKBOOK_*`, also via clap)
//! 3. TOML config file (`--config` path or the platform config dir)
//! 4. Compiled default

use clap::Parser;
use markbook_common::config::{
    get_bool, get_integer, get_string, locate_config_file, read_config_file,
};
use markbook_common::Result;
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5750;
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GRADING_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_FAST_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_ROSTER_BASE_URL: &str = "https://vhub.vus.edu.vn/ords/connect/exams";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MIN_REQUEST_INTERVAL_MS: u64 = 250;

/// Command-line arguments for markbook-gs
#[derive(Parser, Debug, Default)]
#[command(name = "markbook-gs")]
#[command(about = "Grading Service for Markbook")]
#[command(version)]
pub struct Args {
    /// Host to bind
    #[arg(long, env = "MARKBOOK_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "MARKBOOK_PORT")]
    pub port: Option<u16>,

    /// Model API key
    #[arg(long, env = "MARKBOOK_API_KEY")]
    pub api_key: Option<String>,

    /// Model API base URL
    #[arg(long, env = "MARKBOOK_API_BASE_URL")]
    pub api_base_url: Option<String>,

    /// Model used for grading
    #[arg(long, env = "MARKBOOK_GRADING_MODEL")]
    pub grading_model: Option<String>,

    /// Model used for exam-code identification and key extraction
    #[arg(long, env = "MARKBOOK_FAST_MODEL")]
    pub fast_model: Option<String>,

    /// Roster directory base URL
    #[arg(long, env = "MARKBOOK_ROSTER_BASE_URL")]
    pub roster_base_url: Option<String>,

    /// Outbound request timeout (seconds)
    #[arg(long, env = "MARKBOOK_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Minimum interval between model requests (milliseconds)
    #[arg(long, env = "MARKBOOK_MIN_REQUEST_INTERVAL_MS")]
    pub min_request_interval_ms: Option<u64>,

    /// Seed demo answer keys, courses and students at startup
    #[arg(long, env = "MARKBOOK_SEED_DEMO_DATA")]
    pub seed_demo_data: Option<bool>,

    /// Explicit config file path
    #[arg(long, env = "MARKBOOK_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Grading Service configuration
#[derive(Debug, Clone)]
pub struct GradingConfig {
    pub host: String,
    pub port: u16,

    /// Model API key; may be empty, in which case grading attempts fail
    /// at call time with a service error
    pub api_key: String,

    pub api_base_url: String,
    pub grading_model: String,
    pub fast_model: String,
    pub roster_base_url: String,
    pub request_timeout_secs: u64,
    pub min_request_interval_ms: u64,
    pub seed_demo_data: bool,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            api_key: String::new(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            grading_model: DEFAULT_GRADING_MODEL.to_string(),
            fast_model: DEFAULT_FAST_MODEL.to_string(),
            roster_base_url: DEFAULT_ROSTER_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            min_request_interval_ms: DEFAULT_MIN_REQUEST_INTERVAL_MS,
            seed_demo_data: true,
        }
    }
}

impl GradingConfig {
    /// Resolve configuration from arguments, environment and config file.
    ///
    /// An explicit `--config` path must exist and parse; an auto-located
    /// file that fails to parse is logged and skipped.
    pub fn load(args: &Args) -> Result<Self> {
        let file_value = match &args.config {
            Some(path) => Some(read_config_file(path)?),
            None => match locate_config_file() {
                Ok(path) => match read_config_file(&path) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        warn!("Ignoring unreadable config file {:?}: {}", path, e);
                        None
                    }
                },
                Err(_) => None,
            },
        };

        Ok(Self::merge(args, file_value.as_ref()))
    }

    fn merge(args: &Args, file: Option<&toml::Value>) -> Self {
        let defaults = Self::default();

        let port = args
            .port
            .or_else(|| {
                file.and_then(|f| get_integer(f, "port"))
                    .and_then(|p| u16::try_from(p).ok())
            })
            .unwrap_or(defaults.port);

        Self {
            host: args
                .host
                .clone()
                .or_else(|| file.and_then(|f| get_string(f, "host")))
                .unwrap_or(defaults.host),
            port,
            api_key: args
                .api_key
                .clone()
                .or_else(|| file.and_then(|f| get_string(f, "api_key")))
                .unwrap_or(defaults.api_key),
            api_base_url: args
                .api_base_url
                .clone()
                .or_else(|| file.and_then(|f| get_string(f, "api_base_url")))
                .unwrap_or(defaults.api_base_url),
            grading_model: args
                .grading_model
                .clone()
                .or_else(|| file.and_then(|f| get_string(f, "grading_model")))
                .unwrap_or(defaults.grading_model),
            fast_model: args
                .fast_model
                .clone()
                .or_else(|| file.and_then(|f| get_string(f, "fast_model")))
                .unwrap_or(defaults.fast_model),
            roster_base_url: args
                .roster_base_url
                .clone()
                .or_else(|| file.and_then(|f| get_string(f, "roster_base_url")))
                .unwrap_or(defaults.roster_base_url),
            request_timeout_secs: args
                .request_timeout_secs
                .or_else(|| {
                    file.and_then(|f| get_integer(f, "request_timeout_secs"))
                        .and_then(|v| u64::try_from(v).ok())
                })
                .unwrap_or(defaults.request_timeout_secs),
            min_request_interval_ms: args
                .min_request_interval_ms
                .or_else(|| {
                    file.and_then(|f| get_integer(f, "min_request_interval_ms"))
                        .and_then(|v| u64::try_from(v).ok())
                })
                .unwrap_or(defaults.min_request_interval_ms),
            seed_demo_data: args
                .seed_demo_data
                .or_else(|| file.and_then(|f| get_bool(f, "seed_demo_data")))
                .unwrap_or(defaults.seed_demo_data),
        }
    }

    /// Socket address string for the HTTP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether a model API key has been configured.
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}
