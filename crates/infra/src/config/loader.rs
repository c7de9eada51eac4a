//! Configuration loader
//!
//! Loads [`ClientConfig`] from environment variables or files.
//!
//! ## Loading Strategy
//! 1. If `TOLLGATE_BASE_URL` is set, the environment is the source
//! 2. Otherwise the loader probes for a config file
//! 3. TOML and JSON are supported, picked by file extension
//!
//! Every loaded config is validated before it is returned.
//!
//! ## Environment Variables
//! `TOLLGATE_BASE_URL` is required for the environment source. Every other
//! option is optional and falls back to its default:
//!
//! | Variable | Option |
//! |----------|--------|
//! | `TOLLGATE_USER_AGENT` | `transport.user_agent` |
//! | `TOLLGATE_CONNECT_TIMEOUT_MS` | `transport.connect_timeout_ms` |
//! | `TOLLGATE_REQUESTS_PER_SECOND` | `rate_limit.requests_per_second` |
//! | `TOLLGATE_BURST_CAPACITY` | `rate_limit.burst_capacity` |
//! | `TOLLGATE_FAILURE_THRESHOLD` | `circuit_breaker.failure_threshold` |
//! | `TOLLGATE_RECOVERY_TIMEOUT_MS` | `circuit_breaker.recovery_timeout_ms` |
//! | `TOLLGATE_HALF_OPEN_MAX_PROBES` | `circuit_breaker.half_open_max_probes` |
//! | `TOLLGATE_COUNT_RATE_LIMIT_AS_FAILURE` | `circuit_breaker.count_rate_limit_as_failure` |
//! | `TOLLGATE_MAX_ATTEMPTS` | `retry.max_attempts` |
//! | `TOLLGATE_BASE_DELAY_MS` | `retry.base_delay_ms` |
//! | `TOLLGATE_MAX_DELAY_MS` | `retry.max_delay_ms` |
//! | `TOLLGATE_BACKOFF_MULTIPLIER` | `retry.backoff_multiplier` |
//! | `TOLLGATE_JITTER_FRACTION` | `retry.jitter_fraction` |
//! | `TOLLGATE_QUEUE_CAPACITY` | `queue.queue_capacity` |
//! | `TOLLGATE_WORKER_COUNT` | `dispatch.worker_count` |
//! | `TOLLGATE_REQUEST_TIMEOUT_MS` | `dispatch.request_timeout_ms` |
//! | `TOLLGATE_DEFAULT_DEADLINE_MS` | `dispatch.default_deadline_ms` |
//! | `TOLLGATE_IDLE_POLL_MS` | `dispatch.idle_poll_ms` |
//! | `TOLLGATE_LATENCY_SAMPLE_CAPACITY` | `metrics.latency_sample_capacity` |
//!
//! ## File Locations
//! For each of the working directory, its parent, its grandparent and the
//! executable's directory, the loader tries (in order) `tollgate.toml`,
//! `tollgate.json`, `config.toml` and `config.json`.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tollgate_domain::{ClientConfig, Result, TollgateError};

use crate::errors::InfraError;

/// Environment variable that selects the environment source
pub const BASE_URL_VAR: &str = "TOLLGATE_BASE_URL";

const CONFIG_FILE_NAMES: [&str; 4] = ["tollgate.toml", "tollgate.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// Uses the environment when `TOLLGATE_BASE_URL` is set and a config file
/// otherwise. An environment that is present but invalid is an error; it
/// does not silently fall back to a file.
///
/// # Errors
/// Returns `TollgateError::Config` if neither source yields a valid config.
pub fn load() -> Result<ClientConfig> {
    if std::env::var_os(BASE_URL_VAR).is_some() {
        let config = load_from_env()?;
        tracing::info!("Configuration loaded from environment variables");
        return Ok(config);
    }

    tracing::debug!("{BASE_URL_VAR} not set, trying config file");
    load_from_file(None)
}

/// Load configuration from the process environment
///
/// # Errors
/// Returns `TollgateError::Config` if `TOLLGATE_BASE_URL` is missing, a
/// variable cannot be parsed, or the result fails validation.
pub fn load_from_env() -> Result<ClientConfig> {
    load_from_lookup(|key| std::env::var(key).ok())
}

/// Load configuration from an arbitrary variable lookup
///
/// Same rules as [`load_from_env`]; lets callers (and tests) supply variables
/// without touching the process environment.
///
/// # Errors
/// See [`load_from_env`].
pub fn load_from_lookup<F>(lookup: F) -> Result<ClientConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let base_url = lookup(BASE_URL_VAR).ok_or_else(|| {
        TollgateError::Config(format!("Missing required environment variable: {BASE_URL_VAR}"))
    })?;
    let mut config = ClientConfig::with_base_url(base_url);

    if let Some(agent) = lookup("TOLLGATE_USER_AGENT") {
        config.transport.user_agent = agent;
    }
    override_with(&lookup, "TOLLGATE_CONNECT_TIMEOUT_MS", &mut config.transport.connect_timeout_ms)?;

    override_with(&lookup, "TOLLGATE_REQUESTS_PER_SECOND", &mut config.rate_limit.requests_per_second)?;
    override_with(&lookup, "TOLLGATE_BURST_CAPACITY", &mut config.rate_limit.burst_capacity)?;

    let breaker = &mut config.circuit_breaker;
    override_with(&lookup, "TOLLGATE_FAILURE_THRESHOLD", &mut breaker.failure_threshold)?;
    override_with(&lookup, "TOLLGATE_RECOVERY_TIMEOUT_MS", &mut breaker.recovery_timeout_ms)?;
    override_with(&lookup, "TOLLGATE_HALF_OPEN_MAX_PROBES", &mut breaker.half_open_max_probes)?;
    if let Some(raw) = lookup("TOLLGATE_COUNT_RATE_LIMIT_AS_FAILURE") {
        breaker.count_rate_limit_as_failure = parse_bool(&raw).ok_or_else(|| {
            TollgateError::Config(format!(
                "Invalid value for TOLLGATE_COUNT_RATE_LIMIT_AS_FAILURE: {raw:?}"
            ))
        })?;
    }

    let retry = &mut config.retry;
    override_with(&lookup, "TOLLGATE_MAX_ATTEMPTS", &mut retry.max_attempts)?;
    override_with(&lookup, "TOLLGATE_BASE_DELAY_MS", &mut retry.base_delay_ms)?;
    override_with(&lookup, "TOLLGATE_MAX_DELAY_MS", &mut retry.max_delay_ms)?;
    override_with(&lookup, "TOLLGATE_BACKOFF_MULTIPLIER", &mut retry.backoff_multiplier)?;
    override_with(&lookup, "TOLLGATE_JITTER_FRACTION", &mut retry.jitter_fraction)?;

    override_with(&lookup, "TOLLGATE_QUEUE_CAPACITY", &mut config.queue.queue_capacity)?;

    let dispatch = &mut config.dispatch;
    override_with(&lookup, "TOLLGATE_WORKER_COUNT", &mut dispatch.worker_count)?;
    override_with(&lookup, "TOLLGATE_REQUEST_TIMEOUT_MS", &mut dispatch.request_timeout_ms)?;
    override_with(&lookup, "TOLLGATE_DEFAULT_DEADLINE_MS", &mut dispatch.default_deadline_ms)?;
    override_with(&lookup, "TOLLGATE_IDLE_POLL_MS", &mut dispatch.idle_poll_ms)?;

    override_with(
        &lookup,
        "TOLLGATE_LATENCY_SAMPLE_CAPACITY",
        &mut config.metrics.latency_sample_capacity,
    )?;

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations (see module docs).
///
/// # Errors
/// Returns `TollgateError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid or unsupported
/// - The parsed config fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(TollgateError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            TollgateError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path).map_err(InfraError::from)?;
    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration by file extension (`.toml` or `.json`)
///
/// Missing sections and fields take their defaults. Does not validate.
///
/// # Errors
/// Returns `TollgateError::Config` if the format is unsupported or parsing
/// fails.
pub fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => Ok(toml::from_str(contents).map_err(InfraError::from)?),
        "json" => Ok(serde_json::from_str(contents).map_err(InfraError::from)?),
        _ => Err(TollgateError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the working directory and the executable's directory
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    if let Some(found) = std::env::current_dir().ok().and_then(|cwd| probe_config_paths_from(&cwd)) {
        return Some(found);
    }

    let exe_path = std::env::current_exe().ok()?;
    probe_config_paths_from(exe_path.parent()?)
}

/// Probe `dir` and up to two of its ancestors
pub fn probe_config_paths_from(dir: &Path) -> Option<PathBuf> {
    dir.ancestors()
        .take(3)
        .flat_map(|base| CONFIG_FILE_NAMES.iter().map(move |name| base.join(name)))
        .find(|candidate| candidate.is_file())
}

fn override_with<F, T>(lookup: &F, key: &str, slot: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|e| TollgateError::Config(format!("Invalid value for {key}: {e}")))?;
    }
    Ok(())
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
