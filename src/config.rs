//! Runtime configuration
//!
//! Read once at startup from the environment (and `.env` when present), then
//! passed to whatever needs it.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::fdc::DEFAULT_BASE_URL;
use crate::nutrition::CalculationOptions;
use crate::parser::classifier::{WordListError, WordLists};
use crate::upstream::RetryPolicy;

pub const DEFAULT_FDC_API_KEY: &str = "DEMO_KEY";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_path: PathBuf,
    pub fdc_api_key: String,
    pub fdc_base_url: String,
    pub retry: RetryPolicy,
    /// Flat estimate for units with no known conversion; unset rejects them
    pub unknown_unit_grams: Option<f64>,
    pub word_lists_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            fdc_api_key: DEFAULT_FDC_API_KEY.to_string(),
            fdc_base_url: DEFAULT_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
            unknown_unit_grams: None,
            word_lists_path: None,
        }
    }
}

impl Config {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let retry = RetryPolicy {
            max_attempts: parse_or(&get, "NUTRILABEL_MAX_ATTEMPTS", defaults.retry.max_attempts, |v| *v >= 1),
            initial_backoff: Duration::from_millis(parse_or(
                &get,
                "NUTRILABEL_INITIAL_BACKOFF_MS",
                defaults.retry.initial_backoff.as_millis() as u64,
                |_| true,
            )),
            timeout: Duration::from_secs(parse_or(
                &get,
                "NUTRILABEL_UPSTREAM_TIMEOUT_SECS",
                defaults.retry.timeout.as_secs(),
                |v| *v >= 1,
            )),
            max_retry_after: Duration::from_secs(parse_or(
                &get,
                "NUTRILABEL_MAX_RETRY_AFTER_SECS",
                defaults.retry.max_retry_after.as_secs(),
                |_| true,
            )),
        };

        let unknown_unit_grams = get("NUTRILABEL_UNKNOWN_UNIT_GRAMS").and_then(|raw| match raw.parse::<f64>() {
            Ok(v) if v.is_finite() && v > 0.0 => Some(v),
            _ => {
                warn!("Ignoring NUTRILABEL_UNKNOWN_UNIT_GRAMS={raw}: expected a positive number of grams");
                None
            }
        });

        Self {
            database_path: get("NUTRILABEL_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            fdc_api_key: get("FDC_API_KEY").unwrap_or(defaults.fdc_api_key),
            fdc_base_url: get("FDC_BASE_URL").unwrap_or(defaults.fdc_base_url),
            retry,
            unknown_unit_grams,
            word_lists_path: get("NUTRILABEL_WORD_LISTS").map(PathBuf::from),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone()
    }

    /// Resolver options; the store budget covers every retry the FDC client may make
    pub fn calculation_options(&self) -> CalculationOptions {
        CalculationOptions {
            unknown_unit_grams: self.unknown_unit_grams,
            store_timeout: self.store_timeout(),
        }
    }

    fn store_timeout(&self) -> Duration {
        let attempts = self.retry.max_attempts.max(1);
        let waits: Duration = (1..attempts)
            .map(|a| self.retry.backoff_for(a).max(self.retry.max_retry_after))
            .sum();
        self.retry.timeout * attempts + waits
    }

    /// Parser vocabularies: the configured file, or the built-in lists
    pub fn word_lists(&self) -> Result<WordLists, WordListError> {
        match &self.word_lists_path {
            Some(path) => WordLists::from_json_file(path),
            None => Ok(WordLists::default()),
        }
    }
}

fn parse_or<T, G, V>(get: &G, key: &str, default: T, valid: V) -> T
where
    T: FromStr + Copy + std::fmt::Display,
    G: Fn(&str) -> Option<String>,
    V: Fn(&T) -> bool,
{
    let Some(raw) = get(key) else {
        return default;
    };
    match raw.parse::<T>() {
        Ok(v) if valid(&v) => v,
        _ => {
            warn!("Ignoring {key}={raw}: using default {default}");
            default
        }
    }
}

/// `<project>/data/nutrilabel.db`, found relative to the running binary
fn default_database_path() -> PathBuf {
    let mut path = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    // Go up from target/release or target/debug to project root
    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(grandparent) = path.parent().and_then(|p| p.parent()) {
            path = grandparent.to_path_buf();
        }
    }

    path.push("data");
    path.push("nutrilabel.db");
    path
}
