use crate::error::{PaymentError, Result};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8081";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Runtime settings, read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub http_timeout: Duration,
    pub page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            api_url: lookup("LOANBOOK_API_URL").unwrap_or(defaults.api_url),
            http_timeout: lookup("LOANBOOK_HTTP_TIMEOUT_SECS")
                .map(|v| parse_number::<u64>("LOANBOOK_HTTP_TIMEOUT_SECS", &v))
                .transpose()?
                .map_or(defaults.http_timeout, Duration::from_secs),
            page_size: lookup("LOANBOOK_PAGE_SIZE")
                .map(|v| parse_number::<usize>("LOANBOOK_PAGE_SIZE", &v))
                .transpose()?
                .filter(|size| *size > 0)
                .unwrap_or(defaults.page_size),
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| PaymentError::Config(format!("{key} must be a number, got '{value}'")))
}
