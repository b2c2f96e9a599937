use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which DuckDuckGo endpoint a search is fetched from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Instant Answer JSON API. Reliable, but only returns curated topics.
    Api,
    /// Rendered HTML results page.
    #[default]
    Html,
    /// Lightweight HTML results page, the least likely to be throttled.
    Lite,
}

impl Backend {
    pub fn default_url(&self) -> &'static str {
        match self {
            Backend::Api => "https://api.duckduckgo.com/",
            Backend::Html => "https://html.duckduckgo.com/html/",
            Backend::Lite => "https://lite.duckduckgo.com/lite/",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::Api => "api",
            Backend::Html => "html",
            Backend::Lite => "lite",
        };
        write!(f, "{name}")
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Unknown DuckDuckGo backend: {0} (expected one of: api, html, lite)")]
pub struct UnknownBackend(pub String);

impl FromStr for Backend {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "api" => Ok(Backend::Api),
            "html" => Ok(Backend::Html),
            "lite" => Ok(Backend::Lite),
            _ => Err(UnknownBackend(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafeSearch {
    Strict,
    #[default]
    Moderate,
    Off,
}

impl SafeSearch {
    /// Value of the `kp` query parameter.
    pub fn as_param(&self) -> &'static str {
        match self {
            SafeSearch::Strict => "1",
            SafeSearch::Moderate => "-1",
            SafeSearch::Off => "-2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeLimit {
    Day,
    Week,
    Month,
    Year,
}

impl TimeLimit {
    /// Value of the `df` query parameter.
    pub fn as_param(&self) -> &'static str {
        match self {
            TimeLimit::Day => "d",
            TimeLimit::Week => "w",
            TimeLimit::Month => "m",
            TimeLimit::Year => "y",
        }
    }
}
