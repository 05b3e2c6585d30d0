use std::fmt;
use std::time::Duration;

use regex::Regex;
use serde::de::{Deserializer, Error as _};
use serde::Deserialize;

use crate::router::exclusion::UrlExclusions;
use crate::tracker::error::{configuration_error, MatomoResult};
use crate::tracker::InternalMatomoConfiguration;

pub const DEFAULT_PREPEND_BASE_HREF: bool = true;
pub const DEFAULT_USE_PAGE_TITLE: bool = true;
pub const DEFAULT_DELAY: i64 = 0;

/// One URL exclusion. Strings are compiled as regular expressions, so a plain string matches
/// any URL containing it.
#[derive(Clone)]
pub enum ExclusionRule {
    Text(String),
    Pattern(Regex),
}

impl fmt::Debug for ExclusionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionRule::Text(text) => f.debug_tuple("Text").field(text).finish(),
            ExclusionRule::Pattern(regex) => f.debug_tuple("Pattern").field(&regex.as_str()).finish(),
        }
    }
}

impl From<&str> for ExclusionRule {
    fn from(value: &str) -> Self {
        ExclusionRule::Text(value.to_string())
    }
}

impl From<String> for ExclusionRule {
    fn from(value: String) -> Self {
        ExclusionRule::Text(value)
    }
}

impl From<Regex> for ExclusionRule {
    fn from(value: Regex) -> Self {
        ExclusionRule::Pattern(value)
    }
}

impl<'de> Deserialize<'de> for ExclusionRule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(ExclusionRule::Text)
    }
}

/// A single rule or a list of rules, as accepted by the `exclude` option.
#[derive(Clone, Debug)]
pub enum ExclusionConfig {
    Single(ExclusionRule),
    Many(Vec<ExclusionRule>),
}

impl ExclusionConfig {
    pub fn into_rules(self) -> Vec<ExclusionRule> {
        match self {
            ExclusionConfig::Single(rule) => vec![rule],
            ExclusionConfig::Many(rules) => rules,
        }
    }
}

impl<'de> Deserialize<'de> for ExclusionConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Single(String),
            Many(Vec<String>),
        }

        match Raw::deserialize(deserializer)
            .map_err(|_| D::Error::custom("`exclude` must be a string or an array of strings"))?
        {
            Raw::Single(text) => Ok(ExclusionConfig::Single(ExclusionRule::Text(text))),
            Raw::Many(texts) => Ok(ExclusionConfig::Many(
                texts.into_iter().map(ExclusionRule::Text).collect(),
            )),
        }
    }
}

/// Router options; every field is optional.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatomoRouterConfiguration {
    /// Whether the application base href is prepended to tracked URLs. Defaults to `true`.
    pub prepend_base_href: Option<bool>,
    /// Whether the document title is sent with page views. Defaults to `true`.
    pub use_page_title: Option<bool>,
    /// Milliseconds to wait after navigation before tracking, letting components update the
    /// title. `0` (default) tracks on the next turn, `-1` tracks synchronously.
    pub delay: Option<i64>,
    /// URLs that are never tracked.
    pub exclude: Option<ExclusionConfig>,
}

impl MatomoRouterConfiguration {
    pub fn from_json_str(raw: &str) -> MatomoResult<Self> {
        serde_json::from_str(raw).map_err(|err| {
            configuration_error(format!("Invalid Matomo router configuration: {err}"))
        })
    }

    /// Fills in defaults, compiles exclusions and inherits link tracking from the tracker
    /// configuration.
    pub fn resolve(
        self,
        tracker: &InternalMatomoConfiguration,
    ) -> MatomoResult<InternalRouterConfiguration> {
        let delay = TrackingDelay::from_millis(self.delay.unwrap_or(DEFAULT_DELAY))?;
        let rules = self.exclude.map(ExclusionConfig::into_rules).unwrap_or_default();

        Ok(InternalRouterConfiguration {
            prepend_base_href: self.prepend_base_href.unwrap_or(DEFAULT_PREPEND_BASE_HREF),
            use_page_title: self.use_page_title.unwrap_or(DEFAULT_USE_PAGE_TITLE),
            delay,
            exclude: UrlExclusions::compile(rules)?,
            enable_link_tracking: tracker.enable_link_tracking,
        })
    }
}

/// When a page view is tracked relative to its navigation event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackingDelay {
    /// Tracked while handling the navigation event (`-1`).
    Synchronous,
    /// Tracked on the next turn of the event loop (`0`).
    NextTurn,
    After(Duration),
}

impl TrackingDelay {
    pub fn from_millis(delay: i64) -> MatomoResult<Self> {
        match delay {
            -1 => Ok(TrackingDelay::Synchronous),
            0 => Ok(TrackingDelay::NextTurn),
            ms if ms > 0 => Ok(TrackingDelay::After(Duration::from_millis(ms as u64))),
            other => Err(configuration_error(format!(
                "Invalid router delay {other}: expected -1, 0 or a positive number of milliseconds"
            ))),
        }
    }

    pub fn as_millis(&self) -> i64 {
        match self {
            TrackingDelay::Synchronous => -1,
            TrackingDelay::NextTurn => 0,
            TrackingDelay::After(duration) => duration.as_millis() as i64,
        }
    }
}

#[derive(Clone, Debug)]
pub struct InternalRouterConfiguration {
    pub prepend_base_href: bool,
    pub use_page_title: bool,
    pub delay: TrackingDelay,
    pub exclude: UrlExclusions,
    pub enable_link_tracking: bool,
}
