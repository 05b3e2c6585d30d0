use regex::Regex;

use crate::router::configuration::ExclusionRule;
use crate::tracker::error::{configuration_error, MatomoResult};

/// Compiled exclusion rules; a URL is excluded when any rule matches.
#[derive(Clone, Debug, Default)]
pub struct UrlExclusions {
    patterns: Vec<Regex>,
}

impl UrlExclusions {
    pub fn compile(rules: Vec<ExclusionRule>) -> MatomoResult<Self> {
        let patterns = rules
            .into_iter()
            .map(|rule| match rule {
                ExclusionRule::Pattern(regex) => Ok(regex),
                ExclusionRule::Text(text) => Regex::new(&text).map_err(|err| {
                    configuration_error(format!("Invalid exclusion pattern `{text}`: {err}"))
                }),
            })
            .collect::<MatomoResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn is_excluded(&self, url: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(url))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }
}
