use std::sync::LazyLock;

use crate::logger::Logger;
use crate::tracker::constants::ROUTER_LOGGER_NAME;

mod bridge;
mod configuration;
mod exclusion;

pub use bridge::{join_with_base_href, MatomoRouter, NavigationEnd};
pub use configuration::{
    ExclusionConfig, ExclusionRule, InternalRouterConfiguration, MatomoRouterConfiguration,
    TrackingDelay, DEFAULT_DELAY, DEFAULT_PREPEND_BASE_HREF, DEFAULT_USE_PAGE_TITLE,
};
pub use exclusion::UrlExclusions;

pub(crate) static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new(ROUTER_LOGGER_NAME));
