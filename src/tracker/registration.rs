use crate::tracker::client::MatomoTracker;
use crate::tracker::configuration::{MatomoTrackerConfiguration, SiteId};
use crate::tracker::constants::{DEFAULT_SCRIPT_SUFFIX, DEFAULT_TRACKER_SUFFIX};
use crate::tracker::LOGGER;

pub(crate) fn append_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

/// Tracking endpoint for a tracker descriptor. An explicit suffix is appended verbatim.
pub fn build_tracker_url(url: &str, suffix: Option<&str>) -> String {
    match suffix {
        None => append_trailing_slash(url) + DEFAULT_TRACKER_SUFFIX,
        Some(suffix) => format!("{url}{suffix}"),
    }
}

/// Default script location served next to the main tracker.
pub fn build_script_url(tracker_url: &str) -> String {
    append_trailing_slash(tracker_url) + DEFAULT_SCRIPT_SUFFIX
}

pub fn coerce_site_id(site_id: &SiteId) -> String {
    site_id.to_string()
}

/// Registers the main tracker; the URL is always set before the site id.
pub fn register_main_tracker(tracker: &dyn MatomoTracker, main: &MatomoTrackerConfiguration) {
    let url = build_tracker_url(&main.tracker_url, main.tracker_url_suffix.as_deref());
    let site_id = coerce_site_id(&main.site_id);

    LOGGER.debug(format!("registering main tracker {url} (site {site_id})"));
    tracker.set_tracker_url(&url);
    tracker.set_site_id(&site_id);
}

/// Adds trackers in input order; Matomo exposes them by index afterwards.
pub fn register_additional_trackers(
    tracker: &dyn MatomoTracker,
    additional: &[MatomoTrackerConfiguration],
) {
    for descriptor in additional {
        let url = build_tracker_url(
            &descriptor.tracker_url,
            descriptor.tracker_url_suffix.as_deref(),
        );
        let site_id = coerce_site_id(&descriptor.site_id);

        LOGGER.debug(format!("adding tracker {url} (site {site_id})"));
        tracker.add_tracker(&url, &site_id);
    }
}
