//! Tracker configuration surface and its resolution into a typed setup.
//!
//! [`MatomoConfiguration`] mirrors the loosely typed options object accepted by the JS library:
//! every field is optional and several shapes share the same keys. [`MatomoConfiguration::resolve`]
//! classifies it once into a [`TrackerSetup`], so the rest of the crate only ever matches on
//! typed variants.

use std::fmt;

use serde::Deserialize;

use crate::tracker::error::{configuration_error, MatomoResult};

/// Controls when the Matomo script is injected into the document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum MatomoInitializationMode {
    /// Trackers are registered and the script injected during `initialize()`.
    #[default]
    #[serde(rename = "auto", alias = "AUTO")]
    Auto,
    /// Pre-init tasks run during `initialize()`; injection waits for `initialize_tracker()`.
    #[serde(
        rename = "deferred",
        alias = "auto_deferred",
        alias = "AUTO_DEFERRED",
        alias = "autoDeferred"
    )]
    AutoDeferred,
    /// The host page loads the script itself.
    #[serde(rename = "manual", alias = "MANUAL")]
    Manual,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum MatomoConsentMode {
    #[default]
    #[serde(rename = "none", alias = "NONE")]
    None,
    #[serde(rename = "cookie", alias = "COOKIE")]
    Cookie,
    #[serde(rename = "tracking", alias = "TRACKING")]
    Tracking,
}

/// Matomo site identifier, accepted either as a number or as a string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(untagged)]
pub enum SiteId {
    Numeric(u64),
    Text(String),
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteId::Numeric(id) => write!(f, "{id}"),
            SiteId::Text(id) => f.write_str(id),
        }
    }
}

impl From<u64> for SiteId {
    fn from(value: u64) -> Self {
        SiteId::Numeric(value)
    }
}

impl From<u32> for SiteId {
    fn from(value: u32) -> Self {
        SiteId::Numeric(value as u64)
    }
}

impl From<&str> for SiteId {
    fn from(value: &str) -> Self {
        SiteId::Text(value.to_string())
    }
}

impl From<String> for SiteId {
    fn from(value: String) -> Self {
        SiteId::Text(value)
    }
}

/// A single Matomo endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatomoTrackerConfiguration {
    pub tracker_url: String,
    pub site_id: SiteId,
    #[serde(default)]
    pub tracker_url_suffix: Option<String>,
}

impl MatomoTrackerConfiguration {
    pub fn new(tracker_url: impl Into<String>, site_id: impl Into<SiteId>) -> Self {
        Self {
            tracker_url: tracker_url.into(),
            site_id: site_id.into(),
            tracker_url_suffix: None,
        }
    }

    /// Replaces the default `matomo.php` endpoint. The suffix is appended verbatim.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.tracker_url_suffix = Some(suffix.into());
        self
    }
}

/// Raw user configuration, analogous to the JS `MatomoConfiguration` object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatomoConfiguration {
    pub disabled: bool,
    pub mode: Option<MatomoInitializationMode>,
    pub tracker_url: Option<String>,
    pub site_id: Option<SiteId>,
    pub tracker_url_suffix: Option<String>,
    pub trackers: Option<Vec<MatomoTrackerConfiguration>>,
    pub script_url: Option<String>,
    pub accept_do_not_track: bool,
    pub require_consent: MatomoConsentMode,
    #[serde(rename = "enableJSErrorTracking")]
    pub enable_js_error_tracking: bool,
    pub track_app_initial_load: bool,
    pub enable_link_tracking: bool,
}

impl MatomoConfiguration {
    /// Parses a JSON options object using the JS option names.
    pub fn from_json_str(raw: &str) -> MatomoResult<Self> {
        serde_json::from_str(raw)
            .map_err(|err| configuration_error(format!("Invalid Matomo configuration: {err}")))
    }

    /// Single explicit tracker shorthand.
    pub fn with_tracker(tracker_url: impl Into<String>, site_id: impl Into<SiteId>) -> Self {
        Self {
            tracker_url: Some(tracker_url.into()),
            site_id: Some(site_id.into()),
            ..Default::default()
        }
    }

    pub fn mode(&self) -> MatomoInitializationMode {
        self.mode.unwrap_or_default()
    }

    /// Fills defaults and classifies the tracker shape. Unclassifiable or contradictory tracker
    /// fields are reported here rather than when the configuration is first used.
    pub fn resolve(self) -> MatomoResult<InternalMatomoConfiguration> {
        let setup = match self.mode() {
            MatomoInitializationMode::Manual => TrackerSetup::Manual,
            MatomoInitializationMode::AutoDeferred => TrackerSetup::Deferred,
            MatomoInitializationMode::Auto => {
                TrackerSetup::Auto(AutoTrackerConfiguration::from_configuration(&self)?)
            }
        };

        Ok(InternalMatomoConfiguration {
            disabled: self.disabled,
            setup,
            accept_do_not_track: self.accept_do_not_track,
            require_consent: self.require_consent,
            enable_js_error_tracking: self.enable_js_error_tracking,
            track_app_initial_load: self.track_app_initial_load,
            enable_link_tracking: self.enable_link_tracking,
        })
    }
}

/// Trackers declared explicitly; the first one is the main tracker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExplicitTrackerConfiguration {
    pub main: MatomoTrackerConfiguration,
    pub additional: Vec<MatomoTrackerConfiguration>,
    pub script_url: Option<String>,
}

/// The main tracker is configured by an embedded script; only additional trackers are
/// registered from Rust.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmbeddedTrackerConfiguration {
    pub script_url: String,
    pub additional: Vec<MatomoTrackerConfiguration>,
}

/// Tracker configuration usable for script injection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AutoTrackerConfiguration {
    Explicit(ExplicitTrackerConfiguration),
    Embedded(EmbeddedTrackerConfiguration),
}

impl AutoTrackerConfiguration {
    pub fn single(tracker: MatomoTrackerConfiguration) -> Self {
        AutoTrackerConfiguration::Explicit(ExplicitTrackerConfiguration {
            main: tracker,
            additional: Vec::new(),
            script_url: None,
        })
    }

    /// Extracts the tracker shape from raw options, ignoring the initialization mode.
    ///
    /// `trackerUrl` or a non-empty `trackers` list makes the configuration explicit, with
    /// `scriptUrl` as an optional override. `scriptUrl` alone means the page embeds its own
    /// Matomo container.
    pub fn from_configuration(config: &MatomoConfiguration) -> MatomoResult<Self> {
        let trackers = config.trackers.clone().unwrap_or_default();

        if let Some(tracker_url) = &config.tracker_url {
            if config.trackers.is_some() {
                return Err(configuration_error(
                    "`trackerUrl` and `trackers` cannot be used together",
                ));
            }
            let site_id = config.site_id.clone().ok_or_else(|| {
                configuration_error("`siteId` is required when `trackerUrl` is set")
            })?;
            return Ok(AutoTrackerConfiguration::Explicit(
                ExplicitTrackerConfiguration {
                    main: MatomoTrackerConfiguration {
                        tracker_url: tracker_url.clone(),
                        site_id,
                        tracker_url_suffix: config.tracker_url_suffix.clone(),
                    },
                    additional: Vec::new(),
                    script_url: config.script_url.clone(),
                },
            ));
        }

        if config.site_id.is_some() || config.tracker_url_suffix.is_some() {
            return Err(configuration_error(
                "`siteId` and `trackerUrlSuffix` require `trackerUrl`",
            ));
        }

        let mut trackers = trackers.into_iter();
        match (trackers.next(), &config.script_url) {
            (Some(main), script_url) => Ok(AutoTrackerConfiguration::Explicit(
                ExplicitTrackerConfiguration {
                    main,
                    additional: trackers.collect(),
                    script_url: script_url.clone(),
                },
            )),
            (None, Some(script_url)) => Ok(AutoTrackerConfiguration::Embedded(
                EmbeddedTrackerConfiguration {
                    script_url: script_url.clone(),
                    additional: Vec::new(),
                },
            )),
            (None, None) => Err(configuration_error(
                "Invalid Matomo configuration: expected `trackerUrl`, a non-empty `trackers` list or `scriptUrl`",
            )),
        }
    }
}

/// How trackers get registered for the lifetime of the page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrackerSetup {
    Auto(AutoTrackerConfiguration),
    /// Tracker configuration is supplied later through `initialize_tracker()`.
    Deferred,
    Manual,
}

/// Fully defaulted tracker configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InternalMatomoConfiguration {
    pub disabled: bool,
    pub setup: TrackerSetup,
    pub accept_do_not_track: bool,
    pub require_consent: MatomoConsentMode,
    pub enable_js_error_tracking: bool,
    pub track_app_initial_load: bool,
    pub enable_link_tracking: bool,
}

impl InternalMatomoConfiguration {
    pub fn mode(&self) -> MatomoInitializationMode {
        match self.setup {
            TrackerSetup::Auto(_) => MatomoInitializationMode::Auto,
            TrackerSetup::Deferred => MatomoInitializationMode::AutoDeferred,
            TrackerSetup::Manual => MatomoInitializationMode::Manual,
        }
    }
}
