use std::sync::LazyLock;

use crate::logger::Logger;

mod client;
mod configuration;
pub mod constants;
pub mod error;
mod initializer;
mod injector;
mod registration;
mod script;

pub use client::{GlobalPaqQueue, MatomoTracker, PaqQueue, PaqTracker, TrackerCommand};
pub use configuration::{
    AutoTrackerConfiguration, EmbeddedTrackerConfiguration, ExplicitTrackerConfiguration,
    InternalMatomoConfiguration, MatomoConfiguration, MatomoConsentMode, MatomoInitializationMode,
    MatomoTrackerConfiguration, SiteId, TrackerSetup,
};
pub use initializer::{
    create_matomo_initializer, provide_matomo, InitializerState, MatomoInitialization,
    MatomoInitializer, MatomoProviders, NoopMatomoInitializer,
};
pub use injector::ScriptInjector;
pub use registration::{
    build_script_url, build_tracker_url, coerce_site_id, register_additional_trackers,
    register_main_tracker,
};
pub use script::{create_default_script_element, default_script_factory, ScriptFactory};

pub(crate) static LOGGER: LazyLock<Logger> =
    LazyLock::new(|| Logger::new(constants::TRACKER_LOGGER_NAME));
