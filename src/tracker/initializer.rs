//! Initialization sequencing: pre-init tasks, tracker registration and script injection.
//!
//! [`create_matomo_initializer`] selects once between [`MatomoInitializer`] and
//! [`NoopMatomoInitializer`]; callers only see the [`MatomoInitialization`] capability.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::dom::Document;
use crate::platform::environment::is_browser;
use crate::tracker::client::{GlobalPaqQueue, MatomoTracker};
use crate::tracker::configuration::{
    AutoTrackerConfiguration, InternalMatomoConfiguration, MatomoConfiguration,
    MatomoConsentMode, TrackerSetup,
};
use crate::tracker::error::{already_initialized, already_injected, configuration_error, MatomoResult};
use crate::tracker::injector::{InsertionPoint, ScriptInjector};
use crate::tracker::registration::{
    build_script_url, register_additional_trackers, register_main_tracker,
};
use crate::tracker::script::{default_script_factory, ScriptFactory};
use crate::tracker::LOGGER;

/// Snapshot of the initializer flags. Each flag flips to `true` at most once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InitializerState {
    pub initialized: bool,
    pub injected: bool,
}

pub trait MatomoInitialization {
    /// Runs pre-init tasks and, in automatic mode, injects the Matomo script.
    fn initialize(&self) -> MatomoResult<()>;

    /// Registers trackers and injects the script for a deferred configuration.
    fn initialize_tracker(&self, config: AutoTrackerConfiguration) -> MatomoResult<()>;

    fn state(&self) -> InitializerState;

    #[deprecated(note = "use `initialize` instead")]
    fn init(&self) -> MatomoResult<()> {
        self.initialize()
    }
}

/// Collaborators the initializer drives.
pub struct MatomoProviders<D: Document> {
    pub tracker: Arc<dyn MatomoTracker>,
    pub document: Arc<D>,
    pub script_factory: ScriptFactory<D>,
}

impl<D: Document + 'static> MatomoProviders<D> {
    pub fn new(tracker: Arc<dyn MatomoTracker>, document: Arc<D>) -> Self {
        Self {
            tracker,
            document,
            script_factory: default_script_factory(),
        }
    }

    pub fn with_script_factory(mut self, factory: ScriptFactory<D>) -> Self {
        self.script_factory = factory;
        self
    }
}

/// Resolves `config` and builds the initializer for the current platform.
pub fn provide_matomo<D: Document + 'static>(
    config: MatomoConfiguration,
    providers: MatomoProviders<D>,
) -> MatomoResult<Arc<dyn MatomoInitialization>> {
    let config = config.resolve()?;
    Ok(create_matomo_initializer(config, providers, is_browser()))
}

/// Picks the active or the no-op initializer. The choice is never revisited.
pub fn create_matomo_initializer<D: Document + 'static>(
    config: InternalMatomoConfiguration,
    providers: MatomoProviders<D>,
    is_browser: bool,
) -> Arc<dyn MatomoInitialization> {
    if config.disabled || !is_browser {
        LOGGER.warn(format!(
            "Matomo tracking is inactive (disabled: {}, browser: {is_browser})",
            config.disabled
        ));
        Arc::new(NoopMatomoInitializer)
    } else {
        Arc::new(MatomoInitializer::new(config, providers))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMatomoInitializer;

impl MatomoInitialization for NoopMatomoInitializer {
    fn initialize(&self) -> MatomoResult<()> {
        Ok(())
    }

    fn initialize_tracker(&self, _config: AutoTrackerConfiguration) -> MatomoResult<()> {
        Ok(())
    }

    fn state(&self) -> InitializerState {
        InitializerState::default()
    }
}

pub struct MatomoInitializer<D: Document> {
    config: InternalMatomoConfiguration,
    tracker: Arc<dyn MatomoTracker>,
    injector: ScriptInjector<D>,
    initialized: AtomicBool,
    injected: AtomicBool,
}

impl<D: Document> MatomoInitializer<D> {
    pub fn new(config: InternalMatomoConfiguration, providers: MatomoProviders<D>) -> Self {
        GlobalPaqQueue::shared().inner().ensure_global();

        Self {
            config,
            tracker: providers.tracker,
            injector: ScriptInjector::new(providers.document, providers.script_factory),
            initialized: AtomicBool::new(false),
            injected: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &InternalMatomoConfiguration {
        &self.config
    }

    fn inject_matomo_script(
        &self,
        config: &AutoTrackerConfiguration,
        anchor: &InsertionPoint<D::Node>,
    ) -> MatomoResult<()> {
        if self.injected.load(Ordering::SeqCst) {
            return Err(already_injected());
        }

        let tracker = self.tracker.as_ref();
        match config {
            AutoTrackerConfiguration::Explicit(explicit) => {
                let script_url = explicit
                    .script_url
                    .clone()
                    .unwrap_or_else(|| build_script_url(&explicit.main.tracker_url));

                register_main_tracker(tracker, &explicit.main);
                register_additional_trackers(tracker, &explicit.additional);
                self.injector.insert_at(anchor, &script_url)?;
            }
            AutoTrackerConfiguration::Embedded(embedded) => {
                register_additional_trackers(tracker, &embedded.additional);
                self.injector.insert_at(anchor, &embedded.script_url)?;
            }
        }

        self.injected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn run_pre_init_tasks(&self) {
        let config = &self.config;

        if config.accept_do_not_track {
            LOGGER.debug("honoring do-not-track");
            self.tracker.set_do_not_track(true);
        }

        match config.require_consent {
            MatomoConsentMode::Tracking => {
                LOGGER.debug("requiring tracking consent");
                self.tracker.require_consent();
            }
            MatomoConsentMode::Cookie => {
                LOGGER.debug("requiring cookie consent");
                self.tracker.require_cookie_consent();
            }
            MatomoConsentMode::None => {}
        }

        if config.enable_js_error_tracking {
            self.tracker.enable_js_error_tracking();
        }

        if config.track_app_initial_load {
            LOGGER.debug("tracking initial page view");
            self.tracker.track_page_view(None);
        }

        if config.enable_link_tracking {
            self.tracker.enable_link_tracking();
        }
    }
}

impl<D: Document> MatomoInitialization for MatomoInitializer<D> {
    fn initialize(&self) -> MatomoResult<()> {
        if self.initialized.load(Ordering::SeqCst) {
            return Err(already_initialized());
        }

        // The anchor is resolved first so a page without scripts fails before any command
        // reaches the tracker.
        let auto = match &self.config.setup {
            TrackerSetup::Auto(config) => Some((config, self.injector.locate_anchor()?)),
            TrackerSetup::Deferred | TrackerSetup::Manual => None,
        };

        self.run_pre_init_tasks();

        if let Some((config, anchor)) = auto {
            self.inject_matomo_script(config, &anchor)?;
        }

        self.initialized.store(true, Ordering::SeqCst);
        LOGGER.debug(format!("Matomo initialized ({:?} mode)", self.config.mode()));
        Ok(())
    }

    fn initialize_tracker(&self, config: AutoTrackerConfiguration) -> MatomoResult<()> {
        if self.injected.load(Ordering::SeqCst) {
            return Err(already_injected());
        }
        if self.config.setup != TrackerSetup::Deferred {
            return Err(configuration_error(format!(
                "initialize_tracker() requires deferred initialization mode, current mode is {:?}",
                self.config.mode()
            )));
        }

        let anchor = self.injector.locate_anchor()?;
        self.inject_matomo_script(&config, &anchor)
    }

    fn state(&self) -> InitializerState {
        InitializerState {
            initialized: self.initialized.load(Ordering::SeqCst),
            injected: self.injected.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::dom::InMemoryDocument;
    use crate::tracker::client::{PaqQueue, PaqTracker};
    use crate::tracker::configuration::{
        EmbeddedTrackerConfiguration, ExplicitTrackerConfiguration, MatomoInitializationMode,
        MatomoTrackerConfiguration,
    };
    use crate::tracker::error::MatomoErrorCode;

    struct Fixture {
        queue: Arc<PaqQueue>,
        document: Arc<InMemoryDocument>,
    }

    impl Fixture {
        fn new() -> Self {
            let document = Arc::new(InMemoryDocument::new());
            document.append_script(document.head(), "main.js");
            Self {
                queue: Arc::new(PaqQueue::new()),
                document,
            }
        }

        fn providers(&self) -> MatomoProviders<InMemoryDocument> {
            MatomoProviders::new(
                Arc::new(PaqTracker::with_queue(self.queue.clone())),
                self.document.clone(),
            )
        }

        fn initializer(&self, config: MatomoConfiguration) -> Arc<dyn MatomoInitialization> {
            create_matomo_initializer(config.resolve().unwrap(), self.providers(), true)
        }

        fn script_sources(&self) -> Vec<String> {
            self.document
                .scripts()
                .into_iter()
                .filter_map(|attrs| attrs.get("src").cloned())
                .collect()
        }
    }

    fn explicit_config() -> MatomoConfiguration {
        MatomoConfiguration::with_tracker("https://example.com/matomo", 42u64)
    }

    #[test]
    fn auto_mode_registers_and_injects() {
        let fixture = Fixture::new();
        let initializer = fixture.initializer(explicit_config());

        initializer.initialize().unwrap();

        let commands = fixture.queue.snapshot();
        assert_eq!(fixture.queue.command_names(), vec!["setTrackerUrl", "setSiteId"]);
        assert_eq!(commands[0].args, vec![json!("https://example.com/matomo/matomo.php")]);
        assert_eq!(commands[1].args, vec![json!("42")]);
        assert_eq!(
            fixture.script_sources(),
            vec!["https://example.com/matomo/matomo.js", "main.js"]
        );
        assert_eq!(
            initializer.state(),
            InitializerState {
                initialized: true,
                injected: true
            }
        );
    }

    #[test]
    fn pre_init_tasks_run_in_order_before_registration() {
        let fixture = Fixture::new();
        let config = MatomoConfiguration {
            accept_do_not_track: true,
            require_consent: MatomoConsentMode::Cookie,
            enable_js_error_tracking: true,
            track_app_initial_load: true,
            enable_link_tracking: true,
            ..explicit_config()
        };

        fixture.initializer(config).initialize().unwrap();

        assert_eq!(
            fixture.queue.command_names(),
            vec![
                "setDoNotTrack",
                "requireCookieConsent",
                "enableJSErrorTracking",
                "trackPageView",
                "enableLinkTracking",
                "setTrackerUrl",
                "setSiteId",
            ]
        );
    }

    #[test]
    fn tracking_consent_issues_a_single_consent_call() {
        let fixture = Fixture::new();
        let config = MatomoConfiguration {
            require_consent: MatomoConsentMode::Tracking,
            ..explicit_config()
        };

        fixture.initializer(config).initialize().unwrap();

        let names = fixture.queue.command_names();
        assert_eq!(names.iter().filter(|n| *n == "requireConsent").count(), 1);
        assert!(!names.iter().any(|n| n == "requireCookieConsent"));
    }

    #[test]
    fn second_initialize_fails_without_repeating_effects() {
        let fixture = Fixture::new();
        let config = MatomoConfiguration {
            track_app_initial_load: true,
            ..explicit_config()
        };
        let initializer = fixture.initializer(config);

        initializer.initialize().unwrap();
        let commands_after_first = fixture.queue.snapshot();

        let err = initializer.initialize().unwrap_err();
        assert_eq!(err.code, MatomoErrorCode::AlreadyInitialized);
        assert_eq!(fixture.queue.snapshot(), commands_after_first);
        assert_eq!(fixture.script_sources().len(), 2);
    }

    #[test]
    fn initialize_tracker_after_auto_injection_fails() {
        let fixture = Fixture::new();
        let initializer = fixture.initializer(explicit_config());
        initializer.initialize().unwrap();

        let err = initializer
            .initialize_tracker(AutoTrackerConfiguration::single(
                MatomoTrackerConfiguration::new("https://other.example.com", 1u64),
            ))
            .unwrap_err();
        assert_eq!(err.code, MatomoErrorCode::AlreadyInjected);
    }

    #[test]
    fn deferred_mode_injects_on_initialize_tracker() {
        let fixture = Fixture::new();
        let config = MatomoConfiguration {
            mode: Some(MatomoInitializationMode::AutoDeferred),
            require_consent: MatomoConsentMode::Tracking,
            ..Default::default()
        };
        let initializer = fixture.initializer(config);

        initializer.initialize().unwrap();
        assert_eq!(fixture.queue.command_names(), vec!["requireConsent"]);
        assert_eq!(fixture.script_sources(), vec!["main.js"]);
        assert!(!initializer.state().injected);

        initializer
            .initialize_tracker(AutoTrackerConfiguration::Explicit(
                ExplicitTrackerConfiguration {
                    main: MatomoTrackerConfiguration::new("https://a.example.com/", 1u64),
                    additional: vec![
                        MatomoTrackerConfiguration::new("https://b.example.com", 2u64),
                        MatomoTrackerConfiguration::new("https://c.example.com", 3u64),
                    ],
                    script_url: Some("https://cdn.example.com/m.js".into()),
                },
            ))
            .unwrap();

        let commands = fixture.queue.snapshot();
        assert_eq!(
            fixture.queue.command_names(),
            vec!["requireConsent", "setTrackerUrl", "setSiteId", "addTracker", "addTracker"]
        );
        assert_eq!(
            commands[3].args,
            vec![json!("https://b.example.com/matomo.php"), json!("2")]
        );
        assert_eq!(
            commands[4].args,
            vec![json!("https://c.example.com/matomo.php"), json!("3")]
        );
        assert_eq!(
            fixture.script_sources(),
            vec!["https://cdn.example.com/m.js", "main.js"]
        );

        let err = initializer
            .initialize_tracker(AutoTrackerConfiguration::single(
                MatomoTrackerConfiguration::new("https://a.example.com", 1u64),
            ))
            .unwrap_err();
        assert_eq!(err.code, MatomoErrorCode::AlreadyInjected);
    }

    #[test]
    fn initialize_tracker_is_rejected_outside_deferred_mode() {
        let fixture = Fixture::new();
        let config = MatomoConfiguration {
            mode: Some(MatomoInitializationMode::Manual),
            ..Default::default()
        };
        let initializer = fixture.initializer(config);
        initializer.initialize().unwrap();

        let err = initializer
            .initialize_tracker(AutoTrackerConfiguration::single(
                MatomoTrackerConfiguration::new("https://a.example.com", 1u64),
            ))
            .unwrap_err();
        assert_eq!(err.code, MatomoErrorCode::Configuration);
        assert!(fixture.queue.snapshot().is_empty());
        assert_eq!(fixture.script_sources(), vec!["main.js"]);
    }

    #[test]
    fn embedded_configuration_issues_no_registration() {
        let fixture = Fixture::new();
        let config = MatomoConfiguration {
            script_url: Some("https://cdn.example.com/container.js".into()),
            ..Default::default()
        };

        fixture.initializer(config).initialize().unwrap();

        assert!(fixture.queue.snapshot().is_empty());
        assert_eq!(
            fixture.script_sources(),
            vec!["https://cdn.example.com/container.js", "main.js"]
        );
    }

    #[test]
    fn tracker_list_with_script_url_registers_main_tracker() {
        let fixture = Fixture::new();
        let config = MatomoConfiguration {
            script_url: Some("https://cdn.example.com/matomo.js".into()),
            trackers: Some(vec![
                MatomoTrackerConfiguration::new("https://a.example.com", 1u64),
                MatomoTrackerConfiguration::new("https://b.example.com", 2u64),
            ]),
            ..Default::default()
        };

        fixture.initializer(config).initialize().unwrap();

        assert_eq!(
            fixture.queue.command_names(),
            vec!["setTrackerUrl", "setSiteId", "addTracker"]
        );
        assert_eq!(
            fixture.queue.snapshot()[0].args,
            vec![json!("https://a.example.com/matomo.php")]
        );
        assert_eq!(
            fixture.script_sources(),
            vec!["https://cdn.example.com/matomo.js", "main.js"]
        );
    }

    #[test]
    fn embedded_without_trackers_issues_no_registration() {
        let fixture = Fixture::new();
        let config = AutoTrackerConfiguration::Embedded(EmbeddedTrackerConfiguration {
            script_url: "https://cdn.example.com/container.js".into(),
            additional: Vec::new(),
        });
        let deferred = fixture.initializer(MatomoConfiguration {
            mode: Some(MatomoInitializationMode::AutoDeferred),
            ..Default::default()
        });
        deferred.initialize_tracker(config).unwrap();

        assert!(fixture.queue.snapshot().is_empty());
        assert_eq!(fixture.script_sources().len(), 2);
    }

    #[test]
    fn missing_anchor_script_fails_before_any_tracker_call() {
        let queue = Arc::new(PaqQueue::new());
        let document = Arc::new(InMemoryDocument::new());
        let initializer = create_matomo_initializer(
            explicit_config().resolve().unwrap(),
            MatomoProviders::new(Arc::new(PaqTracker::with_queue(queue.clone())), document.clone()),
            true,
        );

        let err = initializer.initialize().unwrap_err();
        assert_eq!(err.code, MatomoErrorCode::Environment);
        assert!(queue.snapshot().is_empty());
        assert!(document.scripts().is_empty());
        assert_eq!(initializer.state(), InitializerState::default());
    }

    #[test]
    fn retry_after_missing_anchor_tracks_initial_load_once() {
        let queue = Arc::new(PaqQueue::new());
        let document = Arc::new(InMemoryDocument::new());
        let config = MatomoConfiguration {
            track_app_initial_load: true,
            ..explicit_config()
        };
        let initializer = create_matomo_initializer(
            config.resolve().unwrap(),
            MatomoProviders::new(Arc::new(PaqTracker::with_queue(queue.clone())), document.clone()),
            true,
        );

        assert!(initializer.initialize().is_err());
        assert!(queue.snapshot().is_empty());

        document.append_script(document.body(), "late.js");
        initializer.initialize().unwrap();

        assert_eq!(
            queue.command_names(),
            vec!["trackPageView", "setTrackerUrl", "setSiteId"]
        );
        assert!(initializer.state().initialized);
    }

    #[test]
    fn disabled_configuration_is_inert() {
        let fixture = Fixture::new();
        let config = MatomoConfiguration {
            disabled: true,
            track_app_initial_load: true,
            ..explicit_config()
        };
        let initializer = fixture.initializer(config);

        for _ in 0..3 {
            initializer.initialize().unwrap();
            initializer
                .initialize_tracker(AutoTrackerConfiguration::single(
                    MatomoTrackerConfiguration::new("https://a.example.com", 1u64),
                ))
                .unwrap();
        }

        assert!(fixture.queue.snapshot().is_empty());
        assert_eq!(fixture.script_sources(), vec!["main.js"]);
        assert_eq!(initializer.state(), InitializerState::default());
    }

    #[test]
    fn non_browser_platform_selects_noop() {
        let fixture = Fixture::new();
        let initializer =
            create_matomo_initializer(explicit_config().resolve().unwrap(), fixture.providers(), false);

        initializer.initialize().unwrap();
        initializer.initialize().unwrap();

        assert!(fixture.queue.snapshot().is_empty());
        assert_eq!(fixture.script_sources(), vec!["main.js"]);
    }

    #[test]
    #[allow(deprecated)]
    fn init_alias_delegates_to_initialize() {
        let fixture = Fixture::new();
        let initializer = fixture.initializer(explicit_config());

        initializer.init().unwrap();
        assert_eq!(
            initializer.init().unwrap_err().code,
            MatomoErrorCode::AlreadyInitialized
        );
    }

    #[test]
    fn provide_matomo_reports_configuration_errors_up_front() {
        let fixture = Fixture::new();
        let result = provide_matomo(MatomoConfiguration::default(), fixture.providers());
        assert_eq!(result.err().map(|err| err.code), Some(MatomoErrorCode::Configuration));
    }
}
