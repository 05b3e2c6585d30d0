use std::error::Error;
use std::sync::Arc;

use matomo_rs_sdk::dom::InMemoryDocument;
use matomo_rs_sdk::logger::{set_log_level, LogLevel};
use matomo_rs_sdk::platform::environment::matomo_config_from_env;
use matomo_rs_sdk::tracker::{
    create_matomo_initializer, MatomoConfiguration, MatomoProviders, PaqQueue, PaqTracker,
};

/// Set `MATOMO_CONFIG` to a JSON object (or a path to a JSON file) to try other configurations.
fn main() -> Result<(), Box<dyn Error>> {
    set_log_level(LogLevel::Debug);

    let config = match matomo_config_from_env()? {
        Some(config) => config,
        None => MatomoConfiguration::from_json_str(
            r#"{
                "trackerUrl": "https://analytics.example.com",
                "siteId": 1,
                "acceptDoNotTrack": true,
                "requireConsent": "cookie",
                "trackAppInitialLoad": true,
                "enableLinkTracking": true
            }"#,
        )?,
    };

    // Stand-in for the page served to the browser.
    let document = Arc::new(InMemoryDocument::new());
    document.set_title("Demo shop");
    document.append_script(document.head(), "/main.js");

    let queue = Arc::new(PaqQueue::new());
    let providers = MatomoProviders::new(
        Arc::new(PaqTracker::with_queue(queue.clone())),
        document.clone(),
    );

    let initializer = create_matomo_initializer(config.resolve()?, providers, true);
    initializer.initialize()?;

    println!("_paq:");
    for command in queue.snapshot() {
        println!("  {}", command.to_json());
    }

    println!("scripts in document order:");
    for attributes in document.scripts() {
        println!("  {attributes:?}");
    }

    if let Err(err) = initializer.initialize() {
        println!("second initialize() rejected: {err}");
    }

    Ok(())
}
