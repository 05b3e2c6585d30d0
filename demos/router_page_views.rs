use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use matomo_rs_sdk::dom::InMemoryDocument;
use matomo_rs_sdk::router::{MatomoRouter, MatomoRouterConfiguration, NavigationEnd};
use matomo_rs_sdk::tracker::{MatomoConfiguration, PaqQueue, PaqTracker};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let tracker_config = MatomoConfiguration {
        enable_link_tracking: true,
        ..MatomoConfiguration::with_tracker("https://analytics.example.com", 1u64)
    }
    .resolve()?;

    let router_config = MatomoRouterConfiguration::from_json_str(
        r#"{ "delay": 100, "exclude": ["^/admin", "login"] }"#,
    )?
    .resolve(&tracker_config)?;

    let document = Arc::new(InMemoryDocument::new());
    document.set_base_href("/shop/");
    document.set_title("Catalog");

    let queue = Arc::new(PaqQueue::new());
    let router = MatomoRouter::with_runtime_scheduler(
        router_config,
        Arc::new(PaqTracker::with_queue(queue.clone())),
        document.clone(),
    );

    let navigations = futures::stream::iter(vec![
        NavigationEnd::new("/products"),
        NavigationEnd::new("/admin/orders"),
        NavigationEnd::new("/account/login"),
        NavigationEnd::new("/cart"),
    ]);
    router.track_navigations(navigations).await;

    // Delayed page views fire once the router delay has elapsed.
    tokio::time::sleep(Duration::from_millis(250)).await;

    for command in queue.snapshot() {
        println!("{}", command.to_json());
    }

    Ok(())
}
