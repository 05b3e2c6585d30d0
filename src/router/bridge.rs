//! Mirrors router navigations into Matomo page views.

use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};

use crate::dom::Document;
use crate::platform::scheduler::{MaybeSendSync, RuntimeScheduler, ScheduledTask, Scheduler};
use crate::router::configuration::{InternalRouterConfiguration, TrackingDelay};
use crate::router::LOGGER;
use crate::tracker::MatomoTracker;

/// Emitted by the router once a navigation has settled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationEnd {
    /// Target URL after redirects, relative to the application base.
    pub url: String,
}

impl NavigationEnd {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Joins the `<base href>` and a router URL without doubling or dropping the separator.
pub fn join_with_base_href(base_href: &str, url: &str) -> String {
    let base = base_href.trim_end_matches('/');
    if base.is_empty() {
        return url.to_string();
    }
    if url.is_empty() {
        return format!("{base}/");
    }
    if url.starts_with('/') {
        format!("{base}{url}")
    } else {
        format!("{base}/{url}")
    }
}

pub struct MatomoRouter<D: Document> {
    config: InternalRouterConfiguration,
    tracker: Arc<dyn MatomoTracker>,
    document: Arc<D>,
    scheduler: Arc<dyn Scheduler>,
}

impl<D> MatomoRouter<D>
where
    D: Document + MaybeSendSync + 'static,
{
    pub fn new(
        config: InternalRouterConfiguration,
        tracker: Arc<dyn MatomoTracker>,
        document: Arc<D>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            config,
            tracker,
            document,
            scheduler,
        }
    }

    /// Router bridge driven by the platform async runtime.
    pub fn with_runtime_scheduler(
        config: InternalRouterConfiguration,
        tracker: Arc<dyn MatomoTracker>,
        document: Arc<D>,
    ) -> Self {
        Self::new(config, tracker, document, Arc::new(RuntimeScheduler))
    }

    pub fn config(&self) -> &InternalRouterConfiguration {
        &self.config
    }

    /// Consumes navigation events until the stream ends.
    pub async fn track_navigations<S>(&self, events: S)
    where
        S: Stream<Item = NavigationEnd>,
    {
        futures::pin_mut!(events);
        while let Some(event) = events.next().await {
            self.on_navigation(&event);
        }
    }

    /// Handles one navigation. Returns `false` when the URL is excluded.
    ///
    /// Pending page views from earlier navigations are not cancelled; with a positive delay,
    /// rapid navigations each produce their own page view.
    pub fn on_navigation(&self, event: &NavigationEnd) -> bool {
        if self.config.exclude.is_excluded(&event.url) {
            LOGGER.debug(format!("navigation to {} is excluded", event.url));
            return false;
        }

        let url = event.url.clone();
        let tracker = self.tracker.clone();
        let document = self.document.clone();
        let options = PageViewOptions {
            prepend_base_href: self.config.prepend_base_href,
            use_page_title: self.config.use_page_title,
            enable_link_tracking: self.config.enable_link_tracking,
        };
        let track = move || track_page_view(tracker.as_ref(), document.as_ref(), &url, options);

        match self.config.delay {
            TrackingDelay::Synchronous => track(),
            TrackingDelay::NextTurn => self.schedule(Duration::ZERO, Box::new(track)),
            TrackingDelay::After(delay) => self.schedule(delay, Box::new(track)),
        }
        true
    }

    fn schedule(&self, delay: Duration, task: ScheduledTask) {
        LOGGER.debug(format!("page view scheduled in {}ms", delay.as_millis()));
        self.scheduler.schedule(delay, task);
    }
}

#[derive(Clone, Copy)]
struct PageViewOptions {
    prepend_base_href: bool,
    use_page_title: bool,
    enable_link_tracking: bool,
}

/// Base href and title are read here, when the page view actually fires.
fn track_page_view<D: Document>(
    tracker: &dyn MatomoTracker,
    document: &D,
    url: &str,
    options: PageViewOptions,
) {
    let page_url = match document.base_href() {
        Some(base_href) if options.prepend_base_href => join_with_base_href(&base_href, url),
        _ => url.to_string(),
    };
    let title = if options.use_page_title {
        document.title()
    } else {
        None
    };

    tracker.set_custom_url(&page_url);
    tracker.track_page_view(title.as_deref());

    if options.enable_link_tracking {
        tracker.enable_link_tracking();
    }
}
