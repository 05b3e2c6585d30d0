//! Tracker client capability and the default `_paq` command queue implementation.
//!
//! The Matomo script reads commands from a global `_paq` array that may be filled before the
//! script has loaded. [`PaqTracker`] pushes commands into a [`PaqQueue`]; in a browser with the
//! `wasm-web` feature the shared queue forwards them to `window._paq.push` instead of keeping them.

use std::sync::{Arc, LazyLock, Mutex};

use serde_json::{json, Value};

/// Operations the initializer and the router bridge issue against the Matomo client.
pub trait MatomoTracker: Send + Sync {
    fn set_tracker_url(&self, url: &str);
    fn set_site_id(&self, site_id: &str);
    fn add_tracker(&self, url: &str, site_id: &str);
    fn set_do_not_track(&self, enabled: bool);
    fn require_cookie_consent(&self);
    fn require_consent(&self);
    fn enable_js_error_tracking(&self);
    fn track_page_view(&self, title: Option<&str>);
    fn enable_link_tracking(&self);
    fn set_custom_url(&self, url: &str);
}

/// One `_paq` entry, e.g. `["setSiteId", "42"]`.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackerCommand {
    pub name: String,
    pub args: Vec<Value>,
}

impl TrackerCommand {
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    pub fn to_json(&self) -> Value {
        let mut entry = Vec::with_capacity(self.args.len() + 1);
        entry.push(Value::String(self.name.clone()));
        entry.extend(self.args.iter().cloned());
        Value::Array(entry)
    }
}

#[derive(Debug, Default)]
pub struct PaqQueue {
    commands: Mutex<Vec<TrackerCommand>>,
    mirror_to_window: bool,
}

impl PaqQueue {
    /// Queue that only records commands in memory.
    pub fn new() -> Self {
        Self::default()
    }

    fn mirrored() -> Self {
        Self {
            commands: Mutex::new(Vec::new()),
            mirror_to_window: true,
        }
    }

    /// Makes sure the global `_paq` array exists so the Matomo script picks up queued commands.
    pub fn ensure_global(&self) {
        if self.mirror_to_window {
            window_paq::ensure();
        }
    }

    /// Hands `command` to `window._paq` when mirroring and a window is present. Only commands
    /// that no window received are kept in memory.
    pub fn push(&self, command: TrackerCommand) {
        if self.mirror_to_window && window_paq::push(&command.to_json()) {
            return;
        }
        self.commands.lock().unwrap().push(command);
    }

    pub fn snapshot(&self) -> Vec<TrackerCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub fn command_names(&self) -> Vec<String> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .map(|command| command.name.clone())
            .collect()
    }

    pub fn reset(&self) {
        self.commands.lock().unwrap().clear();
    }
}

/// Process-wide `_paq` queue.
#[derive(Clone, Debug)]
pub struct GlobalPaqQueue(Arc<PaqQueue>);

impl GlobalPaqQueue {
    pub fn shared() -> Self {
        static INSTANCE: LazyLock<Arc<PaqQueue>> = LazyLock::new(|| Arc::new(PaqQueue::mirrored()));
        Self(INSTANCE.clone())
    }

    pub fn inner(&self) -> &PaqQueue {
        &self.0
    }

    pub fn into_arc(self) -> Arc<PaqQueue> {
        self.0
    }
}

/// Default tracker client writing to a `_paq` queue.
#[derive(Clone, Debug)]
pub struct PaqTracker {
    queue: Arc<PaqQueue>,
}

impl PaqTracker {
    /// Tracker bound to the process-wide queue.
    pub fn shared() -> Self {
        Self::with_queue(GlobalPaqQueue::shared().into_arc())
    }

    pub fn with_queue(queue: Arc<PaqQueue>) -> Self {
        Self { queue }
    }

    pub fn queue(&self) -> &PaqQueue {
        &self.queue
    }

    fn push(&self, name: &str, args: Vec<Value>) {
        self.queue.push(TrackerCommand::new(name, args));
    }
}

impl MatomoTracker for PaqTracker {
    fn set_tracker_url(&self, url: &str) {
        self.push("setTrackerUrl", vec![json!(url)]);
    }

    fn set_site_id(&self, site_id: &str) {
        self.push("setSiteId", vec![json!(site_id)]);
    }

    fn add_tracker(&self, url: &str, site_id: &str) {
        self.push("addTracker", vec![json!(url), json!(site_id)]);
    }

    fn set_do_not_track(&self, enabled: bool) {
        self.push("setDoNotTrack", vec![json!(enabled)]);
    }

    fn require_cookie_consent(&self) {
        self.push("requireCookieConsent", Vec::new());
    }

    fn require_consent(&self) {
        self.push("requireConsent", Vec::new());
    }

    fn enable_js_error_tracking(&self) {
        self.push("enableJSErrorTracking", Vec::new());
    }

    fn track_page_view(&self, title: Option<&str>) {
        match title {
            Some(title) => self.push("trackPageView", vec![json!(title)]),
            None => self.push("trackPageView", Vec::new()),
        }
    }

    fn enable_link_tracking(&self) {
        self.push("enableLinkTracking", vec![json!(true)]);
    }

    fn set_custom_url(&self, url: &str) {
        self.push("setCustomUrl", vec![json!(url)]);
    }
}

#[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
mod window_paq {
    use serde_json::Value;
    use wasm_bindgen::{JsCast, JsValue};

    use crate::tracker::constants::PAQ_GLOBAL_NAME;
    use crate::tracker::LOGGER;

    /// Current `_paq`. Before `matomo.js` loads it is an array; afterwards the script swaps it
    /// for an object exposing only `push`.
    fn current_paq() -> Option<JsValue> {
        let global = js_sys::global();
        let key = JsValue::from_str(PAQ_GLOBAL_NAME);
        let value = js_sys::Reflect::get(&global, &key).ok()?;
        if value.is_null() || value.is_undefined() {
            let array = js_sys::Array::new();
            js_sys::Reflect::set(&global, &key, &array).ok()?;
            return Some(array.into());
        }
        Some(value)
    }

    pub(super) fn ensure() {
        let _ = current_paq();
    }

    pub(super) fn push(entry: &Value) -> bool {
        let Some(paq) = current_paq() else {
            return false;
        };
        let Some(push) = js_sys::Reflect::get(&paq, &JsValue::from_str("push"))
            .ok()
            .and_then(|push| push.dyn_into::<js_sys::Function>().ok())
        else {
            LOGGER.warn(format!("`{PAQ_GLOBAL_NAME}` has no push function"));
            return false;
        };
        let Ok(serialized) = serde_json::to_string(entry) else {
            return false;
        };
        let Ok(value) = js_sys::JSON::parse(&serialized) else {
            return false;
        };
        match push.call1(&paq, &value) {
            Ok(_) => true,
            Err(err) => {
                LOGGER.warn(format!("`{PAQ_GLOBAL_NAME}.push` failed: {err:?}"));
                false
            }
        }
    }
}

#[cfg(not(all(target_arch = "wasm32", feature = "wasm-web")))]
mod window_paq {
    use serde_json::Value;

    pub(super) fn ensure() {}

    pub(super) fn push(_entry: &Value) -> bool {
        false
    }
}
