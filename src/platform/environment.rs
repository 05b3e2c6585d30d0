//! Runtime environment detection and configuration loaded from the environment.

use std::env;
use std::fs;
#[cfg(not(target_arch = "wasm32"))]
use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::router::MatomoRouterConfiguration;
use crate::tracker::error::{configuration_error, MatomoResult};
use crate::tracker::MatomoConfiguration;

const TRACKER_CONFIG_VAR: &str = "MATOMO_CONFIG";
const ROUTER_CONFIG_VAR: &str = "MATOMO_ROUTER_CONFIG";
const FORCE_ENVIRONMENT_VAR: &str = "MATOMO_FORCE_ENVIRONMENT";

/// Accepts inline JSON or a path to a JSON file.
fn parse_config_source(raw: &str) -> Option<Value> {
    if let Ok(json) = serde_json::from_str::<Value>(raw) {
        if json.is_object() {
            return Some(json);
        }
    }

    let path = treat_as_path(raw)?;
    let contents = fs::read_to_string(path).ok()?;
    serde_json::from_str::<Value>(&contents)
        .ok()
        .filter(Value::is_object)
}

#[cfg(not(target_arch = "wasm32"))]
fn treat_as_path(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if Path::new(trimmed).exists() {
        Some(trimmed.to_string())
    } else {
        None
    }
}

#[cfg(target_arch = "wasm32")]
fn treat_as_path(_raw: &str) -> Option<String> {
    None
}

fn config_from_var<T: DeserializeOwned>(name: &str) -> MatomoResult<Option<T>> {
    let Ok(raw) = env::var(name) else {
        return Ok(None);
    };
    let value = parse_config_source(&raw).ok_or_else(|| {
        configuration_error(format!("`{name}` is neither a JSON object nor a JSON file"))
    })?;
    serde_json::from_value(value)
        .map(Some)
        .map_err(|err| configuration_error(format!("Invalid `{name}`: {err}")))
}

/// Tracker configuration from `MATOMO_CONFIG`, if set.
pub fn matomo_config_from_env() -> MatomoResult<Option<MatomoConfiguration>> {
    config_from_var(TRACKER_CONFIG_VAR)
}

/// Router configuration from `MATOMO_ROUTER_CONFIG`, if set.
pub fn router_config_from_env() -> MatomoResult<Option<MatomoRouterConfiguration>> {
    config_from_var(ROUTER_CONFIG_VAR)
}

fn force_environment() -> Option<String> {
    env::var(FORCE_ENVIRONMENT_VAR)
        .ok()
        .map(|value| value.trim().to_lowercase())
}

/// Returns `true` if the runtime should behave as a browser environment.
pub fn is_browser() -> bool {
    if let Some(forced) = force_environment() {
        return forced == "browser";
    }

    #[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
    {
        use wasm_bindgen::JsCast;
        js_sys::global().dyn_into::<web_sys::Window>().is_ok()
    }

    #[cfg(not(all(target_arch = "wasm32", feature = "wasm-web")))]
    {
        false
    }
}
