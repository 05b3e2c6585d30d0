pub const TRACKER_LOGGER_NAME: &str = "@ngx-matomo/tracker";
pub const ROUTER_LOGGER_NAME: &str = "@ngx-matomo/router";

/// Endpoint appended to a tracker base URL when no explicit suffix is configured.
pub const DEFAULT_TRACKER_SUFFIX: &str = "matomo.php";
/// Script appended to the main tracker base URL when no script URL is configured.
pub const DEFAULT_SCRIPT_SUFFIX: &str = "matomo.js";
/// Name of the global command queue read by the Matomo script.
pub const PAQ_GLOBAL_NAME: &str = "_paq";
