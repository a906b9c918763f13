use std::time::Duration;

// Backend the dashboard talks to when nothing else is configured.
pub const DEFAULT_API_BASE: &str = "http://localhost:3000";

// Same per-request timeout the dashboard's HTTP client used.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// Environment overrides
pub const API_BASE_ENV: &str = "TASKDESK_API_BASE";
pub const LOG_ENV: &str = "TASKDESK_LOG";

// Session storage under the platform config dir
pub const CONFIG_DIR_NAME: &str = "taskdesk";
pub const AUTH_FILE_NAME: &str = "auth.json";
