/// Application name, used for the user agent and default OAuth consumer key.
pub const APP_NAME: &str = "snap-poller";

/// Host every tracked repository URL must point at.
pub const GITHUB_HOST: &str = "github.com";

/// Default GitHub REST API endpoint.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Default GitHub raw-content mirror.
pub const GITHUB_RAW_URL: &str = "https://raw.githubusercontent.com";

/// Default Launchpad web service root.
pub const LAUNCHPAD_API_URL: &str = "https://api.launchpad.net/devel";

/// Launchpad account that owns every polled snap.
pub const LAUNCHPAD_OWNER: &str = "build.snapcraft.io";

/// Snaps built more recently than this are never re-triggered.
pub const DEFAULT_THRESHOLD_HOURS: i64 = 24;

/// Per-request timeout applied to both HTTP clients.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
