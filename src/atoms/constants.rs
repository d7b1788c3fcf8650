// ── Roost Atoms: Constants ─────────────────────────────────────────────────
// All named constants for the crate live here.

// ── REST surface ─────────────────────────────────────────────────────────
/// Path appended to the server URL for every REST call.
pub const API_PREFIX: &str = "/api/v1";
pub const HEADER_AUTH_TOKEN: &str = "X-Auth-Token";
pub const HEADER_USER_ID: &str = "X-User-Id";

// ── Polling ──────────────────────────────────────────────────────────────
/// Interval between snapshot fetches for the active room.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;
/// Messages requested per history poll.
pub const DEFAULT_HISTORY_COUNT: u32 = 50;
/// Team roster refresh cadence.
pub const TEAM_REFRESH_SECS: u64 = 30;

// ── Insights ─────────────────────────────────────────────────────────────
// Bounded fan-out keeps a workspace-wide report from hammering the server.
pub const INSIGHTS_ROOM_CAP: usize = 20;
pub const INSIGHTS_HISTORY_COUNT: u32 = 100;
pub const CHANNEL_INSIGHTS_HISTORY_COUNT: u32 = 1000;
pub const TOP_CONTRIBUTORS: usize = 10;
pub const TOP_CHANNELS: usize = 10;
pub const CHANNEL_TOP_USERS: usize = 5;
pub const SEARCH_TOP_N: usize = 5;
pub const HOURS_PER_DAY: usize = 24;

// ── Search / dashboards ──────────────────────────────────────────────────
pub const SEARCH_ROOM_CAP: usize = 20;
/// Results requested per room during a global search.
pub const GLOBAL_SEARCH_PER_ROOM: u32 = 10;
pub const ROOM_SEARCH_COUNT: u32 = 100;
pub const DASHBOARD_PAGE: u32 = 100;
pub const MEMBERS_PAGE: u32 = 1000;

// ── Preferences ──────────────────────────────────────────────────────────
pub const COMMAND_HISTORY_CAP: usize = 50;
pub const PREF_KEY_DND: &str = "prefs.dnd";
pub const PREF_KEY_COMMAND_HISTORY: &str = "prefs.command_history";
pub const PREF_KEY_SESSION: &str = "session";

// ── Status ───────────────────────────────────────────────────────────────
/// Status message sent alongside `busy` when do-not-disturb is switched on.
pub const DND_STATUS_MESSAGE: &str = "DND";
