// Roost Engine — Client Configuration
//
// Loaded from TOML (`<config_dir>/roost/config.toml` by default), then
// overridden by environment variables:
//   ROOST_SERVER_URL            — server base URL
//   ROOST_POLL_INTERVAL_SECS    — active-room poll cadence
//
// Security:
//   - HTTPS enforced for remote hosts: `http://` URLs are coerced to
//     `https://` unless the host is loopback (local dev servers)
//   - Non-http(s) schemes are rejected

use crate::atoms::constants::*;
use crate::atoms::error::{ChatError, ChatResult};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_SERVER_URL: &str = "ROOST_SERVER_URL";
const ENV_POLL_INTERVAL: &str = "ROOST_POLL_INTERVAL_SECS";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Chat server URL (e.g. "https://chat.example.com")
    pub server_url: String,
    pub poll_interval_secs: u64,
    /// Messages per history poll.
    pub history_count: u32,
    pub insights_room_cap: usize,
    pub insights_history_count: u32,
    pub channel_history_count: u32,
    pub search_room_cap: usize,
    pub request_timeout_secs: u64,
    /// Preference database; defaults to `<data_dir>/roost/roost.db`.
    pub db_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            server_url: String::new(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            history_count: DEFAULT_HISTORY_COUNT,
            insights_room_cap: INSIGHTS_ROOM_CAP,
            insights_history_count: INSIGHTS_HISTORY_COUNT,
            channel_history_count: CHANNEL_INSIGHTS_HISTORY_COUNT,
            search_room_cap: SEARCH_ROOM_CAP,
            request_timeout_secs: 30,
            db_path: None,
        }
    }
}

impl ClientConfig {
    /// Load from `path` (or the default location), apply env overrides and
    /// normalise the server URL. A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> ChatResult<Self> {
        let path = path.map(Path::to_path_buf).or_else(default_config_path);
        let mut config = match path {
            Some(p) if p.exists() => {
                debug!("[config] Loading {:?}", p);
                let raw = std::fs::read_to_string(&p)?;
                Self::from_toml(&raw)?
            }
            _ => ClientConfig::default(),
        };
        config.apply_env(|k| std::env::var(k).ok());
        if !config.server_url.is_empty() {
            config.server_url = normalize_server_url(&config.server_url)?;
        }
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> ChatResult<Self> {
        toml::from_str(raw).map_err(|e| ChatError::Config(format!("Parse config: {}", e)))
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_SERVER_URL).filter(|v| !v.trim().is_empty()) {
            self.server_url = url;
        }
        if let Some(raw) = lookup(ENV_POLL_INTERVAL) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.poll_interval_secs = secs,
                _ => warn!("[config] Ignoring invalid {}={:?}", ENV_POLL_INTERVAL, raw),
            }
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(default_db_path)
    }

    pub fn require_server(&self) -> ChatResult<&str> {
        if self.server_url.is_empty() {
            return Err(ChatError::Config(format!(
                "Server URL is required (set server_url in config.toml or {}).",
                ENV_SERVER_URL
            )));
        }
        Ok(&self.server_url)
    }
}

// ── Paths ──────────────────────────────────────────────────────────────

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("roost").join("config.toml"))
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("roost")
        .join("roost.db")
}

// ── URL normalisation ──────────────────────────────────────────────────

/// Normalize the server URL:
/// - Strips whitespace and trailing slashes
/// - Coerces `http://` → `https://` for non-loopback hosts, with a warning
/// - Adds `https://` if no scheme is present
/// - Rejects URLs with non-http(s) schemes
pub fn normalize_server_url(raw: &str) -> ChatResult<String> {
    let url = raw.trim().trim_end_matches('/');
    if url.is_empty() {
        return Err(ChatError::Config("Server URL is required.".into()));
    }

    if let Some(rest) = url.strip_prefix("http://") {
        if is_loopback(rest) {
            return Ok(url.to_string());
        }
        warn!("[config] Coerced server URL from http:// to https://");
        return Ok(format!("https://{}", rest));
    }

    if url.starts_with("https://") {
        return Ok(url.to_string());
    }

    if let Some(pos) = url.find("://") {
        return Err(ChatError::Config(format!(
            "Unsupported URL scheme '{}://'. Use https:// for your chat server.",
            &url[..pos]
        )));
    }

    if is_loopback(url) {
        return Ok(format!("http://{}", url));
    }
    warn!("[config] No URL scheme provided, assuming https://{}", url);
    Ok(format!("https://{}", url))
}

fn is_loopback(host_and_path: &str) -> bool {
    let host = host_and_path.split(['/', ':']).next().unwrap_or("");
    matches!(host, "localhost" | "127.0.0.1") || host_and_path.starts_with("[::1]")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn normalize_coerces_remote_http() {
        assert_eq!(normalize_server_url("http://chat.example.com/").unwrap(), "https://chat.example.com");
        assert_eq!(normalize_server_url(" chat.example.com ").unwrap(), "https://chat.example.com");
        assert_eq!(normalize_server_url("https://chat.example.com").unwrap(), "https://chat.example.com");
    }

    #[test]
    fn normalize_keeps_loopback_http() {
        assert_eq!(normalize_server_url("http://localhost:3000/").unwrap(), "http://localhost:3000");
        assert_eq!(normalize_server_url("127.0.0.1:3000").unwrap(), "http://127.0.0.1:3000");
        assert_eq!(normalize_server_url("http://[::1]:3000").unwrap(), "http://[::1]:3000");
    }

    #[test]
    fn normalize_rejects_other_schemes() {
        assert!(normalize_server_url("ftp://chat.example.com").is_err());
        assert!(normalize_server_url("   ").is_err());
    }

    #[test]
    fn toml_fills_defaults() {
        let cfg = ClientConfig::from_toml("server_url = \"https://chat.example.com\"\npoll_interval_secs = 5\n").unwrap();
        assert_eq!(cfg.server_url, "https://chat.example.com");
        assert_eq!(cfg.poll_interval_secs, 5);
        assert_eq!(cfg.insights_room_cap, INSIGHTS_ROOM_CAP);
        assert_eq!(cfg.history_count, DEFAULT_HISTORY_COUNT);
    }

    #[test]
    fn env_overrides_file_values() {
        let mut cfg = ClientConfig::default();
        let env: HashMap<&str, &str> = [
            (ENV_SERVER_URL, "https://env.example.com"),
            (ENV_POLL_INTERVAL, "7"),
        ]
        .into_iter()
        .collect();
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.server_url, "https://env.example.com");
        assert_eq!(cfg.poll_interval(), Duration::from_secs(7));
    }

    #[test]
    fn invalid_env_interval_is_ignored() {
        let mut cfg = ClientConfig::default();
        cfg.apply_env(|k| (k == ENV_POLL_INTERVAL).then(|| "0".to_string()));
        assert_eq!(cfg.poll_interval_secs, DEFAULT_POLL_INTERVAL_SECS);
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server_url = \"http://chat.example.com\"").unwrap();
        writeln!(file, "search_room_cap = 4").unwrap();
        let cfg = ClientConfig::load(Some(file.path())).unwrap();
        assert_eq!(cfg.search_room_cap, 4);
        // Env may override the URL on a developer machine; only check the
        // coercion when it was not overridden.
        if std::env::var(ENV_SERVER_URL).is_err() {
            assert_eq!(cfg.server_url, "https://chat.example.com");
        }
    }
}
