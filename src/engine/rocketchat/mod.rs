// Roost Engine — Rocket.Chat REST Client
//
// Thin typed wrapper over the `/api/v1` REST surface. Every authenticated
// call carries the `X-Auth-Token` / `X-User-Id` header pair.
//
// Module layout:
//   auth      — login, logout, register, me
//   rooms     — room list/info, history, members, channel creation
//   messages  — send/edit/delete, pins, threads, search
//   users     — user list, presence, user info, status
//
// Failure handling:
//   - 401/403 → ChatError::Auth
//   - other non-2xx, `success: false`, `status: "error"` → ChatError::Api
//   - idempotent GETs retry transient failures (429/5xx/transport)
//   - a shared circuit breaker fails fast while the server is down
//   - system messages (`t` set) are stripped from every message list

mod auth;
mod messages;
mod rooms;
mod users;

use crate::atoms::constants::{API_PREFIX, HEADER_AUTH_TOKEN, HEADER_USER_ID};
use crate::atoms::error::{ChatError, ChatResult};
use crate::atoms::traits::{ChatApi, HistoryQuery};
use crate::atoms::types::{Credentials, Message, Presence, Room, User, UserInfo, UserStatus};
use crate::engine::config::ClientConfig;
use crate::engine::http::{self, CircuitBreaker, MAX_ATTEMPTS};
use async_trait::async_trait;
use log::{debug, warn};
use parking_lot::RwLock;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use rooms::NewChannel;

pub struct RocketChat {
    http: reqwest::Client,
    api_base: String,
    credentials: RwLock<Option<Credentials>>,
    breaker: CircuitBreaker,
}

/// One failed attempt, with the server's `Retry-After` hint if any.
struct Failure {
    error: ChatError,
    retry_after: Option<u64>,
}

impl From<ChatError> for Failure {
    fn from(error: ChatError) -> Self {
        Failure { error, retry_after: None }
    }
}

impl RocketChat {
    pub fn new(config: &ClientConfig) -> ChatResult<Self> {
        let server = config.require_server()?;
        let http = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self::with_client(http, server))
    }

    pub fn with_client(http: reqwest::Client, server_url: &str) -> Self {
        RocketChat {
            http,
            api_base: format!("{}{}", server_url.trim_end_matches('/'), API_PREFIX),
            credentials: RwLock::new(None),
            breaker: CircuitBreaker::default(),
        }
    }

    pub fn with_credentials(self, credentials: Credentials) -> Self {
        *self.credentials.write() = Some(credentials);
        self
    }

    pub fn set_credentials(&self, credentials: Option<Credentials>) {
        *self.credentials.write() = credentials;
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.credentials.read().clone()
    }

    /// The authenticated user's id, if logged in.
    pub fn local_user_id(&self) -> Option<String> {
        self.credentials.read().as_ref().map(|c| c.user_id.clone())
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.api_base, endpoint.trim_start_matches('/'))
    }

    fn request(&self, method: Method, endpoint: &str, authed: bool) -> ChatResult<RequestBuilder> {
        let builder = self.http.request(method, self.url(endpoint));
        if !authed {
            return Ok(builder);
        }
        let guard = self.credentials.read();
        let creds = guard
            .as_ref()
            .ok_or_else(|| ChatError::Auth("Not logged in.".into()))?;
        Ok(builder
            .header(HEADER_AUTH_TOKEN, &creds.auth_token)
            .header(HEADER_USER_ID, &creds.user_id))
    }

    // ── Transport ──────────────────────────────────────────────────────

    /// Authenticated GET with retries.
    async fn get(&self, endpoint: &str, query: &[(&str, String)], fallback: &str) -> ChatResult<Value> {
        self.breaker.check().map_err(ChatError::Other)?;
        let mut attempt = 0;
        loop {
            let req = self.request(Method::GET, endpoint, true)?.query(query);
            match self.send_once(endpoint, req, fallback).await {
                Ok(body) => {
                    self.breaker.record_success();
                    return Ok(body);
                }
                Err(f) => {
                    let transient = f.error.is_retryable();
                    if transient {
                        self.breaker.record_failure();
                    }
                    attempt += 1;
                    if !transient || attempt >= MAX_ATTEMPTS {
                        return Err(f.error);
                    }
                    let delay = http::retry_delay(attempt - 1, f.retry_after).await;
                    warn!(
                        "[rocketchat] {} failed ({}), retry {}/{} after {:?}",
                        endpoint, f.error, attempt, MAX_ATTEMPTS - 1, delay
                    );
                }
            }
        }
    }

    /// POST with a JSON body. Never retried.
    async fn post(&self, endpoint: &str, body: &Value, authed: bool, fallback: &str) -> ChatResult<Value> {
        self.breaker.check().map_err(ChatError::Other)?;
        let req = self.request(Method::POST, endpoint, authed)?.json(body);
        match self.send_once(endpoint, req, fallback).await {
            Ok(v) => {
                self.breaker.record_success();
                Ok(v)
            }
            Err(f) => {
                if f.error.is_retryable() {
                    self.breaker.record_failure();
                }
                Err(f.error)
            }
        }
    }

    async fn send_once(&self, endpoint: &str, req: RequestBuilder, fallback: &str) -> Result<Value, Failure> {
        debug!("[rocketchat] -> {}", endpoint);
        let resp = req.send().await.map_err(ChatError::from)?;
        let status = resp.status();
        let retry_after = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(http::parse_retry_after);
        let text = resp.text().await.map_err(ChatError::from)?;
        let body: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(v) => v,
                Err(e) if status.is_success() => return Err(ChatError::from(e).into()),
                Err(_) => Value::Null,
            }
        };
        check_envelope(endpoint, status, body, fallback)
            .map_err(|error| Failure { error, retry_after })
    }
}

// ── Envelope handling ──────────────────────────────────────────────────

/// Server-provided error text: `error`, then `message`, then `errorType`.
fn error_text(body: &Value) -> Option<String> {
    ["error", "message", "errorType"]
        .iter()
        .find_map(|k| body.get(*k).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn check_envelope(endpoint: &str, status: StatusCode, body: Value, fallback: &str) -> ChatResult<Value> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        let msg = error_text(&body).unwrap_or_else(|| "You must be logged in to do this.".into());
        return Err(ChatError::Auth(msg));
    }
    if !status.is_success() {
        let msg = error_text(&body).unwrap_or_else(|| fallback.to_string());
        return Err(ChatError::api_status(endpoint, status.as_u16(), msg));
    }
    let failed = body.get("success").and_then(Value::as_bool) == Some(false)
        || body.get("status").and_then(Value::as_str) == Some("error");
    if failed {
        let msg = error_text(&body).unwrap_or_else(|| fallback.to_string());
        return Err(ChatError::api(endpoint, msg));
    }
    Ok(body)
}

/// Take `body[key]` as `T`; a missing or null field yields `T::default()`.
fn take<T: DeserializeOwned + Default>(body: &mut Value, key: &str) -> ChatResult<T> {
    match body.get_mut(key).map(Value::take) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(v) => Ok(serde_json::from_value(v)?),
    }
}

/// Take `body[key]` as `T`; a missing field is an API error.
fn take_required<T: DeserializeOwned>(body: &mut Value, key: &str, endpoint: &str) -> ChatResult<T> {
    match body.get_mut(key).map(Value::take) {
        None | Some(Value::Null) => Err(ChatError::api(endpoint, format!("response is missing '{}'", key))),
        Some(v) => Ok(serde_json::from_value(v)?),
    }
}

/// Message lists: deserialize, then drop system messages.
fn take_messages(body: &mut Value, key: &str) -> ChatResult<Vec<Message>> {
    let messages: Vec<Message> = take(body, key)?;
    Ok(crate::atoms::types::without_system(messages))
}

fn page(count: u32, offset: u32) -> [(&'static str, String); 2] {
    [("count", count.to_string()), ("offset", offset.to_string())]
}

// ── ChatApi ────────────────────────────────────────────────────────────

#[async_trait]
impl ChatApi for RocketChat {
    async fn rooms(&self) -> ChatResult<Vec<Room>> {
        RocketChat::rooms(self).await
    }

    async fn history(&self, room: &Room, query: &HistoryQuery) -> ChatResult<Vec<Message>> {
        RocketChat::history(self, room, query).await
    }

    async fn pinned_messages(&self, room_id: &str, count: u32, offset: u32) -> ChatResult<Vec<Message>> {
        RocketChat::pinned_messages(self, room_id, count, offset).await
    }

    async fn threads(&self, room_id: &str, count: u32, offset: u32) -> ChatResult<Vec<Message>> {
        RocketChat::threads(self, room_id, count, offset).await
    }

    async fn thread_messages(&self, tmid: &str, count: u32, offset: u32) -> ChatResult<Vec<Message>> {
        RocketChat::thread_messages(self, tmid, count, offset).await
    }

    async fn search(&self, room_id: &str, text: &str, count: u32, offset: u32) -> ChatResult<Vec<Message>> {
        RocketChat::search(self, room_id, text, count, offset).await
    }

    async fn members(&self, room: &Room) -> ChatResult<Vec<User>> {
        RocketChat::members(self, room).await
    }

    async fn users(&self) -> ChatResult<Vec<User>> {
        RocketChat::users(self).await
    }

    async fn presence(&self, user_id: &str) -> ChatResult<Presence> {
        RocketChat::presence(self, user_id).await
    }

    async fn user_info(&self, user_id: &str) -> ChatResult<UserInfo> {
        RocketChat::user_info(self, user_id).await
    }

    async fn set_status(&self, status: UserStatus, message: &str) -> ChatResult<()> {
        RocketChat::set_status(self, status, message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::error::ErrorKind;
    use serde_json::json;

    fn client() -> RocketChat {
        RocketChat::with_client(reqwest::Client::new(), "https://chat.example.com/")
    }

    #[test]
    fn urls_are_joined_under_api_prefix() {
        let rc = client();
        assert_eq!(rc.api_base(), "https://chat.example.com/api/v1");
        assert_eq!(rc.url("/rooms.get"), "https://chat.example.com/api/v1/rooms.get");
        assert_eq!(rc.url("chat.search"), "https://chat.example.com/api/v1/chat.search");
    }

    #[test]
    fn authed_request_requires_credentials() {
        let rc = client();
        let err = rc.request(Method::GET, "rooms.get", true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert!(rc.request(Method::POST, "login", false).is_ok());
    }

    #[test]
    fn credentials_attach_headers() {
        let rc = client().with_credentials(Credentials {
            auth_token: "tok".into(),
            user_id: "me".into(),
        });
        assert_eq!(rc.local_user_id().as_deref(), Some("me"));
        let req = rc.request(Method::GET, "rooms.get", true).unwrap().build().unwrap();
        assert_eq!(req.headers()[HEADER_AUTH_TOKEN], "tok");
        assert_eq!(req.headers()[HEADER_USER_ID], "me");
    }

    #[test]
    fn envelope_maps_auth_failures() {
        let err = check_envelope("me", StatusCode::UNAUTHORIZED, json!({"status": "error", "message": "You must be logged in to do this."}), "x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
    }

    #[test]
    fn envelope_maps_error_payloads() {
        let err = check_envelope("chat.update", StatusCode::OK, json!({"success": false, "error": "not-allowed"}), "Failed to edit message").unwrap_err();
        assert_eq!(err.to_string(), "API error: chat.update: not-allowed");

        let err = check_envelope("chat.delete", StatusCode::OK, json!({"success": false}), "Failed to delete message").unwrap_err();
        assert_eq!(err.to_string(), "API error: chat.delete: Failed to delete message");

        let err = check_envelope("rooms.get", StatusCode::BAD_GATEWAY, Value::Null, "Failed to get rooms").unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn envelope_passes_success() {
        let body = check_envelope("rooms.get", StatusCode::OK, json!({"success": true, "update": []}), "x").unwrap();
        assert_eq!(body["update"], json!([]));
    }

    #[test]
    fn take_messages_filters_system_entries() {
        let mut body = json!({"messages": [
            {"_id": "1", "msg": "hi"},
            {"_id": "2", "msg": "", "t": "ul"}
        ]});
        let msgs = take_messages(&mut body, "messages").unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].id, "1");

        let mut empty = json!({"success": true});
        assert!(take_messages(&mut empty, "messages").unwrap().is_empty());
    }

    #[test]
    fn take_required_reports_missing_field() {
        let mut body = json!({"success": true});
        let err = take_required::<Message>(&mut body, "message", "chat.sendMessage").unwrap_err();
        assert!(err.to_string().contains("missing 'message'"));
    }
}
