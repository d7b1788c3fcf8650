// Session lifecycle: login, logout, self-registration, `me`.

use super::{take_required, RocketChat};
use crate::atoms::error::{ChatError, ChatResult};
use crate::atoms::types::{Credentials, Session, UserInfo};
use log::info;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
struct LoginData {
    #[serde(rename = "authToken")]
    auth_token: String,
    #[serde(rename = "userId")]
    user_id: String,
    #[serde(default)]
    me: Option<UserInfo>,
}

impl RocketChat {
    /// Exchange username/email + password for a token pair. On success the
    /// client keeps the credentials for subsequent calls.
    pub async fn login(&self, user: &str, password: &str) -> ChatResult<Session> {
        if user.trim().is_empty() || password.is_empty() {
            return Err(ChatError::Auth("Username and password are required.".into()));
        }
        let body = json!({ "user": user.trim(), "password": password });
        let mut resp = self.post("login", &body, false, "Login failed").await?;

        if resp.get("status").and_then(Value::as_str) != Some("success") {
            return Err(ChatError::Auth("Login failed".into()));
        }
        let data: LoginData = take_required(&mut resp, "data", "login")?;
        let credentials = Credentials {
            auth_token: data.auth_token,
            user_id: data.user_id,
        };
        let me = data.me.unwrap_or_else(|| UserInfo {
            id: credentials.user_id.clone(),
            ..Default::default()
        });
        self.set_credentials(Some(credentials.clone()));
        info!("[rocketchat] Logged in as {}", me.username.as_deref().unwrap_or(&me.id));
        Ok(Session { credentials, me })
    }

    /// Invalidate the token server-side and forget it locally. Local state
    /// is cleared even when the server call fails.
    pub async fn logout(&self) -> ChatResult<()> {
        let result = self.post("logout", &json!({}), true, "Logout failed").await;
        self.set_credentials(None);
        result.map(|_| ())
    }

    pub async fn register(&self, name: &str, email: &str, username: &str, password: &str) -> ChatResult<UserInfo> {
        let body = json!({
            "name": name,
            "email": email,
            "username": username,
            "pass": password,
        });
        let mut resp = self.post("users.register", &body, false, "Registration failed").await?;
        take_required(&mut resp, "user", "users.register")
    }

    /// The authenticated user's own record. Also serves to validate a
    /// restored session.
    pub async fn me(&self) -> ChatResult<UserInfo> {
        let resp = self.get("me", &[], "Failed to load profile").await?;
        Ok(serde_json::from_value(resp)?)
    }
}
