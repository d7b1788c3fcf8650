// Users: directory listing, presence, profile lookup, own status.

use super::{take, take_required, RocketChat};
use crate::atoms::constants::MEMBERS_PAGE;
use crate::atoms::error::ChatResult;
use crate::atoms::types::{Presence, User, UserInfo, UserStatus};
use serde_json::json;

impl RocketChat {
    pub async fn users(&self) -> ChatResult<Vec<User>> {
        let params = [("count", MEMBERS_PAGE.to_string())];
        let mut resp = self.get("users.list", &params, "Failed to list users").await?;
        take(&mut resp, "users")
    }

    pub async fn presence(&self, user_id: &str) -> ChatResult<Presence> {
        let resp = self
            .get("users.getPresence", &[("userId", user_id.to_string())], "Failed to get presence")
            .await?;
        Ok(serde_json::from_value(resp)?)
    }

    pub async fn user_info(&self, user_id: &str) -> ChatResult<UserInfo> {
        let mut resp = self
            .get("users.info", &[("userId", user_id.to_string())], "Failed to get user info")
            .await?;
        take_required(&mut resp, "user", "users.info")
    }

    /// Set own presence and status text.
    pub async fn set_status(&self, status: UserStatus, message: &str) -> ChatResult<()> {
        let body = json!({ "status": status.as_str(), "message": message });
        self.post("users.setStatus", &body, true, "Failed to set status").await?;
        Ok(())
    }
}
