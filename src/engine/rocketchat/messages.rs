// Message writes, pins, threads and per-room search.

use super::{page, take, take_messages, take_required, RocketChat};
use crate::atoms::error::{ChatError, ChatResult};
use crate::atoms::types::Message;
use serde_json::json;

fn require_id(id: &str, what: &str) -> ChatResult<()> {
    if id.trim().is_empty() {
        return Err(ChatError::Other(format!("Invalid {}", what)));
    }
    Ok(())
}

impl RocketChat {
    // ── Writes ─────────────────────────────────────────────────────────

    pub async fn send_message(&self, room_id: &str, text: &str) -> ChatResult<Message> {
        self.post_message(room_id, text, None).await
    }

    pub async fn reply_in_thread(&self, room_id: &str, tmid: &str, text: &str) -> ChatResult<Message> {
        require_id(tmid, "thread id")?;
        self.post_message(room_id, text, Some(tmid)).await
    }

    async fn post_message(&self, room_id: &str, text: &str, tmid: Option<&str>) -> ChatResult<Message> {
        require_id(room_id, "roomId")?;
        if text.trim().is_empty() {
            return Err(ChatError::Other("Message text is empty.".into()));
        }
        let mut message = json!({ "rid": room_id, "msg": text });
        if let Some(tmid) = tmid {
            message["tmid"] = json!(tmid);
        }
        let mut resp = self
            .post("chat.sendMessage", &json!({ "message": message }), true, "Failed to send message")
            .await?;
        take_required(&mut resp, "message", "chat.sendMessage")
    }

    pub async fn edit_message(&self, room_id: &str, msg_id: &str, text: &str) -> ChatResult<Message> {
        require_id(msg_id, "messageId")?;
        let body = json!({ "roomId": room_id, "msgId": msg_id, "text": text });
        let mut resp = self.post("chat.update", &body, true, "Failed to edit message").await?;
        take_required(&mut resp, "message", "chat.update")
    }

    pub async fn delete_message(&self, room_id: &str, msg_id: &str) -> ChatResult<()> {
        require_id(msg_id, "messageId")?;
        let body = json!({ "roomId": room_id, "msgId": msg_id });
        self.post("chat.delete", &body, true, "Failed to delete message").await?;
        Ok(())
    }

    pub async fn pin_message(&self, msg_id: &str) -> ChatResult<()> {
        require_id(msg_id, "messageId")?;
        self.post("chat.pinMessage", &json!({ "messageId": msg_id }), true, "Failed to pin message")
            .await?;
        Ok(())
    }

    pub async fn unpin_message(&self, msg_id: &str) -> ChatResult<()> {
        require_id(msg_id, "messageId")?;
        self.post("chat.unPinMessage", &json!({ "messageId": msg_id }), true, "Failed to unpin message")
            .await?;
        Ok(())
    }

    // ── Reads ──────────────────────────────────────────────────────────

    pub async fn pinned_messages(&self, room_id: &str, count: u32, offset: u32) -> ChatResult<Vec<Message>> {
        let mut params = vec![("roomId", room_id.to_string())];
        params.extend(page(count, offset));
        let mut resp = self
            .get("chat.getPinnedMessages", &params, "Failed to get pinned messages")
            .await?;
        take_messages(&mut resp, "messages")
    }

    /// Thread parents in a room.
    pub async fn threads(&self, room_id: &str, count: u32, offset: u32) -> ChatResult<Vec<Message>> {
        let mut params = vec![("rid", room_id.to_string())];
        params.extend(page(count, offset));
        let mut resp = self.get("chat.getThreadsList", &params, "Failed to get threads").await?;
        let threads: Vec<Message> = take(&mut resp, "threads")?;
        Ok(crate::atoms::types::without_system(threads))
    }

    /// Replies under one thread parent.
    pub async fn thread_messages(&self, tmid: &str, count: u32, offset: u32) -> ChatResult<Vec<Message>> {
        require_id(tmid, "thread id")?;
        let mut params = vec![("tmid", tmid.to_string())];
        params.extend(page(count, offset));
        let mut resp = self
            .get("chat.getThreadMessages", &params, "Failed to get thread messages")
            .await?;
        take_messages(&mut resp, "messages")
    }

    /// Server-side text search within one room.
    pub async fn search(&self, room_id: &str, text: &str, count: u32, offset: u32) -> ChatResult<Vec<Message>> {
        let mut params = vec![("roomId", room_id.to_string()), ("searchText", text.to_string())];
        params.extend(page(count, offset));
        let mut resp = self.get("chat.search", &params, "Search failed").await?;
        take_messages(&mut resp, "messages")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_ids_are_rejected_locally() {
        assert!(require_id("", "messageId").is_err());
        assert!(require_id("  ", "messageId").is_err());
        assert!(require_id("abc", "messageId").is_ok());
    }
}
