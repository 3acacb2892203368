pub mod error;
pub mod types;

pub use error::{Result, WahaError};
pub use types::{GroupChat, SendTextRequest};

/// Client for a WAHA-style WhatsApp HTTP gateway. The gateway owns the
/// session/device pairing; this client only sends messages and lists groups.
pub struct WahaClient {
    client: reqwest::Client,
    base_url: String,
    session: String,
    api_key: Option<String>,
}

impl WahaClient {
    pub fn new(base_url: String, session: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            api_key,
        }
    }

    /// Send a plain-text message to a chat (group or individual JID).
    pub async fn send_text(&self, chat_id: &str, text: &str) -> Result<()> {
        let url = format!("{}/api/sendText", self.base_url);
        let body = SendTextRequest {
            session: self.session.clone(),
            chat_id: chat_id.to_string(),
            text: text.to_string(),
        };

        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.header("X-Api-Key", key);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(WahaError::Gateway {
                status: status.as_u16(),
                message,
            });
        }

        tracing::debug!(chat_id, "Message delivered to gateway");
        Ok(())
    }

    /// List the group chats the session currently participates in.
    pub async fn groups(&self) -> Result<Vec<GroupChat>> {
        let url = format!("{}/api/{}/groups", self.base_url, self.session);

        let mut req = self.client.get(&url);
        if let Some(key) = &self.api_key {
            req = req.header("X-Api-Key", key);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(WahaError::Gateway {
                status: status.as_u16(),
                message,
            });
        }

        let groups: Vec<GroupChat> = resp.json().await?;
        tracing::debug!(count = groups.len(), "Fetched participating groups");
        Ok(groups)
    }
}
