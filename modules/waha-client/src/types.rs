use serde::{Deserialize, Serialize};

/// Request body for `POST /api/sendText`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTextRequest {
    pub session: String,
    pub chat_id: String,
    pub text: String,
}

/// A group chat the session participates in, from `GET /api/{session}/groups`.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupChat {
    pub id: GroupId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub participants: Vec<Participant>,
}

/// Group JID wrapper; the gateway nests the serialized id.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupId {
    #[serde(rename = "_serialized")]
    pub serialized: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Participant {
    pub id: String,
}
