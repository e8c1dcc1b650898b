use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::MessageRole;

/// One turn of a chat thread, as supplied by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: NaiveDateTime,
    /// Evidence ids that were supplied to the prompt for this reply.
    #[serde(default)]
    pub evidence_ids: Vec<String>,
}

impl Message {
    pub fn new(thread_id: Uuid, role: MessageRole, content: &str, timestamp: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            thread_id,
            role,
            content: content.to_string(),
            timestamp,
            evidence_ids: Vec::new(),
        }
    }
}
