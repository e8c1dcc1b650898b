//! Per-user chat memory, owned by the caller and persisted explicitly.
//!
//! Files live under a sessions directory, one per user, named by the
//! SHA-256 of the normalized email so no address appears on disk.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::models::Message;

pub const SESSION_SCHEMA_VERSION: u32 = 1;
/// Oldest messages are dropped past this length.
pub const MAX_SESSION_HISTORY: usize = 50;
pub const MAX_MOOD_ENTRIES: usize = 90;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Session file schema {found} is newer than supported {supported}")]
    UnsupportedVersion { found: u64, supported: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub date: NaiveDate,
    pub mood: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMemory {
    pub schema_version: u32,
    /// Hex SHA-256 of the normalized email.
    pub profile_key: String,
    pub history: Vec<Message>,
    pub mood_log: Vec<MoodEntry>,
}

/// Unversioned layout written before session files carried a schema.
#[derive(Deserialize)]
struct SessionV0 {
    #[serde(default)]
    messages: Vec<Message>,
    #[serde(default)]
    moods: Vec<MoodEntry>,
}

impl SessionMemory {
    pub fn new(user_email: &str) -> Self {
        Self {
            schema_version: SESSION_SCHEMA_VERSION,
            profile_key: profile_key(user_email),
            history: Vec::new(),
            mood_log: Vec::new(),
        }
    }

    pub fn push_message(&mut self, message: Message) {
        self.history.push(message);
        trim_front(&mut self.history, MAX_SESSION_HISTORY);
    }

    /// One entry per day; a second entry on the same day replaces the first.
    pub fn record_mood(&mut self, entry: MoodEntry) {
        self.mood_log.retain(|m| m.date != entry.date);
        self.mood_log.push(entry);
        self.mood_log.sort_by_key(|m| m.date);
        trim_front(&mut self.mood_log, MAX_MOOD_ENTRIES);
    }

    /// The last `n` messages, oldest first.
    pub fn recent_history(&self, n: usize) -> &[Message] {
        &self.history[self.history.len().saturating_sub(n)..]
    }

    fn enforce_bounds(&mut self) {
        trim_front(&mut self.history, MAX_SESSION_HISTORY);
        self.mood_log.sort_by_key(|m| m.date);
        trim_front(&mut self.mood_log, MAX_MOOD_ENTRIES);
    }
}

fn trim_front<T>(items: &mut Vec<T>, max: usize) {
    if items.len() > max {
        items.drain(..items.len() - max);
    }
}

/// Hex SHA-256 of the trimmed, lower-cased email.
pub fn profile_key(user_email: &str) -> String {
    let normalized = user_email.trim().to_lowercase();
    format!("{:x}", Sha256::digest(normalized.as_bytes()))
}

pub fn session_path(dir: &Path, user_email: &str) -> PathBuf {
    dir.join(format!("{}.json", profile_key(user_email)))
}

/// Load the user's session, or a fresh one when none is stored yet.
pub fn load_session(dir: &Path, user_email: &str) -> Result<SessionMemory, SessionError> {
    let path = session_path(dir, user_email);
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(SessionMemory::new(user_email));
        }
        Err(e) => return Err(e.into()),
    };

    let mut memory = migrate_session(serde_json::from_str(&raw)?, user_email)?;
    memory.enforce_bounds();
    tracing::debug!(
        messages = memory.history.len(),
        moods = memory.mood_log.len(),
        "Session loaded"
    );
    Ok(memory)
}

/// Write through a temp file so a crash never leaves a half-written session.
pub fn save_session(dir: &Path, memory: &SessionMemory) -> Result<(), SessionError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.json", memory.profile_key));
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_vec_pretty(memory)?)?;
    std::fs::rename(&tmp, &path)?;
    Ok(())
}

/// Upgrade any stored layout to the current one.
pub fn migrate_session(raw: Value, user_email: &str) -> Result<SessionMemory, SessionError> {
    let version = raw
        .get("schema_version")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    match version {
        0 => {
            let legacy: SessionV0 = serde_json::from_value(raw)?;
            tracing::info!(
                from = 0,
                to = SESSION_SCHEMA_VERSION,
                "Migrating session file"
            );
            Ok(SessionMemory {
                schema_version: SESSION_SCHEMA_VERSION,
                profile_key: profile_key(user_email),
                history: legacy.messages,
                mood_log: legacy.moods,
            })
        }
        v if v <= SESSION_SCHEMA_VERSION as u64 => Ok(serde_json::from_value(raw)?),
        found => Err(SessionError::UnsupportedVersion {
            found,
            supported: SESSION_SCHEMA_VERSION,
        }),
    }
}
