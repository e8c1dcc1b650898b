use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::DatabaseError;

/// Current schema version of the bundled knowledge-base seed.
pub const KB_SEED_SCHEMA_VERSION: u32 = 1;

/// A static reference passage shipped with the app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KbDocument {
    pub id: String,
    pub title: String,
    pub source: String,
    pub url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub text: String,
}

/// Versioned envelope around a seed dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KbSeed {
    pub schema_version: u32,
    pub documents: Vec<KbDocument>,
}

/// Upgrade a raw seed payload to the current envelope.
///
/// v0 is a bare JSON array of documents. v1 wraps it in
/// `{ "schema_version": 1, "documents": [...] }`.
pub fn migrate_kb_seed(raw: Value) -> Result<KbSeed, DatabaseError> {
    match raw {
        Value::Array(_) => {
            let documents: Vec<KbDocument> = serde_json::from_value(raw)?;
            Ok(KbSeed {
                schema_version: KB_SEED_SCHEMA_VERSION,
                documents,
            })
        }
        Value::Object(ref map) => {
            let version = map
                .get("schema_version")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            if version > KB_SEED_SCHEMA_VERSION as u64 {
                return Err(DatabaseError::MigrationFailed {
                    version: version as i64,
                    reason: "seed schema is newer than this build".into(),
                });
            }
            let mut seed: KbSeed = serde_json::from_value(raw)?;
            seed.schema_version = KB_SEED_SCHEMA_VERSION;
            Ok(seed)
        }
        _ => Err(DatabaseError::ConstraintViolation(
            "knowledge-base seed must be an array or an envelope object".into(),
        )),
    }
}

/// Parse seed JSON text of any supported version.
pub fn parse_kb_seed(json: &str) -> Result<KbSeed, DatabaseError> {
    let raw: Value = serde_json::from_str(json)?;
    migrate_kb_seed(raw)
}
