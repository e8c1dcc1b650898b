//! Repository layer — entity-scoped database operations.
//!
//! The analytics core only reads through [`LogStore`] and [`KnowledgeBase`];
//! writes belong to the host application.

mod kb;
mod log;

use rusqlite::Connection;
use uuid::Uuid;

use super::DatabaseError;
use crate::models::{KbDocument, Log};

pub use kb::*;
pub use log::*;

/// Read access to the symptom log collection.
pub trait LogStore {
    fn all_logs(&self) -> Result<Vec<Log>, DatabaseError>;
    fn logs_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Log>, DatabaseError>;
}

/// Read access to the local reference document set.
pub trait KnowledgeBase {
    fn all_documents(&self) -> Result<Vec<KbDocument>, DatabaseError>;
}

impl LogStore for Connection {
    fn all_logs(&self) -> Result<Vec<Log>, DatabaseError> {
        get_all_logs(self)
    }

    fn logs_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Log>, DatabaseError> {
        get_logs_by_ids(self, ids)
    }
}

impl KnowledgeBase for Connection {
    fn all_documents(&self) -> Result<Vec<KbDocument>, DatabaseError> {
        get_all_kb_documents(self)
    }
}

impl KnowledgeBase for [KbDocument] {
    fn all_documents(&self) -> Result<Vec<KbDocument>, DatabaseError> {
        Ok(self.to_vec())
    }
}
