use serde::{Deserialize, Serialize};

use crate::models::KbDocument;

/// A knowledge-base document with its keyword relevance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub id: String,
    pub title: String,
    pub source: String,
    pub url: String,
    pub tags: Vec<String>,
    pub text: String,
    /// Always greater than zero.
    pub score: u32,
}

impl RetrievedChunk {
    pub fn from_document(doc: &KbDocument, score: u32) -> Self {
        Self {
            id: doc.id.clone(),
            title: doc.title.clone(),
            source: doc.source.clone(),
            url: doc.url.clone(),
            tags: doc.tags.clone(),
            text: doc.text.clone(),
            score,
        }
    }
}

/// Evidence entry handed to the prompt: a one-line claim plus a short
/// excerpt of the source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagEvidence {
    pub id: String,
    pub title: String,
    pub source: String,
    pub url: String,
    pub claim: String,
    pub excerpt: String,
    pub score: u32,
}

/// Anything ranked by keyword relevance.
pub trait Scored {
    fn score(&self) -> u32;
}

impl Scored for RetrievedChunk {
    fn score(&self) -> u32 {
        self.score
    }
}

impl Scored for RagEvidence {
    fn score(&self) -> u32 {
        self.score
    }
}

/// A cited document resolved for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub document_id: String,
    pub title: String,
    pub source: String,
    pub url: String,
}

impl From<&KbDocument> for Citation {
    fn from(doc: &KbDocument) -> Self {
        Self {
            document_id: doc.id.clone(),
            title: doc.title.clone(),
            source: doc.source.clone(),
            url: doc.url.clone(),
        }
    }
}
