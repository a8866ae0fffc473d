//! Document (post) domain model.
//!
//! Documents are owned by an external collaborator; the core only manages
//! which category a document is attached to.

use super::category::CategoryId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable document identifier.
pub type DocumentId = Uuid;

/// One persisted document row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub content: String,
    pub is_public: bool,
    pub liked: i64,
    /// Owning category. `None` while detached.
    #[serde(rename = "categoryID")]
    pub category_id: Option<CategoryId>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for inserting a detached document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewDocument {
    pub title: String,
    pub content: String,
    pub is_public: bool,
}

impl NewDocument {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            is_public: false,
        }
    }
}
