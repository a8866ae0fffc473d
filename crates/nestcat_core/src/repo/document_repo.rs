//! Document repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Insert and read document rows for collaborators and tests.
//! - Share the document row mapping with the tree store.
//!
//! # Invariants
//! - New documents start detached (`category_id IS NULL`); membership is
//!   changed only through the association service so `amount` stays exact.

use crate::model::category::CategoryId;
use crate::model::document::{Document, DocumentId, NewDocument};
use crate::repo::tree_store::{StoreError, StoreResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

pub(crate) const DOCUMENT_SELECT_SQL: &str = "SELECT
    id,
    title,
    content,
    is_public,
    liked,
    category_id,
    created_at,
    updated_at
FROM documents";

/// Repository interface for document rows.
pub trait DocumentRepository {
    /// Inserts one detached document and returns it.
    fn create_document(&self, input: &NewDocument) -> StoreResult<Document>;
    /// Loads one document by id.
    fn get_document(&self, id: DocumentId) -> StoreResult<Option<Document>>;
    /// Lists documents attached to `category_id`, or detached ones for `None`.
    fn list_documents(&self, category_id: Option<CategoryId>) -> StoreResult<Vec<Document>>;
}

/// SQLite-backed document repository.
pub struct SqliteDocumentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl DocumentRepository for SqliteDocumentRepository<'_> {
    fn create_document(&self, input: &NewDocument) -> StoreResult<Document> {
        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO documents (
                id,
                title,
                content,
                is_public,
                category_id
            ) VALUES (?1, ?2, ?3, ?4, NULL);",
            params![
                id.to_string(),
                input.title.as_str(),
                input.content.as_str(),
                i64::from(input.is_public),
            ],
        )?;
        self.get_document(id)?.ok_or_else(|| {
            StoreError::InvalidData(format!("inserted document {id} not found in read-back"))
        })
    }

    fn get_document(&self, id: DocumentId) -> StoreResult<Option<Document>> {
        self.conn
            .query_row(
                &format!("{DOCUMENT_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                |row| Ok(parse_document_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_documents(&self, category_id: Option<CategoryId>) -> StoreResult<Vec<Document>> {
        let sql = if category_id.is_some() {
            format!("{DOCUMENT_SELECT_SQL} WHERE category_id = ?1 ORDER BY created_at ASC, id ASC;")
        } else {
            format!("{DOCUMENT_SELECT_SQL} WHERE category_id IS NULL ORDER BY created_at ASC, id ASC;")
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = match category_id {
            Some(category_id) => stmt.query([category_id])?,
            None => stmt.query([])?,
        };

        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_document_row(row)?);
        }
        Ok(items)
    }
}

pub(crate) fn parse_document_row(row: &Row<'_>) -> StoreResult<Document> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        StoreError::InvalidData(format!("invalid uuid `{id_text}` in documents.id"))
    })?;

    let is_public = match row.get::<_, i64>("is_public")? {
        0 => false,
        1 => true,
        other => {
            return Err(StoreError::InvalidData(format!(
                "invalid is_public value `{other}` in documents.is_public"
            )));
        }
    };

    Ok(Document {
        id,
        title: row.get("title")?,
        content: row.get("content")?,
        is_public,
        liked: row.get("liked")?,
        category_id: row.get("category_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
