//! Tagged errors returned by tree services.

use crate::model::category::CategoryId;
use crate::model::document::DocumentId;
use crate::repo::tree_store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Coarse error tag for calling layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidOperation,
    ConflictConstraint,
    Storage,
}

/// Reason a tree operation was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidOperation {
    /// The root category cannot be moved or deleted.
    RootImmutable,
    /// Target parent is the node itself or inside its subtree.
    CycleDetected {
        node_id: CategoryId,
        target_id: CategoryId,
    },
    /// Bulk delete targets sit at different depths.
    MixedDepth {
        expected: i64,
        category_id: CategoryId,
        depth: i64,
    },
    /// Requested parent does not exist.
    ParentMissing(CategoryId),
}

impl Display for InvalidOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RootImmutable => write!(f, "root category cannot be moved or deleted"),
            Self::CycleDetected { node_id, target_id } => write!(
                f,
                "move would create cycle: category {node_id} under {target_id}"
            ),
            Self::MixedDepth {
                expected,
                category_id,
                depth,
            } => write!(
                f,
                "bulk delete requires siblings at one depth: expected {expected}, category {category_id} is at {depth}"
            ),
            Self::ParentMissing(id) => write!(f, "parent category does not exist: {id}"),
        }
    }
}

/// Errors from tree service operations.
#[derive(Debug)]
pub enum TreeError {
    /// Category id does not resolve.
    CategoryNotFound(CategoryId),
    /// Document id does not resolve.
    DocumentNotFound(DocumentId),
    /// Operation refused without touching the store.
    InvalidOperation(InvalidOperation),
    /// Unique constraint rejected the write (duplicate category name).
    ConflictConstraint(String),
    /// Transaction or connectivity failure.
    Storage(StoreError),
}

impl TreeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CategoryNotFound(_) | Self::DocumentNotFound(_) => ErrorKind::NotFound,
            Self::InvalidOperation(_) => ErrorKind::InvalidOperation,
            Self::ConflictConstraint(_) => ErrorKind::ConflictConstraint,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl Display for TreeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CategoryNotFound(id) => write!(f, "category not found: {id}"),
            Self::DocumentNotFound(id) => write!(f, "document not found: {id}"),
            Self::InvalidOperation(reason) => write!(f, "invalid operation: {reason}"),
            Self::ConflictConstraint(message) => write!(f, "conflict: {message}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TreeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for TreeError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(message) => Self::ConflictConstraint(message),
            other => Self::Storage(other),
        }
    }
}

impl From<InvalidOperation> for TreeError {
    fn from(value: InvalidOperation) -> Self {
        Self::InvalidOperation(value)
    }
}
