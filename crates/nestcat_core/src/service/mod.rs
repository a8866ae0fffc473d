//! Core category tree services.
//!
//! # Responsibility
//! - Turn tree store primitives into interval-preserving tree operations.
//! - Keep the calling layer decoupled from storage details.
//!
//! # Invariants
//! - Every mutation runs inside exactly one store transaction.
//! - Service errors are tagged with an `ErrorKind` for the calling layer.

pub mod association_service;
pub mod category_service;
pub mod error;
pub mod query_service;
pub mod tree_mutator;

use crate::model::category::{Category, CategoryId};
use crate::repo::tree_store::TreeStore;
use error::TreeError;

fn load_category<S: TreeStore>(store: &S, id: CategoryId) -> Result<Category, TreeError> {
    store.get(id)?.ok_or(TreeError::CategoryNotFound(id))
}
