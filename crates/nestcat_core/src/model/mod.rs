//! Category tree and document domain model.
//!
//! # Responsibility
//! - Define the nested-set category record and its hierarchy projections.
//! - Define the document record whose membership the core manages.
//!
//! # Invariants
//! - `lft < rgt` for every persisted category.
//! - A child interval lies strictly inside its parent interval.
//! - `rgt - lft + 1 == 2 * subtree_size` for every category.

pub mod category;
pub mod document;
