//! Repository layer contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define the transactional tree store consumed by every tree service.
//! - Isolate SQLite query details from interval arithmetic.
//!
//! # Invariants
//! - Repository APIs never compute interval shifts themselves; they apply
//!   the shifts services ask for.
//! - Unique-constraint violations surface as `StoreError::Conflict`.

pub mod document_repo;
pub mod tree_store;
