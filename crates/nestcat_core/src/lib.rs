//! Core nested-set category tree for nestcat.
//! This crate owns every tree and document membership invariant.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, open_db_with_config, DbError, DbResult};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::category::{
    Category, CategoryHierarchy, CategoryId, CategoryNode, ROOT_CATEGORY_ID,
};
pub use model::document::{Document, DocumentId, NewDocument};
pub use repo::document_repo::{DocumentRepository, SqliteDocumentRepository};
pub use repo::tree_store::{
    CategoryFields, SortDirection, SqliteTreeStore, StoreError, StoreResult, TreeStore,
};
pub use service::association_service::AssociationManager;
pub use service::category_service::CategoryService;
pub use service::error::{ErrorKind, InvalidOperation, TreeError};
pub use service::query_service::{
    CategoryListQuery, CategoryPage, CategorySortField, QueryService, TreeViolation,
};
pub use service::tree_mutator::TreeMutator;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
