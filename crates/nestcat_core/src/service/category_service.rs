//! Category use-case facade for the calling layer.
//!
//! # Responsibility
//! - Expose the category and document membership operations under one type.
//! - Route each call to the query, mutation or association service.

use crate::model::category::{Category, CategoryHierarchy, CategoryId};
use crate::model::document::{Document, DocumentId};
use crate::repo::tree_store::{CategoryFields, TreeStore};
use crate::service::association_service::AssociationManager;
use crate::service::error::TreeError;
use crate::service::query_service::{CategoryListQuery, CategoryPage, QueryService, TreeViolation};
use crate::service::tree_mutator::TreeMutator;

/// Category service facade.
pub struct CategoryService<S: TreeStore + Clone> {
    queries: QueryService<S>,
    mutator: TreeMutator<S>,
    associations: AssociationManager<S>,
}

impl<S: TreeStore + Clone> CategoryService<S> {
    /// Creates service from store implementation.
    pub fn new(store: S) -> Self {
        Self {
            queries: QueryService::new(store.clone()),
            mutator: TreeMutator::new(store.clone()),
            associations: AssociationManager::new(store),
        }
    }

    pub fn create_category(
        &self,
        name: &str,
        description: &str,
        parent_id: Option<CategoryId>,
    ) -> Result<Category, TreeError> {
        self.mutator.create(name, description, parent_id)
    }

    pub fn update_category(
        &self,
        id: CategoryId,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<Category, TreeError> {
        self.mutator
            .update(id, &CategoryFields { name, description })
    }

    /// Deletes one or more categories at the same depth.
    pub fn delete_categories(&self, ids: &[CategoryId]) -> Result<(), TreeError> {
        self.mutator.bulk_delete(ids)
    }

    pub fn move_categories(
        &self,
        ids: &[CategoryId],
        target_parent_id: CategoryId,
    ) -> Result<(), TreeError> {
        self.mutator.move_many(ids, target_parent_id)
    }

    pub fn get_category(&self, id: CategoryId) -> Result<Category, TreeError> {
        self.queries.get(id)
    }

    pub fn get_hierarchy(&self, id: CategoryId) -> Result<CategoryHierarchy, TreeError> {
        self.queries.hierarchy(id)
    }

    pub fn list_categories(&self, query: &CategoryListQuery) -> Result<CategoryPage, TreeError> {
        self.queries.list(query)
    }

    pub fn verify_tree(&self) -> Result<Vec<TreeViolation>, TreeError> {
        self.queries.verify_tree()
    }

    pub fn attach_documents(
        &self,
        category_id: CategoryId,
        document_ids: &[DocumentId],
    ) -> Result<Category, TreeError> {
        self.associations.add(category_id, document_ids)
    }

    /// Detaches listed documents; an empty list detaches all of them.
    pub fn detach_documents(
        &self,
        category_id: CategoryId,
        document_ids: &[DocumentId],
    ) -> Result<Category, TreeError> {
        self.associations.remove(category_id, document_ids)
    }

    pub fn move_documents(
        &self,
        from: CategoryId,
        to: CategoryId,
        document_ids: &[DocumentId],
    ) -> Result<Category, TreeError> {
        self.associations.move_documents(from, to, document_ids)
    }

    pub fn category_documents(&self, category_id: CategoryId) -> Result<Vec<Document>, TreeError> {
        self.associations.documents(category_id)
    }
}
