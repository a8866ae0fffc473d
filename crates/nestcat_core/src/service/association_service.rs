//! Document membership service.
//!
//! # Responsibility
//! - Attach, detach and move documents between categories.
//! - Keep each category `amount` equal to its attached document count.
//!
//! # Invariants
//! - Counter changes are atomic column updates issued in the same
//!   transaction as the membership writes.
//! - A document already in the target category is never counted twice.
//! - An empty detach list means "detach everything".

use crate::model::category::{Category, CategoryId};
use crate::model::document::{Document, DocumentId};
use crate::repo::tree_store::TreeStore;
use crate::service::error::TreeError;
use crate::service::load_category;
use log::info;
use std::collections::{BTreeMap, HashSet};

/// Document association manager.
pub struct AssociationManager<S: TreeStore> {
    store: S,
}

impl<S: TreeStore> AssociationManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Attaches documents to `category_id` and returns the updated category.
    ///
    /// Documents already attached are skipped, so repeating a call leaves
    /// `amount` unchanged. Documents owned by another category are moved and
    /// that category's `amount` is decremented.
    pub fn add(
        &self,
        category_id: CategoryId,
        document_ids: &[DocumentId],
    ) -> Result<Category, TreeError> {
        self.store.with_transaction(|tx| {
            Self::add_in(tx, category_id, document_ids)?;
            load_category(tx, category_id)
        })
    }

    /// Detaches documents from `category_id` and returns the updated category.
    ///
    /// Ids not currently attached to the category are ignored. An empty list
    /// detaches every document and resets `amount` to zero.
    pub fn remove(
        &self,
        category_id: CategoryId,
        document_ids: &[DocumentId],
    ) -> Result<Category, TreeError> {
        self.store.with_transaction(|tx| {
            Self::remove_in(tx, category_id, document_ids)?;
            load_category(tx, category_id)
        })
    }

    /// Detaches `from_docs` from `from` and attaches `to_docs` to `to` in one
    /// transaction.
    pub fn move_between(
        &self,
        from: CategoryId,
        to: CategoryId,
        from_docs: &[DocumentId],
        to_docs: &[DocumentId],
    ) -> Result<(), TreeError> {
        self.store
            .with_transaction(|tx| Self::move_between_in(tx, from, to, from_docs, to_docs))
    }

    /// Moves `document_ids` from `from` to `to` and returns the `to` category.
    ///
    /// Only listed documents currently in `from` are detached from it; listed
    /// documents already in `to` are left alone.
    pub fn move_documents(
        &self,
        from: CategoryId,
        to: CategoryId,
        document_ids: &[DocumentId],
    ) -> Result<Category, TreeError> {
        self.store.with_transaction(|tx| {
            load_category(tx, from)?;
            load_category(tx, to)?;
            if from != to {
                let ids = dedupe(document_ids);
                let mut from_docs = Vec::new();
                let mut to_docs = Vec::new();
                for id in ids {
                    let document = tx
                        .get_document(id)?
                        .ok_or(TreeError::DocumentNotFound(id))?;
                    if document.category_id == Some(from) {
                        from_docs.push(id);
                    }
                    if document.category_id != Some(to) {
                        to_docs.push(id);
                    }
                }
                Self::move_between_in(tx, from, to, &from_docs, &to_docs)?;
            }
            load_category(tx, to)
        })
    }

    /// Lists documents attached to `category_id`.
    pub fn documents(&self, category_id: CategoryId) -> Result<Vec<Document>, TreeError> {
        load_category(&self.store, category_id)?;
        Ok(self.store.documents_in(category_id)?)
    }

    /// Attach step run inside the caller's transaction. Returns how many
    /// documents changed owner.
    pub(crate) fn add_in(
        tx: &S,
        category_id: CategoryId,
        document_ids: &[DocumentId],
    ) -> Result<usize, TreeError> {
        load_category(tx, category_id)?;

        let mut added = Vec::new();
        let mut released: BTreeMap<CategoryId, i64> = BTreeMap::new();
        for id in dedupe(document_ids) {
            let document = tx
                .get_document(id)?
                .ok_or(TreeError::DocumentNotFound(id))?;
            match document.category_id {
                Some(owner) if owner == category_id => continue,
                Some(owner) => *released.entry(owner).or_insert(0) += 1,
                None => {}
            }
            added.push(id);
        }
        if added.is_empty() {
            return Ok(0);
        }

        tx.adjust_amount(category_id, added.len() as i64)?;
        for (owner, count) in &released {
            tx.adjust_amount(*owner, -count)?;
        }
        for id in &added {
            tx.set_document_category(*id, Some(category_id))?;
        }

        info!(
            "event=documents_attach module=association status=ok category_id={} added={} released_from={}",
            category_id,
            added.len(),
            released.len()
        );
        Ok(added.len())
    }

    /// Detach step run inside the caller's transaction. Returns how many
    /// documents were detached.
    pub(crate) fn remove_in(
        tx: &S,
        category_id: CategoryId,
        document_ids: &[DocumentId],
    ) -> Result<usize, TreeError> {
        load_category(tx, category_id)?;

        if document_ids.is_empty() {
            let cleared = tx.clear_category_documents(category_id)?;
            tx.reset_amount(category_id)?;
            info!(
                "event=documents_clear module=association status=ok category_id={} detached={}",
                category_id, cleared
            );
            return Ok(cleared);
        }

        let mut attached = Vec::new();
        for id in dedupe(document_ids) {
            let document = tx
                .get_document(id)?
                .ok_or(TreeError::DocumentNotFound(id))?;
            if document.category_id == Some(category_id) {
                attached.push(id);
            }
        }
        if attached.is_empty() {
            return Ok(0);
        }

        tx.adjust_amount(category_id, -(attached.len() as i64))?;
        for id in &attached {
            tx.set_document_category(*id, None)?;
        }

        info!(
            "event=documents_detach module=association status=ok category_id={} detached={}",
            category_id,
            attached.len()
        );
        Ok(attached.len())
    }

    fn move_between_in(
        tx: &S,
        from: CategoryId,
        to: CategoryId,
        from_docs: &[DocumentId],
        to_docs: &[DocumentId],
    ) -> Result<(), TreeError> {
        load_category(tx, from)?;
        load_category(tx, to)?;
        if from == to {
            return Ok(());
        }

        // An empty list here means "nothing", unlike a bare detach.
        if !from_docs.is_empty() {
            Self::remove_in(tx, from, from_docs)?;
        }
        Self::add_in(tx, to, to_docs)?;
        info!(
            "event=documents_move module=association status=ok from={} to={}",
            from, to
        );
        Ok(())
    }
}

fn dedupe(ids: &[DocumentId]) -> Vec<DocumentId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
