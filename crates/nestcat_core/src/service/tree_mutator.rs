//! Nested-set tree mutations.
//!
//! # Responsibility
//! - Create, rename, move and delete categories.
//! - Recompute interval bounds with gap open/close shifts.
//! - Keep `children_count` in step with parent links.
//!
//! # Invariants
//! - Root is never moved or deleted.
//! - A category is never moved into its own subtree.
//! - Deleting a category detaches its documents and reparents its direct
//!   children to the root; nothing cascades.
//! - Every public operation is one transaction; a failure leaves the tree
//!   exactly as it was.

use crate::model::category::{Category, CategoryId, ROOT_CATEGORY_ID};
use crate::repo::tree_store::{
    CategoryFields, CategoryFilter, CategoryQuery, IntervalColumn, IntervalShift,
    NewCategoryRow, TreeStore,
};
use crate::service::association_service::AssociationManager;
use crate::service::error::{InvalidOperation, TreeError};
use crate::service::load_category;
use log::{debug, info};
use std::collections::HashSet;

/// Category tree mutation service.
pub struct TreeMutator<S: TreeStore> {
    store: S,
}

impl<S: TreeStore> TreeMutator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates one category as the last child of `parent_id` (root when
    /// `None`).
    pub fn create(
        &self,
        name: &str,
        description: &str,
        parent_id: Option<CategoryId>,
    ) -> Result<Category, TreeError> {
        let parent_id = parent_id.unwrap_or(ROOT_CATEGORY_ID);
        self.store
            .with_transaction(|tx| Self::create_in(tx, name, description, parent_id))
    }

    /// Updates name and/or description. Interval fields are never touched.
    pub fn update(&self, id: CategoryId, fields: &CategoryFields) -> Result<Category, TreeError> {
        self.store.with_transaction(|tx| {
            if !fields.is_empty() && !tx.update_fields(id, fields)? {
                return Err(TreeError::CategoryNotFound(id));
            }
            let category = load_category(tx, id)?;
            info!(
                "event=category_update module=tree status=ok category_id={}",
                category.id
            );
            Ok(category)
        })
    }

    /// Moves one category, with its subtree, to be the last child of
    /// `target_id`.
    pub fn move_to(&self, id: CategoryId, target_id: CategoryId) -> Result<Category, TreeError> {
        self.store
            .with_transaction(|tx| Self::move_in(tx, id, target_id))
    }

    /// Moves each listed category under `target_id`, in list order, within
    /// one transaction.
    pub fn move_many(&self, ids: &[CategoryId], target_id: CategoryId) -> Result<(), TreeError> {
        self.store.with_transaction(|tx| {
            load_category(tx, target_id)?;
            for id in dedupe(ids) {
                Self::move_in(tx, id, target_id)?;
            }
            Ok(())
        })
    }

    /// Deletes one non-root category.
    pub fn delete(&self, id: CategoryId) -> Result<(), TreeError> {
        self.store.with_transaction(|tx| Self::delete_in(tx, id))
    }

    /// Deletes a batch of categories that all sit at the same depth.
    ///
    /// The whole batch is validated before any row changes.
    pub fn bulk_delete(&self, ids: &[CategoryId]) -> Result<(), TreeError> {
        let ids = dedupe(ids);
        if ids.is_empty() {
            return Ok(());
        }

        self.store.with_transaction(|tx| {
            let mut expected_depth = None;
            for &id in &ids {
                let category = load_category(tx, id)?;
                if category.is_root() {
                    return Err(InvalidOperation::RootImmutable.into());
                }
                match expected_depth {
                    None => expected_depth = Some(category.depth),
                    Some(expected) if expected != category.depth => {
                        return Err(InvalidOperation::MixedDepth {
                            expected,
                            category_id: id,
                            depth: category.depth,
                        }
                        .into());
                    }
                    Some(_) => {}
                }
            }

            for &id in &ids {
                Self::delete_in(tx, id)?;
            }
            Ok(())
        })
    }

    fn create_in(
        tx: &S,
        name: &str,
        description: &str,
        parent_id: CategoryId,
    ) -> Result<Category, TreeError> {
        let parent = tx
            .get(parent_id)?
            .ok_or(InvalidOperation::ParentMissing(parent_id))?;

        let insertion_point = parent.rgt;
        open_gap(tx, insertion_point, 2)?;
        let created = tx.insert(&NewCategoryRow {
            name,
            description,
            parent_id,
            lft: insertion_point,
            rgt: insertion_point + 1,
            depth: parent.depth + 1,
        })?;
        tx.adjust_children_count(parent_id, 1)?;

        info!(
            "event=category_create module=tree status=ok category_id={} parent_id={} lft={}",
            created.id, parent_id, created.lft
        );
        Ok(created)
    }

    fn move_in(tx: &S, id: CategoryId, target_id: CategoryId) -> Result<Category, TreeError> {
        let node = load_category(tx, id)?;
        let Some(old_parent_id) = node.parent_id else {
            return Err(InvalidOperation::RootImmutable.into());
        };
        let target = load_category(tx, target_id)?;
        if node.contains(&target) {
            return Err(InvalidOperation::CycleDetected {
                node_id: id,
                target_id,
            }
            .into());
        }

        let width = node.span();
        tx.detach_subtree(node.lft, node.rgt)?;
        close_gap(tx, node.rgt + 1, width)?;

        // Target bounds moved if it sat after the closed gap.
        let target = load_category(tx, target_id)?;
        let insertion_point = target.rgt;
        open_gap(tx, insertion_point, width)?;

        let offset = insertion_point - node.lft;
        let depth_delta = target.depth + 1 - node.depth;
        let attached = tx.attach_detached(offset, depth_delta)?;
        debug!(
            "event=category_move module=tree status=attach category_id={} rows={} offset={} depth_delta={}",
            id, attached, offset, depth_delta
        );

        tx.set_parent(id, target_id)?;
        tx.adjust_children_count(old_parent_id, -1)?;
        tx.adjust_children_count(target_id, 1)?;

        let moved = load_category(tx, id)?;
        info!(
            "event=category_move module=tree status=ok category_id={} from_parent={} to_parent={}",
            id, old_parent_id, target_id
        );
        Ok(moved)
    }

    fn delete_in(tx: &S, id: CategoryId) -> Result<(), TreeError> {
        let node = load_category(tx, id)?;
        let Some(parent_id) = node.parent_id else {
            return Err(InvalidOperation::RootImmutable.into());
        };

        AssociationManager::<S>::remove_in(tx, id, &[])?;

        let children = tx.find(&CategoryQuery::new(CategoryFilter::ChildrenOf(id)))?;
        for child in &children {
            Self::move_in(tx, child.id, ROOT_CATEGORY_ID)?;
        }

        // Reparenting shrank the interval down to a leaf.
        let node = load_category(tx, id)?;
        if !tx.delete_row(id)? {
            return Err(TreeError::CategoryNotFound(id));
        }
        close_gap(tx, node.rgt + 1, node.span())?;
        tx.adjust_children_count(parent_id, -1)?;

        info!(
            "event=category_delete module=tree status=ok category_id={} reparented={}",
            id,
            children.len()
        );
        Ok(())
    }
}

fn open_gap<S: TreeStore>(tx: &S, from: i64, width: i64) -> Result<(), TreeError> {
    tx.bulk_shift(IntervalShift::new(IntervalColumn::Lft, from, width))?;
    tx.bulk_shift(IntervalShift::new(IntervalColumn::Rgt, from, width))?;
    Ok(())
}

fn close_gap<S: TreeStore>(tx: &S, from: i64, width: i64) -> Result<(), TreeError> {
    tx.bulk_shift(IntervalShift::new(IntervalColumn::Lft, from, -width))?;
    tx.bulk_shift(IntervalShift::new(IntervalColumn::Rgt, from, -width))?;
    Ok(())
}

fn dedupe(ids: &[CategoryId]) -> Vec<CategoryId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::TreeMutator;
    use crate::db::open_db_in_memory;
    use crate::repo::tree_store::{SqliteTreeStore, TreeStore};
    use crate::service::error::{InvalidOperation, TreeError};

    #[test]
    fn create_under_missing_parent_leaves_tree_untouched() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteTreeStore::try_new(&conn).unwrap();
        let mutator = TreeMutator::new(store);

        let err = mutator.create("Orphan", "", Some(42)).unwrap_err();
        assert!(matches!(
            err,
            TreeError::InvalidOperation(InvalidOperation::ParentMissing(42))
        ));
        let root = store.get(1).unwrap().unwrap();
        assert_eq!((root.lft, root.rgt, root.children_count), (1, 2, 0));
    }

    #[test]
    fn move_to_sibling_shifts_depth_and_bounds() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteTreeStore::try_new(&conn).unwrap();
        let mutator = TreeMutator::new(store);

        let a = mutator.create("A", "", None).unwrap();
        let a1 = mutator.create("A1", "", Some(a.id)).unwrap();
        let b = mutator.create("B", "", None).unwrap();

        // Root[1,8] A[2,5] A1[3,4] B[6,7] -> Root[1,8] B[2,7] A[3,6] A1[4,5]
        let moved = mutator.move_to(a.id, b.id).unwrap();
        assert_eq!((moved.lft, moved.rgt, moved.depth), (3, 6, 2));
        let a1 = store.get(a1.id).unwrap().unwrap();
        assert_eq!((a1.lft, a1.rgt, a1.depth), (4, 5, 3));
        let b = store.get(b.id).unwrap().unwrap();
        assert_eq!((b.lft, b.rgt, b.children_count), (2, 7, 1));
        let root = store.get(1).unwrap().unwrap();
        assert_eq!((root.lft, root.rgt, root.children_count), (1, 8, 1));
    }

    #[test]
    fn move_into_own_subtree_is_rejected() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteTreeStore::try_new(&conn).unwrap();
        let mutator = TreeMutator::new(store);

        let a = mutator.create("A", "", None).unwrap();
        let err = mutator.move_to(a.id, a.id).unwrap_err();
        assert!(matches!(
            err,
            TreeError::InvalidOperation(InvalidOperation::CycleDetected { .. })
        ));
        let err = mutator.move_to(1, a.id).unwrap_err();
        assert!(matches!(
            err,
            TreeError::InvalidOperation(InvalidOperation::RootImmutable)
        ));
    }
}
