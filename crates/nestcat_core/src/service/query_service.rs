//! Read-only category tree queries.
//!
//! # Responsibility
//! - Resolve ancestors and descendants with single range scans.
//! - Assemble flat descendant rows into nested trees.
//! - Page through non-root categories and audit tree invariants.
//!
//! # Invariants
//! - Queries never recurse into the store; each projection is one scan.
//! - Reads do not take the writer lock and may observe a tree mid-mutation
//!   on another connection.

use crate::model::category::{
    assemble_tree, Category, CategoryHierarchy, CategoryId, CategoryNode, ROOT_CATEGORY_ID,
};
use crate::repo::tree_store::{
    CategoryFilter, CategoryOrder, CategoryQuery, SortDirection, TreeStore,
};
use crate::service::error::TreeError;
use crate::service::load_category;
use std::collections::HashMap;

const LIST_DEFAULT_LIMIT: u32 = 10;

/// Sortable timestamp column for category listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategorySortField {
    #[default]
    CreatedAt,
    UpdatedAt,
}

/// Paging and filter options for non-root category listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryListQuery {
    /// Optional case-insensitive name substring.
    pub key: Option<String>,
    /// 1-based page number.
    pub page: u32,
    /// Page size. Zero falls back to the default of 10.
    pub limit: u32,
    pub sort_by: CategorySortField,
    pub sort_order: SortDirection,
}

impl Default for CategoryListQuery {
    fn default() -> Self {
        Self {
            key: None,
            page: 1,
            limit: LIST_DEFAULT_LIMIT,
            sort_by: CategorySortField::CreatedAt,
            sort_order: SortDirection::Desc,
        }
    }
}

/// One page of categories plus the unpaged total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPage {
    pub rows: Vec<Category>,
    pub count: i64,
}

/// One broken invariant found by `verify_tree`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeViolation {
    pub category_id: CategoryId,
    pub message: String,
}

/// Read-only query facade over a tree store.
pub struct QueryService<S: TreeStore> {
    store: S,
}

impl<S: TreeStore> QueryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Loads one category.
    pub fn get(&self, id: CategoryId) -> Result<Category, TreeError> {
        load_category(&self.store, id)
    }

    /// Returns strict ancestors of `node`, root first.
    pub fn ancestors(&self, node: &Category) -> Result<Vec<Category>, TreeError> {
        let query = CategoryQuery::new(CategoryFilter::StrictAncestorsOf {
            lft: node.lft,
            rgt: node.rgt,
        });
        Ok(self.store.find(&query)?)
    }

    /// Returns the descendant forest of `node` from one range scan.
    pub fn descendants(&self, node: &Category) -> Result<Vec<CategoryNode>, TreeError> {
        let query = CategoryQuery::new(CategoryFilter::StrictDescendantsOf {
            lft: node.lft,
            rgt: node.rgt,
        });
        let rows = self.store.find(&query)?;
        Ok(assemble_tree(rows, node.id))
    }

    /// Loads one category with its ancestors and descendant tree.
    pub fn hierarchy(&self, id: CategoryId) -> Result<CategoryHierarchy, TreeError> {
        let category = self.get(id)?;
        let descendants = self.descendants(&category)?;
        let ancestors = self.ancestors(&category)?;
        Ok(CategoryHierarchy {
            category,
            ancestors,
            descendants,
        })
    }

    /// Pages through non-root categories.
    pub fn list(&self, list: &CategoryListQuery) -> Result<CategoryPage, TreeError> {
        let limit = if list.limit == 0 {
            LIST_DEFAULT_LIMIT
        } else {
            list.limit
        };
        let order = match list.sort_by {
            CategorySortField::CreatedAt => CategoryOrder::CreatedAt(list.sort_order),
            CategorySortField::UpdatedAt => CategoryOrder::UpdatedAt(list.sort_order),
        };

        let mut query = CategoryQuery::new(CategoryFilter::NonRoot).ordered_by(order);
        query.name_contains = list
            .key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string);

        let count = self.store.count(&query)?;
        query.limit = Some(limit);
        query.offset = list.page.max(1).saturating_sub(1).saturating_mul(limit);
        let rows = self.store.find(&query)?;
        Ok(CategoryPage { rows, count })
    }

    /// Audits nested-set invariants and denormalized counters.
    ///
    /// Returns every violation found; an empty list means the tree is sound.
    pub fn verify_tree(&self) -> Result<Vec<TreeViolation>, TreeError> {
        let rows = self.store.find(&CategoryQuery::new(CategoryFilter::All))?;
        let mut violations = Vec::new();
        let mut report = |category_id: CategoryId, message: String| {
            violations.push(TreeViolation {
                category_id,
                message,
            });
        };

        let by_id: HashMap<CategoryId, &Category> = rows.iter().map(|row| (row.id, row)).collect();
        let total = rows.len() as i64;

        match by_id.get(&ROOT_CATEGORY_ID) {
            None => report(ROOT_CATEGORY_ID, "root category is missing".to_string()),
            Some(root) => {
                if root.parent_id.is_some() || root.depth != 0 {
                    report(root.id, "root must have no parent and depth 0".to_string());
                }
                if root.lft != 1 || root.rgt != 2 * total {
                    report(
                        root.id,
                        format!(
                            "root interval [{}, {}] must be [1, {}]",
                            root.lft,
                            root.rgt,
                            2 * total
                        ),
                    );
                }
            }
        }

        let mut bounds: Vec<i64> = rows.iter().flat_map(|row| [row.lft, row.rgt]).collect();
        bounds.sort_unstable();
        if bounds.iter().copied().ne(1..=2 * total) {
            report(
                ROOT_CATEGORY_ID,
                "interval bounds are not a permutation of 1..=2n".to_string(),
            );
        }

        let mut children: HashMap<CategoryId, Vec<&Category>> = HashMap::new();
        for row in &rows {
            if row.lft >= row.rgt {
                report(row.id, format!("lft {} must be below rgt {}", row.lft, row.rgt));
            }
            let Some(parent_id) = row.parent_id else {
                continue;
            };
            let Some(parent) = by_id.get(&parent_id) else {
                report(row.id, format!("parent {parent_id} does not exist"));
                continue;
            };
            if !(parent.lft < row.lft && row.rgt < parent.rgt) {
                report(
                    row.id,
                    format!("interval is not nested inside parent {parent_id}"),
                );
            }
            if row.depth != parent.depth + 1 {
                report(
                    row.id,
                    format!("depth {} must be parent depth + 1", row.depth),
                );
            }
            children.entry(parent_id).or_default().push(row);
        }

        for row in &rows {
            let siblings = children.get(&row.id).map(Vec::as_slice).unwrap_or_default();
            if row.children_count != siblings.len() as i64 {
                report(
                    row.id,
                    format!(
                        "children_count {} but {} children found",
                        row.children_count,
                        siblings.len()
                    ),
                );
            }
            for pair in siblings.windows(2) {
                if pair[0].rgt >= pair[1].lft {
                    report(
                        pair[1].id,
                        format!("interval overlaps sibling {}", pair[0].id),
                    );
                }
            }
        }

        // Rows are in pre-order, so walking backwards sees children first.
        let mut subtree_sizes: HashMap<CategoryId, i64> = HashMap::new();
        for row in rows.iter().rev() {
            let size = 1 + subtree_sizes.get(&row.id).copied().unwrap_or(0);
            if row.span() != 2 * size {
                report(
                    row.id,
                    format!("span {} does not match subtree size {size}", row.span()),
                );
            }
            if let Some(parent_id) = row.parent_id {
                *subtree_sizes.entry(parent_id).or_insert(0) += size;
            }
            subtree_sizes.insert(row.id, size);
        }

        for row in &rows {
            let attached = self.store.count_documents_in(row.id)?;
            if row.amount != attached {
                report(
                    row.id,
                    format!("amount {} but {attached} documents attached", row.amount),
                );
            }
        }

        Ok(violations)
    }
}
