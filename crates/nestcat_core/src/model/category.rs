//! Category (folder) domain model.
//!
//! # Responsibility
//! - Hold one nested-set row: interval, depth and denormalized counters.
//! - Provide interval predicates used by query and mutation code.
//! - Assemble flat descendant scans into nested trees.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stable category identifier.
pub type CategoryId = i64;

/// Id of the root category seeded by the first migration.
pub const ROOT_CATEGORY_ID: CategoryId = 1;

/// One persisted category row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    /// `None` only for the root category.
    #[serde(rename = "parentID")]
    pub parent_id: Option<CategoryId>,
    pub lft: i64,
    pub rgt: i64,
    /// Root is depth 0; a child is its parent's depth plus one.
    pub depth: i64,
    /// Number of direct children.
    pub children_count: i64,
    /// Number of documents directly attached.
    pub amount: i64,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

impl Category {
    /// Returns whether this is the root category.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Interval width `rgt - lft + 1`, the number of slots the subtree spans.
    pub fn span(&self) -> i64 {
        self.rgt - self.lft + 1
    }

    /// Number of categories in this subtree, self included.
    pub fn subtree_size(&self) -> i64 {
        self.span() / 2
    }

    /// Returns whether `other` lies in this subtree, self included.
    pub fn contains(&self, other: &Category) -> bool {
        self.lft <= other.lft && other.lft <= self.rgt
    }

    /// Returns whether this category has no children.
    pub fn is_leaf(&self) -> bool {
        self.rgt == self.lft + 1
    }
}

/// Category with its nested children, as produced by descendant assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    /// Counts this node and every nested child.
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(CategoryNode::node_count)
            .sum::<usize>()
    }
}

/// One category with its ancestor chain and descendant tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryHierarchy {
    #[serde(flatten)]
    pub category: Category,
    /// Root first, immediate parent last.
    pub ancestors: Vec<Category>,
    /// Direct children in pre-order, each carrying its own subtree.
    pub descendants: Vec<CategoryNode>,
}

/// Builds the child forest of `parent_id` from a flat row set.
///
/// Rows are grouped by `parent_id` once, so assembly is linear in the number
/// of rows. Sibling order follows the input order; feeding rows sorted by
/// `lft` yields pre-order siblings. Rows whose parent is absent from the
/// set (and is not `parent_id`) are dropped.
pub fn assemble_tree(rows: Vec<Category>, parent_id: CategoryId) -> Vec<CategoryNode> {
    let mut by_parent: HashMap<CategoryId, Vec<Category>> = HashMap::new();
    for row in rows {
        if let Some(parent) = row.parent_id {
            by_parent.entry(parent).or_default().push(row);
        }
    }
    build_children(&mut by_parent, parent_id)
}

fn build_children(
    by_parent: &mut HashMap<CategoryId, Vec<Category>>,
    parent_id: CategoryId,
) -> Vec<CategoryNode> {
    let Some(children) = by_parent.remove(&parent_id) else {
        return Vec::new();
    };
    children
        .into_iter()
        .map(|category| {
            let children = build_children(by_parent, category.id);
            CategoryNode { category, children }
        })
        .collect()
}
