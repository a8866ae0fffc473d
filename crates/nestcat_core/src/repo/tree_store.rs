//! Nested-set tree store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Load and save category rows, apply bulk interval shifts.
//! - Read category rows through typed range predicates.
//! - Maintain document membership rows and the atomic `amount` counter.
//! - Scope work in one writer transaction.
//!
//! # Invariants
//! - `with_transaction` commits only when the closure returns `Ok`; errors
//!   and panics roll back every write made inside it.
//! - A `with_transaction` call on a connection that already has an open
//!   transaction joins it instead of nesting.
//! - Counter updates are column expressions (`amount = amount + ?`), never
//!   read-modify-write round trips.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::category::{Category, CategoryId, ROOT_CATEGORY_ID};
use crate::model::document::{Document, DocumentId};
use crate::repo::document_repo::{parse_document_row, DOCUMENT_SELECT_SQL};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};
use std::error::Error;
use std::fmt::{Display, Formatter};

const CATEGORY_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    parent_id,
    lft,
    rgt,
    depth,
    children_count,
    amount,
    created_at,
    updated_at
FROM categories";

/// Result type used by tree store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from tree store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Write rejected by a unique constraint.
    Conflict(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Conflict(message) => write!(f, "constraint conflict: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "tree store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "tree store requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "tree store requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid tree data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(err, message) = &value {
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
                let detail = message.clone().unwrap_or_else(|| err.to_string());
                return Self::Conflict(detail);
            }
        }
        Self::Db(DbError::Sqlite(value))
    }
}

/// Interval column touched by a bulk shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalColumn {
    Lft,
    Rgt,
}

impl IntervalColumn {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Lft => "lft",
            Self::Rgt => "rgt",
        }
    }
}

/// Adds `delta` to `column` on every row whose `column >= from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalShift {
    pub column: IntervalColumn,
    /// Inclusive lower bound.
    pub from: i64,
    pub delta: i64,
}

impl IntervalShift {
    pub fn new(column: IntervalColumn, from: i64, delta: i64) -> Self {
        Self {
            column,
            from,
            delta,
        }
    }
}

/// Row predicate for category reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryFilter {
    /// Every category, root included.
    All,
    /// Every category except the root.
    NonRoot,
    /// Categories whose id is listed.
    Ids(Vec<CategoryId>),
    /// Direct children of one category.
    ChildrenOf(CategoryId),
    /// `lft < lft AND rgt > rgt`.
    StrictAncestorsOf { lft: i64, rgt: i64 },
    /// `lft > lft AND rgt < rgt`.
    StrictDescendantsOf { lft: i64, rgt: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Row order for category reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryOrder {
    /// Pre-order traversal.
    LftAsc,
    CreatedAt(SortDirection),
    UpdatedAt(SortDirection),
}

impl CategoryOrder {
    fn as_sql(self) -> String {
        match self {
            Self::LftAsc => "lft ASC".to_string(),
            Self::CreatedAt(direction) => {
                format!("created_at {0}, id {0}", direction.as_sql())
            }
            Self::UpdatedAt(direction) => {
                format!("updated_at {0}, id {0}", direction.as_sql())
            }
        }
    }
}

/// Typed query for category reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryQuery {
    pub filter: CategoryFilter,
    /// Case-insensitive substring match on `name`.
    pub name_contains: Option<String>,
    pub order: CategoryOrder,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl CategoryQuery {
    /// Unpaged query in pre-order.
    pub fn new(filter: CategoryFilter) -> Self {
        Self {
            filter,
            name_contains: None,
            order: CategoryOrder::LftAsc,
            limit: None,
            offset: 0,
        }
    }

    pub fn ordered_by(mut self, order: CategoryOrder) -> Self {
        self.order = order;
        self
    }
}

/// Values for inserting one category row at a precomputed interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategoryRow<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub parent_id: CategoryId,
    pub lft: i64,
    pub rgt: i64,
    pub depth: i64,
}

/// Caller-editable category fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryFields {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl CategoryFields {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

/// Persistence interface for the nested-set category tree.
pub trait TreeStore {
    /// Loads one category by id.
    fn get(&self, id: CategoryId) -> StoreResult<Option<Category>>;
    /// Reads categories matching `query`.
    fn find(&self, query: &CategoryQuery) -> StoreResult<Vec<Category>>;
    /// Counts categories matching `query`, ignoring limit/offset.
    fn count(&self, query: &CategoryQuery) -> StoreResult<i64>;
    /// Inserts one category row and returns it.
    fn insert(&self, row: &NewCategoryRow<'_>) -> StoreResult<Category>;
    /// Writes caller-editable fields. Returns `false` when `id` is unknown.
    fn update_fields(&self, id: CategoryId, fields: &CategoryFields) -> StoreResult<bool>;
    /// Applies one interval shift; returns affected row count.
    fn bulk_shift(&self, shift: IntervalShift) -> StoreResult<usize>;
    /// Negates the intervals of every row within `[lft, rgt]`, taking the
    /// subtree out of the positive coordinate space.
    fn detach_subtree(&self, lft: i64, rgt: i64) -> StoreResult<usize>;
    /// Restores detached rows at `-lft + offset` and adjusts their depth.
    fn attach_detached(&self, offset: i64, depth_delta: i64) -> StoreResult<usize>;
    /// Rewrites the parent reference of one category.
    fn set_parent(&self, id: CategoryId, parent_id: CategoryId) -> StoreResult<()>;
    /// Atomically adds `delta` to `children_count`.
    fn adjust_children_count(&self, id: CategoryId, delta: i64) -> StoreResult<()>;
    /// Removes one category row. Returns `false` when `id` is unknown.
    fn delete_row(&self, id: CategoryId) -> StoreResult<bool>;
    /// Atomically adds `delta` to `amount`.
    fn adjust_amount(&self, id: CategoryId, delta: i64) -> StoreResult<()>;
    /// Sets `amount` to zero.
    fn reset_amount(&self, id: CategoryId) -> StoreResult<()>;
    /// Loads one document by id.
    fn get_document(&self, id: DocumentId) -> StoreResult<Option<Document>>;
    /// Lists documents attached to `category_id`.
    fn documents_in(&self, category_id: CategoryId) -> StoreResult<Vec<Document>>;
    /// Counts documents attached to `category_id`.
    fn count_documents_in(&self, category_id: CategoryId) -> StoreResult<i64>;
    /// Attaches or detaches one document. Returns `false` when unknown.
    fn set_document_category(
        &self,
        id: DocumentId,
        category_id: Option<CategoryId>,
    ) -> StoreResult<bool>;
    /// Detaches every document from `category_id`; returns detached count.
    fn clear_category_documents(&self, category_id: CategoryId) -> StoreResult<usize>;
    /// Runs `f` inside one writer transaction.
    fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<StoreError>;
}

/// SQLite-backed tree store.
#[derive(Clone, Copy)]
pub struct SqliteTreeStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTreeStore<'conn> {
    /// Creates store from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_store_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TreeStore for SqliteTreeStore<'_> {
    fn get(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        self.conn
            .query_row(
                &format!("{CATEGORY_SELECT_SQL} WHERE id = ?1;"),
                [id],
                |row| Ok(parse_category_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn find(&self, query: &CategoryQuery) -> StoreResult<Vec<Category>> {
        let mut sql = String::from(CATEGORY_SELECT_SQL);
        let mut bind_values = Vec::new();
        push_where_clause(query, &mut sql, &mut bind_values);

        sql.push_str(" ORDER BY ");
        sql.push_str(&query.order.as_sql());
        match (query.limit, query.offset) {
            (Some(limit), offset) => {
                sql.push_str(" LIMIT ? OFFSET ?");
                bind_values.push(Value::Integer(i64::from(limit)));
                bind_values.push(Value::Integer(i64::from(offset)));
            }
            (None, 0) => {}
            (None, offset) => {
                sql.push_str(" LIMIT -1 OFFSET ?");
                bind_values.push(Value::Integer(i64::from(offset)));
            }
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_category_row(row)?);
        }
        Ok(items)
    }

    fn count(&self, query: &CategoryQuery) -> StoreResult<i64> {
        let mut sql = String::from("SELECT COUNT(*) FROM categories");
        let mut bind_values = Vec::new();
        push_where_clause(query, &mut sql, &mut bind_values);
        let count = self
            .conn
            .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        Ok(count)
    }

    fn insert(&self, row: &NewCategoryRow<'_>) -> StoreResult<Category> {
        self.conn.execute(
            "INSERT INTO categories (
                name,
                description,
                parent_id,
                lft,
                rgt,
                depth,
                children_count,
                amount
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, 0);",
            params![
                row.name,
                row.description,
                row.parent_id,
                row.lft,
                row.rgt,
                row.depth,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get(id)?.ok_or_else(|| {
            StoreError::InvalidData(format!("inserted category {id} not found in read-back"))
        })
    }

    fn update_fields(&self, id: CategoryId, fields: &CategoryFields) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE categories
             SET name = COALESCE(?2, name),
                 description = COALESCE(?3, description),
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id, fields.name.as_deref(), fields.description.as_deref()],
        )?;
        Ok(changed > 0)
    }

    fn bulk_shift(&self, shift: IntervalShift) -> StoreResult<usize> {
        let column = shift.column.as_sql();
        let changed = self.conn.execute(
            &format!("UPDATE categories SET {column} = {column} + ?2 WHERE {column} >= ?1;"),
            params![shift.from, shift.delta],
        )?;
        Ok(changed)
    }

    fn detach_subtree(&self, lft: i64, rgt: i64) -> StoreResult<usize> {
        let changed = self.conn.execute(
            "UPDATE categories
             SET lft = -lft,
                 rgt = -rgt
             WHERE lft >= ?1
               AND rgt <= ?2;",
            params![lft, rgt],
        )?;
        Ok(changed)
    }

    fn attach_detached(&self, offset: i64, depth_delta: i64) -> StoreResult<usize> {
        let changed = self.conn.execute(
            "UPDATE categories
             SET lft = -lft + ?1,
                 rgt = -rgt + ?1,
                 depth = depth + ?2
             WHERE lft < 0;",
            params![offset, depth_delta],
        )?;
        Ok(changed)
    }

    fn set_parent(&self, id: CategoryId, parent_id: CategoryId) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE categories
             SET parent_id = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id, parent_id],
        )?;
        Ok(())
    }

    fn adjust_children_count(&self, id: CategoryId, delta: i64) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE categories
             SET children_count = children_count + ?2
             WHERE id = ?1;",
            params![id, delta],
        )?;
        Ok(())
    }

    fn delete_row(&self, id: CategoryId) -> StoreResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM categories WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }

    fn adjust_amount(&self, id: CategoryId, delta: i64) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE categories
             SET amount = amount + ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id, delta],
        )?;
        Ok(())
    }

    fn reset_amount(&self, id: CategoryId) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE categories
             SET amount = 0,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            [id],
        )?;
        Ok(())
    }

    fn get_document(&self, id: DocumentId) -> StoreResult<Option<Document>> {
        self.conn
            .query_row(
                &format!("{DOCUMENT_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                |row| Ok(parse_document_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn documents_in(&self, category_id: CategoryId) -> StoreResult<Vec<Document>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DOCUMENT_SELECT_SQL} WHERE category_id = ?1 ORDER BY created_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([category_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_document_row(row)?);
        }
        Ok(items)
    }

    fn count_documents_in(&self, category_id: CategoryId) -> StoreResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE category_id = ?1;",
            [category_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn set_document_category(
        &self,
        id: DocumentId,
        category_id: Option<CategoryId>,
    ) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE documents
             SET category_id = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id.to_string(), category_id],
        )?;
        Ok(changed > 0)
    }

    fn clear_category_documents(&self, category_id: CategoryId) -> StoreResult<usize> {
        let changed = self.conn.execute(
            "UPDATE documents
             SET category_id = NULL,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE category_id = ?1;",
            [category_id],
        )?;
        Ok(changed)
    }

    fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<StoreError>,
    {
        if !self.conn.is_autocommit() {
            return f(self);
        }

        // Statements issued through `self.conn` run inside `tx`; dropping it
        // without commit (error return or unwind) rolls everything back.
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        let value = f(self)?;
        tx.commit().map_err(StoreError::from)?;
        Ok(value)
    }
}

fn push_where_clause(query: &CategoryQuery, sql: &mut String, bind_values: &mut Vec<Value>) {
    let mut conditions: Vec<String> = Vec::new();
    match &query.filter {
        CategoryFilter::All => {}
        CategoryFilter::NonRoot => conditions.push("parent_id IS NOT NULL".to_string()),
        CategoryFilter::Ids(ids) if ids.is_empty() => conditions.push("0 = 1".to_string()),
        CategoryFilter::Ids(ids) => {
            let placeholders = vec!["?"; ids.len()].join(", ");
            conditions.push(format!("id IN ({placeholders})"));
            bind_values.extend(ids.iter().map(|id| Value::Integer(*id)));
        }
        CategoryFilter::ChildrenOf(parent_id) => {
            conditions.push("parent_id = ?".to_string());
            bind_values.push(Value::Integer(*parent_id));
        }
        CategoryFilter::StrictAncestorsOf { lft, rgt } => {
            conditions.push("lft < ? AND rgt > ?".to_string());
            bind_values.push(Value::Integer(*lft));
            bind_values.push(Value::Integer(*rgt));
        }
        CategoryFilter::StrictDescendantsOf { lft, rgt } => {
            conditions.push("lft > ? AND rgt < ?".to_string());
            bind_values.push(Value::Integer(*lft));
            bind_values.push(Value::Integer(*rgt));
        }
    }

    if let Some(key) = query.name_contains.as_ref() {
        conditions.push("instr(lower(name), lower(?)) > 0".to_string());
        bind_values.push(Value::Text(key.clone()));
    }

    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
}

fn parse_category_row(row: &Row<'_>) -> StoreResult<Category> {
    let id: CategoryId = row.get("id")?;
    let parent_id: Option<CategoryId> = row.get("parent_id")?;
    if parent_id.is_none() && id != ROOT_CATEGORY_ID {
        return Err(StoreError::InvalidData(format!(
            "category {id} has no parent but is not the root"
        )));
    }

    Ok(Category {
        id,
        name: row.get("name")?,
        description: row.get("description")?,
        parent_id,
        lft: row.get("lft")?,
        rgt: row.get("rgt")?,
        depth: row.get("depth")?,
        children_count: row.get("children_count")?,
        amount: row.get("amount")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn ensure_store_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    const REQUIRED: &[(&str, &[&str])] = &[
        (
            "categories",
            &[
                "id",
                "name",
                "description",
                "parent_id",
                "lft",
                "rgt",
                "depth",
                "children_count",
                "amount",
                "created_at",
                "updated_at",
            ],
        ),
        ("documents", &["id", "title", "category_id"]),
    ];

    for &(table, columns) in REQUIRED {
        if !table_exists(conn, table)? {
            return Err(StoreError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(StoreError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> StoreResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::{
        CategoryFilter, CategoryQuery, IntervalColumn, IntervalShift, SqliteTreeStore, StoreError,
        TreeStore,
    };
    use crate::db::open_db_in_memory;
    use rusqlite::Connection;
    use uuid::Uuid;

    #[test]
    fn try_new_rejects_unmigrated_connection() {
        let conn = Connection::open_in_memory().unwrap();
        let err = SqliteTreeStore::try_new(&conn).err().unwrap();
        assert!(matches!(
            err,
            StoreError::UninitializedConnection {
                actual_version: 0,
                ..
            }
        ));
    }

    #[test]
    fn bulk_shift_only_touches_rows_at_or_beyond_bound() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteTreeStore::try_new(&conn).unwrap();

        let changed = store
            .bulk_shift(IntervalShift::new(IntervalColumn::Rgt, 2, 4))
            .unwrap();
        assert_eq!(changed, 1);
        let untouched = store
            .bulk_shift(IntervalShift::new(IntervalColumn::Lft, 2, 4))
            .unwrap();
        assert_eq!(untouched, 0);

        let root = store.get(1).unwrap().unwrap();
        assert_eq!((root.lft, root.rgt), (1, 6));
    }

    #[test]
    fn get_returns_none_for_unknown_ids() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteTreeStore::try_new(&conn).unwrap();

        assert!(store.get(404).unwrap().is_none());
        assert!(store.get_document(Uuid::new_v4()).unwrap().is_none());
        assert_eq!(store.get(1).unwrap().unwrap().name, "Root");
    }

    #[test]
    fn empty_id_filter_matches_nothing() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteTreeStore::try_new(&conn).unwrap();
        let query = CategoryQuery::new(CategoryFilter::Ids(Vec::new()));
        assert!(store.find(&query).unwrap().is_empty());
        assert_eq!(store.count(&query).unwrap(), 0);
    }

    #[test]
    fn with_transaction_rolls_back_on_error_and_joins_open_transaction() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteTreeStore::try_new(&conn).unwrap();

        let result: Result<(), StoreError> = store.with_transaction(|tx| {
            tx.adjust_amount(1, 5)?;
            tx.with_transaction(|inner| inner.adjust_amount(1, 1))?;
            Err(StoreError::InvalidData("forced".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(store.get(1).unwrap().unwrap().amount, 0);
        assert!(conn.is_autocommit());

        store
            .with_transaction(|tx| tx.adjust_amount(1, 3))
            .unwrap();
        assert_eq!(store.get(1).unwrap().unwrap().amount, 3);
    }

    #[test]
    fn with_transaction_rolls_back_on_panic() {
        let conn = open_db_in_memory().unwrap();
        let store = SqliteTreeStore::try_new(&conn).unwrap();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _: Result<(), StoreError> = store.with_transaction(|tx| {
                tx.adjust_amount(1, 7)?;
                panic!("abort mid-transaction");
            });
        }));
        assert!(outcome.is_err());
        assert!(conn.is_autocommit());
        assert_eq!(store.get(1).unwrap().unwrap().amount, 0);
    }
}
