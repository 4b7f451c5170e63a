//! Statements: SELECT, INSERT, UPDATE, DELETE and pass-through DDL

use super::expressions::Expression;
use crate::staleness::StalenessBound;
use serde::{Deserialize, Serialize};

/// A table in a FROM or JOIN clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }

    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: Some(alias.into()),
        }
    }
}

/// JOIN types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableRef,
    /// Join condition. Ignored for cross joins.
    pub on: Option<Expression>,
}

/// Index hint kinds a query builder may request. Only `Force` exists in
/// the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexHintKind {
    Force,
    Use,
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexHint {
    pub kind: IndexHintKind,
    pub index: String,
}

impl IndexHint {
    pub fn force(index: impl Into<String>) -> Self {
        Self {
            kind: IndexHintKind::Force,
            index: index.into(),
        }
    }
}

/// Row lock requests. Accepted and dropped during rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockMode {
    Update,
    Shared,
}

/// Sort orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Asc,
    Desc,
}

/// A projected expression with an optional alias
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectItem {
    pub expr: Expression,
    pub alias: Option<String>,
}

/// SELECT statement structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Select {
    /// DISTINCT: whether to deduplicate result rows.
    pub distinct: bool,
    /// Expressions to select. Empty means `*`.
    pub columns: Vec<SelectItem>,
    /// FROM: the table to select from.
    pub from: TableRef,
    /// Index hint attached to the FROM table.
    pub index_hint: Option<IndexHint>,
    pub joins: Vec<Join>,
    /// WHERE: optional condition to filter rows.
    pub r#where: Option<Expression>,
    /// GROUP BY: expressions to group and aggregate by.
    pub group_by: Vec<Expression>,
    /// HAVING: expression to filter groups by.
    pub having: Option<Expression>,
    /// ORDER BY: expressions to sort by, with direction.
    pub order_by: Vec<(Expression, Direction)>,
    /// LIMIT: maximum number of rows to return.
    pub limit: Option<u64>,
    /// OFFSET: row offset to start from.
    pub offset: Option<u64>,
    pub lock: Option<LockMode>,
    /// Read bound, applied out of band. Falls back to the configured default.
    pub staleness: Option<StalenessBound>,
    /// Data boost, applied out of band. Falls back to the configured default.
    pub data_boost: Option<bool>,
}

impl Select {
    /// `select * from <table>`
    pub fn from(table: impl Into<String>) -> Self {
        Self::from_table(TableRef::new(table))
    }

    pub fn from_table(table: TableRef) -> Self {
        Self {
            distinct: false,
            columns: Vec::new(),
            from: table,
            index_hint: None,
            joins: Vec::new(),
            r#where: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            lock: None,
            staleness: None,
            data_boost: None,
        }
    }

    pub fn column(mut self, expr: Expression) -> Self {
        self.columns.push(SelectItem { expr, alias: None });
        self
    }

    pub fn column_as(mut self, expr: Expression, alias: impl Into<String>) -> Self {
        self.columns.push(SelectItem {
            expr,
            alias: Some(alias.into()),
        });
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn index_hint(mut self, hint: Option<IndexHint>) -> Self {
        self.index_hint = hint;
        self
    }

    pub fn force_index(self, index: impl Into<String>) -> Self {
        self.index_hint(Some(IndexHint::force(index)))
    }

    pub fn join(mut self, kind: JoinKind, table: TableRef, on: Option<Expression>) -> Self {
        self.joins.push(Join { kind, table, on });
        self
    }

    /// Add a WHERE predicate, combined with `and` when one exists
    pub fn filter(mut self, predicate: Expression) -> Self {
        self.r#where = Some(match self.r#where.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    pub fn group_by(mut self, expr: Expression) -> Self {
        self.group_by.push(expr);
        self
    }

    pub fn having(mut self, predicate: Expression) -> Self {
        self.having = Some(predicate);
        self
    }

    pub fn order_by(mut self, expr: Expression, direction: Direction) -> Self {
        self.order_by.push((expr, direction));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn lock(mut self, mode: LockMode) -> Self {
        self.lock = Some(mode);
        self
    }

    pub fn staleness(mut self, bound: StalenessBound) -> Self {
        self.staleness = Some(bound);
        self
    }

    pub fn data_boost(mut self, enabled: bool) -> Self {
        self.data_boost = Some(enabled);
        self
    }
}

/// How an INSERT treats rows whose key already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InsertMode {
    /// Fail on an existing key
    #[default]
    Insert,
    /// Skip rows whose key exists
    OrIgnore,
    /// Overwrite rows whose key exists
    OrUpdate,
}

/// INSERT of one or more rows of column/value pairs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insert {
    pub table: String,
    pub mode: InsertMode,
    /// Every row must name the same set of columns.
    pub rows: Vec<Vec<(String, Expression)>>,
    /// Request the engine-generated id of the inserted row (unsupported).
    pub returning_id: bool,
}

impl Insert {
    pub fn into_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            mode: InsertMode::Insert,
            rows: Vec::new(),
            returning_id: false,
        }
    }

    pub fn mode(mut self, mode: InsertMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn row<I, S>(mut self, row: I) -> Self
    where
        I: IntoIterator<Item = (S, Expression)>,
        S: Into<String>,
    {
        self.rows
            .push(row.into_iter().map(|(c, e)| (c.into(), e)).collect());
        self
    }

    /// Mutations the insert applies: one per row and column.
    pub fn mutation_count(&self) -> u64 {
        self.rows.iter().map(|row| row.len() as u64).sum()
    }
}

/// UPDATE of matched rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub table: String,
    pub set: Vec<(String, Expression)>,
    /// `None` updates every row.
    pub r#where: Option<Expression>,
}

impl Update {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            set: Vec::new(),
            r#where: None,
        }
    }

    pub fn set(mut self, column: impl Into<String>, value: Expression) -> Self {
        self.set.push((column.into(), value));
        self
    }

    pub fn filter(mut self, predicate: Expression) -> Self {
        self.r#where = Some(match self.r#where.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }
}

/// DELETE of matched rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delete {
    pub table: String,
    /// `None` deletes every row.
    pub r#where: Option<Expression>,
}

impl Delete {
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            r#where: None,
        }
    }

    /// Delete every row of the table
    pub fn truncate(table: impl Into<String>) -> Self {
        Self::from(table)
    }

    pub fn filter(mut self, predicate: Expression) -> Self {
        self.r#where = Some(match self.r#where.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }
}

/// A statement accepted by the grammar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Select(Select),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    /// DDL text passed through unchanged
    Ddl(String),
}

/// Statement kinds, as reported alongside rendered SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Ddl,
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Statement::Select(_) => StatementKind::Select,
            Statement::Insert(_) => StatementKind::Insert,
            Statement::Update(_) => StatementKind::Update,
            Statement::Delete(_) => StatementKind::Delete,
            Statement::Ddl(_) => StatementKind::Ddl,
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Statement::Insert(_) | Statement::Update(_) | Statement::Delete(_)
        )
    }
}

impl From<Select> for Statement {
    fn from(select: Select) -> Self {
        Statement::Select(select)
    }
}

impl From<Insert> for Statement {
    fn from(insert: Insert) -> Self {
        Statement::Insert(insert)
    }
}

impl From<Update> for Statement {
    fn from(update: Update) -> Self {
        Statement::Update(update)
    }
}

impl From<Delete> for Statement {
    fn from(delete: Delete) -> Self {
        Statement::Delete(delete)
    }
}
