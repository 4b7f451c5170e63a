//! Blueprints: ordered schema changes against one table

use super::definition::{
    ColumnDefinition, ForeignKey, IndexDefinition, RowDeletionPolicy, TableDefinition,
    timestamp_columns,
};
use serde::{Deserialize, Serialize};

/// One schema change
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub enum SchemaChange {
    CreateTable(TableDefinition),
    DropTable { if_exists: bool },
    AddColumn(ColumnDefinition),
    /// Replaces the column of the same name
    AlterColumn(ColumnDefinition),
    DropColumn(String),
    CreateIndex(IndexDefinition),
    /// Drops the index with this name
    DropIndex(String),
    AddForeignKey(ForeignKey),
    /// Drops the constraint with this name
    DropForeignKey(String),
    AddRowDeletionPolicy(RowDeletionPolicy),
    ReplaceRowDeletionPolicy(RowDeletionPolicy),
    DropRowDeletionPolicy,
}

/// The changes requested against a single table, in declaration order.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Blueprint {
    pub table: String,
    pub changes: Vec<SchemaChange>,
}

impl Blueprint {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            changes: Vec::new(),
        }
    }

    pub fn changes(&self) -> &[SchemaChange] {
        &self.changes
    }

    pub fn push(mut self, change: SchemaChange) -> Self {
        self.changes.push(change);
        self
    }

    /// Create the table. The definition's name must match the blueprint's.
    pub fn create(self, table: TableDefinition) -> Self {
        self.push(SchemaChange::CreateTable(table))
    }

    pub fn drop(self) -> Self {
        self.push(SchemaChange::DropTable { if_exists: false })
    }

    pub fn drop_if_exists(self) -> Self {
        self.push(SchemaChange::DropTable { if_exists: true })
    }

    pub fn add_column(self, column: ColumnDefinition) -> Self {
        self.push(SchemaChange::AddColumn(column))
    }

    pub fn alter_column(self, column: ColumnDefinition) -> Self {
        self.push(SchemaChange::AlterColumn(column))
    }

    pub fn drop_column(self, name: impl Into<String>) -> Self {
        self.push(SchemaChange::DropColumn(name.into()))
    }

    /// Nullable `created_at` and `updated_at` timestamps. Folded into the
    /// last `create` when there is one, added as columns otherwise.
    pub fn timestamps(mut self) -> Self {
        let create = self.changes.iter_mut().rev().find_map(|change| match change {
            SchemaChange::CreateTable(table) => Some(table),
            _ => None,
        });
        match create {
            Some(table) => table.columns.extend(timestamp_columns()),
            None => self
                .changes
                .extend(timestamp_columns().map(SchemaChange::AddColumn)),
        }
        self
    }

    pub fn index<I, S>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let index = IndexDefinition::new(self.table.clone(), columns);
        self.create_index(index)
    }

    pub fn unique<I, S>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let index = IndexDefinition::new(self.table.clone(), columns).unique();
        self.create_index(index)
    }

    pub fn create_index(self, index: IndexDefinition) -> Self {
        self.push(SchemaChange::CreateIndex(index))
    }

    pub fn drop_index(self, name: impl Into<String>) -> Self {
        self.push(SchemaChange::DropIndex(name.into()))
    }

    pub fn add_foreign_key(self, foreign_key: ForeignKey) -> Self {
        self.push(SchemaChange::AddForeignKey(foreign_key))
    }

    pub fn drop_foreign_key(self, name: impl Into<String>) -> Self {
        self.push(SchemaChange::DropForeignKey(name.into()))
    }

    pub fn add_row_deletion_policy(self, column: impl Into<String>, days: u32) -> Self {
        self.push(SchemaChange::AddRowDeletionPolicy(RowDeletionPolicy::new(
            column, days,
        )))
    }

    pub fn replace_row_deletion_policy(self, column: impl Into<String>, days: u32) -> Self {
        self.push(SchemaChange::ReplaceRowDeletionPolicy(RowDeletionPolicy::new(
            column, days,
        )))
    }

    pub fn drop_row_deletion_policy(self) -> Self {
        self.push(SchemaChange::DropRowDeletionPolicy)
    }
}

impl Extend<SchemaChange> for Blueprint {
    fn extend<T: IntoIterator<Item = SchemaChange>>(&mut self, iter: T) {
        self.changes.extend(iter);
    }
}
