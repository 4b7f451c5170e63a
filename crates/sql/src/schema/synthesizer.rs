//! Blueprint to DDL synthesis
//!
//! Changes are checked against a known table state, rendered one statement
//! each, and emitted in dependency order:
//!
//! 1. drop index, drop constraint, drop row deletion policy
//! 2. create table, column changes
//! 3. add or replace row deletion policy
//! 4. create index
//! 5. add constraint
//! 6. drop table
//!
//! Declaration order is kept within each group.

use super::blueprint::{Blueprint, SchemaChange};
use super::definition::{
    ForeignKey, IndexDefinition, OnDelete, RowDeletionPolicy, TableDefinition,
};
use super::naming::{IndexNamer, default_foreign_key_name};
use crate::error::{Error, Result};
use crate::grammar::{quote_identifier, quote_identifiers};
use spanql_value::CodecConfig;
use tracing::debug;

const GROUPS: usize = 6;
const DROP_DEPENDENTS: usize = 0;
const TABLE: usize = 1;
const POLICY: usize = 2;
const INDEXES: usize = 3;
const CONSTRAINTS: usize = 4;
const DROP_TABLE: usize = 5;

/// Turns blueprints into ordered DDL batches.
#[derive(Debug, Clone, Default)]
pub struct SchemaSynthesizer {
    codec: CodecConfig,
}

impl SchemaSynthesizer {
    pub fn new(codec: CodecConfig) -> Self {
        Self { codec }
    }

    /// Render `blueprint` as DDL statements in batch order.
    ///
    /// `existing` is the table as it is now, or `None` when unknown. Once
    /// the state is known, either from `existing` or from a `CreateTable`
    /// in the blueprint, every change is checked against it: a change that
    /// contradicts the state fails with [`Error::PolicyConflict`]. Without
    /// a known state the changes are rendered unchecked.
    pub fn diff_to_ddl(
        &self,
        existing: Option<&TableDefinition>,
        blueprint: &Blueprint,
    ) -> Result<Vec<String>> {
        self.diff_to_ddl_with(&[], existing, blueprint)
    }

    /// Like [`diff_to_ddl`](Self::diff_to_ddl), with the other tables of the
    /// database in `known`. A table or index interleaved in a known parent
    /// must have a key that starts with the parent's primary key.
    pub fn diff_to_ddl_with(
        &self,
        known: &[TableDefinition],
        existing: Option<&TableDefinition>,
        blueprint: &Blueprint,
    ) -> Result<Vec<String>> {
        let mut state = TableState::new(&blueprint.table, existing);
        let mut namer = IndexNamer::new();
        // An add or replace of the policy is pending in this batch
        let mut policy_pending = false;
        let mut groups: [Vec<String>; GROUPS] = Default::default();
        let table = quote_identifier(&blueprint.table);

        for change in &blueprint.changes {
            if state.dropped {
                return Err(Error::InvalidDefinition(format!(
                    "`{}` has changes after it is dropped",
                    blueprint.table
                )));
            }

            match change {
                SchemaChange::CreateTable(definition) => {
                    if definition.name != blueprint.table {
                        return Err(Error::InvalidDefinition(format!(
                            "blueprint for `{}` cannot create `{}`",
                            blueprint.table, definition.name
                        )));
                    }
                    definition.validate()?;
                    if let Some(parent) = definition
                        .interleave
                        .as_ref()
                        .and_then(|interleave| find_table(known, &interleave.parent))
                    {
                        definition.validate_interleave(parent)?;
                    }
                    state.create(definition)?;
                    policy_pending |= definition.row_deletion_policy.is_some();
                    groups[TABLE].push(self.create_table(definition)?);
                }
                SchemaChange::DropTable { if_exists } => {
                    state.drop(*if_exists)?;
                    groups[DROP_TABLE].push(if *if_exists {
                        format!("drop table if exists {}", table)
                    } else {
                        format!("drop table {}", table)
                    });
                }
                SchemaChange::AddColumn(column) => {
                    if let Some(current) = state.table_mut()? {
                        if current.get_column(&column.name).is_some() {
                            return Err(conflict(format!(
                                "column `{}` already exists in `{}`",
                                column.name, current.name
                            )));
                        }
                        current.columns.push(column.clone());
                    }
                    groups[TABLE].push(format!(
                        "alter table {} add column {}",
                        table,
                        column.to_ddl(&self.codec)?
                    ));
                }
                SchemaChange::AlterColumn(column) => {
                    if let Some(current) = state.table_mut()? {
                        let slot = current
                            .columns
                            .iter_mut()
                            .find(|c| c.name == column.name)
                            .ok_or_else(|| missing_column(&column.name, &blueprint.table))?;
                        let drives_policy = current
                            .row_deletion_policy
                            .as_ref()
                            .is_some_and(|policy| policy.column == column.name);
                        if drives_policy && !column.column_type.is_temporal() {
                            return Err(conflict(format!(
                                "column `{}` of `{}` drives its row deletion policy and must stay date or timestamp",
                                column.name, current.name
                            )));
                        }
                        *slot = column.clone();
                    }
                    groups[TABLE].push(format!(
                        "alter table {} alter column {}",
                        table,
                        column.to_ddl(&self.codec)?
                    ));
                }
                SchemaChange::DropColumn(name) => {
                    if let Some(current) = state.table_mut()? {
                        if current.primary_key.contains(name) {
                            return Err(Error::InvalidDefinition(format!(
                                "cannot drop primary key column `{}` of `{}`",
                                name, current.name
                            )));
                        }
                        if current
                            .row_deletion_policy
                            .as_ref()
                            .is_some_and(|policy| &policy.column == name)
                        {
                            return Err(conflict(format!(
                                "column `{}` of `{}` drives its row deletion policy; drop the policy first",
                                name, current.name
                            )));
                        }
                        let before = current.columns.len();
                        current.columns.retain(|c| &c.name != name);
                        if current.columns.len() == before {
                            return Err(missing_column(name, &blueprint.table));
                        }
                    }
                    groups[TABLE].push(format!(
                        "alter table {} drop column {}",
                        table,
                        quote_identifier(name)
                    ));
                }
                SchemaChange::AddRowDeletionPolicy(policy) => {
                    if let Some(current) = state.table_mut()? {
                        if current.row_deletion_policy.is_some() {
                            return Err(conflict(format!(
                                "`{}` already has a row deletion policy; replace it instead",
                                current.name
                            )));
                        }
                        current.validate_policy(policy)?;
                        current.row_deletion_policy = Some(policy.clone());
                    }
                    policy_pending = true;
                    groups[POLICY].push(format!(
                        "alter table {} add row deletion policy ({})",
                        table,
                        alter_policy(policy)
                    ));
                }
                SchemaChange::ReplaceRowDeletionPolicy(policy) => {
                    if let Some(current) = state.table_mut()? {
                        if current.row_deletion_policy.is_none() {
                            return Err(no_policy(&current.name, "replace"));
                        }
                        current.validate_policy(policy)?;
                        current.row_deletion_policy = Some(policy.clone());
                    }
                    policy_pending = true;
                    groups[POLICY].push(format!(
                        "alter table {} replace row deletion policy ({})",
                        table,
                        alter_policy(policy)
                    ));
                }
                SchemaChange::DropRowDeletionPolicy => {
                    if policy_pending {
                        return Err(Error::InvalidDefinition(format!(
                            "blueprint for `{}` drops a row deletion policy it also adds or replaces",
                            blueprint.table
                        )));
                    }
                    if let Some(current) = state.table_mut()? {
                        if current.row_deletion_policy.take().is_none() {
                            return Err(no_policy(&current.name, "drop"));
                        }
                    }
                    groups[DROP_DEPENDENTS]
                        .push(format!("alter table {} drop row deletion policy", table));
                }
                SchemaChange::CreateIndex(index) => {
                    if index.table != blueprint.table {
                        return Err(Error::InvalidDefinition(format!(
                            "blueprint for `{}` cannot index `{}`",
                            blueprint.table, index.table
                        )));
                    }
                    index.validate()?;
                    if let Some(parent) = index
                        .interleave_in
                        .as_deref()
                        .and_then(|parent| find_table(known, parent))
                    {
                        index.validate_interleave(parent)?;
                    }
                    if let Some(current) = state.table()? {
                        for column in index.columns.iter().chain(&index.storing) {
                            if current.get_column(column).is_none() {
                                return Err(Error::InvalidDefinition(format!(
                                    "index column `{}` does not exist in `{}`",
                                    column, current.name
                                )));
                            }
                        }
                    }
                    let name = namer.name_for(index)?;
                    groups[INDEXES].push(create_index(&name, index));
                }
                SchemaChange::DropIndex(name) => {
                    groups[DROP_DEPENDENTS].push(format!("drop index {}", quote_identifier(name)));
                }
                SchemaChange::AddForeignKey(foreign_key) => {
                    foreign_key.validate(&blueprint.table)?;
                    groups[CONSTRAINTS].push(add_constraint(&blueprint.table, foreign_key));
                }
                SchemaChange::DropForeignKey(name) => {
                    groups[DROP_DEPENDENTS].push(format!(
                        "alter table {} drop constraint {}",
                        table,
                        quote_identifier(name)
                    ));
                }
            }
        }

        let statements: Vec<String> = groups.into_iter().flatten().collect();
        debug!(
            table = %blueprint.table,
            statements = statements.len(),
            ddl = ?statements,
            "synthesized ddl batch"
        );
        Ok(statements)
    }

    fn create_table(&self, definition: &TableDefinition) -> Result<String> {
        let columns = definition
            .columns
            .iter()
            .map(|c| c.to_ddl(&self.codec))
            .collect::<Result<Vec<_>>>()?;

        let mut ddl = format!(
            "create table {} ({}) primary key ({})",
            quote_identifier(&definition.name),
            columns.join(", "),
            quote_identifiers(&definition.primary_key)
        );
        if let Some(interleave) = &definition.interleave {
            ddl.push_str(", interleave in parent ");
            ddl.push_str(&quote_identifier(&interleave.parent));
            if interleave.on_delete == OnDelete::Cascade {
                ddl.push_str(" on delete cascade");
            }
        }
        if let Some(policy) = &definition.row_deletion_policy {
            ddl.push_str(", row deletion policy (");
            ddl.push_str(&policy.expression(&policy.column));
            ddl.push(')');
        }
        Ok(ddl)
    }
}

fn alter_policy(policy: &RowDeletionPolicy) -> String {
    policy.expression(&quote_identifier(&policy.column))
}

fn create_index(name: &str, index: &IndexDefinition) -> String {
    let mut ddl = String::from("create ");
    if index.unique {
        ddl.push_str("unique ");
    }
    if index.null_filtered {
        ddl.push_str("null_filtered ");
    }
    ddl.push_str(&format!(
        "index {} on {} ({})",
        quote_identifier(name),
        quote_identifier(&index.table),
        quote_identifiers(&index.columns)
    ));
    if !index.storing.is_empty() {
        ddl.push_str(&format!(" storing ({})", quote_identifiers(&index.storing)));
    }
    if let Some(parent) = &index.interleave_in {
        ddl.push_str(&format!(", interleave in {}", quote_identifier(parent)));
    }
    ddl
}

fn add_constraint(table: &str, foreign_key: &ForeignKey) -> String {
    format!(
        "alter table {} add constraint {} foreign key ({}) references {} ({})",
        quote_identifier(table),
        quote_identifier(&default_foreign_key_name(table, foreign_key)),
        quote_identifiers(&foreign_key.columns),
        quote_identifier(&foreign_key.references),
        quote_identifiers(&foreign_key.referenced_columns)
    )
}

fn find_table<'a>(tables: &'a [TableDefinition], name: &str) -> Option<&'a TableDefinition> {
    tables.iter().find(|table| table.name == name)
}

fn conflict(message: String) -> Error {
    Error::PolicyConflict(message)
}

fn missing_column(column: &str, table: &str) -> Error {
    conflict(format!("column `{}` does not exist in `{}`", column, table))
}

fn no_policy(table: &str, action: &str) -> Error {
    conflict(format!(
        "`{}` has no row deletion policy to {}",
        table, action
    ))
}

/// What is known about the table while a blueprint is applied
struct TableState<'a> {
    name: &'a str,
    /// Whether `current` reflects the real table
    known: bool,
    current: Option<TableDefinition>,
    dropped: bool,
}

impl<'a> TableState<'a> {
    fn new(name: &'a str, existing: Option<&TableDefinition>) -> Self {
        Self {
            name,
            known: existing.is_some(),
            current: existing.cloned(),
            dropped: false,
        }
    }

    fn create(&mut self, definition: &TableDefinition) -> Result<()> {
        if self.current.is_some() {
            return Err(conflict(format!("table `{}` already exists", self.name)));
        }
        self.known = true;
        self.current = Some(definition.clone());
        Ok(())
    }

    fn drop(&mut self, if_exists: bool) -> Result<()> {
        if self.known && self.current.is_none() && !if_exists {
            return Err(conflict(format!("table `{}` does not exist", self.name)));
        }
        self.current = None;
        self.dropped = true;
        Ok(())
    }

    /// The known table, `None` when nothing is known, or a conflict when
    /// the table is known to be absent.
    fn table(&self) -> Result<Option<&TableDefinition>> {
        match (&self.current, self.known) {
            (Some(table), _) => Ok(Some(table)),
            (None, false) => Ok(None),
            (None, true) => Err(self.absent()),
        }
    }

    fn table_mut(&mut self) -> Result<Option<&mut TableDefinition>> {
        if self.known && self.current.is_none() {
            return Err(self.absent());
        }
        Ok(self.current.as_mut())
    }

    fn absent(&self) -> Error {
        conflict(format!("table `{}` does not exist", self.name))
    }
}
