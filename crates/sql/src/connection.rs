//! Connection facade over an executor

use crate::ast::{Delete, Select, Statement, Update};
use crate::config::DialectConfig;
use crate::error::{Error, Result};
use crate::executor::{ExecuteResult, Executor, RowSet};
use crate::grammar::Grammar;
use crate::planner::MutationPlanner;
use crate::schema::{Blueprint, SchemaSynthesizer, TableDefinition};
use spanql_value::{Row, Value, decode};
use tracing::debug;

/// Decoded query results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rows {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Rows {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// The value of column `name` in row `row`
    pub fn get(&self, row: usize, name: &str) -> Option<&Value> {
        let column = self.column_index(name)?;
        self.rows.get(row)?.get(column)
    }

    fn decode(set: RowSet) -> Result<Self> {
        let rows = set
            .rows
            .iter()
            .map(|row| {
                if row.len() != set.columns.len() {
                    return Err(Error::Decoding(format!(
                        "row has {} cells for {} columns",
                        row.len(),
                        set.columns.len()
                    )));
                }
                row.iter()
                    .zip(&set.columns)
                    .map(|(cell, (_, ty))| Ok(decode(ty, cell)?))
                    .collect()
            })
            .collect::<Result<Vec<Row>>>()?;
        Ok(Rows {
            columns: set.columns.into_iter().map(|(name, _)| name).collect(),
            rows,
        })
    }
}

/// Renders, plans and dispatches statements through an [`Executor`].
pub struct Connection<E: Executor> {
    executor: E,
    planner: MutationPlanner,
    synthesizer: SchemaSynthesizer,
}

impl<E: Executor> Connection<E> {
    pub fn new(executor: E, config: DialectConfig) -> Self {
        let synthesizer = SchemaSynthesizer::new(config.codec());
        Self {
            executor,
            planner: MutationPlanner::new(config),
            synthesizer,
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn config(&self) -> &DialectConfig {
        self.grammar().config()
    }

    pub fn grammar(&self) -> &Grammar {
        self.planner.grammar()
    }

    pub fn planner(&self) -> &MutationPlanner {
        &self.planner
    }

    /// Run a query. Staleness and data boost travel as transaction options.
    pub fn select(&self, select: &Select) -> Result<Rows> {
        let rendered = self.grammar().render(&Statement::Select(select.clone()))?;
        let (sql, params) = rendered.parameterize()?;
        match self.executor.execute(&sql, &params, &rendered.options)? {
            ExecuteResult::Rows(set) => Rows::decode(set),
            ExecuteResult::Affected(_) => Err(Error::Execution(
                "query returned an affected count instead of rows".into(),
            )),
        }
    }

    /// Run a write directly and return the affected row count.
    pub fn write(&self, statement: impl Into<Statement>) -> Result<u64> {
        self.planner.execute(&self.executor, &statement.into())
    }

    /// See [`MutationPlanner::partitioned_update`].
    pub fn partitioned_update(&self, update: &Update) -> Result<u64> {
        self.planner.partitioned_update(&self.executor, update)
    }

    /// See [`MutationPlanner::partitioned_delete`].
    pub fn partitioned_delete(&self, delete: &Delete) -> Result<u64> {
        self.planner.partitioned_delete(&self.executor, delete)
    }

    /// Synthesize the blueprint's DDL and apply it as one batch. Returns the
    /// statements that were applied.
    pub fn apply_schema(
        &self,
        existing: Option<&TableDefinition>,
        blueprint: &Blueprint,
    ) -> Result<Vec<String>> {
        self.apply_schema_with(&[], existing, blueprint)
    }

    /// [`apply_schema`](Self::apply_schema) with the database's other tables
    /// in `known`, so interleaving is checked against known parents.
    pub fn apply_schema_with(
        &self,
        known: &[TableDefinition],
        existing: Option<&TableDefinition>,
        blueprint: &Blueprint,
    ) -> Result<Vec<String>> {
        let statements = self
            .synthesizer
            .diff_to_ddl_with(known, existing, blueprint)?;
        if statements.is_empty() {
            debug!(table = %blueprint.table, "no schema changes to apply");
            return Ok(statements);
        }
        self.executor.execute_ddl_batch(&statements)?;
        Ok(statements)
    }

    pub fn to_sql(&self, statement: impl Into<Statement>) -> Result<String> {
        self.grammar().to_sql(&statement.into())
    }

    pub fn to_raw_sql(&self, statement: impl Into<Statement>) -> Result<String> {
        self.grammar().to_raw_sql(&statement.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spanql_value::{ColumnType, WireValue};

    #[test]
    fn test_decode_rows() {
        let set = RowSet {
            columns: vec![
                ("id".into(), ColumnType::Int64),
                ("tags".into(), ColumnType::string_array(spanql_value::Length::Max)),
            ],
            rows: vec![vec![
                WireValue::from(serde_json::json!("42")),
                WireValue::from(serde_json::json!(["a", "b"])),
            ]],
        };
        let rows = Rows::decode(set).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.get(0, "id"), Some(&Value::Int64(42)));
        assert_eq!(rows.get(0, "tags"), Some(&Value::array(["a", "b"])));
        assert_eq!(rows.get(0, "missing"), None);
    }

    #[test]
    fn test_decode_rejects_ragged_rows() {
        let set = RowSet {
            columns: vec![("id".into(), ColumnType::Int64)],
            rows: vec![vec![]],
        };
        assert!(matches!(Rows::decode(set), Err(Error::Decoding(_))));
    }
}
