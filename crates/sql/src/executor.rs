//! Contract with the transport that actually talks to the backend
//!
//! The core renders statements and marshals values; an `Executor` sends them.
//! Retries, sessions and transactions are the executor's business.

use crate::error::Result;
use crate::staleness::TransactionOptions;
use serde::{Deserialize, Serialize};
use spanql_value::{ColumnType, WireValue};

/// A named parameter in the backend's binding format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundParameter {
    /// Placeholder name without the `@` sigil, e.g. `p1`
    pub name: String,
    /// JSON type descriptor (`{"code": "INT64"}`)
    pub type_spec: serde_json::Value,
    pub value: WireValue,
}

/// Rows returned by a query, with the column types needed to decode them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowSet {
    pub columns: Vec<(String, ColumnType)>,
    pub rows: Vec<Vec<WireValue>>,
}

/// Outcome of a single statement
#[derive(Debug, Clone, PartialEq)]
pub enum ExecuteResult {
    Rows(RowSet),
    Affected(u64),
}

/// The execution collaborator.
///
/// Implementations report a commit that exceeds the backend's mutation cap as
/// [`Error::MutationLimitExceeded`](crate::Error::MutationLimitExceeded).
pub trait Executor {
    /// Execute one statement with its parameters under the given options.
    fn execute(
        &self,
        sql: &str,
        params: &[BoundParameter],
        options: &TransactionOptions,
    ) -> Result<ExecuteResult>;

    /// Apply a batch of DDL statements in order.
    fn execute_ddl_batch(&self, statements: &[String]) -> Result<()>;

    /// Execute partitioned DML and wait for it to be fully applied. Returns
    /// the affected row count summed over partitions.
    fn execute_partitioned(&self, sql: &str, params: &[BoundParameter]) -> Result<u64>;
}

impl<E: Executor + ?Sized> Executor for &E {
    fn execute(
        &self,
        sql: &str,
        params: &[BoundParameter],
        options: &TransactionOptions,
    ) -> Result<ExecuteResult> {
        (**self).execute(sql, params, options)
    }

    fn execute_ddl_batch(&self, statements: &[String]) -> Result<()> {
        (**self).execute_ddl_batch(statements)
    }

    fn execute_partitioned(&self, sql: &str, params: &[BoundParameter]) -> Result<u64> {
        (**self).execute_partitioned(sql, params)
    }
}
