//! Mutation planning: budget checks and direct vs partitioned dispatch
//!
//! The backend caps the number of (row, column) mutations in one commit. An
//! INSERT's count is known from its rows and is checked before submission.
//! UPDATE and DELETE counts depend on how many rows the predicate matches, so
//! they are submitted directly and a cap violation comes back from the
//! executor. Escalating to partitioned DML is always the caller's call:
//! partitioned DML autocommits, is eventually fully applied and is not
//! isolated from concurrent reads.

use crate::ast::{Delete, Insert, Statement, StatementKind, Update};
use crate::config::DialectConfig;
use crate::error::{Error, Result};
use crate::executor::{ExecuteResult, Executor};
use crate::grammar::{Grammar, RenderedStatement};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// The backend's documented per-commit mutation cap.
pub const DEFAULT_MUTATION_BUDGET: u64 = 80_000;

/// Ceiling on mutations in one non-partitioned write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MutationBudget(pub u64);

impl Default for MutationBudget {
    fn default() -> Self {
        MutationBudget(DEFAULT_MUTATION_BUDGET)
    }
}

impl MutationBudget {
    pub fn admits(&self, mutations: u64) -> bool {
        mutations <= self.0
    }
}

/// Predicted mutation count of a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationEstimate {
    /// Exactly this many mutations
    Known(u64),
    /// Bounded by a predicate; only the backend knows
    Unknown,
    /// The statement does not write rows
    ReadOnly,
}

/// How a write is dispatched
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// A regular transactional statement
    Direct(RenderedStatement),
    /// Partitioned DML
    Partitioned(RenderedStatement),
}

impl Plan {
    pub fn statement(&self) -> &RenderedStatement {
        match self {
            Plan::Direct(s) | Plan::Partitioned(s) => s,
        }
    }

    pub fn is_partitioned(&self) -> bool {
        matches!(self, Plan::Partitioned(_))
    }
}

/// Plans and dispatches write statements against the mutation budget.
#[derive(Debug, Clone, Default)]
pub struct MutationPlanner {
    grammar: Grammar,
}

impl MutationPlanner {
    pub fn new(config: DialectConfig) -> Self {
        Self {
            grammar: Grammar::new(config),
        }
    }

    pub fn with_grammar(grammar: Grammar) -> Self {
        Self { grammar }
    }

    pub fn budget(&self) -> MutationBudget {
        self.grammar.config().mutation_budget
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn predict(&self, statement: &Statement) -> MutationEstimate {
        match statement {
            Statement::Insert(insert) => MutationEstimate::Known(insert.mutation_count()),
            Statement::Update(_) | Statement::Delete(_) => MutationEstimate::Unknown,
            Statement::Select(_) | Statement::Ddl(_) => MutationEstimate::ReadOnly,
        }
    }

    /// Plan a write for direct execution.
    ///
    /// An INSERT whose mutations exceed the budget fails here, before it is
    /// ever submitted.
    pub fn plan(&self, statement: &Statement) -> Result<Plan> {
        let budget = self.budget();
        match self.predict(statement) {
            MutationEstimate::ReadOnly => {
                return Err(Error::UnsupportedFeature(format!(
                    "{:?} statements are not planned as writes",
                    statement.kind()
                )));
            }
            MutationEstimate::Known(predicted) if !budget.admits(predicted) => {
                debug!(predicted, budget = budget.0, "insert exceeds mutation budget");
                return Err(Error::MutationLimitExceeded {
                    predicted: Some(predicted),
                    budget: budget.0,
                });
            }
            estimate => debug!(?estimate, budget = budget.0, "planned direct write"),
        }

        Ok(Plan::Direct(self.grammar.render(statement)?))
    }

    /// Plan an UPDATE or DELETE for partitioned execution. Nothing else can
    /// run as partitioned DML.
    pub fn plan_partitioned(&self, statement: &Statement) -> Result<Plan> {
        match statement.kind() {
            StatementKind::Update | StatementKind::Delete => {
                debug!(kind = ?statement.kind(), "planned partitioned write");
                Ok(Plan::Partitioned(self.grammar.render(statement)?))
            }
            kind => Err(Error::UnsupportedFeature(format!(
                "partitioned DML accepts only update and delete, not {:?}",
                kind
            ))),
        }
    }

    /// Split an INSERT into inserts that each fit the budget.
    ///
    /// The pieces commit separately, so the insert as a whole is not atomic.
    pub fn chunk_insert(&self, insert: &Insert) -> Result<Vec<Insert>> {
        let budget = self.budget().0;
        let width = insert.rows.first().map_or(0, |row| row.len() as u64);
        if width == 0 {
            return Ok(vec![insert.clone()]);
        }
        if width > budget {
            return Err(Error::MutationLimitExceeded {
                predicted: Some(width),
                budget,
            });
        }

        let rows_per_chunk = usize::try_from(budget / width).unwrap_or(usize::MAX);
        let chunks: Vec<Insert> = insert
            .rows
            .chunks(rows_per_chunk)
            .map(|rows| Insert {
                table: insert.table.clone(),
                mode: insert.mode,
                rows: rows.to_vec(),
                returning_id: insert.returning_id,
            })
            .collect();
        debug!(
            table = %insert.table,
            rows = insert.rows.len(),
            chunks = chunks.len(),
            "split insert into budget-sized chunks"
        );
        Ok(chunks)
    }

    /// Execute a write directly and return the affected row count.
    ///
    /// A mutation-limit violation reported by the executor is returned as is.
    /// Use [`partitioned_update`](Self::partitioned_update) or
    /// [`partitioned_delete`](Self::partitioned_delete) to escalate.
    pub fn execute<E: Executor>(&self, executor: &E, statement: &Statement) -> Result<u64> {
        let plan = self.plan(statement)?;
        let rendered = plan.statement();
        let (sql, params) = rendered.parameterize()?;

        match executor.execute(&sql, &params, &rendered.options) {
            Ok(ExecuteResult::Affected(count)) => Ok(count),
            Ok(ExecuteResult::Rows(rows)) => Ok(rows.rows.len() as u64),
            Err(e) => {
                if e.is_mutation_limit() {
                    warn!(
                        error = %e,
                        kind = ?rendered.kind,
                        "write exceeded the mutation limit; not retrying"
                    );
                }
                Err(e)
            }
        }
    }

    /// Run an UPDATE as partitioned DML.
    ///
    /// Autocommit, eventually fully applied, not isolated from concurrent
    /// reads. Returns the affected rows summed over partitions.
    pub fn partitioned_update<E: Executor>(&self, executor: &E, update: &Update) -> Result<u64> {
        self.execute_partitioned(executor, &Statement::Update(update.clone()))
    }

    /// Run a DELETE as partitioned DML. Same guarantees as
    /// [`partitioned_update`](Self::partitioned_update).
    pub fn partitioned_delete<E: Executor>(&self, executor: &E, delete: &Delete) -> Result<u64> {
        self.execute_partitioned(executor, &Statement::Delete(delete.clone()))
    }

    fn execute_partitioned<E: Executor>(&self, executor: &E, statement: &Statement) -> Result<u64> {
        let plan = self.plan_partitioned(statement)?;
        let (sql, params) = plan.statement().parameterize()?;
        let affected = executor.execute_partitioned(&sql, &params)?;
        debug!(affected, "partitioned write applied");
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expression, Select};

    fn planner(budget: u64) -> MutationPlanner {
        MutationPlanner::new(DialectConfig::default().with_mutation_budget(budget))
    }

    fn insert(rows: usize, columns: usize) -> Insert {
        let mut insert = Insert::into_table("T");
        for r in 0..rows {
            insert = insert.row(
                (0..columns)
                    .map(|c| (format!("c{}", c), Expression::bind((r * columns + c) as i64).unwrap())),
            );
        }
        insert
    }

    #[test]
    fn test_predict() {
        let planner = MutationPlanner::default();
        assert_eq!(
            planner.predict(&insert(3, 4).into()),
            MutationEstimate::Known(12)
        );
        assert_eq!(
            planner.predict(&Delete::truncate("T").into()),
            MutationEstimate::Unknown
        );
        assert_eq!(
            planner.predict(&Select::from("T").into()),
            MutationEstimate::ReadOnly
        );
    }

    #[test]
    fn test_insert_within_budget_is_direct() {
        let plan = planner(12).plan(&insert(3, 4).into()).unwrap();
        assert!(!plan.is_partitioned());
        assert_eq!(plan.statement().bindings.len(), 12);
    }

    #[test]
    fn test_insert_over_budget_fails_before_submission() {
        let err = planner(11).plan(&insert(3, 4).into()).unwrap_err();
        assert_eq!(
            err,
            Error::MutationLimitExceeded {
                predicted: Some(12),
                budget: 11
            }
        );
        assert!(err.is_mutation_limit());
    }

    #[test]
    fn test_update_and_delete_plan_direct() {
        let planner = planner(1);
        let update = Update::table("T").set("a", Expression::bind(1i64).unwrap());
        assert!(matches!(planner.plan(&update.into()), Ok(Plan::Direct(_))));
        assert!(matches!(
            planner.plan(&Delete::truncate("T").into()),
            Ok(Plan::Direct(_))
        ));
    }

    #[test]
    fn test_plan_rejects_reads() {
        assert!(matches!(
            MutationPlanner::default().plan(&Select::from("T").into()),
            Err(Error::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn test_partitioned_only_for_update_and_delete() {
        let planner = MutationPlanner::default();
        let plan = planner.plan_partitioned(&Delete::truncate("T").into()).unwrap();
        assert!(plan.is_partitioned());
        assert_eq!(plan.statement().sql, "delete from `T` where true");

        assert!(matches!(
            planner.plan_partitioned(&insert(1, 1).into()),
            Err(Error::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn test_chunk_insert() {
        let chunks = planner(10).chunk_insert(&insert(7, 3)).unwrap();
        let sizes: Vec<_> = chunks.iter().map(|c| c.rows.len()).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        assert!(chunks.iter().all(|c| c.mutation_count() <= 10));

        assert!(matches!(
            planner(2).chunk_insert(&insert(1, 3)),
            Err(Error::MutationLimitExceeded { .. })
        ));
    }
}
