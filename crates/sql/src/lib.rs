//! A Spanner dialect layer for a generic query and schema builder
//!
//! This crate provides:
//! - A stateless grammar that renders statement ASTs into Spanner SQL with
//!   positional bindings and out-of-band read options
//! - A mutation planner that checks writes against the per-commit mutation
//!   cap and dispatches explicit partitioned DML
//! - A schema synthesizer that turns blueprints into ordered DDL batches,
//!   including interleaved tables and row deletion policies
//! - A `Connection` facade that ties them to an [`Executor`]
//!
//! Value marshaling lives in `spanql_value` and is re-exported here.

pub mod ast;
mod config;
mod connection;
mod error;
mod executor;
pub mod grammar;
pub mod planner;
pub mod schema;
mod staleness;

pub use ast::Statement;
pub use config::DialectConfig;
pub use connection::{Connection, Rows};
pub use error::{Error, Result};
pub use executor::{BoundParameter, ExecuteResult, Executor, RowSet};
pub use grammar::{Grammar, RenderedStatement, quote_identifier};
pub use planner::{MutationBudget, MutationEstimate, MutationPlanner, Plan};
pub use schema::{Blueprint, SchemaChange, SchemaSynthesizer};
pub use staleness::{ReadOnlyOptions, StalenessBound, TransactionOptions};

pub use spanql_value::{
    CodecConfig, ColumnType, DefaultExpression, Length, Numeric, Row, TypedValue, Value, WireValue,
};
