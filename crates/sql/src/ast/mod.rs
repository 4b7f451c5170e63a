//! Abstract statements handed over by the query builder

pub mod dml;
pub mod expressions;

pub use dml::{
    Delete, Direction, IndexHint, IndexHintKind, Insert, InsertMode, Join, JoinKind, LockMode,
    Select, SelectItem, Statement, StatementKind, TableRef, Update,
};
pub use expressions::{ColumnRef, Expression, Operator};
