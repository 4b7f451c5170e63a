//! Schema definitions and DDL synthesis

mod blueprint;
mod definition;
mod diff;
mod naming;
mod synthesizer;

pub use blueprint::{Blueprint, SchemaChange};
pub use definition::{
    ColumnDefinition, DEFAULT_STRING_LENGTH, ForeignKey, IndexDefinition, Interleave, OnDelete,
    RowDeletionPolicy, TableDefinition,
};
pub use diff::{diff_indexes, diff_tables};
pub use naming::{IndexNamer, default_foreign_key_name, default_index_name, derive_name};
pub use synthesizer::SchemaSynthesizer;
