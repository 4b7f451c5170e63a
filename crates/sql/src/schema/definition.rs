//! Table, column, index and constraint definitions
//!
//! Builder methods mirror the column kinds of a migration builder, mapped
//! onto the backend's types.

use crate::error::{Error, Result};
use crate::grammar::{push_identifier, quote_identifiers};
use serde::{Deserialize, Serialize};
use spanql_value::{CodecConfig, ColumnType, DefaultExpression, Length, Value, encode_default};
use std::collections::HashSet;
use std::num::NonZeroU32;

/// Default length of `string` and `char` columns
pub const DEFAULT_STRING_LENGTH: NonZeroU32 = NonZeroU32::new(255).unwrap();

/// Length of a hyphenated UUID
const UUID_LENGTH: NonZeroU32 = NonZeroU32::new(36).unwrap();

/// A table column.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ColumnDefinition {
    /// Column name. Can't be empty.
    pub name: String,
    pub column_type: ColumnType,
    /// Whether the column allows null values. Not legal for primary keys.
    pub nullable: bool,
    /// Expression for the column's `default (...)` clause.
    pub default: Option<DefaultExpression>,
}

impl ColumnDefinition {
    /// Creates a new `not null` column.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        ColumnDefinition {
            name: name.into(),
            column_type,
            nullable: false,
            default: None,
        }
    }

    pub fn uuid(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::String(Length::Bounded(UUID_LENGTH)))
    }

    /// `string(255)`
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::String(Length::Bounded(DEFAULT_STRING_LENGTH)))
    }

    pub fn string_with_length(name: impl Into<String>, length: u32) -> Result<Self> {
        Ok(Self::new(name, ColumnType::String(Length::bounded(length)?)))
    }

    pub fn char(name: impl Into<String>) -> Self {
        Self::string(name)
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::string_max())
    }

    pub fn medium_text(name: impl Into<String>) -> Self {
        Self::text(name)
    }

    pub fn long_text(name: impl Into<String>) -> Self {
        Self::text(name)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Int64)
    }

    pub fn big_integer(name: impl Into<String>) -> Self {
        Self::integer(name)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Float64)
    }

    pub fn double(name: impl Into<String>) -> Self {
        Self::float(name)
    }

    pub fn decimal(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Numeric)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Bool)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Date)
    }

    pub fn date_time(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Timestamp)
    }

    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::date_time(name)
    }

    /// `bytes(255)`
    pub fn binary(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Bytes(Length::Bounded(DEFAULT_STRING_LENGTH)))
    }

    pub fn json(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Json)
    }

    pub fn integer_array(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::int64_array())
    }

    pub fn boolean_array(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::bool_array())
    }

    pub fn float_array(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::float64_array())
    }

    pub fn decimal_array(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::numeric_array())
    }

    /// `array<string(len)>`, where `len` defaults to 255
    pub fn string_array(name: impl Into<String>, length: Option<Length>) -> Self {
        Self::new(
            name,
            ColumnType::string_array(length.unwrap_or(Length::Bounded(DEFAULT_STRING_LENGTH))),
        )
    }

    pub fn date_array(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::date_array())
    }

    pub fn timestamp_array(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::timestamp_array())
    }

    /// Allow null values.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Sets the default value for this column.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultExpression::Value(value.into()));
        self
    }

    /// Default to the commit timestamp.
    pub fn use_current(mut self) -> Self {
        self.default = Some(DefaultExpression::CurrentTimestamp);
        self
    }

    /// Default to verbatim SQL.
    pub fn default_raw(mut self, sql: impl Into<String>) -> Self {
        self.default = Some(DefaultExpression::Raw(sql.into()));
        self
    }

    /// Column clause of a CREATE or ALTER TABLE, e.g. `` `id` string(36) not null ``.
    pub fn to_ddl(&self, codec: &CodecConfig) -> Result<String> {
        let mut ddl = String::new();
        push_identifier(&mut ddl, &self.name);
        ddl.push(' ');
        ddl.push_str(&self.column_type.to_string());
        if !self.nullable {
            ddl.push_str(" not null");
        }
        match &self.default {
            // A null default is the absence of one
            None | Some(DefaultExpression::Value(Value::Null)) => {}
            Some(default) => {
                ddl.push_str(" default (");
                ddl.push_str(&encode_default(&self.column_type, default, codec)?);
                ddl.push(')');
            }
        }
        Ok(ddl)
    }
}

/// Whether deleting a parent row deletes its interleaved children
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum OnDelete {
    /// Parent rows with children can't be deleted (the backend's default)
    #[default]
    Restrict,
    Cascade,
}

/// Physical co-location of a child table with its parent's rows.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Interleave {
    pub parent: String,
    pub on_delete: OnDelete,
}

/// Rows older than `days` according to `column` are removed by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct RowDeletionPolicy {
    pub column: String,
    pub days: u32,
}

impl RowDeletionPolicy {
    pub fn new(column: impl Into<String>, days: u32) -> Self {
        Self {
            column: column.into(),
            days,
        }
    }

    /// `older_than(<column>, interval <days> day)` with the column as given
    pub(crate) fn expression(&self, column: &str) -> String {
        format!("older_than({}, interval {} day)", column, self.days)
    }
}

/// A table schema.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct TableDefinition {
    /// The table name. Can't be empty.
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<ColumnDefinition>,
    /// Primary key column names. Order determines key locality.
    pub primary_key: Vec<String>,
    pub interleave: Option<Interleave>,
    pub row_deletion_policy: Option<RowDeletionPolicy>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        TableDefinition {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            interleave: None,
            row_deletion_policy: None,
        }
    }

    pub fn column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    /// Nullable `created_at` and `updated_at` timestamp columns.
    pub fn timestamps(mut self) -> Self {
        self.columns.extend(timestamp_columns());
        self
    }

    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn interleave_in_parent(mut self, parent: impl Into<String>, on_delete: OnDelete) -> Self {
        self.interleave = Some(Interleave {
            parent: parent.into(),
            on_delete,
        });
        self
    }

    pub fn delete_rows_older_than(mut self, column: impl Into<String>, days: u32) -> Self {
        self.row_deletion_policy = Some(RowDeletionPolicy::new(column, days));
        self
    }

    /// Returns the column with the given name, if it exists.
    pub fn get_column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Check the table's own invariants: unique column names, primary key
    /// columns present and non-nullable, and a row deletion policy on a
    /// DATE or TIMESTAMP column.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidDefinition("table name cannot be empty".into()));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if column.name.is_empty() {
                return Err(Error::InvalidDefinition(format!(
                    "column name cannot be empty in `{}`",
                    self.name
                )));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(Error::InvalidDefinition(format!(
                    "column `{}` declared twice in `{}`",
                    column.name, self.name
                )));
            }
        }

        let mut key = HashSet::new();
        for name in &self.primary_key {
            if !key.insert(name.as_str()) {
                return Err(Error::InvalidDefinition(format!(
                    "column `{}` appears twice in the primary key of `{}`",
                    name, self.name
                )));
            }
            let column = self.get_column(name).ok_or_else(|| {
                Error::InvalidDefinition(format!(
                    "primary key column `{}` does not exist in `{}`",
                    name, self.name
                ))
            })?;
            if column.nullable {
                return Err(Error::InvalidDefinition(format!(
                    "primary key column `{}` of `{}` cannot be nullable",
                    name, self.name
                )));
            }
        }

        if let Some(policy) = &self.row_deletion_policy {
            self.validate_policy(policy)?;
        }

        Ok(())
    }

    pub(crate) fn validate_policy(&self, policy: &RowDeletionPolicy) -> Result<()> {
        let column = self.get_column(&policy.column).ok_or_else(|| {
            Error::InvalidDefinition(format!(
                "row deletion policy column `{}` does not exist in `{}`",
                policy.column, self.name
            ))
        })?;
        if !column.column_type.is_temporal() {
            return Err(Error::InvalidDefinition(format!(
                "row deletion policy column `{}` must be date or timestamp, not {}",
                policy.column, column.column_type
            )));
        }
        Ok(())
    }

    /// Check that this table may be interleaved in `parent`: the parent is
    /// the one named, and this table's primary key starts with the parent's.
    pub fn validate_interleave(&self, parent: &TableDefinition) -> Result<()> {
        let interleave = self.interleave.as_ref().ok_or_else(|| {
            Error::InvalidDefinition(format!("`{}` is not interleaved", self.name))
        })?;
        if interleave.parent != parent.name {
            return Err(Error::InvalidDefinition(format!(
                "`{}` is interleaved in `{}`, not `{}`",
                self.name, interleave.parent, parent.name
            )));
        }
        if !self.primary_key.starts_with(&parent.primary_key) {
            return Err(Error::InvalidDefinition(format!(
                "primary key ({}) of `{}` must start with the primary key ({}) of parent `{}`",
                quote_identifiers(&self.primary_key),
                self.name,
                quote_identifiers(&parent.primary_key),
                parent.name
            )));
        }
        Ok(())
    }
}

pub(crate) fn timestamp_columns() -> [ColumnDefinition; 2] {
    [
        ColumnDefinition::timestamp("created_at").nullable(),
        ColumnDefinition::timestamp("updated_at").nullable(),
    ]
}

/// A secondary index.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct IndexDefinition {
    /// Explicit name. Derived from the table and key columns when absent.
    pub name: Option<String>,
    pub table: String,
    /// Key columns in order.
    pub columns: Vec<String>,
    pub unique: bool,
    /// Rows with a null in any key column are left out of the index.
    pub null_filtered: bool,
    /// Non-key columns copied into the index.
    pub storing: Vec<String>,
    pub interleave_in: Option<String>,
}

impl IndexDefinition {
    pub fn new<I, S>(table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        IndexDefinition {
            name: None,
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
            null_filtered: false,
            storing: Vec::new(),
            interleave_in: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn null_filtered(mut self) -> Self {
        self.null_filtered = true;
        self
    }

    pub fn storing<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.storing = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn interleave_in(mut self, parent: impl Into<String>) -> Self {
        self.interleave_in = Some(parent.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(Error::InvalidDefinition(format!(
                "index on `{}` has no key columns",
                self.table
            )));
        }
        Ok(())
    }

    /// Check that this index may be interleaved in `parent`: its key starts
    /// with the parent's primary key.
    pub fn validate_interleave(&self, parent: &TableDefinition) -> Result<()> {
        if self.interleave_in.as_deref() != Some(parent.name.as_str()) {
            return Err(Error::InvalidDefinition(format!(
                "index on `{}` is not interleaved in `{}`",
                self.table, parent.name
            )));
        }
        if !self.columns.starts_with(&parent.primary_key) {
            return Err(Error::InvalidDefinition(format!(
                "index key ({}) on `{}` must start with the primary key ({}) of `{}`",
                quote_identifiers(&self.columns),
                self.table,
                quote_identifiers(&parent.primary_key),
                parent.name
            )));
        }
        Ok(())
    }
}

/// A foreign key constraint.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct ForeignKey {
    /// Explicit name. Derived from the table and columns when absent.
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub references: String,
    pub referenced_columns: Vec<String>,
}

impl ForeignKey {
    pub fn new<I, J, S, T>(columns: I, references: impl Into<String>, referenced: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        ForeignKey {
            name: None,
            columns: columns.into_iter().map(Into::into).collect(),
            references: references.into(),
            referenced_columns: referenced.into_iter().map(Into::into).collect(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub(crate) fn validate(&self, table: &str) -> Result<()> {
        if self.columns.is_empty() || self.columns.len() != self.referenced_columns.len() {
            return Err(Error::InvalidDefinition(format!(
                "foreign key on `{}` must pair each of its {} columns with one of `{}`'s, got {}",
                table,
                self.columns.len(),
                self.references,
                self.referenced_columns.len()
            )));
        }
        Ok(())
    }
}
