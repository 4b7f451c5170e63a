//! SELECT, INSERT, UPDATE and DELETE rendering

use super::SqlWriter;
use crate::ast::{
    Delete, Direction, IndexHintKind, Insert, InsertMode, JoinKind, Select, TableRef, Update,
};
use crate::error::{Error, Result};
use std::collections::HashSet;
use tracing::debug;

/// LIMIT used when only an OFFSET is given; the backend requires both.
const UNBOUNDED_LIMIT: u64 = i64::MAX as u64;

impl SqlWriter {
    fn write_table(&mut self, table: &TableRef) {
        self.identifier(&table.name);
    }

    fn write_alias(&mut self, alias: &Option<String>) {
        if let Some(alias) = alias {
            self.push(" as ");
            self.identifier(alias);
        }
    }

    pub(super) fn write_select(&mut self, select: &Select) -> Result<()> {
        self.push("select ");
        if select.distinct {
            self.push("distinct ");
        }

        if select.columns.is_empty() {
            self.push("*");
        } else {
            for (i, item) in select.columns.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.write_expression(&item.expr)?;
                self.write_alias(&item.alias);
            }
        }

        self.push(" from ");
        self.write_table(&select.from);
        if let Some(hint) = &select.index_hint {
            match hint.kind {
                IndexHintKind::Force => {
                    if !is_index_name(&hint.index) {
                        return Err(Error::InvalidDefinition(format!(
                            "`{}` is not a valid index name for a FORCE_INDEX hint",
                            hint.index
                        )));
                    }
                    self.push(" @{FORCE_INDEX=");
                    self.push(&hint.index);
                    self.push("}");
                }
                IndexHintKind::Use => {
                    return Err(Error::unsupported("index hint type: use"));
                }
                IndexHintKind::Ignore => {
                    return Err(Error::unsupported("index hint type: ignore"));
                }
            }
        }
        self.write_alias(&select.from.alias);

        for join in &select.joins {
            self.push(match join.kind {
                JoinKind::Inner => " inner join ",
                JoinKind::Left => " left join ",
                JoinKind::Right => " right join ",
                JoinKind::Full => " full join ",
                JoinKind::Cross => " cross join ",
            });
            self.write_table(&join.table);
            self.write_alias(&join.table.alias);

            match (&join.on, join.kind) {
                (_, JoinKind::Cross) => {}
                (Some(on), _) => {
                    self.push(" on ");
                    self.write_expression(on)?;
                }
                (None, kind) => {
                    return Err(Error::ShapeMismatch(format!(
                        "{:?} join on `{}` requires a condition",
                        kind, join.table.name
                    )));
                }
            }
        }

        if let Some(predicate) = &select.r#where {
            self.push(" where ");
            self.write_expression(predicate)?;
        }

        if !select.group_by.is_empty() {
            self.push(" group by ");
            self.write_list(&select.group_by)?;
        }

        if let Some(having) = &select.having {
            self.push(" having ");
            self.write_expression(having)?;
        }

        if !select.order_by.is_empty() {
            self.push(" order by ");
            for (i, (expr, direction)) in select.order_by.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                self.write_expression(expr)?;
                self.push(match direction {
                    Direction::Asc => " asc",
                    Direction::Desc => " desc",
                });
            }
        }

        match (select.limit, select.offset) {
            (Some(limit), Some(offset)) => {
                self.push(&format!(" limit {} offset {}", limit, offset))
            }
            (Some(limit), None) => self.push(&format!(" limit {}", limit)),
            (None, Some(offset)) => {
                self.push(&format!(" limit {} offset {}", UNBOUNDED_LIMIT, offset))
            }
            (None, None) => {}
        }

        if let Some(lock) = select.lock {
            debug!(?lock, table = %select.from.name, "dropping lock hint");
        }

        Ok(())
    }

    pub(super) fn write_insert(&mut self, insert: &Insert) -> Result<()> {
        if insert.returning_id {
            return Err(Error::unsupported("insertGetId"));
        }

        let first = insert.rows.first().ok_or_else(|| {
            Error::ShapeMismatch(format!("insert into `{}` has no rows", insert.table))
        })?;
        if first.is_empty() {
            return Err(Error::ShapeMismatch(format!(
                "insert into `{}` has no columns",
                insert.table
            )));
        }

        let columns: Vec<&str> = first.iter().map(|(c, _)| c.as_str()).collect();
        let column_set = unique_columns(&columns, &insert.table)?;

        self.push(match insert.mode {
            InsertMode::Insert => "insert into ",
            InsertMode::OrIgnore => "insert or ignore into ",
            InsertMode::OrUpdate => "insert or update into ",
        });
        self.identifier(&insert.table);
        self.push(" (");
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.identifier(column);
        }
        self.push(") values ");

        for (row_index, row) in insert.rows.iter().enumerate() {
            let names: Vec<&str> = row.iter().map(|(c, _)| c.as_str()).collect();
            if unique_columns(&names, &insert.table)? != column_set {
                return Err(Error::ShapeMismatch(format!(
                    "row {} of insert into `{}` has columns ({}), expected ({})",
                    row_index,
                    insert.table,
                    names.join(", "),
                    columns.join(", ")
                )));
            }

            if row_index > 0 {
                self.push(", ");
            }
            self.push("(");
            for (i, column) in columns.iter().enumerate() {
                if i > 0 {
                    self.push(", ");
                }
                // Present: the column sets were just compared
                if let Some((_, expr)) = row.iter().find(|(c, _)| c == column) {
                    self.write_expression(expr)?;
                }
            }
            self.push(")");
        }

        Ok(())
    }

    pub(super) fn write_update(&mut self, update: &Update) -> Result<()> {
        if update.set.is_empty() {
            return Err(Error::ShapeMismatch(format!(
                "update of `{}` sets no columns",
                update.table
            )));
        }
        let names: Vec<&str> = update.set.iter().map(|(c, _)| c.as_str()).collect();
        unique_columns(&names, &update.table)?;

        self.push("update ");
        self.identifier(&update.table);
        self.push(" set ");
        for (i, (column, expr)) in update.set.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.identifier(column);
            self.push(" = ");
            self.write_expression(expr)?;
        }
        self.write_required_where(&update.r#where)
    }

    pub(super) fn write_delete(&mut self, delete: &Delete) -> Result<()> {
        self.push("delete from ");
        self.identifier(&delete.table);
        self.write_required_where(&delete.r#where)
    }

    /// The backend rejects UPDATE and DELETE without a WHERE clause.
    fn write_required_where(&mut self, predicate: &Option<crate::ast::Expression>) -> Result<()> {
        self.push(" where ");
        match predicate {
            Some(predicate) => self.write_expression(predicate),
            None => {
                self.push("true");
                Ok(())
            }
        }
    }
}

fn unique_columns<'a>(columns: &[&'a str], table: &str) -> Result<HashSet<&'a str>> {
    let mut set = HashSet::with_capacity(columns.len());
    for column in columns {
        if !set.insert(*column) {
            return Err(Error::ShapeMismatch(format!(
                "column `{}` given twice for `{}`",
                column, table
            )));
        }
    }
    Ok(set)
}

// Hint values are not quotable, so the name must be a bare identifier
fn is_index_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
