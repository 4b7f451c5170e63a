//! Renders statements into Spanner SQL with positional bindings
//!
//! The grammar is stateless apart from its read-only configuration. Each
//! call writes into a fresh buffer, so identical statements always render to
//! identical text.

mod dml;
mod expressions;
mod rendered;

pub use rendered::{RenderedStatement, placeholder_count};

use crate::ast::Statement;
use crate::config::DialectConfig;
use crate::error::Result;
use crate::staleness::TransactionOptions;
use spanql_value::TypedValue;
use tracing::debug;

/// The Spanner SQL grammar
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    config: DialectConfig,
}

impl Grammar {
    pub fn new(config: DialectConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DialectConfig {
        &self.config
    }

    /// Render a statement to SQL text, bindings and out-of-band options.
    pub fn render(&self, statement: &Statement) -> Result<RenderedStatement> {
        let mut writer = SqlWriter::default();
        let mut options = TransactionOptions::default();

        match statement {
            Statement::Select(select) => {
                writer.write_select(select)?;
                options = TransactionOptions::read(
                    select
                        .staleness
                        .as_ref()
                        .or(self.config.default_staleness.as_ref()),
                    select.data_boost.unwrap_or(self.config.data_boost),
                );
            }
            Statement::Insert(insert) => writer.write_insert(insert)?,
            Statement::Update(update) => writer.write_update(update)?,
            Statement::Delete(delete) => writer.write_delete(delete)?,
            Statement::Ddl(sql) => writer.sql.push_str(sql),
        }

        let rendered = RenderedStatement {
            sql: writer.sql,
            bindings: writer.bindings,
            options,
            kind: statement.kind(),
        };
        debug!(
            kind = ?rendered.kind,
            sql = %rendered.sql,
            bindings = rendered.bindings.len(),
            "rendered statement"
        );
        Ok(rendered)
    }

    /// Render and return only the SQL text.
    pub fn to_sql(&self, statement: &Statement) -> Result<String> {
        Ok(self.render(statement)?.sql)
    }

    /// Render with every binding inlined as a literal, for debugging.
    pub fn to_raw_sql(&self, statement: &Statement) -> Result<String> {
        self.render(statement)?.to_raw_sql()
    }
}

/// Write `name` as a back-quoted identifier.
pub fn quote_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    push_identifier(&mut out, name);
    out
}

pub(crate) fn push_identifier(out: &mut String, name: &str) {
    out.push('`');
    for c in name.chars() {
        if c == '`' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('`');
}

/// Back-quote and comma-join a list of identifiers.
pub fn quote_identifiers<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|n| quote_identifier(n.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Accumulates SQL text and the bindings for its placeholders
#[derive(Debug, Default)]
struct SqlWriter {
    sql: String,
    bindings: Vec<TypedValue>,
}

impl SqlWriter {
    fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    fn identifier(&mut self, name: &str) {
        push_identifier(&mut self.sql, name);
    }

    fn bind(&mut self, value: &TypedValue) {
        self.sql.push('?');
        self.bindings.push(value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::StatementKind;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("User"), "`User`");
        assert_eq!(quote_identifier("select"), "`select`");
        assert_eq!(quote_identifier("a`b"), "`a\\`b`");
        assert_eq!(quote_identifiers(&["a", "b"]), "`a`, `b`");
    }

    #[test]
    fn test_ddl_passthrough() {
        let grammar = Grammar::default();
        let rendered = grammar
            .render(&Statement::Ddl("drop table `T`".into()))
            .unwrap();
        assert_eq!(rendered.sql, "drop table `T`");
        assert!(rendered.bindings.is_empty());
        assert_eq!(rendered.kind, StatementKind::Ddl);
    }
}
