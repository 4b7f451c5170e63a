//! Rendered SQL with its ordered bindings

use crate::ast::StatementKind;
use crate::error::{Error, Result};
use crate::executor::BoundParameter;
use crate::staleness::TransactionOptions;
use spanql_value::{TypedValue, encode_bound, encode_literal};

/// The output of rendering one statement.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedStatement {
    /// SQL text with a `?` for each binding
    pub sql: String,
    /// Values for the placeholders, in order of appearance
    pub bindings: Vec<TypedValue>,
    /// Out-of-band options the executor applies
    pub options: TransactionOptions,
    pub kind: StatementKind,
}

impl RenderedStatement {
    /// The SQL with every placeholder replaced by the literal of its binding.
    /// Meant for debugging output, never for execution.
    pub fn to_raw_sql(&self) -> Result<String> {
        substitute_placeholders(&self.sql, self.bindings.len(), |i| {
            Ok(encode_literal(&self.bindings[i])?)
        })
    }

    /// Rewrite placeholders to `@p1, @p2, ...` and encode the bindings as
    /// named wire parameters.
    pub fn parameterize(&self) -> Result<(String, Vec<BoundParameter>)> {
        let sql = substitute_placeholders(&self.sql, self.bindings.len(), |i| {
            Ok(format!("@p{}", i + 1))
        })?;

        let params = self
            .bindings
            .iter()
            .enumerate()
            .map(|(i, binding)| {
                Ok(BoundParameter {
                    name: format!("p{}", i + 1),
                    type_spec: binding.column_type().wire_type(),
                    value: encode_bound(binding)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((sql, params))
    }
}

/// Count `?` placeholders outside quoted text and identifiers.
pub fn placeholder_count(sql: &str) -> usize {
    let mut count = 0;
    scan(sql, |token| {
        if let Token::Placeholder = token {
            count += 1;
        }
    });
    count
}

fn substitute_placeholders<F>(sql: &str, expected: usize, mut replace: F) -> Result<String>
where
    F: FnMut(usize) -> Result<String>,
{
    let found = placeholder_count(sql);
    if found != expected {
        return Err(Error::ShapeMismatch(format!(
            "statement has {} placeholders but {} bindings",
            found, expected
        )));
    }

    let mut out = String::with_capacity(sql.len());
    let mut index = 0;
    let mut failure = None;
    scan(sql, |token| match token {
        Token::Char(c) => out.push(c),
        Token::Placeholder => {
            if failure.is_some() {
                return;
            }
            match replace(index) {
                Ok(text) => out.push_str(&text),
                Err(e) => failure = Some(e),
            }
            index += 1;
        }
    });

    match failure {
        Some(e) => Err(e),
        None => Ok(out),
    }
}

enum Token {
    Placeholder,
    Char(char),
}

/// Walk `sql`, reporting each unquoted `?` as a placeholder and every other
/// character as-is.
fn scan(sql: &str, mut emit: impl FnMut(Token)) {
    let mut quote: Option<char> = None;
    let mut chars = sql.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                emit(Token::Char(c));
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        emit(Token::Char(escaped));
                    }
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '?' => emit(Token::Placeholder),
                '"' | '\'' | '`' => {
                    quote = Some(c);
                    emit(Token::Char(c));
                }
                _ => emit(Token::Char(c)),
            },
        }
    }
}
