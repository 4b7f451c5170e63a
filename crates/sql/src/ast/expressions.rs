//! Expressions and operators for predicates, projections and assignments

use super::dml::Select;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use spanql_value::{TypedValue, Value};

/// A column reference, optionally qualified with a table name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: Option<String>,
    /// Column name, or `*` for every column of the table
    pub name: String,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: None,
            name: name.into(),
        }
    }

    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            name: name.into(),
        }
    }
}

/// SQL expressions, e.g. `` `a` = ? and `b` > 7 ``. Can be nested.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// All columns, i.e. *.
    All,
    /// A column reference.
    Column(ColumnRef),
    /// A bound parameter. Renders `?` and appends its value to the bindings.
    Bind(TypedValue),
    /// A value rendered inline as a literal.
    Literal(TypedValue),
    /// SQL text emitted verbatim, with the values for its placeholders.
    Raw {
        sql: String,
        bindings: Vec<TypedValue>,
    },
    /// A function call (name and arguments).
    Function(String, Vec<Expression>),
    /// An operator.
    Operator(Operator),
    /// An explicitly parenthesized expression.
    Nested(Box<Expression>),
    /// EXISTS (subquery) or NOT EXISTS (subquery)
    Exists { select: Box<Select>, negated: bool },
    /// A scalar subquery.
    Subquery(Box<Select>),
}

/// Expression operators.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Operator {
    And(Box<Expression>, Box<Expression>), // a and b
    Or(Box<Expression>, Box<Expression>),  // a or b
    Not(Box<Expression>),                  // not (a)

    Equal(Box<Expression>, Box<Expression>),              // a = b
    NotEqual(Box<Expression>, Box<Expression>),           // a != b
    LessThan(Box<Expression>, Box<Expression>),           // a < b
    LessThanOrEqual(Box<Expression>, Box<Expression>),    // a <= b
    GreaterThan(Box<Expression>, Box<Expression>),        // a > b
    GreaterThanOrEqual(Box<Expression>, Box<Expression>), // a >= b
    IsNull(Box<Expression>),                              // a is null
    IsNotNull(Box<Expression>),                           // a is not null

    /// The pattern is emitted as given. Literal `%` and `_` must already be
    /// escaped with a backslash by the caller.
    Like(Box<Expression>, Box<Expression>), // a like b
    NotLike(Box<Expression>, Box<Expression>), // a not like b

    InList {
        expr: Box<Expression>,
        list: Vec<Expression>,
        negated: bool,
    }, // a in (b, c) or a not in (b, c)
    InUnnest {
        expr: Box<Expression>,
        array: Box<Expression>,
        negated: bool,
    }, // a in unnest(b)
    Between {
        expr: Box<Expression>,
        low: Box<Expression>,
        high: Box<Expression>,
        negated: bool,
    }, // a between b and c

    Add(Box<Expression>, Box<Expression>),      // a + b
    Subtract(Box<Expression>, Box<Expression>), // a - b
    Multiply(Box<Expression>, Box<Expression>), // a * b
    Divide(Box<Expression>, Box<Expression>),   // a / b
}

impl Expression {
    pub fn column(name: impl Into<String>) -> Self {
        Expression::Column(ColumnRef::new(name))
    }

    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Expression::Column(ColumnRef::qualified(table, name))
    }

    /// Bind a value under its natural column type
    pub fn bind(value: impl Into<Value>) -> Result<Self> {
        Ok(Expression::Bind(TypedValue::infer(value)?))
    }

    /// Render a value inline under its natural column type
    pub fn literal(value: impl Into<Value>) -> Result<Self> {
        Ok(Expression::Literal(TypedValue::infer(value)?))
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Expression::Raw {
            sql: sql.into(),
            bindings: Vec::new(),
        }
    }

    pub fn function(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::Function(name.into(), args)
    }

    pub fn and(self, other: Expression) -> Self {
        Operator::And(Box::new(self), Box::new(other)).into()
    }

    pub fn or(self, other: Expression) -> Self {
        Operator::Or(Box::new(self), Box::new(other)).into()
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Operator::Not(Box::new(self)).into()
    }

    pub fn equals(self, other: Expression) -> Self {
        Operator::Equal(Box::new(self), Box::new(other)).into()
    }

    pub fn not_equals(self, other: Expression) -> Self {
        Operator::NotEqual(Box::new(self), Box::new(other)).into()
    }

    pub fn less_than(self, other: Expression) -> Self {
        Operator::LessThan(Box::new(self), Box::new(other)).into()
    }

    pub fn less_than_or_equal(self, other: Expression) -> Self {
        Operator::LessThanOrEqual(Box::new(self), Box::new(other)).into()
    }

    pub fn greater_than(self, other: Expression) -> Self {
        Operator::GreaterThan(Box::new(self), Box::new(other)).into()
    }

    pub fn greater_than_or_equal(self, other: Expression) -> Self {
        Operator::GreaterThanOrEqual(Box::new(self), Box::new(other)).into()
    }

    pub fn is_null(self) -> Self {
        Operator::IsNull(Box::new(self)).into()
    }

    pub fn is_not_null(self) -> Self {
        Operator::IsNotNull(Box::new(self)).into()
    }

    pub fn like(self, pattern: Expression) -> Self {
        Operator::Like(Box::new(self), Box::new(pattern)).into()
    }

    pub fn in_list(self, list: Vec<Expression>) -> Self {
        Operator::InList {
            expr: Box::new(self),
            list,
            negated: false,
        }
        .into()
    }

    pub fn in_unnest(self, array: Expression) -> Self {
        Operator::InUnnest {
            expr: Box::new(self),
            array: Box::new(array),
            negated: false,
        }
        .into()
    }

    pub fn between(self, low: Expression, high: Expression) -> Self {
        Operator::Between {
            expr: Box::new(self),
            low: Box::new(low),
            high: Box::new(high),
            negated: false,
        }
        .into()
    }

    /// Combine predicates with `and`. Returns `None` for an empty list.
    pub fn all_of(predicates: impl IntoIterator<Item = Expression>) -> Option<Self> {
        predicates.into_iter().reduce(Expression::and)
    }
}

impl From<Operator> for Expression {
    fn from(op: Operator) -> Self {
        Expression::Operator(op)
    }
}

impl From<ColumnRef> for Expression {
    fn from(column: ColumnRef) -> Self {
        Expression::Column(column)
    }
}
