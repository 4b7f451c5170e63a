//! Expression rendering

use super::SqlWriter;
use crate::ast::{ColumnRef, Expression, Operator};
use crate::error::Result;
use spanql_value::encode_literal;

// Binding strength, loosest first. Operands that bind looser than their
// parent are parenthesized.
const OR: u8 = 1;
const AND: u8 = 2;
const COMPARISON: u8 = 4;
const ADDITIVE: u8 = 5;
const MULTIPLICATIVE: u8 = 6;
const ATOM: u8 = 7;

fn precedence(expr: &Expression) -> u8 {
    match expr {
        Expression::Operator(op) => match op {
            Operator::Or(..) => OR,
            Operator::And(..) => AND,
            // `not (...)` is always parenthesized, so it never needs more
            Operator::Not(..) => ATOM,
            Operator::Add(..) | Operator::Subtract(..) => ADDITIVE,
            Operator::Multiply(..) | Operator::Divide(..) => MULTIPLICATIVE,
            _ => COMPARISON,
        },
        _ => ATOM,
    }
}

impl SqlWriter {
    pub(super) fn write_column(&mut self, column: &ColumnRef) {
        if let Some(table) = &column.table {
            self.identifier(table);
            self.push(".");
        }
        if column.name == "*" {
            self.push("*");
        } else {
            self.identifier(&column.name);
        }
    }

    pub(super) fn write_expression(&mut self, expr: &Expression) -> Result<()> {
        match expr {
            Expression::All => self.push("*"),
            Expression::Column(column) => self.write_column(column),
            Expression::Bind(value) => self.bind(value),
            Expression::Literal(value) => {
                let literal = encode_literal(value)?;
                self.push(&literal);
            }
            Expression::Raw { sql, bindings } => {
                self.push(sql);
                self.bindings.extend(bindings.iter().cloned());
            }
            Expression::Function(name, args) => {
                self.push(name);
                self.push("(");
                self.write_list(args)?;
                self.push(")");
            }
            Expression::Operator(op) => self.write_operator(op)?,
            Expression::Nested(inner) => {
                self.push("(");
                self.write_expression(inner)?;
                self.push(")");
            }
            Expression::Exists { select, negated } => {
                if *negated {
                    self.push("not ");
                }
                self.push("exists (");
                self.write_select(select)?;
                self.push(")");
            }
            Expression::Subquery(select) => {
                self.push("(");
                self.write_select(select)?;
                self.push(")");
            }
        }
        Ok(())
    }

    pub(super) fn write_list(&mut self, exprs: &[Expression]) -> Result<()> {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.write_expression(expr)?;
        }
        Ok(())
    }

    /// Write an operand, parenthesized when it binds looser than `min`.
    fn write_operand(&mut self, expr: &Expression, min: u8) -> Result<()> {
        if precedence(expr) < min {
            self.push("(");
            self.write_expression(expr)?;
            self.push(")");
            Ok(())
        } else {
            self.write_expression(expr)
        }
    }

    fn write_binary(
        &mut self,
        lhs: &Expression,
        op: &str,
        rhs: &Expression,
        left_min: u8,
        right_min: u8,
    ) -> Result<()> {
        self.write_operand(lhs, left_min)?;
        self.push(" ");
        self.push(op);
        self.push(" ");
        self.write_operand(rhs, right_min)
    }

    fn write_operator(&mut self, op: &Operator) -> Result<()> {
        // Comparison operands must bind tighter than any comparison
        const OPERAND: u8 = COMPARISON + 1;

        match op {
            Operator::And(l, r) => self.write_binary(l, "and", r, AND, AND),
            Operator::Or(l, r) => self.write_binary(l, "or", r, OR, OR),
            Operator::Not(inner) => {
                self.push("not (");
                self.write_expression(inner)?;
                self.push(")");
                Ok(())
            }

            Operator::Equal(l, r) => self.write_binary(l, "=", r, OPERAND, OPERAND),
            Operator::NotEqual(l, r) => self.write_binary(l, "!=", r, OPERAND, OPERAND),
            Operator::LessThan(l, r) => self.write_binary(l, "<", r, OPERAND, OPERAND),
            Operator::LessThanOrEqual(l, r) => self.write_binary(l, "<=", r, OPERAND, OPERAND),
            Operator::GreaterThan(l, r) => self.write_binary(l, ">", r, OPERAND, OPERAND),
            Operator::GreaterThanOrEqual(l, r) => {
                self.write_binary(l, ">=", r, OPERAND, OPERAND)
            }
            Operator::IsNull(inner) => {
                self.write_operand(inner, OPERAND)?;
                self.push(" is null");
                Ok(())
            }
            Operator::IsNotNull(inner) => {
                self.write_operand(inner, OPERAND)?;
                self.push(" is not null");
                Ok(())
            }
            Operator::Like(l, r) => self.write_binary(l, "like", r, OPERAND, OPERAND),
            Operator::NotLike(l, r) => self.write_binary(l, "not like", r, OPERAND, OPERAND),

            Operator::InList {
                expr,
                list,
                negated,
            } => {
                // An empty list matches nothing
                if list.is_empty() {
                    self.push(if *negated { "true" } else { "false" });
                    return Ok(());
                }
                self.write_operand(expr, OPERAND)?;
                self.push(if *negated { " not in (" } else { " in (" });
                self.write_list(list)?;
                self.push(")");
                Ok(())
            }
            Operator::InUnnest {
                expr,
                array,
                negated,
            } => {
                self.write_operand(expr, OPERAND)?;
                self.push(if *negated {
                    " not in unnest("
                } else {
                    " in unnest("
                });
                self.write_expression(array)?;
                self.push(")");
                Ok(())
            }
            Operator::Between {
                expr,
                low,
                high,
                negated,
            } => {
                self.write_operand(expr, OPERAND)?;
                self.push(if *negated {
                    " not between "
                } else {
                    " between "
                });
                self.write_operand(low, OPERAND)?;
                self.push(" and ");
                self.write_operand(high, OPERAND)
            }

            Operator::Add(l, r) => self.write_binary(l, "+", r, ADDITIVE, ADDITIVE),
            Operator::Subtract(l, r) => self.write_binary(l, "-", r, ADDITIVE, ADDITIVE + 1),
            Operator::Multiply(l, r) => {
                self.write_binary(l, "*", r, MULTIPLICATIVE, MULTIPLICATIVE)
            }
            Operator::Divide(l, r) => {
                self.write_binary(l, "/", r, MULTIPLICATIVE, MULTIPLICATIVE + 1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spanql_value::Value;

    fn render(expr: &Expression) -> (String, usize) {
        let mut writer = SqlWriter::default();
        writer.write_expression(expr).unwrap();
        (writer.sql, writer.bindings.len())
    }

    fn col(name: &str) -> Expression {
        Expression::column(name)
    }

    fn bind(v: impl Into<Value>) -> Expression {
        Expression::bind(v).unwrap()
    }

    #[test]
    fn test_comparison() {
        assert_eq!(render(&col("a").equals(bind(1i64))), ("`a` = ?".into(), 1));
        assert_eq!(
            render(&Expression::qualified("User", "id").not_equals(bind("x"))).0,
            "`User`.`id` != ?"
        );
        assert_eq!(render(&Expression::qualified("User", "*")).0, "`User`.*");
    }

    #[test]
    fn test_or_under_and_is_parenthesized() {
        let expr = col("a")
            .equals(bind(1i64))
            .and(col("b").equals(bind(2i64)).or(col("c").equals(bind(3i64))));
        assert_eq!(
            render(&expr).0,
            "`a` = ? and (`b` = ? or `c` = ?)"
        );

        let expr = col("a")
            .equals(bind(1i64))
            .or(col("b").equals(bind(2i64)).and(col("c").is_null()));
        assert_eq!(render(&expr).0, "`a` = ? or `b` = ? and `c` is null");
    }

    #[test]
    fn test_not_and_exists() {
        let expr = col("a").equals(bind(true)).not();
        assert_eq!(render(&expr).0, "not (`a` = ?)");

        let sub = crate::ast::Select::from("Item")
            .filter(Expression::qualified("Item", "userId").equals(Expression::qualified("User", "id")));
        let expr = Expression::Exists {
            select: Box::new(sub),
            negated: false,
        };
        assert_eq!(
            render(&expr).0,
            "exists (select * from `Item` where `Item`.`userId` = `User`.`id`)"
        );
    }

    #[test]
    fn test_in_and_between() {
        let expr = col("id").in_list(vec![bind(1i64), bind(2i64)]);
        assert_eq!(render(&expr), ("`id` in (?, ?)".into(), 2));

        let expr = col("id").in_unnest(bind(Value::array([1i64, 2, 3])));
        assert_eq!(render(&expr), ("`id` in unnest(?)".into(), 1));

        assert_eq!(render(&col("id").in_list(vec![])).0, "false");

        let expr = col("n").between(bind(1i64), bind(5i64));
        assert_eq!(render(&expr).0, "`n` between ? and ?");
    }

    #[test]
    fn test_like_is_not_escaped() {
        let expr = col("name").like(bind("50\\%_off%"));
        let mut writer = SqlWriter::default();
        writer.write_expression(&expr).unwrap();
        assert_eq!(writer.sql, "`name` like ?");
        assert_eq!(writer.bindings[0].value(), &Value::string("50\\%_off%"));
    }

    #[test]
    fn test_arithmetic_grouping() {
        let expr: Expression = Operator::Subtract(
            Box::new(col("a")),
            Box::new(Operator::Add(Box::new(col("b")), Box::new(col("c"))).into()),
        )
        .into();
        assert_eq!(render(&expr).0, "`a` - (`b` + `c`)");

        let expr: Expression = Operator::Multiply(
            Box::new(Operator::Add(Box::new(col("a")), Box::new(col("b"))).into()),
            Box::new(bind(2i64)),
        )
        .into();
        assert_eq!(render(&expr).0, "(`a` + `b`) * ?");
    }

    #[test]
    fn test_literals_and_functions() {
        let expr = col("a").equals(Expression::literal(1.1).unwrap());
        assert_eq!(render(&expr), ("`a` = 1.1".into(), 0));

        let expr = Expression::function("count", vec![Expression::All]);
        assert_eq!(render(&expr).0, "count(*)");

        let expr = Expression::Raw {
            sql: "struct(?, ?)".into(),
            bindings: vec![
                spanql_value::TypedValue::infer(1i64).unwrap(),
                spanql_value::TypedValue::infer(2i64).unwrap(),
            ],
        };
        assert_eq!(render(&expr), ("struct(?, ?)".into(), 2));
    }
}
