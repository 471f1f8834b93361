
use common::{DbResult, Row};
use std::cmp::Ordering;
#[allow(unused_imports)]
use types::{SqlType, Value};

/// Binary comparison and logical operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// Unary operators (currently just logical NOT).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum UnaryOp {
    Not,
}

/// Expression abstract syntax tree.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Expr {
    Literal(Value),
    /// Column reference with optional table/alias qualifier.
    ///
    /// Examples:
    /// - `Column { table: None, name: "id" }` - unqualified column
    /// - `Column { table: Some("users"), name: "id" }` - qualified column
    /// - `Column { table: Some("u"), name: "id" }` - alias-qualified column
    Column {
        /// Optional table name or alias qualifier.
        table: Option<String>,
        /// Column name.
        name: String,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
}

/// Evaluation context consisting of the row schema (column names in order).
pub struct EvalContext<'a> {
    pub schema: &'a [String],
}

impl<'a> EvalContext<'a> {
    /// Evaluate an expression over a given row.
    ///
    /// This is a total function over any schema: an unresolved column reference
    /// evaluates to NULL rather than erroring, so the same evaluator serves
    /// filter predicates, join conditions, and ORDER BY / assignment values.
    pub fn eval(&self, expr: &Expr, row: &Row) -> DbResult<Value> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Column { table, name } => match self.find_column(table.as_deref(), name) {
                Some(idx) => Ok(row.values[idx].clone()),
                None => Ok(Value::Null),
            },
            Expr::Unary { op, expr } => {
                let v = self.eval(expr, row)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!v.truthy())),
                }
            }
            Expr::Binary { left, op, right } => {
                let lv = self.eval(left, row)?;
                let rv = self.eval(right, row)?;
                Ok(self.eval_binary(&lv, *op, &rv))
            }
        }
    }

    /// True if `expr` evaluates to a truthy value for `row` (used by Filter/Join).
    pub fn eval_bool(&self, expr: &Expr, row: &Row) -> DbResult<bool> {
        Ok(self.eval(expr, row)?.truthy())
    }

    fn eval_binary(&self, l: &Value, op: BinaryOp, r: &Value) -> Value {
        use BinaryOp::*;

        if matches!(op, And | Or) {
            return Value::Bool(match op {
                And => l.truthy() && r.truthy(),
                Or => l.truthy() || r.truthy(),
                _ => unreachable!(),
            });
        }

        // NULL, and any cross-family mismatch, compares unequal/false everywhere.
        let Some(ord) = l.cmp_same_type(r) else {
            return Value::Bool(false);
        };

        let result = match op {
            Eq => ord == Ordering::Equal,
            Ne => ord != Ordering::Equal,
            Lt => ord == Ordering::Less,
            Le => ord != Ordering::Greater,
            Gt => ord == Ordering::Greater,
            Ge => ord != Ordering::Less,
            _ => unreachable!(),
        };

        Value::Bool(result)
    }

    /// Find column index in schema, supporting qualified and unqualified references.
    ///
    /// Schema entries may be:
    /// - Simple names: `"id"`, `"name"`
    /// - Qualified names: `"users.id"`, `"orders.user_id"`
    ///
    /// Matching rules:
    /// - Qualified ref (`table.col`): match `"table.col"` exactly.
    /// - Unqualified ref (`col`): match simple `"col"` or suffix `".col"`.
    fn find_column(&self, table: Option<&str>, name: &str) -> Option<usize> {
        if let Some(qualifier) = table {
            let full_name = format!("{}.{}", qualifier, name);
            self.schema.iter().position(|c| c.eq_ignore_ascii_case(&full_name))
        } else {
            self.schema.iter().position(|c| {
                c.eq_ignore_ascii_case(name)
                    || c.to_lowercase().ends_with(&format!(".{}", name.to_lowercase()))
            })
        }
    }
}
