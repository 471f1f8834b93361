//! Abstract syntax tree produced by the parser.

use expr::Expr;
use types::SqlType;

#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    CreateTable {
        name: String,
        columns: Vec<ColumnDef>,
    },
    Insert {
        table: String,
        columns: Option<Vec<String>>,
        values: Vec<types::Value>,
    },
    Select(SelectStmt),
    Delete {
        table: String,
        condition: Option<Expr>,
    },
    Update {
        table: String,
        assignments: Vec<Assignment>,
        condition: Option<Expr>,
    },
    DropTable {
        name: String,
    },
    Begin,
    Commit,
    Rollback,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: SqlType,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SelectStmt {
    pub items: Vec<SelectItem>,
    pub from: String,
    pub joins: Vec<JoinClause>,
    pub where_clause: Option<Expr>,
    pub order_by: Vec<SortItem>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SelectItem {
    Star,
    Column(String),
    Aggregate(AggregateCall),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregateFunc {
    Count,
    Sum,
    Avg,
    Max,
    Min,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AggregateArg {
    Star,
    Expr(Expr),
}

#[derive(Clone, Debug, PartialEq)]
pub struct AggregateCall {
    pub func: AggregateFunc,
    pub distinct: bool,
    pub arg: AggregateArg,
}

impl AggregateCall {
    /// Canonical output column label, e.g. `COUNT(*)`, `SUM(v)`, `COUNT(DISTINCT v)`.
    pub fn label(&self) -> String {
        let name = match self.func {
            AggregateFunc::Count => "COUNT",
            AggregateFunc::Sum => "SUM",
            AggregateFunc::Avg => "AVG",
            AggregateFunc::Max => "MAX",
            AggregateFunc::Min => "MIN",
        };
        let arg = match &self.arg {
            AggregateArg::Star => "*".to_string(),
            AggregateArg::Expr(Expr::Column { table, name }) => match table {
                Some(t) => format!("{t}.{name}"),
                None => name.clone(),
            },
            AggregateArg::Expr(other) => format!("{other:?}"),
        };
        if self.distinct {
            format!("{name}(DISTINCT {arg})")
        } else {
            format!("{name}({arg})")
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

#[derive(Clone, Debug, PartialEq)]
pub struct JoinClause {
    pub kind: JoinKind,
    pub table: String,
    pub condition: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SortItem {
    pub expr: Expr,
    pub desc: bool,
}
