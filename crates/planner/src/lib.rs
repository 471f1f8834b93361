//! Translates a parsed [`parser::ast::Program`] into one plan tree per
//! top-level statement. Plan nodes carry table/column names, not catalog
//! ids: the executor resolves names against the catalog at execution time,
//! so the planner never needs to depend on it.

#[cfg(test)]
mod tests;

use expr::Expr;
use parser::ast::{
    Assignment, ColumnDef, JoinKind, Program, SelectItem, SelectStmt, SortItem, Statement,
};
use types::Value;

#[derive(Clone, Debug, PartialEq)]
pub enum PlanNode {
    SeqScan {
        table: String,
    },
    Filter {
        input: Box<PlanNode>,
        condition: Expr,
    },
    Join {
        left: Box<PlanNode>,
        right: Box<PlanNode>,
        join_type: JoinKind,
        condition: Expr,
    },
    Sort {
        input: Box<PlanNode>,
        items: Vec<SortItem>,
    },
    Project {
        input: Box<PlanNode>,
        items: Vec<SelectItem>,
    },
    Insert {
        table: String,
        columns: Option<Vec<String>>,
        rows: Vec<Vec<Value>>,
    },
    Delete {
        table: String,
        condition: Option<Expr>,
    },
    Update {
        table: String,
        assignments: Vec<Assignment>,
        condition: Option<Expr>,
    },
    CreateTable {
        table: String,
        columns: Vec<ColumnDef>,
    },
    DropTable {
        table: String,
    },
    Begin,
    Commit,
    Rollback,
}

/// Build one plan tree per top-level statement, in program order.
pub fn generate(program: &Program) -> Vec<PlanNode> {
    program.statements.iter().map(generate_statement).collect()
}

fn generate_statement(stmt: &Statement) -> PlanNode {
    match stmt {
        Statement::CreateTable { name, columns } => PlanNode::CreateTable {
            table: name.clone(),
            columns: columns.clone(),
        },
        Statement::Insert {
            table,
            columns,
            values,
        } => PlanNode::Insert {
            table: table.clone(),
            columns: columns.clone(),
            rows: vec![values.clone()],
        },
        Statement::Select(select) => generate_select(select),
        Statement::Delete { table, condition } => PlanNode::Delete {
            table: table.clone(),
            condition: condition.clone(),
        },
        Statement::Update {
            table,
            assignments,
            condition,
        } => PlanNode::Update {
            table: table.clone(),
            assignments: assignments.clone(),
            condition: condition.clone(),
        },
        Statement::DropTable { name } => PlanNode::DropTable { table: name.clone() },
        Statement::Begin => PlanNode::Begin,
        Statement::Commit => PlanNode::Commit,
        Statement::Rollback => PlanNode::Rollback,
    }
}

fn generate_select(select: &SelectStmt) -> PlanNode {
    let mut node = PlanNode::SeqScan {
        table: select.from.clone(),
    };

    if let Some(condition) = &select.where_clause {
        node = PlanNode::Filter {
            input: Box::new(node),
            condition: condition.clone(),
        };
    }

    for join in &select.joins {
        let right = PlanNode::SeqScan {
            table: join.table.clone(),
        };
        node = PlanNode::Join {
            left: Box::new(node),
            right: Box::new(right),
            join_type: join.kind,
            condition: join.condition.clone(),
        };
    }

    if !select.order_by.is_empty() {
        node = PlanNode::Sort {
            input: Box::new(node),
            items: select.order_by.clone(),
        };
    }

    PlanNode::Project {
        input: Box::new(node),
        items: select.items.clone(),
    }
}
