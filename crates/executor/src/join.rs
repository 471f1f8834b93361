use std::collections::VecDeque;

use common::{DbResult, Row};
use expr::{EvalContext, Expr};
use parser::ast::JoinKind;
use types::Value;

use crate::{ExecutionContext, Executor};

/// Nested-loop join over two materialized row sets. The right side is a
/// freshly-built `SeqScan` per SPEC_FULL §4.9, so buffering it once up
/// front and looping in memory produces the same rows a per-left-row
/// reopen would, without the repeated scan cost.
pub struct JoinExec {
    left: Box<dyn Executor>,
    right: Box<dyn Executor>,
    join_type: JoinKind,
    condition: Expr,
    schema: Vec<String>,
    left_width: usize,
    right_width: usize,
    output: VecDeque<Row>,
}

impl JoinExec {
    pub fn new(
        left: Box<dyn Executor>,
        right: Box<dyn Executor>,
        join_type: JoinKind,
        condition: Expr,
    ) -> Self {
        let left_width = left.schema().len();
        let right_width = right.schema().len();
        let schema = left
            .schema()
            .iter()
            .chain(right.schema().iter())
            .cloned()
            .collect();
        Self {
            left,
            right,
            join_type,
            condition,
            schema,
            left_width,
            right_width,
            output: VecDeque::new(),
        }
    }
}

impl Executor for JoinExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        self.left.open(ctx)?;
        let mut left_rows = Vec::new();
        while let Some(row) = self.left.next(ctx)? {
            left_rows.push(row);
        }
        self.left.close(ctx)?;

        self.right.open(ctx)?;
        let mut right_rows = Vec::new();
        while let Some(row) = self.right.next(ctx)? {
            right_rows.push(row);
        }
        self.right.close(ctx)?;

        let eval = EvalContext {
            schema: &self.schema,
        };

        let mut right_matched = vec![false; right_rows.len()];
        for left_row in &left_rows {
            let mut matched_any = false;
            for (ri, right_row) in right_rows.iter().enumerate() {
                let combined = concat(left_row, right_row);
                if eval.eval_bool(&self.condition, &combined)? {
                    matched_any = true;
                    right_matched[ri] = true;
                    self.output.push_back(combined);
                }
            }
            if !matched_any && matches!(self.join_type, JoinKind::Left | JoinKind::Full) {
                self.output
                    .push_back(concat(left_row, &null_row(self.right_width)));
            }
        }

        if matches!(self.join_type, JoinKind::Right | JoinKind::Full) {
            for (ri, right_row) in right_rows.iter().enumerate() {
                if !right_matched[ri] {
                    self.output
                        .push_back(concat(&null_row(self.left_width), right_row));
                }
            }
        }

        Ok(())
    }

    fn next(&mut self, _ctx: &mut ExecutionContext) -> DbResult<Option<Row>> {
        Ok(self.output.pop_front())
    }

    fn close(&mut self, _ctx: &mut ExecutionContext) -> DbResult<()> {
        self.output.clear();
        Ok(())
    }

    fn schema(&self) -> &[String] {
        &self.schema
    }
}

fn concat(left: &Row, right: &Row) -> Row {
    let mut values = left.values.clone();
    values.extend(right.values.iter().cloned());
    Row::new(values)
}

fn null_row(width: usize) -> Row {
    Row::new(vec![Value::Null; width])
}
