use std::cmp::Ordering;
use std::collections::VecDeque;

use common::{DbResult, Row};
use expr::EvalContext;
use parser::ast::SortItem;
use types::Value;

use crate::{ExecutionContext, Executor};

/// Buffers the whole input, sorts by the key tuple lexicographically (DESC
/// inverts per-key, NULLs sort last), then replays in order. Rust's
/// `sort_by` is stable, matching the spec's stability requirement.
pub struct SortExec {
    input: Box<dyn Executor>,
    items: Vec<SortItem>,
    buffered: VecDeque<Row>,
}

impl SortExec {
    pub fn new(input: Box<dyn Executor>, items: Vec<SortItem>) -> Self {
        Self {
            input,
            items,
            buffered: VecDeque::new(),
        }
    }
}

impl Executor for SortExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        self.input.open(ctx)?;
        let schema = self.input.schema().to_vec();
        let eval = EvalContext { schema: &schema };

        let mut rows = Vec::new();
        while let Some(row) = self.input.next(ctx)? {
            rows.push(row);
        }

        let mut keyed: Vec<(Vec<Value>, Row)> = Vec::with_capacity(rows.len());
        for row in rows {
            let mut keys = Vec::with_capacity(self.items.len());
            for item in &self.items {
                keys.push(eval.eval(&item.expr, &row)?);
            }
            keyed.push((keys, row));
        }

        keyed.sort_by(|(a_keys, _), (b_keys, _)| {
            for (idx, item) in self.items.iter().enumerate() {
                let ord = compare_nulls_last(&a_keys[idx], &b_keys[idx]);
                let ord = if item.desc { ord.reverse() } else { ord };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });

        self.buffered = keyed.into_iter().map(|(_, row)| row).collect();
        Ok(())
    }

    fn next(&mut self, _ctx: &mut ExecutionContext) -> DbResult<Option<Row>> {
        Ok(self.buffered.pop_front())
    }

    fn close(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        self.buffered.clear();
        self.input.close(ctx)
    }

    fn schema(&self) -> &[String] {
        self.input.schema()
    }
}

fn compare_nulls_last(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.cmp_same_type(b).unwrap_or(Ordering::Equal),
    }
}
