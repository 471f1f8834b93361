use common::{DbResult, Row};
use expr::{EvalContext, Expr};

use crate::{ExecutionContext, Executor};

/// Forwards only rows where `condition` is truthy. NULL and unresolved
/// identifiers evaluate falsy per [`EvalContext::eval`], so no special
/// casing is needed here beyond asking the evaluator.
pub struct FilterExec {
    input: Box<dyn Executor>,
    condition: Expr,
}

impl FilterExec {
    pub fn new(input: Box<dyn Executor>, condition: Expr) -> Self {
        Self { input, condition }
    }
}

impl Executor for FilterExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        self.input.open(ctx)
    }

    fn next(&mut self, ctx: &mut ExecutionContext) -> DbResult<Option<Row>> {
        let schema = self.input.schema().to_vec();
        let eval = EvalContext { schema: &schema };
        while let Some(row) = self.input.next(ctx)? {
            if eval.eval_bool(&self.condition, &row)? {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    fn close(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        self.input.close(ctx)
    }

    fn schema(&self) -> &[String] {
        self.input.schema()
    }
}
