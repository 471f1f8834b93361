//! Query executor: a Volcano-style pull iterator model over physical plan
//! trees produced by [`planner::generate`].
//!
//! Every operator implements [`Executor`]: `open` acquires resources,
//! `next` pulls one row at a time (or `None` at exhaustion), `close`
//! releases resources. [`execute`] drains the root operator and packages
//! the result as a [`QueryResult`], the shape the facade hands back to
//! callers without ever letting a `DbError` escape past that boundary.

mod builder;
mod dml;
mod filter;
mod join;
mod project;
mod scan;
mod sort;

#[cfg(test)]
mod tests;

use std::time::{Duration, Instant};

use buffer::BufferPool;
use catalog::Catalog;
use common::{DbResult, Row};
use planner::PlanNode;
use txn::TransactionManager;
use types::Value;

/// Everything an operator needs to read/mutate state while executing.
pub struct ExecutionContext<'a> {
    pub catalog: &'a mut Catalog,
    pub pool: &'a mut BufferPool,
    pub txn: &'a mut TransactionManager,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        catalog: &'a mut Catalog,
        pool: &'a mut BufferPool,
        txn: &'a mut TransactionManager,
    ) -> Self {
        Self { catalog, pool, txn }
    }
}

/// Pull-based iterator interface every physical operator implements.
pub trait Executor {
    fn open(&mut self, ctx: &mut ExecutionContext) -> DbResult<()>;
    fn next(&mut self, ctx: &mut ExecutionContext) -> DbResult<Option<Row>>;
    fn close(&mut self, ctx: &mut ExecutionContext) -> DbResult<()>;
    /// Column labels of the rows this operator produces, in order.
    fn schema(&self) -> &[String];
}

/// Outcome of executing one statement. Never carries a `DbError` itself —
/// failures are folded into `success`/`message` so the facade's boundary
/// never lets one escape (SPEC_FULL §4.12).
#[derive(Clone, Debug)]
pub struct QueryResult {
    pub success: bool,
    pub message: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub affected_rows: u64,
    pub execution_time: Duration,
}

impl QueryResult {
    fn failure(message: impl Into<String>, execution_time: Duration) -> Self {
        Self {
            success: false,
            message: message.into(),
            columns: Vec::new(),
            rows: Vec::new(),
            affected_rows: 0,
            execution_time,
        }
    }
}

/// Build, drain, and summarize one plan tree.
pub fn execute(plan: &PlanNode, ctx: &mut ExecutionContext) -> DbResult<QueryResult> {
    let start = Instant::now();
    let mut exec = match builder::build(plan, ctx.catalog) {
        Ok(exec) => exec,
        Err(err) => return Ok(QueryResult::failure(err.to_string(), start.elapsed())),
    };

    let run = (|| -> DbResult<(Vec<String>, Vec<Row>)> {
        exec.open(ctx)?;
        let mut rows = Vec::new();
        while let Some(row) = exec.next(ctx)? {
            rows.push(row);
        }
        exec.close(ctx)?;
        Ok((exec.schema().to_vec(), rows))
    })();

    let (columns, rows) = match run {
        Ok(pair) => pair,
        Err(err) => return Ok(QueryResult::failure(err.to_string(), start.elapsed())),
    };

    let (affected_rows, message) = summarize(plan, &rows);

    Ok(QueryResult {
        success: true,
        message,
        columns,
        rows,
        affected_rows,
        execution_time: start.elapsed(),
    })
}

/// Reads the operator-specific summary row (`{inserted: n}`, `{created: name}`,
/// ...) into an affected-row count and a human-readable message.
fn summarize(plan: &PlanNode, rows: &[Row]) -> (u64, String) {
    let first_value = rows.first().and_then(|r| r.values.first());

    match plan {
        PlanNode::Insert { .. } | PlanNode::Delete { .. } | PlanNode::Update { .. } => {
            let n = match first_value {
                Some(Value::Int(n)) => *n as u64,
                _ => 0,
            };
            let verb = match plan {
                PlanNode::Insert { .. } => "inserted",
                PlanNode::Delete { .. } => "deleted",
                _ => "updated",
            };
            (n, format!("{n} row(s) {verb}"))
        }
        PlanNode::CreateTable { table, .. } => (0, format!("table '{table}' created")),
        PlanNode::DropTable { table } => (0, format!("table '{table}' dropped")),
        PlanNode::Begin => (0, "transaction started".to_string()),
        PlanNode::Commit => (0, "transaction committed".to_string()),
        PlanNode::Rollback => (0, "transaction rolled back".to_string()),
        // SeqScan/Filter/Join/Sort/Project: queries report zero affected
        // rows regardless of how many they return (SPEC_FULL §6).
        _ => (0, format!("{} row(s) returned", rows.len())),
    }
}
