use std::collections::VecDeque;

use buffer::TableHeap;
use common::{DbResult, Row};

use crate::{ExecutionContext, Executor};

/// Restartable full scan of a table heap. Schema entries are qualified
/// `table.column` so joins never collide and bare identifiers still resolve
/// via [`expr::EvalContext`]'s unqualified-suffix match.
pub struct SeqScanExec {
    table: String,
    schema: Vec<String>,
    buffered: VecDeque<Row>,
}

impl SeqScanExec {
    pub fn new(table: String, catalog: &catalog::Catalog) -> DbResult<Self> {
        let meta = catalog.table(&table)?;
        let schema = meta
            .schema
            .column_names()
            .into_iter()
            .map(|name| format!("{table}.{name}"))
            .collect();
        Ok(Self {
            table,
            schema,
            buffered: VecDeque::new(),
        })
    }
}

impl Executor for SeqScanExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        let meta = ctx.catalog.table(&self.table)?;
        let heap = TableHeap::new(meta.page_ids.clone());
        self.buffered = heap.scan(ctx.pool)?.into();
        Ok(())
    }

    fn next(&mut self, _ctx: &mut ExecutionContext) -> DbResult<Option<Row>> {
        Ok(self.buffered.pop_front())
    }

    fn close(&mut self, _ctx: &mut ExecutionContext) -> DbResult<()> {
        self.buffered.clear();
        Ok(())
    }

    fn schema(&self) -> &[String] {
        &self.schema
    }
}
