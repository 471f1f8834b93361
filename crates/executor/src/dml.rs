use buffer::TableHeap;
use catalog::Column;
use common::{DbResult, Row};
use expr::{EvalContext, Expr};
use parser::ast::{Assignment, ColumnDef};
use types::Value;

use crate::{ExecutionContext, Executor};

/// A `txn::UndoHandler` that reverses `CREATE TABLE` through the catalog the
/// executor already has a mutable handle on.
struct CatalogUndo<'a> {
    catalog: &'a mut catalog::Catalog,
}

impl txn::UndoHandler for CatalogUndo<'_> {
    fn drop_table(&mut self, table_name: &str) -> DbResult<()> {
        self.catalog.drop_table(table_name)
    }
}

/// Shared shape for every DML/DDL/transaction operator: compute one summary
/// row in `open`, yield it once, then signal exhaustion.
fn one_shot(row: Row, slot: &mut Option<Row>) {
    *slot = Some(row);
}

fn take(slot: &mut Option<Row>) -> Option<Row> {
    slot.take()
}

pub struct InsertExec {
    table: String,
    columns: Option<Vec<String>>,
    rows: Vec<Vec<Value>>,
    schema: Vec<String>,
    result: Option<Row>,
}

impl InsertExec {
    pub fn new(table: String, columns: Option<Vec<String>>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            table,
            columns,
            rows,
            schema: vec!["inserted".to_string()],
            result: None,
        }
    }
}

impl Executor for InsertExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        let meta = ctx.catalog.table(&self.table)?;
        let mut heap = TableHeap::new(meta.page_ids.clone());

        let mut inserted = 0u64;
        for values in &self.rows {
            let full_row = ctx
                .catalog
                .validate_record(&self.table, self.columns.as_deref(), values)?;
            let row = Row::new(full_row);
            heap.insert(ctx.pool, &row)?;
            ctx.txn.log_insert(&self.table, row.into_values());
            inserted += 1;
        }

        let meta = ctx.catalog.table_mut(&self.table)?;
        meta.page_ids = heap.page_ids().to_vec();
        meta.record_count += inserted;

        one_shot(Row::new(vec![Value::Int(inserted as i64)]), &mut self.result);
        Ok(())
    }

    fn next(&mut self, _ctx: &mut ExecutionContext) -> DbResult<Option<Row>> {
        Ok(take(&mut self.result))
    }

    fn close(&mut self, _ctx: &mut ExecutionContext) -> DbResult<()> {
        Ok(())
    }

    fn schema(&self) -> &[String] {
        &self.schema
    }
}

pub struct DeleteExec {
    table: String,
    condition: Option<Expr>,
    schema: Vec<String>,
    result: Option<Row>,
}

impl DeleteExec {
    pub fn new(table: String, condition: Option<Expr>) -> Self {
        Self {
            table,
            condition,
            schema: vec!["deleted".to_string()],
            result: None,
        }
    }
}

impl Executor for DeleteExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        let meta = ctx.catalog.table(&self.table)?;
        let qualified_schema: Vec<String> = meta
            .schema
            .column_names()
            .into_iter()
            .map(|name| format!("{}.{name}", self.table))
            .collect();
        let mut heap = TableHeap::new(meta.page_ids.clone());

        let eval = EvalContext {
            schema: &qualified_schema,
        };
        let matches = |row: &Row| match &self.condition {
            Some(cond) => eval.eval_bool(cond, row).unwrap_or(false),
            None => true,
        };

        let doomed: Vec<Row> = heap
            .scan(ctx.pool)?
            .into_iter()
            .filter(|row| matches(row))
            .collect();

        let deleted = heap.delete(ctx.pool, matches)? as u64;
        for row in doomed {
            ctx.txn.log_delete(&self.table, row.into_values());
        }

        let meta = ctx.catalog.table_mut(&self.table)?;
        meta.page_ids = heap.page_ids().to_vec();
        meta.record_count = meta.record_count.saturating_sub(deleted);

        one_shot(Row::new(vec![Value::Int(deleted as i64)]), &mut self.result);
        Ok(())
    }

    fn next(&mut self, _ctx: &mut ExecutionContext) -> DbResult<Option<Row>> {
        Ok(take(&mut self.result))
    }

    fn close(&mut self, _ctx: &mut ExecutionContext) -> DbResult<()> {
        Ok(())
    }

    fn schema(&self) -> &[String] {
        &self.schema
    }
}

pub struct UpdateExec {
    table: String,
    assignments: Vec<Assignment>,
    condition: Option<Expr>,
    schema: Vec<String>,
    result: Option<Row>,
}

impl UpdateExec {
    pub fn new(table: String, assignments: Vec<Assignment>, condition: Option<Expr>) -> Self {
        Self {
            table,
            assignments,
            condition,
            schema: vec!["updated".to_string()],
            result: None,
        }
    }
}

impl Executor for UpdateExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        let meta = ctx.catalog.table(&self.table)?;
        let qualified_schema: Vec<String> = meta
            .schema
            .column_names()
            .into_iter()
            .map(|name| format!("{}.{name}", self.table))
            .collect();
        let column_indices: Vec<(usize, Expr)> = self
            .assignments
            .iter()
            .filter_map(|assignment| {
                meta.schema
                    .column_index(&assignment.column)
                    .map(|idx| (idx as usize, assignment.value.clone()))
            })
            .collect();
        let mut heap = TableHeap::new(meta.page_ids.clone());

        let eval = EvalContext {
            schema: &qualified_schema,
        };
        let matches = |row: &Row| match &self.condition {
            Some(cond) => eval.eval_bool(cond, row).unwrap_or(false),
            None => true,
        };
        let apply = |row: &Row| -> Row {
            let mut values = row.values.clone();
            for (idx, expr) in &column_indices {
                values[*idx] = eval.eval(expr, row).unwrap_or(Value::Null);
            }
            Row::new(values)
        };

        let before: Vec<Row> = heap
            .scan(ctx.pool)?
            .into_iter()
            .filter(|row| matches(row))
            .collect();
        let mut undo_pairs = Vec::with_capacity(before.len());
        for row in &before {
            undo_pairs.push((row.values.clone(), apply(row).into_values()));
        }

        let updated = heap.update(ctx.pool, matches, apply)? as u64;
        for (old, new) in undo_pairs {
            ctx.txn.log_update(&self.table, old, new);
        }

        let meta = ctx.catalog.table_mut(&self.table)?;
        meta.page_ids = heap.page_ids().to_vec();

        one_shot(Row::new(vec![Value::Int(updated as i64)]), &mut self.result);
        Ok(())
    }

    fn next(&mut self, _ctx: &mut ExecutionContext) -> DbResult<Option<Row>> {
        Ok(take(&mut self.result))
    }

    fn close(&mut self, _ctx: &mut ExecutionContext) -> DbResult<()> {
        Ok(())
    }

    fn schema(&self) -> &[String] {
        &self.schema
    }
}

pub struct CreateTableExec {
    table: String,
    columns: Vec<ColumnDef>,
    schema: Vec<String>,
    result: Option<Row>,
}

impl CreateTableExec {
    pub fn new(table: String, columns: Vec<ColumnDef>) -> Self {
        Self {
            table,
            columns,
            schema: vec!["created".to_string()],
            result: None,
        }
    }
}

impl Executor for CreateTableExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        let columns = self
            .columns
            .iter()
            .map(|col| Column::new(col.name.clone(), col.ty.clone()))
            .collect();
        ctx.catalog.create_table(&self.table, columns)?;
        ctx.txn.log_create_table(&self.table);
        one_shot(Row::new(vec![Value::Text(self.table.clone())]), &mut self.result);
        Ok(())
    }

    fn next(&mut self, _ctx: &mut ExecutionContext) -> DbResult<Option<Row>> {
        Ok(take(&mut self.result))
    }

    fn close(&mut self, _ctx: &mut ExecutionContext) -> DbResult<()> {
        Ok(())
    }

    fn schema(&self) -> &[String] {
        &self.schema
    }
}

pub struct DropTableExec {
    table: String,
    schema: Vec<String>,
    result: Option<Row>,
}

impl DropTableExec {
    pub fn new(table: String) -> Self {
        Self {
            table,
            schema: vec!["dropped".to_string()],
            result: None,
        }
    }
}

impl Executor for DropTableExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        ctx.catalog.drop_table(&self.table)?;
        ctx.txn.log_drop_table(&self.table);
        one_shot(Row::new(vec![Value::Text(self.table.clone())]), &mut self.result);
        Ok(())
    }

    fn next(&mut self, _ctx: &mut ExecutionContext) -> DbResult<Option<Row>> {
        Ok(take(&mut self.result))
    }

    fn close(&mut self, _ctx: &mut ExecutionContext) -> DbResult<()> {
        Ok(())
    }

    fn schema(&self) -> &[String] {
        &self.schema
    }
}

pub struct BeginExec {
    schema: Vec<String>,
    result: Option<Row>,
}

impl BeginExec {
    pub fn new() -> Self {
        Self {
            schema: vec!["transaction_id".to_string()],
            result: None,
        }
    }
}

impl Executor for BeginExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        let id = ctx.txn.begin();
        one_shot(Row::new(vec![Value::Int(id as i64)]), &mut self.result);
        Ok(())
    }

    fn next(&mut self, _ctx: &mut ExecutionContext) -> DbResult<Option<Row>> {
        Ok(take(&mut self.result))
    }

    fn close(&mut self, _ctx: &mut ExecutionContext) -> DbResult<()> {
        Ok(())
    }

    fn schema(&self) -> &[String] {
        &self.schema
    }
}

pub struct CommitExec {
    schema: Vec<String>,
    result: Option<Row>,
}

impl CommitExec {
    pub fn new() -> Self {
        Self {
            schema: vec!["committed".to_string()],
            result: None,
        }
    }
}

impl Executor for CommitExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        let committed = ctx.txn.commit();
        one_shot(Row::new(vec![Value::Bool(committed)]), &mut self.result);
        Ok(())
    }

    fn next(&mut self, _ctx: &mut ExecutionContext) -> DbResult<Option<Row>> {
        Ok(take(&mut self.result))
    }

    fn close(&mut self, _ctx: &mut ExecutionContext) -> DbResult<()> {
        Ok(())
    }

    fn schema(&self) -> &[String] {
        &self.schema
    }
}

pub struct RollbackExec {
    schema: Vec<String>,
    result: Option<Row>,
}

impl RollbackExec {
    pub fn new() -> Self {
        Self {
            schema: vec!["warnings".to_string()],
            result: None,
        }
    }
}

impl Executor for RollbackExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        let mut handler = CatalogUndo {
            catalog: ctx.catalog,
        };
        let warnings = ctx.txn.rollback(&mut handler)?;
        one_shot(
            Row::new(vec![Value::Text(warnings.join("; "))]),
            &mut self.result,
        );
        Ok(())
    }

    fn next(&mut self, _ctx: &mut ExecutionContext) -> DbResult<Option<Row>> {
        Ok(take(&mut self.result))
    }

    fn close(&mut self, _ctx: &mut ExecutionContext) -> DbResult<()> {
        Ok(())
    }

    fn schema(&self) -> &[String] {
        &self.schema
    }
}
