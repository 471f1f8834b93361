use std::collections::{HashMap, HashSet, VecDeque};

use common::{DbResult, Row};
use expr::{EvalContext, Expr};
use parser::ast::{AggregateArg, AggregateCall, AggregateFunc, SelectItem};
use types::Value;

use crate::{ExecutionContext, Executor};

/// Restricts each child row to the selected columns, or — when the
/// selection list contains any aggregate call — buffers every child row and
/// yields exactly one synthetic row keyed by each aggregate's `label()`.
///
/// There is no `GROUP BY` in this dialect's grammar, so a selection list
/// mixing plain columns with aggregates has no well-defined grouping key;
/// once any aggregate is present, only the aggregate items contribute to
/// the single output row (a bare column alongside an aggregate is accepted
/// syntactically but produces no column of its own).
pub struct ProjectExec {
    input: Box<dyn Executor>,
    items: Vec<SelectItem>,
    schema: Vec<String>,
    buffered: VecDeque<Row>,
}

impl ProjectExec {
    pub fn new(input: Box<dyn Executor>, items: Vec<SelectItem>) -> Self {
        let schema = schema_for(&items, input.schema());
        Self {
            input,
            items,
            schema,
            buffered: VecDeque::new(),
        }
    }

    fn is_aggregate(&self) -> bool {
        self.items
            .iter()
            .any(|item| matches!(item, SelectItem::Aggregate(_)))
    }
}

fn schema_for(items: &[SelectItem], child_schema: &[String]) -> Vec<String> {
    if items.iter().any(|item| matches!(item, SelectItem::Aggregate(_))) {
        return items
            .iter()
            .filter_map(|item| match item {
                SelectItem::Aggregate(call) => Some(call.label()),
                _ => None,
            })
            .collect();
    }

    let mut out = Vec::new();
    for item in items {
        match item {
            SelectItem::Star => out.extend(star_columns(child_schema).into_iter().map(|(name, _)| name)),
            SelectItem::Column(name) => out.push(name.clone()),
            SelectItem::Aggregate(_) => unreachable!("handled by the aggregate branch above"),
        }
    }
    out
}

/// Strips each schema entry's `table.` qualifier for `*` expansion, keeping
/// declared column names bare (SPEC_FULL §4.10). When two source columns
/// share a bare name — e.g. a join where both sides declare `id` — only one
/// survives: the later (right-hand) one, per §9's documented "right-side
/// overwrites left" rule. Returns each surviving bare name paired with the
/// index into `child_schema`/the row it should read from.
fn star_columns(child_schema: &[String]) -> Vec<(String, usize)> {
    let mut last_index: HashMap<&str, usize> = HashMap::new();
    for (i, qualified) in child_schema.iter().enumerate() {
        last_index.insert(bare_name(qualified), i);
    }
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for qualified in child_schema {
        let bare = bare_name(qualified);
        if !seen.insert(bare) {
            continue;
        }
        out.push((bare.to_string(), last_index[bare]));
    }
    out
}

fn bare_name(qualified: &str) -> &str {
    qualified.split_once('.').map(|(_, col)| col).unwrap_or(qualified)
}

fn column_expr(name: &str) -> Expr {
    match name.split_once('.') {
        Some((table, col)) => Expr::Column {
            table: Some(table.to_string()),
            name: col.to_string(),
        },
        None => Expr::Column {
            table: None,
            name: name.to_string(),
        },
    }
}

fn project_row(items: &[SelectItem], eval: &EvalContext, row: &Row) -> DbResult<Row> {
    let mut values = Vec::new();
    for item in items {
        match item {
            SelectItem::Star => {
                for (_, idx) in star_columns(eval.schema) {
                    values.push(row.values[idx].clone());
                }
            }
            SelectItem::Column(name) => values.push(eval.eval(&column_expr(name), row)?),
            SelectItem::Aggregate(_) => unreachable!("aggregate projection handled separately"),
        }
    }
    Ok(Row::new(values))
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn aggregate_arg_values(
    call: &AggregateCall,
    eval: &EvalContext,
    rows: &[Row],
) -> DbResult<Vec<Value>> {
    let mut values = Vec::new();
    for row in rows {
        let value = match &call.arg {
            AggregateArg::Star => Value::Int(1),
            AggregateArg::Expr(expr) => eval.eval(expr, row)?,
        };
        values.push(value);
    }
    if call.distinct {
        let mut seen = HashSet::new();
        values.retain(|v| seen.insert(format!("{v:?}")));
    }
    Ok(values)
}

fn compute_aggregate(call: &AggregateCall, eval: &EvalContext, rows: &[Row]) -> DbResult<Value> {
    let values = aggregate_arg_values(call, eval, rows)?;

    if matches!(call.func, AggregateFunc::Count) {
        if matches!(call.arg, AggregateArg::Star) {
            return Ok(Value::Int(values.len() as i64));
        }
        return Ok(Value::Int(values.iter().filter(|v| !v.is_null()).count() as i64));
    }

    match call.func {
        AggregateFunc::Sum => {
            let numbers: Vec<f64> = values.iter().filter_map(numeric).collect();
            if numbers.is_empty() {
                return Ok(Value::Null);
            }
            let all_int = values.iter().all(|v| matches!(v, Value::Int(_)) || v.is_null());
            let sum: f64 = numbers.iter().sum();
            if all_int {
                Ok(Value::Int(sum as i64))
            } else {
                Ok(Value::Float(sum))
            }
        }
        AggregateFunc::Avg => {
            let numbers: Vec<f64> = values.iter().filter_map(numeric).collect();
            if numbers.is_empty() {
                return Ok(Value::Null);
            }
            Ok(Value::Float(numbers.iter().sum::<f64>() / numbers.len() as f64))
        }
        AggregateFunc::Max => Ok(extreme(&values, std::cmp::Ordering::Greater)),
        AggregateFunc::Min => Ok(extreme(&values, std::cmp::Ordering::Less)),
        AggregateFunc::Count => unreachable!("handled above"),
    }
}

/// Folds non-NULL values by `cmp_same_type`, keeping whichever compares
/// `wanted` against the current best. Works across any comparable family
/// (numeric, text, bool), not just numbers.
fn extreme(values: &[Value], wanted: std::cmp::Ordering) -> Value {
    let mut best: Option<&Value> = None;
    for value in values {
        if value.is_null() {
            continue;
        }
        best = match best {
            None => Some(value),
            Some(current) => match value.cmp_same_type(current) {
                Some(ord) if ord == wanted => Some(value),
                _ => Some(current),
            },
        };
    }
    best.cloned().unwrap_or(Value::Null)
}

impl Executor for ProjectExec {
    fn open(&mut self, ctx: &mut ExecutionContext) -> DbResult<()> {
        self.input.open(ctx)?;
        let schema = self.input.schema().to_vec();
        let eval = EvalContext { schema: &schema };

        if self.is_aggregate() {
            let mut rows = Vec::new();
            while let Some(row) = self.input.next(ctx)? {
                rows.push(row);
            }
            let mut values = Vec::new();
            for item in &self.items {
                if let SelectItem::Aggregate(call) = item {
                    values.push(compute_aggregate(call, &eval, &rows)?);
                }
            }
            self.buffered.push_back(Row::new(values));
            return Ok(());
        }

        while let Some(row) = self.input.next(ctx)? {
            self.buffered.push_back(project_row(&self.items, &eval, &row)?);
        }
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
        &self.schema
    }
}
