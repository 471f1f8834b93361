use catalog::Catalog;
use common::DbResult;
use planner::PlanNode;

use crate::dml::{
    BeginExec, CommitExec, CreateTableExec, DeleteExec, DropTableExec, InsertExec, RollbackExec,
    UpdateExec,
};
use crate::filter::FilterExec;
use crate::join::JoinExec;
use crate::project::ProjectExec;
use crate::scan::SeqScanExec;
use crate::sort::SortExec;
use crate::Executor;

/// Recursively translate a plan tree into its executor tree. Needs only
/// read access to the catalog, to resolve each `SeqScan`'s column list.
pub fn build(plan: &PlanNode, catalog: &Catalog) -> DbResult<Box<dyn Executor>> {
    let exec: Box<dyn Executor> = match plan {
        PlanNode::SeqScan { table } => Box::new(SeqScanExec::new(table.clone(), catalog)?),
        PlanNode::Filter { input, condition } => {
            Box::new(FilterExec::new(build(input, catalog)?, condition.clone()))
        }
        PlanNode::Join {
            left,
            right,
            join_type,
            condition,
        } => Box::new(JoinExec::new(
            build(left, catalog)?,
            build(right, catalog)?,
            *join_type,
            condition.clone(),
        )),
        PlanNode::Sort { input, items } => {
            Box::new(SortExec::new(build(input, catalog)?, items.clone()))
        }
        PlanNode::Project { input, items } => {
            Box::new(ProjectExec::new(build(input, catalog)?, items.clone()))
        }
        PlanNode::Insert {
            table,
            columns,
            rows,
        } => Box::new(InsertExec::new(table.clone(), columns.clone(), rows.clone())),
        PlanNode::Delete { table, condition } => {
            Box::new(DeleteExec::new(table.clone(), condition.clone()))
        }
        PlanNode::Update {
            table,
            assignments,
            condition,
        } => Box::new(UpdateExec::new(
            table.clone(),
            assignments.clone(),
            condition.clone(),
        )),
        PlanNode::CreateTable { table, columns } => {
            Box::new(CreateTableExec::new(table.clone(), columns.clone()))
        }
        PlanNode::DropTable { table } => Box::new(DropTableExec::new(table.clone())),
        PlanNode::Begin => Box::new(BeginExec::new()),
        PlanNode::Commit => Box::new(CommitExec::new()),
        PlanNode::Rollback => Box::new(RollbackExec::new()),
    };
    Ok(exec)
}
