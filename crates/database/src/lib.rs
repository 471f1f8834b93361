//! Synchronous query engine facade: owns the catalog, buffer pool, and
//! transaction manager for one data directory, and turns SQL text into
//! [`QueryResult`]s without ever letting a `DbError` escape its boundary.


use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use buffer::{BufferPool, BufferStats};
use catalog::Catalog;
use common::DbResult;
pub use executor::QueryResult;
use executor::ExecutionContext;
use parser::parse;
use planner::generate;
use semantic::analyze;
use storage::DiskManager;
use txn::TransactionManager;
use types::SqlType;

const DATA_FILE: &str = "data.db";
const CATALOG_FILE: &str = "catalog.json";

/// Schema + bookkeeping summary for one registered table.
#[derive(Clone, Debug)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<(String, SqlType)>,
    pub row_count: u64,
    pub page_count: usize,
}

/// Coarse summary of the whole database for diagnostics.
#[derive(Clone, Debug)]
pub struct DatabaseInfo {
    pub data_dir: PathBuf,
    pub table_count: usize,
    pub total_rows: u64,
}

/// Running counters mirroring the original Python `performance_analyzer.py`:
/// the buffer pool's own stats plus a statement counter and cumulative
/// execution time. Diagnostic surface only — no correctness contract.
#[derive(Clone, Copy, Debug, Default)]
pub struct PerformanceStats {
    pub buffer: BufferStats,
    pub statements_executed: u64,
    pub total_execution_time: Duration,
}

/// Owns one data directory's worth of engine state: the catalog, the
/// buffer pool sitting on the single backing file, and the session's
/// transaction manager.
pub struct Database {
    catalog: Catalog,
    pool: BufferPool,
    txn: TransactionManager,
    data_dir: PathBuf,
    catalog_path: PathBuf,
    statements_executed: u64,
    total_execution_time: Duration,
}

impl Database {
    /// Open (or create) the database rooted at `path`, with a buffer pool
    /// sized to `buffer_capacity` pages.
    pub fn new(path: &Path, buffer_capacity: usize) -> DbResult<Self> {
        fs::create_dir_all(path)?;
        let catalog_path = path.join(CATALOG_FILE);
        let disk = DiskManager::open(&path.join(DATA_FILE))?;
        let pool = BufferPool::new(disk, buffer_capacity);
        let catalog = if catalog_path.exists() {
            Catalog::open(&catalog_path, None)?
        } else {
            Catalog::new()
        };

        Ok(Self {
            catalog,
            pool,
            txn: TransactionManager::new(),
            data_dir: path.to_path_buf(),
            catalog_path,
            statements_executed: 0,
            total_execution_time: Duration::ZERO,
        })
    }

    /// Lex, parse, semantically analyze, plan, and execute `sql`. A `sql` string may contain more
    /// than one `;`-separated statement (SPEC_FULL §4.7's grammar allows
    /// it); each runs in order and the result of the *last* one is
    /// returned, matching `execute_batch`'s "stop at first failure" policy
    /// applied within a single call. Never returns an `Err`: compilation
    /// and execution failures are folded into a failed `QueryResult`.
    pub fn execute(&mut self, sql: &str) -> QueryResult {
        let start = Instant::now();
        self.statements_executed += 1;
        debug_trace(|| format!("execute: {sql}"));

        let program = match parse(sql) {
            Ok(program) => program,
            Err(err) => return self.record(compile_failure(err, start.elapsed())),
        };

        let semantic_errors = analyze(&program, &self.catalog);
        if !semantic_errors.is_empty() {
            let messages: Vec<String> = semantic_errors.iter().map(ToString::to_string).collect();
            debug_trace(|| format!("semantic errors: {messages:?}"));
            let err = common::DbError::Semantic(messages.join("; "));
            return self.record(compile_failure(err, start.elapsed()));
        }

        let plans = generate(&program);
        debug_trace(|| format!("plan: {plans:?}"));
        if plans.is_empty() {
            return self.record(QueryResult {
                success: true,
                message: "no statement to execute".to_string(),
                columns: Vec::new(),
                rows: Vec::new(),
                affected_rows: 0,
                execution_time: start.elapsed(),
            });
        }

        let mut last = None;
        for plan in &plans {
            let mutates = matches!(
                plan,
                planner::PlanNode::Insert { .. }
                    | planner::PlanNode::Update { .. }
                    | planner::PlanNode::Delete { .. }
                    | planner::PlanNode::CreateTable { .. }
                    | planner::PlanNode::DropTable { .. }
            );

            let mut ctx = ExecutionContext::new(&mut self.catalog, &mut self.pool, &mut self.txn);
            let result = match executor::execute(plan, &mut ctx) {
                Ok(result) => result,
                Err(err) => compile_failure(err, start.elapsed()),
            };

            if mutates && result.success {
                // Catalog mutations are followed by a persist call before
                // any subsequent read can observe them (SPEC_FULL §5).
                let _ = self.catalog.save(&self.catalog_path);
            }

            let failed = !result.success;
            last = Some(result);
            if failed {
                break;
            }
        }

        self.record(last.expect("plans is non-empty"))
    }

    /// Run each SQL string in order, stopping at (and including) the first
    /// failure. Later strings are left unexecuted, per SPEC_FULL §5's
    /// documented ordering guarantee.
    pub fn execute_batch(&mut self, sqls: &[String]) -> Vec<QueryResult> {
        let mut results = Vec::with_capacity(sqls.len());
        for sql in sqls {
            let result = self.execute(sql);
            let failed = !result.success;
            results.push(result);
            if failed {
                break;
            }
        }
        results
    }

    pub fn list_tables(&self) -> Vec<String> {
        self.catalog.list_tables().into_iter().map(str::to_string).collect()
    }

    pub fn table_info(&self, name: &str) -> DbResult<TableInfo> {
        let meta = self.catalog.table(name)?;
        Ok(TableInfo {
            name: meta.name.clone(),
            columns: meta
                .schema
                .columns
                .iter()
                .map(|c| (c.name.clone(), c.ty.clone()))
                .collect(),
            row_count: meta.record_count,
            page_count: meta.page_ids.len(),
        })
    }

    pub fn database_info(&self) -> DatabaseInfo {
        let total_rows = self.catalog.tables().map(|t| t.record_count).sum();
        DatabaseInfo {
            data_dir: self.data_dir.clone(),
            table_count: self.catalog.list_tables().len(),
            total_rows,
        }
    }

    pub fn performance_stats(&self) -> PerformanceStats {
        PerformanceStats {
            buffer: self.pool.stats(),
            statements_executed: self.statements_executed,
            total_execution_time: self.total_execution_time,
        }
    }

    /// Write every dirty page and the catalog sidecar to disk.
    pub fn flush(&mut self) -> DbResult<()> {
        self.pool.flush_all()?;
        self.catalog.save(&self.catalog_path)
    }

    pub fn close(&mut self) -> DbResult<()> {
        self.flush()?;
        self.pool.shutdown()
    }

    /// Copy the backing file and catalog sidecar to `destination`.
    pub fn backup(&mut self, destination: &Path) -> DbResult<()> {
        self.flush()?;
        fs::create_dir_all(destination)?;
        fs::copy(self.data_dir.join(DATA_FILE), destination.join(DATA_FILE))?;
        fs::copy(&self.catalog_path, destination.join(CATALOG_FILE))?;
        Ok(())
    }

    fn record(&mut self, result: QueryResult) -> QueryResult {
        self.total_execution_time += result.execution_time;
        result
    }
}

fn compile_failure(err: common::DbError, execution_time: Duration) -> QueryResult {
    QueryResult {
        success: false,
        message: err.to_string(),
        columns: Vec::new(),
        rows: Vec::new(),
        affected_rows: 0,
        execution_time,
    }
}

/// Verbose internal tracing gated by `MINIDB_DEBUG=1`. The workspace carries
/// no `tracing`/`log` dependency for the facade to hook into, so this is a
/// plain env-gated `eprintln!` (SPEC_FULL §6).
fn debug_trace(message: impl FnOnce() -> String) {
    if std::env::var_os("MINIDB_DEBUG").as_deref() == Some(std::ffi::OsStr::new("1")) {
        eprintln!("[minidb] {}", message());
    }
}
