//! Single-session transaction manager: an in-memory undo log, not a durable
//! write-ahead log. Sessions never span a process restart, so there is
//! nothing here that needs to survive one.

#[cfg(test)]
mod tests;

use std::collections::HashSet;

use common::DbResult;
use types::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    Aborted,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationType {
    Insert,
    Update,
    Delete,
    CreateTable,
    DropTable,
}

#[derive(Clone, Debug)]
pub struct LogEntry {
    pub transaction_id: u64,
    pub operation: OperationType,
    pub table_name: String,
    pub old_data: Option<Vec<Value>>,
    pub new_data: Option<Vec<Value>>,
}

impl LogEntry {
    fn new(
        transaction_id: u64,
        operation: OperationType,
        table_name: impl Into<String>,
        old_data: Option<Vec<Value>>,
        new_data: Option<Vec<Value>>,
    ) -> Self {
        Self {
            transaction_id,
            operation,
            table_name: table_name.into(),
            old_data,
            new_data,
        }
    }
}

/// Implemented by whoever owns the catalog/storage: the only undo step the
/// baseline can perform precisely is reversing `CREATE TABLE` with a drop.
pub trait UndoHandler {
    fn drop_table(&mut self, table_name: &str) -> DbResult<()>;
}

#[derive(Debug)]
struct Transaction {
    id: u64,
    state: TransactionState,
    log: Vec<LogEntry>,
    modified_tables: HashSet<String>,
}

impl Transaction {
    fn new(id: u64) -> Self {
        Self {
            id,
            state: TransactionState::Active,
            log: Vec::new(),
            modified_tables: HashSet::new(),
        }
    }

    fn push(&mut self, entry: LogEntry) {
        self.modified_tables.insert(entry.table_name.clone());
        self.log.push(entry);
    }
}

/// Summary of the active transaction, for diagnostics/`performance_stats`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionInfo {
    pub transaction_id: u64,
    pub state: TransactionState,
    pub operations_count: usize,
    pub modified_tables: Vec<String>,
}

/// Tracks at most one active transaction per session and its undo log.
#[derive(Default)]
pub struct TransactionManager {
    next_id: u64,
    current: Option<Transaction>,
    global_log: Vec<LogEntry>,
}

impl TransactionManager {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            current: None,
            global_log: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.current.as_ref().map(|t| t.state),
            Some(TransactionState::Active)
        )
    }

    pub fn current_txn_id(&self) -> Option<u64> {
        self.current.as_ref().map(|t| t.id)
    }

    pub fn transaction_info(&self) -> Option<TransactionInfo> {
        self.current.as_ref().map(|t| TransactionInfo {
            transaction_id: t.id,
            state: t.state,
            operations_count: t.log.len(),
            modified_tables: t.modified_tables.iter().cloned().collect(),
        })
    }

    /// Begin a new transaction, first committing any outstanding one.
    pub fn begin(&mut self) -> u64 {
        if self.is_active() {
            self.commit();
        }
        self.next_id += 1;
        self.current = Some(Transaction::new(self.next_id));
        self.next_id
    }

    /// Commit the active transaction, folding its log into the global log.
    /// A no-op (returns `false`) if no transaction is active.
    pub fn commit(&mut self) -> bool {
        let Some(mut txn) = self.current.take() else {
            return false;
        };
        txn.state = TransactionState::Committed;
        self.global_log.append(&mut txn.log);
        true
    }

    /// Roll back the active transaction, replaying its undo log in reverse.
    /// Returns warnings for operations that could not be precisely undone.
    /// A no-op (returns `Ok(vec![])`) if no transaction is active.
    pub fn rollback(&mut self, handler: &mut dyn UndoHandler) -> DbResult<Vec<String>> {
        let Some(mut txn) = self.current.take() else {
            return Ok(Vec::new());
        };
        txn.state = TransactionState::Aborted;

        let mut warnings = Vec::new();
        for entry in txn.log.iter().rev() {
            match entry.operation {
                OperationType::CreateTable => {
                    handler.drop_table(&entry.table_name)?;
                }
                OperationType::Insert => warnings.push(format!(
                    "cannot precisely undo INSERT on '{}': no stable row identity",
                    entry.table_name
                )),
                OperationType::Update => warnings.push(format!(
                    "cannot precisely undo UPDATE on '{}': no stable row identity",
                    entry.table_name
                )),
                OperationType::Delete => warnings.push(format!(
                    "cannot precisely undo DELETE on '{}': no stable row identity",
                    entry.table_name
                )),
                OperationType::DropTable => warnings.push(format!(
                    "cannot undo DROP TABLE on '{}'",
                    entry.table_name
                )),
            }
        }
        Ok(warnings)
    }

    fn log(&mut self, entry_fn: impl FnOnce(u64) -> LogEntry) {
        if let Some(txn) = self.current.as_mut() {
            if txn.state == TransactionState::Active {
                let entry = entry_fn(txn.id);
                txn.push(entry);
            }
        }
    }

    pub fn log_insert(&mut self, table_name: &str, row: Vec<Value>) {
        self.log(|id| LogEntry::new(id, OperationType::Insert, table_name, None, Some(row)));
    }

    pub fn log_update(&mut self, table_name: &str, old_row: Vec<Value>, new_row: Vec<Value>) {
        self.log(|id| {
            LogEntry::new(
                id,
                OperationType::Update,
                table_name,
                Some(old_row),
                Some(new_row),
            )
        });
    }

    pub fn log_delete(&mut self, table_name: &str, row: Vec<Value>) {
        self.log(|id| LogEntry::new(id, OperationType::Delete, table_name, Some(row), None));
    }

    pub fn log_create_table(&mut self, table_name: &str) {
        self.log(|id| LogEntry::new(id, OperationType::CreateTable, table_name, None, None));
    }

    pub fn log_drop_table(&mut self, table_name: &str) {
        self.log(|id| LogEntry::new(id, OperationType::DropTable, table_name, None, None));
    }
}
