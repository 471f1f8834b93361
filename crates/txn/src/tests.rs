use super::*;

struct RecordingHandler {
    dropped: Vec<String>,
}

impl UndoHandler for RecordingHandler {
    fn drop_table(&mut self, table_name: &str) -> DbResult<()> {
        self.dropped.push(table_name.to_string());
        Ok(())
    }
}

#[test]
fn begin_commit_clears_active_transaction() {
    let mut mgr = TransactionManager::new();
    let id = mgr.begin();
    assert!(mgr.is_active());
    assert_eq!(mgr.current_txn_id(), Some(id));

    assert!(mgr.commit());
    assert!(!mgr.is_active());
    assert_eq!(mgr.current_txn_id(), None);
}

#[test]
fn begin_while_active_commits_the_outstanding_transaction_first() {
    let mut mgr = TransactionManager::new();
    let first = mgr.begin();
    mgr.log_insert("t", vec![]);
    let second = mgr.begin();

    assert_ne!(first, second);
    assert!(mgr.is_active());
    assert_eq!(mgr.current_txn_id(), Some(second));
}

#[test]
fn rollback_undoes_create_table_via_drop() {
    let mut mgr = TransactionManager::new();
    mgr.begin();
    mgr.log_create_table("widgets");

    let mut handler = RecordingHandler { dropped: vec![] };
    let warnings = mgr.rollback(&mut handler).unwrap();

    assert_eq!(handler.dropped, vec!["widgets".to_string()]);
    assert!(warnings.is_empty());
    assert!(!mgr.is_active());
}

#[test]
fn rollback_warns_instead_of_undoing_insert_update_delete() {
    let mut mgr = TransactionManager::new();
    mgr.begin();
    mgr.log_insert("t", vec![Value::Int(1)]);
    mgr.log_update("t", vec![Value::Int(1)], vec![Value::Int(2)]);
    mgr.log_delete("t", vec![Value::Int(2)]);

    let mut handler = RecordingHandler { dropped: vec![] };
    let warnings = mgr.rollback(&mut handler).unwrap();

    assert_eq!(warnings.len(), 3);
    assert!(handler.dropped.is_empty());
}

#[test]
fn rollback_with_no_active_transaction_is_a_no_op() {
    let mut mgr = TransactionManager::new();
    let mut handler = RecordingHandler { dropped: vec![] };
    assert_eq!(mgr.rollback(&mut handler).unwrap(), Vec::<String>::new());
}

#[test]
fn logging_without_an_active_transaction_is_ignored() {
    let mut mgr = TransactionManager::new();
    mgr.log_insert("t", vec![Value::Int(1)]);
    assert_eq!(mgr.transaction_info(), None);
}

#[test]
fn transaction_info_reports_operation_count_and_modified_tables() {
    let mut mgr = TransactionManager::new();
    mgr.begin();
    mgr.log_insert("a", vec![]);
    mgr.log_insert("b", vec![]);

    let info = mgr.transaction_info().unwrap();
    assert_eq!(info.operations_count, 2);
    assert_eq!(info.state, TransactionState::Active);
    let mut tables = info.modified_tables;
    tables.sort();
    assert_eq!(tables, vec!["a".to_string(), "b".to_string()]);
}
