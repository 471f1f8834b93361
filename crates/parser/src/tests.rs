use super::*;
use expr::{BinaryOp, Expr};
use types::{SqlType, Value};

#[test]
fn parses_create_table() {
    let program = parse("CREATE TABLE users(id INT, name VARCHAR(50));").unwrap();
    assert_eq!(
        program.statements,
        vec![Statement::CreateTable {
            name: "users".into(),
            columns: vec![
                ColumnDef {
                    name: "id".into(),
                    ty: SqlType::Int,
                },
                ColumnDef {
                    name: "name".into(),
                    ty: SqlType::Varchar(50),
                },
            ],
        }]
    );
}

#[test]
fn parses_insert_with_explicit_columns() {
    let program = parse("INSERT INTO t (id, name) VALUES (1, 'Alice');").unwrap();
    assert_eq!(
        program.statements,
        vec![Statement::Insert {
            table: "t".into(),
            columns: Some(vec!["id".into(), "name".into()]),
            values: vec![Value::Int(1), Value::Text("Alice".into())],
        }]
    );
}

#[test]
fn parses_select_with_where_and_order_by() {
    let program = parse("SELECT id, age FROM t WHERE age > 20 ORDER BY age DESC;").unwrap();
    let Statement::Select(select) = &program.statements[0] else {
        panic!("expected select");
    };
    assert_eq!(select.from, "t");
    assert_eq!(
        select.items,
        vec![SelectItem::Column("id".into()), SelectItem::Column("age".into())]
    );
    assert!(select.where_clause.is_some());
    assert_eq!(select.order_by.len(), 1);
    assert!(select.order_by[0].desc);
}

#[test]
fn parses_join_clause() {
    let program =
        parse("SELECT users.name, orders.amt FROM users JOIN orders ON users.id = orders.uid;")
            .unwrap();
    let Statement::Select(select) = &program.statements[0] else {
        panic!("expected select");
    };
    assert_eq!(select.joins.len(), 1);
    assert_eq!(select.joins[0].kind, JoinKind::Inner);
    assert_eq!(select.joins[0].table, "orders");
}

#[test]
fn parses_left_outer_join() {
    let program = parse("SELECT * FROM a LEFT OUTER JOIN b ON a.id = b.id;").unwrap();
    let Statement::Select(select) = &program.statements[0] else {
        panic!("expected select");
    };
    assert_eq!(select.joins[0].kind, JoinKind::Left);
}

#[test]
fn parses_aggregate_select_item() {
    let program = parse("SELECT COUNT(*) FROM t;").unwrap();
    let Statement::Select(select) = &program.statements[0] else {
        panic!("expected select");
    };
    match &select.items[0] {
        SelectItem::Aggregate(agg) => {
            assert_eq!(agg.func, AggregateFunc::Count);
            assert!(!agg.distinct);
            assert!(matches!(agg.arg, AggregateArg::Star));
        }
        other => panic!("expected aggregate, got {other:?}"),
    }
}

#[test]
fn parses_count_distinct() {
    let program = parse("SELECT COUNT(DISTINCT v) FROM t;").unwrap();
    let Statement::Select(select) = &program.statements[0] else {
        panic!("expected select");
    };
    match &select.items[0] {
        SelectItem::Aggregate(agg) => assert!(agg.distinct),
        other => panic!("expected aggregate, got {other:?}"),
    }
}

#[test]
fn parses_delete_and_update() {
    let program = parse("DELETE FROM t WHERE id = 1; UPDATE t SET x = 5 WHERE id = 2;").unwrap();
    assert_eq!(program.statements.len(), 2);
    assert!(matches!(program.statements[0], Statement::Delete { .. }));
    assert!(matches!(program.statements[1], Statement::Update { .. }));
}

#[test]
fn parses_drop_table() {
    let program = parse("DROP TABLE t;").unwrap();
    assert_eq!(
        program.statements,
        vec![Statement::DropTable { name: "t".into() }]
    );
}

#[test]
fn parses_transaction_statements() {
    let program = parse("BEGIN; COMMIT;").unwrap();
    assert_eq!(program.statements, vec![Statement::Begin, Statement::Commit]);

    let program = parse("BEGIN TRANSACTION; ROLLBACK TRANSACTION;").unwrap();
    assert_eq!(
        program.statements,
        vec![Statement::Begin, Statement::Rollback]
    );
}

#[test]
fn and_binds_tighter_than_or() {
    let program = parse("SELECT * FROM t WHERE a = 1 OR b = 2 AND c = 3;").unwrap();
    let Statement::Select(select) = &program.statements[0] else {
        panic!("expected select");
    };
    let Some(Expr::Binary { op: BinaryOp::Or, right, .. }) = &select.where_clause else {
        panic!("expected top-level OR");
    };
    assert!(matches!(**right, Expr::Binary { op: BinaryOp::And, .. }));
}

#[test]
fn syntax_error_reports_position() {
    let err = parse("SELEC * FROM t").unwrap_err();
    assert!(matches!(err, common::DbError::Parser(..)));
}

#[test]
fn qualified_column_in_where() {
    let program = parse("SELECT * FROM a JOIN b ON a.id = b.a_id WHERE b.v = 1;").unwrap();
    let Statement::Select(select) = &program.statements[0] else {
        panic!("expected select");
    };
    assert!(matches!(select.where_clause, Some(Expr::Binary { .. })));
}
