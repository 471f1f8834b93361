use buffer::BufferPool;
use catalog::{Catalog, Column};
use common::DbResult;
use parser::parse;
use planner::generate;
use storage::DiskManager;
use tempfile::TempDir;
use txn::TransactionManager;
use types::{SqlType, Value};

use crate::{execute, ExecutionContext};

struct Harness {
    catalog: Catalog,
    pool: BufferPool,
    txn: TransactionManager,
    _dir: TempDir,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let disk = DiskManager::open(&dir.path().join("data.db")).unwrap();
        Self {
            catalog: Catalog::new(),
            pool: BufferPool::new(disk, 64),
            txn: TransactionManager::new(),
            _dir: dir,
        }
    }

    fn run(&mut self, sql: &str) -> Vec<DbResult<crate::QueryResult>> {
        let program = parse(sql).unwrap();
        let plans = generate(&program);
        plans
            .iter()
            .map(|plan| {
                let mut ctx = ExecutionContext::new(&mut self.catalog, &mut self.pool, &mut self.txn);
                execute(plan, &mut ctx)
            })
            .collect()
    }

    fn run_one(&mut self, sql: &str) -> crate::QueryResult {
        self.run(sql).into_iter().next().unwrap().unwrap()
    }
}

fn create_people(h: &mut Harness) {
    h.catalog
        .create_table(
            "people",
            vec![
                Column::new("id", SqlType::Int),
                Column::new("name", SqlType::Varchar(32)),
                Column::new("age", SqlType::Int),
            ],
        )
        .unwrap();
}

#[test]
fn create_table_then_insert_and_scan() {
    let mut h = Harness::new();
    let result = h.run_one("CREATE TABLE people (id INT, name VARCHAR(32), age INT);");
    assert!(result.success);

    let result = h.run_one("INSERT INTO people VALUES (1, 'alice', 30);");
    assert_eq!(result.affected_rows, 1);

    let result = h.run_one("SELECT * FROM people;");
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].values[1], Value::Text("alice".into()));
}

#[test]
fn filter_keeps_only_matching_rows() {
    let mut h = Harness::new();
    create_people(&mut h);
    h.run_one("INSERT INTO people VALUES (1, 'alice', 30);");
    h.run_one("INSERT INTO people VALUES (2, 'bob', 12);");

    let result = h.run_one("SELECT name FROM people WHERE age = 30;");
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].values, vec![Value::Text("alice".into())]);
}

#[test]
fn order_by_desc_sorts_rows_and_nulls_last() {
    let mut h = Harness::new();
    create_people(&mut h);
    h.run_one("INSERT INTO people VALUES (1, 'alice', 30);");
    h.run_one("INSERT INTO people VALUES (2, 'bob', 12);");
    h.run_one("INSERT INTO people VALUES (3, 'carol', 45);");

    let result = h.run_one("SELECT name FROM people ORDER BY age DESC;");
    let names: Vec<_> = result.rows.iter().map(|r| r.values[0].clone()).collect();
    assert_eq!(
        names,
        vec![
            Value::Text("carol".into()),
            Value::Text("alice".into()),
            Value::Text("bob".into()),
        ]
    );
}

#[test]
fn update_rewrites_matching_rows_only() {
    let mut h = Harness::new();
    create_people(&mut h);
    h.run_one("INSERT INTO people VALUES (1, 'alice', 30);");
    h.run_one("INSERT INTO people VALUES (2, 'bob', 12);");

    let result = h.run_one("UPDATE people SET age = 99 WHERE name = 'bob';");
    assert_eq!(result.affected_rows, 1);

    let result = h.run_one("SELECT age FROM people ORDER BY age ASC;");
    let ages: Vec<_> = result.rows.iter().map(|r| r.values[0].clone()).collect();
    assert_eq!(ages, vec![Value::Int(30), Value::Int(99)]);
}

#[test]
fn delete_removes_matching_rows() {
    let mut h = Harness::new();
    create_people(&mut h);
    h.run_one("INSERT INTO people VALUES (1, 'alice', 30);");
    h.run_one("INSERT INTO people VALUES (2, 'bob', 12);");

    let result = h.run_one("DELETE FROM people WHERE age < 18;");
    assert_eq!(result.affected_rows, 1);

    let result = h.run_one("SELECT * FROM people;");
    assert_eq!(result.rows.len(), 1);
}

#[test]
fn inner_join_matches_across_tables() {
    let mut h = Harness::new();
    h.catalog
        .create_table(
            "authors",
            vec![Column::new("id", SqlType::Int), Column::new("name", SqlType::Varchar(32))],
        )
        .unwrap();
    h.catalog
        .create_table(
            "books",
            vec![
                Column::new("id", SqlType::Int),
                Column::new("author_id", SqlType::Int),
                Column::new("title", SqlType::Varchar(32)),
            ],
        )
        .unwrap();
    h.run_one("INSERT INTO authors VALUES (1, 'ada');");
    h.run_one("INSERT INTO books VALUES (1, 1, 'notes');");
    h.run_one("INSERT INTO books VALUES (2, 99, 'orphan');");

    let result = h.run_one(
        "SELECT title FROM books JOIN authors ON books.author_id = authors.id;",
    );
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].values, vec![Value::Text("notes".into())]);
}

#[test]
fn left_join_fills_unmatched_right_side_with_null() {
    let mut h = Harness::new();
    h.catalog
        .create_table(
            "authors",
            vec![Column::new("id", SqlType::Int), Column::new("name", SqlType::Varchar(32))],
        )
        .unwrap();
    h.catalog
        .create_table(
            "books",
            vec![
                Column::new("id", SqlType::Int),
                Column::new("author_id", SqlType::Int),
            ],
        )
        .unwrap();
    h.run_one("INSERT INTO books VALUES (1, 99);");

    let result = h.run_one(
        "SELECT * FROM books LEFT JOIN authors ON books.author_id = authors.id;",
    );
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].values[2], Value::Null);
    assert_eq!(result.rows[0].values[3], Value::Null);
}

#[test]
fn count_star_and_sum_aggregate_a_table_into_one_row() {
    let mut h = Harness::new();
    create_people(&mut h);
    h.run_one("INSERT INTO people VALUES (1, 'alice', 30);");
    h.run_one("INSERT INTO people VALUES (2, 'bob', 12);");

    let result = h.run_one("SELECT COUNT(*), SUM(age) FROM people;");
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].values, vec![Value::Int(2), Value::Int(42)]);
    assert_eq!(result.columns, vec!["COUNT(*)".to_string(), "SUM(age)".to_string()]);
}

#[test]
fn drop_table_removes_it_from_the_catalog() {
    let mut h = Harness::new();
    create_people(&mut h);

    let result = h.run_one("DROP TABLE people;");
    assert!(result.success);
    assert!(!h.catalog.has_table("people"));
}

#[test]
fn rollback_undoes_a_create_table_but_not_prior_inserts() {
    let mut h = Harness::new();
    create_people(&mut h);
    h.run_one("INSERT INTO people VALUES (1, 'alice', 30);");

    h.run_one("BEGIN;");
    h.run_one("CREATE TABLE scratch (id INT);");
    let result = h.run_one("ROLLBACK;");
    assert!(result.success);
    assert!(!h.catalog.has_table("scratch"));
    assert!(h.catalog.has_table("people"));
}

#[test]
fn select_star_yields_bare_column_names() {
    let mut h = Harness::new();
    create_people(&mut h);
    h.run_one("INSERT INTO people VALUES (1, 'alice', 30);");

    let result = h.run_one("SELECT * FROM people;");
    assert_eq!(result.columns, vec!["id", "name", "age"]);
}

#[test]
fn joined_star_keeps_bare_names_and_right_side_overwrites_left() {
    let mut h = Harness::new();
    h.catalog
        .create_table(
            "authors",
            vec![Column::new("id", SqlType::Int), Column::new("name", SqlType::Varchar(32))],
        )
        .unwrap();
    h.catalog
        .create_table(
            "books",
            vec![Column::new("id", SqlType::Int), Column::new("title", SqlType::Varchar(32))],
        )
        .unwrap();
    h.run_one("INSERT INTO authors VALUES (1, 'ada');");
    h.run_one("INSERT INTO books VALUES (2, 'notes');");

    let result = h.run_one("SELECT * FROM books JOIN authors ON books.title = books.title;");
    assert_eq!(result.columns, vec!["id", "title", "name"]);
    // books.id (2) collides with authors.id (1); the right-hand value wins.
    assert_eq!(result.rows[0].values[0], Value::Int(1));
}

#[test]
fn select_query_reports_zero_affected_rows() {
    let mut h = Harness::new();
    create_people(&mut h);
    h.run_one("INSERT INTO people VALUES (1, 'alice', 30);");
    h.run_one("INSERT INTO people VALUES (2, 'bob', 12);");

    let result = h.run_one("SELECT * FROM people;");
    assert_eq!(result.affected_rows, 0);
    assert_eq!(result.rows.len(), 2);
}

#[test]
fn unknown_table_fails_without_surfacing_a_rust_error() {
    let mut h = Harness::new();
    let result = h.run_one("SELECT * FROM ghosts;");
    assert!(!result.success);
    assert!(!result.message.is_empty());
}
