use super::*;
use parser::parse;
use pretty_assertions::assert_eq;

fn errors_for(sql: &str, catalog: &Catalog) -> Vec<SemanticError> {
    let program = parse(sql).unwrap();
    analyze(&program, catalog)
}

fn people_catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog
        .create_table(
            "people",
            vec![
                Column::new("id", SqlType::Int),
                Column::new("name", SqlType::Varchar(32)),
                Column::new("age", SqlType::Int),
            ],
        )
        .unwrap();
    catalog
}

#[test]
fn valid_select_has_no_errors() {
    let errors = errors_for("SELECT name FROM people WHERE age = 30;", &people_catalog());
    assert_eq!(errors, Vec::new());
}

#[test]
fn select_of_unknown_column_reports_column_not_exists() {
    let errors = errors_for("SELECT bogus FROM people;", &people_catalog());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::ColumnNotExists);
}

#[test]
fn select_star_never_raises_column_not_exists() {
    let errors = errors_for("SELECT * FROM people;", &people_catalog());
    assert_eq!(errors, Vec::new());
}

#[test]
fn select_from_unknown_table_reports_table_not_exists() {
    let errors = errors_for("SELECT * FROM ghosts;", &Catalog::new());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::TableNotExists);
}

#[test]
fn where_clause_comparing_text_to_int_reports_type_mismatch() {
    let errors = errors_for("SELECT * FROM people WHERE name = 1;", &people_catalog());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::TypeMismatch);
}

#[test]
fn where_clause_comparing_to_null_is_not_a_mismatch() {
    let errors = errors_for("SELECT * FROM people WHERE name = NULL;", &people_catalog());
    assert_eq!(errors, Vec::new());
}

#[test]
fn create_table_duplicating_existing_name_reports_table_already_exists() {
    let errors = errors_for("CREATE TABLE people (id INT);", &people_catalog());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::TableAlreadyExists);
}

#[test]
fn create_table_with_repeated_column_reports_duplicate_column() {
    let errors = errors_for(
        "CREATE TABLE t (id INT, id INT);",
        &Catalog::new(),
    );
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::DuplicateColumn);
}

#[test]
fn create_table_with_zero_size_varchar_reports_invalid_size() {
    let errors = errors_for("CREATE TABLE t (name VARCHAR(0));", &Catalog::new());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::InvalidSize);
}

#[test]
fn create_table_registers_for_later_statements_in_the_same_program() {
    let errors = errors_for(
        "CREATE TABLE t (id INT); INSERT INTO t VALUES (1);",
        &Catalog::new(),
    );
    assert_eq!(errors, Vec::new());
}

#[test]
fn drop_table_of_unknown_table_reports_table_not_exists() {
    let errors = errors_for("DROP TABLE ghosts;", &Catalog::new());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::TableNotExists);
}

#[test]
fn insert_with_too_few_values_reports_value_count_mismatch() {
    let errors = errors_for("INSERT INTO people VALUES (1, 'alice');", &people_catalog());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::ValueCountMismatch);
}

#[test]
fn insert_with_wrong_typed_value_reports_type_mismatch() {
    let errors = errors_for(
        "INSERT INTO people (id, name, age) VALUES (1, 2, 30);",
        &people_catalog(),
    );
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::TypeMismatch);
}

#[test]
fn insert_into_unknown_column_reports_column_not_exists() {
    let errors = errors_for(
        "INSERT INTO people (id, bogus) VALUES (1, 2);",
        &people_catalog(),
    );
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::ColumnNotExists);
}

#[test]
fn update_of_unknown_column_reports_column_not_exists() {
    let errors = errors_for("UPDATE people SET bogus = 1;", &people_catalog());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::ColumnNotExists);
}

#[test]
fn join_condition_referencing_unknown_column_reports_column_not_exists() {
    let mut catalog = people_catalog();
    catalog
        .create_table("pets", vec![Column::new("owner_id", SqlType::Int)])
        .unwrap();
    let errors = errors_for(
        "SELECT * FROM people JOIN pets ON people.id = pets.bogus;",
        &catalog,
    );
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, ErrorKind::ColumnNotExists);
}

#[test]
fn analyze_collects_every_error_instead_of_stopping_at_the_first() {
    let errors = errors_for("SELECT a, b FROM ghosts;", &Catalog::new());
    assert_eq!(errors.len(), 3);
}
