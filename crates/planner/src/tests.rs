use super::*;
use parser::parse;
use pretty_assertions::assert_eq;

fn plan_one(sql: &str) -> PlanNode {
    let program = parse(sql).unwrap();
    generate(&program).into_iter().next().unwrap()
}

#[test]
fn create_table_plans_directly() {
    let node = plan_one("CREATE TABLE t(id INT);");
    assert!(matches!(node, PlanNode::CreateTable { table, .. } if table == "t"));
}

#[test]
fn select_star_wraps_scan_in_project() {
    let node = plan_one("SELECT * FROM t;");
    match node {
        PlanNode::Project { input, items } => {
            assert_eq!(items, vec![SelectItem::Star]);
            assert!(matches!(*input, PlanNode::SeqScan { table } if table == "t"));
        }
        other => panic!("expected Project, got {other:?}"),
    }
}

#[test]
fn select_with_where_inserts_filter_under_project() {
    let node = plan_one("SELECT id FROM t WHERE id = 1;");
    let PlanNode::Project { input, .. } = node else {
        panic!("expected Project");
    };
    assert!(matches!(*input, PlanNode::Filter { .. }));
}

#[test]
fn select_with_order_by_inserts_sort_above_scan() {
    let node = plan_one("SELECT id FROM t ORDER BY id DESC;");
    let PlanNode::Project { input, .. } = node else {
        panic!("expected Project");
    };
    match *input {
        PlanNode::Sort { items, .. } => {
            assert_eq!(items.len(), 1);
            assert!(items[0].desc);
        }
        other => panic!("expected Sort, got {other:?}"),
    }
}

#[test]
fn join_wraps_scan_with_a_new_right_side_scan() {
    let node = plan_one("SELECT * FROM a JOIN b ON a.id = b.id;");
    let PlanNode::Project { input, .. } = node else {
        panic!("expected Project");
    };
    match *input {
        PlanNode::Join {
            left,
            right,
            join_type,
            ..
        } => {
            assert_eq!(join_type, JoinKind::Inner);
            assert!(matches!(*left, PlanNode::SeqScan { table } if table == "a"));
            assert!(matches!(*right, PlanNode::SeqScan { table } if table == "b"));
        }
        other => panic!("expected Join, got {other:?}"),
    }
}

#[test]
fn insert_carries_a_single_literal_row() {
    let node = plan_one("INSERT INTO t VALUES (1);");
    match node {
        PlanNode::Insert { table, rows, .. } => {
            assert_eq!(table, "t");
            assert_eq!(rows.len(), 1);
        }
        other => panic!("expected Insert, got {other:?}"),
    }
}

#[test]
fn transaction_statements_plan_to_leaf_nodes() {
    let program = parse("BEGIN; COMMIT; ROLLBACK;").unwrap();
    let nodes = generate(&program);
    assert_eq!(
        nodes,
        vec![PlanNode::Begin, PlanNode::Commit, PlanNode::Rollback]
    );
}

#[test]
fn delete_and_update_carry_optional_conditions() {
    let node = plan_one("DELETE FROM t;");
    assert!(matches!(node, PlanNode::Delete { condition: None, .. }));

    let node = plan_one("UPDATE t SET x = 1 WHERE id = 2;");
    assert!(matches!(node, PlanNode::Update { condition: Some(_), .. }));
}
