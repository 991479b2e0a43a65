//! Tests for the parameter micro-grammar.

use super::*;

#[test]
fn test_fields_select_and_relations() {
    let f = parse_fields("a,b,rel.c,rel.d");
    assert_eq!(f.select, vec!["a", "b"]);
    assert_eq!(f.relations.len(), 1);
    assert_eq!(f.relations["rel"], vec!["c", "d"]);
}

#[test]
fn test_fields_token_order_does_not_matter() {
    let f = parse_fields("rel.d,b,rel.c,a");
    let mut select = f.select.clone();
    select.sort();
    assert_eq!(select, vec!["a", "b"]);
    let mut rel = f.relations["rel"].clone();
    rel.sort();
    assert_eq!(rel, vec!["c", "d"]);
}

#[test]
fn test_fields_empty_input() {
    let f = parse_fields("");
    assert!(f.is_empty());
    assert!(f.select.is_empty());
    assert!(f.relations.is_empty());
}

#[test]
fn test_fields_trims_and_skips_empty_tokens() {
    let f = parse_fields(" id , ,name,");
    assert_eq!(f.select, vec!["id", "name"]);
}

#[test]
fn test_fields_duplicates_kept_once() {
    let f = parse_fields("id,id,orders.total,orders.total");
    assert_eq!(f.select, vec!["id"]);
    assert_eq!(f.relations["orders"], vec!["total"]);
}

#[test]
fn test_fields_relation_without_subfield() {
    let f = parse_fields("orders.");
    assert!(f.select.is_empty());
    assert!(f.relations["orders"].is_empty());
}

#[test]
fn test_fields_splits_on_first_dot() {
    let f = parse_fields("orders.items.sku");
    assert_eq!(f.relations["orders"], vec!["items.sku"]);
}

#[test]
fn test_fields_visible_keys() {
    let f = parse_fields("id,name,orders.total,owner.email");
    assert_eq!(f.visible_keys(), vec!["id", "name", "orders", "owner"]);
}

#[test]
fn test_filter_key_single_part_is_eq() {
    assert_eq!(
        FilterKey::parse("status").unwrap(),
        FilterKey::Base {
            column: "status".to_string(),
            op: CompareOp::Eq
        }
    );
}

#[test]
fn test_filter_key_column_op() {
    for op in CompareOp::ALL {
        let key = format!("name_{}", op.acronym());
        assert_eq!(
            FilterKey::parse(&key).unwrap(),
            FilterKey::Base {
                column: "name".to_string(),
                op
            }
        );
    }
}

#[test]
fn test_filter_key_relation_column_implicit_eq() {
    assert_eq!(
        FilterKey::parse("orders_status").unwrap(),
        FilterKey::Relation {
            relation: "orders".to_string(),
            column: "status".to_string(),
            op: CompareOp::Eq
        }
    );
}

#[test]
fn test_filter_key_relation_column_op() {
    assert_eq!(
        FilterKey::parse("orders_total_gt").unwrap(),
        FilterKey::Relation {
            relation: "orders".to_string(),
            column: "total".to_string(),
            op: CompareOp::Gt
        }
    );
}

#[test]
fn test_filter_key_operator_wins_over_relation_name() {
    // `ne` could also be a relation column, but the operator reading wins.
    let key = FilterKey::parse("orders_ne").unwrap();
    assert_eq!(key.op(), CompareOp::Ne);
    assert!(matches!(key, FilterKey::Base { ref column, .. } if column == "orders"));
}

#[test]
fn test_filter_key_snake_case_column_reads_as_relation() {
    // Underscores are segment separators, so `created_at_gt` is relation `created`.
    let key = FilterKey::parse("created_at_gt").unwrap();
    assert_eq!(
        key,
        FilterKey::Relation {
            relation: "created".to_string(),
            column: "at".to_string(),
            op: CompareOp::Gt
        }
    );
}

#[test]
fn test_filter_key_invalid_forms() {
    assert!(FilterKey::parse("orders_total_gte").is_err());
    assert!(FilterKey::parse("a_b_c_gt").is_err());
    assert!(FilterKey::parse("_gt").is_err());
    assert!(FilterKey::parse("name_").is_err());
    assert!(FilterKey::parse("").is_err());
}

#[test]
fn test_filter_set_buckets() {
    let mut set = FilterSet::default();
    set.insert(&FilterKey::parse("name_gt").unwrap(), "m");
    set.insert(&FilterKey::parse("status").unwrap(), "active");
    set.insert(&FilterKey::parse("orders_total_lt").unwrap(), "100");

    assert_eq!(set.select.gt["name"], "m");
    assert_eq!(set.select.eq["status"], "active");
    assert!(set.select.ne.is_empty());

    let orders = set.relation("orders").unwrap();
    assert_eq!(orders.lt["total"], "100");
    assert!(orders.eq.is_empty());
    assert!(orders.ne.is_empty());
    assert!(orders.gt.is_empty());
}

#[test]
fn test_filter_buckets_serialize_all_operators() {
    let mut set = FilterSet::default();
    set.insert(&FilterKey::parse("orders_status").unwrap(), "paid");
    let json = serde_json::to_value(&set).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "select": {"eq": {}, "ne": {}, "gt": {}, "lt": {}},
            "relations": {
                "orders": {"eq": {"status": "paid"}, "ne": {}, "gt": {}, "lt": {}}
            }
        })
    );
}

#[test]
fn test_filter_buckets_conditions_order() {
    let mut buckets = FilterBuckets::default();
    buckets.insert(CompareOp::Lt, "age", "65");
    buckets.insert(CompareOp::Eq, "status", "active");
    buckets.insert(CompareOp::Gt, "age", "18");

    let conditions: Vec<_> = buckets.conditions().collect();
    assert_eq!(
        conditions,
        vec![
            (CompareOp::Eq, "status", "active"),
            (CompareOp::Gt, "age", "18"),
            (CompareOp::Lt, "age", "65"),
        ]
    );
    assert!(!buckets.is_empty());
    assert!(FilterBuckets::default().is_empty());
}

#[test]
fn test_compare_op_acronyms() {
    assert_eq!(CompareOp::from_acronym("eq"), Some(CompareOp::Eq));
    assert_eq!(CompareOp::from_acronym("ne"), Some(CompareOp::Ne));
    assert_eq!(CompareOp::from_acronym("gt"), Some(CompareOp::Gt));
    assert_eq!(CompareOp::from_acronym("lt"), Some(CompareOp::Lt));
    assert_eq!(CompareOp::from_acronym("gte"), None);
    assert_eq!(CompareOp::from_acronym("EQ"), None);
}

#[test]
fn test_compare_op_display() {
    assert_eq!(format!("{}", CompareOp::Eq), "=");
    assert_eq!(format!("{}", CompareOp::Ne), "<>");
    assert_eq!(format!("{}", CompareOp::Gt), ">");
    assert_eq!(format!("{}", CompareOp::Lt), "<");
}

#[test]
fn test_snake_case() {
    assert_eq!(to_snake_case("fooBar"), "foo_bar");
    assert_eq!(to_snake_case("FooBar"), "foo_bar");
    assert_eq!(to_snake_case("already_snake"), "already_snake");
    assert_eq!(to_snake_case("user-id"), "user_id");
    assert_eq!(
        to_snake_case("suppressResponseHttpStatusCode"),
        "suppress_response_http_status_code"
    );
    assert_eq!(to_snake_case("name_gt"), "name_gt");
}
