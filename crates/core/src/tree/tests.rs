use super::*;
use crate::record::FlatRecord;

fn rec(name: &str, parent: Option<&str>) -> FlatRecord {
    let record = FlatRecord::named(name);
    match parent {
        Some(parent) => record.with_parent(parent),
        None => record,
    }
}

#[test]
fn nests_children_in_flat_order() {
    let list = vec![
        rec("Work", None),
        rec("Docs", Some("Work")),
        rec("Home", None),
        rec("Mail", Some("Work")),
        rec("Specs", Some("Docs")),
    ];
    let built = build_tree(&list);
    assert!(built.is_clean());
    assert_eq!(built.root.name(), ROOT_NAME);
    assert_eq!(built.root.child_names(), vec!["Work", "Home"]);
    let work = &built.root.children[0];
    assert_eq!(work.child_names(), vec!["Docs", "Mail"]);
    assert_eq!(work.children[0].child_names(), vec!["Specs"]);
}

#[test]
fn forward_parent_references_resolve() {
    let list = vec![rec("Docs", Some("Work")), rec("Work", None)];
    let built = build_tree(&list);
    assert!(built.is_clean());
    assert_eq!(built.root.child_names(), vec!["Work"]);
    assert_eq!(built.root.children[0].child_names(), vec!["Docs"]);
}

#[test]
fn dangling_parent_attaches_to_root() {
    let list = vec![rec("A", Some("missing"))];
    let built = build_tree(&list);
    assert_eq!(built.root.child_names(), vec!["A"]);
    assert_eq!(
        built.diagnostics,
        vec![TreeDiagnostic::DanglingParent {
            name: "A".to_string(),
            parent: "missing".to_string(),
        }]
    );
    assert_eq!(built.resolved_parent(0), Some(None));
}

#[test]
fn two_cycle_is_cut_at_earliest_member() {
    let list = vec![rec("A", Some("B")), rec("B", Some("A")), rec("C", None)];
    let built = build_tree(&list);
    assert_eq!(built.root.child_names(), vec!["A", "C"]);
    assert_eq!(built.root.children[0].child_names(), vec!["B"]);
    assert_eq!(
        built.diagnostics,
        vec![TreeDiagnostic::CycleBroken {
            name: "A".to_string(),
            parent: "B".to_string(),
        }]
    );
}

#[test]
fn self_parent_is_recovered() {
    let list = vec![rec("Loop", Some("Loop"))];
    let built = build_tree(&list);
    assert_eq!(built.root.child_names(), vec!["Loop"]);
    assert!(!built.root.children[0].has_children());
}

#[test]
fn descendants_of_a_cycle_keep_their_parent() {
    // X hangs below the A <-> B cycle and is listed first.
    let list = vec![rec("X", Some("A")), rec("A", Some("B")), rec("B", Some("A"))];
    let built = build_tree(&list);
    assert_eq!(built.root.child_names(), vec!["A"]);
    let a = &built.root.children[0];
    assert_eq!(a.child_names(), vec!["X", "B"]);
    assert_eq!(built.root.descendant_count(), 3);
}

#[test]
fn duplicate_names_keep_every_record() {
    let list = vec![rec("A", None), rec("A", None), rec("B", Some("A"))];
    let built = build_tree(&list);
    assert_eq!(built.root.child_names(), vec!["A", "A"]);
    assert_eq!(built.root.children[0].child_names(), vec!["B"]);
    assert!(matches!(
        built.diagnostics.as_slice(),
        [TreeDiagnostic::DuplicateName { position: 1, .. }]
    ));
}

#[test]
fn deep_chain_does_not_recurse() {
    let mut list = vec![rec("n0", None)];
    for i in 1..20_000 {
        list.push(rec(&format!("n{i}"), Some(&format!("n{}", i - 1))));
    }
    let built = build_tree(&list);
    assert!(built.is_clean());
    assert_eq!(built.root.descendant_count(), 20_000);
    drop(built);
}

#[test]
fn sibling_positions_follow_resolved_parents() {
    let list = vec![
        rec("Work", None),
        rec("Docs", Some("Work")),
        rec("Home", None),
        rec("Mail", Some("Work")),
        rec("Orphan", Some("gone")),
    ];
    let built = build_tree(&list);
    assert_eq!(built.sibling_positions(1), vec![1, 3]);
    assert_eq!(built.sibling_positions(0), vec![0, 2, 4]);
    assert!(built.sibling_positions(99).is_empty());
}

#[test]
fn find_and_walk_cover_the_whole_tree() {
    let list = vec![rec("Work", None), rec("Docs", Some("Work"))];
    let built = build_tree(&list);
    let depths: Vec<(usize, &str)> = built
        .root
        .walk()
        .into_iter()
        .map(|(depth, node)| (depth, node.name()))
        .collect();
    assert_eq!(depths, vec![(0, "Work"), (1, "Docs")]);
    assert!(built.root.find("Docs").is_some());
    assert!(built.root.find("Root").is_none());
}

#[test]
fn serialized_tree_nests_children_and_omits_empty_lists() {
    let built = build_tree(&[rec("Work", None), rec("Docs", Some("Work"))]);
    let json = serde_json::to_value(&built.root).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "name": "Root",
            "children": [
                {"name": "Work", "children": [{"name": "Docs", "parent": "Work"}]}
            ]
        })
    );
}

#[test]
fn cache_reuses_equal_content_and_sees_field_edits() {
    let mut cache = TreeCache::default();
    let mut list = vec![rec("Work", None), rec("Docs", Some("Work"))];

    let first = cache.build(&list);
    let again = cache.build(&list.clone());
    assert!(std::sync::Arc::ptr_eq(&first, &again));
    assert_eq!(cache.hits(), 1);

    list[1].task_complete = Some(true);
    let edited = cache.build(&list);
    assert!(!std::sync::Arc::ptr_eq(&first, &edited));
    assert_eq!(edited.root.children[0].children[0].record.task_complete, Some(true));
    assert_eq!(cache.misses(), 2);
}

#[test]
fn fingerprint_distinguishes_missing_from_empty_fields() {
    let a = vec![FlatRecord::named("x")];
    let mut b = a.clone();
    b[0].url = Some(String::new());
    assert_ne!(fingerprint(&a), fingerprint(&b));
}
