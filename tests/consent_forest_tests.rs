//! Consent forest construction and matching tests

mod common;

use common::{chain_forest, consent, init_tracing};
use consent_scopes::error::ConsentForestError;
use consent_scopes::scopes::ScopeNode;
use consent_scopes::{ConsentForest, ConsentId, ConsentList, ScopeCache};
use rstest::rstest;

#[rstest]
#[case("A")]
#[case("A[B]")]
#[case("A[B[C]]")]
#[case("A[*B[*C]]")]
#[case("A A[B]")]
fn test_chain_satisfies(#[case] required: &str) {
    let forest = chain_forest();
    assert!(forest.meets_scope_requirements(required).unwrap());
}

#[rstest]
#[case("B")]
#[case("C")]
#[case("A[C]")]
#[case("A[B[C[D]]]")]
#[case("A B")]
fn test_chain_does_not_satisfy(#[case] required: &str) {
    let forest = chain_forest();
    assert!(!forest.meets_scope_requirements(required).unwrap());
}

#[test]
fn test_chain_structure() {
    let forest = chain_forest();
    assert_eq!(forest.len(), 1);

    let tree = &forest.trees()[0];
    assert_eq!(tree.root().client, "client0");
    assert_eq!(tree.max_depth(), 3);
    assert_eq!(
        tree.get_node(ConsentId(3)).map(|c| c.client.as_str()),
        Some("client2")
    );
}

#[test]
fn test_sibling_dependencies() {
    init_tracing();
    let forest = ConsentForest::build(vec![
        consent("client0", "A", &[1]),
        consent("client1", "B", &[1, 2]),
        consent("client1", "C", &[1, 3]),
    ])
    .unwrap();

    assert!(forest.meets_scope_requirements("A[B]").unwrap());
    assert!(forest.meets_scope_requirements("A[C]").unwrap());
    assert!(forest.meets_scope_requirements("A[B C]").unwrap());
    assert!(!forest.meets_scope_requirements("A[B[C]]").unwrap());
}

#[test]
fn test_disjoint_trees_are_not_stitched() {
    init_tracing();
    let forest = ConsentForest::build(vec![
        consent("client0", "A", &[1]),
        consent("client1", "B", &[1, 2]),
        consent("client0", "B", &[10]),
        consent("client2", "C", &[10, 11]),
    ])
    .unwrap();

    assert_eq!(forest.len(), 2);
    assert!(forest.meets_scope_requirements("A[B]").unwrap());
    assert!(forest.meets_scope_requirements("B[C]").unwrap());
    assert!(forest.meets_scope_requirements("A[B] B[C]").unwrap());
    assert!(!forest.meets_scope_requirements("A[B[C]]").unwrap());
}

#[test]
fn test_second_candidate_tree_can_satisfy() {
    let forest = ConsentForest::build(vec![
        consent("client0", "A", &[1]),
        consent("client0", "A", &[5]),
        consent("client1", "B", &[5, 6]),
    ])
    .unwrap();

    assert!(forest.meets_scope_requirements("A[B]").unwrap());
}

#[test]
fn test_missing_parent_is_reported() {
    init_tracing();
    let err = ConsentForest::build(vec![
        consent("client0", "A", &[1]),
        consent("client2", "C", &[1, 2, 3]),
    ])
    .unwrap_err();

    assert_eq!(
        err,
        ConsentForestError::MissingParent {
            consent: ConsentId(3),
            parent: ConsentId(2),
        }
    );
    assert!(err.to_string().contains("parent 2"));
}

#[test]
fn test_missing_root_is_reported() {
    let err = ConsentForest::build(vec![consent("client1", "B", &[1, 2])]).unwrap_err();
    assert!(matches!(
        err,
        ConsentForestError::MissingParent { parent, .. } if parent == ConsentId(1)
    ));
}

#[test]
fn test_invalid_paths_are_rejected() {
    let empty = ConsentForest::build(vec![consent_scopes::ConsentRecord::new(
        1,
        "c",
        "A",
        Vec::<u64>::new(),
    )]);
    assert!(matches!(
        empty,
        Err(ConsentForestError::InvalidDependencyPath { .. })
    ));

    let duplicate = ConsentForest::build(vec![consent("c", "A", &[1]), consent("c", "A", &[1])]);
    assert_eq!(
        duplicate.unwrap_err(),
        ConsentForestError::DuplicateConsent(ConsentId(1))
    );
}

#[test]
fn test_requirement_input_forms() {
    let forest = chain_forest();
    let node: ScopeNode = "A[B]".parse().unwrap();
    let list = vec![node.clone(), "A[B[C]]".parse().unwrap()];

    assert!(forest.meets_scope_requirements(String::from("A[B]")).unwrap());
    assert!(forest.meets_scope_requirements(node.clone()).unwrap());
    assert!(forest.meets_scope_requirements(&node).unwrap());
    assert!(forest.meets_scope_requirements(list.as_slice()).unwrap());
    assert!(forest.meets_scope_requirements(list).unwrap());
    assert!(forest.meets_scope_requirements(Vec::<ScopeNode>::new()).unwrap());
    assert!(forest.meets_scope_requirements("A[]").is_err());
}

#[test]
fn test_shared_cache() {
    let forest = chain_forest();
    let cache = ScopeCache::new();

    for _ in 0..3 {
        assert!(forest.meets_scope_requirements_cached(&cache, "A[B[C]]").unwrap());
    }
    assert!(forest.meets_scope_requirements_cached(&cache, "A[B[").is_err());

    let stats = cache.stats();
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 2);
}

#[test]
fn test_build_from_service_json() {
    let body = r#"{
        "consents": [
            {"id": 7, "client": "app", "scope_name": "transfer", "dependency_path": [7],
             "status": "approved", "allows_refresh": true},
            {"id": 8, "client": "transfer-api", "scope_name": "data_access",
             "dependency_path": [7, 8], "atomically_revocable": true}
        ]
    }"#;

    let list = ConsentList::from_json(body).unwrap();
    let forest = ConsentForest::build(list).unwrap();

    assert!(forest.meets_scope_requirements("transfer[*data_access]").unwrap());
    assert_eq!(
        forest.get_node(ConsentId(8)).map(|c| c.atomically_revocable),
        Some(true)
    );
}

#[test]
fn test_forest_display() {
    let forest = ConsentForest::build(vec![
        consent("client0", "B", &[10]),
        consent("client2", "C", &[10, 11]),
        consent("client0", "A", &[1]),
        consent("client1", "B", &[1, 2]),
        consent("client1", "D", &[1, 4]),
        consent("client2", "C", &[1, 2, 3]),
    ])
    .unwrap();

    insta::assert_snapshot!(forest.to_string(), @r"
    A (id=1, client=client0)
      B (id=2, client=client1)
        C (id=3, client=client2)
      D (id=4, client=client1)
    B (id=10, client=client0)
      C (id=11, client=client2)
    ");
}

#[test]
fn test_very_deep_requirement_is_checked_without_overflow() {
    init_tracing();
    let forest = chain_forest();

    let depth = 50_000;
    let mut required = String::from("A[B[C[");
    for level in 0..depth {
        required.push_str(&format!("s{level}["));
    }
    required.push_str("leaf");
    required.push_str(&"]".repeat(depth + 3));

    assert!(!forest.meets_scope_requirements(required.as_str()).unwrap());
    assert!(forest.meets_scope_requirements("A[B[C]]").unwrap());
}
