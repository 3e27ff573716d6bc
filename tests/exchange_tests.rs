mod common;

use splitsies_core::{
    exchange::{export_json, import_json, parse_import},
    ledger::Allocation,
    ValidationError,
};

use common::{set_allocation, store_with};

const PAYLOAD: &str = r#"[
    {
        "name": "Alex",
        "use_share": true,
        "by_amount": "0",
        "by_share": 2,
        "items": [
            {"description": "Cabin", "value": 300},
            {"description": "Firewood", "value": 25.5}
        ]
    },
    {
        "name": "Blair",
        "use_share": false,
        "by_amount": "40.50",
        "items": [{"description": "Groceries", "value": 80}]
    }
]"#;

#[test]
fn import_replaces_the_ledger() {
    let mut store = store_with(&[("Old", "Stale", 1.0)]);
    let count = import_json(&mut store, PAYLOAD).unwrap();
    assert_eq!(count, 2);
    assert!(store.find_by_name("Old").is_none());

    let alex = store.find_by_name("alex").unwrap();
    assert_eq!(alex.allocation, Allocation::share(2));
    assert_eq!(alex.total(), 325.5);
    let blair = store.find_by_name("Blair").unwrap();
    assert_eq!(blair.allocation, Allocation::fixed(40.5));
}

#[test]
fn export_then_import_preserves_people_and_items() {
    let mut store = store_with(&[("Alex", "Cabin", 300.0), ("Blair", "Groceries", 80.0)]);
    set_allocation(&mut store, "Blair", Allocation::fixed(40.5));
    let json = export_json(&store).unwrap();
    assert!(json.contains("\"by_amount\": \"40.50\""));

    let imported = parse_import(&json).unwrap();
    assert_eq!(imported.len(), 2);
    for (original, copy) in store.contributors().iter().zip(&imported) {
        assert_eq!(original.name, copy.name);
        assert_eq!(original.allocation, copy.allocation);
        let items: Vec<_> = original.items.iter().map(|i| (&i.description, i.amount)).collect();
        let copied: Vec<_> = copy.items.iter().map(|i| (&i.description, i.amount)).collect();
        assert_eq!(items, copied);
    }
}

#[test]
fn a_bad_record_aborts_the_whole_import() {
    let mut store = store_with(&[("Old", "Stale", 1.0)]);
    let payload = r#"[
        {"name": "Alex", "use_share": true, "by_share": 1, "items": [{"description": "Cabin", "value": 300}]},
        {"name": "Blair", "use_share": true, "by_share": 11, "items": [{"description": "Food", "value": 10}]}
    ]"#;
    let err = import_json(&mut store, payload).unwrap_err();
    assert!(
        matches!(err, ValidationError::MalformedRecord { contributor: 1, item: None, .. }),
        "unexpected error: {err:?}"
    );
    assert_eq!(store.len(), 1);
    assert!(store.find_by_name("Old").is_some());
}

#[test]
fn cross_record_rules_apply_to_imports() {
    let mut store = store_with(&[("Old", "Stale", 1.0)]);
    let duplicate = r#"[
        {"name": "Alex", "use_share": true, "by_share": 1, "items": [{"description": "Cabin", "value": 30}]},
        {"name": "alex", "use_share": true, "by_share": 1, "items": [{"description": "Food", "value": 10}]}
    ]"#;
    let err = import_json(&mut store, duplicate).unwrap_err();
    assert!(
        matches!(err, ValidationError::MalformedRecord { contributor: 1, item: None, .. }),
        "unexpected error: {err:?}"
    );

    let all_fixed = r#"[
        {"name": "Alex", "use_share": false, "by_amount": "10", "items": [{"description": "Cabin", "value": 30}]}
    ]"#;
    assert_eq!(
        import_json(&mut store, all_fixed).unwrap_err(),
        ValidationError::NoShareContributor
    );

    let over_fixed = r#"[
        {"name": "Alex", "use_share": false, "by_amount": "50", "items": [{"description": "Cabin", "value": 30}]},
        {"name": "Blair", "use_share": true, "by_share": 1, "items": [{"description": "Food", "value": 10}]}
    ]"#;
    assert!(matches!(
        import_json(&mut store, over_fixed).unwrap_err(),
        ValidationError::FixedAmountExceedsTotal { .. }
    ));
    assert!(store.find_by_name("Old").is_some());
}
