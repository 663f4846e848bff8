use std::collections::BTreeMap;

use labkit_sweep::{axes_nd_shape, axes_product, dict_product, kw_nd_shape, take_dicts, KwSpec};
use proptest::prelude::*;
use serde_json::{json, Value};

#[test]
fn scalar_is_a_singleton_dimension() {
    let spec = KwSpec::new()
        .many("a", vec![json!(1), json!(2)])
        .one("b", json!(3));
    let combos = dict_product(&spec);
    assert_eq!(
        combos,
        vec![
            BTreeMap::from([("a".to_string(), json!(1)), ("b".to_string(), json!(3))]),
            BTreeMap::from([("a".to_string(), json!(2)), ("b".to_string(), json!(3))]),
        ]
    );
}

#[test]
fn combination_order_follows_key_order() {
    let spec = KwSpec::new()
        .many("x", vec![json!(1), json!(2)])
        .many("y", vec![json!("a"), json!("b")]);
    let combos = dict_product(&spec);
    let ys: Vec<&Value> = combos.iter().map(|c| &c["y"]).collect();
    // Last key varies fastest.
    assert_eq!(ys, vec![&json!("a"), &json!("b"), &json!("a"), &json!("b")]);
    assert_eq!(kw_nd_shape(&spec), vec![2, 2]);
}

#[test]
fn empty_spec_expands_to_one_empty_mapping() {
    let combos = dict_product(&KwSpec::new());
    assert_eq!(combos, vec![BTreeMap::new()]);
    assert!(kw_nd_shape(&KwSpec::new()).is_empty());
}

#[test]
fn list_valued_scalar_stays_scalar() {
    let spec = KwSpec::new().one("weights", json!([1, 2, 3]));
    let combos = dict_product(&spec);
    assert_eq!(combos.len(), 1);
    assert_eq!(combos[0]["weights"], json!([1, 2, 3]));
}

#[test]
fn take_dicts_requires_every_filter_key_to_match() {
    let dicts = vec![
        BTreeMap::from([("a".to_string(), json!(1)), ("b".to_string(), json!(9))]),
        BTreeMap::from([("a".to_string(), json!(2)), ("b".to_string(), json!(9))]),
    ];
    let filter = BTreeMap::from([("a".to_string(), json!(1))]);
    let kept = take_dicts(&dicts, &filter);
    assert_eq!(kept, vec![&dicts[0]]);
}

#[test]
fn take_dicts_excludes_partial_key_presence() {
    let dicts = vec![BTreeMap::from([("a".to_string(), json!(1))])];
    let filter = BTreeMap::from([("a".to_string(), json!(1)), ("b".to_string(), json!(2))]);
    assert!(take_dicts(&dicts, &filter).is_empty());
}

#[test]
fn axes_shape_lists_individual_lengths() {
    let axes = vec![vec![json!(1), json!(2), json!(3)], vec![json!(10), json!(20)]];
    assert_eq!(axes_nd_shape(&axes), vec![3, 2]);
    assert_eq!(axes_product(&axes).len(), 6);
}

proptest! {
    #[test]
    fn product_count_is_product_of_cardinalities(cards in prop::collection::vec(1usize..4, 0..4)) {
        let mut spec = KwSpec::new();
        for (idx, card) in cards.iter().enumerate() {
            let values = (0..*card).map(|v| json!(v)).collect();
            spec = spec.many(format!("k{idx}"), values);
        }
        let expected: usize = cards.iter().product();
        prop_assert_eq!(dict_product(&spec).len(), expected);
    }

    #[test]
    fn axes_product_count_matches_shape(lens in prop::collection::vec(1usize..4, 0..4)) {
        let axes: Vec<Vec<Value>> = lens
            .iter()
            .map(|len| (0..*len).map(|v| json!(v)).collect())
            .collect();
        let expected: usize = lens.iter().product();
        prop_assert_eq!(axes_product(&axes).len(), expected);
    }
}
