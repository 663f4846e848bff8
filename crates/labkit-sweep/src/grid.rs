//! Parameter grid construction and keyword-set expansion.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single keyword dimension.
///
/// A scalar keyword contributes one column; a declared multi-valued keyword
/// contributes one column per value. The distinction is explicit rather than
/// inferred from the value's runtime shape, so a list-valued scalar stays a
/// scalar unless the caller says otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KwRange {
    /// A fixed value, treated as a single-element dimension.
    One(Value),
    /// An explicit multi-valued dimension.
    Many(Vec<Value>),
}

impl KwRange {
    /// Number of columns this dimension contributes.
    pub fn cardinality(&self) -> usize {
        match self {
            KwRange::One(_) => 1,
            KwRange::Many(values) => values.len(),
        }
    }

    fn value_at(&self, idx: usize) -> &Value {
        match self {
            KwRange::One(value) => value,
            KwRange::Many(values) => &values[idx],
        }
    }
}

/// Ordered keyword specification; key order is preserved through expansion.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KwSpec(
    /// Key and range pairs in declaration order.
    pub Vec<(String, KwRange)>,
);

impl KwSpec {
    /// Creates an empty specification.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a scalar keyword.
    pub fn one(mut self, name: impl Into<String>, value: Value) -> Self {
        self.0.push((name.into(), KwRange::One(value)));
        self
    }

    /// Appends a multi-valued keyword dimension.
    pub fn many(mut self, name: impl Into<String>, values: Vec<Value>) -> Self {
        self.0.push((name.into(), KwRange::Many(values)));
        self
    }
}

/// Expands a keyword specification into every combination of its dimensions.
///
/// Combination order is the cartesian product in key order with the last key
/// varying fastest. An empty specification yields one empty mapping.
pub fn dict_product(spec: &KwSpec) -> Vec<BTreeMap<String, Value>> {
    let mut combos: Vec<BTreeMap<String, Value>> = vec![BTreeMap::new()];
    for (name, range) in &spec.0 {
        let mut next = Vec::with_capacity(combos.len() * range.cardinality());
        for combo in &combos {
            for idx in 0..range.cardinality() {
                let mut extended = combo.clone();
                extended.insert(name.clone(), range.value_at(idx).clone());
                next.push(extended);
            }
        }
        combos = next;
    }
    combos
}

/// Per-key cardinalities of a keyword specification, in key order.
pub fn kw_nd_shape(spec: &KwSpec) -> Vec<usize> {
    spec.0.iter().map(|(_, range)| range.cardinality()).collect()
}

/// Cartesian product of the parameter axes, in axis order with the last
/// axis varying fastest. No axes yields one empty tuple.
pub fn axes_product(axes: &[Vec<Value>]) -> Vec<Vec<Value>> {
    let mut tuples: Vec<Vec<Value>> = vec![Vec::new()];
    for axis in axes {
        let mut next = Vec::with_capacity(tuples.len() * axis.len());
        for tuple in &tuples {
            for value in axis {
                let mut extended = tuple.clone();
                extended.push(value.clone());
                next.push(extended);
            }
        }
        tuples = next;
    }
    tuples
}

/// Lengths of the individual parameter axes.
pub fn axes_nd_shape(axes: &[Vec<Value>]) -> Vec<usize> {
    axes.iter().map(Vec::len).collect()
}

/// Keeps the mappings that contain every key of `filter` with an equal value.
///
/// A mapping holding only some of the filter keys is excluded even when
/// those keys match.
pub fn take_dicts<'a>(
    dicts: &'a [BTreeMap<String, Value>],
    filter: &BTreeMap<String, Value>,
) -> Vec<&'a BTreeMap<String, Value>> {
    dicts
        .iter()
        .filter(|d| filter.iter().all(|(key, value)| d.get(key) == Some(value)))
        .collect()
}
