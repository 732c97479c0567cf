//! Per-column hash indexes.
//!
//! An index maps a cell value to the 0-based insertion-order positions of
//! the rows holding it. Nulls are never indexed. Text keys are case-folded
//! so the index agrees with the executor's case-insensitive text equality;
//! an index hit and a full scan always select the same rows.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::storage::Row;
use crate::value::Value;

/// Hashable projection of a [`Value`]. Floats key by bit pattern (the
/// index only needs equality, not numeric order), text by its lowercase
/// form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IndexKey {
    Int(i64),
    Float(u64),
    Bool(bool),
    Text(String),
}

impl IndexKey {
    /// The key for a cell value, or None for Null (never indexed).
    pub fn for_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Int(i) => Some(Self::Int(*i)),
            Value::Float(f) => Some(Self::Float(f.to_bits())),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Text(s) => Some(Self::Text(s.to_lowercase())),
        }
    }
}

/// One column's hash index: value key to ascending row positions.
///
/// Serialized as a list of `(key, positions)` pairs rather than a JSON map,
/// since JSON object keys would have to be strings and float/int keys must
/// round-trip losslessly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "Vec<(IndexKey, Vec<usize>)>",
    into = "Vec<(IndexKey, Vec<usize>)>"
)]
pub struct Index {
    map: BTreeMap<IndexKey, Vec<usize>>,
}

impl Index {
    /// Build from scratch over the full row vector.
    pub fn build(column: &str, rows: &[Row]) -> Self {
        let mut index = Self::default();
        for (pos, row) in rows.iter().enumerate() {
            if let Some(value) = row.get(column) {
                index.add(value, pos);
            }
        }
        index
    }

    /// Record a newly appended row.
    pub fn add(&mut self, value: &Value, pos: usize) {
        if let Some(key) = IndexKey::for_value(value) {
            self.map.entry(key).or_default().push(pos);
        }
    }

    fn remove(&mut self, value: &Value, pos: usize) {
        if let Some(key) = IndexKey::for_value(value) {
            if let Some(positions) = self.map.get_mut(&key) {
                positions.retain(|p| *p != pos);
                if positions.is_empty() {
                    self.map.remove(&key);
                }
            }
        }
    }

    /// Apply an in-place row update by diffing old against new value.
    pub fn update(&mut self, old: &Value, new: &Value, pos: usize) {
        if IndexKey::for_value(old) == IndexKey::for_value(new) {
            return;
        }
        self.remove(old, pos);
        self.add(new, pos);
    }

    /// Row positions holding the given value. Empty when the value is Null
    /// or absent.
    pub fn lookup(&self, value: &Value) -> &[usize] {
        IndexKey::for_value(value)
            .and_then(|key| self.map.get(&key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate `(key, positions)` entries, for invariant checks in tests.
    pub fn entries(&self) -> impl Iterator<Item = (&IndexKey, &[usize])> {
        self.map.iter().map(|(k, v)| (k, v.as_slice()))
    }
}

impl From<Vec<(IndexKey, Vec<usize>)>> for Index {
    fn from(pairs: Vec<(IndexKey, Vec<usize>)>) -> Self {
        Self {
            map: pairs.into_iter().collect(),
        }
    }
}

impl From<Index> for Vec<(IndexKey, Vec<usize>)> {
    fn from(index: Index) -> Self {
        index.map.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_build_skips_nulls_and_groups_positions() {
        let rows = vec![
            row(&[("email", Value::Text("a@x".into()))]),
            row(&[("email", Value::Null)]),
            row(&[("email", Value::Text("A@X".into()))]),
        ];
        let index = Index::build("email", &rows);
        assert_eq!(index.len(), 1);
        assert_eq!(index.lookup(&Value::Text("a@X".into())), &[0, 2]);
    }

    #[test]
    fn test_add_appends_in_insertion_order() {
        let mut index = Index::default();
        index.add(&Value::Int(5), 0);
        index.add(&Value::Int(5), 3);
        index.add(&Value::Null, 4);
        assert_eq!(index.lookup(&Value::Int(5)), &[0, 3]);
        assert_eq!(index.lookup(&Value::Null), &[] as &[usize]);
    }

    #[test]
    fn test_update_diffs_old_against_new() {
        let mut index = Index::default();
        index.add(&Value::Int(1), 0);
        index.add(&Value::Int(2), 1);

        index.update(&Value::Int(1), &Value::Int(9), 0);
        assert_eq!(index.lookup(&Value::Int(1)), &[] as &[usize]);
        assert_eq!(index.lookup(&Value::Int(9)), &[0]);

        // Updating to Null drops the position entirely.
        index.update(&Value::Int(2), &Value::Null, 1);
        assert_eq!(index.lookup(&Value::Int(2)), &[] as &[usize]);
    }

    #[test]
    fn test_update_with_same_key_is_a_no_op() {
        let mut index = Index::default();
        index.add(&Value::Text("Ada".into()), 0);
        // Case change folds to the same key; position must survive.
        index.update(&Value::Text("Ada".into()), &Value::Text("ADA".into()), 0);
        assert_eq!(index.lookup(&Value::Text("ada".into())), &[0]);
    }

    #[test]
    fn test_float_keys_by_bit_pattern() {
        let mut index = Index::default();
        index.add(&Value::Float(2.5), 0);
        assert_eq!(index.lookup(&Value::Float(2.5)), &[0]);
        assert_eq!(index.lookup(&Value::Float(2.0)), &[] as &[usize]);
        // Int and Float never share a key.
        assert_eq!(index.lookup(&Value::Int(2)), &[] as &[usize]);
    }

    #[test]
    fn test_serde_round_trip() {
        let mut index = Index::default();
        index.add(&Value::Float(1.5), 0);
        index.add(&Value::Text("Ada".into()), 1);
        index.add(&Value::Int(3), 2);
        let json = serde_json::to_string(&index).unwrap();
        let back: Index = serde_json::from_str(&json).unwrap();
        assert_eq!(index, back);
    }
}
