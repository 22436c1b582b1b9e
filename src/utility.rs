//! Utility functions useful throughout the codebase.

use std::collections::BTreeMap;

use serde::{ser::SerializeSeq, Serialize, Serializer};

/// Serializes an ordered map as a sequence of `[key, value]` pairs.
///
/// JSON object keys must be strings, so maps keyed by structured types
/// (machine keys, node identifiers) cannot use serde's default map
/// representation. The pair-sequence form keeps the ordering of the
/// underlying [`BTreeMap`] and round-trips through any JSON consumer.
pub fn ordered_pairs<K, V, S>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
where
    K: Serialize,
    V: Serialize,
    S: Serializer,
{
    let mut seq = serializer.serialize_seq(Some(map.len()))?;
    for entry in map {
        seq.serialize_element(&entry)?;
    }
    seq.end()
}
