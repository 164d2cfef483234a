//! Merge-with-override combinator

use std::collections::BTreeMap;

/// Merge `overlay` into `base`, overlay keys winning on conflict.
///
/// Both inputs are left untouched; the result is a fresh map. Ordered maps
/// keep the key order stable so regeneration from unchanged input is
/// byte-identical.
pub fn merge_overriding<V: Clone>(
    base: &BTreeMap<String, V>,
    overlay: &BTreeMap<String, V>,
) -> BTreeMap<String, V> {
    let mut merged = base.clone();
    for (key, value) in overlay {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
