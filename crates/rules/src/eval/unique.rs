//! Structural fingerprints for `[unique]` arrays
//!
//! [`fingerprint`] is a cheap non-cryptographic digest: structurally equal
//! values always share a fingerprint, different values may collide.
//! [`UniqueTracker`] buckets elements by fingerprint and confirms with
//! [`structurally_equal`], so a collision never reports a false duplicate.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};

use serde_json::Value;
use smallvec::SmallVec;

use crate::value::{number_as_f64, structurally_equal};

/// Computes a structural fingerprint of a value.
///
/// Numbers hash by their `f64` value so `2` and `2.0` agree; object keys are
/// hashed in sorted order.
pub fn fingerprint(value: &Value) -> u64 {
    let mut hasher = DefaultHasher::new();
    write_value(value, &mut hasher);
    hasher.finish()
}

fn write_value<H: Hasher>(value: &Value, state: &mut H) {
    match value {
        Value::Null => state.write_u8(0),
        Value::Bool(b) => {
            state.write_u8(1);
            b.hash(state);
        }
        Value::Number(n) => {
            state.write_u8(2);
            let f = number_as_f64(n).unwrap_or(f64::NAN);
            // +0.0 and -0.0 compare equal
            let f = if f == 0.0 { 0.0 } else { f };
            f.to_bits().hash(state);
        }
        Value::String(s) => {
            state.write_u8(3);
            s.hash(state);
        }
        Value::Array(items) => {
            state.write_u8(4);
            state.write_usize(items.len());
            for item in items {
                write_value(item, state);
            }
        }
        Value::Object(map) => {
            state.write_u8(5);
            state.write_usize(map.len());
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
            for (key, item) in entries {
                key.hash(state);
                write_value(item, state);
            }
        }
    }
}

/// Tracks elements seen so far while walking an array.
#[derive(Debug, Default)]
pub struct UniqueTracker<'a> {
    seen: HashMap<u64, SmallVec<[&'a Value; 1]>>,
}

impl<'a> UniqueTracker<'a> {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `value`; returns `false` if an equal value was seen before.
    pub fn insert(&mut self, value: &'a Value) -> bool {
        let bucket = self.seen.entry(fingerprint(value)).or_default();
        if bucket.iter().any(|seen| structurally_equal(seen, value)) {
            return false;
        }
        bucket.push(value);
        true
    }
}
