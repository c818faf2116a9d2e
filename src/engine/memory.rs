// src/engine/memory.rs

//! # Memory tracker
//!
//! A deterministic cost model, not a measurement: every key, value node,
//! container header and element is charged a fixed number of bytes derived from
//! a handful of constants. The same input always costs the same, so eviction is
//! reproducible and test expectations can be written down as literals.
//!
//! | piece                    | cost                                           |
//! |--------------------------|------------------------------------------------|
//! | primary-mapping key      | `CHAR × |key| + REF`                           |
//! | value node               | `REF × 3 + CHAR × |type name|` (+ `CHAR × |s|` for strings) |
//! | container header         | `REF × 3 + NUMBER`                             |
//! | list node / set member   | `REF × 3 + CHAR × |val|`                       |
//! | hash field               | `REF × 3 + CHAR × (|field| + |value|)`         |
//! | sorted-set member        | `SKIPLIST_NODE + CHAR × |member|`              |
//! | recency node             | `REF × 3 + CHAR × |key|`                       |
//!
//! `|s|` is the number of Unicode scalar values in `s`.
//!
//! Changing any constant changes every downstream expectation.

use crate::types::Value;

/// One internal pointer / slot.
pub const REFERENCE_SIZE_BYTES: usize = 8;
/// One text unit.
pub const STRING_ONE_CHAR_BYTES: usize = 2;
/// prev / next / payload
pub const NODE_NUM_REFS: usize = 3;
/// Length or counter field.
pub const NUMBER_BYTES: usize = 8;
pub const SKIPLIST_NODE_SIZE: usize = 48;

/// Length in the unit the cost model charges for.
pub fn text_len(s: &str) -> usize {
    s.chars().count()
}

fn text_cost(s: &str) -> usize {
    STRING_ONE_CHAR_BYTES * text_len(s)
}

fn node_refs() -> usize {
    REFERENCE_SIZE_BYTES * NODE_NUM_REFS
}

pub fn main_key_size(key: &str) -> usize {
    text_cost(key) + REFERENCE_SIZE_BYTES
}

pub fn value_node_size(value: &Value) -> usize {
    let type_bytes = text_cost(value.value_type().name());
    let val_bytes = match value {
        Value::Str(s) => text_cost(s),
        _ => 0,
    };
    node_refs() + type_bytes + val_bytes
}

pub fn container_size() -> usize {
    node_refs() + NUMBER_BYTES
}

pub fn list_node_size(val: &str) -> usize {
    node_refs() + text_cost(val)
}

pub fn hash_field_size(field: &str, value: &str) -> usize {
    node_refs() + text_cost(field) + text_cost(value)
}

pub fn set_member_size(member: &str) -> usize {
    node_refs() + text_cost(member)
}

pub fn zset_member_size(member: &str) -> usize {
    SKIPLIST_NODE_SIZE + text_cost(member)
}

pub fn recency_node_size(key: &str) -> usize {
    node_refs() + text_cost(key)
}

/// Full accounted size of one entry in the primary mapping, elements included.
pub fn store_item_size(key: &str, value: &Value) -> usize {
    let base = main_key_size(key) + value_node_size(value);
    let body = match value {
        Value::Str(_) => 0,
        Value::List(list) => container_size() + list.iter().map(list_node_size).sum::<usize>(),
        Value::Hash(hash) => {
            container_size()
                + hash
                    .iter()
                    .map(|(f, v)| hash_field_size(f, v))
                    .sum::<usize>()
        }
        Value::Set(set) => container_size() + set.iter().map(|m| set_member_size(m)).sum::<usize>(),
        Value::ZSet(zset) => {
            container_size() + zset.members().map(zset_member_size).sum::<usize>()
        }
    };
    base + body
}

/// Running total against a fixed ceiling.
#[derive(Debug, Clone)]
pub struct MemoryTracker {
    max_memory: usize,
    memory_used: usize,
}

impl MemoryTracker {
    pub fn new(max_memory: usize) -> Self {
        MemoryTracker {
            max_memory,
            memory_used: 0,
        }
    }

    pub fn memory_used(&self) -> usize {
        self.memory_used
    }

    pub fn max_memory(&self) -> usize {
        self.max_memory
    }

    /// Strictly greater than the ceiling.
    pub fn max_memory_exceeded(&self) -> bool {
        self.memory_used > self.max_memory
    }

    pub fn store_item_create(&mut self, key: &str, value: &Value) {
        self.allocate(store_item_size(key, value));
    }

    pub fn delete_store_item(&mut self, key: &str, value: &Value) {
        self.release(store_item_size(key, value));
    }

    /// In-place string rewrite: only the character delta is charged.
    pub fn string_update(&mut self, old: &str, new: &str) {
        self.release(text_cost(old));
        self.allocate(text_cost(new));
    }

    pub fn string_append(&mut self, suffix: &str) {
        self.allocate(text_cost(suffix));
    }

    pub fn list_item_insert(&mut self, val: &str) {
        self.allocate(list_node_size(val));
    }

    pub fn list_item_delete(&mut self, val: &str) {
        self.release(list_node_size(val));
    }

    pub fn list_item_update(&mut self, old: &str, new: &str) {
        self.string_update(old, new);
    }

    pub fn hash_field_insert(&mut self, field: &str, value: &str) {
        self.allocate(hash_field_size(field, value));
    }

    pub fn hash_field_delete(&mut self, field: &str, value: &str) {
        self.release(hash_field_size(field, value));
    }

    pub fn set_member_insert(&mut self, member: &str) {
        self.allocate(set_member_size(member));
    }

    pub fn set_member_delete(&mut self, member: &str) {
        self.release(set_member_size(member));
    }

    pub fn zset_member_insert(&mut self, member: &str) {
        self.allocate(zset_member_size(member));
    }

    pub fn zset_member_delete(&mut self, member: &str) {
        self.release(zset_member_size(member));
    }

    pub fn add_recency_item(&mut self, key: &str) {
        self.allocate(recency_node_size(key));
    }

    pub fn delete_recency_item(&mut self, key: &str) {
        self.release(recency_node_size(key));
    }

    fn allocate(&mut self, bytes: usize) {
        self.memory_used = self.memory_used.saturating_add(bytes);
    }

    fn release(&mut self, bytes: usize) {
        self.memory_used = self.memory_used.saturating_sub(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ListValue;

    #[test]
    fn string_item_size_matches_formula() {
        let key = "a-key";
        let val = "a-value";
        // hash entry
        let mut expected = key.len() * STRING_ONE_CHAR_BYTES + REFERENCE_SIZE_BYTES;
        // value node
        expected += STRING_ONE_CHAR_BYTES * "string".len();
        expected += STRING_ONE_CHAR_BYTES * val.len();
        expected += REFERENCE_SIZE_BYTES * 3;

        assert_eq!(store_item_size(key, &Value::Str(val.into())), expected);
        assert_eq!(expected, 68);
    }

    #[test]
    fn list_item_size_counts_every_node() {
        let mut list = ListValue::new();
        list.push_back("one".into());
        list.push_back("three".into());
        let key = "L";

        let expected = main_key_size(key)
            + (24 + 2 * "list".len())
            + (24 + 8)
            + (24 + 2 * 3)
            + (24 + 2 * 5);
        assert_eq!(store_item_size(key, &Value::List(list)), expected);
    }

    #[test]
    fn list_item_insert_and_delete() {
        let mut tracker = MemoryTracker::new(100);
        tracker.list_item_insert("my value");
        assert_eq!(tracker.memory_used(), 40);

        tracker.allocate(40);
        tracker.list_item_delete("my value");
        assert_eq!(tracker.memory_used(), 40);
    }

    #[test]
    fn string_update_charges_only_the_delta() {
        let mut tracker = MemoryTracker::new(1000);
        tracker.store_item_create("key", &Value::Str("value".into()));
        let before = tracker.memory_used();

        tracker.string_update("value", "new-value-that-is-longer");
        let delta = STRING_ONE_CHAR_BYTES * ("new-value-that-is-longer".len() - "value".len());
        assert_eq!(tracker.memory_used(), before + delta);

        tracker.string_update("new-value-that-is-longer", "value");
        assert_eq!(tracker.memory_used(), before);
    }

    #[test]
    fn max_memory_exceeded_is_strict() {
        let mut tracker = MemoryTracker::new(10);
        tracker.allocate(20);
        assert!(tracker.max_memory_exceeded());

        let mut tracker = MemoryTracker::new(30);
        tracker.allocate(20);
        assert!(!tracker.max_memory_exceeded());

        tracker.allocate(10);
        assert!(!tracker.max_memory_exceeded(), "equal to the ceiling is within budget");
    }

    #[test]
    fn recency_node_uses_key_length() {
        assert_eq!(recency_node_size("key0"), 24 + 8);
        assert_eq!(container_size(), 32);
    }

    #[test]
    fn text_len_counts_scalar_values() {
        assert_eq!(text_len("héllo"), 5);
        assert_eq!(main_key_size("ké"), 2 * 2 + 8);
    }
}
