// src/engine/store.rs

//! # Store
//!
//! 主映射（key → Entry）、内存计数和淘汰策略三者只在这里一起修改。
//! 每个修改型操作结束前都会调用 `evict_to_max_memory`，所以调用方看到的
//! 状态总满足 `memory_used <= max_memory`，或者 keyspace 已经为空。
//!
//! 各类型的命令分别在 `types::{string, list, hash, set, zset}` 里以
//! `impl Store` 的形式实现；这里只有 keyspace 级别的命令。

use std::collections::HashMap;

use tracing::debug;

use super::memory::MemoryTracker;
use crate::error::{StoreError, StoreResult};
use crate::eviction::{EvictionPolicy, PolicyKind, RecencyHandle};
use crate::types::{Value, ValueType};

/// 默认内存上限：100 MiB
pub const DEFAULT_MAX_MEMORY: usize = 104_857_600;

/// keyspace 中的一条记录
#[derive(Debug, Clone)]
pub struct Entry {
    pub(crate) value: Value,
    pub(crate) handle: RecencyHandle,
}

#[derive(Debug, Clone)]
pub struct Store {
    pub(crate) entries: HashMap<String, Entry>,
    pub(crate) memory: MemoryTracker,
    pub(crate) eviction: EvictionPolicy,
}

impl Default for Store {
    fn default() -> Self {
        Store::new(DEFAULT_MAX_MEMORY, PolicyKind::Lru)
    }
}

/// 取出 entry 并移到最近访问位置。
/// 拆成独立函数是为了让调用方在持有 entry 的同时还能借用 `memory`。
pub(crate) fn touched<'a>(
    entries: &'a mut HashMap<String, Entry>,
    eviction: &mut EvictionPolicy,
    key: &str,
) -> Option<&'a mut Entry> {
    let entry = entries.get_mut(key)?;
    eviction.touch(entry.handle);
    Some(entry)
}

impl Store {
    pub fn new(max_memory: usize, policy: PolicyKind) -> Self {
        Store {
            entries: HashMap::new(),
            memory: MemoryTracker::new(max_memory),
            eviction: EvictionPolicy::new(policy),
        }
    }

    pub fn memory_used(&self) -> usize {
        self.memory.memory_used()
    }

    pub fn max_memory(&self) -> usize {
        self.memory.max_memory()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// 读取值，不影响访问顺序
    pub fn peek(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).map(|e| &e.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), &e.value))
    }

    /// 最久未访问 → 最近访问
    pub fn recency_keys(&self) -> Vec<String> {
        self.eviction.recency_keys()
    }

    // ---------- keyspace ----------

    /// DEL：返回实际删除的数量
    pub fn del(&mut self, keys: &[String]) -> usize {
        let mut deleted = 0;
        for key in keys {
            if self.remove_entry(key).is_some() {
                deleted += 1;
            }
        }
        self.evict_to_max_memory();
        deleted
    }

    /// EXISTS：不改变访问顺序；重复的 key 重复计数
    pub fn exists(&self, keys: &[String]) -> usize {
        keys.iter().filter(|k| self.entries.contains_key(k.as_str())).count()
    }

    /// TOUCH：返回存在的 key 数量
    pub fn touch(&mut self, keys: &[String]) -> usize {
        keys.iter()
            .filter(|k| touched(&mut self.entries, &mut self.eviction, k).is_some())
            .count()
    }

    /// TYPE
    pub fn type_of(&self, key: &str) -> Option<ValueType> {
        self.peek(key).map(Value::value_type)
    }

    /// RENAME：源 key 不存在时报错；目标存在时先删除
    pub fn rename(&mut self, from: &str, to: &str) -> StoreResult<()> {
        if !self.entries.contains_key(from) {
            return Err(StoreError::NoSuchKey);
        }
        if from == to {
            touched(&mut self.entries, &mut self.eviction, from);
            return Ok(());
        }
        let value = self.remove_entry(from).ok_or(StoreError::NoSuchKey)?;
        self.remove_entry(to);
        self.insert_entry(to.to_string(), value);
        self.evict_to_max_memory();
        Ok(())
    }

    /// RENAMENX：目标已存在时返回 false，什么都不改
    pub fn rename_nx(&mut self, from: &str, to: &str) -> StoreResult<bool> {
        if !self.entries.contains_key(from) {
            return Err(StoreError::NoSuchKey);
        }
        if self.entries.contains_key(to) {
            return Ok(false);
        }
        self.rename(from, to)?;
        Ok(true)
    }

    // ---------- internal ----------

    /// 新建 entry：按完整大小计费并登记到淘汰策略。调用方保证 key 不存在。
    pub(crate) fn insert_entry(&mut self, key: String, value: Value) {
        self.memory.store_item_create(&key, &value);
        let handle = self.eviction.add(&key, &mut self.memory);
        self.entries.insert(key, Entry { value, handle });
    }

    /// 删除 entry 并释放它的内存与访问顺序节点
    pub(crate) fn remove_entry(&mut self, key: &str) -> Option<Value> {
        let entry = self.entries.remove(key)?;
        self.memory.delete_store_item(key, &entry.value);
        self.eviction.remove(entry.handle, &mut self.memory);
        Some(entry.value)
    }

    pub(crate) fn evict_to_max_memory(&mut self) {
        let evicted = self
            .eviction
            .check_and_evict_to_max_memory(&mut self.entries, &mut self.memory);
        if !evicted.is_empty() {
            debug!(
                count = evicted.len(),
                memory_used = self.memory.memory_used(),
                "eviction pass finished"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::{recency_node_size, store_item_size};

    fn keys(ks: &[&str]) -> Vec<String> {
        ks.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn create_then_delete_returns_to_zero() {
        let mut store = Store::default();
        store.set_string("a", "1");
        store.set_string("b", "22");
        assert!(store.memory_used() > 0);

        let before = store.memory_used();
        let a_size = store_item_size("a", &Value::Str("1".into())) + recency_node_size("a");
        let b_size = store_item_size("b", &Value::Str("22".into())) + recency_node_size("b");
        assert_eq!(before, a_size + b_size);

        assert_eq!(store.del(&keys(&["a", "b", "missing"])), 2);
        assert_eq!(store.memory_used(), 0);
        assert!(store.is_empty());
        assert!(store.recency_keys().is_empty());
    }

    #[test]
    fn touch_and_exists() {
        let mut store = Store::default();
        store.set_string("a", "1");
        store.set_string("b", "2");
        store.set_string("c", "3");

        assert_eq!(store.exists(&keys(&["a", "a", "nope"])), 2);
        assert_eq!(store.recency_keys(), keys(&["a", "b", "c"]));

        assert_eq!(store.touch(&keys(&["a", "nope"])), 1);
        assert_eq!(store.recency_keys(), keys(&["b", "c", "a"]));
    }

    #[test]
    fn rename_moves_value_and_accounting() {
        let mut store = Store::default();
        store.set_string("src", "value");
        store.set_string("dst", "old");

        store.rename("src", "dst").unwrap();
        assert_eq!(store.peek("dst"), Some(&Value::Str("value".into())));
        assert!(!store.contains_key("src"));
        assert_eq!(
            store.memory_used(),
            store_item_size("dst", &Value::Str("value".into())) + recency_node_size("dst")
        );
        assert_eq!(store.rename("missing", "x"), Err(StoreError::NoSuchKey));
    }

    #[test]
    fn rename_nx_leaves_existing_target() {
        let mut store = Store::default();
        store.set_string("a", "1");
        store.set_string("b", "2");

        assert_eq!(store.rename_nx("a", "b"), Ok(false));
        assert_eq!(store.peek("a"), Some(&Value::Str("1".into())));
        assert_eq!(store.rename_nx("a", "c"), Ok(true));
        assert_eq!(store.type_of("c"), Some(ValueType::String));
        assert_eq!(store.type_of("a"), None);
        assert_eq!(store.rename_nx("zzz", "c"), Err(StoreError::NoSuchKey));
    }
}
