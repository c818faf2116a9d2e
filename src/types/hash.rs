// src/types/hash.rs

//! Hash 类型：HSET / HGET / HDEL / HLEN / HGETALL
//!
//! 字段按字典序保存，HGETALL 的输出顺序因此是确定的。

use std::collections::{BTreeMap, HashMap};

use crate::engine::store::{Entry, Store, touched};
use crate::error::{StoreError, StoreResult};
use crate::eviction::EvictionPolicy;
use crate::types::{Value, ValueType};

pub type HashValue = BTreeMap<String, String>;

fn touched_hash<'a>(
    entries: &'a mut HashMap<String, Entry>,
    eviction: &mut EvictionPolicy,
    key: &str,
) -> StoreResult<Option<&'a mut HashValue>> {
    match touched(entries, eviction, key) {
        Some(Entry { value: Value::Hash(hash), .. }) => Ok(Some(hash)),
        Some(_) => Err(StoreError::wrong_type(ValueType::Hash)),
        None => Ok(None),
    }
}

impl Store {
    /// HSET key field value
    ///
    /// # 返回
    /// - `true`  – 新字段
    /// - `false` – 覆盖了已有字段
    pub fn hset(&mut self, key: &str, field: &str, value: &str) -> StoreResult<bool> {
        if !self.contains_key(key) {
            self.insert_entry(key.to_string(), Value::Hash(HashValue::new()));
        }
        let hash = touched_hash(&mut self.entries, &mut self.eviction, key)?
            .ok_or(StoreError::NoSuchKey)?;

        let old = hash.insert(field.to_string(), value.to_string());
        if let Some(old) = &old {
            self.memory.hash_field_delete(field, old);
        }
        self.memory.hash_field_insert(field, value);

        self.evict_to_max_memory();
        Ok(old.is_none())
    }

    pub fn hget(&mut self, key: &str, field: &str) -> StoreResult<Option<String>> {
        let hash = touched_hash(&mut self.entries, &mut self.eviction, key)?;
        Ok(hash.and_then(|h| h.get(field).cloned()))
    }

    /// HDEL：返回删除的字段数
    pub fn hdel(&mut self, key: &str, fields: &[String]) -> StoreResult<usize> {
        let Some(hash) = touched_hash(&mut self.entries, &mut self.eviction, key)? else {
            return Ok(0);
        };
        let mut removed = 0;
        for field in fields {
            if let Some(old) = hash.remove(field) {
                self.memory.hash_field_delete(field, &old);
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn hlen(&mut self, key: &str) -> StoreResult<usize> {
        let hash = touched_hash(&mut self.entries, &mut self.eviction, key)?;
        Ok(hash.map_or(0, |h| h.len()))
    }

    /// HGETALL：field, value, field, value …
    pub fn hgetall(&mut self, key: &str) -> StoreResult<Vec<String>> {
        let Some(hash) = touched_hash(&mut self.entries, &mut self.eviction, key)? else {
            return Ok(Vec::new());
        };
        Ok(hash
            .iter()
            .flat_map(|(f, v)| [f.clone(), v.clone()])
            .collect())
    }
}
