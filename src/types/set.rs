// src/types/set.rs

//! Set 类型：SADD / SREM / SISMEMBER / SCARD / SMEMBERS

use std::collections::{BTreeSet, HashMap};

use crate::engine::store::{Entry, Store, touched};
use crate::error::{StoreError, StoreResult};
use crate::eviction::EvictionPolicy;
use crate::types::{Value, ValueType};

/// 有序保存，SMEMBERS 输出稳定
pub type SetValue = BTreeSet<String>;

fn touched_set<'a>(
    entries: &'a mut HashMap<String, Entry>,
    eviction: &mut EvictionPolicy,
    key: &str,
) -> StoreResult<Option<&'a mut SetValue>> {
    match touched(entries, eviction, key) {
        Some(Entry { value: Value::Set(set), .. }) => Ok(Some(set)),
        Some(_) => Err(StoreError::wrong_type(ValueType::Set)),
        None => Ok(None),
    }
}

impl Store {
    /// SADD：返回新增成员数
    pub fn sadd(&mut self, key: &str, members: &[String]) -> StoreResult<usize> {
        if !self.contains_key(key) {
            self.insert_entry(key.to_string(), Value::Set(SetValue::new()));
        }
        let set = touched_set(&mut self.entries, &mut self.eviction, key)?
            .ok_or(StoreError::NoSuchKey)?;

        let mut added = 0;
        for member in members {
            if set.insert(member.clone()) {
                self.memory.set_member_insert(member);
                added += 1;
            }
        }
        self.evict_to_max_memory();
        Ok(added)
    }

    /// SREM：返回移除的成员数
    pub fn srem(&mut self, key: &str, members: &[String]) -> StoreResult<usize> {
        let Some(set) = touched_set(&mut self.entries, &mut self.eviction, key)? else {
            return Ok(0);
        };
        let mut removed = 0;
        for member in members {
            if set.remove(member) {
                self.memory.set_member_delete(member);
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn sismember(&mut self, key: &str, member: &str) -> StoreResult<bool> {
        let set = touched_set(&mut self.entries, &mut self.eviction, key)?;
        Ok(set.is_some_and(|s| s.contains(member)))
    }

    pub fn scard(&mut self, key: &str) -> StoreResult<usize> {
        let set = touched_set(&mut self.entries, &mut self.eviction, key)?;
        Ok(set.map_or(0, |s| s.len()))
    }

    pub fn smembers(&mut self, key: &str) -> StoreResult<Vec<String>> {
        let set = touched_set(&mut self.entries, &mut self.eviction, key)?;
        Ok(set.map(|s| s.iter().cloned().collect()).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::set_member_size;

    fn strings(vs: &[&str]) -> Vec<String> {
        vs.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_set_basic() {
        let mut store = Store::default();
        assert_eq!(store.sadd("s", &strings(&["b", "a", "b"])), Ok(2));
        assert_eq!(store.sadd("s", &strings(&["a", "c"])), Ok(1));
        assert_eq!(store.scard("s"), Ok(3));
        assert_eq!(store.smembers("s"), Ok(strings(&["a", "b", "c"])));
        assert_eq!(store.sismember("s", "a"), Ok(true));
        assert_eq!(store.sismember("s", "z"), Ok(false));
        assert_eq!(store.sismember("missing", "a"), Ok(false));

        let before = store.memory_used();
        assert_eq!(store.srem("s", &strings(&["a", "zz"])), Ok(1));
        assert_eq!(store.memory_used(), before - set_member_size("a"));
        assert_eq!(store.srem("missing", &strings(&["a"])), Ok(0));
    }

    #[test]
    fn set_wrong_type() {
        let mut store = Store::default();
        store.rpush("l", &strings(&["x"])).unwrap();
        assert_eq!(
            store.sadd("l", &strings(&["x"])),
            Err(StoreError::wrong_type(ValueType::Set))
        );
    }
}
