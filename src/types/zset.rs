// src/types/zset.rs

//! Sorted Set 类型：ZADD / ZSCORE / ZREM / ZCARD / ZRANGE
//!
//! 成员 → 分数放在 HashMap 里做 O(1) 查分；`(score, member)` 放在 BTreeSet
//! 里维持排序。两者总是一起修改。

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use crate::engine::store::{Entry, Store, touched};
use crate::error::{StoreError, StoreResult};
use crate::eviction::EvictionPolicy;
use crate::types::list::normalize_range;
use crate::types::{Value, ValueType};

/// 按 `f64::total_cmp` 排序的分数
#[derive(Debug, Clone, Copy)]
struct Score(f64);

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortedSet {
    scores: HashMap<String, f64>,
    ordered: BTreeSet<(Score, String)>,
}

impl SortedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Insert or re-score. Returns `true` for a new member.
    pub fn insert(&mut self, member: &str, score: f64) -> bool {
        match self.scores.insert(member.to_string(), score) {
            Some(old) => {
                self.ordered.remove(&(Score(old), member.to_string()));
                self.ordered.insert((Score(score), member.to_string()));
                false
            }
            None => {
                self.ordered.insert((Score(score), member.to_string()));
                true
            }
        }
    }

    pub fn score(&self, member: &str) -> Option<f64> {
        self.scores.get(member).copied()
    }

    pub fn remove(&mut self, member: &str) -> bool {
        match self.scores.remove(member) {
            Some(old) => {
                self.ordered.remove(&(Score(old), member.to_string()));
                true
            }
            None => false,
        }
    }

    /// Members in `(score, member)` order.
    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(|(_, m)| m.as_str())
    }
}

fn touched_zset<'a>(
    entries: &'a mut HashMap<String, Entry>,
    eviction: &mut EvictionPolicy,
    key: &str,
) -> StoreResult<Option<&'a mut SortedSet>> {
    match touched(entries, eviction, key) {
        Some(Entry { value: Value::ZSet(zset), .. }) => Ok(Some(zset)),
        Some(_) => Err(StoreError::wrong_type(ValueType::ZSet)),
        None => Ok(None),
    }
}

impl Store {
    /// ZADD key score member：新成员返回 true
    pub fn zadd(&mut self, key: &str, score: f64, member: &str) -> StoreResult<bool> {
        if score.is_nan() {
            return Err(StoreError::NotAFloat);
        }
        if !self.contains_key(key) {
            self.insert_entry(key.to_string(), Value::ZSet(SortedSet::new()));
        }
        let zset = touched_zset(&mut self.entries, &mut self.eviction, key)?
            .ok_or(StoreError::NoSuchKey)?;

        let added = zset.insert(member, score);
        if added {
            self.memory.zset_member_insert(member);
        }
        self.evict_to_max_memory();
        Ok(added)
    }

    pub fn zscore(&mut self, key: &str, member: &str) -> StoreResult<Option<f64>> {
        let zset = touched_zset(&mut self.entries, &mut self.eviction, key)?;
        Ok(zset.and_then(|z| z.score(member)))
    }

    pub fn zrem(&mut self, key: &str, members: &[String]) -> StoreResult<usize> {
        let Some(zset) = touched_zset(&mut self.entries, &mut self.eviction, key)? else {
            return Ok(0);
        };
        let mut removed = 0;
        for member in members {
            if zset.remove(member) {
                self.memory.zset_member_delete(member);
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn zcard(&mut self, key: &str) -> StoreResult<usize> {
        let zset = touched_zset(&mut self.entries, &mut self.eviction, key)?;
        Ok(zset.map_or(0, |z| z.len()))
    }

    /// ZRANGE key start stop：按排名的闭区间
    pub fn zrange(&mut self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        let Some(zset) = touched_zset(&mut self.entries, &mut self.eviction, key)? else {
            return Ok(Vec::new());
        };
        let Some((from, to)) = normalize_range(start, stop, zset.len()) else {
            return Ok(Vec::new());
        };
        Ok(zset
            .members()
            .skip(from)
            .take(to - from + 1)
            .map(str::to_string)
            .collect())
    }
}
