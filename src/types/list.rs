// src/types/list.rs

//! # List Type Support
//!
//! A list value is its own doubly linked sequence (`LinkedArena<String>`), so
//! both ends are O(1) and positional access walks from whichever end is closer.
//!
//! Supported commands:
//! - `LPUSH` / `RPUSH`
//! - `LPOP` / `RPOP`
//! - `LINDEX`, `LLEN`, `LRANGE`
//! - `LREM`
//! - `LINSERT key BEFORE|AFTER pivot value`
//! - `LSET`
//!
//! Popping the last element leaves an empty list under the key.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::engine::store::{Entry, Store, touched};
use crate::error::{StoreError, StoreResult};
use crate::eviction::EvictionPolicy;
use crate::types::linked::{LinkedArena, NodeId};
use crate::types::{Value, ValueType};

/// Which side of the pivot `LINSERT` writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    Before,
    After,
}

impl FromStr for InsertPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("before") {
            Ok(InsertPosition::Before)
        } else if s.eq_ignore_ascii_case("after") {
            Ok(InsertPosition::After)
        } else {
            Err("syntax error".to_string())
        }
    }
}

#[derive(Default, Clone)]
pub struct ListValue {
    nodes: LinkedArena<String>,
}

impl fmt::Debug for ListValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl PartialEq for ListValue {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<S: Into<String>> FromIterator<S> for ListValue {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut list = ListValue::new();
        for v in iter {
            list.push_back(v.into());
        }
        list
    }
}

impl ListValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn push_front(&mut self, val: String) {
        self.nodes.push_front(val);
    }

    pub fn push_back(&mut self, val: String) {
        self.nodes.push_back(val);
    }

    pub fn pop_front(&mut self) -> Option<String> {
        self.nodes.pop_front()
    }

    pub fn pop_back(&mut self) -> Option<String> {
        self.nodes.pop_back()
    }

    /// head → tail
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &str> + ExactSizeIterator + '_ {
        self.nodes.iter().map(String::as_str)
    }

    pub fn values(&self) -> Vec<String> {
        self.iter().map(str::to_string).collect()
    }

    /// Element at `idx`; negative indices count from the tail (`-1` is the last).
    pub fn index(&self, idx: i64) -> Option<&str> {
        let id = self.node_at(idx)?;
        self.nodes.get(id).map(String::as_str)
    }

    /// Overwrite the element at `idx`, returning the previous value.
    pub fn set(&mut self, idx: i64, val: String) -> StoreResult<String> {
        let id = self.node_at(idx).ok_or(StoreError::IndexOutOfRange)?;
        let slot = self.nodes.get_mut(id).ok_or(StoreError::IndexOutOfRange)?;
        Ok(std::mem::replace(slot, val))
    }

    /// Remove elements equal to `val`.
    ///
    /// `count > 0` walks from the head and stops after `count` removals,
    /// `count < 0` walks from the tail and stops after `|count|`,
    /// `count == 0` removes every match.
    pub fn remove_matching(&mut self, count: i64, val: &str) -> usize {
        let limit = match count {
            0 => usize::MAX,
            n => usize::try_from(n.unsigned_abs()).unwrap_or(usize::MAX),
        };
        let from_tail = count < 0;
        let mut cursor = if from_tail {
            self.nodes.tail()
        } else {
            self.nodes.head()
        };

        let mut removed = 0;
        while let Some(id) = cursor {
            if removed == limit {
                break;
            }
            cursor = if from_tail {
                self.nodes.prev(id)
            } else {
                self.nodes.next(id)
            };
            if self.nodes.get(id).is_some_and(|v| v.as_str() == val) {
                self.nodes.remove(id);
                removed += 1;
            }
        }
        removed
    }

    /// Insert next to the first element equal to `pivot`.
    /// Returns the new length, or `None` when the pivot is absent.
    pub fn insert(&mut self, pos: InsertPosition, pivot: &str, val: String) -> Option<usize> {
        let at = self.find(pivot)?;
        match pos {
            InsertPosition::Before => self.nodes.insert_before(at, val)?,
            InsertPosition::After => self.nodes.insert_after(at, val)?,
        };
        Some(self.len())
    }

    fn find(&self, val: &str) -> Option<NodeId> {
        let mut cursor = self.nodes.head();
        while let Some(id) = cursor {
            if self.nodes.get(id).is_some_and(|v| v.as_str() == val) {
                return Some(id);
            }
            cursor = self.nodes.next(id);
        }
        None
    }

    /// Walk from whichever end is closer to `idx`.
    fn node_at(&self, idx: i64) -> Option<NodeId> {
        let len = i64::try_from(self.len()).ok()?;
        let pos = if idx < 0 { len + idx } else { idx };
        if pos < 0 || pos >= len {
            return None;
        }
        let from_tail = len - 1 - pos;
        if pos <= from_tail {
            let mut id = self.nodes.head()?;
            for _ in 0..pos {
                id = self.nodes.next(id)?;
            }
            Some(id)
        } else {
            let mut id = self.nodes.tail()?;
            for _ in 0..from_tail {
                id = self.nodes.prev(id)?;
            }
            Some(id)
        }
    }
}

/// Clamp a `start..=stop` pair (negative = from the end) to `[0, len)`.
/// `None` means the range selects nothing.
pub(crate) fn normalize_range(start: i64, stop: i64, len: usize) -> Option<(usize, usize)> {
    let len = i64::try_from(len).ok()?;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((usize::try_from(start).ok()?, usize::try_from(stop).ok()?))
}

/// 取 list 并刷新访问顺序；类型不符时也已经刷新
fn touched_list<'a>(
    entries: &'a mut HashMap<String, Entry>,
    eviction: &mut EvictionPolicy,
    key: &str,
) -> StoreResult<Option<&'a mut ListValue>> {
    match touched(entries, eviction, key) {
        Some(Entry { value: Value::List(list), .. }) => Ok(Some(list)),
        Some(_) => Err(StoreError::wrong_type(ValueType::List)),
        None => Ok(None),
    }
}

#[derive(Clone, Copy)]
enum End {
    Front,
    Back,
}

impl Store {
    pub fn lpush(&mut self, key: &str, vals: &[String]) -> StoreResult<usize> {
        self.push(key, vals, End::Front)
    }

    pub fn rpush(&mut self, key: &str, vals: &[String]) -> StoreResult<usize> {
        self.push(key, vals, End::Back)
    }

    pub fn lpop(&mut self, key: &str) -> StoreResult<Option<String>> {
        self.pop(key, End::Front)
    }

    pub fn rpop(&mut self, key: &str) -> StoreResult<Option<String>> {
        self.pop(key, End::Back)
    }

    pub fn lindex(&mut self, key: &str, idx: i64) -> StoreResult<Option<String>> {
        let list = touched_list(&mut self.entries, &mut self.eviction, key)?;
        Ok(list.and_then(|l| l.index(idx).map(str::to_string)))
    }

    pub fn llen(&mut self, key: &str) -> StoreResult<usize> {
        let list = touched_list(&mut self.entries, &mut self.eviction, key)?;
        Ok(list.map_or(0, |l| l.len()))
    }

    /// LRANGE：闭区间，支持负下标
    pub fn lrange(&mut self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        let Some(list) = touched_list(&mut self.entries, &mut self.eviction, key)? else {
            return Ok(Vec::new());
        };
        let Some((from, to)) = normalize_range(start, stop, list.len()) else {
            return Ok(Vec::new());
        };
        Ok(list
            .iter()
            .skip(from)
            .take(to - from + 1)
            .map(str::to_string)
            .collect())
    }

    pub fn lrem(&mut self, key: &str, count: i64, val: &str) -> StoreResult<usize> {
        let Some(list) = touched_list(&mut self.entries, &mut self.eviction, key)? else {
            return Ok(0);
        };
        let removed = list.remove_matching(count, val);
        for _ in 0..removed {
            self.memory.list_item_delete(val);
        }
        self.evict_to_max_memory();
        Ok(removed)
    }

    /// LINSERT：key 或 pivot 不存在返回 0，否则返回新长度
    pub fn linsert(
        &mut self,
        key: &str,
        pos: InsertPosition,
        pivot: &str,
        val: &str,
    ) -> StoreResult<usize> {
        let Some(list) = touched_list(&mut self.entries, &mut self.eviction, key)? else {
            return Ok(0);
        };
        let Some(len) = list.insert(pos, pivot, val.to_string()) else {
            return Ok(0);
        };
        self.memory.list_item_insert(val);
        self.evict_to_max_memory();
        Ok(len)
    }

    /// LSET：下标越界或 key 不存在都报错
    pub fn lset(&mut self, key: &str, idx: i64, val: &str) -> StoreResult<()> {
        let list = touched_list(&mut self.entries, &mut self.eviction, key)?
            .ok_or(StoreError::NoSuchKey)?;
        let old = list.set(idx, val.to_string())?;
        self.memory.list_item_update(&old, val);
        self.evict_to_max_memory();
        Ok(())
    }

    /// 整个 list 的内容，不刷新访问顺序
    pub fn list_values(&self, key: &str) -> StoreResult<Vec<String>> {
        match self.peek(key) {
            Some(Value::List(list)) => Ok(list.values()),
            Some(_) => Err(StoreError::wrong_type(ValueType::List)),
            None => Ok(Vec::new()),
        }
    }

    fn push(&mut self, key: &str, vals: &[String], end: End) -> StoreResult<usize> {
        if !self.contains_key(key) {
            self.insert_entry(key.to_string(), Value::List(ListValue::new()));
        }
        let list = touched_list(&mut self.entries, &mut self.eviction, key)?
            .ok_or(StoreError::NoSuchKey)?;
        for val in vals {
            self.memory.list_item_insert(val);
            match end {
                End::Front => list.push_front(val.clone()),
                End::Back => list.push_back(val.clone()),
            }
        }
        let len = list.len();
        self.evict_to_max_memory();
        Ok(len)
    }

    fn pop(&mut self, key: &str, end: End) -> StoreResult<Option<String>> {
        let Some(list) = touched_list(&mut self.entries, &mut self.eviction, key)? else {
            return Ok(None);
        };
        let popped = match end {
            End::Front => list.pop_front(),
            End::Back => list.pop_back(),
        };
        if let Some(val) = &popped {
            self.memory.list_item_delete(val);
        }
        Ok(popped)
    }
}
