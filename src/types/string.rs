// src/types/string.rs

//! String 类型命令
//!
//! - SET / SET NX / SET XX
//! - GET、APPEND、STRLEN
//! - INCR / DECR
//!
//! 长度统一按 Unicode 标量值计数，和内存计费的单位一致。

use crate::engine::memory::text_len;
use crate::engine::store::{Entry, Store, touched};
use crate::error::{StoreError, StoreResult};
use crate::types::{Value, ValueType};

impl Store {
    /// 写入字符串，已有值会被覆盖。
    ///
    /// 已经是 string 时原地更新，只按字符差额计费；
    /// 其它类型先整体删除再新建。
    pub fn set_string(&mut self, key: &str, value: &str) {
        match touched(&mut self.entries, &mut self.eviction, key) {
            Some(Entry { value: Value::Str(old), .. }) => {
                self.memory.string_update(old, value);
                *old = value.to_string();
            }
            Some(_) => {
                self.remove_entry(key);
                self.insert_entry(key.to_string(), Value::Str(value.to_string()));
            }
            None => self.insert_entry(key.to_string(), Value::Str(value.to_string())),
        }
        self.evict_to_max_memory();
    }

    /// SET … XX：只有 key 已经是 string 时才写入
    pub fn set_string_xx(&mut self, key: &str, value: &str) -> bool {
        match self.peek(key) {
            Some(Value::Str(_)) => {
                self.set_string(key, value);
                true
            }
            _ => false,
        }
    }

    /// SET … NX：只有 key 不存在时才写入
    pub fn set_string_nx(&mut self, key: &str, value: &str) -> bool {
        if self.contains_key(key) {
            return false;
        }
        self.set_string(key, value);
        true
    }

    /// GET：类型不符也会刷新访问顺序
    pub fn get_string(&mut self, key: &str) -> StoreResult<Option<String>> {
        match touched(&mut self.entries, &mut self.eviction, key) {
            Some(Entry { value: Value::Str(s), .. }) => Ok(Some(s.clone())),
            Some(_) => Err(StoreError::wrong_type(ValueType::String)),
            None => Ok(None),
        }
    }

    /// APPEND：key 不存在时等同于 SET；返回追加后的长度
    pub fn append_string(&mut self, key: &str, suffix: &str) -> StoreResult<usize> {
        let len = match touched(&mut self.entries, &mut self.eviction, key) {
            Some(Entry { value: Value::Str(s), .. }) => {
                self.memory.string_append(suffix);
                s.push_str(suffix);
                text_len(s)
            }
            Some(_) => return Err(StoreError::wrong_type(ValueType::String)),
            None => {
                self.insert_entry(key.to_string(), Value::Str(suffix.to_string()));
                text_len(suffix)
            }
        };
        self.evict_to_max_memory();
        Ok(len)
    }

    /// STRLEN：key 不存在返回 0
    pub fn str_len(&mut self, key: &str) -> StoreResult<usize> {
        match touched(&mut self.entries, &mut self.eviction, key) {
            Some(Entry { value: Value::Str(s), .. }) => Ok(text_len(s)),
            Some(_) => Err(StoreError::wrong_type(ValueType::String)),
            None => Ok(0),
        }
    }

    pub fn str_incr(&mut self, key: &str) -> StoreResult<i64> {
        self.str_add(key, 1)
    }

    pub fn str_decr(&mut self, key: &str) -> StoreResult<i64> {
        self.str_add(key, -1)
    }

    /// INCR / DECR 的公共实现。
    ///
    /// # 错误
    /// - 值不是能原样往返的十进制整数（例如 `"007"`、`"+1"`、`"abc"`）
    /// - 结果溢出 `i64`
    fn str_add(&mut self, key: &str, delta: i64) -> StoreResult<i64> {
        if !self.contains_key(key) {
            self.insert_entry(key.to_string(), Value::Str("0".to_string()));
        }
        let Some(entry) = touched(&mut self.entries, &mut self.eviction, key) else {
            return Err(StoreError::NoSuchKey);
        };
        let Value::Str(s) = &mut entry.value else {
            return Err(StoreError::wrong_type(ValueType::String));
        };

        let current = parse_exact_i64(s).ok_or(StoreError::NotANumber)?;
        let next = current.checked_add(delta).ok_or(StoreError::Overflow)?;
        let rendered = next.to_string();
        self.memory.string_update(s, &rendered);
        *s = rendered;

        self.evict_to_max_memory();
        Ok(next)
    }
}

/// 只接受和 `i64::to_string` 结果完全一致的文本
fn parse_exact_i64(s: &str) -> Option<i64> {
    let n = s.parse::<i64>().ok()?;
    (n.to_string() == s).then_some(n)
}
