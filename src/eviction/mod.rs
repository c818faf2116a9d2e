// src/eviction/mod.rs

//! # 淘汰策略
//!
//! 策略在构造 `Store` 时确定一次；`PolicyKind` 是封闭枚举，
//! 配置里出现未知策略名会在启动时直接报错。

pub mod lru;
pub mod recency;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub use lru::LruEviction;
pub use recency::{RecencyHandle, RecencyList};

use crate::engine::memory::MemoryTracker;
use crate::engine::store::Entry;

/// 可选的淘汰算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolicyKind {
    #[default]
    Lru,
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lru" => Ok(PolicyKind::Lru),
            other => Err(format!("unsupported eviction policy '{other}' (expected 'lru')")),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyKind::Lru => f.write_str("lru"),
        }
    }
}

/// 策略门面，转发到具体实现
#[derive(Debug, Clone)]
pub enum EvictionPolicy {
    Lru(LruEviction),
}

impl EvictionPolicy {
    pub fn new(kind: PolicyKind) -> Self {
        match kind {
            PolicyKind::Lru => EvictionPolicy::Lru(LruEviction::new()),
        }
    }

    pub fn add(&mut self, key: &str, memory: &mut MemoryTracker) -> RecencyHandle {
        match self {
            EvictionPolicy::Lru(lru) => lru.add(key, memory),
        }
    }

    pub fn touch(&mut self, handle: RecencyHandle) {
        match self {
            EvictionPolicy::Lru(lru) => lru.touch(handle),
        }
    }

    pub fn remove(&mut self, handle: RecencyHandle, memory: &mut MemoryTracker) {
        match self {
            EvictionPolicy::Lru(lru) => lru.remove(handle, memory),
        }
    }

    pub fn check_and_evict_to_max_memory(
        &mut self,
        entries: &mut HashMap<String, Entry>,
        memory: &mut MemoryTracker,
    ) -> Vec<String> {
        match self {
            EvictionPolicy::Lru(lru) => lru.check_and_evict_to_max_memory(entries, memory),
        }
    }

    /// 从最久未访问到最近访问
    pub fn recency_keys(&self) -> Vec<String> {
        match self {
            EvictionPolicy::Lru(lru) => lru.recency().keys().map(str::to_string).collect(),
        }
    }
}
