// src/eviction/lru.rs

//! # LRU eviction
//!
//! Keeps one recency node per live key. Writes and type-checked reads move the
//! node to the tail; when the memory budget is exceeded the head (least recently
//! touched key) is evicted first, one key at a time, until the budget holds
//! again or there is nothing left to evict.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::recency::{RecencyHandle, RecencyList};
use crate::engine::memory::MemoryTracker;
use crate::engine::store::Entry;

#[derive(Debug, Default, Clone)]
pub struct LruEviction {
    recency: RecencyList,
}

impl LruEviction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly created key at the tail and charge its recency node.
    pub fn add(&mut self, key: &str, memory: &mut MemoryTracker) -> RecencyHandle {
        memory.add_recency_item(key);
        self.recency.append(key.to_string())
    }

    pub fn touch(&mut self, handle: RecencyHandle) {
        self.recency.touch(handle);
    }

    /// Detach a key's node. The primary mapping is left alone.
    pub fn remove(&mut self, handle: RecencyHandle, memory: &mut MemoryTracker) {
        if let Some(key) = self.recency.remove(handle) {
            memory.delete_recency_item(&key);
        }
    }

    pub fn recency(&self) -> &RecencyList {
        &self.recency
    }

    /// Evict head-first while over budget. Stops early once `entries` is empty.
    /// Returns the evicted keys in eviction order.
    pub fn check_and_evict_to_max_memory(
        &mut self,
        entries: &mut HashMap<String, Entry>,
        memory: &mut MemoryTracker,
    ) -> Vec<String> {
        let mut evicted = Vec::new();

        while memory.max_memory_exceeded() && !entries.is_empty() {
            let Some(head) = self.recency.head() else {
                warn!(
                    entries = entries.len(),
                    "recency list empty while keyspace is not; eviction stopped"
                );
                break;
            };
            let Some(key) = self.recency.remove(head) else {
                break;
            };
            memory.delete_recency_item(&key);

            if let Some(entry) = entries.remove(&key) {
                memory.delete_store_item(&key, &entry.value);
            }
            debug!(
                key = %key,
                memory_used = memory.memory_used(),
                max_memory = memory.max_memory(),
                "evicted"
            );
            evicted.push(key);
        }

        evicted
    }
}
