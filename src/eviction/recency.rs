// src/eviction/recency.rs

//! 最近访问顺序链表：head = 最久未访问，tail = 最近访问。
//! 节点只保存 key；keyspace 里每个 Entry 持有对应节点的 `RecencyHandle`。

use crate::types::linked::{LinkedArena, NodeId};

pub type RecencyHandle = NodeId;

#[derive(Debug, Default, Clone)]
pub struct RecencyList {
    nodes: LinkedArena<String>,
}

impl RecencyList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 追加到尾部（最近访问）
    pub fn append(&mut self, key: String) -> RecencyHandle {
        self.nodes.push_back(key)
    }

    pub fn remove(&mut self, handle: RecencyHandle) -> Option<String> {
        self.nodes.remove(handle)
    }

    /// Move to tail. `false` if the handle is stale.
    pub fn touch(&mut self, handle: RecencyHandle) -> bool {
        self.nodes.move_to_back(handle)
    }

    pub fn head(&self) -> Option<RecencyHandle> {
        self.nodes.head()
    }

    pub fn tail(&self) -> Option<RecencyHandle> {
        self.nodes.tail()
    }

    pub fn key(&self, handle: RecencyHandle) -> Option<&str> {
        self.nodes.get(handle).map(String::as_str)
    }

    /// head → tail
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }
}
