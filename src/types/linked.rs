// src/types/linked.rs

//! # Arena-backed doubly linked list
//!
//! Nodes live in a `Vec` slot table and point at each other by index instead of
//! by reference. A `NodeId` is therefore a plain `Copy` handle that a caller can
//! keep on the side (the keyspace keeps one per entry for its recency node)
//! without borrowing the list.
//!
//! All link operations are O(1): append / prepend, unlink by handle, move to
//! back, insert next to a known node. Freed slots are recycled through a free
//! list, so a handle is only meaningful while its node is alive.

/// Stable handle to a live node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct Node<T> {
    val: T,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct LinkedArena<T> {
    slots: Vec<Option<Node<T>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> Default for LinkedArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LinkedArena<T> {
    pub fn new() -> Self {
        LinkedArena {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn head(&self) -> Option<NodeId> {
        self.head.map(NodeId)
    }

    pub fn tail(&self) -> Option<NodeId> {
        self.tail.map(NodeId)
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.node(id.0).map(|n| &n.val)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.node_mut(id.0).map(|n| &mut n.val)
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.node(id.0).and_then(|n| n.next).map(NodeId)
    }

    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.node(id.0).and_then(|n| n.prev).map(NodeId)
    }

    /// Append at the tail and return the new node's handle.
    pub fn push_back(&mut self, val: T) -> NodeId {
        let idx = self.alloc(val);
        self.link_back(idx);
        NodeId(idx)
    }

    /// Prepend at the head and return the new node's handle.
    pub fn push_front(&mut self, val: T) -> NodeId {
        let idx = self.alloc(val);
        self.link_front(idx);
        NodeId(idx)
    }

    /// Insert directly before `at`. Returns `None` if `at` is not live.
    pub fn insert_before(&mut self, at: NodeId, val: T) -> Option<NodeId> {
        let prev = self.node(at.0)?.prev;
        let idx = self.alloc(val);
        if let Some(node) = self.node_mut(idx) {
            node.prev = prev;
            node.next = Some(at.0);
        }
        if let Some(node) = self.node_mut(at.0) {
            node.prev = Some(idx);
        }
        match prev {
            Some(p) => {
                if let Some(node) = self.node_mut(p) {
                    node.next = Some(idx);
                }
            }
            None => self.head = Some(idx),
        }
        self.len += 1;
        Some(NodeId(idx))
    }

    /// Insert directly after `at`. Returns `None` if `at` is not live.
    pub fn insert_after(&mut self, at: NodeId, val: T) -> Option<NodeId> {
        let next = self.node(at.0)?.next;
        let idx = self.alloc(val);
        if let Some(node) = self.node_mut(idx) {
            node.prev = Some(at.0);
            node.next = next;
        }
        if let Some(node) = self.node_mut(at.0) {
            node.next = Some(idx);
        }
        match next {
            Some(n) => {
                if let Some(node) = self.node_mut(n) {
                    node.prev = Some(idx);
                }
            }
            None => self.tail = Some(idx),
        }
        self.len += 1;
        Some(NodeId(idx))
    }

    /// Unlink and free a node, handing back its value.
    pub fn remove(&mut self, id: NodeId) -> Option<T> {
        if !self.unlink(id.0) {
            return None;
        }
        let node = self.slots.get_mut(id.0).and_then(Option::take)?;
        self.free.push(id.0);
        Some(node.val)
    }

    pub fn pop_front(&mut self) -> Option<T> {
        let head = self.head()?;
        self.remove(head)
    }

    pub fn pop_back(&mut self) -> Option<T> {
        let tail = self.tail()?;
        self.remove(tail)
    }

    /// Move a live node to the tail. Returns `false` for a dead handle.
    pub fn move_to_back(&mut self, id: NodeId) -> bool {
        if self.tail == Some(id.0) {
            return self.node(id.0).is_some();
        }
        if !self.unlink(id.0) {
            return false;
        }
        self.link_back(id.0);
        true
    }

    /// Front-to-back iterator; `.rev()` walks back-to-front.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            arena: self,
            front: self.head,
            back: self.tail,
            remaining: self.len,
        }
    }

    fn node(&self, idx: usize) -> Option<&Node<T>> {
        self.slots.get(idx).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, idx: usize) -> Option<&mut Node<T>> {
        self.slots.get_mut(idx).and_then(Option::as_mut)
    }

    fn alloc(&mut self, val: T) -> usize {
        let node = Node {
            val,
            prev: None,
            next: None,
        };
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }

    fn unlink(&mut self, idx: usize) -> bool {
        let Some(node) = self.node(idx) else {
            return false;
        };
        let (prev, next) = (node.prev, node.next);
        match prev {
            Some(p) => {
                if let Some(node) = self.node_mut(p) {
                    node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(node) = self.node_mut(n) {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }
        if let Some(node) = self.node_mut(idx) {
            node.prev = None;
            node.next = None;
        }
        self.len -= 1;
        true
    }

    fn link_back(&mut self, idx: usize) {
        let old_tail = self.tail;
        if let Some(node) = self.node_mut(idx) {
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(t) => {
                if let Some(node) = self.node_mut(t) {
                    node.next = Some(idx);
                }
            }
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
        self.len += 1;
    }

    fn link_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(node) = self.node_mut(idx) {
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(h) => {
                if let Some(node) = self.node_mut(h) {
                    node.prev = Some(idx);
                }
            }
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
        self.len += 1;
    }
}

pub struct Iter<'a, T> {
    arena: &'a LinkedArena<T>,
    front: Option<usize>,
    back: Option<usize>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.arena.node(self.front?)?;
        self.front = node.next;
        self.remaining -= 1;
        Some(&node.val)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.arena.node(self.back?)?;
        self.back = node.prev;
        self.remaining -= 1;
        Some(&node.val)
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
