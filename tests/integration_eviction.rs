// tests/integration_eviction.rs

//! 集成测试：内存上限与 LRU 淘汰

use anyhow::Result;
use proptest::prelude::*;

use crabkv::engine::memory::{recency_node_size, store_item_size};
use crabkv::eviction::PolicyKind;
use crabkv::types::Value;
use crabkv::{Engine, Reply, Store};

const VALUE_30: &str = "abcdefghijklmnopqrstuvwxyz0123";

fn cmd(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

/// 一个 key 在 keyspace 和访问顺序链表里的总开销
fn entry_cost(key: &str, value: &str) -> usize {
    store_item_size(key, &Value::Str(value.to_string())) + recency_node_size(key)
}

#[test]
fn test_eviction_drops_oldest_key() -> Result<()> {
    let mut store = Store::new(1475, PolicyKind::Lru);
    for i in 0..10 {
        store.set_string(&format!("key{i}"), VALUE_30);
    }
    assert_eq!(store.memory_used(), 1440);
    assert_eq!(store.len(), 10);

    store.set_string("key-xyz", "xyz");

    assert!(!store.contains_key("key0"), "key0 应被淘汰");
    assert_eq!(store.len(), 10);
    assert_eq!(store.memory_used(), 1440 - 144 + 102);
    assert!(store.memory_used() <= store.max_memory());
    assert_eq!(store.recency_keys().first().map(String::as_str), Some("key1"));
    assert_eq!(store.recency_keys().last().map(String::as_str), Some("key-xyz"));
    Ok(())
}

#[test]
fn test_touched_keys_survive() -> Result<()> {
    let cost = entry_cost("key0", VALUE_30);
    let mut engine = Engine::new(Store::new(cost * 3, PolicyKind::Lru), None);

    for key in ["key0", "key1", "key2"] {
        engine.execute(&cmd(&["SET", key, VALUE_30]))?;
    }
    // key0 变成最近访问
    assert_eq!(engine.execute(&cmd(&["GET", "key0"]))?, Reply::Str(VALUE_30.into()));
    // EXISTS 不影响顺序
    engine.execute(&cmd(&["EXISTS", "key1"]))?;

    engine.execute(&cmd(&["SET", "key3", VALUE_30]))?;
    assert!(!engine.store().contains_key("key1"));
    assert_eq!(
        engine.store().recency_keys(),
        cmd(&["key2", "key0", "key3"])
    );
    Ok(())
}

#[test]
fn test_growth_of_existing_value_evicts_others() -> Result<()> {
    let cost = entry_cost("key0", VALUE_30);
    let mut store = Store::new(cost * 2, PolicyKind::Lru);
    store.set_string("key0", VALUE_30);
    store.set_string("key1", VALUE_30);

    // key1 变长，超出上限，最旧的 key0 被淘汰
    store.append_string("key1", "!")?;
    assert_eq!(store.recency_keys(), cmd(&["key1"]));
    assert!(store.memory_used() <= store.max_memory());
    Ok(())
}

#[test]
fn test_single_oversized_item_empties_store() -> Result<()> {
    let mut store = Store::new(10, PolicyKind::Lru);
    store.set_string("small", "x");
    assert!(store.is_empty());
    assert_eq!(store.memory_used(), 0);

    store.rpush("list", &cmd(&["a", "b"]))?;
    assert!(store.is_empty());
    assert_eq!(store.memory_used(), 0);
    Ok(())
}

#[test]
fn test_list_growth_is_accounted() -> Result<()> {
    let mut store = Store::new(300, PolicyKind::Lru);
    store.set_string("old", "value");
    for i in 0..10 {
        store.rpush("l", &[format!("item{i}")])?;
        assert!(store.memory_used() <= 300);
    }
    assert!(!store.contains_key("old"), "old 最先被淘汰");
    Ok(())
}

#[derive(Debug, Clone)]
enum Op {
    Set(usize),
    Get(usize),
    Exists(usize),
}

fn ops() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![
            (0usize..10).prop_map(Op::Set),
            (0usize..10).prop_map(Op::Get),
            (0usize..10).prop_map(Op::Exists),
        ],
        1..80,
    )
}

proptest! {
    /// 同样开销的 key，容量 5 个：链表顺序和简单的 LRU 模型一致
    #[test]
    fn recency_matches_lru_model(ops in ops()) {
        let cost = entry_cost("key0", VALUE_30);
        let mut store = Store::new(cost * 5, PolicyKind::Lru);
        let mut model: Vec<String> = Vec::new();

        for op in ops {
            match op {
                Op::Set(i) => {
                    let key = format!("key{i}");
                    store.set_string(&key, VALUE_30);
                    model.retain(|k| k != &key);
                    model.push(key);
                    if model.len() > 5 {
                        model.remove(0);
                    }
                }
                Op::Get(i) => {
                    let key = format!("key{i}");
                    let got = store.get_string(&key).unwrap();
                    if let Some(pos) = model.iter().position(|k| k == &key) {
                        prop_assert_eq!(got, Some(VALUE_30.to_string()));
                        let k = model.remove(pos);
                        model.push(k);
                    } else {
                        prop_assert_eq!(got, None);
                    }
                }
                Op::Exists(i) => {
                    store.exists(&[format!("key{i}")]);
                }
            }

            prop_assert_eq!(store.recency_keys(), model.clone());
            prop_assert!(store.memory_used() <= store.max_memory());
            prop_assert_eq!(store.memory_used(), cost * model.len());
        }
    }
}
