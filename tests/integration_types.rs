// tests/integration_types.rs

use anyhow::Result;

use crabkv::{Engine, Reply, Store};

/// 辅助：把 &str 切片数组转成 Vec<String>
fn cmd(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn bulk(s: &str) -> Reply {
    Reply::Str(s.to_string())
}

fn run(engine: &mut Engine, parts: &[&str]) -> Reply {
    engine
        .execute(&cmd(parts))
        .unwrap_or_else(|e| Reply::Error(e.to_string()))
}

#[test]
fn test_types_integration() -> Result<()> {
    let mut engine = Engine::new(Store::default(), None);

    //
    // -------- String --------
    //
    assert_eq!(run(&mut engine, &["SET", "key", "value"]), Reply::ok());
    assert_eq!(run(&mut engine, &["APPEND", "key", "!!!"]), Reply::Int(8), "APPEND 返回新长度");
    assert_eq!(run(&mut engine, &["GET", "key"]), bulk("value!!!"));
    assert_eq!(run(&mut engine, &["STRLEN", "key"]), Reply::Int(8));
    assert_eq!(run(&mut engine, &["GET", "nope"]), Reply::Nil);

    assert_eq!(run(&mut engine, &["INCR", "n"]), Reply::Int(1), "不存在的 key 从 0 开始");
    assert_eq!(run(&mut engine, &["DECR", "n"]), Reply::Int(0));
    assert_eq!(
        run(&mut engine, &["INCR", "key"]),
        Reply::Error("StoreError: value at key is not a number string.".into())
    );

    //
    // -------- Keyspace --------
    //
    assert_eq!(run(&mut engine, &["EXISTS", "key", "n", "nope"]), Reply::Int(2));
    assert_eq!(run(&mut engine, &["TOUCH", "key", "nope"]), Reply::Int(1));
    assert_eq!(run(&mut engine, &["TYPE", "key"]), bulk("string"));
    assert_eq!(run(&mut engine, &["RENAME", "key", "k2"]), Reply::ok());
    assert_eq!(run(&mut engine, &["GET", "k2"]), bulk("value!!!"));
    assert_eq!(
        run(&mut engine, &["RENAME", "key", "k3"]),
        Reply::Error("StoreError: No such key.".into())
    );
    assert_eq!(run(&mut engine, &["RENAMENX", "k2", "n"]), Reply::Int(0));
    assert_eq!(run(&mut engine, &["RENAMENX", "k2", "k3"]), Reply::Int(1));
    assert_eq!(run(&mut engine, &["DEL", "k3", "n", "ghost"]), Reply::Int(2));
    assert!(engine.store().is_empty());
    assert_eq!(engine.store().memory_used(), 0);

    //
    // -------- List --------
    //
    assert_eq!(run(&mut engine, &["RPUSH", "l", "b", "c"]), Reply::Int(2));
    assert_eq!(run(&mut engine, &["LPUSH", "l", "a"]), Reply::Int(3));
    assert_eq!(run(&mut engine, &["LINDEX", "l", "-1"]), bulk("c"));
    assert_eq!(run(&mut engine, &["LINDEX", "l", "9"]), Reply::Nil);
    assert_eq!(run(&mut engine, &["LINSERT", "l", "AFTER", "b", "bb"]), Reply::Int(4));
    assert_eq!(run(&mut engine, &["LSET", "l", "0", "A"]), Reply::ok());
    assert_eq!(
        run(&mut engine, &["LSET", "l", "10", "x"]),
        Reply::Error("StoreError: index out of range.".into())
    );
    assert_eq!(run(&mut engine, &["LREM", "l", "0", "bb"]), Reply::Int(1));
    assert_eq!(
        run(&mut engine, &["LRANGE", "l", "0", "-1"]),
        Reply::Array(vec![bulk("A"), bulk("b"), bulk("c")])
    );
    assert_eq!(run(&mut engine, &["LPOP", "l"]), bulk("A"));
    assert_eq!(run(&mut engine, &["RPOP", "l"]), bulk("c"));
    assert_eq!(run(&mut engine, &["LLEN", "l"]), Reply::Int(1));
    assert_eq!(run(&mut engine, &["RPOP", "l"]), bulk("b"));
    assert_eq!(run(&mut engine, &["RPOP", "l"]), Reply::Nil, "空 list 返回 nil");
    assert_eq!(run(&mut engine, &["TYPE", "l"]), bulk("list"));

    //
    // -------- Hash --------
    //
    assert_eq!(run(&mut engine, &["HSET", "h", "f1", "v1"]), Reply::Int(1), "HSET 新 field 应返回 1");
    assert_eq!(run(&mut engine, &["HSET", "h", "f1", "v2"]), Reply::Int(0), "HSET 覆盖已有 field 应返回 0");
    assert_eq!(run(&mut engine, &["HGET", "h", "f1"]), bulk("v2"));
    assert_eq!(run(&mut engine, &["HLEN", "h"]), Reply::Int(1));
    assert_eq!(
        run(&mut engine, &["HGETALL", "h"]),
        Reply::Array(vec![bulk("f1"), bulk("v2")])
    );
    assert_eq!(run(&mut engine, &["HDEL", "h", "f1", "f2"]), Reply::Int(1));

    //
    // -------- Set --------
    //
    assert_eq!(run(&mut engine, &["SADD", "s", "m1", "m2", "m1"]), Reply::Int(2));
    assert_eq!(run(&mut engine, &["SISMEMBER", "s", "m1"]), Reply::Int(1));
    assert_eq!(run(&mut engine, &["SREM", "s", "m1"]), Reply::Int(1));
    assert_eq!(run(&mut engine, &["SCARD", "s"]), Reply::Int(1));
    assert_eq!(run(&mut engine, &["SMEMBERS", "s"]), Reply::Array(vec![bulk("m2")]));

    //
    // -------- Sorted Set --------
    //
    assert_eq!(run(&mut engine, &["ZADD", "z", "1.5", "a"]), Reply::Int(1));
    assert_eq!(run(&mut engine, &["ZADD", "z", "-1", "b"]), Reply::Int(1));
    assert_eq!(run(&mut engine, &["ZSCORE", "z", "a"]), bulk("1.5"));
    assert_eq!(
        run(&mut engine, &["ZRANGE", "z", "0", "-1"]),
        Reply::Array(vec![bulk("b"), bulk("a")])
    );
    assert_eq!(run(&mut engine, &["ZREM", "z", "a"]), Reply::Int(1));
    assert_eq!(run(&mut engine, &["ZCARD", "z"]), Reply::Int(1));

    Ok(())
}

#[test]
fn test_type_guard_keeps_value_and_memory() -> Result<()> {
    let mut engine = Engine::new(Store::default(), None);
    run(&mut engine, &["SET", "s", "plain"]);
    run(&mut engine, &["SET", "other", "x"]);
    let before = engine.store().memory_used();

    for parts in [
        &["LPUSH", "s", "x"][..],
        &["LLEN", "s"][..],
        &["LINDEX", "s", "0"][..],
        &["HSET", "s", "f", "v"][..],
        &["SADD", "s", "m"][..],
        &["ZADD", "s", "1", "m"][..],
    ] {
        let reply = run(&mut engine, parts);
        assert!(
            matches!(&reply, Reply::Error(msg) if msg.starts_with("StoreError: value at key is not a")),
            "{parts:?} -> {reply:?}"
        );
        // 访问过的 key 移到末尾
        assert_eq!(engine.store().recency_keys().last().map(String::as_str), Some("s"));
        run(&mut engine, &["TOUCH", "other"]);
    }

    assert_eq!(run(&mut engine, &["GET", "s"]), bulk("plain"));
    assert_eq!(engine.store().memory_used(), before);
    Ok(())
}

#[test]
fn test_wrong_arity_and_unknown_commands() -> Result<()> {
    let mut engine = Engine::new(Store::default(), None);
    assert_eq!(
        run(&mut engine, &["GET"]),
        Reply::Error("ERR wrong number of arguments for 'get' command".into())
    );
    assert_eq!(
        run(&mut engine, &["FLUSHALL"]),
        Reply::Error("ServerError: unknown command 'FLUSHALL'".into())
    );
    assert_eq!(run(&mut engine, &["PING"]), bulk("PONG"));
    Ok(())
}
