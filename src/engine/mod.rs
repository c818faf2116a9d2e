// src/engine/mod.rs

//! # 引擎模块
//!
//! `engine` 是服务器的核心：
//! - 从网络层接收已分词的命令（`&[String]`）
//! - 通过 `dispatch` 调用 `Store` 上对应的命令
//! - 命令成功后按白名单把原始请求追加到 AOF
//! - 返回 `Reply`，由网络层编码成 RESP
//!
//! AOF 重放直接调用 `dispatch`，绕过写 AOF 的步骤。

pub mod memory;
pub mod store;

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::config::Config;
use crate::error::{CommandError, StoreError};
use crate::persistence::{self, AofWriter, should_persist};
use crate::protocol::Reply;
use crate::types::InsertPosition;
use store::Store;

/// Store + 可选的 AOF 写入器
#[derive(Debug)]
pub struct Engine {
    store: Store,
    aof: Option<AofWriter>,
}

impl Engine {
    pub fn new(store: Store, aof: Option<AofWriter>) -> Self {
        Engine { store, aof }
    }

    /// 按配置构建引擎；开启持久化时先完整重放 AOF，再打开写入器
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let mut store = Store::new(cfg.max_memory, cfg.policy()?);

        let aof = if cfg.aof_persistence {
            let path = cfg.aof_write_path.as_path();
            let stats = persistence::load_aof(path, &mut store)
                .with_context(|| format!("failed to load AOF {}", path.display()))?;
            info!(
                path = %path.display(),
                frames = stats.frames,
                applied = stats.applied,
                failed = stats.failed,
                truncated_tail = stats.truncated_tail,
                keys = store.len(),
                memory_used = store.memory_used(),
                "AOF loaded"
            );
            Some(AofWriter::open(path)?)
        } else {
            None
        };

        Ok(Engine { store, aof })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// 执行一条客户端命令；成功且在白名单内时写 AOF。
    ///
    /// AOF 写失败只记日志：内存里的修改已经发生，回复照常返回。
    pub fn execute(&mut self, parts: &[String]) -> Result<Reply, CommandError> {
        let reply = dispatch(&mut self.store, parts)?;

        if let (Some(aof), Some(name)) = (self.aof.as_mut(), parts.first()) {
            if should_persist(&name.to_ascii_uppercase(), &reply) {
                if let Err(e) = aof.append(parts) {
                    error!(path = %aof.path().display(), error = %e, "AOF write failed");
                }
            }
        }
        Ok(reply)
    }

    pub fn sync_aof(&self) -> std::io::Result<()> {
        match &self.aof {
            Some(aof) => aof.sync(),
            None => Ok(()),
        }
    }
}

/// 命令表。命令名大小写不敏感。
pub fn dispatch(store: &mut Store, parts: &[String]) -> Result<Reply, CommandError> {
    let Some((name, args)) = parts.split_first() else {
        return Err(CommandError::InvalidArgument {
            reason: "empty command".to_string(),
        });
    };
    let cmd = name.to_ascii_uppercase();

    let reply = match cmd.as_str() {
        "PING" => {
            arity_range(&cmd, args, 0, 1)?;
            match args.first() {
                Some(msg) => Reply::Str(msg.clone()),
                None => Reply::Str("PONG".to_string()),
            }
        }

        // --- String ---
        "SET" => set(store, &cmd, args)?,
        "GET" => {
            arity(&cmd, args, 1)?;
            Reply::bulk_or_nil(store.get_string(&args[0])?)
        }
        "APPEND" => {
            arity(&cmd, args, 2)?;
            Reply::int(store.append_string(&args[0], &args[1])?)
        }
        "STRLEN" => {
            arity(&cmd, args, 1)?;
            Reply::int(store.str_len(&args[0])?)
        }
        "INCR" => {
            arity(&cmd, args, 1)?;
            Reply::Int(store.str_incr(&args[0])?)
        }
        "DECR" => {
            arity(&cmd, args, 1)?;
            Reply::Int(store.str_decr(&args[0])?)
        }

        // --- Keyspace ---
        "TOUCH" => {
            min_arity(&cmd, args, 1)?;
            Reply::int(store.touch(args))
        }
        "EXISTS" => {
            min_arity(&cmd, args, 1)?;
            Reply::int(store.exists(args))
        }
        "DEL" => {
            min_arity(&cmd, args, 1)?;
            Reply::int(store.del(args))
        }
        "TYPE" => {
            arity(&cmd, args, 1)?;
            Reply::Str(
                store
                    .type_of(&args[0])
                    .map_or("none", |t| t.name())
                    .to_string(),
            )
        }
        "RENAME" => {
            arity(&cmd, args, 2)?;
            store.rename(&args[0], &args[1])?;
            Reply::ok()
        }
        "RENAMENX" => {
            arity(&cmd, args, 2)?;
            Reply::bool(store.rename_nx(&args[0], &args[1])?)
        }

        // --- List ---
        "LPUSH" => {
            min_arity(&cmd, args, 2)?;
            Reply::int(store.lpush(&args[0], &args[1..])?)
        }
        "RPUSH" => {
            min_arity(&cmd, args, 2)?;
            Reply::int(store.rpush(&args[0], &args[1..])?)
        }
        "LPOP" => {
            arity(&cmd, args, 1)?;
            Reply::bulk_or_nil(store.lpop(&args[0])?)
        }
        "RPOP" => {
            arity(&cmd, args, 1)?;
            Reply::bulk_or_nil(store.rpop(&args[0])?)
        }
        "LINDEX" => {
            arity(&cmd, args, 2)?;
            Reply::bulk_or_nil(store.lindex(&args[0], parse_int(&args[1])?)?)
        }
        "LLEN" => {
            arity(&cmd, args, 1)?;
            Reply::int(store.llen(&args[0])?)
        }
        "LRANGE" => {
            arity(&cmd, args, 3)?;
            let (start, stop) = (parse_int(&args[1])?, parse_int(&args[2])?);
            Reply::strings(store.lrange(&args[0], start, stop)?)
        }
        "LREM" => {
            arity(&cmd, args, 3)?;
            Reply::int(store.lrem(&args[0], parse_int(&args[1])?, &args[2])?)
        }
        "LINSERT" => {
            arity(&cmd, args, 4)?;
            let pos: InsertPosition = args[1]
                .parse()
                .map_err(|reason| CommandError::InvalidArgument { reason })?;
            Reply::int(store.linsert(&args[0], pos, &args[2], &args[3])?)
        }
        "LSET" => {
            arity(&cmd, args, 3)?;
            store.lset(&args[0], parse_int(&args[1])?, &args[2])?;
            Reply::ok()
        }

        // --- Hash ---
        "HSET" => {
            arity(&cmd, args, 3)?;
            Reply::bool(store.hset(&args[0], &args[1], &args[2])?)
        }
        "HGET" => {
            arity(&cmd, args, 2)?;
            Reply::bulk_or_nil(store.hget(&args[0], &args[1])?)
        }
        "HDEL" => {
            min_arity(&cmd, args, 2)?;
            Reply::int(store.hdel(&args[0], &args[1..])?)
        }
        "HLEN" => {
            arity(&cmd, args, 1)?;
            Reply::int(store.hlen(&args[0])?)
        }
        "HGETALL" => {
            arity(&cmd, args, 1)?;
            Reply::strings(store.hgetall(&args[0])?)
        }

        // --- Set ---
        "SADD" => {
            min_arity(&cmd, args, 2)?;
            Reply::int(store.sadd(&args[0], &args[1..])?)
        }
        "SREM" => {
            min_arity(&cmd, args, 2)?;
            Reply::int(store.srem(&args[0], &args[1..])?)
        }
        "SISMEMBER" => {
            arity(&cmd, args, 2)?;
            Reply::bool(store.sismember(&args[0], &args[1])?)
        }
        "SCARD" => {
            arity(&cmd, args, 1)?;
            Reply::int(store.scard(&args[0])?)
        }
        "SMEMBERS" => {
            arity(&cmd, args, 1)?;
            Reply::strings(store.smembers(&args[0])?)
        }

        // --- Sorted Set ---
        "ZADD" => {
            arity(&cmd, args, 3)?;
            Reply::bool(store.zadd(&args[0], parse_float(&args[1])?, &args[2])?)
        }
        "ZSCORE" => {
            arity(&cmd, args, 2)?;
            Reply::bulk_or_nil(store.zscore(&args[0], &args[1])?.map(|s| s.to_string()))
        }
        "ZREM" => {
            min_arity(&cmd, args, 2)?;
            Reply::int(store.zrem(&args[0], &args[1..])?)
        }
        "ZCARD" => {
            arity(&cmd, args, 1)?;
            Reply::int(store.zcard(&args[0])?)
        }
        "ZRANGE" => {
            arity(&cmd, args, 3)?;
            let (start, stop) = (parse_int(&args[1])?, parse_int(&args[2])?);
            Reply::strings(store.zrange(&args[0], start, stop)?)
        }

        _ => Reply::Error(format!("ServerError: unknown command '{name}'")),
    };
    Ok(reply)
}

/// SET key value [NX|XX]
fn set(store: &mut Store, cmd: &str, args: &[String]) -> Result<Reply, CommandError> {
    match args {
        [key, value] => {
            store.set_string(key, value);
            Ok(Reply::ok())
        }
        [key, value, flag] if flag.eq_ignore_ascii_case("NX") => {
            Ok(ok_or_nil(store.set_string_nx(key, value)))
        }
        [key, value, flag] if flag.eq_ignore_ascii_case("XX") => {
            Ok(ok_or_nil(store.set_string_xx(key, value)))
        }
        [_, _, _] => Err(CommandError::InvalidArgument {
            reason: "syntax error".to_string(),
        }),
        _ => Err(wrong_arity(cmd)),
    }
}

fn ok_or_nil(done: bool) -> Reply {
    if done { Reply::ok() } else { Reply::Nil }
}

fn wrong_arity(cmd: &str) -> CommandError {
    CommandError::WrongArity {
        command: cmd.to_ascii_lowercase(),
    }
}

fn arity(cmd: &str, args: &[String], n: usize) -> Result<(), CommandError> {
    arity_range(cmd, args, n, n)
}

fn min_arity(cmd: &str, args: &[String], n: usize) -> Result<(), CommandError> {
    arity_range(cmd, args, n, usize::MAX)
}

fn arity_range(cmd: &str, args: &[String], min: usize, max: usize) -> Result<(), CommandError> {
    if (min..=max).contains(&args.len()) {
        Ok(())
    } else {
        Err(wrong_arity(cmd))
    }
}

fn parse_int(s: &str) -> Result<i64, CommandError> {
    s.parse().map_err(|_| CommandError::InvalidArgument {
        reason: "value is not an integer or out of range".to_string(),
    })
}

fn parse_float(s: &str) -> Result<f64, CommandError> {
    match s.parse::<f64>() {
        Ok(f) if !f.is_nan() => Ok(f),
        _ => Err(StoreError::NotAFloat.into()),
    }
}
