// src/persistence.rs

//! AOF 持久化
//!
//! 写路径：命令执行成功后，按白名单决定是否把原始请求（RESP Array）追加到文件。
//! 读路径：启动时按 1024 字节分块读取文件，跨块的不完整记录留到下一块继续拼，
//! 每条完整记录直接交给 `engine::dispatch` 执行，不会再次写入 AOF。

use std::{
    fs::{File, OpenOptions},
    io::{ErrorKind, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::engine::{self, store::Store};
use crate::error::AofError;
use crate::protocol::{FrameDecoder, Reply, encode_frame};

/// 重放时每次读取的字节数
pub const AOF_CHUNK_SIZE: usize = 1024;

/// 追加写 AOF 文件
#[derive(Debug)]
pub struct AofWriter {
    path: PathBuf,
    file: File,
}

impl AofWriter {
    /// 打开或创建 AOF 文件（追加模式）
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open AOF file {}", path.display()))?;
        Ok(AofWriter { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一条记录并 flush
    pub fn append(&mut self, parts: &[String]) -> std::io::Result<()> {
        self.file.write_all(&encode_frame(parts))?;
        self.file.flush()?;
        let command = parts.first().map(String::as_str).unwrap_or_default();
        debug!(command = %command, "AOF append");
        Ok(())
    }

    pub fn sync(&self) -> std::io::Result<()> {
        self.file.sync_all()
    }
}

/// 写白名单。`cmd` 需要是大写命令名。
///
/// 零计数的 TOUCH/DEL/LREM/LINSERT/HDEL/SADD/SREM/ZREM
/// 以及返回 nil 的 LPOP/RPOP 没有改动任何数据，不记录。
pub fn should_persist(cmd: &str, reply: &Reply) -> bool {
    match cmd {
        "SET" | "APPEND" | "INCR" | "DECR" | "RENAME" | "RENAMENX" | "LPUSH" | "RPUSH"
        | "LSET" | "HSET" | "ZADD" => true,
        "TOUCH" | "DEL" | "LREM" | "LINSERT" | "HDEL" | "SADD" | "SREM" | "ZREM" => {
            *reply != Reply::Int(0)
        }
        "LPOP" | "RPOP" => *reply != Reply::Nil,
        _ => false,
    }
}

/// 一次重放的统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadStats {
    /// 读到的完整记录数
    pub frames: usize,
    pub applied: usize,
    /// 重放时执行失败、被跳过的记录数
    pub failed: usize,
    /// 文件末尾有一条写了一半的记录
    pub truncated_tail: bool,
}

/// 启动时重放 AOF。文件不存在视为空日志。
pub fn load_aof(path: &Path, store: &mut Store) -> Result<LoadStats, AofError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(LoadStats::default()),
        Err(e) => return Err(e.into()),
    };
    replay(file, store)
}

/// 按块读取并按文件顺序重放所有记录。
///
/// # 错误
/// - 读文件失败
/// - 记录结构损坏（`AofError::Corrupt`，带出错位置），此时停止启动
pub fn replay<R: Read>(mut reader: R, store: &mut Store) -> Result<LoadStats, AofError> {
    let mut stats = LoadStats::default();
    let mut pending: Vec<u8> = Vec::new();
    // pending[0] 在文件中的偏移
    let mut offset: u64 = 0;
    let mut chunk = [0u8; AOF_CHUNK_SIZE];
    // 跨块的记录在这里保留解码进度
    let mut decoder = FrameDecoder::default();

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        pending.extend_from_slice(&chunk[..n]);

        let consumed = apply_complete_frames(&mut decoder, &pending, offset, store, &mut stats)?;
        pending.drain(..consumed);
        offset += consumed as u64;
    }

    if !pending.is_empty() {
        warn!(
            offset,
            bytes = pending.len(),
            "AOF ends with an incomplete record; ignoring it"
        );
        stats.truncated_tail = true;
    }
    Ok(stats)
}

/// 执行缓冲区里所有完整的记录，返回消费的字节数
fn apply_complete_frames(
    decoder: &mut FrameDecoder,
    buf: &[u8],
    base: u64,
    store: &mut Store,
    stats: &mut LoadStats,
) -> Result<usize, AofError> {
    let mut pos = 0;
    loop {
        let frame_offset = base + pos as u64;
        match decoder.decode(&buf[pos..]) {
            Ok(Some((parts, used))) => {
                stats.frames += 1;
                apply(store, &parts, frame_offset, stats);
                pos += used;
            }
            Ok(None) => return Ok(pos),
            Err(e) => {
                return Err(AofError::Corrupt {
                    offset: frame_offset,
                    reason: e.to_string(),
                });
            }
        }
    }
}

fn apply(store: &mut Store, parts: &[String], offset: u64, stats: &mut LoadStats) {
    let command = parts.first().map(String::as_str).unwrap_or_default();
    match engine::dispatch(store, parts) {
        Ok(Reply::Error(msg)) => {
            warn!(offset, command = %command, error = %msg, "skipping AOF record");
            stats.failed += 1;
        }
        Ok(_) => stats.applied += 1,
        Err(e) => {
            warn!(offset, command = %command, error = %e, "skipping AOF record that failed on replay");
            stats.failed += 1;
        }
    }
}
