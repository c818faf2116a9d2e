// src/error.rs

//! 可恢复的错误类型
//!
//! `StoreError` / `ParseError` / `CommandError` 都会在连接层被转换成
//! `-<message>\r\n` 回复，连接保持打开；`AofError` 只出现在启动时的 AOF 重放。

use thiserror::Error;

use crate::types::ValueType;

pub type StoreResult<T> = Result<T, StoreError>;

/// 存储层错误：类型不匹配、key 不存在、数值解析失败、下标越界
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("StoreError: value at key is not a {expected} type.")]
    WrongType { expected: ValueType },

    #[error("StoreError: No such key.")]
    NoSuchKey,

    #[error("StoreError: value at key is not a number string.")]
    NotANumber,

    #[error("StoreError: value is not a valid float.")]
    NotAFloat,

    #[error("StoreError: index out of range.")]
    IndexOutOfRange,

    #[error("StoreError: increment or decrement would overflow.")]
    Overflow,
}

impl StoreError {
    pub fn wrong_type(expected: ValueType) -> Self {
        StoreError::WrongType { expected }
    }
}

/// 客户端请求解析错误
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("ParseError: {0}")]
    Protocol(String),

    /// 读 socket 失败，不回复，直接断开
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        ParseError::Protocol(msg.into())
    }
}

/// 命令执行错误
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("ERR wrong number of arguments for '{command}' command")]
    WrongArity { command: String },

    #[error("ERR {reason}")]
    InvalidArgument { reason: String },
}

/// AOF 重放错误
#[derive(Debug, Error)]
pub enum AofError {
    #[error("AOF I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("AOF corrupt at byte {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },
}
