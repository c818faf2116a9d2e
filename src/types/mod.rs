// src/types/mod.rs

//! 数据结构：String / List / Hash / Set / Sorted Set
//!
//! 每个子模块既定义该类型的值容器，也为 `Store` 实现该类型的命令
//! （`impl Store { fn lpush … }`），这样类型相关的逻辑集中在一个文件里。

pub mod hash;
pub mod linked;
pub mod list;
pub mod set;
pub mod string;
pub mod zset;

use std::fmt;

pub use hash::HashValue;
pub use list::{InsertPosition, ListValue};
pub use set::SetValue;
pub use zset::SortedSet;

/// 键对应的值
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    List(ListValue),
    Hash(HashValue),
    Set(SetValue),
    ZSet(SortedSet),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Str(_) => ValueType::String,
            Value::List(_) => ValueType::List,
            Value::Hash(_) => ValueType::Hash,
            Value::Set(_) => ValueType::Set,
            Value::ZSet(_) => ValueType::ZSet,
        }
    }
}

/// 值类型，`TYPE` 命令的返回值，同时参与内存估算（类型名按字符计费）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    List,
    Hash,
    Set,
    ZSet,
}

impl ValueType {
    pub fn name(self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::List => "list",
            ValueType::Hash => "hash",
            ValueType::Set => "set",
            ValueType::ZSet => "zset",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
