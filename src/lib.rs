// src/lib.rs
//! crabkv 库：config / engine / eviction / persistence / protocol / server / types

pub mod config;      // JSON 配置 + 命令行参数
pub mod engine;      // 命令分发、Store、内存计费
pub mod error;       // 错误类型
pub mod eviction;    // 淘汰策略（LRU）
pub mod persistence; // AOF 写入与重放
pub mod protocol;    // 协议编解码
pub mod server;      // 网络层
pub mod types;       // String / List / Hash / Set / Sorted Set 数据结构

pub use engine::{Engine, dispatch, store::Store};
pub use protocol::Reply;
