// src/config.rs

//! 进程配置
//!
//! 优先级（低 → 高）：内置默认值 → `--config` 指定的 JSON 文件 → 命令行参数。
//! JSON 字段使用 camelCase（`maxMemory`、`aofWritePath` …）。

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::store::DEFAULT_MAX_MEMORY;
use crate::eviction::PolicyKind;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 6379;
pub const DEFAULT_AOF_PATH: &str = "crabkv.aof";

/// 进程启动后读到的全局配置
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// 内存上限（按计费模型计算的字节数）
    pub max_memory: usize,
    /// AOF 文件路径，必须以 `.aof` 结尾
    pub aof_write_path: PathBuf,
    /// 是否开启 AOF
    pub aof_persistence: bool,
    /// 目前只支持 "lru"
    pub eviction_policy: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_memory: DEFAULT_MAX_MEMORY,
            aof_write_path: PathBuf::from(DEFAULT_AOF_PATH),
            aof_persistence: true,
            eviction_policy: PolicyKind::Lru.to_string(),
        }
    }
}

impl Config {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn policy(&self) -> Result<PolicyKind> {
        self.eviction_policy
            .parse()
            .map_err(|e: String| anyhow::anyhow!("invalid evictionPolicy: {e}"))
    }

    /// 启动前校验一次
    pub fn validate(&self) -> Result<()> {
        if self.max_memory == 0 {
            bail!("invalid maxMemory: must be greater than 0");
        }
        let is_aof = self
            .aof_write_path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("aof"));
        if !is_aof {
            bail!(
                "invalid aofWritePath {}: must end in .aof",
                self.aof_write_path.display()
            );
        }
        self.policy()?;
        Ok(())
    }
}

/// 从指定路径读取并反序列化 JSON 配置；文件不存在时写入一份默认配置
pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path_ref = path.as_ref();

    if !path_ref.exists() {
        let default_cfg = Config::default();
        let default_json = serde_json::to_string_pretty(&default_cfg)?;
        fs::write(path_ref, default_json)
            .with_context(|| format!("failed to write default config {}", path_ref.display()))?;
        info!(path = %path_ref.display(), "config file not found, wrote defaults");
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path_ref)
        .with_context(|| format!("failed to read config file {}", path_ref.display()))?;
    let cfg: Config = serde_json::from_str(&data)
        .with_context(|| format!("failed to parse config file {}", path_ref.display()))?;
    Ok(cfg)
}

/// 命令行参数
#[derive(Parser, Debug, Default)]
#[command(name = "crabkv", version, about = "In-memory key-value server with LRU eviction and AOF persistence")]
pub struct Cli {
    /// JSON config file (created with defaults if missing)
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    /// Memory budget in cost-model bytes
    #[arg(long)]
    pub max_memory: Option<usize>,

    #[arg(long)]
    pub aof_write_path: Option<PathBuf>,

    /// true / false
    #[arg(long)]
    pub aof_persistence: Option<bool>,

    #[arg(long)]
    pub eviction_policy: Option<String>,
}

impl Cli {
    /// 合并默认值、配置文件和命令行参数，并校验
    pub fn into_config(self) -> Result<Config> {
        let mut cfg = match &self.config {
            Some(path) => load(path)?,
            None => Config::default(),
        };

        if let Some(host) = self.host {
            cfg.host = host;
        }
        if let Some(port) = self.port {
            cfg.port = port;
        }
        if let Some(max_memory) = self.max_memory {
            cfg.max_memory = max_memory;
        }
        if let Some(path) = self.aof_write_path {
            cfg.aof_write_path = path;
        }
        if let Some(on) = self.aof_persistence {
            cfg.aof_persistence = on;
        }
        if let Some(policy) = self.eviction_policy {
            cfg.eviction_policy = policy;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}
