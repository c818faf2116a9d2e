// src/server.rs
//! 网络层：
//! - 监听 TCP 连接，每个连接一个任务
//! - 解码请求（RESP / 简单文本）
//! - 所有命令经由同一把 `Mutex<Engine>` 串行执行，保证一条命令（含淘汰和 AOF 追加）
//!   完整结束后下一条才开始
//! - `SHUTDOWN`（任意客户端）或 Ctrl-C：不回复，关闭所有连接和监听，然后 fsync AOF
use std::io::ErrorKind;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{
    io::{AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::{Mutex, watch},
    task::JoinSet,
};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::engine::Engine;
use crate::error::ParseError;
use crate::protocol::{self, Reply, encode_reply};

/// 按配置启动：先重放 AOF，再绑定端口开始服务
pub async fn run(cfg: Config) -> Result<()> {
    let engine = Engine::from_config(&cfg)?;

    let addr = cfg.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        addr = %listener.local_addr()?,
        max_memory = cfg.max_memory,
        eviction_policy = %cfg.eviction_policy,
        aof_persistence = cfg.aof_persistence,
        "crabkv listening"
    );

    serve(listener, engine).await
}

/// 接受循环，直到收到 SHUTDOWN 或 Ctrl-C
pub async fn serve(listener: TcpListener, engine: Engine) -> Result<()> {
    let engine = Arc::new(Mutex::new(engine));
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let mut conns = JoinSet::new();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "accepted connection");
                    let engine = engine.clone();
                    let shutdown = shutdown_tx.clone();
                    conns.spawn(async move {
                        if let Err(e) = handle_connection(stream, engine, shutdown).await {
                            warn!(%peer, error = %e, "connection error");
                        }
                        debug!(%peer, "connection closed");
                    });
                }
                Err(e) => error!(error = %e, "accept failed"),
            },
            _ = shutdown_rx.changed() => {
                info!("SHUTDOWN received");
                break;
            }
            _ = &mut ctrl_c => {
                info!("ctrl-c received");
                break;
            }
            // 回收已结束的连接任务
            Some(_) = conns.join_next(), if !conns.is_empty() => {}
        }
    }

    conns.abort_all();
    while conns.join_next().await.is_some() {}
    drop(listener);

    let engine = engine.lock().await;
    if let Err(e) = engine.sync_aof() {
        error!(error = %e, "AOF fsync on shutdown failed");
    }
    info!(
        keys = engine.store().len(),
        memory_used = engine.store().memory_used(),
        "server stopped"
    );
    Ok(())
}

/// 单个连接：读命令 → 执行 → 回复。
/// 解析错误和命令错误都以 `-<message>` 回复，连接保持打开。
async fn handle_connection(
    stream: TcpStream,
    engine: Arc<Mutex<Engine>>,
    shutdown: watch::Sender<bool>,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    loop {
        let parts = match protocol::read_command(&mut reader).await {
            Ok(Some(parts)) => parts,
            Ok(None) => break,
            // 客户端断开（EOF） or RST
            Err(ParseError::Io(e))
                if matches!(e.kind(), ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset) =>
            {
                break;
            }
            Err(ParseError::Io(e)) => return Err(e.into()),
            Err(e) => {
                writer.write_all(&encode_reply(&Reply::Error(e.to_string()))).await?;
                continue;
            }
        };

        if parts.first().is_some_and(|c| c.eq_ignore_ascii_case("SHUTDOWN")) {
            shutdown.send_replace(true);
            break;
        }

        let reply = {
            let mut engine = engine.lock().await;
            engine
                .execute(&parts)
                .unwrap_or_else(|e| Reply::Error(e.to_string()))
        };
        writer.write_all(&encode_reply(&reply)).await?;
    }

    Ok(())
}
