// tests/integration_server.rs

//! 集成测试：真实 TCP 连接上的请求 / 回复与 SHUTDOWN

use std::time::Duration;

use anyhow::Result;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    time::timeout,
};

use crabkv::protocol::encode_frame;
use crabkv::{Engine, Store, server};

async fn request(conn: &mut TcpStream, parts: &[&str], expected: &[u8]) -> Result<()> {
    let parts: Vec<String> = parts.iter().map(|s| s.to_string()).collect();
    conn.write_all(&encode_frame(&parts)).await?;
    let mut buf = vec![0u8; expected.len()];
    timeout(Duration::from_secs(5), conn.read_exact(&mut buf)).await??;
    assert_eq!(
        String::from_utf8_lossy(&buf),
        String::from_utf8_lossy(expected),
        "reply to {parts:?}"
    );
    Ok(())
}

#[tokio::test]
async fn test_rejected_array_body_is_not_executed() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(server::serve(listener, Engine::new(Store::default(), None)));

    let mut conn = TcpStream::connect(addr).await?;
    request(&mut conn, &["SET", "victim", "v"], b"+OK\r\n").await?;

    // 第一个元素头部非法，剩下的 "DEL victim" 属于同一条命令，不能被执行
    conn.write_all(b"*2\r\n$x\r\nDEL victim\r\n").await?;
    let expected = b"-ParseError: invalid length in '$' header\r\n";
    let mut line = vec![0u8; expected.len()];
    timeout(Duration::from_secs(5), conn.read_exact(&mut line)).await??;
    assert_eq!(line, expected);

    request(&mut conn, &["EXISTS", "victim"], b":1\r\n").await?;
    request(&mut conn, &["GET", "victim"], b"+v\r\n").await?;

    conn.write_all(&encode_frame(&["SHUTDOWN".to_string()])).await?;
    timeout(Duration::from_secs(5), handle).await???;
    Ok(())
}

#[tokio::test]
async fn test_commands_over_tcp_and_shutdown() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(server::serve(listener, Engine::new(Store::default(), None)));

    let mut a = TcpStream::connect(addr).await?;
    let mut b = TcpStream::connect(addr).await?;

    request(&mut a, &["SET", "k", "v"], b"+OK\r\n").await?;
    request(&mut b, &["GET", "k"], b"+v\r\n").await?;
    request(&mut a, &["SET", "empty", ""], b"+OK\r\n").await?;
    request(&mut a, &["GET", "empty"], b"$0\r\n\r\n").await?;
    request(&mut b, &["GET", "missing"], b"$-1\r\n").await?;
    request(&mut a, &["RPUSH", "l", "x", "y"], b":2\r\n").await?;
    request(&mut b, &["LRANGE", "l", "0", "-1"], b"*2\r\n$1\r\nx\r\n$1\r\ny\r\n").await?;
    request(&mut a, &["LLEN", "k"], b"-StoreError: value at key is not a list type.\r\n").await?;
    request(&mut a, &["NOPE"], b"-ServerError: unknown command 'NOPE'\r\n").await?;

    // 简单文本协议
    a.write_all(b"EXISTS k l missing\r\n").await?;
    let mut buf = [0u8; 4];
    a.read_exact(&mut buf).await?;
    assert_eq!(&buf, b":2\r\n");

    // 解析错误：回复错误，连接保持可用
    a.write_all(b"*1\r\n+PING\r\n").await?;
    let expected = b"-ParseError: expected '$', got '+'\r\n";
    let mut line = vec![0u8; expected.len()];
    timeout(Duration::from_secs(5), a.read_exact(&mut line)).await??;
    assert_eq!(line, expected);
    request(&mut a, &["PING"], b"+PONG\r\n").await?;

    // SHUTDOWN：不回复，所有连接关闭
    b.write_all(&encode_frame(&["SHUTDOWN".to_string()])).await?;
    let mut rest = Vec::new();
    timeout(Duration::from_secs(5), b.read_to_end(&mut rest)).await??;
    assert!(rest.is_empty(), "SHUTDOWN must not reply");

    timeout(Duration::from_secs(5), handle).await???;

    // 其它连接也被关闭：read_to_end 结束（EOF 或 RST）
    let mut rest = Vec::new();
    let _ = timeout(Duration::from_secs(5), a.read_to_end(&mut rest)).await?;
    Ok(())
}
