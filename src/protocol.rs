// src/protocol.rs

//! 协议编解码
//!
//! - 请求：RESP Array + Bulk String（`*2\r\n$3\r\nGET\r\n$1\r\nk\r\n`），
//!   或者一行用空白分隔的简单文本（`GET k\r\n`）
//! - 回复：`Reply` → RESP 字节
//! - AOF 记录：与请求相同的 RESP Array 格式，长度前缀保证值里出现 `*`、`\r\n` 也能正确重放

use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::error::ParseError;

/// 单个 bulk string 的上限
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;
/// 单条命令的参数个数上限
pub const MAX_ARGS: usize = 1024 * 1024;
/// 头部行和简单文本命令的长度上限
pub const MAX_LINE_LEN: usize = 64 * 1024;
/// 读 bulk string 时预分配的上限，更长的内容边读边扩容
const BULK_PREALLOC: usize = 16 * 1024;

/// 命令执行结果
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Nil,
    Str(String),
    Int(i64),
    Array(Vec<Reply>),
    Error(String),
}

impl Reply {
    pub fn ok() -> Self {
        Reply::Str("OK".to_string())
    }

    pub fn int(n: usize) -> Self {
        Reply::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }

    pub fn bool(b: bool) -> Self {
        Reply::Int(i64::from(b))
    }

    pub fn bulk_or_nil(s: Option<String>) -> Self {
        s.map_or(Reply::Nil, Reply::Str)
    }

    pub fn strings(items: Vec<String>) -> Self {
        Reply::Array(items.into_iter().map(Reply::Str).collect())
    }
}

/// 顶层编码规则：
/// 错误 `-msg`；nil `$-1`；数组 `*n` + 元素；空串 `$0\r\n\r\n`；
/// 非空串 `+s`；整数 `:n`
pub fn encode_reply(reply: &Reply) -> Vec<u8> {
    let mut out = Vec::new();
    match reply {
        Reply::Str(s) if !s.is_empty() && !s.contains(['\r', '\n']) => {
            out.extend_from_slice(format!("+{s}\r\n").as_bytes());
        }
        Reply::Array(items) => {
            out.extend_from_slice(format!("*{}\r\n", items.len()).as_bytes());
            for item in items {
                encode_element(item, &mut out);
            }
        }
        other => encode_element(other, &mut out),
    }
    out
}

/// 数组元素：字符串一律用 bulk string
fn encode_element(reply: &Reply, out: &mut Vec<u8>) {
    match reply {
        Reply::Nil => out.extend_from_slice(b"$-1\r\n"),
        Reply::Str(s) => {
            out.extend_from_slice(format!("${}\r\n", s.len()).as_bytes());
            out.extend_from_slice(s.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        Reply::Int(n) => out.extend_from_slice(format!(":{n}\r\n").as_bytes()),
        Reply::Error(msg) => out.extend_from_slice(format!("-{msg}\r\n").as_bytes()),
        Reply::Array(items) => {
            out.extend_from_slice(format!("*{}\r\n", items.len()).as_bytes());
            for item in items {
                encode_element(item, out);
            }
        }
    }
}

/// 把 token 列表编码成 RESP Array（AOF 记录格式）
pub fn encode_frame(parts: &[String]) -> Vec<u8> {
    let mut out = format!("*{}\r\n", parts.len()).into_bytes();
    for part in parts {
        out.extend_from_slice(format!("${}\r\n", part.len()).as_bytes());
        out.extend_from_slice(part.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// 从缓冲区头部解出一条完整的 RESP Array。
///
/// # 返回
/// - `Ok(Some((parts, consumed)))` – 解出一条，占用了 `consumed` 字节
/// - `Ok(None)` – 数据还不完整，需要更多字节
///
/// # 错误
/// 头部格式错误、缺少 CRLF、非 UTF-8 内容
pub fn decode_frame(buf: &[u8]) -> Result<Option<(Vec<String>, usize)>, ParseError> {
    FrameDecoder::default().decode(buf)
}

/// 可续解的 RESP Array 解码器。
///
/// 数据不完整时保留已经解出的元素和位置，下次调用从断点继续，
/// 一条跨很多分块的大记录只会被完整扫描一次。
#[derive(Debug, Default)]
pub struct FrameDecoder {
    count: Option<usize>,
    parts: Vec<String>,
    pos: usize,
}

impl FrameDecoder {
    /// `buf` 从当前记录的第一个字节开始；两次调用之间只能在尾部追加数据。
    /// 解出一条后解码器复位，可以接着解下一条。
    pub fn decode(&mut self, buf: &[u8]) -> Result<Option<(Vec<String>, usize)>, ParseError> {
        let result = self.resume(buf);
        if !matches!(result, Ok(None)) {
            *self = FrameDecoder::default();
        }
        result
    }

    fn resume(&mut self, buf: &[u8]) -> Result<Option<(Vec<String>, usize)>, ParseError> {
        let count = match self.count {
            Some(count) => count,
            None => {
                if buf.first().is_some_and(|b| *b != b'*') {
                    return Err(ParseError::protocol("expected '*' at start of frame"));
                }
                let mut pos = 0;
                let Some(header) = next_line(buf, &mut pos) else {
                    return Ok(None);
                };
                let count = parse_header(header, b'*', MAX_ARGS)?;
                self.count = Some(count);
                self.parts = Vec::with_capacity(count.min(64));
                self.pos = pos;
                count
            }
        };

        while self.parts.len() < count {
            let mut pos = self.pos;
            let Some(line) = next_line(buf, &mut pos) else {
                return Ok(None);
            };
            let len = parse_header(line, b'$', MAX_BULK_LEN)?;
            let end = pos + len;
            let Some(tail) = buf.get(end..end + 2) else {
                return Ok(None);
            };
            if tail != b"\r\n" {
                return Err(ParseError::protocol("expected CRLF after bulk string"));
            }
            self.parts.push(utf8(&buf[pos..end])?);
            self.pos = end + 2;
        }
        Ok(Some((std::mem::take(&mut self.parts), self.pos)))
    }
}

/// 从连接上读一条命令。干净的 EOF 返回 `Ok(None)`；空行会被跳过。
///
/// Array 中途出错时，先把这条命令剩下声明的元素读掉再返回错误，
/// 这些字节不会再被当成新的命令。
pub async fn read_command<R>(reader: &mut R) -> Result<Option<Vec<String>>, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let Some(line) = read_line(reader).await? else {
            return Ok(None);
        };
        let line = trim_crlf(&line);

        if line.first() == Some(&b'*') {
            let count = parse_header(line, b'*', MAX_ARGS)?;
            let mut parts = Vec::with_capacity(count.min(64));
            for read in 0..count {
                match read_bulk(reader).await {
                    Ok(part) => parts.push(part),
                    Err(ParseError::Io(e)) => return Err(ParseError::Io(e)),
                    Err(e) => {
                        skip_elements(reader, count - read - 1).await?;
                        return Err(e);
                    }
                }
            }
            return Ok(Some(parts));
        }

        // 简单文本协议
        let parts: Vec<String> = utf8(line)?
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if !parts.is_empty() {
            return Ok(Some(parts));
        }
    }
}

async fn read_bulk<R>(reader: &mut R) -> Result<String, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let Some(line) = read_line(reader).await? else {
        return Err(ParseError::protocol("unexpected end of stream"));
    };
    let len = parse_header(trim_crlf(&line), b'$', MAX_BULK_LEN)?;

    let mut body = Vec::with_capacity(len.min(BULK_PREALLOC));
    (&mut *reader).take(len as u64).read_to_end(&mut body).await?;
    if body.len() < len {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }

    // 结尾必须紧跟 CRLF；多出来的内容读到行尾一起丢弃
    match read_line(reader).await? {
        Some(rest) if rest == b"\r\n" => {}
        Some(_) => return Err(ParseError::protocol("expected CRLF after bulk string")),
        None => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
    }
    String::from_utf8(body).map_err(|_| ParseError::protocol("invalid UTF-8 in bulk string"))
}

/// 读一行（含结尾的 `\n`），最多 `MAX_LINE_LEN` 字节。
/// 超长的行会被读到行尾丢弃，然后返回错误。
async fn read_line<R>(reader: &mut R) -> Result<Option<Vec<u8>>, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let n = (&mut *reader)
        .take(MAX_LINE_LEN as u64)
        .read_until(b'\n', &mut line)
        .await?;
    if n == 0 {
        return Ok(None);
    }
    if n == MAX_LINE_LEN && !line.ends_with(b"\n") {
        discard_line(reader).await?;
        return Err(ParseError::protocol(format!("line exceeds {MAX_LINE_LEN} bytes")));
    }
    Ok(Some(line))
}

async fn discard_line<R>(reader: &mut R) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let (used, done) = {
            let buf = reader.fill_buf().await?;
            if buf.is_empty() {
                return Ok(());
            }
            match buf.iter().position(|b| *b == b'\n') {
                Some(at) => (at + 1, true),
                None => (buf.len(), false),
            }
        };
        reader.consume(used);
        if done {
            return Ok(());
        }
    }
}

/// 丢弃一条坏掉的 Array 里剩下的 `remaining` 个元素。
/// 合法的 `$<n>` 头连同内容一起跳过，其它行本身算作一个元素。
async fn skip_elements<R>(reader: &mut R, remaining: usize) -> Result<(), ParseError>
where
    R: AsyncBufRead + Unpin,
{
    for _ in 0..remaining {
        let line = match read_line(reader).await {
            Ok(Some(line)) => line,
            Ok(None) => return Ok(()),
            Err(ParseError::Io(e)) => return Err(ParseError::Io(e)),
            Err(_) => continue,
        };
        if let Ok(len) = parse_header(trim_crlf(&line), b'$', MAX_BULK_LEN) {
            let want = len as u64 + 2;
            let skipped = io::copy(&mut (&mut *reader).take(want), &mut io::sink()).await?;
            if skipped < want {
                return Ok(());
            }
        }
    }
    Ok(())
}

fn next_line<'a>(buf: &'a [u8], pos: &mut usize) -> Option<&'a [u8]> {
    let rest = buf.get(*pos..)?;
    let at = rest.windows(2).position(|w| w == b"\r\n")?;
    *pos += at + 2;
    Some(&rest[..at])
}

fn trim_crlf(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// `*<n>` / `$<n>`
fn parse_header(line: &[u8], marker: u8, max: usize) -> Result<usize, ParseError> {
    let (first, digits) = line
        .split_first()
        .ok_or_else(|| ParseError::protocol("empty header line"))?;
    if *first != marker {
        return Err(ParseError::protocol(format!(
            "expected '{}', got '{}'",
            marker as char,
            *first as char
        )));
    }
    let n = std::str::from_utf8(digits)
        .ok()
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or_else(|| ParseError::protocol(format!("invalid length in '{}' header", marker as char)))?;
    if n > max {
        return Err(ParseError::protocol(format!("length {n} exceeds limit")));
    }
    Ok(n)
}

fn utf8(bytes: &[u8]) -> Result<String, ParseError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| ParseError::protocol("invalid UTF-8 in request"))
}
