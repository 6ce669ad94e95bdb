use std::io;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::target::Target;

/// Metadata extracted from the server's INFO reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub version: String,
    pub build_id: String,
}

/// Distinguishable failure conditions raised by the protocol client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    #[error("authentication required or rejected")]
    Auth,
    #[error("connection timed out")]
    Timeout,
    #[error("connection refused")]
    Refused,
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Seam between the worker pool and the wire. Tests inject fakes.
#[async_trait]
pub trait InfoClient: Send + Sync {
    async fn fetch_info(&self, target: &Target, timeout: Duration)
        -> Result<ServerInfo, ClientError>;
}

/// Real client speaking just enough RESP to authenticate and query INFO.
#[derive(Debug, Default)]
pub struct RespClient;

#[async_trait]
impl InfoClient for RespClient {
    async fn fetch_info(
        &self,
        target: &Target,
        limit: Duration,
    ) -> Result<ServerInfo, ClientError> {
        let addr = (target.host.as_str(), target.port);
        let stream = match timeout(limit, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(err)) => return Err(map_io(err)),
            Err(_) => return Err(ClientError::Timeout),
        };
        let mut conn = BufReader::new(stream);

        if let Some(password) = &target.password {
            send_command(&mut conn, &["AUTH", password], limit).await?;
            match read_reply(&mut conn, limit).await? {
                Reply::Simple(_) => {}
                Reply::Error(msg) if is_auth_error(&msg) => return Err(ClientError::Auth),
                Reply::Error(msg) => return Err(ClientError::Protocol(msg)),
                other => {
                    return Err(ClientError::Protocol(format!(
                        "unexpected AUTH reply: {other:?}"
                    )))
                }
            }
        }

        send_command(&mut conn, &["INFO"], limit).await?;
        match read_reply(&mut conn, limit).await? {
            Reply::Bulk(payload) => Ok(ServerInfo {
                version: info_field(&payload, "redis_version")
                    .unwrap_or_else(|| "unknown".to_string()),
                build_id: info_field(&payload, "redis_build_id")
                    .unwrap_or_else(|| "unknown".to_string()),
            }),
            Reply::Error(msg) if is_auth_error(&msg) => Err(ClientError::Auth),
            Reply::Error(msg) => Err(ClientError::Protocol(msg)),
            other => Err(ClientError::Protocol(format!(
                "unexpected INFO reply: {other:?}"
            ))),
        }
    }
}

#[derive(Debug)]
enum Reply {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(String),
}

fn map_io(err: io::Error) -> ClientError {
    match err.kind() {
        io::ErrorKind::TimedOut => ClientError::Timeout,
        _ => ClientError::Refused,
    }
}

/// Servers signal both missing and rejected credentials with a handful of
/// well-known error prefixes.
fn is_auth_error(msg: &str) -> bool {
    msg.starts_with("NOAUTH")
        || msg.starts_with("WRONGPASS")
        || msg.contains("invalid password")
        || msg.contains("Authentication required")
        || msg.starts_with("ERR Client sent AUTH")
}

async fn send_command(
    conn: &mut BufReader<TcpStream>,
    args: &[&str],
    limit: Duration,
) -> Result<(), ClientError> {
    let mut frame = format!("*{}\r\n", args.len());
    for arg in args {
        frame.push_str(&format!("${}\r\n{}\r\n", arg.len(), arg));
    }
    match timeout(limit, conn.get_mut().write_all(frame.as_bytes())).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(map_io(err)),
        Err(_) => Err(ClientError::Timeout),
    }
}

async fn read_reply(
    conn: &mut BufReader<TcpStream>,
    limit: Duration,
) -> Result<Reply, ClientError> {
    let line = read_line(conn, limit).await?;
    let kind = match line.as_bytes().first() {
        Some(byte) => *byte,
        None => return Err(ClientError::Protocol("empty reply".to_string())),
    };
    if !kind.is_ascii() {
        return Err(ClientError::Protocol(format!(
            "unexpected reply type: {line:?}"
        )));
    }
    let rest = &line[1..];
    match kind {
        b'+' => Ok(Reply::Simple(rest.to_string())),
        b'-' => Ok(Reply::Error(rest.to_string())),
        b':' => {
            let value = rest
                .parse()
                .map_err(|_| ClientError::Protocol(format!("bad integer reply: {line}")))?;
            Ok(Reply::Integer(value))
        }
        b'$' => {
            let len: i64 = rest
                .parse()
                .map_err(|_| ClientError::Protocol(format!("bad bulk length: {line}")))?;
            if len < 0 {
                return Ok(Reply::Bulk(String::new()));
            }
            // Payload plus the trailing CRLF.
            let mut buf = vec![0u8; len as usize + 2];
            match timeout(limit, conn.read_exact(&mut buf)).await {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => return Err(map_io(err)),
                Err(_) => return Err(ClientError::Timeout),
            }
            buf.truncate(len as usize);
            Ok(Reply::Bulk(String::from_utf8_lossy(&buf).into_owned()))
        }
        _ => Err(ClientError::Protocol(format!(
            "unexpected reply type: {line:?}"
        ))),
    }
}

async fn read_line(
    conn: &mut BufReader<TcpStream>,
    limit: Duration,
) -> Result<String, ClientError> {
    let mut line = String::new();
    match timeout(limit, conn.read_line(&mut line)).await {
        Ok(Ok(0)) => Err(ClientError::Protocol(
            "connection closed before reply".to_string(),
        )),
        Ok(Ok(_)) => Ok(line.trim_end_matches(['\r', '\n']).to_string()),
        Ok(Err(err)) => Err(map_io(err)),
        Err(_) => Err(ClientError::Timeout),
    }
}

/// Pull a single `field:value` line out of an INFO payload.
fn info_field(payload: &str, field: &str) -> Option<String> {
    let pattern = format!(r"(?m)^{}:([^\r\n]+)", regex::escape(field));
    let re = Regex::new(&pattern).ok()?;
    re.captures(payload)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_field_extraction() {
        let payload = "# Server\r\nredis_version:8.2.1\r\nredis_build_id:abcdef123456\r\n";
        assert_eq!(
            info_field(payload, "redis_version").as_deref(),
            Some("8.2.1")
        );
        assert_eq!(
            info_field(payload, "redis_build_id").as_deref(),
            Some("abcdef123456")
        );
        assert_eq!(info_field(payload, "redis_mode"), None);
    }

    #[test]
    fn test_auth_error_detection() {
        assert!(is_auth_error("NOAUTH Authentication required."));
        assert!(is_auth_error("WRONGPASS invalid username-password pair"));
        assert!(is_auth_error("ERR invalid password"));
        assert!(is_auth_error(
            "ERR Client sent AUTH, but no password is set"
        ));
        assert!(!is_auth_error("ERR unknown command 'INFO'"));
    }
}
