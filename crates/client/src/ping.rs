//! Minimal RESP liveness probe for database endpoints.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::Result;

/// Send a RESP `PING` to `addr:port` and report whether the endpoint
/// answered `+PONG` within `limit`.
///
/// Connection failures and timeouts come back as `Ok(false)` — for a
/// liveness probe an unreachable endpoint is a finding, not an error;
/// only local I/O problems after the connection is up propagate.
pub async fn resp_ping(addr: &str, port: u16, limit: Duration) -> Result<bool> {
    let endpoint = format!("{addr}:{port}");
    let connect = TcpStream::connect(&endpoint);
    let mut stream = match tokio::time::timeout(limit, connect).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(_)) | Err(_) => return Ok(false),
    };

    stream.write_all(b"PING\r\n").await?;

    let mut buf = [0u8; 64];
    let answer = match tokio::time::timeout(limit, stream.read(&mut buf)).await {
        Ok(Ok(n)) => &buf[..n],
        Ok(Err(_)) | Err(_) => return Ok(false),
    };

    Ok(answer.starts_with(b"+PONG"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn pong_answer_is_alive() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 16];
            let _ = socket.read(&mut buf).await.unwrap();
            socket.write_all(b"+PONG\r\n").await.unwrap();
        });

        let alive = resp_ping("127.0.0.1", port, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(alive);
    }

    #[tokio::test]
    async fn refused_connection_is_not_alive() {
        // Bind-then-drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let alive = resp_ping("127.0.0.1", port, Duration::from_millis(500))
            .await
            .unwrap();
        assert!(!alive);
    }

    #[tokio::test]
    async fn wrong_answer_is_not_alive() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 16];
            let _ = socket.read(&mut buf).await.unwrap();
            socket.write_all(b"-ERR unknown\r\n").await.unwrap();
        });

        let alive = resp_ping("127.0.0.1", port, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(!alive);
    }
}
