//! Datagram channel to the STP daemon.
//!
//! Each send opens a connectionless Unix socket, transmits one datagram and
//! drops the socket. Every failure surfaces as
//! [`StpError::DaemonUnavailable`]; nothing is retried.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::net::UnixDatagram;
use tokio::time::timeout;
use tracing::{debug, instrument};

use crate::error::{StpError, StpResult};

/// Default path of the daemon's listening socket.
pub const DEFAULT_DAEMON_SOCKET: &str = "/var/run/stpipc.sock";

/// Default path bound while waiting for a reply.
pub const DEFAULT_REPLY_SOCKET: &str = "/var/run/stpcfg_client.sock";

/// Default bound on a single send or reply wait.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1500);

const MAX_REPLY_LEN: usize = 4096;

/// Delivers encoded messages to the daemon.
#[async_trait]
pub trait DaemonNotifier: Send + Sync {
    /// Sends one encoded datagram.
    async fn deliver(&self, datagram: &[u8]) -> StpResult<()>;
}

/// Socket locations and timing for [`DaemonChannel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonChannelConfig {
    pub socket_path: PathBuf,
    pub reply_socket_path: PathBuf,
    pub timeout: Duration,
    /// Wait for one reply datagram after every send
    pub await_reply: bool,
}

impl Default for DaemonChannelConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_DAEMON_SOCKET),
            reply_socket_path: PathBuf::from(DEFAULT_REPLY_SOCKET),
            timeout: DEFAULT_TIMEOUT,
            await_reply: false,
        }
    }
}

/// Unix datagram client for the daemon's IPC socket.
#[derive(Debug, Clone)]
pub struct DaemonChannel {
    config: DaemonChannelConfig,
}

impl DaemonChannel {
    /// Creates a channel. No socket is opened until the first send.
    pub fn new(config: DaemonChannelConfig) -> Self {
        Self { config }
    }

    /// Returns the channel configuration.
    pub fn config(&self) -> &DaemonChannelConfig {
        &self.config
    }

    /// Sends one datagram without waiting for an answer.
    #[instrument(skip(self, message), fields(len = message.len()))]
    pub async fn send(&self, message: &[u8]) -> StpResult<()> {
        let socket = UnixDatagram::unbound().map_err(|e| self.unavailable("socket", e))?;
        self.send_on(&socket, message).await?;
        debug!(path = %self.config.socket_path.display(), "datagram sent");
        Ok(())
    }

    /// Sends one datagram and waits up to the configured timeout for one reply.
    #[instrument(skip(self, message), fields(len = message.len()))]
    pub async fn send_and_await_reply(&self, message: &[u8]) -> StpResult<Vec<u8>> {
        let reply_path = &self.config.reply_socket_path;
        remove_stale(reply_path).map_err(|e| self.unavailable("remove stale reply socket", e))?;

        let socket = UnixDatagram::bind(reply_path).map_err(|e| self.unavailable("bind", e))?;
        let result = self.exchange(&socket, message).await;

        drop(socket);
        if let Err(e) = remove_stale(reply_path) {
            debug!(path = %reply_path.display(), error = %e, "could not remove reply socket");
        }

        result
    }

    async fn exchange(&self, socket: &UnixDatagram, message: &[u8]) -> StpResult<Vec<u8>> {
        self.send_on(socket, message).await?;

        let mut buf = vec![0u8; MAX_REPLY_LEN];
        let len = timeout(self.config.timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| self.timed_out("reply"))?
            .map_err(|e| self.unavailable("recv", e))?;
        buf.truncate(len);
        debug!(len, "reply received");
        Ok(buf)
    }

    async fn send_on(&self, socket: &UnixDatagram, message: &[u8]) -> StpResult<()> {
        let sent = timeout(
            self.config.timeout,
            socket.send_to(message, &self.config.socket_path),
        )
        .await
        .map_err(|_| self.timed_out("send"))?
        .map_err(|e| self.unavailable("send", e))?;

        if sent != message.len() {
            return Err(StpError::daemon_unavailable(format!(
                "short send to {}: {} of {} bytes",
                self.config.socket_path.display(),
                sent,
                message.len()
            )));
        }
        Ok(())
    }

    fn unavailable(&self, what: &str, err: io::Error) -> StpError {
        StpError::daemon_unavailable(format!(
            "{} on {}: {}",
            what,
            self.config.socket_path.display(),
            err
        ))
    }

    fn timed_out(&self, what: &str) -> StpError {
        StpError::daemon_unavailable(format!(
            "{} on {} timed out after {:?}",
            what,
            self.config.socket_path.display(),
            self.config.timeout
        ))
    }
}

#[async_trait]
impl DaemonNotifier for DaemonChannel {
    async fn deliver(&self, datagram: &[u8]) -> StpResult<()> {
        if self.config.await_reply {
            self.send_and_await_reply(datagram).await.map(|_| ())
        } else {
            self.send(datagram).await
        }
    }
}

fn remove_stale(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn channel_in(dir: &TempDir, timeout: Duration) -> DaemonChannel {
        DaemonChannel::new(DaemonChannelConfig {
            socket_path: dir.path().join("stpipc.sock"),
            reply_socket_path: dir.path().join("client.sock"),
            timeout,
            await_reply: false,
        })
    }

    #[tokio::test]
    async fn test_send_delivers_datagram() {
        let dir = TempDir::new().unwrap();
        let channel = channel_in(&dir, Duration::from_secs(1));
        let server = UnixDatagram::bind(&channel.config().socket_path).unwrap();

        channel.send(&[1, 0, 0, 0, 3, 0, 0, 0, 1, 2, 0]).await.unwrap();

        let mut buf = [0u8; 64];
        let len = server.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], &[1, 0, 0, 0, 3, 0, 0, 0, 1, 2, 0]);
    }

    #[tokio::test]
    async fn test_send_and_await_reply() {
        let dir = TempDir::new().unwrap();
        let channel = channel_in(&dir, Duration::from_secs(2));
        let server = UnixDatagram::bind(&channel.config().socket_path).unwrap();

        let responder = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (len, addr) = server.recv_from(&mut buf).await.unwrap();
            let peer = addr.as_pathname().unwrap().to_path_buf();
            server.send_to(&buf[..len], peer).await.unwrap();
        });

        let reply = channel.send_and_await_reply(b"ping").await.unwrap();
        assert_eq!(reply, b"ping");
        responder.await.unwrap();

        // Reply socket is cleaned up
        assert!(!channel.config().reply_socket_path.exists());
    }

    #[tokio::test]
    async fn test_missing_daemon_socket() {
        let dir = TempDir::new().unwrap();
        let channel = channel_in(&dir, Duration::from_millis(200));

        let err = channel.send(b"hello").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DaemonUnavailable);
        assert!(err.to_string().contains("stpipc.sock"));
    }

    #[tokio::test]
    async fn test_reply_timeout() {
        let dir = TempDir::new().unwrap();
        let channel = channel_in(&dir, Duration::from_millis(100));
        let _server = UnixDatagram::bind(&channel.config().socket_path).unwrap();

        let err = channel.send_and_await_reply(b"hello").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DaemonUnavailable);
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_deliver_honours_await_reply() {
        let dir = TempDir::new().unwrap();
        let mut config = channel_in(&dir, Duration::from_millis(100)).config().clone();
        config.await_reply = true;
        let channel = DaemonChannel::new(config);
        let _server = UnixDatagram::bind(&channel.config().socket_path).unwrap();

        // Server never answers
        assert!(channel.deliver(b"x").await.is_err());
    }

    #[test]
    fn test_default_config() {
        let config = DaemonChannelConfig::default();
        assert_eq!(config.socket_path, PathBuf::from("/var/run/stpipc.sock"));
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert!(!config.await_reply);
    }
}
