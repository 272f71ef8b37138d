//! Synchronous request/response over the device connection
//!
//! The Pixelblaze never tags a reply with the request it answers, so
//! attribution rests on two rules:
//!
//! 1. At most one request is outstanding. The connection sits behind an async
//!    mutex and every exchange holds the guard from send to last receive.
//! 2. Every request that expects a reply drains the inbound queue first, so a
//!    frame left over from earlier traffic cannot be taken for the new reply.
//!
//! Plain sends skip the drain: they expect nothing back and run on the
//! high-frequency output path.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::debug;

use crate::connection::{ClientConfig, Connection, TcpTransport};
use crate::error::Result;
use crate::frame::{Frame, FrameKind};

/// Command/response engine shared by all device operations
pub struct RequestClient<S = TcpTransport> {
    connection: Mutex<Connection<S>>,
    config: ClientConfig,
}

impl RequestClient<TcpTransport> {
    /// Open a connection to `address` and wrap it
    pub async fn connect(address: &str, config: ClientConfig) -> Result<Self> {
        let connection = Connection::open(address, config).await?;
        Ok(Self::new(connection))
    }
}

impl<S> RequestClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(connection: Connection<S>) -> Self {
        let config = *connection.config();
        Self {
            connection: Mutex::new(connection),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether the connection is still open.
    ///
    /// Waits for any exchange in progress to finish.
    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_connected()
    }

    /// Send a command that has no reply
    pub async fn send(&self, command: &str) -> Result<()> {
        self.connection.lock().await.send_text(command).await
    }

    /// Send a command and wait up to `wait` for a reply of the given kind.
    ///
    /// `Ok(None)` means no matching reply arrived in time.
    pub async fn request(
        &self,
        command: &str,
        kind: FrameKind,
        wait: Duration,
    ) -> Result<Option<Frame>> {
        let mut connection = self.lock().await;
        connection.flush().await?;
        connection.send_text(command).await?;

        let reply = connection.receive(kind, wait).await?;
        if reply.is_none() {
            debug!("No {:?} reply to {} within {:?}", kind, command, wait);
        }
        Ok(reply)
    }

    /// Send a command and gather every reply of the given kind that arrives
    /// within `wait`.
    pub async fn request_all(
        &self,
        command: &str,
        kind: FrameKind,
        wait: Duration,
    ) -> Result<Vec<Frame>> {
        let mut connection = self.lock().await;
        connection.flush().await?;
        connection.send_text(command).await?;

        let deadline = Instant::now() + wait;
        let mut replies = Vec::new();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match connection.receive(kind, remaining).await? {
                Some(frame) => replies.push(frame),
                None => break,
            }
        }

        debug!("Collected {} {:?} repl(ies) to {}", replies.len(), kind, command);
        Ok(replies)
    }

    /// Close the connection
    pub async fn close(&self) -> Result<()> {
        self.connection.lock().await.close().await
    }

    /// Exclusive access for exchanges spanning several receives
    pub(crate) async fn lock(&self) -> MutexGuard<'_, Connection<S>> {
        self.connection.lock().await
    }
}
