//! WebSocket connection to a Pixelblaze
//!
//! Owns the transport, reads frames of a wanted kind with a bounded wait,
//! and drains stale frames ahead of a request. There is no background reader:
//! every inbound frame is pulled by an outbound call.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::{timeout, timeout_at, Instant};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async_with_config, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

use crate::error::{ControlError, Result};
use crate::frame::{self, Frame, FrameKind};

/// Stream type of a network connection
pub type TcpTransport = MaybeTlsStream<TcpStream>;

/// Default Pixelblaze WebSocket port
pub const DEFAULT_PORT: u16 = 81;

/// Connection timing and addressing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// WebSocket port on the device
    pub port: u16,
    /// Bound on opening the connection
    pub connect_timeout: Duration,
    /// Window used to discard stale frames before a request
    pub drain_timeout: Duration,
    /// Default wait for a reply
    pub recv_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(5),
            drain_timeout: Duration::from_millis(100),
            recv_timeout: Duration::from_secs(1),
        }
    }
}

/// Connectivity of a [`Connection`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Closed,
}

/// One persistent WebSocket connection
pub struct Connection<S = TcpTransport> {
    stream: WebSocketStream<S>,
    state: ConnectionState,
    config: ClientConfig,
}

impl Connection<TcpTransport> {
    /// Open a connection to the Pixelblaze at `address` (IP or host name)
    pub async fn open(address: &str, config: ClientConfig) -> Result<Self> {
        let url = format!("ws://{}:{}", address, config.port);

        // Nagle off: commands are small and latency sensitive
        let (stream, _response) =
            timeout(config.connect_timeout, connect_async_with_config(url.as_str(), None, true))
                .await
                .map_err(|_| ControlError::ConnectTimeout(url.clone()))??;

        info!("Connected to Pixelblaze at {}", url);

        Ok(Self::new(stream, config))
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already established WebSocket stream
    pub fn new(stream: WebSocketStream<S>, config: ClientConfig) -> Self {
        Self {
            stream,
            state: ConnectionState::Open,
            config,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Open
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send one text frame
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.ensure_open()?;

        trace!("-> {}", text);
        if let Err(e) = self.stream.send(Message::Text(text.to_owned())).await {
            return Err(self.fail(e));
        }
        Ok(())
    }

    /// Wait for the next frame of the wanted kind.
    ///
    /// Frames of any other kind are dropped. Returns `Ok(None)` once `wait`
    /// has elapsed; dropped frames do not extend the deadline.
    pub async fn receive(&mut self, wanted: FrameKind, wait: Duration) -> Result<Option<Frame>> {
        self.ensure_open()?;

        let deadline = Instant::now() + wait;
        loop {
            // A steady stream of ready frames must not outlive the deadline
            if Instant::now() >= deadline {
                return Ok(None);
            }
            let Ok(next) = timeout_at(deadline, self.stream.next()).await else {
                return Ok(None);
            };

            let message = match next {
                Some(Ok(Message::Close(close))) => {
                    let reason = close
                        .map(|c| format!("close frame ({})", c.code))
                        .unwrap_or_else(|| "close frame".to_string());
                    return Err(self.mark_closed(&reason));
                }
                Some(Ok(message)) => message,
                Some(Err(e)) => return Err(self.fail_read(e)),
                None => return Err(self.mark_closed("end of stream")),
            };

            match frame::classify(message, wanted).into_frame() {
                Some(frame) => return Ok(Some(frame)),
                None => trace!("Discarding frame while waiting for {:?}", wanted),
            }
        }
    }

    /// Discard every frame that arrives within the drain window.
    ///
    /// Returns the number of frames dropped. Only fails if the connection
    /// closes while draining.
    pub async fn flush(&mut self) -> Result<usize> {
        self.ensure_open()?;

        let deadline = Instant::now() + self.config.drain_timeout;
        let mut discarded = 0;
        while Instant::now() < deadline {
            let Ok(next) = timeout_at(deadline, self.stream.next()).await else {
                break;
            };

            match next {
                Some(Ok(Message::Close(_))) => return Err(self.mark_closed("close frame")),
                Some(Ok(_)) => discarded += 1,
                Some(Err(e)) => return Err(self.fail_read(e)),
                None => return Err(self.mark_closed("end of stream")),
            }
        }

        if discarded > 0 {
            debug!("Drained {} stale frame(s)", discarded);
        }
        Ok(discarded)
    }

    /// Close the connection. Closing twice is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == ConnectionState::Closed {
            return Ok(());
        }
        self.state = ConnectionState::Closed;

        if let Err(e) = self.stream.close(None).await {
            debug!("Error while closing WebSocket: {}", e);
        }
        info!("Pixelblaze connection closed");
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            ConnectionState::Open => Ok(()),
            ConnectionState::Closed => Err(ControlError::ConnectionClosed),
        }
    }

    /// Map an outbound error, flipping the state if the connection is gone
    fn fail(&mut self, error: WsError) -> ControlError {
        match error {
            WsError::ConnectionClosed
            | WsError::AlreadyClosed
            | WsError::Io(_)
            | WsError::Protocol(_) => self.mark_closed(&error.to_string()),
            other => ControlError::WebSocket(other),
        }
    }

    /// Map an inbound error. The stream yields nothing after its first read
    /// error (a corrupt frame included), so every read error ends the
    /// connection.
    fn fail_read(&mut self, error: WsError) -> ControlError {
        self.mark_closed(&error.to_string())
    }

    fn mark_closed(&mut self, reason: &str) -> ControlError {
        if self.state == ConnectionState::Open {
            self.state = ConnectionState::Closed;
            warn!("Pixelblaze connection lost: {}", reason);
        }
        ControlError::ConnectionClosed
    }
}
