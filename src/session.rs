use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::event::RawEvent;
use crate::slack::{SelfIdentity, SlackMethods};

/// Where raw frames come from. The RTM WebSocket in production.
#[async_trait]
pub trait EventSource: Send {
    /// The next event, or `None` once the peer has closed the stream.
    async fn next_frame(&mut self) -> Result<Option<RawEvent>>;

    async fn close(&mut self) -> Result<()>;
}

pub struct WebSocketSource {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WebSocketSource {
    pub fn new(stream: WebSocketStream<MaybeTlsStream<TcpStream>>) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl EventSource for WebSocketSource {
    async fn next_frame(&mut self) -> Result<Option<RawEvent>> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(RawEvent::from_text(text.as_str()))),
                Some(Ok(Message::Close(frame))) => {
                    debug!("RTM socket closed by server: {:?}", frame);
                    return Ok(None);
                }
                None => return Ok(None),
                Some(Ok(Message::Ping(data))) => {
                    self.stream.send(Message::Pong(data)).await?;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}

/// RTM URLs are `wss://`; rustls needs a process-level provider before the
/// first TLS handshake. Installing twice is a no-op.
fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closed,
}

/// The one live RTM connection. Once closed it stays closed; reconnecting
/// means calling [`Session::connect`] again.
pub struct Session {
    source: Box<dyn EventSource>,
    identity: SelfIdentity,
    state: SessionState,
}

impl Session {
    /// Request an RTM URL and open the WebSocket.
    pub async fn connect(api: &dyn SlackMethods) -> Result<Self> {
        install_crypto_provider();

        let rtm = api.rtm_connect().await?;
        info!(
            "Connected to Slack as {} ({})",
            rtm.identity.name, rtm.identity.id
        );

        let (stream, _response) = connect_async(rtm.url.as_str())
            .await
            .map_err(|e| Error::Connection(format!("RTM WebSocket handshake failed: {}", e)))?;

        Ok(Self::new(Box::new(WebSocketSource::new(stream)), rtm.identity))
    }

    pub fn new(source: Box<dyn EventSource>, identity: SelfIdentity) -> Self {
        Self {
            source,
            identity,
            state: SessionState::Open,
        }
    }

    pub fn identity(&self) -> &SelfIdentity {
        &self.identity
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state() == SessionState::Open
    }

    /// Pull the next raw event. Any transport failure or peer close leaves the
    /// session closed.
    pub async fn next_event(&mut self) -> Result<RawEvent> {
        if !self.is_open() {
            return Err(Error::ConnectionClosed);
        }

        match self.source.next_frame().await {
            Ok(Some(event)) => Ok(event),
            Ok(None) => {
                info!("RTM connection closed by peer");
                self.state = SessionState::Closed;
                Err(Error::ConnectionClosed)
            }
            Err(e) => {
                self.state = SessionState::Closed;
                Err(e)
            }
        }
    }

    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;
        if let Err(e) = self.source.close().await {
            debug!("Error while closing RTM socket: {}", e);
        }
    }
}
