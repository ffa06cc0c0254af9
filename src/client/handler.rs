//! Connection handler
//!
//! One handler runs per accepted connection and owns it for its whole life:
//!
//! `Connecting → Authenticating → Active → Closing → Closed`
//!
//! A failed handshake goes straight from `Authenticating` to `Closing`
//! without ever touching the registry.

use log::{debug, info, warn};
use std::fmt;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::watch;

use crate::auth::{CredentialStore, validate_login};
use crate::client::registry::ClientRegistry;
use crate::client::state::Client;
use crate::config::ServerConfig;
use crate::error::AuthError;
use crate::error::handlers::log_io_error;
use crate::protocol::responses::{self, ACCEPTED, REJECTED};
use crate::protocol::{Incoming, classify, trim_line_ending};

/// Shared collaborators every handler needs.
pub struct HandlerContext<W = OwnedWriteHalf> {
    pub registry: Arc<ClientRegistry<W>>,
    pub credentials: Arc<CredentialStore>,
    pub config: Arc<ServerConfig>,
}

impl<W> Clone for HandlerContext<W> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            credentials: Arc::clone(&self.credentials),
            config: Arc::clone(&self.config),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Authenticating,
    Active,
    Closing,
    Closed,
}

/// Why an active client left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// Zero-byte read
    PeerClosed,
    /// The peer sent the exit sentinel
    ExitRequested,
    /// The server is shutting down
    Shutdown,
    ReadFailed(io::ErrorKind),
}

impl Departure {
    /// Whether the remaining members hear a leave announcement.
    pub fn announces(&self) -> bool {
        !matches!(self, Departure::ReadFailed(_))
    }
}

impl fmt::Display for Departure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Departure::PeerClosed => write!(f, "peer closed the connection"),
            Departure::ExitRequested => write!(f, "exit requested"),
            Departure::Shutdown => write!(f, "server shutdown"),
            Departure::ReadFailed(kind) => write!(f, "read failed ({:?})", kind),
        }
    }
}

/// How a handler finished.
#[derive(Debug, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// Credentials refused; the peer got the rejection token
    Rejected(AuthError),
    /// The connection ended before a credential message arrived
    HandshakeAborted,
    /// Authenticated but the registry refused the entry
    RegistrationRefused,
    Departed(Departure),
}

/// Waits until the shutdown flag flips to `true`. Never resolves if the
/// sender is gone without signalling.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    let closed = shutdown.wait_for(|stop| *stop).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}

async fn close_writer<W: AsyncWrite + Unpin>(client: &Client, mut writer: W) {
    if let Err(e) = writer.shutdown().await {
        debug!("Shutdown of client {} failed: {}", client, e);
    }
}

/// Drives one connection from handshake to close.
pub struct ConnectionHandler<R, W = OwnedWriteHalf> {
    client: Client,
    reader: R,
    ctx: HandlerContext<W>,
    shutdown: watch::Receiver<bool>,
    state: ConnectionState,
}

impl<R, W> ConnectionHandler<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(
        client: Client,
        reader: R,
        ctx: HandlerContext<W>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            client,
            reader,
            ctx,
            shutdown,
            state: ConnectionState::Connecting,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    fn transition(&mut self, next: ConnectionState) {
        debug!("Client {}: {:?} -> {:?}", self.client, self.state, next);
        self.state = next;
    }

    /// Runs the handshake and, on success, the receive loop. `writer` is the
    /// sending side of the same connection.
    pub async fn run(mut self, mut writer: W) -> HandlerOutcome {
        self.transition(ConnectionState::Authenticating);

        let outcome = match self.authenticate(&mut writer).await {
            Ok(name) => self.join(name, writer).await,
            Err(outcome) => {
                self.transition(ConnectionState::Closing);
                close_writer(&self.client, writer).await;
                outcome
            }
        };

        self.transition(ConnectionState::Closed);
        info!("Client {} closed: {:?}", self.client, outcome);
        outcome
    }

    /// Reads one credential message and answers it.
    async fn authenticate(&mut self, writer: &mut W) -> Result<String, HandlerOutcome> {
        let mut buf = vec![0u8; self.ctx.config.buffer_size];

        let read = tokio::select! {
            read = self.reader.read(&mut buf) => read,
            _ = wait_for_shutdown(&mut self.shutdown) => {
                return Err(HandlerOutcome::HandshakeAborted);
            }
        };

        let n = match read {
            Ok(0) => {
                info!("Client {} disconnected during authentication", self.client);
                return Err(HandlerOutcome::HandshakeAborted);
            }
            Ok(n) => n,
            Err(e) => {
                log_io_error("Handshake read failed for", self.client.addr(), &e);
                return Err(HandlerOutcome::HandshakeAborted);
            }
        };

        match validate_login(
            &self.ctx.credentials,
            &buf[..n],
            self.ctx.config.max_field_length,
        ) {
            Ok(name) => {
                if let Err(e) = writer.write_all(ACCEPTED).await {
                    log_io_error("Failed to acknowledge", self.client.addr(), &e);
                    return Err(HandlerOutcome::HandshakeAborted);
                }
                info!("Authenticated client {} as {}", self.client, name);
                Ok(name)
            }
            Err(e) => {
                warn!("Authentication failed for {}: {}", self.client, e);
                if let Err(write_err) = writer.write_all(REJECTED).await {
                    log_io_error("Failed to reject", self.client.addr(), &write_err);
                }
                Err(HandlerOutcome::Rejected(e))
            }
        }
    }

    /// Registers the client, relays its messages, and deregisters it.
    async fn join(&mut self, name: String, writer: W) -> HandlerOutcome {
        let id = self.client.id();
        self.client.set_name(name.clone());

        if let Err(writer) = self.ctx.registry.add(self.client.clone(), writer).await {
            self.transition(ConnectionState::Closing);
            close_writer(&self.client, writer).await;
            return HandlerOutcome::RegistrationRefused;
        }
        self.transition(ConnectionState::Active);

        info!("{} has joined", name);
        self.ctx
            .registry
            .broadcast(responses::joined(&name).as_bytes(), id)
            .await;

        let departure = self.receive_loop(&name).await;
        self.transition(ConnectionState::Closing);

        if departure.announces() {
            let announcement = responses::left(&name);
            info!("{}", announcement.trim_end());
            self.ctx.registry.broadcast(announcement.as_bytes(), id).await;
        }

        if let Some(member) = self.ctx.registry.remove(id).await {
            close_writer(&self.client, member.into_writer()).await;
        }

        HandlerOutcome::Departed(departure)
    }

    async fn receive_loop(&mut self, name: &str) -> Departure {
        let id = self.client.id();
        let mut buf = vec![0u8; self.ctx.config.buffer_size];

        loop {
            let read = tokio::select! {
                read = self.reader.read(&mut buf) => read,
                _ = wait_for_shutdown(&mut self.shutdown) => return Departure::Shutdown,
            };

            match read {
                Ok(0) => return Departure::PeerClosed,
                Ok(n) => match classify(&buf[..n]) {
                    Incoming::Exit => return Departure::ExitRequested,
                    Incoming::Chat(payload) => {
                        self.ctx.registry.broadcast(payload, id).await;
                        info!(
                            "{}: {}",
                            name,
                            String::from_utf8_lossy(trim_line_ending(payload))
                        );
                    }
                },
                Err(e) => {
                    log_io_error("Read failed for", self.client.addr(), &e);
                    return Departure::ReadFailed(e.kind());
                }
            }
        }
    }
}

/// Splits an accepted TCP stream and runs its handler to completion.
pub async fn handle_client(
    stream: TcpStream,
    client: Client,
    ctx: HandlerContext,
    shutdown: watch::Receiver<bool>,
) -> HandlerOutcome {
    let (read_half, write_half) = stream.into_split();
    ConnectionHandler::new(client, read_half, ctx, shutdown)
        .run(write_half)
        .await
}
