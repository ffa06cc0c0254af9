use log::{error, info, warn};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};

use crate::auth::CredentialStore;
use crate::client::{
    Client, ClientIds, ClientRegistry, HandlerContext, HandlerOutcome, handle_client,
};
use crate::config::ServerConfig;
use crate::error::ServerError;

const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

pub struct Server {
    listener: TcpListener,
    registry: Arc<ClientRegistry>,
    credentials: Arc<CredentialStore>,
    config: Arc<ServerConfig>,
    ids: ClientIds,
}

impl Server {
    /// Binds the listener on the configured address and `port`.
    pub async fn bind(
        port: u16,
        config: ServerConfig,
        credentials: CredentialStore,
    ) -> Result<Self, ServerError> {
        let addr = config.listen_socket(port);

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        info!("Server bound to {}", addr);

        Ok(Self {
            listener,
            registry: Arc::new(ClientRegistry::new(config.max_clients)),
            credentials: Arc::new(credentials),
            config: Arc::new(config),
            ids: ClientIds::new(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared handle to the registry, e.g. for observing membership.
    pub fn registry(&self) -> Arc<ClientRegistry> {
        Arc::clone(&self.registry)
    }

    fn context(&self) -> HandlerContext {
        HandlerContext {
            registry: Arc::clone(&self.registry),
            credentials: Arc::clone(&self.credentials),
            config: Arc::clone(&self.config),
        }
    }

    /// Runs the accept loop forever.
    pub async fn run(self) {
        self.run_until(std::future::pending()).await;
    }

    /// Runs the accept loop until `shutdown` resolves, then signals every
    /// handler to leave and waits for all of them.
    pub async fn run_until<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut handlers = JoinSet::new();
        let delay = self.config.accept_delay();
        tokio::pin!(shutdown);

        info!(
            "Starting RAX chat server (max {} clients)",
            self.registry.capacity()
        );

        loop {
            while let Some(result) = handlers.try_join_next() {
                reap(result);
            }

            let (stream, addr) = tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::select! {
                            _ = &mut shutdown => break,
                            _ = tokio::time::sleep(accept_error_backoff(delay)) => {}
                        }
                        continue;
                    }
                },
            };

            let Some(slot) = self.registry.try_reserve() else {
                warn!("Max clients reached. Rejected: {}", addr);
                drop(stream);
                continue;
            };

            let client = Client::new(self.ids.next_id(), addr);
            info!(
                "Accepted client {} ({}/{} slots in use)",
                client,
                self.registry.capacity() - self.registry.available_slots(),
                self.registry.capacity()
            );

            let ctx = self.context();
            let stop = stop_rx.clone();
            handlers.spawn(async move {
                let outcome = handle_client(stream, client, ctx, stop).await;
                drop(slot);
                outcome
            });

            if !delay.is_zero() {
                tokio::select! {
                    _ = &mut shutdown => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        info!(
            "Shutting down, waiting for {} connection(s)",
            handlers.len()
        );
        let _ = stop_tx.send(true);

        while let Some(result) = handlers.join_next().await {
            reap(result);
        }
        info!("Server stopped");
    }
}

/// Pause after a failed accept. Never zero, so a persistent failure such as
/// running out of file descriptors cannot spin the loop.
fn accept_error_backoff(delay: Duration) -> Duration {
    delay.max(ACCEPT_ERROR_BACKOFF)
}

fn reap(result: Result<HandlerOutcome, JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            error!("Connection handler panicked: {}", e);
        } else {
            warn!("Connection handler cancelled: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let result = Server::bind(port, ServerConfig::default(), CredentialStore::default()).await;
        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }

    #[test]
    fn test_accept_error_backoff_is_never_zero() {
        assert_eq!(accept_error_backoff(Duration::ZERO), ACCEPT_ERROR_BACKOFF);
        assert_eq!(
            accept_error_backoff(Duration::from_secs(1)),
            Duration::from_secs(1)
        );
    }

    #[tokio::test]
    async fn test_run_serves_clients() {
        let config = ServerConfig {
            accept_delay_ms: 0,
            ..ServerConfig::default()
        };
        let credentials = CredentialStore::from_entries([("alice", "pw1"), ("bob", "pw2")]);
        let server = Server::bind(0, config, credentials).await.unwrap();
        let addr = server.local_addr().unwrap();
        let registry = server.registry();
        let handle = tokio::spawn(server.run());

        let mut alice = TcpStream::connect(addr).await.unwrap();
        alice.write_all(b"alice pw1").await.unwrap();
        let mut token = [0u8; 3];
        alice.read_exact(&mut token).await.unwrap();
        assert_eq!(&token, b"OK\n");
        while registry.len().await != 1 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let mut bob = TcpStream::connect(addr).await.unwrap();
        bob.write_all(b"bob pw2").await.unwrap();
        bob.read_exact(&mut token).await.unwrap();
        assert_eq!(&token, b"OK\n");

        let mut joined = [0u8; 15];
        alice.read_exact(&mut joined).await.unwrap();
        assert_eq!(&joined, b"bob has joined\n");
        assert_eq!(registry.len().await, 2);

        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_handle_client_quit() {
        let config = ServerConfig {
            accept_delay_ms: 0,
            ..ServerConfig::default()
        };
        let credentials = CredentialStore::from_entries([("alice", "pw1")]);
        let server = Server::bind(0, config, credentials).await.unwrap();
        let addr = server.local_addr().unwrap();
        let registry = server.registry();

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(server.run_until(async {
            let _ = stop_rx.await;
        }));

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"alice pw1").await.unwrap();
        let mut token = [0u8; 3];
        client.read_exact(&mut token).await.unwrap();
        assert_eq!(&token, b"OK\n");

        client.write_all(b"exit").await.unwrap();
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());

        stop_tx.send(()).unwrap();
        handle.await.unwrap();
        assert!(registry.is_empty().await);
        assert_eq!(registry.available_slots(), registry.capacity());
    }
}
