use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::fortune::{ArtRenderer, FortunePage, TextSource};
use crate::http::connection::{Connection, ConnectionOutcome, ConnectionSettings};

const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Accepts connections and hands each one to a [`Connection`].
///
/// At most `max_in_flight` connections exist at once. A permit is taken
/// before `accept` and returned only once the connection is closed, so with
/// a single permit the next client is not accepted until the previous one
/// has been fully served.
pub struct Server<T, R> {
    listener: TcpListener,
    page: Arc<FortunePage<T, R>>,
    settings: ConnectionSettings,
    permits: Arc<Semaphore>,
    max_in_flight: usize,
}

impl<T, R> Server<T, R>
where
    T: TextSource + 'static,
    R: ArtRenderer + 'static,
{
    pub async fn bind(cfg: &Config, page: FortunePage<T, R>) -> anyhow::Result<Self> {
        let addr = cfg.listen_socket_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;

        let max_in_flight = cfg.server.max_in_flight.max(1);

        Ok(Self {
            listener,
            page: Arc::new(page),
            settings: ConnectionSettings::from_config(cfg),
            permits: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves forever. Only returns if the listener becomes unusable.
    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.local_addr()?;
        info!(
            max_in_flight = self.max_in_flight,
            "Wisecow is ready and listening on {}", addr
        );

        loop {
            let permit = self
                .permits
                .clone()
                .acquire_owned()
                .await
                .context("connection semaphore closed")?;

            let (socket, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    drop(permit);
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    continue;
                }
            };
            info!("Accepted connection from {}", peer);

            let conn = Connection::new(socket, self.page.clone(), self.settings.clone());
            tokio::spawn(async move {
                match conn.run().await {
                    Ok(ConnectionOutcome::Served {
                        status,
                        content_length,
                        bytes,
                    }) => {
                        info!(
                            peer = %peer,
                            status = status.as_u16(),
                            content_length,
                            bytes,
                            "Response sent"
                        );
                    }
                    Ok(ConnectionOutcome::NoRequest) => {
                        debug!(peer = %peer, "Client closed without sending a request");
                    }
                    Err(e) => {
                        error!(peer = %peer, "Connection abandoned: {:#}", e);
                    }
                }
                drop(permit);
            });
        }
    }
}
