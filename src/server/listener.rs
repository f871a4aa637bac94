use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::info;

use crate::proxy::ProxyHandler;
use crate::server::connection;

/// Pause after a failed accept. Errors like EMFILE persist until some
/// connection closes, and retrying at once would spin the loop.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

pub async fn bind(addr: &str) -> anyhow::Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Accept connections until `shutdown` resolves, then drain.
///
/// In-flight requests are allowed to finish; idle keep-alive connections are
/// closed. Switched WebSocket tunnels are not tracked here.
pub async fn run(
    listener: TcpListener,
    handler: Arc<ProxyHandler>,
    shutdown: impl Future<Output = ()>,
) -> anyhow::Result<()> {
    let (stop_tx, stop_rx) = watch::channel(false);
    let mut connections = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                        continue;
                    }
                };
                tracing::debug!("Accepted connection from {}", peer);

                connections.spawn(connection::serve(
                    socket,
                    peer,
                    Arc::clone(&handler),
                    stop_rx.clone(),
                ));
            }

            _ = &mut shutdown => break,
        }

        while connections.try_join_next().is_some() {}
    }

    drop(listener);
    info!(connections = connections.len(), "Draining connections");
    // Receivers only error once the sender is gone, so this cannot fail
    let _ = stop_tx.send(true);
    while connections.join_next().await.is_some() {}
    info!("All connections closed");

    Ok(())
}
