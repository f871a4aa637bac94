use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use url::Url;

/// Splice a switched client connection to the switched upstream connection.
///
/// Bytes are copied in both directions until either side closes. Frames are
/// never inspected.
pub async fn splice(client: OnUpgrade, upstream: reqwest::Response, target: Url) {
    let (client, upstream) = tokio::join!(client, upstream.upgrade());

    let (client, mut upstream) = match (client, upstream) {
        (Ok(client), Ok(upstream)) => (client, upstream),
        (Err(e), _) => {
            tracing::warn!(url = %target, error = %e, "Client upgrade failed");
            return;
        }
        (_, Err(e)) => {
            tracing::warn!(url = %target, error = %e, "Upstream upgrade failed");
            return;
        }
    };

    let mut client = TokioIo::new(client);
    match tokio::io::copy_bidirectional(&mut client, &mut upstream).await {
        Ok((from_client, from_upstream)) => {
            tracing::debug!(
                url = %target,
                from_client,
                from_upstream,
                "WebSocket tunnel closed"
            );
        }
        Err(e) => {
            tracing::debug!(url = %target, error = %e, "WebSocket tunnel aborted");
        }
    }
}
