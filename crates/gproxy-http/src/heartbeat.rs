use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use gproxy_bridge::error::BridgeError;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::HttpError;

const SSE_HEARTBEAT_FRAME: &[u8] = b": keep-alive\n\n";

/// Interleaves `: keep-alive\n\n` comment frames into an SSE body stream on `proxy.sse.
/// heartbeatInterval` (default 30s per the settings catalog) so idle reverse proxies and clients
/// don't time out the connection while the upstream is slow to produce the next token.
pub fn wrap_with_heartbeat(
    mut upstream: ReceiverStream<Result<Bytes, BridgeError>>,
    interval: Duration,
) -> ReceiverStream<Result<Bytes, HttpError>> {
    let (tx, rx) = mpsc::channel::<Result<Bytes, HttpError>>(32);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                maybe_chunk = upstream.next() => {
                    let Some(chunk) = maybe_chunk else { break };
                    if tx.send(chunk.map_err(HttpError::Bridge)).await.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if tx.send(Ok(Bytes::from_static(SSE_HEARTBEAT_FRAME))).await.is_err() {
                        break;
                    }
                }
            }
        }
    });
    ReceiverStream::new(rx)
}
