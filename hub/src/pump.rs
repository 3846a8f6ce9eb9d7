use std::{panic::AssertUnwindSafe, time::Duration};

use axum::{
    body::Bytes,
    extract::ws::{Message, WebSocket},
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use tokio::{
    sync::mpsc,
    time::{Instant, MissedTickBehavior, interval_at, timeout},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::{entity::ClientKind, relay::Hub};

/// Writer pump: the sole owner of the socket sink. Drains the connection's
/// send queue, keeps the peer alive with periodic pings, and enforces the
/// per-write deadline. Exits on write failure, queue close or cancellation;
/// the reader then terminates on the ensuing socket error.
pub async fn run_writer(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<String>,
    cancel: CancellationToken,
    ping_period: Duration,
    write_wait: Duration,
) {
    let mut ping = interval_at(Instant::now() + ping_period, ping_period);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = timeout(write_wait, sink.send(Message::Close(None))).await;
                break;
            }
            frame = rx.recv() => {
                let Some(frame) = frame else {
                    let _ = timeout(write_wait, sink.send(Message::Close(None))).await;
                    break;
                };
                match timeout(write_wait, sink.send(Message::Text(frame.into()))).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        debug!(error = ?e, "Write failed, closing connection");
                        break;
                    }
                    Err(_) => {
                        debug!("Write deadline expired, closing connection");
                        break;
                    }
                }
            }
            _ = ping.tick() => {
                match timeout(write_wait, sink.send(Message::Ping(Bytes::new()))).await {
                    Ok(Ok(())) => {}
                    Ok(Err(_)) | Err(_) => break,
                }
            }
        }
    }
}

/// Reader pump: applies the idle deadline, decodes text frames and routes
/// them inline on this task. Returns when the connection is done; the caller
/// runs unregistration. The reader itself never mutates entity state.
pub async fn run_reader(
    hub: &Hub,
    kind: ClientKind,
    client_id: &str,
    mut stream: SplitStream<WebSocket>,
    pong_wait: Duration,
) {
    loop {
        let frame = match timeout(pong_wait, stream.next()).await {
            Err(_) => {
                debug!(client = %client_id, "Liveness deadline expired");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                debug!(client = %client_id, error = ?e, "Read failed");
                break;
            }
            Ok(Some(Ok(frame))) => frame,
        };

        match frame {
            // Inspectors are read-only observers; their frames consume no
            // router state.
            Message::Text(_) if kind == ClientKind::Inspector => {}
            Message::Text(text) => {
                // A routing panic must only cost this one connection.
                let routed = std::panic::catch_unwind(AssertUnwindSafe(|| {
                    hub.handle_frame(kind, client_id, text.as_str());
                }));
                if routed.is_err() {
                    error!(client = %client_id, "Router panicked, dropping connection");
                    break;
                }
            }
            Message::Close(_) => break,
            // Pings and pongs only refresh the liveness deadline above.
            Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
        }
    }
}
