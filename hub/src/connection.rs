use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Write-side handle of one client connection: a bounded queue of serialized
/// envelopes drained by the connection's writer pump, plus a token for
/// server-initiated teardown (admin delete).
///
/// Producers only ever enqueue without blocking; when the queue is full the
/// envelope is dropped. That is the backpressure policy: bounded per-client
/// buffering, never block the router.
#[derive(Clone)]
pub struct ConnectionHandle {
    tx: mpsc::Sender<String>,
    cancel: CancellationToken,
}

impl ConnectionHandle {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        let handle = Self {
            tx,
            cancel: CancellationToken::new(),
        };
        (handle, rx)
    }

    /// Non-blocking enqueue. Returns false when the frame was dropped
    /// because the queue is full or the writer is gone.
    pub fn try_send(&self, frame: String) -> bool {
        self.tx.try_send(frame).is_ok()
    }

    /// Signals the writer pump to close the socket.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }
}
