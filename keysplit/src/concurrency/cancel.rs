use tokio::sync::watch;

/// Transmitter side of the cancellation channel.
///
/// [`CancelTx`] asks a running split pass to stop between two records. Rows already handed to an
/// output target are flushed before the pass returns, so every output keeps a valid prefix of
/// its rows.
#[derive(Debug, Clone)]
pub struct CancelTx(watch::Sender<bool>);

impl CancelTx {
    /// Wraps a watch sender into a [`CancelTx`].
    pub fn new(tx: watch::Sender<bool>) -> Self {
        Self(tx)
    }

    /// Requests cancellation of every pass holding a receiver.
    pub fn cancel(&self) {
        // Infallible send so cancelling works before any receiver subscribes.
        self.0.send_replace(true);
    }

    /// Creates a new cancellation receiver subscription.
    pub fn subscribe(&self) -> CancelRx {
        CancelRx(self.0.subscribe())
    }
}

/// Receiver side of the cancellation channel.
#[derive(Debug, Clone)]
pub struct CancelRx(watch::Receiver<bool>);

impl CancelRx {
    /// Returns `true` once cancellation was requested.
    ///
    /// Never blocks, so it can be polled from the synchronous scan loop.
    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }
}

/// Creates a new cancellation channel.
pub fn create_cancel_channel() -> (CancelTx, CancelRx) {
    let (tx, rx) = watch::channel(false);
    (CancelTx::new(tx), CancelRx(rx))
}
