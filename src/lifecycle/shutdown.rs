//! Stop signal shared by long-running tasks.

use std::sync::Arc;

use tokio::sync::watch;

/// Process-wide stop flag.
///
/// Backed by a watch channel: a listener created after [`Shutdown::trigger`]
/// still sees the flag set, so a task started late cannot miss the stop.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

/// One task's view of the stop flag.
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Number of listeners still alive.
    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownListener {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the stop flag is set (immediately if it already is).
    pub async fn recv(&mut self) {
        // A dropped coordinator also means stop.
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }
}
