//! Shared stop signal for the edge listener and the admin API.

use tokio::sync::broadcast;

/// One-shot broadcast fired once on SIGINT/SIGTERM. Each server task holds
/// its own receiver and drains in-flight requests when it fires.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Fire the signal. Firing with no listeners left is a no-op.
    pub fn trigger(&self) {
        if self.tx.send(()).is_err() {
            tracing::debug!("Shutdown triggered with no running servers");
        }
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_reaches_edge_and_admin_receivers() {
        let shutdown = Shutdown::new();
        let mut edge = shutdown.subscribe();
        let mut admin = edge.resubscribe();
        assert_eq!(shutdown.receiver_count(), 2);

        shutdown.trigger();
        assert!(edge.recv().await.is_ok());
        assert!(admin.recv().await.is_ok());
    }

    #[test]
    fn test_trigger_without_receivers_is_harmless() {
        Shutdown::default().trigger();
    }
}
