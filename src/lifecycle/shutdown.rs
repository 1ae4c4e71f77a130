//! Shutdown coordination for both services.

use tokio::sync::broadcast;

/// One-shot stop signal shared by a service's server and its signal task.
///
/// `run` on either server takes a receiver from `subscribe`; `trigger` makes
/// axum stop accepting and drain in-flight requests.
#[derive(Clone)]
pub struct Shutdown {
    sender: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    /// Signal every current subscriber. A no-op when nobody listens.
    pub fn trigger(&self) {
        if self.sender.send(()).is_err() {
            tracing::debug!("Shutdown triggered with no running server");
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Shutdown::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clones_share_one_signal() {
        let shutdown = Shutdown::new();
        let signal_side = shutdown.clone();
        let mut server = shutdown.subscribe();

        signal_side.trigger();
        assert!(server.recv().await.is_ok());
    }

    #[test]
    fn test_trigger_without_subscribers_is_harmless() {
        Shutdown::new().trigger();
    }
}
