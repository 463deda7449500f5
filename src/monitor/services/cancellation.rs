//! Cooperative cancellation of in-flight dispatches.

use tokio::sync::watch;

/// Owner side of a cancellation signal.
#[derive(Debug)]
pub struct DispatchCanceller {
    sender: watch::Sender<bool>,
}

impl DispatchCanceller {
    /// Creates a signal that has not fired.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    /// Returns a token observing this signal.
    #[must_use]
    pub fn token(&self) -> DispatchCancellation {
        DispatchCancellation {
            receiver: Some(self.sender.subscribe()),
        }
    }

    /// Fires the signal. Later calls have no effect.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

impl Default for DispatchCanceller {
    fn default() -> Self {
        Self::new()
    }
}

/// Token checked by the dispatcher between units.
#[derive(Debug, Clone)]
pub struct DispatchCancellation {
    receiver: Option<watch::Receiver<bool>>,
}

impl DispatchCancellation {
    /// Returns a token that never fires.
    #[must_use]
    pub const fn never() -> Self {
        Self { receiver: None }
    }

    /// Returns whether the signal has fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.receiver
            .as_ref()
            .is_some_and(|receiver| *receiver.borrow())
    }

    /// Completes once the signal fires.
    ///
    /// Pends forever when the canceller is dropped without firing.
    pub async fn cancelled(&self) {
        let Some(receiver) = &self.receiver else {
            return std::future::pending().await;
        };
        let mut receiver = receiver.clone();
        if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
