use std::future::{pending, Future};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Deadline and cancellation signal threaded through every store call.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    signal: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

/// Owner side of a [`Cancellation`].
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.sender.send(true);
    }
}

impl Cancellation {
    /// A token that never fires.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            signal: None,
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// A token fired by the returned handle.
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (CancelHandle, Self) {
        let (sender, receiver) = watch::channel(false);
        (
            CancelHandle { sender },
            Self {
                signal: Some(receiver),
                deadline: None,
            },
        )
    }

    pub fn is_cancelled(&self) -> bool {
        let signalled = self
            .signal
            .as_ref()
            .map(|receiver| *receiver.borrow())
            .unwrap_or(false);
        let expired = self
            .deadline
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false);
        signalled || expired
    }

    /// Resolves once the token fires.
    pub async fn cancelled(&self) {
        let signal = async {
            match self.signal.clone() {
                Some(mut receiver) => loop {
                    if *receiver.borrow_and_update() {
                        return;
                    }
                    if receiver.changed().await.is_err() {
                        pending::<()>().await;
                    }
                },
                None => pending::<()>().await,
            }
        };
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };
        tokio::select! {
            _ = signal => {}
            _ = deadline => {}
        }
    }

    /// Runs `future` unless the token fires first.
    pub async fn guard<F>(&self, future: F) -> Result<F::Output, Cancelled>
    where
        F: Future,
    {
        if self.is_cancelled() {
            return Err(Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(Cancelled),
            output = future => Ok(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn none_never_fires() {
        let token = Cancellation::none();
        assert!(!token.is_cancelled());
        assert_eq!(token.guard(async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn handle_aborts_pending_work() {
        let (handle, token) = Cancellation::new();
        let waiting = tokio::spawn({
            let token = token.clone();
            async move { token.guard(pending::<()>()).await }
        });
        handle.cancel();
        assert_eq!(waiting.await.unwrap(), Err(Cancelled));
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_fires() {
        let token = Cancellation::with_timeout(Duration::from_millis(20));
        let result = token
            .guard(tokio::time::sleep(Duration::from_secs(5)))
            .await;
        assert_eq!(result, Err(Cancelled));
    }

    #[tokio::test]
    async fn dropped_handle_does_not_cancel() {
        let (handle, token) = Cancellation::new();
        drop(handle);
        assert_eq!(token.guard(async { "done" }).await, Ok("done"));
    }
}
