//! Background fetches owned by a screen.
//!
//! A screen spawns its passive loads through [`ScreenTasks`]. Results come
//! back over a channel that the UI loop drains every tick. Restarting or
//! dropping the tasks cancels whatever is still in flight, so a response for
//! a screen that has since reloaded can never overwrite newer state.

use std::future::Future;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct ScreenTasks<M> {
    token: CancellationToken,
    tx: mpsc::UnboundedSender<M>,
    rx: mpsc::UnboundedReceiver<M>,
    pending: usize,
}

impl<M: Send + 'static> Default for ScreenTasks<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Send + 'static> ScreenTasks<M> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            token: CancellationToken::new(),
            tx,
            rx,
            pending: 0,
        }
    }

    /// Runs `fut` on the runtime; its output is delivered by [`drain`](Self::drain).
    pub fn spawn<F>(&mut self, fut: F)
    where
        F: Future<Output = M> + Send + 'static,
    {
        let token = self.token.clone();
        let tx = self.tx.clone();
        self.pending += 1;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => debug!("screen fetch cancelled"),
                message = fut => {
                    // The receiver is gone once the screen was dropped.
                    let _ = tx.send(message);
                }
            }
        });
    }

    /// Cancels everything in flight and starts from a clean channel.
    pub fn restart(&mut self) {
        self.token.cancel();
        *self = Self::new();
    }

    pub fn drain(&mut self) -> Vec<M> {
        let mut messages = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            self.pending = self.pending.saturating_sub(1);
            messages.push(message);
        }
        messages
    }

    pub fn is_loading(&self) -> bool {
        self.pending > 0
    }

    #[cfg(test)]
    pub async fn next(&mut self) -> Option<M> {
        let message = self.rx.recv().await;
        if message.is_some() {
            self.pending = self.pending.saturating_sub(1);
        }
        message
    }
}

impl<M> Drop for ScreenTasks<M> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn results_are_delivered() {
        let mut tasks = ScreenTasks::new();
        tasks.spawn(async { 1 });
        tasks.spawn(async { 2 });
        assert!(tasks.is_loading());

        let mut seen = vec![tasks.next().await.unwrap(), tasks.next().await.unwrap()];
        seen.sort();
        assert_eq!(seen, vec![1, 2]);
        assert!(!tasks.is_loading());
    }

    #[tokio::test]
    async fn restart_discards_stale_results() {
        let mut tasks = ScreenTasks::new();
        tasks.spawn(async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            "stale"
        });
        tasks.restart();
        assert!(!tasks.is_loading());

        tasks.spawn(async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            "fresh"
        });
        assert_eq!(tasks.next().await, Some("fresh"));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(tasks.drain().is_empty());
    }

    #[tokio::test]
    async fn dropping_cancels_in_flight_work() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();
        {
            let mut tasks = ScreenTasks::new();
            tasks.spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                flag.store(true, Ordering::SeqCst);
            });
        }
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn drain_is_empty_while_pending() {
        let mut tasks: ScreenTasks<u8> = ScreenTasks::new();
        tasks.spawn(async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            7
        });
        assert!(tasks.drain().is_empty());
        assert!(tasks.is_loading());
    }
}
