//! Cancellable quiet-period timers.

use std::future::Future;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;

/// Runs an action once a logical stream has been quiet for a delay.
///
/// Scheduling on a stream cancels whatever was still waiting on that stream.
/// When the quiet period elapses the action is spawned as its own task, so a
/// later schedule never interrupts an action that has already started.
#[derive(Default)]
pub struct Debouncer {
    pending: DashMap<String, JoinHandle<()>>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` after `delay` unless `stream` is rescheduled or cancelled first.
    pub fn schedule_after_quiet<F, Fut>(&self, stream: &str, delay: Duration, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(action());
        });

        if let Some(previous) = self.pending.insert(stream.to_string(), timer) {
            previous.abort();
        }
    }

    /// Drop the waiting action on `stream`. Returns whether one was still waiting.
    pub fn cancel(&self, stream: &str) -> bool {
        match self.pending.remove(stream) {
            Some((_, timer)) => {
                let waiting = !timer.is_finished();
                timer.abort();
                waiting
            }
            None => false,
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        for timer in self.pending.iter() {
            timer.value().abort();
        }
    }
}
