//! Trailing-edge debounce on tokio timers.
//!
//! `schedule` arms a timer; scheduling again before it fires supersedes
//! (aborts) the earlier timer, so only the latest call within a quiet window
//! fires. Whatever the fired callback starts is not owned by the debouncer
//! and is never cancelled by it.
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;

pub struct Debouncer {
    window: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: Mutex::new(None),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Run `fire` once the window elapses without another `schedule` or
    /// `cancel`. Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let window = self.window;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            fire();
        });

        let superseded = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(timer);
        if let Some(previous) = superseded {
            previous.abort();
        }
    }

    /// Drop the pending timer, if any. Returns whether one was still armed.
    pub fn cancel(&self) -> bool {
        let pending = self.pending.lock().unwrap_or_else(|e| e.into_inner()).take();
        match pending {
            Some(timer) => {
                let armed = !timer.is_finished();
                timer.abort();
                armed
            }
            None => false,
        }
    }

    /// Whether a timer is armed and has not fired yet.
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(timer) = self.pending.get_mut().unwrap_or_else(|e| e.into_inner()).take() {
            timer.abort();
        }
    }
}

impl std::fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("window", &self.window)
            .field("pending", &self.is_pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    type Fired = Arc<Mutex<Vec<&'static str>>>;

    fn record(fired: &Fired, value: &'static str) -> impl FnOnce() + Send + 'static {
        let fired = fired.clone();
        move || fired.lock().unwrap().push(value)
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_latest_call_fires() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let fired: Fired = Arc::default();

        debouncer.schedule(record(&fired, "a"));
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.schedule(record(&fired, "ap"));
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.schedule(record(&fired, "app"));

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert!(fired.lock().unwrap().is_empty());
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(*fired.lock().unwrap(), vec!["app"]);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_calls_each_fire() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let fired: Fired = Arc::default();

        debouncer.schedule(record(&fired, "first"));
        tokio::time::sleep(Duration::from_millis(600)).await;
        debouncer.schedule(record(&fired, "second"));
        tokio::time::sleep(Duration::from_millis(600)).await;

        assert_eq!(*fired.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_fire() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let fired: Fired = Arc::default();

        debouncer.schedule(record(&fired, "x"));
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(fired.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_pending_timer() {
        let fired: Fired = Arc::default();
        {
            let debouncer = Debouncer::new(Duration::from_millis(50));
            debouncer.schedule(record(&fired, "x"));
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(fired.lock().unwrap().is_empty());
    }
}
