//! Debounced title search layered over the feed.
//!
//! The overlay owns its own result list. It never reads or writes the feed's
//! pagination state, so clearing the filter hands the untouched feed list
//! back without a re-fetch.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;

use super::debounce::Debouncer;
use super::fetcher::{fetch_page, FeedPage};
use crate::recipes::{Recipe, RecipeStore};

/// Debounce window applied to keystrokes unless configured otherwise.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Default)]
struct OverlayState {
    query: String,
    results: Vec<Recipe>,
    has_more: bool,
    total: Option<u64>,
    /// Bumped on every clear; searches dispatched under an older value are stale
    generation: u64,
}

#[derive(Debug)]
struct Shared {
    store: RecipeStore,
    page_size: u64,
    state: Mutex<OverlayState>,
    in_flight: AtomicUsize,
    settled: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, OverlayState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Decrements the in-flight count even if the search task is aborted.
struct InFlight(Arc<Shared>);

impl InFlight {
    fn start(shared: Arc<Shared>) -> Self {
        shared.in_flight.fetch_add(1, Ordering::SeqCst);
        Self(shared)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.0.settled.notify_waiters();
    }
}

#[derive(Debug)]
pub struct SearchOverlay {
    shared: Arc<Shared>,
    debouncer: Debouncer,
}

impl SearchOverlay {
    pub fn new(store: RecipeStore, page_size: u64, debounce: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                page_size: page_size.max(1),
                state: Mutex::new(OverlayState::default()),
                in_flight: AtomicUsize::new(0),
                settled: Notify::new(),
            }),
            debouncer: Debouncer::new(debounce),
        }
    }

    /// Update the filter text.
    ///
    /// Non-blank text (re)arms the debounce timer; when it fires, one search
    /// for the latest text is dispatched. Blank text cancels any pending
    /// timer and clears the overlay immediately. Must be called from within
    /// a tokio runtime.
    pub fn set_query(&self, text: &str) {
        if text.trim().is_empty() {
            self.clear();
            return;
        }

        let generation = {
            let mut state = self.shared.lock();
            state.query = text.to_string();
            state.generation
        };

        let shared = self.shared.clone();
        let text = text.trim().to_string();
        self.debouncer.schedule(move || {
            // Counted before the task exists so `is_searching` has no gap
            let guard = InFlight::start(shared.clone());
            tokio::spawn(run_search(shared, text, generation, guard));
        });
    }

    /// Cancel any pending search and drop the current results.
    pub fn clear(&self) {
        let cancelled = self.debouncer.cancel();
        {
            let mut state = self.shared.lock();
            state.query.clear();
            state.results.clear();
            state.has_more = false;
            state.total = None;
            state.generation += 1;
        }
        if cancelled {
            tracing::debug!("Pending search cancelled by clear");
        }
        self.shared.settled.notify_waiters();
    }

    /// Dispatch a search for `text` now, bypassing the debounce, and wait for
    /// its results to be applied.
    pub async fn search_now(&self, text: &str) -> Vec<Recipe> {
        if text.trim().is_empty() {
            self.clear();
            return Vec::new();
        }
        self.debouncer.cancel();
        let generation = {
            let mut state = self.shared.lock();
            state.query = text.to_string();
            state.generation
        };
        let guard = InFlight::start(self.shared.clone());
        run_search(self.shared.clone(), text.trim().to_string(), generation, guard).await;
        self.results()
    }

    /// True while the filter holds non-blank text.
    pub fn is_active(&self) -> bool {
        !self.shared.lock().query.trim().is_empty()
    }

    /// True while at least one dispatched search has not returned.
    pub fn is_searching(&self) -> bool {
        self.shared.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn query(&self) -> String {
        self.shared.lock().query.clone()
    }

    pub fn results(&self) -> Vec<Recipe> {
        self.shared.lock().results.clone()
    }

    pub fn has_more(&self) -> bool {
        self.shared.lock().has_more
    }

    pub fn total(&self) -> Option<u64> {
        self.shared.lock().total
    }

    /// Wait until no timer is armed and no search is in flight.
    pub async fn settled(&self) {
        loop {
            let notified = self.shared.settled.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            // Pending is checked first: a fired timer has already counted its search
            if !self.debouncer.is_pending() && !self.is_searching() {
                return;
            }
            if self.debouncer.is_pending() {
                // The timer fires without notifying; poll again after the window
                tokio::select! {
                    _ = &mut notified => {}
                    _ = tokio::time::sleep(self.debouncer.window()) => {}
                }
            } else {
                notified.await;
            }
        }
    }
}

async fn run_search(shared: Arc<Shared>, text: String, generation: u64, _guard: InFlight) {
    tracing::debug!(query = %text, "Dispatching search");
    let FeedPage {
        recipes,
        has_more,
        total,
    } = fetch_page(&shared.store, 0, shared.page_size, Some(&text)).await;

    let mut state = shared.lock();
    if state.generation != generation {
        tracing::debug!(query = %text, "Filter cleared while searching, dropping results");
        return;
    }
    // Arrival order decides: a slower, older search may overwrite a newer one
    tracing::debug!(query = %text, returned = recipes.len(), "Applying search results");
    state.results = recipes;
    state.has_more = has_more;
    state.total = total;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use secrecy::SecretString;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn overlay(server: &MockServer, window: Duration) -> SearchOverlay {
        let backend = Backend::new(&server.uri(), SecretString::from("anon")).unwrap();
        SearchOverlay::new(RecipeStore::new(backend), 3, window)
    }

    fn one_row(title: &str) -> serde_json::Value {
        serde_json::json!([{
            "id": 1,
            "title": title,
            "created_at": "2024-05-01T12:00:00+00:00",
        }])
    }

    #[tokio::test]
    async fn test_blank_query_clears_synchronously() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(one_row("x")))
            .expect(0)
            .mount(&server)
            .await;

        let overlay = overlay(&server, Duration::from_millis(50));
        overlay.set_query("cake");
        assert!(overlay.is_active());
        overlay.set_query("   ");
        assert!(!overlay.is_active());
        assert!(overlay.results().is_empty());

        tokio::time::sleep(Duration::from_millis(150)).await;
        overlay.settled().await;
        assert!(overlay.results().is_empty());
    }

    #[tokio::test]
    async fn test_results_after_clear_are_dropped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("title", "ilike.%cake%"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(one_row("Cake"))
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let overlay = overlay(&server, Duration::from_millis(20));
        overlay.set_query("cake");
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(overlay.is_searching());

        overlay.clear();
        overlay.settled().await;
        assert!(!overlay.is_searching());
        assert!(overlay.results().is_empty());
    }

    #[tokio::test]
    async fn test_search_now_applies_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("title", "ilike.%pie%"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(one_row("Apple pie"))
                    .insert_header("Content-Range", "0-0/1"),
            )
            .mount(&server)
            .await;

        let overlay = overlay(&server, Duration::from_secs(5));
        let results = overlay.search_now("pie").await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Apple pie");
        assert_eq!(overlay.total(), Some(1));
        assert!(!overlay.has_more());
        assert!(!overlay.is_searching());
    }
}
