use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;

use super::fetcher::{fetch_page, FeedPage, DEFAULT_PAGE_SIZE};
use super::search::{SearchOverlay, DEFAULT_SEARCH_DEBOUNCE};
use crate::recipes::{localized_label, Category, Condition, Recipe, RecipeError, RecipeStore};
use crate::session::SessionContext;

// ============================================================================
// Types
// ============================================================================

/// What the feed is currently fetching. Only one fetch runs at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedPhase {
    #[default]
    Idle,
    LoadingInitial,
    LoadingMore,
    Refreshing,
}

#[derive(Debug, Clone, Copy)]
pub struct FeedOptions {
    pub page_size: u64,
    pub search_debounce: Duration,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
        }
    }
}

/// Point-in-time copy of the controller state.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSnapshot {
    pub phase: FeedPhase,
    /// Last page that contributed records (zero-based)
    pub page: u64,
    pub total: Option<u64>,
    pub has_more: bool,
    /// Accumulated feed list, independent of any search
    pub recipes: Vec<Recipe>,
    pub highlighted: Vec<Recipe>,
    /// Non-blank search text, if a search is active
    pub search_query: Option<String>,
    pub searching: bool,
}

#[derive(Debug, Default)]
struct FeedState {
    phase: FeedPhase,
    page: u64,
    total: Option<u64>,
    has_more: bool,
    recipes: Vec<Recipe>,
    highlighted: Vec<Recipe>,
    conditions: Vec<Condition>,
    categories: Vec<Category>,
}

/// Returns the phase to `Idle` and wakes waiters when a fetch ends, including
/// when the fetching future is dropped midway.
struct PhaseGuard<'a> {
    controller: &'a FeedController,
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.controller.lock().phase = FeedPhase::Idle;
        self.controller.idle.notify_waiters();
    }
}

// ============================================================================
// Controller
// ============================================================================

/// Owns the feed list and its pagination cursor and merges fetched pages.
///
/// Initial load, load-more and refresh are mutually exclusive: load-more is
/// dropped while anything else runs, and refresh waits its turn.
#[derive(Debug)]
pub struct FeedController {
    store: RecipeStore,
    session: SessionContext,
    page_size: u64,
    state: Mutex<FeedState>,
    idle: Notify,
    search: SearchOverlay,
}

/// Lists refreshed alongside page 0.
struct SideLists {
    highlighted: Result<Vec<Recipe>, RecipeError>,
    conditions: Result<Vec<Condition>, RecipeError>,
    categories: Result<Vec<Category>, RecipeError>,
}

impl FeedController {
    pub fn new(store: RecipeStore, session: SessionContext, options: FeedOptions) -> Self {
        let store = store.with_session(&session);
        let page_size = options.page_size.max(1);
        Self {
            search: SearchOverlay::new(store.clone(), page_size, options.search_debounce),
            store,
            session,
            page_size,
            state: Mutex::new(FeedState::default()),
            idle: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Move from `Idle` to `phase`. Returns `None` if something else is running.
    fn begin(&self, phase: FeedPhase) -> Option<PhaseGuard<'_>> {
        let mut state = self.lock();
        if state.phase != FeedPhase::Idle {
            return None;
        }
        state.phase = phase;
        Some(PhaseGuard { controller: self })
    }

    async fn fetch_first_page(&self) -> (FeedPage, SideLists) {
        let (page, highlighted, conditions, categories) = tokio::join!(
            fetch_page(&self.store, 0, self.page_size, None),
            self.store.highlighted_recipes(),
            self.store.conditions(),
            self.store.categories(),
        );
        (
            page,
            SideLists {
                highlighted,
                conditions,
                categories,
            },
        )
    }

    /// Replace the feed with page 0. Side lists that failed keep their
    /// previous contents.
    fn apply_first_page(&self, page: FeedPage, side: SideLists) {
        let mut state = self.lock();
        state.page = 0;
        state.total = page.total;
        state.has_more = page.has_more;
        state.recipes = page.recipes;

        match side.highlighted {
            Ok(highlighted) => state.highlighted = highlighted,
            Err(e) => tracing::warn!(error = %e, "Highlighted feed fetch failed, keeping previous"),
        }
        match side.conditions {
            Ok(conditions) => state.conditions = conditions,
            Err(e) => tracing::warn!(error = %e, "Conditions fetch failed, keeping previous"),
        }
        match side.categories {
            Ok(categories) => state.categories = categories,
            Err(e) => tracing::warn!(error = %e, "Categories fetch failed, keeping previous"),
        }
    }

    /// Load page 0, the highlighted feed and the reference tables.
    ///
    /// Returns `false` without fetching if another fetch is running.
    pub async fn initial_load(&self) -> bool {
        let Some(_phase) = self.begin(FeedPhase::LoadingInitial) else {
            tracing::debug!("Initial load skipped, fetch already running");
            return false;
        };
        let (page, side) = self.fetch_first_page().await;
        tracing::info!(
            returned = page.recipes.len(),
            total = ?page.total,
            "Feed loaded"
        );
        self.apply_first_page(page, side);
        true
    }

    /// Append the next page.
    ///
    /// A no-op returning `false` unless the controller is idle and more
    /// records may exist. The cursor only advances when the page was non-empty.
    pub async fn load_more(&self) -> bool {
        let next = {
            let mut state = self.lock();
            if state.phase != FeedPhase::Idle || !state.has_more {
                return false;
            }
            state.phase = FeedPhase::LoadingMore;
            state.page + 1
        };
        let _phase = PhaseGuard { controller: self };

        let page = fetch_page(&self.store, next, self.page_size, None).await;

        let mut state = self.lock();
        if !page.recipes.is_empty() {
            state.page = next;
        }
        state.has_more = page.has_more;
        if page.total.is_some() {
            state.total = page.total;
        }
        tracing::debug!(
            page = next,
            returned = page.recipes.len(),
            has_more = page.has_more,
            "Appending feed page"
        );
        state.recipes.extend(page.recipes);
        true
    }

    /// Reload from page 0, replacing the feed list.
    ///
    /// Waits for a running initial load or load-more to finish first. If a
    /// refresh is already running, waits for that one instead of starting
    /// another.
    pub async fn refresh(&self) {
        let _phase = loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let joined = {
                let mut state = self.lock();
                match state.phase {
                    FeedPhase::Idle => {
                        // Cursor and list stay untouched until page 0 lands.
                        state.phase = FeedPhase::Refreshing;
                        break PhaseGuard { controller: self };
                    }
                    FeedPhase::Refreshing => true,
                    FeedPhase::LoadingInitial | FeedPhase::LoadingMore => false,
                }
            };

            notified.await;
            if joined {
                tracing::debug!("Joined a refresh already in progress");
                return;
            }
        };

        let (page, side) = self.fetch_first_page().await;
        tracing::info!(
            returned = page.recipes.len(),
            total = ?page.total,
            "Feed refreshed"
        );
        self.apply_first_page(page, side);
    }

    // ------------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------------

    /// Forward filter text to the search overlay (debounced; blank clears).
    pub fn set_search_query(&self, text: &str) {
        self.search.set_query(text);
    }

    pub fn search(&self) -> &SearchOverlay {
        &self.search
    }

    pub fn is_searching(&self) -> bool {
        self.search.is_searching()
    }

    // ------------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------------

    /// The list to show: search results while a filter is active, else the feed.
    pub fn displayed(&self) -> Vec<Recipe> {
        if self.search.is_active() {
            self.search.results()
        } else {
            self.lock().recipes.clone()
        }
    }

    pub fn phase(&self) -> FeedPhase {
        self.lock().phase
    }

    pub fn has_more(&self) -> bool {
        self.lock().has_more
    }

    pub fn highlighted(&self) -> Vec<Recipe> {
        self.lock().highlighted.clone()
    }

    pub fn conditions(&self) -> Vec<Condition> {
        self.lock().conditions.clone()
    }

    pub fn categories(&self) -> Vec<Category> {
        self.lock().categories.clone()
    }

    /// Difficulty label of `recipe` in the session language.
    pub fn difficulty_label(&self, recipe: &Recipe) -> Option<String> {
        let state = self.lock();
        localized_label(&state.conditions, recipe.difficulty, self.session.language)
            .map(str::to_string)
    }

    pub fn category_label(&self, recipe: &Recipe) -> Option<String> {
        let state = self.lock();
        localized_label(&state.categories, recipe.category_id, self.session.language)
            .map(str::to_string)
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn store(&self) -> &RecipeStore {
        &self.store
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        let query = self.search.query();
        let state = self.lock();
        FeedSnapshot {
            phase: state.phase,
            page: state.page,
            total: state.total,
            has_more: state.has_more,
            recipes: state.recipes.clone(),
            highlighted: state.highlighted.clone(),
            search_query: Some(query).filter(|q| !q.trim().is_empty()),
            searching: self.search.is_searching(),
        }
    }
}
