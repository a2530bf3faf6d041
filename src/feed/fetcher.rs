use crate::backend::BackendError;
use crate::recipes::{Recipe, RecipeStore};

/// Records per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: u64 = 3;

/// One page of the feed, ready to merge into the displayed list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedPage {
    /// Records in server order (newest first), ratings already averaged
    pub recipes: Vec<Recipe>,
    /// Whether a further page may hold records
    pub has_more: bool,
    /// Exact number of matching records, when known
    pub total: Option<u64>,
}

impl FeedPage {
    fn exhausted(total: Option<u64>) -> Self {
        Self {
            recipes: Vec::new(),
            has_more: false,
            total,
        }
    }
}

/// Fetch page `page` (zero-based) of the feed, optionally filtered by title.
///
/// Unfiltered, this asks for the exact total first and skips the range query
/// entirely when the page starts at or past the end. Filtered, a single ranged
/// query carries the count with it.
///
/// Never fails: any transport, status or decode error is logged and yields an
/// empty page with `has_more == false`, so a broken backend reads as the end
/// of the feed rather than an endless spinner.
pub async fn fetch_page(
    store: &RecipeStore,
    page: u64,
    page_size: u64,
    filter: Option<&str>,
) -> FeedPage {
    let filter = filter.map(str::trim).filter(|f| !f.is_empty());
    match try_fetch_page(store, page, page_size.max(1), filter).await {
        Ok(fetched) => fetched,
        Err(e) => {
            tracing::warn!(
                error = %e,
                page = page,
                filtered = filter.is_some(),
                "Feed page fetch failed, treating as end of feed"
            );
            FeedPage::exhausted(None)
        }
    }
}

async fn try_fetch_page(
    store: &RecipeStore,
    page: u64,
    page_size: u64,
    filter: Option<&str>,
) -> Result<FeedPage, BackendError> {
    let start = page.saturating_mul(page_size);
    let end = start.saturating_add(page_size - 1);

    if let Some(text) = filter {
        let (recipes, total) = store.search_in_range(text, start, end).await?;
        let has_more = match total {
            Some(total) => start.saturating_add(page_size) < total,
            // Without a count, a full page is the only hint that more exist
            None => recipes.len() as u64 == page_size,
        };
        tracing::debug!(page, returned = recipes.len(), ?total, "Fetched search page");
        return Ok(FeedPage {
            recipes,
            has_more,
            total,
        });
    }

    let total = store.count_recipes().await?;
    if start >= total {
        tracing::debug!(page, total, "Page starts past the end, skipping range query");
        return Ok(FeedPage::exhausted(Some(total)));
    }

    let recipes = store.recipes_in_range(start, end).await?;
    tracing::debug!(page, returned = recipes.len(), total, "Fetched feed page");
    Ok(FeedPage {
        recipes,
        has_more: start.saturating_add(page_size) < total,
        total: Some(total),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use pretty_assertions::assert_eq;
    use secrecy::SecretString;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rows(ids: std::ops::RangeInclusive<i64>) -> serde_json::Value {
        ids.map(|id| {
            serde_json::json!({
                "id": id,
                "title": format!("Recipe {}", id),
                "created_at": "2024-05-01T12:00:00+00:00",
                "recipe_images": [],
                "ratings": [{"rating": 4}, {"rating": 5}]
            })
        })
        .collect()
    }

    fn store(server: &MockServer) -> RecipeStore {
        RecipeStore::new(Backend::new(&server.uri(), SecretString::from("anon")).unwrap())
    }

    async fn mount_count(server: &MockServer, total: u64) {
        Mock::given(method("HEAD"))
            .and(path("/rest/v1/recipes"))
            .respond_with(
                ResponseTemplate::new(200).insert_header("Content-Range", format!("*/{}", total)),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_empty_table_skips_range_query() {
        let server = MockServer::start().await;
        mount_count(&server, 0).await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows(1..=3)))
            .expect(0)
            .mount(&server)
            .await;

        let page = fetch_page(&store(&server), 0, 3, None).await;
        assert_eq!(page, FeedPage::exhausted(Some(0)));
    }

    #[tokio::test]
    async fn test_seven_records_in_pages_of_three() {
        let server = MockServer::start().await;
        mount_count(&server, 7).await;
        for (offset, ids) in [("0", 1..=3), ("3", 4..=6), ("6", 7..=7)] {
            Mock::given(method("GET"))
                .and(path("/rest/v1/recipes"))
                .and(query_param("offset", offset))
                .and(query_param("limit", "3"))
                .and(query_param("order", "created_at.desc"))
                .respond_with(ResponseTemplate::new(200).set_body_json(rows(ids)))
                .expect(1)
                .mount(&server)
                .await;
        }
        let store = store(&server);

        let first = fetch_page(&store, 0, 3, None).await;
        assert_eq!(first.recipes.len(), 3);
        assert!(first.has_more);
        assert_eq!(first.total, Some(7));
        assert_eq!(first.recipes[0].average_rating, 4.5);

        let second = fetch_page(&store, 1, 3, None).await;
        assert_eq!(second.recipes.len(), 3);
        assert!(second.has_more);

        let third = fetch_page(&store, 2, 3, None).await;
        assert_eq!(third.recipes.len(), 1);
        assert!(!third.has_more);
    }

    #[tokio::test]
    async fn test_page_past_end_is_not_requested() {
        let server = MockServer::start().await;
        mount_count(&server, 6).await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows(1..=3)))
            .expect(0)
            .mount(&server)
            .await;

        let page = fetch_page(&store(&server), 2, 3, None).await;
        assert!(page.recipes.is_empty());
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn test_failures_fail_closed() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let page = fetch_page(&store(&server), 0, 3, None).await;
        assert_eq!(page, FeedPage::exhausted(None));
    }

    #[tokio::test]
    async fn test_malformed_rows_fail_closed() {
        let server = MockServer::start().await;
        mount_count(&server, 5).await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"not\": \"a list\"}"))
            .mount(&server)
            .await;

        let page = fetch_page(&store(&server), 0, 3, None).await;
        assert!(page.recipes.is_empty());
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn test_filtered_page_uses_single_counted_query() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).insert_header("Content-Range", "*/99"))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/recipes"))
            .and(query_param("title", "ilike.%cake%"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(rows(1..=3))
                    .insert_header("Content-Range", "0-2/4"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let page = fetch_page(&store(&server), 0, 3, Some("  cake ")).await;
        assert_eq!(page.recipes.len(), 3);
        assert_eq!(page.total, Some(4));
        assert!(page.has_more);
    }
}
