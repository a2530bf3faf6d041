//! Row queries and mutations against the `/rest/v1` interface.
//!
//! Filters use the PostgREST operator syntax (`column=eq.value`,
//! `column=ilike.pattern`). Ranges are sent as `offset`/`limit` and exact
//! counts via `Prefer: count=exact`, read back from `Content-Range`.
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use super::{content_range_total, Backend, BackendError};

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

impl Backend {
    /// Begin a select on `table` projecting `columns` (PostgREST `select=`).
    pub fn select<'a>(&'a self, table: &'a str, columns: &str) -> Select<'a> {
        Select {
            backend: self,
            table,
            columns: columns.split_whitespace().collect::<String>(),
            filters: Vec::new(),
            order: Vec::new(),
            range: None,
            exact_count: false,
        }
    }

    /// Begin an insert, upsert, update or delete on `table`.
    pub fn mutate<'a>(&'a self, table: &'a str) -> Mutation<'a> {
        Mutation {
            backend: self,
            table,
            filters: Vec::new(),
        }
    }
}

fn push_filter(filters: &mut Vec<(String, String)>, column: &str, op: &str, value: String) {
    filters.push((column.to_string(), format!("{}.{}", op, value)));
}

// ============================================================================
// Select
// ============================================================================

/// Builder for a read query. Consumed by one of the terminal methods.
#[must_use]
pub struct Select<'a> {
    backend: &'a Backend,
    table: &'a str,
    columns: String,
    filters: Vec<(String, String)>,
    order: Vec<String>,
    range: Option<(u64, u64)>,
    exact_count: bool,
}

impl<'a> Select<'a> {
    pub fn eq(mut self, column: &str, value: impl std::fmt::Display) -> Self {
        push_filter(&mut self.filters, column, "eq", value.to_string());
        self
    }

    /// Case-insensitive pattern match; `pattern` uses SQL `%`/`_` wildcards.
    pub fn ilike(mut self, column: &str, pattern: &str) -> Self {
        push_filter(&mut self.filters, column, "ilike", pattern.to_string());
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.order.push(format!("{}.{}", column, direction));
        self
    }

    /// Inclusive row range `[from, to]`, zero-based.
    pub fn range(mut self, from: u64, to: u64) -> Self {
        self.range = Some((from, to));
        self
    }

    /// Ask the server for the exact number of matching rows.
    pub fn exact_count(mut self) -> Self {
        self.exact_count = true;
        self
    }

    fn url(&self) -> Result<Url, BackendError> {
        let mut url = self.backend.rest_url(self.table)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", &self.columns);
            for (column, filter) in &self.filters {
                pairs.append_pair(column, filter);
            }
            if !self.order.is_empty() {
                pairs.append_pair("order", &self.order.join(","));
            }
            if let Some((from, to)) = self.range {
                let limit = (to + 1).saturating_sub(from);
                pairs.append_pair("offset", &from.to_string());
                pairs.append_pair("limit", &limit.to_string());
            }
        }
        Ok(url)
    }

    fn build(&self, method: Method) -> Result<reqwest::RequestBuilder, BackendError> {
        let mut request = self.backend.request(method, self.url()?);
        if self.exact_count {
            request = request.header("Prefer", "count=exact");
        }
        Ok(request)
    }

    /// Fetch all matching rows.
    pub async fn fetch<T: DeserializeOwned>(self) -> Result<Vec<T>, BackendError> {
        let request = self.build(Method::GET)?;
        let response = self.backend.send(request).await?;
        Backend::read_json(response).await
    }

    /// Fetch matching rows together with the exact total (if the server sent one).
    pub async fn fetch_counted<T: DeserializeOwned>(
        self,
    ) -> Result<(Vec<T>, Option<u64>), BackendError> {
        let select = self.exact_count();
        let request = select.build(Method::GET)?;
        let response = select.backend.send(request).await?;
        let total = content_range_total(response.headers());
        let rows = Backend::read_json(response).await?;
        Ok((rows, total))
    }

    /// Count matching rows without transferring them (HEAD request).
    pub async fn count(self) -> Result<u64, BackendError> {
        let select = self.exact_count();
        let request = select.build(Method::HEAD)?;
        let response = select.backend.send(request).await?;
        content_range_total(response.headers()).ok_or(BackendError::MissingCount)
    }

    /// Fetch exactly one row; zero rows is an error (see [`BackendError::is_no_rows`]).
    pub async fn single<T: DeserializeOwned>(self) -> Result<T, BackendError> {
        let request = self.build(Method::GET)?.header("Accept", SINGLE_OBJECT);
        let response = self.backend.send(request).await?;
        Backend::read_json(response).await
    }

    /// Like [`Select::single`] but zero rows yields `None`.
    pub async fn maybe_single<T: DeserializeOwned>(self) -> Result<Option<T>, BackendError> {
        match self.single().await {
            Ok(row) => Ok(Some(row)),
            Err(e) if e.is_no_rows() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// ============================================================================
// Mutation
// ============================================================================

/// Builder for a write. Filters only apply to `update` and `delete`.
#[must_use]
pub struct Mutation<'a> {
    backend: &'a Backend,
    table: &'a str,
    filters: Vec<(String, String)>,
}

impl<'a> Mutation<'a> {
    pub fn eq(mut self, column: &str, value: impl std::fmt::Display) -> Self {
        push_filter(&mut self.filters, column, "eq", value.to_string());
        self
    }

    fn url(&self, extra: &[(&str, &str)]) -> Result<Url, BackendError> {
        let mut url = self.backend.rest_url(self.table)?;
        if !self.filters.is_empty() || !extra.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (column, filter) in &self.filters {
                pairs.append_pair(column, filter);
            }
            for (key, value) in extra {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn with_body<B: Serialize + ?Sized>(
        request: reqwest::RequestBuilder,
        body: &B,
    ) -> Result<reqwest::RequestBuilder, BackendError> {
        Ok(request
            .header("Content-Type", "application/json")
            .body(serde_json::to_vec(body)?))
    }

    /// Insert rows and return the stored representation.
    pub async fn insert<B, T>(self, rows: &B) -> Result<Vec<T>, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .backend
            .request(Method::POST, self.url(&[])?)
            .header("Prefer", "return=representation");
        let response = self.backend.send(Self::with_body(request, rows)?).await?;
        Backend::read_json(response).await
    }

    /// Insert rows without reading them back.
    pub async fn insert_minimal<B: Serialize + ?Sized>(self, rows: &B) -> Result<(), BackendError> {
        let request = self
            .backend
            .request(Method::POST, self.url(&[])?)
            .header("Prefer", "return=minimal");
        self.backend.send(Self::with_body(request, rows)?).await?;
        Ok(())
    }

    /// Insert-or-update keyed by the unique constraint over `on_conflict`
    /// (comma-separated column list).
    pub async fn upsert<B: Serialize + ?Sized>(
        self,
        on_conflict: &str,
        rows: &B,
    ) -> Result<(), BackendError> {
        let request = self
            .backend
            .request(Method::POST, self.url(&[("on_conflict", on_conflict)])?)
            .header("Prefer", "resolution=merge-duplicates,return=minimal");
        self.backend.send(Self::with_body(request, rows)?).await?;
        Ok(())
    }

    pub async fn update<B: Serialize + ?Sized>(self, patch: &B) -> Result<(), BackendError> {
        let request = self
            .backend
            .request(Method::PATCH, self.url(&[])?)
            .header("Prefer", "return=minimal");
        self.backend.send(Self::with_body(request, patch)?).await?;
        Ok(())
    }

    pub async fn delete(self) -> Result<(), BackendError> {
        let request = self.backend.request(Method::DELETE, self.url(&[])?);
        self.backend.send(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn backend() -> Backend {
        Backend::new("https://example.com", SecretString::from("k")).unwrap()
    }

    fn query_of(url: &Url) -> Vec<(String, String)> {
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn test_select_url_with_range_and_order() {
        let backend = backend();
        let url = backend
            .select("recipes", "*, ratings(rating)")
            .order("created_at", false)
            .range(3, 5)
            .url()
            .unwrap();
        assert_eq!(url.path(), "/rest/v1/recipes");
        assert_eq!(
            query_of(&url),
            vec![
                ("select".to_string(), "*,ratings(rating)".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
                ("offset".to_string(), "3".to_string()),
                ("limit".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_select_filters() {
        let backend = backend();
        let url = backend
            .select("recipes", "*")
            .eq("hilight", true)
            .ilike("title", "%cake%")
            .url()
            .unwrap();
        let pairs = query_of(&url);
        assert!(pairs.contains(&("hilight".to_string(), "eq.true".to_string())));
        assert!(pairs.contains(&("title".to_string(), "ilike.%cake%".to_string())));
    }

    #[test]
    fn test_mutation_url_with_conflict_target() {
        let backend = backend();
        let url = backend
            .mutate("ratings")
            .url(&[("on_conflict", "recipe_id,user_id")])
            .unwrap();
        assert_eq!(
            query_of(&url),
            vec![("on_conflict".to_string(), "recipe_id,user_id".to_string())]
        );
    }
}
