//! REST client for the hosted data service.
//!
//! Speaks the PostgREST dialect: one endpoint per table under `/rest/v1`,
//! filters as query parameters, `Prefer: return=representation` to get the
//! affected rows back from writes.

mod query;

pub use query::*;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Collection;

/// Remote data service errors.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Error body returned by the service.
#[derive(Debug, Deserialize)]
struct ServiceError {
    message: Option<String>,
}

/// Client for the hosted tables.
pub struct RemoteStore {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    api_key: String,
}

impl RemoteStore {
    /// Create a client for the project at `url` (without the `/rest/v1` suffix).
    pub fn new(url: &str, api_key: String) -> Self {
        log::info!("Creating remote store client for {}", url);
        Self {
            client: Client::new(),
            base_url: format!("{}/rest/v1", url.trim_end_matches('/')),
            api_key,
        }
    }

    fn table_url(&self, collection: Collection) -> String {
        format!("{}/{}", self.base_url, collection.table())
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    /// Probe reachability with a one-row read.
    pub async fn ping(&self) -> RemoteResult<()> {
        let query = Select::new().limit(1);
        self.select::<serde_json::Value>(Collection::Leftovers, &query)
            .await
            .map(|_| ())
    }

    /// Run a single select.
    pub async fn select<R: DeserializeOwned>(
        &self,
        collection: Collection,
        query: &Select,
    ) -> RemoteResult<Vec<R>> {
        let url = self.table_url(collection);
        log::debug!("GET {} {:?}", url, query.to_query());

        let response = self
            .authorized(self.client.get(&url))
            .query(&query.to_query())
            .send()
            .await?;

        decode_rows(check_status(response).await?).await
    }

    /// Read every matching row, one page of [`PAGE_SIZE`] at a time, until a
    /// short page comes back.
    pub async fn select_all<R: DeserializeOwned>(
        &self,
        collection: Collection,
        query: &Select,
    ) -> RemoteResult<Vec<R>> {
        let mut rows = Vec::new();
        let mut from = 0;

        loop {
            let page_query = query.clone().range(from, from + PAGE_SIZE - 1);
            let page: Vec<R> = self.select(collection, &page_query).await?;
            let page_len = page.len();
            rows.extend(page);

            if page_len < PAGE_SIZE {
                break;
            }
            from += PAGE_SIZE;
        }

        log::debug!("Fetched {} rows from {}", rows.len(), collection.table());
        Ok(rows)
    }

    /// Insert one row and return it as stored.
    pub async fn insert<D: Serialize + Sync, R: DeserializeOwned>(
        &self,
        collection: Collection,
        draft: &D,
    ) -> RemoteResult<R> {
        let response = self
            .authorized(self.client.post(self.table_url(collection)))
            .header("Prefer", "return=representation")
            .json(&[draft])
            .send()
            .await?;

        let rows: Vec<R> = decode_rows(check_status(response).await?).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RemoteError::Decode("insert returned no rows".into()))
    }

    /// Patch the row with `id`; returns the number of rows affected.
    pub async fn update<P: Serialize + Sync>(
        &self,
        collection: Collection,
        id: &str,
        patch: &P,
    ) -> RemoteResult<usize> {
        let response = self
            .authorized(self.client.patch(self.table_url(collection)))
            .header("Prefer", "return=representation")
            .query(&[("id", format!("eq.{}", id))])
            .json(patch)
            .send()
            .await?;

        count_rows(check_status(response).await?).await
    }

    /// Delete the row with `id`; returns the number of rows affected.
    pub async fn delete(&self, collection: Collection, id: &str) -> RemoteResult<usize> {
        self.delete_where(collection, ("id", format!("eq.{}", id)))
            .await
    }

    /// Delete every row of a collection.
    pub async fn delete_all(&self, collection: Collection) -> RemoteResult<usize> {
        self.delete_where(collection, ("id", "neq.".to_string()))
            .await
    }

    async fn delete_where(
        &self,
        collection: Collection,
        filter: (&str, String),
    ) -> RemoteResult<usize> {
        let response = self
            .authorized(self.client.delete(self.table_url(collection)))
            .header("Prefer", "return=representation")
            .query(&[filter])
            .send()
            .await?;

        count_rows(check_status(response).await?).await
    }
}

async fn check_status(response: Response) -> RemoteResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ServiceError>(&body)
        .ok()
        .and_then(|e| e.message)
        .unwrap_or(body);
    log::warn!("Remote store returned {}: {}", status, message);

    Err(RemoteError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn decode_rows<R: DeserializeOwned>(response: Response) -> RemoteResult<Vec<R>> {
    let body = response.text().await?;
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&body).map_err(|e| RemoteError::Decode(e.to_string()))
}

async fn count_rows(response: Response) -> RemoteResult<usize> {
    let rows: Vec<serde_json::Value> = decode_rows(response).await?;
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalization() {
        let store = RemoteStore::new("https://example.supabase.co/", "key".into());
        assert_eq!(store.base_url, "https://example.supabase.co/rest/v1");
        assert_eq!(
            store.table_url(Collection::Medications),
            "https://example.supabase.co/rest/v1/medications"
        );
    }
}
