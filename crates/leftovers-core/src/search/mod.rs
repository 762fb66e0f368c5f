//! Debounced medication search.
//!
//! Each keystroke replaces the pending lookup: the previous debounce timer is
//! cancelled and a new one starts. Once a lookup has been dispatched it runs
//! to completion, so results are published together with the query that
//! produced them and subscribers decide whether they are still current.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch};

use crate::gateway::{Gateway, GatewayResult};
use crate::models::Medication;

/// Quiet interval after the last keystroke before a lookup is dispatched.
pub const DEBOUNCE: Duration = Duration::from_millis(300);

/// Queries shorter than this (after trimming) never reach the backing store.
pub const MIN_QUERY_CHARS: usize = 2;

/// Result cap for catalog lookups.
pub const MAX_RESULTS: usize = 20;

/// Anything that can look up medications by name.
pub trait MedicationLookup: Send + Sync + 'static {
    fn lookup(
        &self,
        query: &str,
        limit: usize,
    ) -> impl Future<Output = GatewayResult<Vec<Medication>>> + Send;
}

impl MedicationLookup for Gateway {
    fn lookup(
        &self,
        query: &str,
        limit: usize,
    ) -> impl Future<Output = GatewayResult<Vec<Medication>>> + Send {
        self.search_medications(query, limit)
    }
}

/// Matches for one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    /// Query as typed
    pub query: String,
    pub matches: Vec<Medication>,
}

/// Keystroke-driven search front for a [`MedicationLookup`].
pub struct SearchProxy<S> {
    source: Arc<S>,
    query: String,
    results: watch::Sender<SearchResults>,
    /// Dropping this cancels the debounce timer of the pending lookup.
    pending: Option<oneshot::Sender<()>>,
}

impl<S: MedicationLookup> SearchProxy<S> {
    pub fn new(source: Arc<S>) -> Self {
        let (results, _) = watch::channel(SearchResults::default());
        Self {
            source,
            query: String::new(),
            results,
            pending: None,
        }
    }

    /// Receiver for published results.
    pub fn subscribe(&self) -> watch::Receiver<SearchResults> {
        self.results.subscribe()
    }

    /// Latest query passed to [`SearchProxy::input`].
    pub fn current_query(&self) -> &str {
        &self.query
    }

    /// Handle a keystroke. Must be called from within a tokio runtime.
    pub fn input(&mut self, query: &str) {
        self.query = query.to_string();
        drop(self.pending.take());

        let trimmed = query.trim();
        if trimmed.chars().count() < MIN_QUERY_CHARS {
            self.results.send_replace(SearchResults {
                query: query.to_string(),
                matches: Vec::new(),
            });
            return;
        }

        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        self.pending = Some(cancel_tx);

        let source = Arc::clone(&self.source);
        let results = self.results.clone();
        let query = query.to_string();
        let needle = trimmed.to_string();

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(DEBOUNCE) => {}
                _ = cancel_rx => return,
            }

            let matches = match source.lookup(&needle, MAX_RESULTS).await {
                Ok(matches) => matches,
                Err(e) => {
                    log::debug!("Medication search for '{}' failed: {}", needle, e);
                    Vec::new()
                }
            };
            results.send_replace(SearchResults { query, matches });
        });
    }

    /// Reset the query and results, cancelling any pending lookup.
    pub fn clear(&mut self) {
        self.input("");
    }
}
