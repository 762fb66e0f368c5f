//! Record store gateway: one seam over the remote service and the local
//! fallback store.
//!
//! The backend is chosen once, in [`Gateway::connect`], and never re-checked.
//! Both backends feed the same in-memory collections, so callers never branch
//! on reachability.

mod cache;
mod local;
mod seed;

pub use cache::*;
pub use local::*;
pub use seed::*;

use chrono::{NaiveDate, Utc};
use thiserror::Error;

use crate::config::Config;
use crate::db::{Database, DbError, Snapshot};
use crate::models::{
    sort_newest_first, LeftoverPreparation, Medication, PurchaseEntry, Record, ValidationError,
};
use crate::remote::{RemoteError, RemoteStore, Select};

/// Gateway errors.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Local store error: {0}")]
    Local(#[from] DbError),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Rows from a read, plus the error if the backing store failed. On failure
/// `data` holds the last known (possibly stale) rows.
#[derive(Debug)]
pub struct Fetched<T> {
    pub data: Vec<T>,
    pub error: Option<GatewayError>,
}

impl<T> Fetched<T> {
    fn fresh(data: Vec<T>) -> Self {
        Self { data, error: None }
    }

    fn stale(data: Vec<T>, error: GatewayError) -> Self {
        Self {
            data,
            error: Some(error),
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of an update or delete. `affected == 0` means no record had the
/// id, in either mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mutation {
    pub affected: usize,
}

impl Mutation {
    pub fn found(&self) -> bool {
        self.affected > 0
    }
}

/// Backing store, fixed for the session.
pub enum Backend {
    Remote(RemoteStore),
    Local(LocalFallbackStore),
}

/// Uniform CRUD over leftovers, medications and purchases.
pub struct Gateway {
    backend: Backend,
    sets: RecordSets,
}

impl Gateway {
    /// Pick the backend for this session: the remote service if it is
    /// configured and answers a ping, the local snapshot store otherwise.
    pub async fn connect(config: &Config) -> GatewayResult<Self> {
        if let Some(remote) = &config.remote {
            let store = RemoteStore::new(&remote.url, remote.api_key.clone());
            match store.ping().await {
                Ok(()) => {
                    log::info!("Remote store reachable, running in remote mode");
                    return Ok(Self::remote(store));
                }
                Err(e) => {
                    log::warn!("Remote store unreachable ({}), falling back to local mode", e);
                }
            }
        } else {
            log::info!("Remote store not configured, running in local mode");
        }

        let db = Database::open(&config.data_path)?;
        log::info!("Opened local store: {}", config.data_path.display());
        Self::local(db, config.seed_demo_data)
    }

    /// Remote mode over an already-built client.
    pub fn remote(store: RemoteStore) -> Self {
        Self {
            backend: Backend::Remote(store),
            sets: RecordSets::default(),
        }
    }

    /// Local mode. Loads every snapshot; when no leftover snapshot exists
    /// and `seed_demo_data` is set, stores the example leftovers first.
    pub fn local(db: Database, seed_demo_data: bool) -> GatewayResult<Self> {
        let store = LocalFallbackStore::new(db);

        let leftovers = match store.load::<LeftoverPreparation>()? {
            Snapshot::Loaded(rows) => rows,
            Snapshot::Malformed => Vec::new(),
            Snapshot::Missing if seed_demo_data => {
                let seeds = demo_leftovers(Utc::now());
                store.persist(&seeds)?;
                log::info!("Seeded {} demo leftovers", seeds.len());
                seeds
            }
            Snapshot::Missing => Vec::new(),
        };
        let medications = loaded_or_empty(store.load::<Medication>()?);
        let purchases = loaded_or_empty(store.load::<PurchaseEntry>()?);

        Ok(Self {
            backend: Backend::Local(store),
            sets: RecordSets::new(leftovers, medications, purchases),
        })
    }

    /// True when running on the local snapshot store.
    pub fn is_demo_mode(&self) -> bool {
        matches!(self.backend, Backend::Local(_))
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Open worklist: unresolved leftovers, soonest expiry first.
    pub async fn fetch_active(&self) -> Fetched<LeftoverPreparation> {
        let query = Select::new()
            .eq("resolved", false)
            .order("expiry_date", true);
        self.read(
            &query,
            Refresh::Merge,
            |r: &LeftoverPreparation| !r.resolved,
            |rows| rows.sort_by_key(|r| r.expiry_date),
        )
        .await
    }

    /// Whole collection, newest first.
    pub async fn fetch_all<R: Stored>(&self) -> Fetched<R> {
        let query = Select::new().order("created_at", false);
        self.read(&query, Refresh::Replace, |_: &R| true, |rows| {
            sort_newest_first(rows)
        })
        .await
    }

    /// Whole medication catalog, alphabetical.
    pub async fn medication_catalog(&self) -> Fetched<Medication> {
        let query = Select::new().order("name", true);
        self.read(&query, Refresh::Replace, |_: &Medication| true, sort_by_name)
            .await
    }

    /// Purchase entries dated `date`, newest first.
    pub async fn purchases_on(&self, date: NaiveDate) -> Fetched<PurchaseEntry> {
        let query = Select::new()
            .eq("order_date", date)
            .order("created_at", false);
        self.read(
            &query,
            Refresh::Merge,
            move |p: &PurchaseEntry| p.order_date == date,
            |rows| sort_newest_first(rows),
        )
        .await
    }

    /// All purchase entries, latest order date first, then newest first.
    pub async fn purchase_history(&self) -> Fetched<PurchaseEntry> {
        let query = Select::new()
            .order("order_date", false)
            .order("created_at", false);
        self.read(&query, Refresh::Replace, |_: &PurchaseEntry| true, |rows| {
            rows.sort_by(|a, b| {
                b.order_date
                    .cmp(&a.order_date)
                    .then(b.created_at.cmp(&a.created_at))
            })
        })
        .await
    }

    /// Case-insensitive substring search on medication names, alphabetical,
    /// at most `limit` matches. The needle is literal text in both modes.
    pub async fn search_medications(
        &self,
        needle: &str,
        limit: usize,
    ) -> GatewayResult<Vec<Medication>> {
        match &self.backend {
            Backend::Remote(store) => {
                let query = Select::new()
                    .ilike_contains("name", needle)
                    .order("name", true)
                    .limit(limit);
                let mut rows: Vec<Medication> =
                    store.select(Medication::COLLECTION, &query).await?;
                let needle = needle.to_lowercase();
                rows.retain(|m| m.matches(&needle));
                Ok(rows)
            }
            Backend::Local(_) => {
                let needle = needle.to_lowercase();
                let mut matches = Medication::set(&self.sets)
                    .filtered(|m| m.matches(&needle))
                    .await;
                sort_by_name(&mut matches);
                matches.truncate(limit);
                Ok(matches)
            }
        }
    }

    /// Remote: run `query`, refresh the in-memory collection, and fall back
    /// to it on failure. Local: serve the in-memory collection.
    ///
    /// Filtered reads must use [`Refresh::Merge`] so the collection never
    /// shrinks to one query's slice.
    async fn read<R: Stored>(
        &self,
        query: &Select,
        refresh: Refresh,
        keep: impl Fn(&R) -> bool,
        sort: impl Fn(&mut Vec<R>),
    ) -> Fetched<R> {
        let set = R::set(&self.sets);

        match &self.backend {
            Backend::Remote(store) => match store.select_all::<R>(R::COLLECTION, query).await {
                Ok(rows) => {
                    match refresh {
                        Refresh::Replace => set.replace(rows.clone()).await,
                        Refresh::Merge => set.merge(&rows).await,
                    }
                    Fetched::fresh(rows)
                }
                Err(e) => {
                    log::warn!("Fetch from {} failed: {}", R::COLLECTION.table(), e);
                    let mut stale = set.filtered(keep).await;
                    sort(&mut stale);
                    Fetched::stale(stale, e.into())
                }
            },
            Backend::Local(_) => {
                let mut rows = set.filtered(keep).await;
                sort(&mut rows);
                Fetched::fresh(rows)
            }
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Validate and insert a record; returns it with its generated `id` and
    /// `created_at`.
    pub async fn create<R: Stored>(&self, draft: R::Draft) -> GatewayResult<R> {
        R::validate(&draft)?;
        let set = R::set(&self.sets);

        match &self.backend {
            Backend::Remote(store) => {
                let created: R = store.insert(R::COLLECTION, &draft).await?;
                set.lock().await.push(created.clone());
                Ok(created)
            }
            Backend::Local(local) => {
                let created = R::from_draft(draft, uuid::Uuid::new_v4().to_string(), Utc::now());
                let mut rows = set.lock().await;
                let mut next = rows.clone();
                next.push(created.clone());
                local.persist(&next)?;
                *rows = next;
                Ok(created)
            }
        }
    }

    /// Merge `patch` into the record with `id`.
    pub async fn update<R: Stored>(&self, id: &str, patch: &R::Patch) -> GatewayResult<Mutation> {
        let set = R::set(&self.sets);

        match &self.backend {
            Backend::Remote(store) => {
                let affected = store.update(R::COLLECTION, id, patch).await?;
                if affected > 0 {
                    for row in set.lock().await.iter_mut().filter(|r| r.id() == id) {
                        row.apply(patch);
                    }
                }
                Ok(Mutation { affected })
            }
            Backend::Local(local) => {
                let mut rows = set.lock().await;
                let mut next = rows.clone();
                let mut affected = 0;
                for row in next.iter_mut().filter(|r| r.id() == id) {
                    row.apply(patch);
                    affected += 1;
                }
                if affected > 0 {
                    local.persist(&next)?;
                    *rows = next;
                } else {
                    log::debug!("Update of unknown {} id {}", R::COLLECTION.table(), id);
                }
                Ok(Mutation { affected })
            }
        }
    }

    /// Remove the record with `id` from the backing store and memory.
    pub async fn delete<R: Stored>(&self, id: &str) -> GatewayResult<Mutation> {
        let set = R::set(&self.sets);

        match &self.backend {
            Backend::Remote(store) => {
                let affected = store.delete(R::COLLECTION, id).await?;
                set.lock().await.retain(|r| r.id() != id);
                Ok(Mutation { affected })
            }
            Backend::Local(local) => {
                let mut rows = set.lock().await;
                let next: Vec<R> = rows.iter().filter(|r| r.id() != id).cloned().collect();
                let affected = rows.len() - next.len();
                if affected > 0 {
                    local.persist(&next)?;
                    *rows = next;
                }
                Ok(Mutation { affected })
            }
        }
    }

    /// Remove every record of a collection.
    pub async fn clear_all<R: Stored>(&self) -> GatewayResult<Mutation> {
        let set = R::set(&self.sets);

        match &self.backend {
            Backend::Remote(store) => {
                let affected = store.delete_all(R::COLLECTION).await?;
                set.lock().await.clear();
                Ok(Mutation { affected })
            }
            Backend::Local(local) => {
                let mut rows = set.lock().await;
                local.persist::<R>(&[])?;
                let affected = rows.len();
                rows.clear();
                log::info!("Cleared {} records from {}", affected, R::COLLECTION.table());
                Ok(Mutation { affected })
            }
        }
    }
}

fn loaded_or_empty<R>(snapshot: Snapshot<Vec<R>>) -> Vec<R> {
    match snapshot {
        Snapshot::Loaded(rows) => rows,
        Snapshot::Missing | Snapshot::Malformed => Vec::new(),
    }
}

fn sort_by_name(rows: &mut Vec<Medication>) {
    rows.sort_by_cached_key(|m| m.name.to_lowercase());
}
