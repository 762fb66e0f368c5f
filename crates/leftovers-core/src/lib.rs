//! Pharmacy Leftovers Core Library
//!
//! Data access and reporting for a hospital pharmacy that tracks leftover
//! compounded preparations, a medication catalog and daily stock/purchase
//! entries.
//!
//! # Architecture
//!
//! ```text
//!              Remote REST service           Local snapshot store (SQLite)
//!                       │                                │
//!                       └──────────┬─────────────────────┘
//!                                  │  chosen once per session
//!                                  ▼
//!                               Gateway ──── in-memory collections
//!                          ┌───────┴────────┐
//!                          ▼                ▼
//!                     SearchProxy     StatisticsReport
//!                  (debounced lookup)  (windows, CSV, text)
//! ```
//!
//! When the remote service is unreachable or unconfigured the gateway runs in
//! demo mode on local snapshots; callers see the same API either way.
//!
//! # Modules
//!
//! - [`config`]: Environment-driven configuration
//! - [`db`]: SQLite snapshot storage for fallback mode
//! - [`remote`]: REST client for the remote record store
//! - [`gateway`]: Uniform CRUD over both backends
//! - [`models`]: Domain types (LeftoverPreparation, Medication, PurchaseEntry)
//! - [`search`]: Debounced medication search
//! - [`report`]: Time-windowed statistics and exports
//! - [`session`]: Advisory session gate

pub mod config;
pub mod db;
pub mod gateway;
pub mod models;
pub mod remote;
pub mod report;
pub mod search;
pub mod session;

// Re-export commonly used types
pub use config::{Config, ConfigError, RemoteConfig};
pub use db::Database;
pub use gateway::{Fetched, Gateway, GatewayError, GatewayResult, Mutation};
pub use models::{
    ExpiryStatus, LeftoverPatch, LeftoverPreparation, Medication, MedicationPatch,
    NewLeftoverPreparation, NewMedication, NewPurchaseEntry, PurchaseEntry, PurchasePatch,
};
pub use report::{StatisticsReport, TimeRange};
pub use search::{SearchProxy, SearchResults};
pub use session::SessionGate;

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use tokio::runtime::Runtime;
use tokio::sync::watch;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum LeftoversError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Remote store error: {0}")]
    RemoteError(String),

    #[error("Local store error: {0}")]
    LocalError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Export error: {0}")]
    ExportError(String),

    #[error("Runtime error: {0}")]
    RuntimeError(String),
}

impl From<GatewayError> for LeftoversError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Validation(e) => LeftoversError::InvalidInput(e.to_string()),
            GatewayError::Remote(e) => LeftoversError::RemoteError(e.to_string()),
            GatewayError::Local(e) => LeftoversError::LocalError(e.to_string()),
        }
    }
}

impl From<db::DbError> for LeftoversError {
    fn from(e: db::DbError) -> Self {
        LeftoversError::LocalError(e.to_string())
    }
}

impl From<ConfigError> for LeftoversError {
    fn from(e: ConfigError) -> Self {
        LeftoversError::ConfigError(e.to_string())
    }
}

impl From<report::ReportError> for LeftoversError {
    fn from(e: report::ReportError) -> Self {
        LeftoversError::ExportError(e.to_string())
    }
}

impl From<std::io::Error> for LeftoversError {
    fn from(e: std::io::Error) -> Self {
        LeftoversError::RuntimeError(e.to_string())
    }
}

/// Display text of a failed refresh; the rows it came with are still usable.
fn refresh_error(fetched_error: Option<GatewayError>) -> Option<String> {
    fetched_error.map(|e| LeftoversError::from(e).to_string())
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, LeftoversError> {
    value.trim().parse().map_err(|_| {
        LeftoversError::InvalidInput(format!("{} must be YYYY-MM-DD, got '{}'", field, value))
    })
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Connect using an explicit configuration.
#[uniffi::export]
pub fn open_core(config: FfiConfig) -> Result<Arc<LeftoversCore>, LeftoversError> {
    LeftoversCore::connect(config.try_into()?)
}

/// Connect using `LEFTOVERS_*` environment variables.
#[uniffi::export]
pub fn open_core_from_env() -> Result<Arc<LeftoversCore>, LeftoversError> {
    LeftoversCore::connect(Config::from_env()?)
}

/// Local mode on an in-memory store (for testing).
#[uniffi::export]
pub fn open_core_in_memory(seed_demo_data: bool) -> Result<Arc<LeftoversCore>, LeftoversError> {
    let runtime = Runtime::new()?;
    let gateway = Gateway::local(Database::open_in_memory()?, seed_demo_data)?;
    Ok(LeftoversCore::assemble(runtime, gateway, None))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Blocking facade over the async gateway, for foreign callers.
#[derive(uniffi::Object)]
pub struct LeftoversCore {
    runtime: Runtime,
    gateway: Arc<Gateway>,
    gate: SessionGate,
    search: Mutex<SearchProxy<Gateway>>,
    search_results: watch::Receiver<SearchResults>,
}

impl LeftoversCore {
    fn connect(config: Config) -> Result<Arc<Self>, LeftoversError> {
        let runtime = Runtime::new()?;
        let gateway = runtime.block_on(Gateway::connect(&config))?;
        Ok(Self::assemble(runtime, gateway, config.access_secret))
    }

    fn assemble(runtime: Runtime, gateway: Gateway, access_secret: Option<String>) -> Arc<Self> {
        let gateway = Arc::new(gateway);
        let search = SearchProxy::new(Arc::clone(&gateway));
        let search_results = search.subscribe();
        Arc::new(Self {
            runtime,
            gateway,
            gate: SessionGate::new(access_secret),
            search: Mutex::new(search),
            search_results,
        })
    }

    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }

    /// Report over the last known leftovers, plus the refresh error if the
    /// backing store failed.
    fn report(
        &self,
        range: FfiTimeRange,
    ) -> Result<(StatisticsReport, Option<String>), LeftoversError> {
        let range = TimeRange::try_from(range)?;
        let fetched = self
            .runtime
            .block_on(self.gateway.fetch_all::<LeftoverPreparation>());
        let report = StatisticsReport::build(&fetched.data, &range, &chrono::Local::now());
        Ok((report, refresh_error(fetched.error)))
    }

    fn leftover_list(&self, fetched: Fetched<LeftoverPreparation>) -> FfiLeftoverList {
        let today = self.today();
        FfiLeftoverList {
            rows: fetched
                .data
                .into_iter()
                .map(|r| FfiLeftover::new(r, today))
                .collect(),
            error: refresh_error(fetched.error),
        }
    }
}

#[uniffi::export]
impl LeftoversCore {
    /// True when running on local snapshots.
    pub fn is_demo_mode(&self) -> bool {
        self.gateway.is_demo_mode()
    }

    // =========================================================================
    // Session
    // =========================================================================

    pub fn unlock(&self, secret: String) -> bool {
        self.gate.try_unlock(&secret)
    }

    pub fn is_authenticated(&self) -> bool {
        self.gate.is_authenticated()
    }

    pub fn end_session(&self) {
        self.gate.end()
    }

    // =========================================================================
    // Leftover Operations
    // =========================================================================

    /// Unresolved leftovers, soonest expiry first.
    pub fn fetch_active(&self) -> FfiLeftoverList {
        let fetched = self.runtime.block_on(self.gateway.fetch_active());
        self.leftover_list(fetched)
    }

    /// Every leftover, newest first.
    pub fn list_leftovers(&self) -> FfiLeftoverList {
        let fetched = self
            .runtime
            .block_on(self.gateway.fetch_all::<LeftoverPreparation>());
        self.leftover_list(fetched)
    }

    pub fn add_leftover(
        &self,
        preparation_name: String,
        dose: String,
        expiry_date: String,
    ) -> Result<FfiLeftover, LeftoversError> {
        let draft = NewLeftoverPreparation::new(
            preparation_name,
            dose,
            parse_date("expiry_date", &expiry_date)?,
        );
        let created = self
            .runtime
            .block_on(self.gateway.create::<LeftoverPreparation>(draft))?;
        Ok(FfiLeftover::new(created, self.today()))
    }

    /// Returns the number of records changed (0 for an unknown id).
    pub fn set_used(&self, id: String, used: bool) -> Result<u32, LeftoversError> {
        let outcome = self.runtime.block_on(
            self.gateway
                .update::<LeftoverPreparation>(&id, &LeftoverPatch::used(used)),
        )?;
        Ok(outcome.affected as u32)
    }

    pub fn set_resolved(&self, id: String, resolved: bool) -> Result<u32, LeftoversError> {
        let outcome = self.runtime.block_on(
            self.gateway
                .update::<LeftoverPreparation>(&id, &LeftoverPatch::resolved(resolved)),
        )?;
        Ok(outcome.affected as u32)
    }

    pub fn delete_leftover(&self, id: String) -> Result<u32, LeftoversError> {
        let outcome = self
            .runtime
            .block_on(self.gateway.delete::<LeftoverPreparation>(&id))?;
        Ok(outcome.affected as u32)
    }

    pub fn clear_leftovers(&self) -> Result<u32, LeftoversError> {
        let outcome = self
            .runtime
            .block_on(self.gateway.clear_all::<LeftoverPreparation>())?;
        Ok(outcome.affected as u32)
    }

    // =========================================================================
    // Medication Catalog
    // =========================================================================

    /// Whole catalog, alphabetical.
    pub fn medication_catalog(&self) -> FfiMedicationList {
        let fetched = self.runtime.block_on(self.gateway.medication_catalog());
        FfiMedicationList {
            rows: fetched.data.into_iter().map(Into::into).collect(),
            error: refresh_error(fetched.error),
        }
    }

    pub fn add_medication(&self, name: String) -> Result<FfiMedication, LeftoversError> {
        let created = self
            .runtime
            .block_on(self.gateway.create::<Medication>(NewMedication::new(&name)))?;
        Ok(created.into())
    }

    pub fn delete_medication(&self, id: String) -> Result<u32, LeftoversError> {
        let outcome = self.runtime.block_on(self.gateway.delete::<Medication>(&id))?;
        Ok(outcome.affected as u32)
    }

    /// Feed a keystroke to the debounced search. Read results with
    /// [`LeftoversCore::search_results`].
    pub fn search_input(&self, query: String) {
        let _guard = self.runtime.enter();
        self.search
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .input(&query);
    }

    /// Latest published search results and the query they answer.
    pub fn search_results(&self) -> FfiSearchResults {
        let results = self.search_results.borrow();
        FfiSearchResults {
            query: results.query.clone(),
            matches: results.matches.iter().cloned().map(Into::into).collect(),
        }
    }

    // =========================================================================
    // Purchases
    // =========================================================================

    /// Entries dated today, newest first.
    pub fn purchases_today(&self) -> FfiPurchaseList {
        let fetched = self
            .runtime
            .block_on(self.gateway.purchases_on(self.today()));
        fetched.into()
    }

    pub fn purchase_history(&self) -> FfiPurchaseList {
        self.runtime.block_on(self.gateway.purchase_history()).into()
    }

    /// Record today's stock for a catalog medication.
    pub fn add_purchase(
        &self,
        medication: FfiMedication,
        current_stock: u32,
    ) -> Result<FfiPurchase, LeftoversError> {
        let draft = NewPurchaseEntry {
            medication_id: Some(medication.id),
            medication_name: medication.name,
            current_stock,
            ordered: false,
            order_date: self.today(),
        };
        let created = self
            .runtime
            .block_on(self.gateway.create::<PurchaseEntry>(draft))?;
        Ok(created.into())
    }

    pub fn set_ordered(&self, id: String, ordered: bool) -> Result<u32, LeftoversError> {
        let outcome = self.runtime.block_on(
            self.gateway
                .update::<PurchaseEntry>(&id, &PurchasePatch::ordered(ordered)),
        )?;
        Ok(outcome.affected as u32)
    }

    pub fn set_stock(&self, id: String, current_stock: u32) -> Result<u32, LeftoversError> {
        let patch = PurchasePatch {
            current_stock: Some(current_stock),
            ..PurchasePatch::default()
        };
        let outcome = self
            .runtime
            .block_on(self.gateway.update::<PurchaseEntry>(&id, &patch))?;
        Ok(outcome.affected as u32)
    }

    pub fn delete_purchase(&self, id: String) -> Result<u32, LeftoversError> {
        let outcome = self.runtime.block_on(self.gateway.delete::<PurchaseEntry>(&id))?;
        Ok(outcome.affected as u32)
    }

    // =========================================================================
    // Statistics & Export
    // =========================================================================

    /// Counters and projections for a window, in the device's local time.
    pub fn statistics(&self, range: FfiTimeRange) -> Result<FfiStatistics, LeftoversError> {
        let (report, error) = self.report(range)?;
        Ok(FfiStatistics {
            error,
            ..FfiStatistics::from(report)
        })
    }

    /// Semicolon-delimited export of the window's leftovers.
    pub fn export_csv(&self, range: FfiTimeRange) -> Result<FfiExport, LeftoversError> {
        let (report, error) = self.report(range)?;
        Ok(FfiExport {
            file_name: report.csv_file_name(),
            contents: report.to_csv()?,
            error,
        })
    }

    /// Plain-text summary of the window.
    pub fn export_summary(&self, range: FfiTimeRange) -> Result<FfiExport, LeftoversError> {
        let (report, error) = self.report(range)?;
        Ok(FfiExport {
            file_name: report.text_file_name(),
            contents: report.to_text(),
            error,
        })
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe configuration. Remote mode needs both `remote_url` and
/// `remote_key`.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiConfig {
    pub remote_url: Option<String>,
    pub remote_key: Option<String>,
    pub data_path: Option<String>,
    pub seed_demo_data: bool,
    pub access_secret: Option<String>,
}

impl TryFrom<FfiConfig> for Config {
    type Error = LeftoversError;

    fn try_from(ffi: FfiConfig) -> Result<Self, Self::Error> {
        let remote = match (ffi.remote_url, ffi.remote_key) {
            (Some(url), Some(api_key)) => Some(RemoteConfig { url, api_key }),
            (None, None) => None,
            _ => {
                return Err(LeftoversError::ConfigError(
                    "remote mode needs both remote_url and remote_key".into(),
                ))
            }
        };
        Ok(Config {
            remote,
            data_path: ffi
                .data_path
                .map(PathBuf::from)
                .unwrap_or_else(config::default_data_path),
            seed_demo_data: ffi.seed_demo_data,
            access_secret: ffi.access_secret,
        })
    }
}

/// FFI-safe leftover preparation. Dates are `YYYY-MM-DD`, timestamps RFC 3339.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiLeftover {
    pub id: String,
    pub preparation_name: String,
    pub dose: String,
    pub expiry_date: String,
    pub used: bool,
    pub resolved: bool,
    pub created_at: String,
    /// "expired", "today", "tomorrow" or "later"
    pub expiry_status: String,
}

impl FfiLeftover {
    fn new(record: LeftoverPreparation, today: NaiveDate) -> Self {
        let expiry_status = match record.expiry_status(today) {
            ExpiryStatus::Expired => "expired",
            ExpiryStatus::Today => "today",
            ExpiryStatus::Tomorrow => "tomorrow",
            ExpiryStatus::Later => "later",
        };
        Self {
            id: record.id,
            preparation_name: record.preparation_name,
            dose: record.dose,
            expiry_date: record.expiry_date.to_string(),
            used: record.used,
            resolved: record.resolved,
            created_at: record.created_at.to_rfc3339(),
            expiry_status: expiry_status.to_string(),
        }
    }
}

/// Rows of a read. When `error` is set the refresh failed and `rows` are the
/// last known (possibly stale) rows.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiLeftoverList {
    pub rows: Vec<FfiLeftover>,
    pub error: Option<String>,
}

/// FFI-safe catalog medication.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedication {
    pub id: String,
    pub name: String,
}

impl From<Medication> for FfiMedication {
    fn from(medication: Medication) -> Self {
        Self {
            id: medication.id,
            name: medication.name,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicationList {
    pub rows: Vec<FfiMedication>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSearchResults {
    pub query: String,
    pub matches: Vec<FfiMedication>,
}

/// FFI-safe purchase entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPurchase {
    pub id: String,
    pub medication_id: Option<String>,
    pub medication_name: String,
    pub current_stock: u32,
    pub ordered: bool,
    pub order_date: String,
    pub created_at: String,
}

impl From<PurchaseEntry> for FfiPurchase {
    fn from(entry: PurchaseEntry) -> Self {
        Self {
            id: entry.id,
            medication_id: entry.medication_id,
            medication_name: entry.medication_name,
            current_stock: entry.current_stock,
            ordered: entry.ordered,
            order_date: entry.order_date.to_string(),
            created_at: entry.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPurchaseList {
    pub rows: Vec<FfiPurchase>,
    pub error: Option<String>,
}

impl From<Fetched<PurchaseEntry>> for FfiPurchaseList {
    fn from(fetched: Fetched<PurchaseEntry>) -> Self {
        Self {
            rows: fetched.data.into_iter().map(Into::into).collect(),
            error: refresh_error(fetched.error),
        }
    }
}

/// FFI-safe period selector. Custom bounds are `YYYY-MM-DD`.
#[derive(Debug, Clone, uniffi::Enum)]
pub enum FfiTimeRange {
    Week,
    Month,
    Quarter,
    Year,
    Custom {
        start: Option<String>,
        end: Option<String>,
    },
}

impl TryFrom<FfiTimeRange> for TimeRange {
    type Error = LeftoversError;

    fn try_from(range: FfiTimeRange) -> Result<Self, Self::Error> {
        Ok(match range {
            FfiTimeRange::Week => TimeRange::Week,
            FfiTimeRange::Month => TimeRange::Month,
            FfiTimeRange::Quarter => TimeRange::Quarter,
            FfiTimeRange::Year => TimeRange::Year,
            FfiTimeRange::Custom { start, end } => TimeRange::Custom {
                start: start.as_deref().map(|d| parse_date("start", d)).transpose()?,
                end: end.as_deref().map(|d| parse_date("end", d)).transpose()?,
            },
        })
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTrendBucket {
    pub date: String,
    pub total: u32,
    pub used: u32,
    pub resolved: u32,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiFamilyBucket {
    pub name: String,
    pub total: u32,
    pub used: u32,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSlice {
    pub label: String,
    pub value: u32,
}

/// FFI-safe statistics for one window.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiStatistics {
    pub window_start: String,
    pub window_end: String,
    pub total: u32,
    pub used: u32,
    pub resolved: u32,
    pub pending: u32,
    pub expired: u32,
    pub utilization_rate: f64,
    pub trend: Vec<FfiTrendBucket>,
    pub distribution: Vec<FfiFamilyBucket>,
    pub overview: Vec<FfiSlice>,
    /// Set when the leftovers could not be refreshed; the figures then come
    /// from the last known rows.
    pub error: Option<String>,
}

impl From<StatisticsReport> for FfiStatistics {
    fn from(report: StatisticsReport) -> Self {
        let c = report.counts;
        Self {
            window_start: report.window.start.to_string(),
            window_end: report.window.end.to_string(),
            total: c.total as u32,
            used: c.used as u32,
            resolved: c.resolved as u32,
            pending: c.pending as u32,
            expired: c.expired as u32,
            utilization_rate: c.utilization_rate(),
            overview: report
                .overview()
                .into_iter()
                .map(|s| FfiSlice {
                    label: s.label,
                    value: s.value as u32,
                })
                .collect(),
            trend: report
                .trend
                .into_iter()
                .map(|b| FfiTrendBucket {
                    date: b.date.to_string(),
                    total: b.total as u32,
                    used: b.used as u32,
                    resolved: b.resolved as u32,
                })
                .collect(),
            distribution: report
                .distribution
                .into_iter()
                .map(|b| FfiFamilyBucket {
                    name: b.name,
                    total: b.total as u32,
                    used: b.used as u32,
                })
                .collect(),
            error: None,
        }
    }
}

/// File name and contents of an export.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiExport {
    pub file_name: String,
    pub contents: String,
    /// Set when the export was built from the last known rows.
    pub error: Option<String>,
}
