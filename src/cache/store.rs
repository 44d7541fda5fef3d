// Cache entries and freshness rules.
// Defines request descriptors, cached resources and the per-entry state machine.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{CatalogError, Result};
use crate::swapi::{Address, Category, Page, Record};

/// Default freshness window for page-keyed entries.
pub const DEFAULT_PAGE_TTL: Duration = Duration::from_secs(60);

/// Default delay before a failed entry may be fetched again by `ensure`.
pub const DEFAULT_ERROR_RETRY: Duration = Duration::from_secs(10);

/// Key identifying a fetchable unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Descriptor {
    Page { category: Category, page: u32 },
    Address(Address),
}

impl Descriptor {
    pub fn page(category: Category, page: u32) -> Result<Self> {
        if page == 0 {
            return Err(CatalogError::InvalidPage);
        }
        Ok(Descriptor::Page { category, page })
    }

    pub fn address(raw: &str) -> Result<Self> {
        Address::parse(raw).map(Descriptor::Address)
    }

    /// Page-keyed entries can go stale; address-keyed ones never do.
    pub fn is_page_keyed(&self) -> bool {
        matches!(self, Descriptor::Page { .. })
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Descriptor::Page { category, page } => write!(f, "{}?page={}", category, page),
            Descriptor::Address(address) => write!(f, "{}", address),
        }
    }
}

/// A fetched unit: either a page or a single record.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Page(Arc<Page>),
    Record(Arc<Record>),
}

impl Resource {
    pub fn as_page(&self) -> Option<&Arc<Page>> {
        match self {
            Resource::Page(page) => Some(page),
            Resource::Record(_) => None,
        }
    }

    pub fn as_record(&self) -> Option<&Arc<Record>> {
        match self {
            Resource::Record(record) => Some(record),
            Resource::Page(_) => None,
        }
    }
}

/// Lifecycle status of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryStatus {
    /// No entry exists yet.
    #[default]
    Idle,
    Pending,
    Success,
    Error,
}

/// Freshness windows applied by `ensure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    pub page_ttl: Duration,
    pub error_retry: Duration,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            page_ttl: DEFAULT_PAGE_TTL,
            error_retry: DEFAULT_ERROR_RETRY,
        }
    }
}

/// One descriptor's slot in the cache.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Last successful data. Survives revalidation and failed refetches.
    pub data: Option<Resource>,
    pub status: QueryStatus,
    /// Error of the most recent attempt, if it failed.
    pub error: Option<CatalogError>,
    /// When `data` was fetched.
    pub fetched_at: Option<DateTime<Utc>>,
    /// When the most recent attempt settled, successfully or not.
    pub settled_at: Option<DateTime<Utc>>,
    /// Whether a successful fetch is final (address-keyed entries).
    pub immutable: bool,
}

impl CacheEntry {
    pub fn new(immutable: bool) -> Self {
        Self {
            data: None,
            status: QueryStatus::Idle,
            error: None,
            fetched_at: None,
            settled_at: None,
            immutable,
        }
    }

    /// Entry for a descriptor, with immutability derived from its key.
    pub fn for_descriptor(descriptor: &Descriptor) -> Self {
        Self::new(!descriptor.is_page_keyed())
    }

    /// Check if the successful data has outlived `ttl`.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        if self.immutable {
            return false;
        }
        match self.fetched_at {
            Some(at) => elapsed_since(at) >= ttl,
            None => true,
        }
    }

    /// Whether `ensure` should start a fetch for this entry.
    pub fn needs_fetch(&self, policy: &FreshnessPolicy) -> bool {
        match self.status {
            QueryStatus::Idle => true,
            QueryStatus::Pending => false,
            QueryStatus::Success => self.is_expired(policy.page_ttl),
            QueryStatus::Error => self
                .settled_at
                .is_none_or(|at| elapsed_since(at) >= policy.error_retry),
        }
    }

    /// Whether an explicit refresh may start a fetch.
    pub fn can_refresh(&self) -> bool {
        match self.status {
            QueryStatus::Pending => false,
            QueryStatus::Success => !self.immutable,
            QueryStatus::Idle | QueryStatus::Error => true,
        }
    }

    /// Enter `Pending`. Previous data stays visible.
    pub fn begin(&mut self) {
        self.status = QueryStatus::Pending;
        self.error = None;
    }

    pub fn succeed(&mut self, data: Resource) {
        let now = Utc::now();
        self.data = Some(data);
        self.status = QueryStatus::Success;
        self.error = None;
        self.fetched_at = Some(now);
        self.settled_at = Some(now);
    }

    /// Record a failed attempt without touching previously fetched data.
    pub fn fail(&mut self, error: CatalogError) {
        self.status = QueryStatus::Error;
        self.error = Some(error);
        self.settled_at = Some(Utc::now());
    }

    pub fn snapshot(&self) -> QueryState {
        QueryState {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            fetched_at: self.fetched_at,
        }
    }
}

/// Consumer view of one descriptor: status, last good data and last error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryState {
    pub status: QueryStatus,
    pub data: Option<Resource>,
    pub error: Option<CatalogError>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl QueryState {
    /// Nothing to show yet and a fetch is underway.
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Pending && self.data.is_none()
    }

    /// Showing earlier data while a newer fetch is underway.
    pub fn is_refetching(&self) -> bool {
        self.status == QueryStatus::Pending && self.data.is_some()
    }

    pub fn page(&self) -> Option<&Arc<Page>> {
        self.data.as_ref().and_then(Resource::as_page)
    }

    pub fn record(&self) -> Option<&Arc<Record>> {
        self.data.as_ref().and_then(Resource::as_record)
    }
}

fn elapsed_since(at: DateTime<Utc>) -> Duration {
    Utc::now()
        .signed_duration_since(at)
        .to_std()
        .unwrap_or(Duration::MAX)
}
