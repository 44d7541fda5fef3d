// In-memory query cache.
// Deduplicates in-flight fetches, serves stale data while revalidating, and
// resolves cross-references through the same entries.

use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use lru::LruCache;
use rand::Rng;
use tokio::sync::mpsc;

use crate::error::{CatalogError, Result};
use crate::swapi::{Address, CatalogClient, Category, Page, Record};

use super::store::{CacheEntry, Descriptor, FreshnessPolicy, QueryState, QueryStatus, Resource};

/// Default cap on page-keyed entries.
pub const DEFAULT_MAX_PAGES: usize = 128;

/// Source of catalog data behind the cache.
pub trait Fetcher: Send + Sync + 'static {
    fn load_page(&self, category: Category, page: u32) -> impl Future<Output = Result<Page>> + Send;

    fn load_record(&self, address: &Address) -> impl Future<Output = Result<Record>> + Send;
}

impl Fetcher for CatalogClient {
    fn load_page(&self, category: Category, page: u32) -> impl Future<Output = Result<Page>> + Send {
        self.fetch_page(category, page)
    }

    fn load_record(&self, address: &Address) -> impl Future<Output = Result<Record>> + Send {
        self.fetch_by_address(address)
    }
}

/// Bounded retry with exponential backoff and jitter. Only retryable errors are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub const NONE: RetryPolicy = RetryPolicy {
        max_retries: 0,
        base_delay: Duration::ZERO,
    };

    /// Delay before retry number `attempt` (0-based): base * 2^attempt plus up to half a base of jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let backoff = self.base_delay.saturating_mul(1u32 << attempt.min(6));
        let jitter_cap = self.base_delay.as_millis() as u64 / 2;
        if jitter_cap == 0 {
            return backoff;
        }
        let jitter = rand::thread_rng().gen_range(0..=jitter_cap);
        backoff + Duration::from_millis(jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// How a cross-reference currently renders.
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceState {
    Pending,
    Resolved { name: String, address: Address },
    Failed(CatalogError),
}

/// Entry counts, for the status bar and logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub pages: usize,
    pub records: usize,
    pub in_flight: usize,
}

type SharedFetch = Shared<BoxFuture<'static, Result<Resource>>>;

struct CacheInner {
    entries: HashMap<Descriptor, CacheEntry>,
    /// At most one fetch per descriptor lives here at any time.
    in_flight: HashMap<Descriptor, SharedFetch>,
    /// Recency order of page-keyed entries; address-keyed entries are not capped.
    pages: LruCache<Descriptor, ()>,
}

impl CacheInner {
    fn touch_page(&mut self, descriptor: &Descriptor) {
        if !descriptor.is_page_keyed() || self.pages.get(descriptor).is_some() {
            return;
        }
        if let Some((evicted, _)) = self.pages.push(descriptor.clone(), ()) {
            if &evicted != descriptor && !self.in_flight.contains_key(&evicted) {
                tracing::debug!(descriptor = %evicted, "Evicting cached page");
                self.entries.remove(&evicted);
            }
        }
    }

    fn settle(&mut self, descriptor: &Descriptor, result: &Result<Resource>) {
        self.in_flight.remove(descriptor);
        self.touch_page(descriptor);
        let entry = self
            .entries
            .entry(descriptor.clone())
            .or_insert_with(|| CacheEntry::for_descriptor(descriptor));

        match result {
            Ok(resource) => {
                entry.succeed(resource.clone());
                if let Resource::Page(page) = resource {
                    self.seed_records(page);
                }
            }
            Err(error) => entry.fail(error.clone()),
        }
    }

    /// Records arriving on a page also answer their own addresses.
    fn seed_records(&mut self, page: &Page) {
        for record in &page.results {
            let descriptor = Descriptor::Address(record.address().clone());
            let entry = self
                .entries
                .entry(descriptor)
                .or_insert_with(|| CacheEntry::new(true));
            if matches!(entry.status, QueryStatus::Idle | QueryStatus::Error) {
                entry.succeed(Resource::Record(Arc::clone(record)));
            }
        }
    }
}

/// Descriptor-keyed cache in front of a `Fetcher`.
///
/// Cloning is cheap and clones share state. `ensure`, `fetch` and `refresh`
/// spawn onto the current Tokio runtime.
pub struct QueryCache<F: Fetcher> {
    fetcher: Arc<F>,
    inner: Arc<Mutex<CacheInner>>,
    policy: FreshnessPolicy,
    retry: RetryPolicy,
    notifier: Option<mpsc::UnboundedSender<Descriptor>>,
}

impl<F: Fetcher> Clone for QueryCache<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            inner: Arc::clone(&self.inner),
            policy: self.policy,
            retry: self.retry,
            notifier: self.notifier.clone(),
        }
    }
}

impl<F: Fetcher> QueryCache<F> {
    pub fn new(fetcher: F) -> Self {
        Self::with_capacity(fetcher, DEFAULT_MAX_PAGES)
    }

    /// Cache holding at most `max_pages` page-keyed entries.
    pub fn with_capacity(fetcher: F, max_pages: usize) -> Self {
        let cap = NonZeroUsize::new(max_pages).unwrap_or(NonZeroUsize::MIN);
        Self {
            fetcher: Arc::new(fetcher),
            inner: Arc::new(Mutex::new(CacheInner {
                entries: HashMap::new(),
                in_flight: HashMap::new(),
                pages: LruCache::new(cap),
            })),
            policy: FreshnessPolicy::default(),
            retry: RetryPolicy::default(),
            notifier: None,
        }
    }

    pub fn with_policy(mut self, policy: FreshnessPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Send every settled descriptor to `tx`.
    pub fn with_notifier(mut self, tx: mpsc::UnboundedSender<Descriptor>) -> Self {
        self.notifier = Some(tx);
        self
    }

    /// Current state of `descriptor`. Absent entries report `Idle`.
    pub fn get(&self, descriptor: &Descriptor) -> QueryState {
        self.lock()
            .entries
            .get(descriptor)
            .map(CacheEntry::snapshot)
            .unwrap_or_default()
    }

    /// Start a fetch if the entry is absent or stale. Otherwise a no-op.
    pub fn ensure(&self, descriptor: Descriptor) {
        self.start(descriptor, false);
    }

    /// Revalidate a page, or retry a failed entry. Successful records are left alone.
    pub fn refresh(&self, descriptor: Descriptor) {
        self.start(descriptor, true);
    }

    /// Ensure `descriptor` and wait for its data.
    pub async fn fetch(&self, descriptor: Descriptor) -> Result<Resource> {
        if let Some(shared) = self.start(descriptor.clone(), false) {
            return shared.await;
        }
        let state = self.get(&descriptor);
        match (state.status, state.data, state.error) {
            (QueryStatus::Error, _, Some(error)) => Err(error),
            (_, Some(data), _) => Ok(data),
            (_, None, Some(error)) => Err(error),
            _ => Err(CatalogError::NotFound(descriptor.to_string())),
        }
    }

    /// Issue a fetch for every address `record` refers to.
    pub fn ensure_references(&self, record: &Record) {
        for address in record.references() {
            self.ensure(Descriptor::Address(address));
        }
    }

    /// Render state of a single cross-reference.
    pub fn reference(&self, address: &Address) -> ReferenceState {
        let state = self.get(&Descriptor::Address(address.clone()));
        match (state.record().cloned(), state.error) {
            (Some(record), _) => ReferenceState::Resolved {
                name: record.display_name().to_string(),
                address: address.clone(),
            },
            (None, Some(error)) => ReferenceState::Failed(error),
            (None, None) => ReferenceState::Pending,
        }
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        let pages = inner.entries.keys().filter(|d| d.is_page_keyed()).count();
        CacheStats {
            pages,
            records: inner.entries.len() - pages,
            in_flight: inner.in_flight.len(),
        }
    }

    /// Attach to the in-flight fetch for `descriptor`, or start one when due.
    fn start(&self, descriptor: Descriptor, force: bool) -> Option<SharedFetch> {
        let mut inner = self.lock();
        if let Some(existing) = inner.in_flight.get(&descriptor) {
            return Some(existing.clone());
        }

        inner.touch_page(&descriptor);
        let entry = inner
            .entries
            .entry(descriptor.clone())
            .or_insert_with(|| CacheEntry::for_descriptor(&descriptor));
        let due = if force {
            entry.can_refresh()
        } else {
            entry.needs_fetch(&self.policy)
        };
        if !due {
            return None;
        }
        entry.begin();
        tracing::debug!(descriptor = %descriptor, force, "Starting fetch");

        let fetcher = Arc::clone(&self.fetcher);
        let state = Arc::clone(&self.inner);
        let notifier = self.notifier.clone();
        let retry = self.retry;
        let key = descriptor.clone();
        let shared = async move {
            let result = load(fetcher.as_ref(), &key, retry).await;
            match &result {
                Ok(_) => tracing::debug!(descriptor = %key, "Fetch succeeded"),
                Err(e) => tracing::warn!(descriptor = %key, error = %e, "Fetch failed"),
            }
            lock_inner(&state).settle(&key, &result);
            if let Some(tx) = notifier {
                let _ = tx.send(key);
            }
            result
        }
        .boxed()
        .shared();

        inner.in_flight.insert(descriptor, shared.clone());
        drop(inner);

        tokio::spawn(shared.clone());
        Some(shared)
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        lock_inner(&self.inner)
    }
}

fn lock_inner(inner: &Mutex<CacheInner>) -> MutexGuard<'_, CacheInner> {
    match inner.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

async fn load<F: Fetcher>(fetcher: &F, descriptor: &Descriptor, retry: RetryPolicy) -> Result<Resource> {
    let mut attempt = 0;
    loop {
        let result = match descriptor {
            Descriptor::Page { category, page } => fetcher
                .load_page(*category, *page)
                .await
                .map(|page| Resource::Page(Arc::new(page))),
            Descriptor::Address(address) => fetcher
                .load_record(address)
                .await
                .map(|record| Resource::Record(Arc::new(record))),
        };

        match result {
            Err(e) if e.is_retryable() && attempt < retry.max_retries => {
                let delay = retry.delay_for(attempt);
                tracing::debug!(
                    descriptor = %descriptor,
                    error = %e,
                    retry = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying fetch after transient error"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    const BASE: &str = "https://swapi.py4e.com/api";

    /// Scripted catalog: counts calls, optionally holds them until released,
    /// and fails the first `failures` calls with a transport error.
    struct ScriptedFetcher {
        calls: AtomicUsize,
        gate: Option<Arc<Semaphore>>,
        /// When set, only loads of this address wait on the gate.
        gated_address: Option<String>,
        failures: AtomicUsize,
        missing: bool,
    }

    impl ScriptedFetcher {
        fn open() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                gate: None,
                gated_address: None,
                failures: AtomicUsize::new(0),
                missing: false,
            }
        }

        fn gated(gate: Arc<Semaphore>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::open()
            }
        }

        fn gated_on(gate: Arc<Semaphore>, address: &Address) -> Self {
            Self {
                gate: Some(gate),
                gated_address: Some(address.as_str().to_string()),
                ..Self::open()
            }
        }

        fn failing(failures: usize) -> Self {
            Self {
                failures: AtomicUsize::new(failures),
                ..Self::open()
            }
        }

        async fn wait(&self, address: Option<&str>) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let held = match &self.gated_address {
                Some(gated) => address == Some(gated.as_str()),
                None => true,
            };
            if let (Some(gate), true) = (&self.gate, held) {
                gate.acquire().await.map(|p| p.forget()).ok();
            }
            if self.missing {
                return Err(CatalogError::NotFound("missing".into()));
            }
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(CatalogError::UnreachableService("connection reset".into()));
            }
            Ok(())
        }
    }

    impl Fetcher for ScriptedFetcher {
        async fn load_page(&self, category: Category, page: u32) -> Result<Page> {
            self.wait(None).await?;
            let results = (1..=3)
                .map(|i| {
                    let id = (page - 1) * 10 + i;
                    json!({
                        "name": format!("{} {}", category.title(), id),
                        "url": format!("{BASE}/{category}/{id}/")
                    })
                })
                .collect::<Vec<_>>();
            Page::from_json(
                category,
                page,
                json!({ "count": 23, "next": null, "previous": null, "results": results }),
            )
        }

        async fn load_record(&self, address: &Address) -> Result<Record> {
            self.wait(Some(address.as_str())).await?;
            let category = address.category().unwrap_or_default();
            Record::from_json(
                category,
                json!({ "name": format!("Record {}", address.id().unwrap_or("?")), "url": address.as_str() }),
            )
        }
    }

    fn people(page: u32) -> Descriptor {
        Descriptor::page(Category::People, page).unwrap()
    }

    fn person(id: u32) -> Descriptor {
        Descriptor::address(&format!("{BASE}/people/{id}/")).unwrap()
    }

    fn calls(cache: &QueryCache<ScriptedFetcher>) -> usize {
        cache.fetcher.calls.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn test_ensure_then_get_succeeds() {
        let cache = QueryCache::new(ScriptedFetcher::open());
        assert_eq!(cache.get(&people(1)).status, QueryStatus::Idle);

        cache.fetch(people(1)).await.unwrap();
        let state = cache.get(&people(1));
        assert_eq!(state.status, QueryStatus::Success);
        assert!(state.page().unwrap().results.len() as u64 <= crate::swapi::PAGE_SIZE);
    }

    #[tokio::test]
    async fn test_concurrent_ensure_fetches_once() {
        let gate = Arc::new(Semaphore::new(0));
        let cache = QueryCache::new(ScriptedFetcher::gated(Arc::clone(&gate)));

        cache.ensure(person(1));
        cache.ensure(person(1));
        let waiter = tokio::spawn({
            let cache = cache.clone();
            async move { cache.fetch(person(1)).await }
        });
        tokio::task::yield_now().await;
        assert_eq!(cache.get(&person(1)).status, QueryStatus::Pending);
        assert_eq!(cache.stats().in_flight, 1);

        gate.add_permits(10);
        waiter.await.unwrap().unwrap();
        assert_eq!(calls(&cache), 1);
        assert_eq!(cache.stats().in_flight, 0);
    }

    #[tokio::test]
    async fn test_address_success_is_final() {
        let cache = QueryCache::new(ScriptedFetcher::open()).with_policy(FreshnessPolicy {
            page_ttl: Duration::ZERO,
            error_retry: Duration::ZERO,
        });

        cache.fetch(person(1)).await.unwrap();
        cache.ensure(person(1));
        cache.refresh(person(1));
        cache.fetch(person(1)).await.unwrap();

        assert_eq!(calls(&cache), 1);
        assert_eq!(cache.get(&person(1)).status, QueryStatus::Success);
    }

    #[tokio::test]
    async fn test_revalidation_keeps_previous_page() {
        let gate = Arc::new(Semaphore::new(1));
        let cache = QueryCache::new(ScriptedFetcher::gated(Arc::clone(&gate))).with_policy(
            FreshnessPolicy {
                page_ttl: Duration::ZERO,
                ..FreshnessPolicy::default()
            },
        );

        let first = cache.fetch(people(1)).await.unwrap();

        cache.ensure(people(1));
        let state = cache.get(&people(1));
        assert!(state.is_refetching());
        assert_eq!(state.data.as_ref(), Some(&first));

        gate.add_permits(1);
        cache.fetch(people(1)).await.unwrap();
        assert_eq!(calls(&cache), 2);
        assert_eq!(cache.get(&people(1)).status, QueryStatus::Success);
    }

    #[tokio::test]
    async fn test_failed_revalidation_keeps_data() {
        let cache = QueryCache::new(ScriptedFetcher::open())
            .with_retry(RetryPolicy::NONE)
            .with_policy(FreshnessPolicy {
                page_ttl: Duration::ZERO,
                ..FreshnessPolicy::default()
            });
        cache.fetch(people(1)).await.unwrap();

        cache.fetcher.failures.store(1, Ordering::SeqCst);
        let result = cache.fetch(people(1)).await;
        assert!(matches!(result, Err(CatalogError::UnreachableService(_))));

        let state = cache.get(&people(1));
        assert_eq!(state.status, QueryStatus::Error);
        assert!(state.page().is_some());
        assert!(state.error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_retried() {
        let cache = QueryCache::new(ScriptedFetcher::failing(2));
        let result = cache.fetch(person(4)).await;
        assert!(result.is_ok());
        assert_eq!(calls(&cache), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_are_bounded() {
        let cache = QueryCache::new(ScriptedFetcher::failing(10)).with_retry(RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(100),
        });
        let result = cache.fetch(person(4)).await;
        assert!(matches!(result, Err(CatalogError::UnreachableService(_))));
        assert_eq!(calls(&cache), 3);
    }

    #[tokio::test]
    async fn test_not_found_never_retried() {
        let cache = QueryCache::new(ScriptedFetcher {
            missing: true,
            ..ScriptedFetcher::open()
        });
        let result = cache.fetch(person(99)).await;
        assert!(matches!(result, Err(CatalogError::NotFound(_))));
        assert_eq!(calls(&cache), 1);

        // Within the error window, ensure and fetch reuse the stored error.
        cache.ensure(person(99));
        assert!(cache.fetch(person(99)).await.is_err());
        assert_eq!(calls(&cache), 1);

        // An explicit refresh tries again.
        cache.refresh(person(99));
        assert!(cache.fetch(person(99)).await.is_err());
        assert_eq!(calls(&cache), 2);
    }

    #[tokio::test]
    async fn test_page_seeds_records() {
        let cache = QueryCache::new(ScriptedFetcher::open());
        cache.fetch(people(1)).await.unwrap();
        assert_eq!(calls(&cache), 1);

        let record = cache.fetch(person(2)).await.unwrap();
        assert_eq!(record.as_record().unwrap().display_name(), "People 2");
        assert_eq!(calls(&cache), 1);
    }

    #[tokio::test]
    async fn test_reference_resolves_out_of_order() {
        let gate = Arc::new(Semaphore::new(0));
        let cache = QueryCache::new(ScriptedFetcher::gated(Arc::clone(&gate)));
        let planet = Address::parse(&format!("{BASE}/planets/1/")).unwrap();

        cache.ensure(Descriptor::Address(planet.clone()));
        assert_eq!(cache.reference(&planet), ReferenceState::Pending);

        gate.add_permits(1);
        cache.fetch(Descriptor::Address(planet.clone())).await.unwrap();
        assert_eq!(
            cache.reference(&planet),
            ReferenceState::Resolved {
                name: "Record 1".to_string(),
                address: planet,
            }
        );
    }

    #[tokio::test]
    async fn test_sibling_references_settle_independently() {
        let slow = Address::parse(&format!("{BASE}/planets/1/")).unwrap();
        let fast = Address::parse(&format!("{BASE}/planets/2/")).unwrap();
        let gate = Arc::new(Semaphore::new(0));
        let cache = QueryCache::new(ScriptedFetcher::gated_on(Arc::clone(&gate), &slow));

        cache.ensure(Descriptor::Address(slow.clone()));
        cache.ensure(Descriptor::Address(fast.clone()));
        cache.fetch(Descriptor::Address(fast.clone())).await.unwrap();

        // The later sibling resolved while the earlier one is still held.
        assert_eq!(cache.reference(&slow), ReferenceState::Pending);
        assert_eq!(
            cache.reference(&fast),
            ReferenceState::Resolved {
                name: "Record 2".to_string(),
                address: fast.clone(),
            }
        );

        gate.add_permits(1);
        cache.fetch(Descriptor::Address(slow.clone())).await.unwrap();
        assert!(matches!(
            cache.reference(&slow),
            ReferenceState::Resolved { ref name, .. } if name == "Record 1"
        ));
        assert_eq!(calls(&cache), 2);
    }

    #[tokio::test]
    async fn test_page_entries_evicted_lru() {
        let cache = QueryCache::with_capacity(ScriptedFetcher::open(), 2);
        cache.fetch(people(1)).await.unwrap();
        cache.fetch(people(2)).await.unwrap();
        cache.ensure(people(1));
        cache.fetch(people(3)).await.unwrap();

        let stats = cache.stats();
        assert_eq!(stats.pages, 2);
        assert_eq!(cache.get(&people(2)).status, QueryStatus::Idle);
        assert_eq!(cache.get(&people(1)).status, QueryStatus::Success);
        // Seeded records are never evicted.
        assert_eq!(cache.get(&person(11)).status, QueryStatus::Success);
    }

    #[tokio::test]
    async fn test_notifier_receives_settled_descriptor() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cache = QueryCache::new(ScriptedFetcher::open()).with_notifier(tx);
        cache.ensure(people(2));
        assert_eq!(rx.recv().await, Some(people(2)));
    }

    #[test]
    fn test_delay_grows() {
        let retry = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
        };
        for _ in 0..20 {
            let first = retry.delay_for(0);
            assert!(first >= Duration::from_millis(100));
            assert!(first <= Duration::from_millis(150));
            let third = retry.delay_for(2);
            assert!(third >= Duration::from_millis(400));
            assert!(third <= Duration::from_millis(450));
        }
        assert_eq!(RetryPolicy::NONE.delay_for(3), Duration::ZERO);
    }
}
