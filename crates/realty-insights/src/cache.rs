//! Session-scoped storage of canonical domain tables.
//!
//! A [`SessionCache`] is written by one loader at a time (the async load gate)
//! and read by any number of callers. Tables are handed out as
//! `Arc<DomainTable>` and never mutated; a new load swaps them wholesale.

use crate::listings::{ApartmentListing, DomainTable, HouseListing, LandListing, PropertyDomain};
use crate::loader::{ConcurrentLoader, LoadError, LoadReport, PipelineError};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheState {
    Empty,
    Loading,
    Ready,
    Failed,
}

/// The three tables of one successful load. Cannot be built with a domain
/// missing, so a commit always replaces every key together.
#[derive(Debug, Clone, PartialEq)]
pub struct CompleteLoad {
    pub lands: Vec<LandListing>,
    pub houses: Vec<HouseListing>,
    pub apartments: Vec<ApartmentListing>,
}

impl CompleteLoad {
    pub fn new(
        lands: Vec<LandListing>,
        houses: Vec<HouseListing>,
        apartments: Vec<ApartmentListing>,
    ) -> Self {
        Self {
            lands,
            houses,
            apartments,
        }
    }

    /// Assemble from loose tables; `Err` lists the domains with no table.
    pub fn from_tables(tables: Vec<DomainTable>) -> Result<Self, Vec<PropertyDomain>> {
        let (mut lands, mut houses, mut apartments) = (None, None, None);
        for table in tables {
            match table {
                DomainTable::Lands(rows) => lands = Some(rows),
                DomainTable::Houses(rows) => houses = Some(rows),
                DomainTable::Apartments(rows) => apartments = Some(rows),
            }
        }

        match (lands, houses, apartments) {
            (Some(lands), Some(houses), Some(apartments)) => {
                Ok(Self::new(lands, houses, apartments))
            }
            (lands, houses, apartments) => {
                let mut missing = Vec::new();
                if lands.is_none() {
                    missing.push(PropertyDomain::Lands);
                }
                if houses.is_none() {
                    missing.push(PropertyDomain::Houses);
                }
                if apartments.is_none() {
                    missing.push(PropertyDomain::Apartments);
                }
                Err(missing)
            }
        }
    }

    fn into_tables(self) -> [DomainTable; 3] {
        [
            DomainTable::Lands(self.lands),
            DomainTable::Houses(self.houses),
            DomainTable::Apartments(self.apartments),
        ]
    }
}

#[derive(Debug)]
pub struct SessionCache {
    tables: RwLock<HashMap<PropertyDomain, Arc<DomainTable>>>,
    state: RwLock<CacheState>,
    load_gate: tokio::sync::Mutex<()>,
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionCache {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::with_capacity(3)),
            state: RwLock::new(CacheState::Empty),
            load_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn get(&self, domain: PropertyDomain) -> Option<Arc<DomainTable>> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&domain)
            .cloned()
    }

    pub fn state(&self) -> CacheState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn loaded_domains(&self) -> Vec<PropertyDomain> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        PropertyDomain::ordered()
            .into_iter()
            .filter(|domain| tables.contains_key(domain))
            .collect()
    }

    /// Replace all three tables under a single write lock.
    pub fn put_all(&self, load: CompleteLoad) {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        for table in load.into_tables() {
            tables.insert(table.domain(), Arc::new(table));
        }
        drop(tables);
        self.set_state(CacheState::Ready);
        debug!("committed complete listing load");
    }

    /// Replace only the domains present in `loaded`; other keys keep their
    /// previous tables.
    pub fn merge(&self, loaded: Vec<DomainTable>) {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        for table in loaded {
            tables.insert(table.domain(), Arc::new(table));
        }
        let complete = tables.len() == PropertyDomain::ordered().len();
        drop(tables);
        self.set_state(if complete {
            CacheState::Ready
        } else {
            CacheState::Failed
        });
    }

    /// Enter `Loading` until the returned guard drops. A load abandoned
    /// before it commits puts the previous state back.
    pub fn begin_load(&self) -> LoadingGuard<'_> {
        let previous = self.state();
        self.set_state(CacheState::Loading);
        LoadingGuard {
            cache: self,
            previous,
        }
    }

    pub fn mark_failed(&self) {
        self.set_state(CacheState::Failed);
    }

    /// Return the cached table, running a full load first if it is missing.
    ///
    /// Concurrent callers that miss together share one load.
    pub async fn get_or_load(
        &self,
        loader: &ConcurrentLoader,
        domain: PropertyDomain,
    ) -> Result<Arc<DomainTable>, LoadError> {
        if let Some(table) = self.get(domain) {
            return Ok(table);
        }

        let _gate = self.load_gate.lock().await;
        if let Some(table) = self.get(domain) {
            return Ok(table);
        }

        info!(%domain, "cache miss, loading all domains");
        let report = loader.load_into(self).await?;
        self.get(domain).ok_or_else(|| missing_after_load(&report, domain))
    }

    /// Run a full load even if every table is present.
    pub async fn reload(&self, loader: &ConcurrentLoader) -> Result<LoadReport, LoadError> {
        let _gate = self.load_gate.lock().await;
        loader.load_into(self).await
    }

    fn set_state(&self, next: CacheState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

/// Returned by [`SessionCache::begin_load`].
#[derive(Debug)]
pub struct LoadingGuard<'a> {
    cache: &'a SessionCache,
    previous: CacheState,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.cache.state() == CacheState::Loading {
            debug!(restored = ?self.previous, "listing load abandoned before commit");
            self.cache.set_state(self.previous);
        }
    }
}

fn missing_after_load(report: &LoadReport, domain: PropertyDomain) -> LoadError {
    let failure = report
        .failure_for(domain)
        .cloned()
        .unwrap_or_else(|| PipelineError::worker_failed(domain, "no table produced"));
    LoadError {
        failures: vec![failure],
    }
}

/// Sessions idle longer than this are dropped by default.
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(30 * 60);
/// Default cap on concurrently held sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 64;

#[derive(Debug)]
struct SessionEntry {
    cache: Arc<SessionCache>,
    last_access: Instant,
}

/// One [`SessionCache`] per session id.
///
/// Sessions not touched within `idle_timeout` are evicted on the next access.
/// When `max_sessions` is reached the least recently used session makes room
/// for a new one.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_SESSION_IDLE, DEFAULT_MAX_SESSIONS)
    }

    pub fn with_limits(idle_timeout: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Cache for `session_id`, created empty on first use.
    pub fn session(&self, session_id: &str) -> Arc<SessionCache> {
        self.session_at(session_id, Instant::now())
    }

    fn session_at(&self, session_id: &str, now: Instant) -> Arc<SessionCache> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);

        let before = sessions.len();
        let idle_timeout = self.idle_timeout;
        sessions.retain(|_, entry| now.saturating_duration_since(entry.last_access) < idle_timeout);
        let expired = before - sessions.len();
        if expired > 0 {
            debug!(expired, "evicted idle sessions");
        }

        if let Some(entry) = sessions.get_mut(session_id) {
            entry.last_access = now;
            return Arc::clone(&entry.cache);
        }

        if sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
                debug!(session = %oldest, "evicted least recently used session");
            }
        }

        let cache = Arc::new(SessionCache::new());
        sessions.insert(
            session_id.to_string(),
            SessionEntry {
                cache: Arc::clone(&cache),
                last_access: now,
            },
        );
        cache
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
