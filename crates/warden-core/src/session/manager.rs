//! Session manager: bounded registry with LRU eviction and TTL reaping

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::reaper::Reaper;
use super::scoped::Session;
use super::types::{SessionConfig, SessionInfo, SessionSnapshot, SessionStats};
use crate::error::{WardenError, WardenResult};
use crate::telemetry::{MetricsSink, NoopMetrics, names};

/// Top-level collection and owner index
///
/// The lock here guards only which sessions exist. Session content is
/// guarded by each session's own lock and is never touched under this one.
#[derive(Debug, Default)]
struct RegistryState {
    sessions: HashMap<String, Arc<Session>>,
    owners: HashMap<String, HashSet<String>>,
    flagged: HashSet<String>,
}

impl RegistryState {
    /// Whether `id` can be taken; an expired holder is removed first so it
    /// neither blocks the id nor costs a live session its place
    fn claim_id(&mut self, id: &str) -> bool {
        match self.sessions.get(id) {
            Some(existing) if existing.is_expired() => {
                self.remove(id);
                debug!(session_id = id, "Expired session replaced");
                true
            }
            Some(_) => false,
            None => true,
        }
    }

    fn insert(&mut self, session: Arc<Session>) {
        if let Some(owner) = session.owner() {
            self.owners
                .entry(owner.to_string())
                .or_default()
                .insert(session.id().to_string());
        }
        self.sessions.insert(session.id().to_string(), session);
    }

    /// Remove a session and its owner index entry together
    fn remove(&mut self, session_id: &str) -> Option<Arc<Session>> {
        let session = self.sessions.remove(session_id)?;
        if let Some(owner) = session.owner() {
            if let Some(ids) = self.owners.get_mut(owner) {
                ids.remove(session_id);
                if ids.is_empty() {
                    self.owners.remove(owner);
                }
            }
        }
        self.flagged.remove(session_id);
        Some(session)
    }

    fn evict_lru(&mut self) -> Option<String> {
        let lru_id = self
            .sessions
            .values()
            .min_by_key(|session| session.last_access_tick())
            .map(|session| session.id().to_string())?;
        self.remove(&lru_id);
        Some(lru_id)
    }

    fn live_sessions(&self) -> Vec<Arc<Session>> {
        self.sessions.values().cloned().collect()
    }
}

/// Shared state between the manager and its reaper task
#[derive(Debug)]
pub(crate) struct Registry {
    config: SessionConfig,
    state: Mutex<RegistryState>,
    metrics: Arc<dyn MetricsSink>,
}

impl Registry {
    fn publish_count(&self, count: usize) {
        self.metrics
            .set_gauge(names::ACTIVE_SESSIONS, count as f64);
    }

    /// Remove every expired session and flag the oversized ones
    pub(crate) fn reap(&self) -> usize {
        let (expired, remaining) = {
            let mut state = self.state.lock();
            let expired: Vec<String> = state
                .sessions
                .values()
                .filter(|session| session.is_expired())
                .map(|session| session.id().to_string())
                .collect();
            for id in &expired {
                state.remove(id);
                info!(session_id = %id, "Session expired and removed");
            }
            (expired, state.live_sessions())
        };

        let mut total_bytes = 0usize;
        let mut oversized = HashSet::new();
        for session in &remaining {
            let size = session.size_bytes();
            total_bytes += size;
            if size > session.max_size_bytes() {
                warn!(
                    session_id = %session.id(),
                    size_kb = size as f64 / 1024.0,
                    limit_kb = session.max_size_bytes() as f64 / 1024.0,
                    "Session exceeds its size limit"
                );
                oversized.insert(session.id().to_string());
            }
        }

        {
            let mut state = self.state.lock();
            oversized.retain(|id| state.sessions.contains_key(id));
            state.flagged = oversized;
        }

        self.publish_count(remaining.len());
        self.metrics
            .set_gauge(names::CONTEXT_SIZE_BYTES, total_bytes as f64);

        if !expired.is_empty() {
            info!(
                expired = expired.len(),
                active = remaining.len(),
                "Session cleanup complete"
            );
        }
        expired.len()
    }
}

/// Manages the lifecycle of scoped sessions
///
/// At most `max_sessions` sessions are live; creating one more evicts the
/// least recently accessed. A background reaper removes expired sessions on
/// a fixed interval and is stopped by [`SessionManager::shutdown`].
#[derive(Debug)]
pub struct SessionManager {
    registry: Arc<Registry>,
    reaper: Mutex<Option<Reaper>>,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_metrics(config, Arc::new(NoopMetrics))
    }

    /// Create a manager that reports session gauges to `metrics`
    ///
    /// The reaper starts when a tokio runtime is available; otherwise
    /// expired sessions are still removed lazily on lookup.
    pub fn with_metrics(config: SessionConfig, metrics: Arc<dyn MetricsSink>) -> Self {
        let interval = config.reaper_interval;
        info!(
            max_sessions = config.max_sessions,
            default_ttl_secs = config.default_ttl_secs,
            "Session manager initialized"
        );

        let registry = Arc::new(Registry {
            config,
            state: Mutex::new(RegistryState::default()),
            metrics,
        });

        let reaper = match tokio::runtime::Handle::try_current() {
            Ok(_) => Some(Reaper::spawn(Arc::downgrade(&registry), interval)),
            Err(_) => {
                warn!("No async runtime available, session reaper not started");
                None
            }
        };

        Self {
            registry,
            reaper: Mutex::new(reaper),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.registry.config
    }

    fn new_session(&self, id: String, owner: Option<String>, ttl: Duration) -> Session {
        Session::new(id, owner, ttl, self.registry.config.max_session_size_bytes())
    }

    /// Make room and insert under an already held registry lock
    fn insert_locked(&self, state: &mut RegistryState, session: Session) -> String {
        if state.sessions.len() >= self.registry.config.max_sessions {
            if let Some(evicted) = state.evict_lru() {
                info!(session_id = %evicted, "Evicted least recently used session");
            }
        }
        let id = session.id().to_string();
        state.insert(Arc::new(session));
        id
    }

    /// Create a session and return its id
    ///
    /// `ttl` falls back to the configured default. An explicit `session_id`
    /// that names a live session is rejected.
    pub fn create_session(
        &self,
        owner: Option<&str>,
        ttl: Option<Duration>,
        session_id: Option<&str>,
    ) -> WardenResult<String> {
        let id = match session_id {
            Some(id) if id.trim().is_empty() => {
                return Err(WardenError::invalid_input("Session id must not be empty"));
            }
            Some(id) => id.to_string(),
            None => uuid::Uuid::new_v4().to_string(),
        };

        let ttl = ttl.unwrap_or_else(|| self.registry.config.default_ttl());
        let session = self.new_session(id.clone(), owner.map(str::to_string), ttl);
        let count = {
            let mut state = self.registry.state.lock();
            if !state.claim_id(&id) {
                return Err(WardenError::session("Session already exists", &id));
            }
            self.insert_locked(&mut state, session);
            state.sessions.len()
        };
        self.registry.publish_count(count);

        info!(
            session_id = %id,
            owner = owner.unwrap_or("-"),
            ttl_secs = ttl.as_secs(),
            "Session created"
        );
        Ok(id)
    }

    /// Look up a live session and mark it as most recently used
    ///
    /// An expired session is removed and reported as absent.
    pub fn get_session(&self, session_id: &str) -> Option<Arc<Session>> {
        let (session, removed_count) = {
            let mut state = self.registry.state.lock();
            let session = state.sessions.get(session_id).cloned()?;
            if session.is_expired() {
                state.remove(session_id);
                debug!(session_id, "Session expired on lookup");
                (None, Some(state.sessions.len()))
            } else {
                session.touch();
                (Some(session), None)
            }
        };
        if let Some(count) = removed_count {
            self.registry.publish_count(count);
        }
        session
    }

    pub fn delete_session(&self, session_id: &str) -> bool {
        let (removed, count) = {
            let mut state = self.registry.state.lock();
            let removed = state.remove(session_id).is_some();
            (removed, state.sessions.len())
        };
        if removed {
            info!(session_id, "Session deleted");
            self.registry.publish_count(count);
        }
        removed
    }

    /// Clear a session's context, keeping its id, owner and TTL
    pub fn reset_session(&self, session_id: &str) -> bool {
        match self.get_session(session_id) {
            Some(session) => {
                session.clear();
                info!(session_id, "Session reset");
                true
            }
            None => false,
        }
    }

    /// Add `extra` to a session's TTL; counts as one access
    pub fn extend_session(&self, session_id: &str, extra: Duration) -> bool {
        match self.get_session(session_id) {
            Some(session) => {
                let ttl = session.extend(extra);
                info!(session_id, new_ttl_secs = ttl.as_secs(), "Session extended");
                true
            }
            None => false,
        }
    }

    /// Live sessions, oldest first, optionally limited to one owner
    pub fn list_sessions(&self, owner: Option<&str>) -> Vec<SessionInfo> {
        let candidates: Vec<Arc<Session>> = {
            let state = self.registry.state.lock();
            match owner {
                Some(owner) => state
                    .owners
                    .get(owner)
                    .map(|ids| {
                        ids.iter()
                            .filter_map(|id| state.sessions.get(id).cloned())
                            .collect()
                    })
                    .unwrap_or_default(),
                None => state.live_sessions(),
            }
        };

        let mut infos: Vec<SessionInfo> = candidates
            .iter()
            .filter(|session| !session.is_expired())
            .map(|session| session.info())
            .collect();
        infos.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        infos
    }

    pub fn snapshot_session(&self, session_id: &str) -> Option<SessionSnapshot> {
        self.get_session(session_id).map(|session| session.snapshot())
    }

    /// Recreate a session from a snapshot and return its id
    ///
    /// The snapshot's id is reused unless it is empty or already live, in
    /// which case a fresh id is assigned. The restored session gets the
    /// default TTL.
    pub fn restore_session(&self, snapshot: &SessionSnapshot) -> String {
        let id = if snapshot.session_id.trim().is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            snapshot.session_id.clone()
        };

        let session = self
            .new_session(id, snapshot.owner.clone(), self.registry.config.default_ttl())
            .with_created_at(snapshot.created_at);
        session.restore(snapshot);

        let (id, count) = {
            let mut state = self.registry.state.lock();
            let session = if state.claim_id(session.id()) {
                session
            } else {
                session.rekeyed(uuid::Uuid::new_v4().to_string())
            };
            let id = self.insert_locked(&mut state, session);
            (id, state.sessions.len())
        };
        self.registry.publish_count(count);
        info!(session_id = %id, "Session restored");
        id
    }

    pub fn stats(&self) -> SessionStats {
        let (sessions, unique_owners, flagged) = {
            let state = self.registry.state.lock();
            (state.live_sessions(), state.owners.len(), state.flagged.len())
        };
        let total_bytes: usize = sessions.iter().map(|s| s.size_bytes()).sum();
        let oldest_session: Option<DateTime<Utc>> =
            sessions.iter().map(|s| s.created_at()).min();

        SessionStats {
            active_sessions: sessions.len(),
            max_sessions: self.registry.config.max_sessions,
            total_size_kb: total_bytes as f64 / 1024.0,
            unique_owners,
            oldest_session,
            flagged_sessions: flagged,
        }
    }

    /// Ids of live sessions currently above the size ceiling
    pub fn oversized_sessions(&self) -> Vec<String> {
        let sessions = self.registry.state.lock().live_sessions();
        let mut ids: Vec<String> = sessions
            .iter()
            .filter(|session| session.is_over_limit())
            .map(|session| session.id().to_string())
            .collect();
        ids.sort();
        ids
    }

    /// Run one reaper pass now; returns the number of sessions removed
    pub fn reap_expired(&self) -> usize {
        self.registry.reap()
    }

    /// Every owner-index entry names a live session of that owner, and
    /// every owned session is indexed
    #[cfg(test)]
    pub(crate) fn owner_index_is_consistent(&self) -> bool {
        let state = self.registry.state.lock();
        let indexed = state.owners.iter().all(|(owner, ids)| {
            ids.iter().all(|id| {
                state
                    .sessions
                    .get(id)
                    .is_some_and(|session| session.owner() == Some(owner.as_str()))
            })
        });
        let covered = state.sessions.values().all(|session| match session.owner() {
            Some(owner) => state
                .owners
                .get(owner)
                .is_some_and(|ids| ids.contains(session.id())),
            None => true,
        });
        indexed && covered
    }

    pub fn session_count(&self) -> usize {
        self.registry.state.lock().sessions.len()
    }

    pub fn is_reaper_running(&self) -> bool {
        self.reaper
            .lock()
            .as_ref()
            .is_some_and(|reaper| reaper.is_running())
    }

    /// Stop the background reaper and wait for it to exit
    pub async fn shutdown(&self) {
        let reaper = self.reaper.lock().take();
        if let Some(reaper) = reaper {
            reaper.stop().await;
            info!("Session manager shut down");
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let Some(reaper) = self.reaper.get_mut().take() {
            reaper.cancel();
        }
    }
}
