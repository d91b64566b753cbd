//! A single scoped session with its own lock

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::warn;

use super::types::{SessionInfo, SessionSnapshot};

/// Fixed origin for the monotonic access ticks
static CLOCK_ORIGIN: LazyLock<Instant> = LazyLock::new(Instant::now);

/// Nanoseconds since [`CLOCK_ORIGIN`]
fn now_tick() -> u64 {
    duration_nanos(CLOCK_ORIGIN.elapsed())
}

fn duration_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

/// Access bookkeeping readable without the session lock
///
/// The registry checks expiry and LRU order through these fields while it
/// holds its own lock, so it never waits on a session's context.
#[derive(Debug)]
struct AccessClock {
    last_tick: AtomicU64,
    last_wall_ms: AtomicI64,
    ttl_nanos: AtomicU64,
    count: AtomicU64,
}

impl AccessClock {
    fn new(ttl: Duration) -> Self {
        Self {
            last_tick: AtomicU64::new(now_tick()),
            last_wall_ms: AtomicI64::new(Utc::now().timestamp_millis()),
            ttl_nanos: AtomicU64::new(duration_nanos(ttl)),
            count: AtomicU64::new(0),
        }
    }

    fn touch(&self) {
        self.last_tick.fetch_max(now_tick(), Ordering::Relaxed);
        self.last_wall_ms
            .fetch_max(Utc::now().timestamp_millis(), Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    fn idle(&self) -> Duration {
        Duration::from_nanos(now_tick().saturating_sub(self.last_tick.load(Ordering::Relaxed)))
    }

    fn ttl(&self) -> Duration {
        Duration::from_nanos(self.ttl_nanos.load(Ordering::Relaxed))
    }

    fn last_accessed_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_wall_ms.load(Ordering::Relaxed))
            .unwrap_or_else(Utc::now)
    }
}

/// Context and metadata, guarded by the session's lock
#[derive(Debug, Default)]
struct SessionState {
    context: Map<String, Value>,
    metadata: Map<String, Value>,
}

/// Scoped key/value context with a sliding TTL and a size ceiling
///
/// Expiry is measured from the last access, so any read or write keeps the
/// session alive. Context access goes through the session's own lock,
/// independent of the manager that owns it.
#[derive(Debug)]
pub struct Session {
    id: String,
    owner: Option<String>,
    created_at: DateTime<Utc>,
    max_size_bytes: usize,
    clock: AccessClock,
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        owner: Option<String>,
        ttl: Duration,
        max_size_bytes: usize,
    ) -> Self {
        Self {
            id: id.into(),
            owner,
            created_at: Utc::now(),
            max_size_bytes,
            clock: AccessClock::new(ttl),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub(crate) fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Same session under another id; only valid before it is shared
    pub(crate) fn rekeyed(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn max_size_bytes(&self) -> usize {
        self.max_size_bytes
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.clock.touch();
        self.state.lock().context.get(key).cloned()
    }

    /// Store a value unless the resulting context would exceed the size ceiling
    ///
    /// A rejected write leaves the context untouched and returns `false`.
    pub fn set(&self, key: impl Into<String>, value: Value) -> bool {
        let key = key.into();
        let mut state = self.state.lock();

        let mut candidate = state.context.clone();
        candidate.insert(key.clone(), value.clone());
        let candidate_size = serialized_len(&candidate);
        if candidate_size > self.max_size_bytes {
            warn!(
                session_id = %self.id,
                size_kb = candidate_size as f64 / 1024.0,
                limit_kb = self.max_size_bytes as f64 / 1024.0,
                "Session size limit exceeded, write rejected"
            );
            return false;
        }

        state.context.insert(key, value);
        self.clock.touch();
        true
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.clock.touch();
        self.state.lock().context.remove(key)
    }

    pub fn set_metadata(&self, key: impl Into<String>, value: Value) {
        self.state.lock().metadata.insert(key.into(), value);
    }

    pub fn clear(&self) {
        self.state.lock().context.clear();
        self.clock.touch();
    }

    /// Record an access without touching the context; lock-free
    pub fn touch(&self) {
        self.clock.touch();
    }

    /// Lock-free
    pub fn is_expired(&self) -> bool {
        self.clock.idle() > self.clock.ttl()
    }

    pub fn ttl(&self) -> Duration {
        self.clock.ttl()
    }

    pub fn ttl_remaining(&self) -> Duration {
        self.clock.ttl().saturating_sub(self.clock.idle())
    }

    /// Lengthen the TTL and return the new total
    ///
    /// An extend counts as an access: `access_count` goes up by one and the
    /// sliding expiry restarts from now. The count is never reset.
    pub fn extend(&self, extra: Duration) -> Duration {
        let extra = duration_nanos(extra);
        let previous = self
            .clock
            .ttl_nanos
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |ttl| {
                Some(ttl.saturating_add(extra))
            })
            .unwrap_or_else(|current| current);
        self.clock.touch();
        Duration::from_nanos(previous.saturating_add(extra))
    }

    pub fn access_count(&self) -> u64 {
        self.clock.count.load(Ordering::Relaxed)
    }

    /// Monotonic tick of the last access, for LRU ordering; lock-free
    pub(crate) fn last_access_tick(&self) -> u64 {
        self.clock.last_tick.load(Ordering::Relaxed)
    }

    /// Byte length of the context serialized as JSON
    pub fn size_bytes(&self) -> usize {
        serialized_len(&self.state.lock().context)
    }

    pub fn is_over_limit(&self) -> bool {
        self.size_bytes() > self.max_size_bytes
    }

    /// Hold the context lock until the returned guard drops
    #[cfg(test)]
    pub(crate) fn hold_context_lock(&self) -> impl Sized + '_ {
        self.state.lock()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock();
        SessionSnapshot {
            session_id: self.id.clone(),
            created_at: self.created_at,
            last_accessed: self.clock.last_accessed_at(),
            owner: self.owner.clone(),
            context: state.context.clone(),
            metadata: state.metadata.clone(),
            access_count: self.access_count(),
            size_bytes: serialized_len(&state.context),
        }
    }

    /// Replace context, metadata and access count from a snapshot
    pub fn restore(&self, snapshot: &SessionSnapshot) {
        {
            let mut state = self.state.lock();
            state.context = snapshot.context.clone();
            state.metadata = snapshot.metadata.clone();
        }
        self.clock
            .count
            .store(snapshot.access_count, Ordering::Relaxed);
        self.clock.touch();
    }

    pub fn info(&self) -> SessionInfo {
        let size_bytes = self.size_bytes();
        SessionInfo {
            session_id: self.id.clone(),
            owner: self.owner.clone(),
            created_at: self.created_at,
            last_accessed: self.clock.last_accessed_at(),
            ttl_remaining: self.ttl_remaining().as_secs(),
            size_kb: size_bytes as f64 / 1024.0,
            access_count: self.access_count(),
        }
    }
}

fn serialized_len(context: &Map<String, Value>) -> usize {
    serde_json::to_vec(context)
        .map(|bytes| bytes.len())
        .unwrap_or(usize::MAX)
}
