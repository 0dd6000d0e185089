use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::session::Session;

pub type SharedSession = Arc<Mutex<Session>>;

struct Entry {
    session: SharedSession,
    last_seen: Instant,
}

/// In-memory registry of live sessions.
///
/// Each session has its own lock; callers must not hold it across model calls.
/// Sessions nobody has looked up for `idle_ttl` are dropped by `evict_idle`,
/// unless an analysis or a chat reply is still running on them.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Entry>>,
    quota_window: Duration,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(quota_window: Duration, idle_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            quota_window,
            idle_ttl,
        }
    }

    pub async fn create(&self) -> SharedSession {
        self.evict_idle().await;

        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(Session::new(id, self.quota_window)));
        self.sessions.write().await.insert(
            id,
            Entry {
                session: session.clone(),
                last_seen: Instant::now(),
            },
        );
        info!("Session {id} created");
        session
    }

    /// Looks up a session and marks it as recently used.
    pub async fn get(&self, id: Uuid) -> Result<SharedSession, AppError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))?;
        entry.last_seen = Instant::now();
        Ok(entry.session.clone())
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), AppError> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .map(|_| info!("Session {id} closed"))
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
    }

    /// Drops idle sessions and returns how many went.
    pub async fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let ttl = self.idle_ttl;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|id, entry| {
            if now.saturating_duration_since(entry.last_seen) < ttl {
                return true;
            }
            // A locked session is in use right now.
            let busy = match entry.session.try_lock() {
                Ok(s) => s.analyzing || s.chatting,
                Err(_) => true,
            };
            if !busy {
                debug!("Session {id} expired after {}s idle", ttl.as_secs());
            }
            busy
        });

        let evicted = before - sessions.len();
        if evicted > 0 {
            info!("Evicted {evicted} idle session(s)");
        }
        evicted
    }

    /// Runs `evict_idle` every `period` until the runtime shuts down.
    pub fn spawn_sweeper(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut timer = interval(period);
            loop {
                timer.tick().await;
                self.evict_idle().await;
            }
        })
    }
}
