//! Browser session registry.
//!
//! Maps a cookie-carried session identifier to the conversation held for
//! that browser. Sessions are created lazily on the first request that
//! carries no known identifier.

use crate::provider::Message;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

/// One exchange between the user and the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub input: String,
    pub response: String,
}

/// Ordered transcript of prior turns.
#[derive(Debug, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Record a completed exchange.
    pub fn push_turn(&mut self, input: impl Into<String>, response: impl Into<String>) {
        self.turns.push(Turn {
            input: input.into(),
            response: response.into(),
        });
    }

    /// Transcript as chat messages, followed by the new user input.
    pub fn to_messages(&self, input: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.turns.len() * 2 + 1);
        for turn in &self.turns {
            messages.push(Message::user(&turn.input));
            messages.push(Message::assistant(&turn.response));
        }
        messages.push(Message::user(input));
        messages
    }
}

/// A browser session and its conversation.
#[derive(Debug)]
pub struct Session {
    id: String,
    conversation: Mutex<Conversation>,
    last_active: AtomicI64,
}

impl Session {
    fn new(id: String) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id,
            conversation: Mutex::new(Conversation::default()),
            last_active: AtomicI64::new(now),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Conversation state. Hold the lock for a whole turn so turns of one
    /// session are appended in order.
    pub fn conversation(&self) -> &Mutex<Conversation> {
        &self.conversation
    }

    /// Last activity timestamp (Unix millis)
    pub fn last_active(&self) -> i64 {
        self.last_active.load(Ordering::Relaxed)
    }

    /// Mark the session as used now.
    pub fn touch(&self) {
        self.last_active
            .store(chrono::Utc::now().timestamp_millis(), Ordering::Relaxed);
    }
}

/// Storage for browser sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Look up a session by identifier.
    async fn get(&self, id: &str) -> Option<Arc<Session>>;

    /// Create a session with a fresh random identifier.
    async fn create(&self) -> Arc<Session>;

    /// Return the session for `id` if it is known, otherwise create a new
    /// session with a fresh identifier.
    async fn get_or_create(&self, id: Option<&str>) -> Arc<Session>;

    /// Remove sessions idle for longer than `max_idle`. Returns the number removed.
    async fn evict_idle(&self, max_idle: Duration) -> usize;

    /// Number of live sessions.
    async fn len(&self) -> usize;
}

/// Process-lifetime session store backed by a `HashMap`.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn generate_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn insert_new(map: &mut HashMap<String, Arc<Session>>) -> Arc<Session> {
        let session = Arc::new(Session::new(Self::generate_id()));
        map.insert(session.id.clone(), Arc::clone(&session));
        tracing::debug!(session_id = %session.id, total = map.len(), "Session created");
        session
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(id).cloned()
    }

    async fn create(&self) -> Arc<Session> {
        let mut sessions = self.sessions.write().await;
        Self::insert_new(&mut sessions)
    }

    async fn get_or_create(&self, id: Option<&str>) -> Arc<Session> {
        if let Some(id) = id {
            if let Some(session) = self.get(id).await {
                return session;
            }
        }

        let mut sessions = self.sessions.write().await;
        // Re-check: the session may have been created between the two locks.
        if let Some(session) = id.and_then(|id| sessions.get(id)) {
            return Arc::clone(session);
        }
        Self::insert_new(&mut sessions)
    }

    async fn evict_idle(&self, max_idle: Duration) -> usize {
        let max_idle_ms = i64::try_from(max_idle.as_millis()).unwrap_or(i64::MAX);
        let cutoff = chrono::Utc::now()
            .timestamp_millis()
            .saturating_sub(max_idle_ms);
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.last_active() >= cutoff);
        before - sessions.len()
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Periodically evict sessions idle longer than `max_idle`.
pub fn spawn_idle_sweeper(
    store: Arc<dyn SessionStore>,
    max_idle: Duration,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let removed = store.evict_idle(max_idle).await;
            if removed > 0 {
                let remaining = store.len().await;
                tracing::info!(removed, remaining, "Evicted idle sessions");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_id_creates_session() {
        let store = InMemorySessionStore::new();
        let session = store.get_or_create(None).await;
        assert_eq!(session.id().len(), 36);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn known_id_reuses_session() {
        let store = InMemorySessionStore::new();
        let first = store.get_or_create(None).await;
        first
            .conversation()
            .lock()
            .await
            .push_turn("hello", "hi there");

        let second = store.get_or_create(Some(first.id())).await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.conversation().lock().await.turns().len(), 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn unknown_id_gets_fresh_identifier() {
        let store = InMemorySessionStore::new();
        let session = store.get_or_create(Some("forged-id")).await;
        assert_ne!(session.id(), "forged-id");
        assert!(store.get("forged-id").await.is_none());
        assert!(session.conversation().lock().await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_lookups_share_one_session() {
        let store = Arc::new(InMemorySessionStore::new());
        let session = store.create().await;
        let id = session.id().to_string();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                let id = id.clone();
                tokio::spawn(async move { store.get_or_create(Some(&id)).await })
            })
            .collect();

        for handle in handles {
            let found = handle.await.unwrap();
            assert!(Arc::ptr_eq(&found, &session));
        }
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn evict_idle_with_huge_ttl_keeps_everything() {
        let store = InMemorySessionStore::new();
        let session = store.create().await;
        session.touch();

        assert_eq!(store.evict_idle(Duration::from_secs(u64::MAX)).await, 0);
        assert_eq!(store.evict_idle(Duration::MAX).await, 0);
        assert!(store.get(session.id()).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sweeper_evicts_on_each_tick() {
        let store = Arc::new(InMemorySessionStore::new());
        let first = store.create().await;
        let second = store.create().await;
        let keep = store.create().await;
        first.last_active.store(
            chrono::Utc::now().timestamp_millis() - 120_000,
            Ordering::Relaxed,
        );

        let dyn_store: Arc<dyn SessionStore> = store.clone();
        let handle =
            spawn_idle_sweeper(dyn_store, Duration::from_secs(60), Duration::from_secs(30));

        // First tick fires immediately.
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert!(store.get(first.id()).await.is_none());
        assert_eq!(store.len().await, 2);

        second.last_active.store(
            chrono::Utc::now().timestamp_millis() - 120_000,
            Ordering::Relaxed,
        );
        keep.touch();
        tokio::time::sleep(Duration::from_secs(31)).await;

        assert!(store.get(second.id()).await.is_none());
        assert!(store.get(keep.id()).await.is_some());
        assert_eq!(store.len().await, 1);

        handle.abort();
    }

    #[tokio::test]
    async fn evict_idle_keeps_recent_sessions() {
        let store = InMemorySessionStore::new();
        let stale = store.create().await;
        let fresh = store.create().await;
        stale
            .last_active
            .store(chrono::Utc::now().timestamp_millis() - 60_000, Ordering::Relaxed);
        fresh.touch();

        let removed = store.evict_idle(Duration::from_secs(30)).await;
        assert_eq!(removed, 1);
        assert!(store.get(stale.id()).await.is_none());
        assert!(store.get(fresh.id()).await.is_some());
    }

    #[test]
    fn conversation_to_messages_orders_turns() {
        let mut conversation = Conversation::default();
        conversation.push_turn("Can I return this item?", "Yes, within 30 days.");

        let messages = conversation.to_messages("Do I need the receipt?");
        assert_eq!(
            messages,
            vec![
                Message::user("Can I return this item?"),
                Message::assistant("Yes, within 30 days."),
                Message::user("Do I need the receipt?"),
            ]
        );
    }

    #[test]
    fn empty_conversation_sends_only_input() {
        let conversation = Conversation::default();
        assert_eq!(conversation.to_messages("hi"), vec![Message::user("hi")]);
    }
}
