//! Per-(specialty, user) conversation memory
//!
//! Threads live in a bounded LRU map. A thread idle for longer than the TTL
//! is replaced by an empty one on next access, unless a request is still
//! holding it. Each thread sits behind its own async mutex so requests for
//! the same key are serialized for their whole duration.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::providers::ChatMessage;
use crate::specialty::Specialty;

pub const DEFAULT_CAPACITY: usize = 1024;
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThreadKey {
    pub specialty: Specialty,
    pub user_id: String,
}

impl ThreadKey {
    pub fn new(specialty: Specialty, user_id: impl Into<String>) -> Self {
        Self {
            specialty,
            user_id: user_id.into(),
        }
    }
}

impl std::fmt::Display for ThreadKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.specialty, self.user_id)
    }
}

/// Ordered turns of one conversation. Append-only.
#[derive(Debug, Clone, Default)]
pub struct ConversationThread {
    messages: Vec<ChatMessage>,
}

impl ConversationThread {
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn append(&mut self, turns: impl IntoIterator<Item = ChatMessage>) {
        self.messages.extend(turns);
    }
}

struct Slot {
    thread: Arc<Mutex<ConversationThread>>,
    touched: Instant,
}

impl Slot {
    fn fresh(now: Instant) -> Self {
        Self {
            thread: Arc::new(Mutex::new(ConversationThread::default())),
            touched: now,
        }
    }

    /// Held by an in-flight request
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.thread) > 1
    }
}

pub struct ThreadStore {
    slots: Mutex<LruCache<ThreadKey, Slot>>,
    /// Target size. The map grows past it only while every thread is held.
    capacity: NonZeroUsize,
    idle_ttl: Duration,
}

impl ThreadStore {
    pub fn new(capacity: usize, idle_ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            slots: Mutex::new(LruCache::new(capacity)),
            capacity,
            idle_ttl,
        }
    }

    /// Free a slot for `key` by evicting idle threads, least recent first.
    /// Threads held by a request are never evicted.
    fn make_room(&self, slots: &mut LruCache<ThreadKey, Slot>, key: &ThreadKey) {
        if slots.contains(key) {
            return;
        }
        while slots.len() >= self.capacity.get() {
            let idle = slots
                .iter()
                .rev()
                .find(|(_, slot)| !slot.in_use())
                .map(|(k, _)| k.clone());
            let Some(victim) = idle else {
                break;
            };
            debug!("Evicting idle thread {}", victim);
            slots.pop(&victim);
        }

        let wanted = NonZeroUsize::new(slots.len() + 1)
            .map_or(self.capacity, |needed| needed.max(self.capacity));
        if wanted != slots.cap() {
            if wanted > self.capacity {
                warn!("All {} threads are in use, growing past capacity", slots.len());
            }
            slots.resize(wanted);
        }
    }

    /// Exclusive access to the thread for `key`, created if absent or expired.
    /// Waits while another request holds the same thread.
    pub async fn acquire(&self, key: &ThreadKey) -> OwnedMutexGuard<ConversationThread> {
        let thread = {
            let mut slots = self.slots.lock().await;
            let now = Instant::now();
            let expired = slots
                .peek(key)
                .is_some_and(|slot| !slot.in_use() && now.duration_since(slot.touched) > self.idle_ttl);
            if expired {
                debug!("Thread {} idle past TTL, starting fresh", key);
                slots.pop(key);
            }
            self.make_room(&mut slots, key);
            let slot = slots.get_or_insert_mut(key.clone(), || {
                debug!("Creating thread {}", key);
                Slot::fresh(now)
            });
            slot.touched = now;
            slot.thread.clone()
        };
        thread.lock_owned().await
    }

    /// Number of live threads
    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.lock().await.is_empty()
    }
}

impl Default for ThreadStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_IDLE_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_threads_are_isolated_per_key() {
        let store = ThreadStore::default();
        let a = ThreadKey::new(Specialty::Clinical, "alice");
        let b = ThreadKey::new(Specialty::Clinical, "bob");
        let a_risk = ThreadKey::new(Specialty::Risk, "alice");

        store.acquire(&a).await.append([ChatMessage::user("hi from alice")]);
        assert_eq!(store.acquire(&a).await.len(), 1);
        assert!(store.acquire(&b).await.is_empty());
        assert!(store.acquire(&a_risk).await.is_empty());
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_append_order_is_kept() {
        let store = ThreadStore::default();
        let key = ThreadKey::new(Specialty::Nutrition, "u1");
        for i in 0..5 {
            store
                .acquire(&key)
                .await
                .append([ChatMessage::user(format!("m{}", i))]);
        }
        let thread = store.acquire(&key).await;
        let texts: Vec<String> = thread.messages().iter().map(|m| m.text()).collect();
        assert_eq!(texts, vec!["m0", "m1", "m2", "m3", "m4"]);
    }

    #[tokio::test]
    async fn test_lru_capacity_evicts_oldest() {
        let store = ThreadStore::new(2, DEFAULT_IDLE_TTL);
        let keys: Vec<ThreadKey> = (0..3).map(|i| ThreadKey::new(Specialty::Exercise, format!("u{}", i))).collect();
        for key in &keys {
            store.acquire(key).await.append([ChatMessage::user("x")]);
        }
        assert_eq!(store.len().await, 2);
        assert!(store.acquire(&keys[0]).await.is_empty());
        assert_eq!(store.acquire(&keys[2]).await.len(), 1);
    }

    #[tokio::test]
    async fn test_capacity_never_evicts_held_thread() {
        let store = ThreadStore::new(1, DEFAULT_IDLE_TTL);
        let alice = ThreadKey::new(Specialty::Clinical, "alice");
        let bob = ThreadKey::new(Specialty::Clinical, "bob");

        let mut held = store.acquire(&alice).await;
        held.append([ChatMessage::user("in flight")]);

        // bob fits by growing the map instead of evicting alice
        store.acquire(&bob).await.append([ChatMessage::user("hi")]);
        assert_eq!(store.len().await, 2);

        // a second request for alice still waits on the held thread
        let waited =
            tokio::time::timeout(Duration::from_millis(200), store.acquire(&alice)).await;
        assert!(waited.is_err());

        drop(held);
        assert_eq!(store.acquire(&alice).await.len(), 1);

        // once nothing is held the store shrinks back to capacity
        let carol = ThreadKey::new(Specialty::Clinical, "carol");
        drop(store.acquire(&carol).await);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_idle_ttl_resets_thread() {
        let store = ThreadStore::new(8, Duration::from_millis(20));
        let key = ThreadKey::new(Specialty::Clinical, "u1");
        store.acquire(&key).await.append([ChatMessage::user("old")]);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(store.acquire(&key).await.is_empty());
    }

    #[tokio::test]
    async fn test_held_thread_is_not_expired() {
        let store = ThreadStore::new(8, Duration::from_millis(10));
        let key = ThreadKey::new(Specialty::Clinical, "u1");
        let mut guard = store.acquire(&key).await;
        guard.append([ChatMessage::user("in flight")]);
        tokio::time::sleep(Duration::from_millis(30)).await;

        // A second request waits on the same thread instead of replacing it
        let waiter = {
            let store = &store;
            let key = key.clone();
            async move { store.acquire(&key).await.len() }
        };
        let (len, ()) = tokio::join!(waiter, async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            drop(guard);
        });
        assert_eq!(len, 1);
    }
}
