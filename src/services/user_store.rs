use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;

use crate::models::User;

/// In-memory user repository
///
/// Keeps insertion order so listings are stable. Bounded: once `capacity`
/// users are stored, each insert evicts the oldest entry.
pub struct UserStore {
    inner: RwLock<Inner>,
    capacity: usize,
}

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    order: VecDeque<String>,
}

impl UserStore {
    /// Create an empty store
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            capacity: capacity.max(1),
        }
    }

    /// Create a store pre-populated with the demo users
    pub fn with_seed_users(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut inner = Inner::default();
        for user in [
            User::new("Alice", "alice@example.com"),
            User::new("Bob", "bob@example.com"),
        ] {
            inner.insert(user, capacity);
        }

        Self {
            inner: RwLock::new(inner),
            capacity,
        }
    }

    /// All users in insertion order
    pub async fn list(&self) -> Vec<User> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|id| inner.users.get(id).cloned())
            .collect()
    }

    pub async fn get(&self, id: &str) -> Option<User> {
        self.inner.read().await.users.get(id).cloned()
    }

    /// Store a new user and return it with its assigned id
    pub async fn create(&self, name: &str, email: &str) -> User {
        let user = User::new(name, email);
        let evicted = self.inner.write().await.insert(user.clone(), self.capacity);

        if let Some(old) = evicted {
            tracing::debug!(evicted_user_id = %old, "User store full, evicted oldest entry");
        }
        user
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Inner {
    fn insert(&mut self, user: User, capacity: usize) -> Option<String> {
        let mut evicted = None;
        if self.users.len() >= capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.users.remove(&oldest);
                evicted = Some(oldest);
            }
        }
        self.order.push_back(user.id.clone());
        self.users.insert(user.id.clone(), user);
        evicted
    }
}
