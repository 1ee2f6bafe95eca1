//! Keyed coalescing of concurrent work
//!
//! The first caller for a key becomes the leader and runs the work; callers
//! arriving while it runs wait on a watch channel for the leader's value. A
//! leader that is dropped, or that withdraws its value, hands leadership to
//! one of the waiting callers.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Mutex;

use tokio::sync::watch;

/// What a leader does with the value it computed
#[derive(Debug)]
pub enum Completion<V> {
    /// Give the value to every waiting caller
    Publish(V),
    /// Keep the value private; a waiting caller runs its own work instead
    Withdraw(V),
}

/// Coalesces concurrent work per key
pub struct SingleFlight<K, V> {
    inflight: Mutex<HashMap<K, watch::Receiver<Option<V>>>>,
}

impl<K, V> Default for SingleFlight<K, V> {
    fn default() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }
}

enum Role<V> {
    Leader(watch::Sender<Option<V>>),
    Follower(watch::Receiver<Option<V>>),
}

/// Removes the leader's entry when the leader finishes or is dropped
struct LeaderGuard<'a, K: Hash + Eq, V> {
    flight: &'a SingleFlight<K, V>,
    key: K,
}

impl<K: Hash + Eq, V> Drop for LeaderGuard<'_, K, V> {
    fn drop(&mut self) {
        let mut inflight = self.flight.inflight.lock().unwrap_or_else(|e| e.into_inner());
        inflight.remove(&self.key);
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys with work in progress
    pub fn in_flight(&self) -> usize {
        self.inflight.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn join(&self, key: &K) -> Role<V> {
        let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(rx) = inflight.get(key) {
            return Role::Follower(rx.clone());
        }
        let (tx, rx) = watch::channel(None);
        inflight.insert(key.clone(), rx);
        Role::Leader(tx)
    }

    /// Run `work` for `key` unless another caller already is, in which case
    /// wait for and return that caller's published value
    pub async fn run<F, Fut>(&self, key: &K, work: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Completion<V>>,
    {
        loop {
            match self.join(key) {
                Role::Leader(tx) => return self.lead(key, tx, work).await,
                Role::Follower(mut rx) => {
                    tracing::debug!("Joining in-flight work");
                    if let Some(value) = wait_for_value(&mut rx).await {
                        return value;
                    }
                    tracing::debug!("Leader left without a value, retrying");
                }
            }
        }
    }

    /// Run `work` for `key` as the leader, first waiting out any work
    /// already in progress for the key. The earlier value is discarded;
    /// callers arriving meanwhile join this run.
    pub async fn run_after<F, Fut>(&self, key: &K, work: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Completion<V>>,
    {
        loop {
            match self.join(key) {
                Role::Leader(tx) => return self.lead(key, tx, work).await,
                Role::Follower(mut rx) => {
                    tracing::debug!("Waiting for in-flight work before running again");
                    let _ = wait_for_value(&mut rx).await;
                }
            }
        }
    }

    async fn lead<F, Fut>(&self, key: &K, tx: watch::Sender<Option<V>>, work: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Completion<V>>,
    {
        // Declared after `tx` so the entry is gone before followers wake
        let _guard = LeaderGuard {
            flight: self,
            key: key.clone(),
        };
        match work().await {
            Completion::Publish(value) => {
                let _ = tx.send(Some(value.clone()));
                value
            }
            Completion::Withdraw(value) => value,
        }
    }
}

async fn wait_for_value<V: Clone>(rx: &mut watch::Receiver<Option<V>>) -> Option<V> {
    loop {
        if let Some(value) = rx.borrow_and_update().clone() {
            return Some(value);
        }
        if rx.changed().await.is_err() {
            return rx.borrow().clone();
        }
    }
}
