//! Per-domain batching: coalesce work items for the same destination so a
//! single SMTP session can carry them.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

pub const DEFAULT_BATCH_SIZE: usize = 20;
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(400);

struct Lane<T> {
    items: VecDeque<T>,
    notify: Arc<Notify>,
}

impl<T> Default for Lane<T> {
    fn default() -> Self {
        Self {
            items: VecDeque::new(),
            notify: Arc::new(Notify::new()),
        }
    }
}

/// Batches items per domain. A batch is emitted once it reaches
/// `batch_size` or once `max_wait` has elapsed since its first item,
/// whichever comes first. Order within a batch is submission order;
/// lanes for different domains are independent.
pub struct DomainBatcher<T> {
    lanes: Mutex<HashMap<String, Lane<T>>>,
    batch_size: usize,
    max_wait: Duration,
}

impl<T> DomainBatcher<T> {
    pub fn new(batch_size: usize, max_wait: Duration) -> Self {
        Self {
            lanes: Mutex::new(HashMap::new()),
            batch_size: batch_size.max(1),
            max_wait,
        }
    }

    pub fn add(&self, domain: &str, item: T) {
        let notify = {
            let mut lanes = self.lanes.lock().expect("batcher lanes poisoned");
            let lane = lanes.entry(domain.to_string()).or_default();
            lane.items.push_back(item);
            lane.notify.clone()
        };
        notify.notify_one();
    }

    pub fn pending(&self, domain: &str) -> usize {
        let lanes = self.lanes.lock().expect("batcher lanes poisoned");
        lanes.get(domain).map(|lane| lane.items.len()).unwrap_or(0)
    }

    /// Drop the lane bookkeeping for a domain with no queued items.
    pub fn remove_idle_lane(&self, domain: &str) {
        let mut lanes = self.lanes.lock().expect("batcher lanes poisoned");
        if lanes.get(domain).is_some_and(|lane| lane.items.is_empty()) {
            lanes.remove(domain);
        }
    }

    fn try_pop(&self, domain: &str) -> Option<T> {
        let mut lanes = self.lanes.lock().expect("batcher lanes poisoned");
        lanes.get_mut(domain).and_then(|lane| lane.items.pop_front())
    }

    fn lane_notify(&self, domain: &str) -> Arc<Notify> {
        let mut lanes = self.lanes.lock().expect("batcher lanes poisoned");
        lanes.entry(domain.to_string()).or_default().notify.clone()
    }

    async fn pop_waiting(&self, domain: &str) -> T {
        let notify = self.lane_notify(domain);
        loop {
            if let Some(item) = self.try_pop(domain) {
                return item;
            }
            notify.notified().await;
        }
    }

    /// Next batch for `domain`; empty when nothing arrived within
    /// `max_wait`.
    pub async fn next_batch(&self, domain: &str) -> Vec<T> {
        let Ok(first) = tokio::time::timeout(self.max_wait, self.pop_waiting(domain)).await else {
            return Vec::new();
        };

        let mut batch = vec![first];
        let deadline = Instant::now() + self.max_wait;

        while batch.len() < self.batch_size {
            if let Some(item) = self.try_pop(domain) {
                batch.push(item);
                continue;
            }
            let notify = self.lane_notify(domain);
            if tokio::time::timeout_at(deadline, notify.notified())
                .await
                .is_err()
            {
                break;
            }
        }

        batch
    }
}

impl<T> Default for DomainBatcher<T> {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE, DEFAULT_MAX_WAIT)
    }
}
