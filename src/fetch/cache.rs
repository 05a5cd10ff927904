//! # Retrying cache
//! Wraps the central-bank client, the only rate-sensitive upstream:
//! bounded retry with a fixed delay, then memoization keyed by the
//! exact `(series, start, end)` request. Exhausted retries memoize an
//! empty payload; staleness within one process lifetime is accepted.
//!
//! Concurrent requests for the same key share a single in-flight
//! upstream call (one `tokio::sync::OnceCell` per entry). Eviction is
//! least-recently-used at an injected capacity so tests can build
//! small isolated instances.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use metrics::counter;
use tokio::sync::OnceCell;

use crate::fetch::bcb::{format_br_date, SeriesFetch};
use crate::series::RawObservation;

pub const DEFAULT_CAPACITY: usize = 128;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

type Key = (u32, String, String);
type Payload = Arc<Vec<RawObservation>>;

struct Inner {
    map: HashMap<Key, Arc<OnceCell<Payload>>>,
    // Recency order, least-recent at the front.
    order: VecDeque<Key>,
}

pub struct RetryingCache {
    fetcher: Arc<dyn SeriesFetch>,
    policy: RetryPolicy,
    capacity: usize,
    inner: Mutex<Inner>,
}

impl RetryingCache {
    pub fn new(fetcher: Arc<dyn SeriesFetch>, capacity: usize, policy: RetryPolicy) -> Self {
        Self {
            fetcher,
            policy,
            capacity: capacity.max(1),
            inner: Mutex::new(Inner {
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Cached lookup. Returns a shared read-only payload; callers must
    /// clone before mutating. Never errors: exhausted retries yield an
    /// empty payload, memoized like any other result.
    pub async fn get(&self, series: u32, start: NaiveDate, end: NaiveDate) -> Payload {
        let key: Key = (series, format_br_date(start), format_br_date(end));
        let cell = self.entry(key);
        cell.get_or_init(|| self.fetch_with_retry(series, start, end))
            .await
            .clone()
    }

    /// Number of resident entries (diagnostics and tests).
    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache mutex poisoned").map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, key: Key) -> Arc<OnceCell<Payload>> {
        let mut inner = self.inner.lock().expect("cache mutex poisoned");
        if let Some(cell) = inner.map.get(&key) {
            counter!("bcb_cache_hits_total").increment(1);
            let cell = cell.clone();
            // Refresh recency.
            inner.order.retain(|k| k != &key);
            inner.order.push_back(key);
            return cell;
        }

        counter!("bcb_cache_misses_total").increment(1);
        let cell = Arc::new(OnceCell::new());
        inner.map.insert(key.clone(), cell.clone());
        inner.order.push_back(key);
        while inner.map.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.map.remove(&oldest);
            } else {
                break;
            }
        }
        cell
    }

    async fn fetch_with_retry(&self, series: u32, start: NaiveDate, end: NaiveDate) -> Payload {
        for attempt in 1..=self.policy.attempts {
            match self.fetcher.fetch_series(series, start, end).await {
                Ok(rows) => return Arc::new(rows),
                Err(e) => {
                    tracing::warn!(
                        error = ?e,
                        series,
                        attempt,
                        max_attempts = self.policy.attempts,
                        "bcb fetch failed"
                    );
                    counter!("fetch_errors_total").increment(1);
                    if attempt < self.policy.attempts {
                        counter!("bcb_retry_attempts_total").increment(1);
                        tokio::time::sleep(self.policy.delay).await;
                    }
                }
            }
        }
        counter!("bcb_retry_exhausted_total").increment(1);
        tracing::warn!(series, "bcb retries exhausted, degrading to empty payload");
        Arc::new(Vec::new())
    }
}
