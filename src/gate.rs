// src/gate.rs
//! Refresh lock and generator cooldown.
//!
//! Both live on the engine instead of in process globals. The lock is
//! advisory: a forced caller always runs, even while another cycle is in
//! flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use metrics::{counter, gauge};

use crate::store::{KvStore, COOLDOWN_KEY};

#[derive(Debug, Default)]
pub struct RefreshGate {
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when dropped, including on early returns.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    gate: &'a RefreshGate,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.gate.in_flight.store(false, Ordering::SeqCst);
    }
}

impl RefreshGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when a cycle is already running and `force` is false.
    pub fn try_enter(&self, force: bool) -> Option<InFlightGuard<'_>> {
        let was_running = self.in_flight.swap(true, Ordering::SeqCst);
        if was_running && !force {
            return None;
        }
        Some(InFlightGuard { gate: self })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// Window during which the generator is skipped, persisted as unix millis
/// under `cf_ai_cooldown_until`.
pub struct Cooldown {
    store: Arc<dyn KvStore>,
    window: Duration,
}

impl Cooldown {
    pub fn new(store: Arc<dyn KvStore>, window: Duration) -> Self {
        Self { store, window }
    }

    pub fn from_minutes(store: Arc<dyn KvStore>, minutes: u64) -> Self {
        Self::new(store, Duration::minutes(minutes as i64))
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// End of the current (or last) cooldown, if one was ever recorded.
    pub fn until(&self) -> Option<DateTime<Utc>> {
        let raw = self.store.get(COOLDOWN_KEY)?;
        let ms = raw.trim().parse::<i64>().ok()?;
        Utc.timestamp_millis_opt(ms).single()
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.until().is_some_and(|until| now < until)
    }

    pub fn start(&self, now: DateTime<Utc>) {
        let until = now + self.window;
        if let Err(e) = self
            .store
            .set(COOLDOWN_KEY, &until.timestamp_millis().to_string())
        {
            tracing::warn!(error = %e, "could not persist ai cooldown");
        }
        counter!("news_ai_cooldowns_total").increment(1);
        gauge!("news_ai_cooldown_active").set(1.0);
        tracing::warn!(until = %until, "ai cooldown started");
    }

    pub fn clear(&self) {
        if let Err(e) = self.store.remove(COOLDOWN_KEY) {
            tracing::warn!(error = %e, "could not clear ai cooldown");
        }
        gauge!("news_ai_cooldown_active").set(0.0);
    }
}
