//! Last-request-wins coordination for funnel previews.
//!
//! An editor sends a preview request on every change to its steps, tagging
//! each with an increasing `sequence`. Only the newest request per editor
//! should reach the analytics store, and only its result should be shown.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Longest `editor_id` accepted from clients.
pub const MAX_EDITOR_ID_LEN: usize = 128;

/// Editors not heard from for this long are forgotten.
pub const EDITOR_IDLE_TTL: Duration = Duration::from_secs(10 * 60);

/// Editor ids are client-chosen, so they are scoped to a dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewKey {
    pub dashboard_id: String,
    pub editor_id: String,
}

impl PreviewKey {
    pub fn new(dashboard_id: impl Into<String>, editor_id: impl Into<String>) -> Self {
        Self {
            dashboard_id: dashboard_id.into(),
            editor_id: editor_id.into(),
        }
    }
}

struct Tracked {
    sequence: u64,
    seen: Instant,
}

pub struct PreviewCoordinator {
    latest: Mutex<HashMap<PreviewKey, Tracked>>,
    debounce: Duration,
}

impl PreviewCoordinator {
    pub fn new(debounce: Duration) -> Self {
        Self {
            latest: Mutex::new(HashMap::new()),
            debounce,
        }
    }

    /// Record `sequence` as the newest for `key`. Returns `false` when a
    /// newer sequence has already been seen.
    ///
    /// Also drops every editor idle for longer than [`EDITOR_IDLE_TTL`].
    pub async fn register(&self, key: &PreviewKey, sequence: u64) -> bool {
        let now = Instant::now();
        let mut latest = self.latest.lock().await;
        latest.retain(|_, tracked| now.duration_since(tracked.seen) < EDITOR_IDLE_TTL);

        let tracked = latest
            .entry(key.clone())
            .or_insert(Tracked { sequence, seen: now });
        tracked.seen = now;
        if sequence < tracked.sequence {
            return false;
        }
        tracked.sequence = sequence;
        true
    }

    pub async fn is_current(&self, key: &PreviewKey, sequence: u64) -> bool {
        self.latest
            .lock()
            .await
            .get(key)
            .is_some_and(|tracked| tracked.sequence == sequence)
    }

    /// Register, wait out the debounce interval, then report whether the
    /// request is still the newest one for its editor.
    pub async fn settle(&self, key: &PreviewKey, sequence: u64) -> bool {
        if !self.register(key, sequence).await {
            debug!(editor_id = %key.editor_id, sequence, "preview already stale");
            return false;
        }
        tokio::time::sleep(self.debounce).await;
        self.is_current(key, sequence).await
    }

    #[cfg(test)]
    async fn tracked_editors(&self) -> usize {
        self.latest.lock().await.len()
    }
}
