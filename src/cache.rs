//! Events under construction.
//!
//! While a user walks through the creation/edit flow, their half-built event
//! lives here keyed by user id so a dropped modal can be resumed. Entries are
//! time-boxed: a periodic maintenance sweep deletes anything older than two
//! hours. This is an expiring cache, not a concurrency primitive; a second
//! save from the same user overwrites the first.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serenity::all::UserId;
use tokio::sync::Mutex;

use crate::model::event::EventMonkeyEvent;

/// How long an abandoned construction entry survives.
const CONSTRUCTION_TTL_HOURS: i64 = 2;

#[derive(Default)]
pub struct EventsUnderConstruction {
    entries: Mutex<HashMap<UserId, (DateTime<Utc>, EventMonkeyEvent)>>,
}

impl EventsUnderConstruction {
    pub fn new() -> Self {
        Self::default()
    }

    /// The event the user is currently building, if any.
    pub async fn get(&self, user_id: UserId) -> Option<EventMonkeyEvent> {
        self.entries
            .lock()
            .await
            .get(&user_id)
            .map(|(_, event)| event.clone())
    }

    /// Like [`get`](Self::get), but only when the entry was saved within
    /// `max_age` of `now`. A stale draft is treated as absent, so the user is
    /// told to start over instead of submitting against forgotten state.
    pub async fn get_recent(
        &self,
        user_id: UserId,
        max_age: Duration,
        now: DateTime<Utc>,
    ) -> Option<EventMonkeyEvent> {
        self.entries
            .lock()
            .await
            .get(&user_id)
            .filter(|(saved_at, _)| now - *saved_at <= max_age)
            .map(|(_, event)| event.clone())
    }

    /// Saves (or overwrites) the user's in-progress event, refreshing its
    /// expiry clock.
    pub async fn save(&self, event: EventMonkeyEvent) {
        self.entries
            .lock()
            .await
            .insert(event.author_id, (Utc::now(), event));
    }

    pub async fn delete(&self, user_id: UserId) {
        self.entries.lock().await.remove(&user_id);
    }

    /// Drops entries older than the TTL. Returns how many were removed.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let ttl = Duration::hours(CONSTRUCTION_TTL_HOURS);
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, (saved_at, _)| now - *saved_at < ttl);
        before - entries.len()
    }
}
