use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;

#[derive(Clone, Debug, Default)]
pub struct RuntimeOverrideStore {
    entries: HashMap<String, RuntimeOverrideEntry>,
}

#[derive(Clone, Debug)]
pub struct RuntimeOverrideEntry {
    pub value: Value,
    pub expires_at: Option<Instant>,
}

impl RuntimeOverrideStore {
    pub fn insert(&mut self, key: String, value: Value, ttl: Option<Duration>, now: Instant) {
        let expires_at = ttl.map(|dur| now + dur);
        self.entries
            .insert(key, RuntimeOverrideEntry { value, expires_at });
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when at least one entry has lapsed and still sits in the store.
    pub fn has_expired(&self, now: Instant) -> bool {
        self.entries
            .values()
            .any(|entry| entry.expires_at.is_some_and(|expires| expires <= now))
    }

    /// Drops lapsed entries and returns the survivors sorted by path.
    pub fn active_entries(&mut self, now: Instant) -> Vec<(String, Value)> {
        self.entries.retain(|_, entry| {
            entry
                .expires_at
                .map(|expires| expires > now)
                .unwrap_or(true)
        });
        let mut result: Vec<(String, Value)> = self
            .entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }
}
