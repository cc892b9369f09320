//! Bounded most-recently-used username list.
//!
//! Index 0 is the most recent entry. Entries are unique under exact,
//! case-sensitive comparison and the list never grows past its capacity;
//! overflow is dropped from the tail.

use std::collections::VecDeque;

/// Maximum number of usernames remembered per user.
pub const MAX_USERNAMES: usize = 20;

/// Number of suggestions returned when the caller does not ask for a limit.
pub const DEFAULT_LIMIT: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecencyList {
    entries: VecDeque<String>,
    capacity: usize,
}

impl RecencyList {
    /// Create an empty list. The capacity is clamped to `1..=MAX_USERNAMES`.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.clamp(1, MAX_USERNAMES),
        }
    }

    /// Rebuild a list from a persisted value, cutting it back to `capacity`.
    pub fn from_stored(stored: Option<&[String]>, capacity: usize) -> Self {
        let mut list = Self::new(capacity);
        if let Some(stored) = stored {
            list.entries.extend(stored.iter().take(list.capacity).cloned());
        }
        list
    }

    /// Move `username` to the front, inserting it if needed.
    ///
    /// The value is trimmed first. Blank input leaves the list untouched and
    /// returns `false`.
    pub fn record(&mut self, username: &str) -> bool {
        let username = username.trim();
        if username.is_empty() {
            return false;
        }

        self.entries.retain(|entry| entry != username);
        self.entries.push_front(username.to_owned());
        if self.entries.len() > self.capacity {
            self.entries.truncate(self.capacity);
        }
        true
    }

    /// Record every value in order, so the last one ends up first.
    pub fn record_all<I, S>(&mut self, usernames: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for username in usernames {
            self.record(username.as_ref());
        }
    }

    /// The first `limit` entries, most recent first.
    pub fn recent(&self, limit: usize) -> Vec<String> {
        self.entries.iter().take(limit).cloned().collect()
    }

    pub fn index_of(&self, username: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry == username)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn into_vec(self) -> Vec<String> {
        self.entries.into()
    }
}

impl Default for RecencyList {
    fn default() -> Self {
        Self::new(MAX_USERNAMES)
    }
}

/// First `limit` entries of a persisted list.
pub(crate) fn take_recent(stored: &[String], limit: usize) -> Vec<String> {
    stored.iter().take(limit).cloned().collect()
}
