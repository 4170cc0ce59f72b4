//! Daily status history
//!
//! Every executed switch is recorded as a typed entry. The history is
//! cleared at the daily reset and capped so a flapping day cannot grow the
//! retained payload without bound.

use crate::error::Result;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Reason recorded for the entry seeded at the daily reset
pub const DAILY_RESET_REASON: &str = "Daily Reset";

/// One recorded switch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    /// Local time of the switch
    pub timestamp: DateTime<FixedOffset>,
    /// `ON` or `OFF`
    pub action: String,
    pub reason: String,
}

impl StatusEntry {
    pub fn new<A: Into<String>, R: Into<String>>(
        timestamp: DateTime<FixedOffset>,
        action: A,
        reason: R,
    ) -> Self {
        Self {
            timestamp,
            action: action.into(),
            reason: reason.into(),
        }
    }
}

/// Ordered, capped list of status entries (oldest first)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusHistory {
    entries: VecDeque<StatusEntry>,
    max_entries: usize,
}

impl StatusHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Append an entry, evicting the oldest when full
    pub fn push(&mut self, entry: StatusEntry) {
        while self.entries.len() >= self.max_entries {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Clear the history and seed it with the daily reset entry
    pub fn reset_with_daily_entry(&mut self, timestamp: DateTime<FixedOffset>) {
        self.entries.clear();
        self.entries
            .push_back(StatusEntry::new(timestamp, "OFF", DAILY_RESET_REASON));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &StatusEntry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&StatusEntry> {
        self.entries.back()
    }

    /// Serialize as a JSON array
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.entries)?)
    }

    /// Parse a JSON array; the newest `max_entries` are kept
    pub fn from_json(json: &str, max_entries: usize) -> Result<Self> {
        let parsed: Vec<StatusEntry> = serde_json::from_str(json)?;
        let mut history = Self::new(max_entries);
        for entry in parsed {
            history.push(entry);
        }
        Ok(history)
    }
}
