//! Most-recently-played list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::track::{Track, TrackId};

/// One play of a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub track: Track,
    pub played_at: DateTime<Utc>,
}

/// Newest-first play history, one entry per track, bounded in size.
#[derive(Debug, Clone)]
pub struct PlayHistory {
    entries: VecDeque<HistoryEntry>,
    limit: usize,
}

impl PlayHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(limit),
            limit,
        }
    }

    /// Rebuild from persisted entries, re-applying dedup and the limit.
    pub fn from_entries(entries: Vec<HistoryEntry>, limit: usize) -> Self {
        let mut history = Self::new(limit);
        // Oldest first so the newest ends up at the front.
        for entry in entries.into_iter().rev() {
            history.push_front(entry);
        }
        history
    }

    /// Record a play. A previous entry for the same track moves to the front.
    pub fn record(&mut self, track: Track, played_at: DateTime<Utc>) {
        self.push_front(HistoryEntry { track, played_at });
    }

    fn push_front(&mut self, entry: HistoryEntry) {
        self.entries.retain(|e| e.track.id != entry.track.id);
        self.entries.push_front(entry);
        self.entries.truncate(self.limit);
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn contains(&self, id: &TrackId) -> bool {
        self.entries.iter().any(|e| &e.track.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn track(id: &str) -> Track {
        Track::new(id, format!("Song {}", id), "Artist")
    }

    #[test]
    fn newest_first_and_deduplicated() {
        let mut history = PlayHistory::new(20);
        history.record(track("1"), at(0));
        history.record(track("2"), at(1));
        history.record(track("1"), at(2));

        let ids: Vec<_> = history
            .entries()
            .iter()
            .map(|e| e.track.id.to_string())
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(history.entries()[0].played_at, at(2));
    }

    #[test]
    fn bounded_by_limit() {
        let mut history = PlayHistory::new(3);
        for i in 0..5 {
            history.record(track(&i.to_string()), at(i));
        }

        assert_eq!(history.len(), 3);
        assert!(history.contains(&TrackId::new("4")));
        assert!(!history.contains(&TrackId::new("1")));
    }

    #[test]
    fn rebuild_preserves_order() {
        let mut history = PlayHistory::new(20);
        history.record(track("a"), at(0));
        history.record(track("b"), at(1));

        let rebuilt = PlayHistory::from_entries(history.entries(), 1);
        assert_eq!(rebuilt.len(), 1);
        assert_eq!(rebuilt.entries()[0].track.id, TrackId::new("b"));
    }
}
