use std::collections::VecDeque;

use chrono::{DateTime, Utc};

/// Entries kept in the visible feed.
pub const FEED_CAPACITY: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub icon: String,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    /// Insertion order, strictly increasing.
    pub seq: u64,
    /// Cosmetic highlight until the next paint settles the feed.
    pub just_arrived: bool,
}

/// Bounded feed, newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feed {
    entries: VecDeque<FeedEntry>,
    next_seq: u64,
}

impl Feed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the head, evicting the oldest entries beyond capacity.
    pub fn push(
        &mut self,
        icon: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push_front(FeedEntry {
            icon: icon.into(),
            title: title.into(),
            message: message.into(),
            created_at,
            seq,
            just_arrived: true,
        });
        self.entries.truncate(FEED_CAPACITY);
        seq
    }

    /// Clear every "just arrived" highlight.
    pub fn settle(&mut self) {
        for entry in self.entries.iter_mut() {
            entry.just_arrived = false;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeedEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
