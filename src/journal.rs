/// Bounded undo history for close operations

use crate::tab_data::CloseJournalEntry;
use std::collections::VecDeque;

/// Number of close operations that can be undone
pub const JOURNAL_CAPACITY: usize = 5;

/// Push-on-close, pop-on-undo stack. When full, the oldest entry is evicted.
#[derive(Debug, Clone)]
pub struct CloseJournal {
    entries: VecDeque<CloseJournalEntry>,
    capacity: usize,
}

impl CloseJournal {
    pub fn new() -> Self {
        CloseJournal::with_capacity(JOURNAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        CloseJournal {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record an entry. Capacity is enforced by [`trim`](Self::trim), once the
    /// close it describes has gone through.
    pub fn push(&mut self, entry: CloseJournalEntry) {
        self.entries.push_back(entry);
    }

    /// Evict from the old end past capacity. Returns how many entries went.
    pub fn trim(&mut self) -> usize {
        let mut evicted = 0;
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Take the most recent entry
    pub fn pop(&mut self) -> Option<CloseJournalEntry> {
        self.entries.pop_back()
    }

    /// Drop a specific entry, wherever it sits
    pub fn remove(&mut self, entry_id: &str) -> bool {
        let original_len = self.entries.len();
        self.entries.retain(|e| e.id != entry_id);
        self.entries.len() < original_len
    }

    pub fn peek(&self) -> Option<&CloseJournalEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CloseJournal {
    fn default() -> Self {
        Self::new()
    }
}
