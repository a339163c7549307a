//! Append-only bounded history log (`SPEC_FULL.md` §4.7).

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::model::HistoryEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

pub const DEFAULT_CAPACITY: usize = 1000;

type HistoryListener = Box<dyn Fn(&HistoryEntry) + Send + Sync>;

pub struct HistoryConfig {
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: DEFAULT_CAPACITY }
    }
}

impl HistoryConfig {
    pub fn from_capacity(capacity: usize) -> Self {
        Self { capacity }
    }
}

pub struct History {
    capacity: usize,
    entries: RwLock<VecDeque<HistoryEntry>>,
    listeners: RwLock<Vec<HistoryListener>>,
}

impl History {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            capacity: config.capacity.max(1),
            entries: RwLock::new(VecDeque::with_capacity(config.capacity.min(256))),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Appends `entry`, evicting the oldest entry if at capacity, and notifies
    /// every listener regardless of level. Level filtering is a read-side concern.
    pub fn append(&self, entry: HistoryEntry) {
        {
            let mut entries = self.entries.write();
            if entries.len() >= self.capacity {
                entries.pop_front();
            }
            entries.push_back(entry.clone());
        }
        for listener in self.listeners.read().iter() {
            listener(&entry);
        }
    }

    pub fn add_listener(&self, listener: impl Fn(&HistoryEntry) + Send + Sync + 'static) {
        self.listeners.write().push(Box::new(listener));
    }

    /// A snapshot in append order, oldest first.
    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries.read().iter().cloned().collect()
    }

    /// A snapshot filtered to entries at or above `min_level`, oldest first.
    pub fn snapshot_at_least(&self, min_level: LogLevel) -> Vec<HistoryEntry> {
        self.entries.read().iter().filter(|e| e.level >= min_level).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

pub type SharedHistory = Arc<History>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HistoryOpType, HistorySource, HistoryStatus};
    use crate::path::RelativePath;

    fn entry(path: &str) -> HistoryEntry {
        entry_at_level(path, LogLevel::Info)
    }

    fn entry_at_level(path: &str, level: LogLevel) -> HistoryEntry {
        HistoryEntry {
            timestamp: chrono::Utc::now(),
            relative_path: RelativePath::new(path).unwrap(),
            source: HistorySource::Push,
            op_type: HistoryOpType::Update,
            status: HistoryStatus::Success,
            level,
            message: String::new(),
        }
    }

    #[test]
    fn bounded_capacity_evicts_oldest() {
        let history = History::new(HistoryConfig::from_capacity(2));
        history.append(entry("a"));
        history.append(entry("b"));
        history.append(entry("c"));
        let snapshot = history.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].relative_path.as_str(), "b");
        assert_eq!(snapshot[1].relative_path.as_str(), "c");
    }

    #[test]
    fn listeners_fire_for_every_entry() {
        let history = History::new(HistoryConfig::default());
        let count = Arc::new(RwLock::new(0));
        let count_clone = count.clone();
        history.add_listener(move |_| *count_clone.write() += 1);
        history.append(entry("a"));
        history.append(entry("b"));
        assert_eq!(*count.read(), 2);
    }

    #[test]
    fn snapshot_at_least_filters_by_level() {
        let history = History::new(HistoryConfig::default());
        history.append(entry_at_level("a", LogLevel::Debug));
        history.append(entry_at_level("b", LogLevel::Warning));
        history.append(entry_at_level("c", LogLevel::Error));

        let warnings_and_up = history.snapshot_at_least(LogLevel::Warning);
        assert_eq!(warnings_and_up.len(), 2);
        assert_eq!(warnings_and_up[0].relative_path.as_str(), "b");
        assert_eq!(warnings_and_up[1].relative_path.as_str(), "c");
    }
}
