/// Data structures for the duplicate tab engine
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Browser tab identifier. Unique among open tabs, dead once the tab closes.
pub type TabId = i32;

/// Browser window identifier.
pub type WindowId = i32;

/// Snapshot of one open tab at query time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabRef {
    pub id: TabId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    pub window_id: WindowId,
    pub index: i32,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub active: bool,
}

impl TabRef {
    pub fn new(id: TabId, url: &str, title: &str, window_id: WindowId, index: i32) -> TabRef {
        TabRef {
            id,
            title: title.to_string(),
            url: url.to_string(),
            window_id,
            index,
            pinned: false,
            active: false,
        }
    }

    pub fn pinned(mut self) -> TabRef {
        self.pinned = true;
        self
    }
}

/// Tabs sharing one normalized key. Always holds two or more tabs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub key: String,
    pub tabs: Vec<TabRef>,
}

impl DuplicateGroup {
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn ids(&self) -> Vec<TabId> {
        self.tabs.iter().map(|t| t.id).collect()
    }
}

/// Detection result keyed by normalized URL
pub type DuplicateMap = BTreeMap<String, DuplicateGroup>;

/// What the journal remembers about a closed tab
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedTab {
    pub url: String,
    pub title: String,
    pub window_id: WindowId,
}

impl From<&TabRef> for ClosedTab {
    fn from(tab: &TabRef) -> Self {
        ClosedTab {
            url: tab.url.clone(),
            title: tab.title.clone(),
            window_id: tab.window_id,
        }
    }
}

/// One close operation, in the order the tabs were closed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseJournalEntry {
    pub id: String,
    pub timestamp: f64,
    pub tabs: Vec<ClosedTab>,
}

/// Outcome of a successful close
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosureSummary {
    pub closed: usize,
    pub undo_available: bool,
}

/// Result of recreating one journaled tab
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreOutcome {
    pub url: String,
    pub window_id: WindowId,
    pub error: Option<String>,
}

impl RestoreOutcome {
    pub fn is_restored(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of an undo, with per-tab detail
#[derive(Debug, Clone, PartialEq)]
pub struct UndoSummary {
    pub outcomes: Vec<RestoreOutcome>,
}

impl UndoSummary {
    pub fn restored(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_restored()).count()
    }

    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }
}
