/// Duplicate detection, safe bulk close and undo
use crate::backend::TabBackend;
use crate::error::EngineError;
use crate::journal::CloseJournal;
use crate::normalize::Normalizer;
use crate::tab_data::{
    ClosedTab, CloseJournalEntry, ClosureSummary, DuplicateGroup, DuplicateMap, RestoreOutcome,
    TabId, TabRef, UndoSummary,
};
use log::{debug, info, warn};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

/// Owns the undo journal and talks to the browser through a [`TabBackend`].
///
/// Tab state is never cached: detection reads a fresh snapshot and every
/// close re-validates the requested ids against another fresh snapshot.
/// Journal mutations happen inside a single `RefCell` borrow that is never
/// held across an `.await`.
pub struct DuplicateEngine<B> {
    backend: B,
    normalizer: Normalizer,
    journal: RefCell<CloseJournal>,
}

impl<B: TabBackend> DuplicateEngine<B> {
    pub fn new(backend: B) -> Self {
        Self::with_normalizer(backend, Normalizer::default())
    }

    pub fn with_normalizer(backend: B, normalizer: Normalizer) -> Self {
        DuplicateEngine {
            backend,
            normalizer,
            journal: RefCell::new(CloseJournal::new()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Pinned tabs and internal pages are never grouped or closed
    pub fn is_eligible(&self, tab: &TabRef) -> bool {
        !tab.pinned && !self.normalizer.is_internal(&tab.url)
    }

    /// Group the live tab set by normalized URL, keeping groups of two or more
    pub async fn detect_duplicates(&self) -> Result<DuplicateMap, EngineError> {
        let tabs = self.backend.query_tabs().await.map_err(EngineError::Query)?;
        let groups = self.group_duplicates(&tabs);

        info!(
            "Found {} duplicate groups among {} tabs",
            groups.len(),
            tabs.len()
        );
        Ok(groups)
    }

    /// Grouping step of [`detect_duplicates`](Self::detect_duplicates) over a given snapshot
    pub fn group_duplicates(&self, tabs: &[TabRef]) -> DuplicateMap {
        let mut by_key: BTreeMap<String, Vec<TabRef>> = BTreeMap::new();

        for tab in tabs.iter().filter(|t| self.is_eligible(t)) {
            by_key
                .entry(self.normalizer.comparison_key(&tab.url))
                .or_default()
                .push(tab.clone());
        }

        by_key
            .into_iter()
            .filter(|(_, tabs)| tabs.len() > 1)
            .map(|(key, tabs)| (key.clone(), DuplicateGroup { key, tabs }))
            .collect()
    }

    /// Close the eligible subset of `ids`, journaling it for undo first.
    ///
    /// Ids that no longer exist, or now belong to pinned or internal tabs,
    /// are dropped silently. If the browser rejects the close outright the
    /// journal entry is withdrawn again.
    pub async fn close_tabs(&self, ids: &[TabId]) -> Result<ClosureSummary, EngineError> {
        if ids.is_empty() {
            return Err(EngineError::NoSelection);
        }

        let requested: HashSet<TabId> = ids.iter().copied().collect();
        let snapshot = self.backend.query_tabs().await.map_err(EngineError::Query)?;

        let safe: Vec<&TabRef> = snapshot
            .iter()
            .filter(|t| requested.contains(&t.id) && self.is_eligible(t))
            .collect();

        if safe.is_empty() {
            debug!("None of {} requested tabs are safe to close", requested.len());
            return Err(EngineError::NoSafeTabs);
        }

        let entry = CloseJournalEntry {
            id: Uuid::new_v4().to_string(),
            timestamp: now_millis(),
            tabs: safe.iter().map(|t| ClosedTab::from(*t)).collect(),
        };
        let entry_id = entry.id.clone();
        let safe_ids: Vec<TabId> = safe.iter().map(|t| t.id).collect();

        self.journal.borrow_mut().push(entry);

        if let Err(e) = self.backend.remove_tabs(&safe_ids).await {
            self.journal.borrow_mut().remove(&entry_id);
            warn!("Close of {} tabs failed, undo entry withdrawn: {}", safe_ids.len(), e);
            return Err(EngineError::Close(e));
        }

        // Trimmed only now, so a failed close never evicts older history
        let evicted = self.journal.borrow_mut().trim();
        if evicted > 0 {
            debug!("Undo history full, dropped {} oldest entries", evicted);
        }

        info!(
            "Closed {} of {} requested tabs",
            safe_ids.len(),
            requested.len()
        );
        Ok(ClosureSummary {
            closed: safe_ids.len(),
            undo_available: true,
        })
    }

    /// Reopen the tabs of the most recent close, in the background.
    ///
    /// The entry is consumed even if some tabs fail to come back.
    pub async fn undo_last(&self) -> Result<UndoSummary, EngineError> {
        let entry = self
            .journal
            .borrow_mut()
            .pop()
            .ok_or(EngineError::NothingToUndo)?;

        let mut outcomes = Vec::with_capacity(entry.tabs.len());
        for tab in &entry.tabs {
            let error = match self.backend.create_tab(&tab.url, tab.window_id).await {
                Ok(()) => None,
                Err(e) => {
                    warn!(
                        "Could not restore {} in window {}: {}",
                        tab.url, tab.window_id, e
                    );
                    Some(e.to_string())
                }
            };
            outcomes.push(RestoreOutcome {
                url: tab.url.clone(),
                window_id: tab.window_id,
                error,
            });
        }

        let summary = UndoSummary { outcomes };
        info!(
            "Restored {}/{} tabs",
            summary.restored(),
            summary.attempted()
        );
        Ok(summary)
    }

    pub fn can_undo(&self) -> bool {
        !self.journal.borrow().is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.journal.borrow().len()
    }
}

#[cfg(target_arch = "wasm32")]
fn now_millis() -> f64 {
    js_sys::Date::now()
}

#[cfg(not(target_arch = "wasm32"))]
fn now_millis() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as f64)
        .unwrap_or(0.0)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::journal::JOURNAL_CAPACITY;
    use crate::tab_data::WindowId;
    use futures::executor::block_on;
    use std::cell::Cell;
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// Pending once, then ready. Lets two engine calls interleave under `join!`.
    #[derive(Default)]
    struct YieldOnce {
        yielded: bool,
    }

    impl Future for YieldOnce {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.yielded {
                Poll::Ready(())
            } else {
                self.yielded = true;
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        }
    }

    /// In-memory browser that can be told to fail
    #[derive(Default)]
    pub(crate) struct FakeTabs {
        pub tabs: RefCell<Vec<TabRef>>,
        pub created: RefCell<Vec<(String, WindowId)>>,
        pub fail_query: Cell<bool>,
        pub fail_remove: Cell<bool>,
        pub closed_windows: RefCell<Vec<WindowId>>,
        /// Removes touching these ids are rejected
        pub rejected_ids: RefCell<Vec<TabId>>,
        pub yield_on_remove: Cell<bool>,
        next_id: Cell<TabId>,
    }

    impl FakeTabs {
        pub fn with_tabs(tabs: Vec<TabRef>) -> Self {
            let fake = FakeTabs::default();
            fake.next_id.set(1000);
            *fake.tabs.borrow_mut() = tabs;
            fake
        }

        pub fn ids(&self) -> Vec<TabId> {
            self.tabs.borrow().iter().map(|t| t.id).collect()
        }
    }

    impl TabBackend for FakeTabs {
        async fn query_tabs(&self) -> Result<Vec<TabRef>, BackendError> {
            if self.fail_query.get() {
                return Err(BackendError::new("tabs unavailable"));
            }
            Ok(self.tabs.borrow().clone())
        }

        async fn remove_tabs(&self, ids: &[TabId]) -> Result<(), BackendError> {
            if self.yield_on_remove.get() {
                YieldOnce::default().await;
            }
            let rejected = ids.iter().any(|id| self.rejected_ids.borrow().contains(id));
            if self.fail_remove.get() || rejected {
                return Err(BackendError::new("remove rejected"));
            }
            self.tabs.borrow_mut().retain(|t| !ids.contains(&t.id));
            Ok(())
        }

        async fn create_tab(&self, url: &str, window_id: WindowId) -> Result<(), BackendError> {
            if self.closed_windows.borrow().contains(&window_id) {
                return Err(BackendError::new(format!("No window with id: {}", window_id)));
            }

            let id = self.next_id.get();
            self.next_id.set(id + 1);

            let mut tabs = self.tabs.borrow_mut();
            let index = tabs.iter().filter(|t| t.window_id == window_id).count() as i32;
            tabs.push(TabRef::new(id, url, "", window_id, index));
            self.created.borrow_mut().push((url.to_string(), window_id));
            Ok(())
        }
    }

    const A: &str = "https://a.com/page";

    fn engine_with(tabs: Vec<TabRef>) -> DuplicateEngine<FakeTabs> {
        DuplicateEngine::new(FakeTabs::with_tabs(tabs))
    }

    #[test]
    fn test_detect_skips_pinned() {
        let engine = engine_with(vec![
            TabRef::new(1, A, "A", 1, 0),
            TabRef::new(2, A, "A", 1, 1),
            TabRef::new(3, A, "A", 1, 2).pinned(),
        ]);

        let groups = block_on(engine.detect_duplicates()).unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[A].ids(), vec![1, 2]);
    }

    #[test]
    fn test_detect_groups_normalized_variants_in_snapshot_order() {
        let engine = engine_with(vec![
            TabRef::new(4, "https://a.com/page/?utm_source=x", "A", 1, 0),
            TabRef::new(2, "https://b.com/", "B", 1, 1),
            TabRef::new(9, "https://a.com/page#top", "A", 2, 0),
            TabRef::new(1, A, "A", 2, 1),
        ]);

        let groups = block_on(engine.detect_duplicates()).unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[A].key, A);
        assert_eq!(groups[A].ids(), vec![4, 9, 1]);
    }

    #[test]
    fn test_detect_omits_singletons_and_internal_pages() {
        let engine = engine_with(vec![
            TabRef::new(1, "chrome://extensions", "Extensions", 1, 0),
            TabRef::new(2, "chrome://extensions", "Extensions", 1, 1),
            TabRef::new(3, "about:blank", "", 1, 2),
            TabRef::new(4, "about:blank", "", 1, 3),
            TabRef::new(5, "https://solo.com", "Solo", 1, 4),
        ]);

        let groups = block_on(engine.detect_duplicates()).unwrap();

        assert!(groups.is_empty());
    }

    #[test]
    fn test_unparseable_urls_match_literally() {
        let engine = engine_with(vec![
            TabRef::new(1, "weird url", "", 1, 0),
            TabRef::new(2, "weird url", "", 1, 1),
        ]);

        let groups = block_on(engine.detect_duplicates()).unwrap();

        assert_eq!(groups["weird url"].len(), 2);
    }

    #[test]
    fn test_detect_query_failure() {
        let engine = engine_with(vec![]);
        engine.backend().fail_query.set(true);

        let result = block_on(engine.detect_duplicates());

        assert!(matches!(result, Err(EngineError::Query(_))));
    }

    #[test]
    fn test_close_nothing_selected() {
        let engine = engine_with(vec![TabRef::new(1, A, "A", 1, 0)]);

        let result = block_on(engine.close_tabs(&[]));

        assert_eq!(result, Err(EngineError::NoSelection));
        assert_eq!(result.unwrap_err().to_string(), "no tabs selected");
        assert_eq!(engine.undo_depth(), 0);
    }

    #[test]
    fn test_close_only_pinned() {
        let engine = engine_with(vec![TabRef::new(1, A, "A", 1, 0).pinned()]);

        let result = block_on(engine.close_tabs(&[1]));

        assert_eq!(result, Err(EngineError::NoSafeTabs));
        assert_eq!(result.unwrap_err().to_string(), "no safe tabs to close");
        assert_eq!(engine.backend().ids(), vec![1]);
        assert!(!engine.can_undo());
    }

    #[test]
    fn test_close_stale_ids() {
        let engine = engine_with(vec![TabRef::new(1, A, "A", 1, 0)]);

        let result = block_on(engine.close_tabs(&[42, 43]));

        assert_eq!(result, Err(EngineError::NoSafeTabs));
        assert_eq!(engine.undo_depth(), 0);
    }

    #[test]
    fn test_close_filters_unsafe_ids() {
        let engine = engine_with(vec![
            TabRef::new(1, A, "A", 1, 0),
            TabRef::new(2, A, "A", 1, 1),
            TabRef::new(3, A, "A", 1, 2).pinned(),
            TabRef::new(4, "chrome://settings", "Settings", 1, 3),
        ]);

        let summary = block_on(engine.close_tabs(&[2, 3, 4, 99, 2])).unwrap();

        assert_eq!(summary.closed, 1);
        assert!(summary.undo_available);
        assert_eq!(engine.backend().ids(), vec![1, 3, 4]);
    }

    #[test]
    fn test_close_every_member_of_a_group() {
        let engine = engine_with(vec![TabRef::new(1, A, "A", 1, 0), TabRef::new(2, A, "A", 1, 1)]);

        let summary = block_on(engine.close_tabs(&[1, 2])).unwrap();

        assert_eq!(summary.closed, 2);
        assert!(engine.backend().ids().is_empty());
    }

    #[test]
    fn test_close_failure_withdraws_journal_entry() {
        let engine = engine_with(vec![TabRef::new(1, A, "A", 1, 0), TabRef::new(2, A, "A", 1, 1)]);
        block_on(engine.close_tabs(&[1])).unwrap();
        engine.backend().fail_remove.set(true);

        let result = block_on(engine.close_tabs(&[2]));

        assert!(matches!(result, Err(EngineError::Close(_))));
        assert_eq!(engine.undo_depth(), 1);
        assert_eq!(engine.backend().ids(), vec![2]);
    }

    #[test]
    fn test_failed_close_keeps_full_history() {
        let tabs: Vec<TabRef> = (1..=6)
            .map(|id| TabRef::new(id, &format!("https://site{}.com/", id), "", 1, id))
            .collect();
        let engine = engine_with(tabs);
        for id in 1..=5 {
            block_on(engine.close_tabs(&[id])).unwrap();
        }
        engine.backend().fail_remove.set(true);

        let result = block_on(engine.close_tabs(&[6]));

        assert!(matches!(result, Err(EngineError::Close(_))));
        assert_eq!(engine.undo_depth(), JOURNAL_CAPACITY);

        let mut restored = Vec::new();
        while let Ok(summary) = block_on(engine.undo_last()) {
            restored.push(summary.outcomes[0].url.clone());
        }
        assert_eq!(restored.len(), 5);
        assert_eq!(restored[4], "https://site1.com/");
    }

    #[test]
    fn test_interleaved_failed_close_leaves_other_entry() {
        let engine = engine_with(vec![
            TabRef::new(1, "https://one.com/", "One", 1, 0),
            TabRef::new(2, "https://two.com/", "Two", 1, 1),
        ]);
        engine.backend().yield_on_remove.set(true);
        engine.backend().rejected_ids.borrow_mut().push(1);

        let (failed, closed) = block_on(async {
            futures::join!(engine.close_tabs(&[1]), engine.close_tabs(&[2]))
        });

        assert!(matches!(failed, Err(EngineError::Close(_))));
        assert_eq!(closed.unwrap().closed, 1);
        assert_eq!(engine.undo_depth(), 1);
        assert_eq!(engine.backend().ids(), vec![1]);

        let summary = block_on(engine.undo_last()).unwrap();
        assert_eq!(summary.outcomes[0].url, "https://two.com/");
        assert!(!engine.can_undo());
    }

    #[test]
    fn test_close_query_failure_has_no_side_effect() {
        let engine = engine_with(vec![TabRef::new(1, A, "A", 1, 0)]);
        engine.backend().fail_query.set(true);

        let result = block_on(engine.close_tabs(&[1]));

        assert!(matches!(result, Err(EngineError::Query(_))));
        assert!(!engine.can_undo());
    }

    #[test]
    fn test_undo_restores_last_close() {
        let engine = engine_with(vec![
            TabRef::new(1, A, "A", 1, 0),
            TabRef::new(2, A, "A second", 3, 0),
        ]);
        block_on(engine.close_tabs(&[2])).unwrap();

        let summary = block_on(engine.undo_last()).unwrap();

        assert_eq!(summary.restored(), 1);
        assert_eq!(summary.attempted(), 1);
        assert_eq!(*engine.backend().created.borrow(), vec![(A.to_string(), 3)]);

        let again = block_on(engine.undo_last());
        assert_eq!(again, Err(EngineError::NothingToUndo));
        assert_eq!(again.unwrap_err().to_string(), "nothing to undo");
    }

    #[test]
    fn test_undo_tolerates_missing_window() {
        let engine = engine_with(vec![
            TabRef::new(1, A, "A", 1, 0),
            TabRef::new(2, "https://b.com", "B", 2, 0),
            TabRef::new(3, "https://c.com", "C", 1, 1),
        ]);
        block_on(engine.close_tabs(&[1, 2, 3])).unwrap();
        engine.backend().closed_windows.borrow_mut().push(2);

        let summary = block_on(engine.undo_last()).unwrap();

        assert_eq!(summary.restored(), 2);
        assert_eq!(summary.attempted(), 3);
        assert!(!summary.outcomes[1].is_restored());
        assert_eq!(summary.outcomes[2].url, "https://c.com");
        // One-shot even when partial
        assert!(!engine.can_undo());
    }

    #[test]
    fn test_journal_keeps_five_most_recent_closes() {
        let tabs: Vec<TabRef> = (1..=6)
            .map(|id| TabRef::new(id, &format!("https://site{}.com/", id), "", 1, id))
            .collect();
        let engine = engine_with(tabs);

        for id in 1..=6 {
            block_on(engine.close_tabs(&[id])).unwrap();
        }
        assert_eq!(engine.undo_depth(), JOURNAL_CAPACITY);

        let mut restored = Vec::new();
        while let Ok(summary) = block_on(engine.undo_last()) {
            restored.push(summary.outcomes[0].url.clone());
        }

        assert_eq!(
            restored,
            vec![
                "https://site6.com/",
                "https://site5.com/",
                "https://site4.com/",
                "https://site3.com/",
                "https://site2.com/",
            ]
        );
    }

    #[test]
    fn test_closed_tabs_recorded_in_snapshot_order() {
        let engine = engine_with(vec![
            TabRef::new(5, "https://x.com", "X", 1, 0),
            TabRef::new(3, "https://y.com", "Y", 1, 1),
        ]);
        block_on(engine.close_tabs(&[3, 5])).unwrap();

        let summary = block_on(engine.undo_last()).unwrap();
        let urls: Vec<&str> = summary.outcomes.iter().map(|o| o.url.as_str()).collect();

        assert_eq!(urls, vec!["https://x.com", "https://y.com"]);
    }
}
