/// Checkbox selection over duplicate groups, as the popup presents them.
///
/// Default selection keeps the first tab of each group and checks the rest.
/// This is a convenience only: the engine closes whatever it is given.
use crate::tab_data::{DuplicateGroup, TabId};
use std::collections::BTreeSet;

/// Tri-state of a group header checkbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupCheck {
    Unchecked,
    /// Everything but the kept tab is checked
    Checked,
    Mixed,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    selected: BTreeSet<TabId>,
}

impl Selection {
    pub fn new() -> Self {
        Selection::default()
    }

    /// Starting selection for freshly detected groups
    pub fn initial(groups: &[DuplicateGroup], auto_select: bool) -> Self {
        let mut selection = Selection::new();
        if auto_select {
            selection.select_all(groups);
        }
        selection
    }

    pub fn set(&mut self, id: TabId, checked: bool) {
        if checked {
            self.selected.insert(id);
        } else {
            self.selected.remove(&id);
        }
    }

    /// Check every tab of the group except the first
    pub fn select_group(&mut self, group: &DuplicateGroup) {
        for (position, tab) in group.tabs.iter().enumerate() {
            self.set(tab.id, position > 0);
        }
    }

    pub fn clear_group(&mut self, group: &DuplicateGroup) {
        for tab in &group.tabs {
            self.selected.remove(&tab.id);
        }
    }

    pub fn select_all(&mut self, groups: &[DuplicateGroup]) {
        groups.iter().for_each(|g| self.select_group(g));
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn contains(&self, id: TabId) -> bool {
        self.selected.contains(&id)
    }

    pub fn group_check(&self, group: &DuplicateGroup) -> GroupCheck {
        let Some((kept, rest)) = group.tabs.split_first() else {
            return GroupCheck::Unchecked;
        };

        if !self.contains(kept.id) && rest.iter().all(|t| self.contains(t.id)) {
            GroupCheck::Checked
        } else if group.tabs.iter().any(|t| self.contains(t.id)) {
            GroupCheck::Mixed
        } else {
            GroupCheck::Unchecked
        }
    }

    /// Selected ids restricted to tabs still shown
    pub fn ids(&self, groups: &[DuplicateGroup]) -> Vec<TabId> {
        groups
            .iter()
            .flat_map(|g| g.tabs.iter())
            .map(|t| t.id)
            .filter(|id| self.contains(*id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

/// Counters shown above the duplicate list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DuplicateStats {
    pub groups: usize,
    pub tabs: usize,
    pub selected: usize,
}

pub fn duplicate_stats(groups: &[DuplicateGroup], selection: &Selection) -> DuplicateStats {
    DuplicateStats {
        groups: groups.len(),
        tabs: groups.iter().map(|g| g.len()).sum(),
        selected: selection.ids(groups).len(),
    }
}
