//! Page-scoped multi-row selection for bulk operations.
//!
//! The selection only ever holds ids from the rows currently shown.
//! Replacing the page (any refetch) clears it.

use std::collections::BTreeSet;

use serde::Serialize;

/// Header checkbox state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectAllState {
    None,
    /// Some but not all rows selected.
    Indeterminate,
    All,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionCoordinator {
    page_ids: Vec<String>,
    selected: BTreeSet<String>,
}

impl SelectionCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Coordinator over an initial page.
    #[must_use]
    pub fn with_page<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut coordinator = Self::new();
        coordinator.set_page(ids);
        coordinator
    }

    /// Replace the visible rows. Always clears the selection.
    pub fn set_page<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.page_ids = ids.into_iter().map(Into::into).collect();
        self.selected.clear();
    }

    #[must_use]
    pub fn page_ids(&self) -> &[String] {
        &self.page_ids
    }

    #[must_use]
    pub const fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }

    #[must_use]
    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    /// Flip one row. Ids not on the page are ignored; returns whether the
    /// row is now selected.
    pub fn toggle(&mut self, id: &str) -> bool {
        if !self.page_ids.iter().any(|p| p == id) {
            return false;
        }
        if self.selected.remove(id) {
            false
        } else {
            self.selected.insert(id.to_string());
            true
        }
    }

    /// Header checkbox: everything selected goes to none, anything else
    /// goes to all.
    pub fn select_all(&mut self) {
        if self.state() == SelectAllState::All {
            self.selected.clear();
        } else {
            self.selected = self.page_ids.iter().cloned().collect();
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    #[must_use]
    pub fn state(&self) -> SelectAllState {
        let on_page = self
            .page_ids
            .iter()
            .filter(|id| self.selected.contains(*id))
            .count();
        if on_page == 0 {
            SelectAllState::None
        } else if on_page == self.page_ids.len() {
            SelectAllState::All
        } else {
            SelectAllState::Indeterminate
        }
    }

    /// Snapshot the selection for confirmation. `None` when nothing is
    /// selected.
    #[must_use]
    pub fn request_bulk_delete(&self) -> Option<PendingBulkDelete> {
        if self.selected.is_empty() {
            return None;
        }
        Some(PendingBulkDelete {
            ids: self.selected.iter().cloned().collect(),
        })
    }

    /// Run a confirmed bulk operation, then clear the selection whether it
    /// succeeded or not.
    pub fn confirm_bulk_delete<T, E>(
        &mut self,
        pending: PendingBulkDelete,
        delete: impl FnOnce(&PendingBulkDelete) -> Result<T, E>,
    ) -> Result<T, E> {
        let result = delete(&pending);
        self.clear();
        result
    }
}

/// Ids captured at confirmation time. Later selection changes do not
/// affect it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingBulkDelete {
    ids: Vec<String>,
}

impl PendingBulkDelete {
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn page(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("var-{i}")).collect()
    }

    #[test]
    fn test_states() {
        let mut s = SelectionCoordinator::with_page(page(3));
        assert_eq!(s.state(), SelectAllState::None);
        s.toggle("var-1");
        assert_eq!(s.state(), SelectAllState::Indeterminate);
        s.toggle("var-0");
        s.toggle("var-2");
        assert_eq!(s.state(), SelectAllState::All);
    }

    #[test]
    fn test_partial_select_all_selects_everything() {
        let mut s = SelectionCoordinator::with_page(page(4));
        s.toggle("var-2");
        s.select_all();
        assert_eq!(s.state(), SelectAllState::All);
    }

    #[test]
    fn test_toggle_ignores_rows_off_page() {
        let mut s = SelectionCoordinator::with_page(page(2));
        assert!(!s.toggle("var-99"));
        assert!(s.selected().is_empty());
    }

    #[test]
    fn test_empty_page_select_all() {
        let mut s = SelectionCoordinator::new();
        s.select_all();
        assert_eq!(s.state(), SelectAllState::None);
        assert!(s.request_bulk_delete().is_none());
    }

    #[test]
    fn test_pending_snapshot_is_frozen() {
        let mut s = SelectionCoordinator::with_page(page(3));
        s.toggle("var-0");
        s.toggle("var-2");
        let pending = s.request_bulk_delete().unwrap();
        s.toggle("var-1");
        assert_eq!(pending.ids(), ["var-0".to_string(), "var-2".to_string()]);
    }

    #[test]
    fn test_confirm_clears_on_success_and_failure() {
        let mut s = SelectionCoordinator::with_page(page(3));
        s.select_all();
        let pending = s.request_bulk_delete().unwrap();
        let n: Result<usize, String> = s.confirm_bulk_delete(pending, |p| Ok(p.len()));
        assert_eq!(n, Ok(3));
        assert!(s.selected().is_empty());

        s.select_all();
        let pending = s.request_bulk_delete().unwrap();
        let failed: Result<usize, String> =
            s.confirm_bulk_delete(pending, |_| Err("store offline".to_string()));
        assert!(failed.is_err());
        assert!(s.selected().is_empty());
    }

    proptest! {
        #[test]
        fn prop_select_all_twice_is_empty(n in 0usize..40, picks in proptest::collection::vec(0usize..40, 0..10)) {
            let mut s = SelectionCoordinator::with_page(page(n));
            for i in picks {
                s.toggle(&format!("var-{i}"));
            }
            // From a full selection the first click clears instead.
            prop_assume!(s.state() != SelectAllState::All);
            s.select_all();
            s.select_all();
            prop_assert!(s.selected().is_empty());
        }

        #[test]
        fn prop_individual_selection_equals_select_all(n in 0usize..40) {
            let mut individually = SelectionCoordinator::with_page(page(n));
            for id in page(n) {
                individually.toggle(&id);
            }
            let mut at_once = SelectionCoordinator::with_page(page(n));
            at_once.select_all();
            prop_assert_eq!(individually.selected(), at_once.selected());
        }

        #[test]
        fn prop_new_page_clears(n in 1usize..40, m in 0usize..40) {
            let mut s = SelectionCoordinator::with_page(page(n));
            s.select_all();
            s.set_page(page(m));
            prop_assert!(s.selected().is_empty());
            prop_assert_eq!(s.state(), SelectAllState::None);
        }
    }
}
