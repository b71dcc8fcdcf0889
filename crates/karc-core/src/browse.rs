//! List-view state for one record type.
//!
//! Ties the query parameters, search debouncing, request superseding, and
//! row selection together. The browser never fetches on its own: callers
//! ask for a ticket with [`RecordBrowser::begin_fetch`], run the query
//! however they like, and hand the result back. A result whose ticket has
//! been superseded is dropped.

use std::time::Instant;

use crate::query::{
    fetch_or_empty, Listable, ListParams, Page, PageWindow, RequestTicket, RequestTracker,
    SearchDebouncer,
};
use crate::selection::SelectionCoordinator;
use crate::services::CoreResult;

#[derive(Debug)]
pub struct RecordBrowser<R> {
    params: ListParams,
    debouncer: SearchDebouncer,
    tracker: RequestTracker,
    page: Page<R>,
    error: Option<String>,
    selection: SelectionCoordinator,
    loading: bool,
}

impl<R: Listable> Default for RecordBrowser<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Listable> RecordBrowser<R> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_params(ListParams::for_listable::<R>())
    }

    #[must_use]
    pub fn with_params(params: ListParams) -> Self {
        let page = Page::empty(params.page_index(), params.page_size());
        let debouncer = SearchDebouncer::default().with_committed(params.search());
        Self {
            params,
            debouncer,
            tracker: RequestTracker::new(),
            page,
            error: None,
            selection: SelectionCoordinator::new(),
            loading: false,
        }
    }

    /// Swap the debouncer, e.g. for a different delay.
    #[must_use]
    pub fn with_debouncer(mut self, debouncer: SearchDebouncer) -> Self {
        self.debouncer = debouncer.with_committed(self.params.search());
        self
    }

    #[must_use]
    pub const fn params(&self) -> &ListParams {
        &self.params
    }

    #[must_use]
    pub const fn page(&self) -> &Page<R> {
        &self.page
    }

    #[must_use]
    pub const fn window(&self) -> PageWindow {
        self.page.window()
    }

    /// Banner for the last failed fetch.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub const fn selection(&self) -> &SelectionCoordinator {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionCoordinator {
        &mut self.selection
    }

    /// A keystroke in the search box. Nothing changes until the input
    /// settles.
    pub fn type_search(&mut self, text: &str, now: Instant) {
        self.debouncer.input(text, now);
    }

    /// When the next [`tick`](Self::tick) could commit a search.
    #[must_use]
    pub fn search_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Commit settled search input. Returns whether a refetch is needed.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.debouncer
            .poll(now)
            .is_some_and(|term| self.params.set_search(&term))
    }

    /// Commit pending search input now.
    pub fn submit_search(&mut self) -> bool {
        self.debouncer
            .flush()
            .is_some_and(|term| self.params.set_search(&term))
    }

    pub fn set_filter(&mut self, field: &str, value: Option<&str>) -> bool {
        self.params.set_filter(field, value)
    }

    pub fn toggle_sort(&mut self, field: &str) -> bool {
        self.params.toggle_sort(field);
        true
    }

    pub fn set_page(&mut self, page_index: usize) -> bool {
        self.params.set_page(page_index)
    }

    /// Start a fetch. Earlier outstanding tickets become stale.
    pub fn begin_fetch(&mut self) -> (RequestTicket, ListParams) {
        self.loading = true;
        (self.tracker.issue(), self.params.clone())
    }

    /// Apply a fetch result. Returns false when the ticket was superseded
    /// and the result was dropped.
    ///
    /// Failures show an empty page with a banner. Either way the selection
    /// is reset to the rows now on screen.
    pub fn complete_fetch(&mut self, ticket: RequestTicket, result: CoreResult<Page<R>>) -> bool {
        if !self.tracker.is_current(ticket) {
            tracing::debug!(
                kind = R::KIND,
                ticket = ticket.generation(),
                latest = self.tracker.latest(),
                "dropping superseded list result"
            );
            return false;
        }
        let fetched = fetch_or_empty(result, &self.params);
        self.selection
            .set_page(fetched.page.rows.iter().map(|row| row.row_id().to_string()));
        self.page = fetched.page;
        self.error = fetched.error;
        self.loading = false;
        true
    }

    /// Fetch synchronously with `fetch`.
    pub fn refresh(&mut self, fetch: impl FnOnce(&ListParams) -> CoreResult<Page<R>>) {
        let (ticket, params) = self.begin_fetch();
        let result = fetch(&params);
        self.complete_fetch(ticket, result);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::model::Variant;
    use crate::selection::SelectAllState;
    use crate::services::tests::fixture;
    use crate::services::CoreError;
    use crate::store::tests::draft;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_search_commits_after_idle() {
        let mut browser = RecordBrowser::<Variant>::new();
        let t0 = Instant::now();
        browser.type_search("s", t0);
        browser.type_search("sh", t0 + ms(100));
        browser.type_search("shank", t0 + ms(200));

        assert!(!browser.tick(t0 + ms(450)));
        assert_eq!(browser.params().search(), "");
        assert!(browser.tick(t0 + ms(500)));
        assert_eq!(browser.params().search(), "shank");
    }

    #[test]
    fn test_clearing_preset_search_refetches() {
        let mut params = ListParams::for_listable::<Variant>();
        params.set_search("tp53");
        let mut browser = RecordBrowser::<Variant>::with_params(params);

        let t0 = Instant::now();
        browser.type_search("", t0);
        assert!(browser.tick(t0 + ms(400)));
        assert_eq!(browser.params().search(), "");

        browser.type_search("tp53", t0 + ms(500));
        assert!(browser.tick(t0 + ms(900)));
        assert_eq!(browser.params().search(), "tp53");
    }

    #[test]
    fn test_search_resets_page() {
        let mut browser = RecordBrowser::<Variant>::new();
        browser.set_page(3);
        browser.type_search("tp53", Instant::now());
        assert!(browser.submit_search());
        assert_eq!(browser.params().page_index(), 0);
    }

    #[test]
    fn test_stale_result_dropped() {
        let f = fixture();
        let variants = f.services.variants();
        variants.create(&f.admin, &draft("TP53", "c.743G>A")).unwrap();
        variants.create(&f.admin, &draft("SHANK3", "c.3679dup")).unwrap();

        let mut browser = RecordBrowser::<Variant>::new();
        let (old, old_params) = browser.begin_fetch();
        browser.type_search("shank", Instant::now());
        browser.submit_search();
        let (new, new_params) = browser.begin_fetch();

        let new_result = variants.list(&f.admin, &new_params);
        assert!(browser.complete_fetch(new, new_result));
        let old_result = variants.list(&f.admin, &old_params);
        assert!(!browser.complete_fetch(old, old_result));

        assert_eq!(browser.page().total_count, 1);
        assert_eq!(browser.page().rows[0].gene, "SHANK3");
        assert!(!browser.is_loading());
    }

    #[test]
    fn test_failure_degrades_to_empty_page() {
        let mut browser = RecordBrowser::<Variant>::new();
        browser.refresh(|_| Err(CoreError::Backend(anyhow::anyhow!("disk I/O error"))));
        assert!(browser.page().rows.is_empty());
        assert_eq!(browser.window().total_count, 0);
        assert_eq!(browser.error(), Some("Could not load records. Try again."));
    }

    #[test]
    fn test_new_page_clears_selection() {
        let f = fixture();
        let variants = f.services.variants();
        for gene in ["A", "B", "C"] {
            variants.create(&f.admin, &draft(gene, "c.1A>G")).unwrap();
        }
        let mut browser = RecordBrowser::<Variant>::with_params(
            ListParams::for_listable::<Variant>().with_page_size(2),
        );
        browser.refresh(|p| variants.list(&f.admin, p));
        assert_eq!(browser.selection().page_ids().len(), 2);
        browser.selection_mut().select_all();
        assert_eq!(browser.selection().state(), SelectAllState::All);

        browser.set_page(1);
        browser.refresh(|p| variants.list(&f.admin, p));
        assert_eq!(browser.selection().page_ids().len(), 1);
        assert_eq!(browser.selection().state(), SelectAllState::None);
        assert!(browser.window().has_previous);
    }
}
