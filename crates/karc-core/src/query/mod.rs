//! Record query engine.
//!
//! Composes search, categorical filters, sort, and pagination into one
//! count query and one page query against the store. The count uses the
//! same predicate as the page, so page math matches what is shown.

#![allow(clippy::missing_errors_doc)]

mod debounce;
mod generation;
mod params;
mod sql;

pub use debounce::SearchDebouncer;
pub use generation::{RequestTicket, RequestTracker};
pub use params::{ListParams, SortDirection, SortKey};

use anyhow::Context;
use rusqlite::Row;
use serde::Serialize;

use crate::services::{CoreError, CoreResult};
use crate::store::PortalDb;

/// A record type that can be listed through the query engine.
///
/// Field names callers pass for filtering and sorting are looked up in the
/// whitelists here and mapped to SQL expressions; nothing else is
/// interpolated.
pub trait Listable: Sized {
    /// Noun used in messages ("variant", "report").
    const KIND: &'static str;
    /// FROM clause, joins included.
    const SOURCE: &'static str;
    const COLUMNS: &'static str;
    /// Expressions matched case-insensitively by the search term, OR-ed.
    const SEARCH_FIELDS: &'static [&'static str];
    /// Filter name to expression. Filters are AND-ed with the search.
    const FILTER_FIELDS: &'static [(&'static str, &'static str)];
    /// Sort name to expression.
    const SORT_FIELDS: &'static [(&'static str, &'static str)];
    const DEFAULT_SORT: (&'static str, SortDirection);
    /// Appended after the sort key for a stable order.
    const TIEBREAK: &'static str;
    /// Always-on restriction (e.g. approved profiles only).
    const BASE_PREDICATE: Option<&'static str> = None;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Stable id used for selection.
    fn row_id(&self) -> &str;
}

/// One page of results plus the filtered total.
#[derive(Debug, Clone, Serialize)]
pub struct Page<R> {
    pub rows: Vec<R>,
    pub total_count: usize,
    pub page_index: usize,
    pub page_size: usize,
}

impl<R> Page<R> {
    #[must_use]
    pub const fn empty(page_index: usize, page_size: usize) -> Self {
        Self {
            rows: Vec::new(),
            total_count: 0,
            page_index,
            page_size,
        }
    }

    #[must_use]
    pub const fn window(&self) -> PageWindow {
        PageWindow::new(self.page_index, self.page_size, self.total_count)
    }
}

/// "Showing X to Y of Z" arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    /// One-based index of the first row shown, 0 when nothing is shown.
    pub showing_from: usize,
    pub showing_to: usize,
    pub total_count: usize,
    pub total_pages: usize,
    pub has_previous: bool,
    pub has_next: bool,
}

impl PageWindow {
    #[must_use]
    pub const fn new(page_index: usize, page_size: usize, total_count: usize) -> Self {
        let page_size = if page_size == 0 { 1 } else { page_size };
        let offset = page_index.saturating_mul(page_size);
        let total_pages = total_count.div_ceil(page_size);
        let (showing_from, showing_to) = if offset >= total_count {
            (0, 0)
        } else {
            let end = offset.saturating_add(page_size);
            (
                offset + 1,
                if end < total_count { end } else { total_count },
            )
        };
        Self {
            showing_from,
            showing_to,
            total_count,
            total_pages,
            has_previous: page_index > 0,
            has_next: page_index + 1 < total_pages,
        }
    }

    /// Rows the page should hold.
    #[must_use]
    pub const fn len(&self) -> usize {
        if self.showing_from == 0 {
            0
        } else {
            self.showing_to - self.showing_from + 1
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Run the count and page queries for `params`.
///
/// Unknown filter or sort fields are a validation error.
#[tracing::instrument(skip(db, params), fields(kind = R::KIND))]
pub fn query_page<R: Listable>(db: &PortalDb, params: &ListParams) -> CoreResult<Page<R>> {
    let predicate = sql::build_predicate::<R>(params)?;
    let order = sql::build_order::<R>(params)?;

    let count_sql = format!("SELECT COUNT(*) FROM {}{}", R::SOURCE, predicate.sql);
    let total: i64 = db
        .conn()
        .query_row(&count_sql, predicate.params().as_slice(), |row| row.get(0))
        .with_context(|| format!("Failed to count {} rows", R::KIND))?;

    let page_sql = format!(
        "SELECT {} FROM {}{}{} LIMIT {} OFFSET {}",
        R::COLUMNS,
        R::SOURCE,
        predicate.sql,
        order,
        to_i64(params.page_size()),
        to_i64(params.offset()),
    );
    let mut stmt = db
        .conn()
        .prepare(&page_sql)
        .with_context(|| format!("Failed to prepare {} list query", R::KIND))?;
    let mapped = stmt
        .query_map(predicate.params().as_slice(), R::from_row)
        .with_context(|| format!("Failed to execute {} list query", R::KIND))?;

    let mut rows = Vec::new();
    for row in mapped {
        rows.push(row.with_context(|| format!("Failed to read {} row", R::KIND))?);
    }

    Ok(Page {
        rows,
        total_count: usize::try_from(total).unwrap_or(0),
        page_index: params.page_index(),
        page_size: params.page_size(),
    })
}

/// A page plus the banner to show when the fetch failed.
#[derive(Debug, Clone, Serialize)]
pub struct Fetched<R> {
    pub page: Page<R>,
    pub error: Option<String>,
}

/// Degrade any failure to an empty page with an error banner.
#[must_use]
pub fn fetch_or_empty<R>(result: CoreResult<Page<R>>, params: &ListParams) -> Fetched<R> {
    match result {
        Ok(page) => Fetched { page, error: None },
        Err(err) => {
            tracing::warn!(error = %err, "list query failed; showing empty page");
            let banner = match &err {
                CoreError::Backend(_) => "Could not load records. Try again.".to_string(),
                other => other.to_string(),
            };
            Fetched {
                page: Page::empty(params.page_index(), params.page_size()),
                error: Some(banner),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Role, Variant, VariantDraft, VariantStatus};
    use crate::store::tests::{seed_member, test_db};
    use proptest::prelude::*;

    fn seed_variants(db: &PortalDb, n: usize) -> String {
        let author = seed_member(db, "ana@example.org", Role::Admin, true);
        for i in 0..n {
            let draft = VariantDraft {
                gene: if i % 2 == 0 { "SHANK3" } else { "CHD8" }.to_string(),
                variant: format!("c.{i}A>G"),
                sample_id: Some(format!("S-{i:03}")),
                status: if i % 3 == 0 {
                    VariantStatus::Completed
                } else {
                    VariantStatus::Available
                },
                ..VariantDraft::default()
            };
            db.insert_variant(&draft, &author).unwrap();
        }
        author
    }

    #[test]
    fn test_page_and_total() {
        let db = test_db();
        seed_variants(&db, 45);
        let mut params = ListParams::for_listable::<Variant>();
        params.set_page(2);
        let page = query_page::<Variant>(&db, &params).unwrap();
        assert_eq!(page.total_count, 45);
        assert_eq!(page.rows.len(), 5);
        let window = page.window();
        assert_eq!((window.showing_from, window.showing_to), (41, 45));
        assert!(!window.has_next);
    }

    #[test]
    fn test_search_is_case_insensitive_or_across_fields() {
        let db = test_db();
        seed_variants(&db, 10);
        let mut params = ListParams::for_listable::<Variant>();
        params.set_search("shank");
        let by_gene = query_page::<Variant>(&db, &params).unwrap();
        assert_eq!(by_gene.total_count, 5);

        params.set_search("s-007");
        let by_sample = query_page::<Variant>(&db, &params).unwrap();
        assert_eq!(by_sample.total_count, 1);
        assert_eq!(by_sample.rows[0].variant, "c.7A>G");
    }

    #[test]
    fn test_filter_ands_with_search_and_count_matches() {
        let db = test_db();
        seed_variants(&db, 12);
        let mut params = ListParams::for_listable::<Variant>();
        params.set_search("SHANK3");
        params.set_filter("status", Some("completed"));
        let page = query_page::<Variant>(&db, &params).unwrap();
        // even and divisible by 3: 0, 6
        assert_eq!(page.total_count, 2);
        assert!(page
            .rows
            .iter()
            .all(|v| v.gene == "SHANK3" && v.status == VariantStatus::Completed));
    }

    #[test]
    fn test_wildcards_match_literally() {
        let db = test_db();
        seed_variants(&db, 3);
        let mut params = ListParams::for_listable::<Variant>();
        params.set_search("%");
        assert_eq!(query_page::<Variant>(&db, &params).unwrap().total_count, 0);
    }

    #[test]
    fn test_sort_by_field() {
        let db = test_db();
        seed_variants(&db, 4);
        let mut params = ListParams::for_listable::<Variant>();
        params.toggle_sort("gene");
        let page = query_page::<Variant>(&db, &params).unwrap();
        assert_eq!(page.rows[0].gene, "CHD8");
        params.toggle_sort("gene");
        let page = query_page::<Variant>(&db, &params).unwrap();
        assert_eq!(page.rows[0].gene, "SHANK3");
    }

    #[test]
    fn test_fetch_or_empty_degrades() {
        let db = test_db();
        let mut params = ListParams::for_listable::<Variant>();
        params.set_sort("nope", SortDirection::Asc);
        let fetched = fetch_or_empty(query_page::<Variant>(&db, &params), &params);
        assert!(fetched.page.rows.is_empty());
        assert_eq!(fetched.page.total_count, 0);
        assert!(fetched.error.is_some());
    }

    #[test]
    fn test_backend_failure_degrades_to_empty() {
        let db = test_db();
        db.conn().execute_batch("DROP TABLE variant_comments; DROP TABLE variants;").unwrap();
        let params = ListParams::for_listable::<Variant>();
        let fetched = fetch_or_empty(query_page::<Variant>(&db, &params), &params);
        assert!(fetched.page.rows.is_empty());
        assert_eq!(fetched.error.as_deref(), Some("Could not load records. Try again."));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_window_matches_rows_returned(total in 0usize..70, page in 0usize..5) {
            let db = test_db();
            seed_variants(&db, total);
            let mut params = ListParams::for_listable::<Variant>();
            params.set_page(page);
            let result = query_page::<Variant>(&db, &params).unwrap();
            let window = result.window();
            prop_assert_eq!(window.len(), result.rows.len());
            if !result.rows.is_empty() {
                prop_assert_eq!(window.showing_from, page * 20 + 1);
                prop_assert_eq!(window.showing_to, ((page + 1) * 20).min(total));
            }
        }

        #[test]
        fn prop_window_arithmetic(page in 0usize..1000, size in 1usize..100, total in 0usize..100_000) {
            let w = PageWindow::new(page, size, total);
            prop_assert!(w.showing_to <= total);
            prop_assert!(w.len() <= size);
            if w.showing_from > 0 {
                prop_assert_eq!(w.showing_from, page * size + 1);
                prop_assert_eq!(w.showing_to, ((page + 1) * size).min(total));
            }
            prop_assert_eq!(w.has_next, (page + 1) * size < total);
        }
    }
}
