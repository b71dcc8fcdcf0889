//! List request parameters and their change policy.
//!
//! Any change to the search term, a filter, or the sort resets the page
//! index to zero. Moving between pages leaves everything else alone.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::Listable;
use crate::config::PAGE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

/// Search, filter, sort, and page for one list request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    search: String,
    filters: BTreeMap<String, String>,
    sort: SortKey,
    page_index: usize,
    page_size: usize,
}

impl ListParams {
    /// Parameters for `R` with its default sort and the standard page size.
    #[must_use]
    pub fn for_listable<R: Listable>() -> Self {
        let (field, direction) = R::DEFAULT_SORT;
        Self::new(field, direction)
    }

    #[must_use]
    pub fn new(sort_field: &str, direction: SortDirection) -> Self {
        Self {
            search: String::new(),
            filters: BTreeMap::new(),
            sort: SortKey {
                field: sort_field.to_string(),
                direction,
            },
            page_index: 0,
            page_size: PAGE_SIZE,
        }
    }

    /// Override the page size. Zero is treated as one.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    #[must_use]
    pub const fn filters(&self) -> &BTreeMap<String, String> {
        &self.filters
    }

    #[must_use]
    pub const fn sort(&self) -> &SortKey {
        &self.sort
    }

    #[must_use]
    pub const fn page_index(&self) -> usize {
        self.page_index
    }

    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    #[must_use]
    pub const fn offset(&self) -> usize {
        self.page_index.saturating_mul(self.page_size)
    }

    /// Replace the search term. Returns whether anything changed.
    pub fn set_search(&mut self, text: &str) -> bool {
        let text = text.trim();
        if self.search == text {
            return false;
        }
        self.search = text.to_string();
        self.page_index = 0;
        true
    }

    /// Set or clear (`None`) a categorical filter.
    pub fn set_filter(&mut self, field: &str, value: Option<&str>) -> bool {
        let changed = match value {
            Some(v) => self.filters.get(field).map(String::as_str) != Some(v),
            None => self.filters.contains_key(field),
        };
        if !changed {
            return false;
        }
        match value {
            Some(v) => {
                self.filters.insert(field.to_string(), v.to_string());
            }
            None => {
                self.filters.remove(field);
            }
        }
        self.page_index = 0;
        true
    }

    /// Column-header click: same field flips direction, a new field
    /// starts ascending.
    pub fn toggle_sort(&mut self, field: &str) {
        if self.sort.field == field {
            self.sort.direction = self.sort.direction.flipped();
        } else {
            self.sort = SortKey {
                field: field.to_string(),
                direction: SortDirection::Asc,
            };
        }
        self.page_index = 0;
    }

    /// Set an explicit sort. Returns whether anything changed.
    pub fn set_sort(&mut self, field: &str, direction: SortDirection) -> bool {
        if self.sort.field == field && self.sort.direction == direction {
            return false;
        }
        self.sort = SortKey {
            field: field.to_string(),
            direction,
        };
        self.page_index = 0;
        true
    }

    /// Move to a page. Touches nothing else.
    pub fn set_page(&mut self, page_index: usize) -> bool {
        if self.page_index == page_index {
            return false;
        }
        self.page_index = page_index;
        true
    }
}
