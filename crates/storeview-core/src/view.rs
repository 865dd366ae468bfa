//! The derived-collection view: join, filter, paginate.
//!
//! [`compute_view`] is a pure function of its inputs. Hosts call it again
//! whenever a fetched collection or a query parameter changes; nothing is
//! cached between calls.
//!
//! # Steps
//!
//! 1. Join primary records to the secondary collection (see [`crate::join`]).
//! 2. Keep records matching the search term and date range.
//! 3. Clamp the requested page and slice out its window.

use serde::{Deserialize, Serialize};

use crate::filter::{filter_records, DateRange, FieldSearch, SearchPredicate};
use crate::join::{join_records, JoinSpec};
use crate::models::{DerivedRecord, RawRecord};
use crate::page::{paginate, PageWindow};

/// Page size used when the caller does not choose one.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// User-controlled filter and pagination state for one view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    /// Free-text search term; blank matches everything.
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub date_range: Option<DateRange>,
    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            search: String::new(),
            date_range: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Static configuration of a view: how to join, search, and date-filter.
#[derive(Debug, Clone, Default)]
pub struct ViewSpec<P = FieldSearch> {
    /// Join against a secondary collection; `None` yields unjoined records.
    pub join: Option<JoinSpec>,
    pub search: P,
    /// Field the date range applies to; without it the range is ignored.
    pub date_field: Option<String>,
}

impl<P: SearchPredicate> ViewSpec<P> {
    pub fn new(search: P) -> Self {
        Self {
            join: None,
            search,
            date_field: None,
        }
    }

    pub fn with_join(mut self, join: JoinSpec) -> Self {
        self.join = Some(join);
        self
    }

    pub fn with_date_field(mut self, field: impl Into<String>) -> Self {
        self.date_field = Some(field.into());
        self
    }
}

/// One page of a computed view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewResult<'a> {
    pub page_items: Vec<DerivedRecord<'a>>,
    /// Number of records after filtering, across all pages.
    pub total_items: usize,
    pub total_pages: usize,
    pub current_page: usize,
    pub page_size: usize,
}

/// Join and filter without paginating.
///
/// Summaries and totals run over this full filtered set.
pub fn derive_records<'a, P: SearchPredicate>(
    primary: &'a [RawRecord],
    secondary: Option<&'a [RawRecord]>,
    spec: &ViewSpec<P>,
    params: &QueryParams,
) -> Vec<DerivedRecord<'a>> {
    let derived = match &spec.join {
        Some(join) => join_records(primary, secondary, join),
        None => primary.iter().map(DerivedRecord::unjoined).collect(),
    };
    filter_records(
        derived,
        &spec.search,
        &params.search,
        spec.date_field.as_deref(),
        params.date_range.as_ref(),
    )
}

/// Compute one page of the derived collection.
pub fn compute_view<'a, P: SearchPredicate>(
    primary: &'a [RawRecord],
    secondary: Option<&'a [RawRecord]>,
    spec: &ViewSpec<P>,
    params: &QueryParams,
) -> ViewResult<'a> {
    let filtered = derive_records(primary, secondary, spec, params);
    let total_items = filtered.len();
    let window = PageWindow::new(total_items, params.page, params.page_size);

    ViewResult {
        page_items: paginate(filtered, &window),
        total_items,
        total_pages: window.total_pages,
        current_page: window.current_page,
        page_size: window.page_size,
    }
}
