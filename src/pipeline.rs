use icu_collator::options::CollatorOptions;
use icu_collator::{Collator, CollatorBorrowed};
use rayon::prelude::*;
use std::cmp::Ordering;
use tracing::warn;

use crate::store::{Column, Row, SortOrder, TableStore, Value};

/// Rows that survive the search, in insertion order.
///
/// Every column is searched, hidden ones included. Fields that are not
/// backed by a column are ignored.
pub fn filter_rows<'a>(rows: &'a [Row], columns: &[Column], query: &str) -> Vec<&'a Row> {
    if query.is_empty() {
        return rows.iter().collect();
    }
    let needle = query.to_lowercase();
    rows.par_iter()
        .filter(|row| row_matches(row, columns, &needle))
        .collect()
}

fn row_matches(row: &Row, columns: &[Column], needle: &str) -> bool {
    columns.iter().any(|column| {
        row.get(&column.id)
            .map(|v| v.to_string().to_lowercase().contains(needle))
            .unwrap_or(false)
    })
}

/// Stable sort by the value at `key`. Numbers compare numerically when both
/// sides are numbers, everything else compares as lowercased text under the
/// root collation, so accented letters sort next to their base letter.
pub fn sort_rows(rows: &mut [&Row], key: &str, order: SortOrder) {
    let collator = Collator::try_new(Default::default(), CollatorOptions::default())
        .map_err(|e| warn!("Collation data unavailable, sorting by code point: {e}"))
        .ok();
    rows.sort_by(|a, b| {
        let ordering = compare_values(a.get(key), b.get(key), collator.as_ref());
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

fn compare_values(
    a: Option<&Value>,
    b: Option<&Value>,
    collator: Option<&CollatorBorrowed<'static>>,
) -> Ordering {
    if let (Some(Value::Number(x)), Some(Value::Number(y))) = (a, b) {
        return x.partial_cmp(y).unwrap_or(Ordering::Equal);
    }
    let a_str = a.map(|v| v.to_string().to_lowercase()).unwrap_or_default();
    let b_str = b.map(|v| v.to_string().to_lowercase()).unwrap_or_default();
    match collator {
        Some(collator) => collator.compare(&a_str, &b_str),
        None => a_str.cmp(&b_str),
    }
}

pub fn total_pages(count: usize, rows_per_page: usize) -> usize {
    count.div_ceil(rows_per_page.max(1))
}

/// The raw page slice. Pages past the end are empty, not clamped.
pub fn paginate<'a, 'b>(rows: &'a [&'b Row], page: usize, rows_per_page: usize) -> &'a [&'b Row] {
    let start = page.saturating_mul(rows_per_page).min(rows.len());
    let end = start.saturating_add(rows_per_page).min(rows.len());
    &rows[start..end]
}

/// Filter -> sort -> paginate, derived from scratch on every call.
pub struct DerivedView<'a> {
    pub rows: Vec<&'a Row>,
    pub current_page: usize,
    pub rows_per_page: usize,
    pub total_pages: usize,
}

impl<'a> DerivedView<'a> {
    pub fn derive(store: &'a TableStore) -> Self {
        let mut rows = filter_rows(store.rows(), store.columns(), store.search_query());
        if let Some(key) = store.sort_by() {
            sort_rows(&mut rows, key, store.sort_order());
        }

        let rows_per_page = store.rows_per_page().max(1);
        let current_page = store.current_page();

        DerivedView {
            total_pages: total_pages(rows.len(), rows_per_page),
            rows,
            current_page,
            rows_per_page,
        }
    }

    /// Rows of a given page.
    pub fn page_at(&self, page: usize) -> &[&'a Row] {
        paginate(&self.rows, page, self.rows_per_page)
    }

    /// Current page forced into the valid range, 0 for an empty view.
    pub fn clamped_page(&self) -> usize {
        self.current_page.min(self.total_pages.saturating_sub(1))
    }

    /// Rows shown on the clamped page.
    pub fn visible_page(&self) -> &[&'a Row] {
        self.page_at(self.clamped_page())
    }

    /// One based (first, last, total) of the clamped page for the footer.
    pub fn showing(&self) -> (usize, usize, usize) {
        let total = self.rows.len();
        if total == 0 {
            return (0, 0, 0);
        }
        let page = self.clamped_page();
        let first = page * self.rows_per_page + 1;
        let last = ((page + 1) * self.rows_per_page).min(total);
        (first, last, total)
    }
}
