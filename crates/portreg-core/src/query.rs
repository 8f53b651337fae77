//! Filtering, sorting and paging of a snapshot for display.
//!
//! Queries never touch the store; they work on a snapshot and return owned
//! rows, so the collection order itself is left alone.

use crate::models::{PortField, PortRecord};

/// Rows per page when none is requested.
pub const DEFAULT_PAGE_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// What to show from a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortQuery {
    /// Per-field "contains" filters, case-insensitive
    pub filters: Vec<(PortField, String)>,
    /// Matches against any field, case-insensitive
    pub search: Option<String>,
    pub sort: Option<(PortField, SortOrder)>,
    /// 1-based
    pub page: usize,
    pub page_size: usize,
}

impl Default for PortQuery {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            search: None,
            sort: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortPage {
    pub items: Vec<PortRecord>,
    /// Number of records matching the filters, across all pages
    pub total: usize,
    pub page: usize,
    pub page_count: usize,
}

impl PortQuery {
    pub fn filter(mut self, field: PortField, needle: impl Into<String>) -> Self {
        self.filters.push((field, needle.into()));
        self
    }

    pub fn search(mut self, needle: impl Into<String>) -> Self {
        self.search = Some(needle.into());
        self
    }

    pub fn sort_by(mut self, field: PortField, order: SortOrder) -> Self {
        self.sort = Some((field, order));
        self
    }

    pub fn page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    fn matches(&self, record: &PortRecord) -> bool {
        let field_hits = self
            .filters
            .iter()
            .all(|(field, needle)| contains_ci(record.field(*field), needle));
        let search_hit = match &self.search {
            Some(needle) => PortField::ALL
                .iter()
                .any(|f| contains_ci(record.field(*f), needle)),
            None => true,
        };
        field_hits && search_hit
    }

    /// Runs the query over a collection.
    ///
    /// Page numbers past the end are clamped to the last page; page 0 is
    /// treated as page 1. Digit-only port numbers sort numerically, ahead
    /// of malformed ones.
    pub fn run(&self, records: &[PortRecord]) -> PortPage {
        let mut rows: Vec<&PortRecord> = records.iter().filter(|r| self.matches(r)).collect();

        if let Some((field, order)) = self.sort {
            rows.sort_by(|a, b| {
                let ordering = compare_field(a, b, field);
                match order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            });
        }

        let size = self.page_size.max(1);
        let total = rows.len();
        let page_count = total.div_ceil(size).max(1);
        let page = self.page.clamp(1, page_count);
        let items = rows
            .into_iter()
            .skip((page - 1) * size)
            .take(size)
            .cloned()
            .collect();

        PortPage {
            items,
            total,
            page,
            page_count,
        }
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim();
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Numeric port tokens first, by value; everything else after, by text.
fn sort_key(record: &PortRecord, field: PortField) -> (bool, u64, String) {
    let value = record.field(field);
    if field == PortField::PortNumber {
        if let Ok(n) = value.parse::<u64>() {
            return (false, n, String::new());
        }
    }
    (true, 0, value.to_lowercase())
}

fn compare_field(a: &PortRecord, b: &PortRecord, field: PortField) -> std::cmp::Ordering {
    sort_key(a, field).cmp(&sort_key(b, field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPortRecord;

    fn sample() -> Vec<PortRecord> {
        [
            ("8080", "Alpha", "Web", "public"),
            ("443", "Beta", "Proxy", ""),
            ("9090", "alpha", "API", "internal"),
            ("22", "Ops", "ssh", ""),
            ("5432", "Beta", "Postgres", "primary"),
            ("6379", "Gamma", "Redis", ""),
            ("abc", "Gamma", "Broken", "imported"),
        ]
        .iter()
        .zip(1..)
        .map(|((p, pr, a, d), id)| NewPortRecord::new(*p, *pr, *a, *d).with_id(id))
        .collect()
    }

    #[test]
    fn test_default_first_page() {
        let page = PortQuery::default().run(&sample());
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.total, 7);
        assert_eq!(page.page_count, 2);
        assert_eq!(page.items[0].id, 1);
    }

    #[test]
    fn test_page_is_clamped() {
        let page = PortQuery::default().page(9).run(&sample());
        assert_eq!(page.page, 2);
        assert_eq!(page.items.len(), 2);

        let page = PortQuery::default().page(0).run(&sample());
        assert_eq!(page.page, 1);
    }

    #[test]
    fn test_field_filter_is_case_insensitive() {
        let page = PortQuery::default()
            .filter(PortField::ProjectName, "ALPHA")
            .run(&sample());
        assert_eq!(page.items.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_filters_combine() {
        let page = PortQuery::default()
            .filter(PortField::ProjectName, "beta")
            .filter(PortField::Description, "prim")
            .run(&sample());
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].port_number, "5432");
    }

    #[test]
    fn test_global_search() {
        let page = PortQuery::default().search("redis").run(&sample());
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].port_number, "6379");
    }

    #[test]
    fn test_port_numbers_sort_numerically() {
        let page = PortQuery::default()
            .sort_by(PortField::PortNumber, SortOrder::Ascending)
            .page_size(10)
            .run(&sample());
        let ports: Vec<&str> = page.items.iter().map(|r| r.port_number.as_str()).collect();
        assert_eq!(ports, ["22", "443", "5432", "6379", "8080", "9090", "abc"]);
    }

    #[test]
    fn test_descending_sort_is_stable() {
        let page = PortQuery::default()
            .sort_by(PortField::ProjectName, SortOrder::Descending)
            .page_size(10)
            .run(&sample());
        let ids: Vec<u64> = page.items.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![4, 6, 7, 2, 5, 1, 3]);
    }

    #[test]
    fn test_empty_result_is_a_page() {
        let page = PortQuery::default().search("nothing").run(&sample());
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(page.page_count, 1);
    }
}
