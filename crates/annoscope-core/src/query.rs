//! Typed query building blocks shared by every repository.
//!
//! Filters are enumerated per document type (see `RunFilter` and
//! `CollectionFilter`); this module holds the parts that do not depend on the
//! document type: sorting, skip/limit, page arithmetic and result envelopes.

use crate::error::{AnnoError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Fields every stored document exposes for sorting.
pub trait Document {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn created_at(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortField {
    #[default]
    Id,
    Name,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sort {
    pub field: SortField,
    pub order: SortOrder,
}

impl Sort {
    pub fn ascending(field: SortField) -> Self {
        Self {
            field,
            order: SortOrder::Ascending,
        }
    }

    pub fn descending(field: SortField) -> Self {
        Self {
            field,
            order: SortOrder::Descending,
        }
    }

    fn compare<T: Document>(&self, a: &T, b: &T) -> Ordering {
        let ordering = match self.field {
            SortField::Id => a.id().cmp(b.id()),
            SortField::Name => a.name().cmp(b.name()).then_with(|| a.id().cmp(b.id())),
            SortField::CreatedAt => a
                .created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(b.id())),
        };
        match self.order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

/// Sort and skip/limit options for a `find` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FindOptions {
    pub sort: Sort,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl FindOptions {
    /// Every match, sorted by the given key.
    pub fn sorted(sort: Sort) -> Self {
        Self {
            sort,
            ..Self::default()
        }
    }

    /// Restricts the window to the given skip/limit.
    pub fn window(mut self, skip: usize, limit: usize) -> Self {
        self.skip = skip;
        self.limit = Some(limit);
        self
    }

    /// Sorts the matched documents and cuts the requested window out of them.
    ///
    /// `count` in the returned envelope is the number of matches before
    /// skip/limit were applied.
    pub fn apply<T: Document>(&self, mut matched: Vec<T>) -> Found<T> {
        matched.sort_by(|a, b| self.sort.compare(a, b));
        let count = matched.len();
        let data = matched
            .into_iter()
            .skip(self.skip)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect();
        Found { data, count }
    }
}

/// Result of a store-level `find`.
#[derive(Debug, Clone, PartialEq)]
pub struct Found<T> {
    pub data: Vec<T>,
    pub count: usize,
}

/// One-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }

    /// Page 1 of the given size.
    pub fn first(page_size: u32) -> Self {
        Self::new(1, page_size)
    }

    /// Rejects a zero page size; page 0 is read as page 1.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(AnnoError::validation("page size must be at least 1"));
        }
        Ok(())
    }

    pub fn skip(&self) -> usize {
        (self.page.max(1) as usize - 1) * self.page_size as usize
    }

    pub fn total_pages(&self, count: usize) -> usize {
        count.div_ceil(self.page_size.max(1) as usize)
    }

    /// Cuts one page out of an already filtered and sorted list.
    pub fn paginate<T>(&self, items: Vec<T>) -> PagedResult<T> {
        let count = items.len();
        let data = items
            .into_iter()
            .skip(self.skip())
            .take(self.page_size as usize)
            .collect();
        PagedResult {
            data,
            count,
            total_pages: self.total_pages(count),
        }
    }
}

/// One page of results plus the totals needed to render a pager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub data: Vec<T>,
    pub count: usize,
    pub total_pages: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Debug, Clone, PartialEq)]
    struct Doc {
        id: String,
        name: String,
        created_at: DateTime<Utc>,
    }

    impl Document for Doc {
        fn id(&self) -> &str {
            &self.id
        }
        fn name(&self) -> &str {
            &self.name
        }
        fn created_at(&self) -> DateTime<Utc> {
            self.created_at
        }
    }

    fn doc(id: &str, name: &str, minute: u32) -> Doc {
        Doc {
            id: id.to_string(),
            name: name.to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, minute, 0).unwrap(),
        }
    }

    #[test]
    fn test_pagination_windows() {
        let items: Vec<u32> = (1..=5).collect();

        let first = Pagination::new(1, 3).paginate(items.clone());
        assert_eq!(first.data, vec![1, 2, 3]);
        assert_eq!(first.count, 5);
        assert_eq!(first.total_pages, 2);

        let second = Pagination::new(2, 3).paginate(items.clone());
        assert_eq!(second.data, vec![4, 5]);
        assert_eq!(second.count, 5);
        assert_eq!(second.total_pages, 2);

        let past_end = Pagination::new(3, 3).paginate(items);
        assert!(past_end.data.is_empty());
        assert_eq!(past_end.count, 5);
    }

    #[test]
    fn test_page_zero_reads_as_first_page() {
        assert_eq!(Pagination::new(0, 10).skip(), 0);
        assert!(Pagination::new(1, 0).validate().is_err());
        assert_eq!(Pagination::default().page, 1);
    }

    #[test]
    fn test_empty_result_has_zero_pages() {
        let page = Pagination::first(4).paginate(Vec::<u32>::new());
        assert_eq!(page.count, 0);
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn test_find_options_sorts_then_windows() {
        let docs = vec![doc("c", "beta", 3), doc("a", "gamma", 1), doc("b", "alpha", 2)];

        let by_id = FindOptions::default().apply(docs.clone());
        let ids: Vec<_> = by_id.data.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let newest = FindOptions::sorted(Sort::descending(SortField::CreatedAt))
            .window(0, 2)
            .apply(docs.clone());
        let ids: Vec<_> = newest.data.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
        assert_eq!(newest.count, 3);

        let by_name = FindOptions::sorted(Sort::ascending(SortField::Name))
            .window(1, 5)
            .apply(docs);
        let names: Vec<_> = by_name.data.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["beta", "gamma"]);
    }
}
