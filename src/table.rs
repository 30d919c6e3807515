//! Server-side state for the payments table: pagination, email filter and
//! per-column sorting of the fetched page.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::api::Payment;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Page position. `page_index` is 0-based; the API sees `page_index + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationState {
    pub page_index: u32,
    pub page_size: u32,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PaginationState {
    /// Build from the 1-based `page` and `limit` query values. Zero or
    /// missing values fall back to the defaults.
    pub fn from_query(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page_index: page.filter(|p| *p > 0).map(|p| p - 1).unwrap_or(0),
            page_size: limit.filter(|l| *l > 0).unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }
}

/// Number of pages needed for `total` rows.
pub fn page_count(total: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(u64::from(page_size))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortColumn {
    Id,
    Status,
    Email,
    Amount,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sorting {
    pub column: SortColumn,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableState {
    pagination: PaginationState,
    email_filter: String,
    sorting: Option<Sorting>,
}

impl TableState {
    pub fn new(pagination: PaginationState) -> Self {
        Self {
            pagination,
            ..Default::default()
        }
    }

    pub fn pagination(&self) -> PaginationState {
        self.pagination
    }

    pub fn email_filter(&self) -> &str {
        &self.email_filter
    }

    pub fn sorting(&self) -> Option<Sorting> {
        self.sorting
    }

    pub fn set_page(&mut self, page_index: u32) {
        self.pagination.page_index = page_index;
    }

    /// Changing the filter always goes back to the first page.
    pub fn set_email_filter(&mut self, filter: impl Into<String>) {
        let filter = filter.into();
        if filter != self.email_filter {
            self.email_filter = filter;
            self.pagination.page_index = 0;
        }
    }

    /// Sort by `column`; sorting the same column again flips the direction.
    pub fn toggle_sort(&mut self, column: SortColumn) {
        self.sorting = Some(match self.sorting {
            Some(current) if current.column == column => Sorting {
                column,
                direction: match current.direction {
                    SortDirection::Asc => SortDirection::Desc,
                    SortDirection::Desc => SortDirection::Asc,
                },
            },
            _ => Sorting {
                column,
                direction: SortDirection::Asc,
            },
        });
    }

    pub fn set_sorting(&mut self, sorting: Option<Sorting>) {
        self.sorting = sorting;
    }

    pub fn page_count(&self, total: u64) -> u64 {
        page_count(total, self.pagination.page_size)
    }
}

fn compare(a: &Payment, b: &Payment, column: SortColumn) -> Ordering {
    match column {
        SortColumn::Id => a.id.cmp(&b.id),
        SortColumn::Status => a.status.cmp(&b.status),
        SortColumn::Email => a.email.to_lowercase().cmp(&b.email.to_lowercase()),
        SortColumn::Amount => a.amount.total_cmp(&b.amount),
        // ISO 8601 timestamps order lexically.
        SortColumn::Date => a.created_at.cmp(&b.created_at),
    }
}

/// Stable sort of one fetched page.
pub fn sort_rows(rows: &mut [Payment], sorting: Option<Sorting>) {
    let Some(sorting) = sorting else {
        return;
    };
    rows.sort_by(|a, b| {
        let ord = compare(a, b, sorting.column);
        match sorting.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::PaymentStatus;

    fn payment(id: &str, amount: f64, status: PaymentStatus, email: &str) -> Payment {
        Payment {
            id: id.to_string(),
            amount,
            status,
            email: email.to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(1, 10), 1);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
        assert_eq!(page_count(5, 0), 0);
    }

    #[test]
    fn test_from_query() {
        assert_eq!(PaginationState::from_query(None, None), PaginationState::default());
        assert_eq!(
            PaginationState::from_query(Some(3), Some(25)),
            PaginationState {
                page_index: 2,
                page_size: 25
            }
        );
        assert_eq!(PaginationState::from_query(Some(0), Some(0)).page_size, 10);
    }

    #[test]
    fn test_filter_change_resets_page() {
        let mut table = TableState::new(PaginationState::default());
        table.set_page(4);
        table.set_email_filter("ken");
        assert_eq!(table.pagination().page_index, 0);
        assert_eq!(table.email_filter(), "ken");

        table.set_page(2);
        table.set_email_filter("ken");
        assert_eq!(table.pagination().page_index, 2);
    }

    #[test]
    fn test_toggle_sort() {
        let mut table = TableState::default();
        table.toggle_sort(SortColumn::Amount);
        assert_eq!(table.sorting().unwrap().direction, SortDirection::Asc);
        table.toggle_sort(SortColumn::Amount);
        assert_eq!(table.sorting().unwrap().direction, SortDirection::Desc);
        table.toggle_sort(SortColumn::Email);
        assert_eq!(
            table.sorting(),
            Some(Sorting {
                column: SortColumn::Email,
                direction: SortDirection::Asc
            })
        );
    }

    #[test]
    fn test_sort_rows() {
        let mut rows = vec![
            payment("b", 20.0, PaymentStatus::Success, "Zed@x.io"),
            payment("a", 5.5, PaymentStatus::Pending, "amy@x.io"),
            payment("c", 100.0, PaymentStatus::Failed, "bob@x.io"),
        ];

        sort_rows(
            &mut rows,
            Some(Sorting {
                column: SortColumn::Amount,
                direction: SortDirection::Desc,
            }),
        );
        let ids: Vec<_> = rows.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["c", "b", "a"]);

        sort_rows(
            &mut rows,
            Some(Sorting {
                column: SortColumn::Email,
                direction: SortDirection::Asc,
            }),
        );
        let ids: Vec<_> = rows.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["a", "c", "b"]);

        sort_rows(&mut rows, None);
        let ids: Vec<_> = rows.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["a", "c", "b"]);
    }
}
