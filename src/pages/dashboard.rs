//! Gated pages. Each handler relies on the [`CurrentSession`] set by the gate.

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::{HeaderMap, header},
};
use serde::{Deserialize, Serialize};

use super::PagesState;
use super::error::PageError;
use crate::api::{Payment, RequestContext, User};
use crate::gate::CurrentSession;
use crate::table::{PaginationState, SortColumn, SortDirection, Sorting, TableState, sort_rows};

fn require_session(session: Option<Extension<CurrentSession>>) -> Result<CurrentSession, PageError> {
    session
        .map(|Extension(session)| session)
        .ok_or_else(|| PageError::unauthorized("Not signed in"))
}

/// API context for the session, forwarding the browser's cookies.
fn session_context(session: &CurrentSession, headers: &HeaderMap) -> RequestContext {
    let ctx = session.context();
    match headers.get(header::COOKIE).and_then(|v| v.to_str().ok()) {
        Some(cookies) => ctx.forwarding_cookies(cookies),
        None => ctx,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub user: User,
    pub display_name: String,
}

pub async fn dashboard(
    session: Option<Extension<CurrentSession>>,
) -> Result<Json<DashboardView>, PageError> {
    let session = require_session(session)?;
    Ok(Json(DashboardView {
        display_name: session.user.display_name(),
        user: session.user,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub email: Option<String>,
    pub sort: Option<SortColumn>,
    pub order: Option<SortDirection>,
}

impl PaymentsQuery {
    fn table_state(&self) -> TableState {
        let mut table = TableState::new(PaginationState::from_query(self.page, self.limit));
        if let Some(email) = self.email.as_deref() {
            // A filter arrives together with the page it was typed on, so the
            // requested page is kept.
            let page_index = table.pagination().page_index;
            table.set_email_filter(email.trim());
            table.set_page(page_index);
        }
        table.set_sorting(self.sort.map(|column| Sorting {
            column,
            direction: self.order.unwrap_or_default(),
        }));
        table
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentsView {
    pub rows: Vec<Payment>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub page_count: u64,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sorting: Option<Sorting>,
}

/// `GET /payments`: one page of payments, optionally filtered and sorted.
pub async fn payments(
    State(state): State<PagesState>,
    session: Option<Extension<CurrentSession>>,
    headers: HeaderMap,
    Query(query): Query<PaymentsQuery>,
) -> Result<Json<PaymentsView>, PageError> {
    let session = require_session(session)?;
    let table = query.table_state();
    let pagination = table.pagination();

    let ctx = session_context(&session, &headers);
    let page = state
        .payments
        .list(&ctx, pagination, table.email_filter())
        .await
        .into_result()
        .map_err(|e| PageError::upstream("Failed to load payments", e))?;

    let mut rows = page.data;
    sort_rows(&mut rows, table.sorting());

    Ok(Json(PaymentsView {
        rows,
        total: page.total,
        page: pagination.page_index + 1,
        page_size: pagination.page_size,
        page_count: table.page_count(page.total),
        email: table.email_filter().to_string(),
        sorting: table.sorting(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_to_table_state() {
        let query = PaymentsQuery {
            page: Some(2),
            limit: Some(20),
            email: Some(" ana ".into()),
            sort: Some(SortColumn::Date),
            order: Some(SortDirection::Desc),
        };
        let table = query.table_state();
        assert_eq!(table.pagination().page_index, 1);
        assert_eq!(table.pagination().page_size, 20);
        assert_eq!(table.email_filter(), "ana");
        assert_eq!(
            table.sorting(),
            Some(Sorting {
                column: SortColumn::Date,
                direction: SortDirection::Desc,
            })
        );
    }

    #[test]
    fn test_empty_query_defaults() {
        let table = PaymentsQuery::default().table_state();
        assert_eq!(table.pagination(), PaginationState::default());
        assert_eq!(table.email_filter(), "");
        assert_eq!(table.sorting(), None);
    }
}
