//! Payments listing endpoint.

use super::client::{ApiClient, ApiResponse, RequestContext, RequestOptions};
use super::types::PaymentPage;
use crate::table::PaginationState;

pub const PAYMENTS_ENDPOINT: &str = "payments";

#[derive(Debug, Clone)]
pub struct PaymentsService {
    client: ApiClient,
}

impl PaymentsService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Fetch one page. The wire format is 1-based `page`, `limit` and an
    /// `email` filter which is sent even when empty.
    pub async fn list(
        &self,
        ctx: &RequestContext,
        pagination: PaginationState,
        email_filter: &str,
    ) -> ApiResponse<PaymentPage> {
        let options = RequestOptions::default()
            .query("page", (pagination.page_index + 1).to_string())
            .query("limit", pagination.page_size.to_string())
            .query("email", email_filter);
        self.client
            .get(ctx, PAYMENTS_ENDPOINT, Some(&options))
            .await
    }
}
