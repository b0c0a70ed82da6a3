use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::PageQuery;
use crate::entities::blocked_customer;
use crate::errors::ServiceError;
use crate::services::CustomerSummary;
use crate::{ApiResponse, ApiResult, AppState};

const DEFAULT_CUSTOMER_PAGE_SIZE: u64 = 50;

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct BlockedLookup {
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct BlockCustomerRequest {
    /// Restricts the block to this phone; omitted blocks the email with any phone
    pub phone: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/customers/is-blocked",
    summary = "Check whether a customer is blocked",
    params(BlockedLookup),
    responses((status = 200, description = "Block flag", body = bool)),
    tag = "customers"
)]
pub async fn is_blocked(
    State(state): State<AppState>,
    Query(lookup): Query<BlockedLookup>,
) -> Result<Json<bool>, ServiceError> {
    let blocked = state
        .services
        .customers
        .is_blocked(&lookup.email, lookup.phone.as_deref())
        .await?;
    Ok(Json(blocked))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/customers",
    summary = "List customers",
    description = "Distinct contact pairs from placed orders with their block flag",
    params(PageQuery),
    responses((status = 200, description = "Customers retrieved", body = ApiResponse<Vec<CustomerSummary>>)),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Vec<CustomerSummary>> {
    let customers = state
        .services
        .customers
        .list_customers(page.limit_or(DEFAULT_CUSTOMER_PAGE_SIZE), page.offset())
        .await?;
    Ok(Json(ApiResponse::success(customers)))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/customers/{email}/block",
    summary = "Block customer",
    params(("email" = String, Path, description = "Customer email")),
    request_body(content = BlockCustomerRequest, description = "Optional phone restriction"),
    responses((status = 200, description = "Customer blocked", body = ApiResponse<blocked_customer::Model>)),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn block_customer(
    State(state): State<AppState>,
    Path(email): Path<String>,
    request: Option<Json<BlockCustomerRequest>>,
) -> ApiResult<blocked_customer::Model> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let entry = state
        .services
        .customers
        .block_customer(&email, request.phone.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(entry)))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/customers/{email}/unblock",
    summary = "Unblock customer",
    params(("email" = String, Path, description = "Customer email")),
    responses(
        (status = 200, description = "Customer unblocked"),
        (status = 404, description = "Customer is not blocked", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn unblock_customer(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<String> {
    state.services.customers.unblock_customer(&email).await?;
    Ok(Json(ApiResponse::success(format!("Customer {} unblocked", email))))
}
