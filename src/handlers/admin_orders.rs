use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::PageQuery;
use crate::entities::{order, DeliveryMethod, OrderStatus, PaymentMethod, PaymentStatus};
use crate::errors::ServiceError;
use crate::models::OrderDetails;
use crate::services::orders::DEFAULT_ORDER_PAGE_SIZE;
use crate::{ApiResponse, ApiResult, AppState};

/// Order as listed in the admin panel
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderAdminView {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub delivery_method: DeliveryMethod,
    pub delivery_city: Option<String>,
    pub delivery_street: Option<String>,
    pub delivery_house: Option<String>,
    pub delivery_apartment: Option<String>,
    pub delivery_floor: Option<String>,
    pub delivery_date: Option<DateTime<Utc>>,
    #[schema(value_type = String, example = "2000.00")]
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub is_active: bool,
    /// Bumped on every status write; send it back as `expected_version`
    pub version: i32,
    pub created_at: DateTime<Utc>,
}

impl From<order::Model> for OrderAdminView {
    fn from(order: order::Model) -> Self {
        Self {
            id: order.id,
            customer_name: order.customer_name,
            customer_email: order.customer_email,
            customer_phone: order.customer_phone,
            recipient_name: order.recipient_name,
            recipient_phone: order.recipient_phone,
            delivery_method: order.delivery_method,
            delivery_city: order.delivery_city,
            delivery_street: order.delivery_street,
            delivery_house: order.delivery_house,
            delivery_apartment: order.delivery_apartment,
            delivery_floor: order.delivery_floor,
            delivery_date: order.delivery_date,
            total_amount: order.total_amount,
            status: order.status,
            is_active: order.is_active,
            version: order.version,
            created_at: order.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemView {
    pub bouquet_id: Uuid,
    pub title: String,
    pub quantity: i32,
    /// Unit price frozen at order time
    #[schema(value_type = String, example = "1000.00")]
    pub price: Decimal,
    #[schema(value_type = String, example = "2000.00")]
    pub line_total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentView {
    #[schema(value_type = String, example = "2000.00")]
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub status: PaymentStatus,
    pub payment_date: Option<DateTime<Utc>>,
}

/// Full order: admin view plus lines, payment and free-text fields
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderDetailsView {
    #[serde(flatten)]
    pub order: OrderAdminView,
    pub delivery_time_from: Option<DateTime<Utc>>,
    pub delivery_time_to: Option<DateTime<Utc>>,
    pub comment: Option<String>,
    pub greeting_card_text: Option<String>,
    pub items: Vec<OrderItemView>,
    pub payment: Option<PaymentView>,
}

impl From<OrderDetails> for OrderDetailsView {
    fn from(details: OrderDetails) -> Self {
        let items = details
            .items
            .iter()
            .map(|line| OrderItemView {
                bouquet_id: line.item.bouquet_id,
                title: line.title().to_string(),
                quantity: line.item.quantity,
                price: line.item.price,
                line_total: line.line_total(),
            })
            .collect();
        let payment = details.payment.map(|p| PaymentView {
            amount: p.amount,
            payment_method: p.payment_method,
            status: p.status,
            payment_date: p.payment_date,
        });
        let delivery_time_from = details.order.delivery_time_from;
        let delivery_time_to = details.order.delivery_time_to;
        let comment = details.order.comment.clone();
        let greeting_card_text = details.order.greeting_card_text.clone();

        Self {
            order: details.order.into(),
            delivery_time_from,
            delivery_time_to,
            comment,
            greeting_card_text,
            items,
            payment,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
    /// Order version the caller last saw. A mismatch is rejected with 409.
    #[serde(default)]
    pub expected_version: Option<i32>,
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/orders",
    summary = "List orders",
    description = "Newest first",
    params(PageQuery),
    responses(
        (status = 200, description = "Orders retrieved", body = ApiResponse<Vec<OrderAdminView>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Vec<OrderAdminView>> {
    let orders = state
        .services
        .orders
        .list_orders(
            Some(page.limit_or(DEFAULT_ORDER_PAGE_SIZE)),
            Some(page.offset()),
        )
        .await?;
    Ok(Json(ApiResponse::success(
        orders.into_iter().map(OrderAdminView::from).collect(),
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/orders/{id}",
    summary = "Get order",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order retrieved", body = ApiResponse<OrderDetailsView>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderDetailsView> {
    let details = state.services.orders.get_order(id).await?;
    Ok(Json(ApiResponse::success(details.into())))
}

#[utoipa::path(
    patch,
    path = "/api/v1/admin/orders/{id}/status",
    summary = "Update order status",
    description = "Moves the order along its lifecycle and notifies the customer and the shop",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<OrderDetailsView>),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order changed concurrently", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> ApiResult<OrderDetailsView> {
    let details = state
        .services
        .orders
        .update_status_at_version(id, request.status, request.expected_version)
        .await?;
    Ok(Json(ApiResponse::success(details.into())))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/orders/{id}",
    summary = "Delete order",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 204, description = "Order deleted"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.orders.delete_order(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/orders/{id}/archive",
    summary = "Archive order",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order archived", body = ApiResponse<OrderAdminView>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "admin"
)]
pub async fn archive_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderAdminView> {
    let order = state.services.orders.archive_order(id).await?;
    Ok(Json(ApiResponse::success(order.into())))
}
