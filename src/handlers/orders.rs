use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{DeliveryMethod, OrderStatus, PaymentMethod};
use crate::errors::ServiceError;
use crate::repositories::NewOrder;
use crate::services::{CartRequestLine, OrderCreated, PlaceOrder};
use crate::AppState;

lazy_static! {
    static ref PHONE_RE: Regex = Regex::new(r"^\+?[0-9][0-9 ()\-]{5,18}[0-9]$").expect("valid phone regex");
}

/// A requested bouquet and how many of it. Prices always come from the catalog.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct OrderItemRequest {
    pub bouquet_id: Uuid,
    #[schema(example = 1)]
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 255))]
    pub customer_name: String,
    #[validate(regex(path = "PHONE_RE", message = "Invalid phone number"))]
    #[schema(example = "+79990000000")]
    pub customer_phone: String,
    #[validate(email)]
    pub customer_email: String,
    #[validate(length(min = 1, max = 255))]
    pub recipient_name: String,
    #[validate(regex(path = "PHONE_RE", message = "Invalid phone number"))]
    pub recipient_phone: String,
    pub delivery_method: DeliveryMethod,
    #[validate(length(max = 255))]
    pub delivery_city: Option<String>,
    #[validate(length(max = 255))]
    pub delivery_street: Option<String>,
    #[validate(length(max = 32))]
    pub delivery_house: Option<String>,
    #[validate(length(max = 32))]
    pub delivery_apartment: Option<String>,
    #[validate(length(max = 32))]
    pub delivery_floor: Option<String>,
    pub delivery_date: Option<DateTime<Utc>>,
    pub delivery_time_from: Option<DateTime<Utc>>,
    pub delivery_time_to: Option<DateTime<Utc>>,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
    #[validate(length(max = 500))]
    pub greeting_card_text: Option<String>,
    #[serde(default = "default_payment_method")]
    pub payment_method: PaymentMethod,
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub items: Vec<OrderItemRequest>,
}

fn default_payment_method() -> PaymentMethod {
    PaymentMethod::Card
}

impl From<CreateOrderRequest> for PlaceOrder {
    fn from(request: CreateOrderRequest) -> Self {
        let trimmed = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        PlaceOrder {
            lines: request
                .items
                .iter()
                .map(|item| CartRequestLine {
                    bouquet_id: item.bouquet_id,
                    quantity: item.quantity,
                })
                .collect(),
            order: NewOrder {
                customer_name: request.customer_name.trim().to_string(),
                customer_phone: request.customer_phone.trim().to_string(),
                customer_email: request.customer_email.trim().to_lowercase(),
                recipient_name: request.recipient_name.trim().to_string(),
                recipient_phone: request.recipient_phone.trim().to_string(),
                delivery_method: request.delivery_method,
                delivery_city: trimmed(request.delivery_city),
                delivery_street: trimmed(request.delivery_street),
                delivery_house: trimmed(request.delivery_house),
                delivery_apartment: trimmed(request.delivery_apartment),
                delivery_floor: trimmed(request.delivery_floor),
                delivery_date: request.delivery_date,
                delivery_time_from: request.delivery_time_from,
                delivery_time_to: request.delivery_time_to,
                comment: trimmed(request.comment),
                greeting_card_text: trimmed(request.greeting_card_text),
                payment_method: request.payment_method,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct OrderCreatedResponse {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    #[schema(value_type = String, example = "2000.00")]
    pub total_amount: Decimal,
    pub status: OrderStatus,
    /// Hosted payment page the customer is sent to
    pub payment_url: String,
}

impl From<OrderCreated> for OrderCreatedResponse {
    fn from(created: OrderCreated) -> Self {
        let order = created.order;
        Self {
            id: order.id,
            customer_name: order.customer_name,
            customer_phone: order.customer_phone,
            customer_email: order.customer_email,
            total_amount: order.total_amount,
            status: order.status,
            payment_url: created.payment_url,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/orders",
    summary = "Place order",
    description = "Prices the cart from the catalog, stores the order and opens a hosted payment session",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created, customer should be redirected to payment_url", body = OrderCreatedResponse,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 403, description = "Customer is blocked", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown bouquet", body = crate::errors::ErrorResponse),
        (status = 422, description = "Not enough stock", body = crate::errors::ErrorResponse),
        (status = 503, description = "Payment session could not be opened", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), ServiceError> {
    request.validate()?;

    let created = state
        .services
        .orders
        .place_order(PlaceOrder::from(request))
        .await?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> CreateOrderRequest {
        serde_json::from_value(json!({
            "customer_name": " Anna ",
            "customer_phone": "+7 (999) 000-00-00",
            "customer_email": "Anna@Example.com",
            "recipient_name": "Maria",
            "recipient_phone": "+79991111111",
            "delivery_method": "delivery",
            "delivery_city": "Moscow",
            "delivery_street": "Tverskaya",
            "delivery_house": "1",
            "delivery_apartment": "",
            "items": [{"bouquet_id": Uuid::nil(), "quantity": 2}]
        }))
        .unwrap()
    }

    #[test]
    fn valid_request_passes_and_defaults_to_card() {
        let request = request();
        assert!(request.validate().is_ok());
        assert_eq!(request.payment_method, PaymentMethod::Card);
    }

    #[test]
    fn bad_contact_fields_are_reported() {
        let mut request = request();
        request.customer_phone = "call me".into();
        request.customer_email = "not-an-email".into();
        request.items.clear();
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("customer_phone"));
        assert!(fields.contains_key("customer_email"));
        assert!(fields.contains_key("items"));
    }

    #[test]
    fn conversion_normalises_input() {
        let place = PlaceOrder::from(request());
        assert_eq!(place.order.customer_name, "Anna");
        assert_eq!(place.order.customer_email, "anna@example.com");
        assert_eq!(place.order.delivery_apartment, None);
        assert_eq!(
            place.lines,
            vec![CartRequestLine {
                bouquet_id: Uuid::nil(),
                quantity: 2
            }]
        );
    }
}
