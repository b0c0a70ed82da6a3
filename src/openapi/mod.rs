use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Flower Shop API",
        version = "1.0.0",
        description = r#"
# Flower Shop API

Order placement with hosted card payments, payment provider callbacks and
the admin panel backend.

## Authentication

Public endpoints (placing orders, the catalog, the payment webhook) need no
credentials. Admin endpoints expect an HS256 JWT:

```
Authorization: Bearer <your-jwt-token>
```

## Errors

Failures share one body shape:

```json
{
  "error": "Not Found",
  "message": "Not found: Order with ID ... not found",
  "request_id": "req-abc123xyz",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "orders", description = "Order placement"),
        (name = "catalog", description = "Bouquet catalog"),
        (name = "customers", description = "Customer checks"),
        (name = "payments", description = "Payment provider callbacks"),
        (name = "admin", description = "Admin panel endpoints"),
        (name = "health", description = "Liveness"),
    ),
    paths(
        crate::handlers::orders::create_order,
        crate::handlers::catalog::list_bouquets,
        crate::handlers::catalog::get_bouquet,
        crate::handlers::catalog::popular_bouquets,
        crate::handlers::catalog::search_bouquets,
        crate::handlers::catalog::list_bouquet_types,
        crate::handlers::catalog::list_flowers,
        crate::handlers::customers::is_blocked,
        crate::handlers::payment_webhooks::payment_webhook,
        crate::handlers::admin_orders::list_orders,
        crate::handlers::admin_orders::get_order,
        crate::handlers::admin_orders::update_order_status,
        crate::handlers::admin_orders::delete_order,
        crate::handlers::admin_orders::archive_order,
        crate::handlers::customers::list_customers,
        crate::handlers::customers::block_customer,
        crate::handlers::customers::unblock_customer,
        crate::handlers::catalog::create_bouquet,
        crate::handlers::catalog::update_stock,
        crate::handlers::catalog::update_bouquet,
        crate::handlers::catalog::archive_bouquet,
        crate::handlers::catalog::delete_bouquet,
        crate::handlers::catalog::create_bouquet_type,
        crate::handlers::catalog::create_flower_type,
        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            crate::entities::OrderStatus,
            crate::entities::PaymentStatus,
            crate::entities::PaymentMethod,
            crate::entities::DeliveryMethod,
            crate::handlers::orders::CreateOrderRequest,
            crate::handlers::orders::OrderItemRequest,
            crate::handlers::orders::OrderCreatedResponse,
            crate::handlers::admin_orders::OrderAdminView,
            crate::handlers::admin_orders::OrderDetailsView,
            crate::handlers::admin_orders::UpdateOrderStatusRequest,
            crate::handlers::catalog::UpdateStockRequest,
            crate::handlers::customers::BlockCustomerRequest,
            crate::handlers::payment_webhooks::WebhookAck,
            crate::services::CreateBouquet,
            crate::services::UpdateBouquet,
            crate::services::BouquetDetail,
            crate::services::CreateCatalogType,
            crate::entities::bouquet::Model,
            crate::entities::bouquet_type::Model,
            crate::entities::flower_type::Model,
            crate::repositories::FlowerTypeRow,
            crate::services::CustomerSummary,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

/// Registers the `Bearer` scheme referenced by the admin paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_lists_public_and_admin_paths() {
        let json = serde_json::to_string(&ApiDocV1::openapi()).unwrap();
        assert!(json.contains("Flower Shop API"));
        assert!(json.contains("/api/v1/orders"));
        assert!(json.contains("/api/v1/payments/webhook"));
        assert!(json.contains("/api/v1/admin/orders/{id}/status"));
        assert!(json.contains("\"Bearer\""));
    }
}
