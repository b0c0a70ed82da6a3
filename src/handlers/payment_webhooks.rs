use axum::{extract::State, Json};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::AppState;

/// Body of every webhook acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    #[schema(example = "ok")]
    pub status: String,
}

impl WebhookAck {
    fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

// POST /api/v1/payments/webhook
#[utoipa::path(
    post,
    path = "/api/v1/payments/webhook",
    summary = "Payment provider callback",
    description = "Accepts the provider's ES256 compact JWS (verified against the provider JWKS). Always acknowledged; failures are only logged.",
    request_body(content = String, description = "Raw provider payload"),
    responses((status = 200, description = "Webhook acknowledged", body = WebhookAck)),
    tag = "payments"
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Json<WebhookAck> {
    let outcome = state
        .services
        .orders
        .handle_payment_webhook(&body)
        .await;
    info!(outcome = ?outcome, "payment webhook processed");

    Json(WebhookAck::ok())
}
