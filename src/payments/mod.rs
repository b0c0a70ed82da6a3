//! Hosted payment provider boundary: outbound session creation and inbound webhook decoding

pub mod webhook;
pub mod yandex_pay;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::CartLine;

pub use webhook::{
    decode_payload, JwksCache, ProviderPaymentStatus, WebhookError, WebhookOrder, WebhookPayload,
    WebhookVerifier, ORDER_STATUS_UPDATED,
};
pub use yandex_pay::YandexPayClient;

/// Buyer contact forwarded to the provider for billing and fiscal receipts
#[derive(Debug, Clone)]
pub struct BillingContact {
    pub phone: String,
    pub email: String,
}

/// Opens hosted payment sessions
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Returns the URL the customer is redirected to for payment.
    ///
    /// Fails with `ExternalServiceError` once every attempt has failed.
    async fn create_payment_session(
        &self,
        order_id: Uuid,
        lines: &[CartLine],
        contact: &BillingContact,
    ) -> Result<String, ServiceError>;
}
