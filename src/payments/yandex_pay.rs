use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{BillingContact, PaymentGateway};
use crate::config::PaymentConfig;
use crate::errors::ServiceError;
use crate::models::{cart::cart_total, CartLine};

const ORDERS_PATH: &str = "/api/merchant/v1/orders";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateOrderPayload<'a> {
    currency_code: &'a str,
    order_id: String,
    cart: Cart,
    available_payment_methods: [&'static str; 1],
    billing_phone: &'a str,
    fiscal_contact: &'a str,
    redirect_urls: RedirectUrls<'a>,
}

#[derive(Debug, Serialize)]
struct Cart {
    items: Vec<CartItem>,
    total: CartTotal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CartItem {
    product_id: String,
    quantity: CartItemQuantity,
    title: String,
    total: String,
    description: String,
}

#[derive(Debug, Serialize)]
struct CartItemQuantity {
    count: String,
    available: String,
}

#[derive(Debug, Serialize)]
struct CartTotal {
    amount: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RedirectUrls<'a> {
    on_error: &'a str,
    on_success: &'a str,
    on_abort: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateOrderResponse {
    data: Option<CreateOrderData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateOrderData {
    payment_url: Option<String>,
}

/// Two decimal places, as the provider expects for amounts
fn money(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

fn build_cart(lines: &[CartLine]) -> Cart {
    Cart {
        items: lines
            .iter()
            .map(|line| CartItem {
                product_id: line.bouquet_id.to_string(),
                quantity: CartItemQuantity {
                    count: line.quantity.to_string(),
                    available: line.available.to_string(),
                },
                title: line.title.clone(),
                total: money(line.line_total()),
                description: line.description.clone().unwrap_or_default(),
            })
            .collect(),
        total: CartTotal {
            amount: money(cart_total(lines)),
        },
    }
}

/// Yandex Pay merchant API client
#[derive(Clone)]
pub struct YandexPayClient {
    client: reqwest::Client,
    config: PaymentConfig,
}

impl YandexPayClient {
    pub fn new(config: PaymentConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn orders_url(&self) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), ORDERS_PATH)
    }
}

#[async_trait]
impl PaymentGateway for YandexPayClient {
    /// Immediate retries, each with a fresh request id and the attempt number
    #[instrument(skip(self, lines, contact), fields(order_id = %order_id))]
    async fn create_payment_session(
        &self,
        order_id: Uuid,
        lines: &[CartLine],
        contact: &BillingContact,
    ) -> Result<String, ServiceError> {
        let payload = CreateOrderPayload {
            currency_code: &self.config.currency_code,
            order_id: order_id.to_string(),
            cart: build_cart(lines),
            available_payment_methods: ["CARD"],
            billing_phone: &contact.phone,
            fiscal_contact: &contact.email,
            redirect_urls: RedirectUrls {
                on_error: &self.config.on_error_url,
                on_success: &self.config.on_success_url,
                on_abort: &self.config.on_abort_url,
            },
        };
        let url = self.orders_url();
        let timeout_ms = (self.config.request_timeout_secs * 1000).to_string();

        for attempt in 0..self.config.max_retries {
            info!(attempt, "requesting payment session");

            let response = self
                .client
                .post(&url)
                .header("X-Request-ID", Uuid::new_v4().to_string())
                .header("X-Request-Timeout", &timeout_ms)
                .header("X-Request-Attempt", attempt.to_string())
                .header("Authorization", format!("Api-Key {}", self.config.api_key))
                .json(&payload)
                .send()
                .await;

            match response {
                Ok(response) if response.status().is_success() => {
                    match response.json::<CreateOrderResponse>().await {
                        Ok(CreateOrderResponse {
                            data:
                                Some(CreateOrderData {
                                    payment_url: Some(payment_url),
                                }),
                        }) => {
                            info!(attempt, "payment session created");
                            return Ok(payment_url);
                        }
                        Ok(_) => warn!(
                            attempt,
                            max_retries = self.config.max_retries,
                            "payment provider response has no paymentUrl"
                        ),
                        Err(e) => warn!(
                            attempt,
                            max_retries = self.config.max_retries,
                            error = %e,
                            "payment provider response could not be decoded"
                        ),
                    }
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    warn!(
                        attempt,
                        max_retries = self.config.max_retries,
                        status = status.as_u16(),
                        body = %body,
                        "payment provider rejected session request"
                    );
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max_retries = self.config.max_retries,
                        error = %e,
                        "payment provider request failed"
                    );
                }
            }
        }

        error!(
            "Payment session request failed after {} attempts",
            self.config.max_retries
        );
        Err(ServiceError::ExternalServiceError(format!(
            "payment session for order {} could not be created after {} attempts",
            order_id, self.config.max_retries
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn line() -> CartLine {
        CartLine {
            bouquet_id: Uuid::nil(),
            title: "Peonies".into(),
            description: Some("Fifteen pink peonies".into()),
            quantity: 2,
            available: 5,
            unit_price: dec!(1000),
        }
    }

    fn contact() -> BillingContact {
        BillingContact {
            phone: "+79990000000".into(),
            email: "buyer@example.com".into(),
        }
    }

    fn client(server: &MockServer) -> YandexPayClient {
        YandexPayClient::new(PaymentConfig {
            api_url: server.uri(),
            api_key: "merchant-key".into(),
            request_timeout_secs: 2,
            ..PaymentConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn cart_amounts_are_fixed_point_strings() {
        let cart = serde_json::to_value(build_cart(&[line()])).unwrap();
        assert_eq!(
            cart,
            json!({
                "items": [{
                    "productId": Uuid::nil().to_string(),
                    "quantity": {"count": "2", "available": "5"},
                    "title": "Peonies",
                    "total": "2000.00",
                    "description": "Fifteen pink peonies"
                }],
                "total": {"amount": "2000.00"}
            })
        );
    }

    #[tokio::test]
    async fn returns_payment_url_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ORDERS_PATH))
            .and(header("Authorization", "Api-Key merchant-key"))
            .and(header("X-Request-Attempt", "0"))
            .and(header_exists("X-Request-ID"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": {"paymentUrl": "https://pay.example/abc"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let url = client(&server)
            .create_payment_session(Uuid::new_v4(), &[line()], &contact())
            .await
            .unwrap();
        assert_eq!(url, "https://pay.example/abc");
    }

    #[tokio::test]
    async fn retries_until_budget_is_spent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ORDERS_PATH))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let result = client(&server)
            .create_payment_session(Uuid::new_v4(), &[line()], &contact())
            .await;
        assert!(matches!(result, Err(ServiceError::ExternalServiceError(_))));
    }

    #[tokio::test]
    async fn success_without_url_counts_as_failed_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ORDERS_PATH))
            .and(header("X-Request-Attempt", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(ORDERS_PATH))
            .and(header("X-Request-Attempt", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"paymentUrl": "https://pay.example/second"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let url = client(&server)
            .create_payment_session(Uuid::new_v4(), &[line()], &contact())
            .await
            .unwrap();
        assert_eq!(url, "https://pay.example/second");
    }
}
