use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::{
    errors::ErrorKind,
    jwk::{Jwk, JwkSet},
    Algorithm, DecodingKey, Validation,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::PaymentConfig;
use crate::errors::ServiceError;

/// Event type carrying a payment status change
pub const ORDER_STATUS_UPDATED: &str = "ORDER_STATUS_UPDATED";

/// Provider endpoint publishing the webhook signing keys
pub const JWKS_PATH: &str = "/api/jwks";

/// Unknown key ids trigger a refetch at most this often
const MIN_JWKS_REFRESH: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("JWS header carries no key id")]
    MissingKeyId,
    #[error("no provider signing key with id {0}")]
    UnknownKey(String),
    #[error("unsupported signing algorithm {0}")]
    UnsupportedAlgorithm(String),
    #[error("signature mismatch")]
    InvalidSignature,
    #[error("provider signing keys unavailable")]
    KeysUnavailable,
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Payment status reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ProviderPaymentStatus {
    Captured,
    Failed,
    Voided,
    Refunded,
    Unrecognized(String),
}

impl From<String> for ProviderPaymentStatus {
    fn from(token: String) -> Self {
        match token.trim() {
            "CAPTURED" => ProviderPaymentStatus::Captured,
            "FAILED" => ProviderPaymentStatus::Failed,
            "VOIDED" => ProviderPaymentStatus::Voided,
            "REFUNDED" => ProviderPaymentStatus::Refunded,
            _ => ProviderPaymentStatus::Unrecognized(token),
        }
    }
}

impl From<&str> for ProviderPaymentStatus {
    fn from(token: &str) -> Self {
        ProviderPaymentStatus::from(token.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookOrder {
    pub order_id: String,
    pub payment_status: ProviderPaymentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub event: String,
    #[serde(default)]
    pub event_time: Option<String>,
    #[serde(default)]
    pub order: Option<WebhookOrder>,
}

impl WebhookPayload {
    pub fn is_status_update(&self) -> bool {
        self.event == ORDER_STATUS_UPDATED
    }
}

fn body_text(body: &[u8]) -> Result<&str, WebhookError> {
    std::str::from_utf8(body)
        .map(str::trim)
        .map_err(|e| WebhookError::Malformed(format!("body is not utf-8: {}", e)))
}

/// Best-effort decoding of a body that is either plain JSON or a compact JWS
/// (`header.payload.signature`) whose payload segment is the JSON document.
/// The signature is not looked at.
pub fn decode_payload(body: &[u8]) -> Result<WebhookPayload, WebhookError> {
    let text = body_text(body)?;

    if text.starts_with('{') {
        return serde_json::from_str(text).map_err(|e| WebhookError::Malformed(e.to_string()));
    }

    let mut segments = text.split('.');
    let payload_segment = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => {
            return Err(WebhookError::Malformed(
                "expected JSON or a compact JWS".to_string(),
            ))
        }
    };

    let json = URL_SAFE_NO_PAD
        .decode(payload_segment.trim_end_matches('='))
        .map_err(|e| WebhookError::Malformed(format!("invalid base64url payload: {}", e)))?;

    serde_json::from_slice(&json).map_err(|e| WebhookError::Malformed(e.to_string()))
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

/// Provider signing keys fetched from `{api_url}/api/jwks`, reused for `jwks_cache_ttl_secs`
pub struct JwksCache {
    client: reqwest::Client,
    url: String,
    ttl: Duration,
    attempts: u32,
    cached: RwLock<Option<CachedKeys>>,
}

impl JwksCache {
    pub fn new(config: &PaymentConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: format!("{}{}", config.api_url.trim_end_matches('/'), JWKS_PATH),
            ttl: Duration::from_secs(config.jwks_cache_ttl_secs),
            attempts: config.max_retries.max(1),
            cached: RwLock::new(None),
        })
    }

    /// Key with id `kid`. A miss refetches the set unless it was fetched very recently.
    pub async fn key(&self, kid: &str) -> Result<Jwk, WebhookError> {
        {
            let cached = self.cached.read().await;
            if let Some(cached) = cached.as_ref() {
                let age = cached.fetched_at.elapsed();
                if age < self.ttl {
                    if let Some(jwk) = cached.keys.find(kid) {
                        return Ok(jwk.clone());
                    }
                    if age < MIN_JWKS_REFRESH {
                        return Err(WebhookError::UnknownKey(kid.to_string()));
                    }
                }
            }
        }

        let keys = self.fetch().await?;
        let found = keys.find(kid).cloned();
        *self.cached.write().await = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });
        found.ok_or_else(|| WebhookError::UnknownKey(kid.to_string()))
    }

    async fn fetch(&self) -> Result<JwkSet, WebhookError> {
        for attempt in 0..self.attempts {
            match self.client.get(&self.url).send().await {
                Ok(response) if response.status().is_success() => {
                    match response.json::<JwkSet>().await {
                        Ok(keys) => {
                            debug!(keys = keys.keys.len(), "fetched provider signing keys");
                            return Ok(keys);
                        }
                        Err(e) => warn!(attempt, error = %e, "provider JWKS could not be decoded"),
                    }
                }
                Ok(response) => warn!(
                    attempt,
                    status = response.status().as_u16(),
                    "provider JWKS request rejected"
                ),
                Err(e) => warn!(attempt, error = %e, "provider JWKS request failed"),
            }
        }
        Err(WebhookError::KeysUnavailable)
    }
}

/// Authenticates and decodes provider callbacks.
///
/// With verification on, the body must be an ES256 compact JWS signed by a key
/// from the provider JWKS. With it off, decoding falls back to [`decode_payload`].
#[derive(Clone)]
pub struct WebhookVerifier {
    keys: Option<Arc<JwksCache>>,
}

impl WebhookVerifier {
    pub fn from_config(config: &PaymentConfig) -> Result<Self, ServiceError> {
        if !config.verify_webhook_signature {
            return Ok(Self::unverified());
        }
        Ok(Self {
            keys: Some(Arc::new(JwksCache::new(config)?)),
        })
    }

    pub fn unverified() -> Self {
        Self { keys: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.keys.is_some()
    }

    pub async fn decode(&self, body: &[u8]) -> Result<WebhookPayload, WebhookError> {
        match &self.keys {
            Some(keys) => verify_jws(keys, body).await,
            None => decode_payload(body),
        }
    }
}

async fn verify_jws(keys: &JwksCache, body: &[u8]) -> Result<WebhookPayload, WebhookError> {
    let token = body_text(body)?;
    let header = jsonwebtoken::decode_header(token)
        .map_err(|e| WebhookError::Malformed(format!("not a compact JWS: {}", e)))?;
    if header.alg != Algorithm::ES256 {
        return Err(WebhookError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
    }
    let kid = header.kid.ok_or(WebhookError::MissingKeyId)?;

    let jwk = keys.key(&kid).await?;
    let key = DecodingKey::from_jwk(&jwk)
        .map_err(|e| WebhookError::Malformed(format!("unusable signing key {}: {}", kid, e)))?;

    let mut validation = Validation::new(Algorithm::ES256);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<WebhookPayload>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => WebhookError::InvalidSignature,
            _ => WebhookError::Malformed(e.to_string()),
        })
}
