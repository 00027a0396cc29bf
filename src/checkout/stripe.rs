//! Stripe Checkout Sessions over plain HTTP
//!
//! - Endpoints: `POST {api_base}/checkout/sessions` and
//!   `GET {api_base}/checkout/sessions/{id}?expand[]=line_items`
//! - Authentication: secret key as a bearer token
//! - Body: form-encoded, nested keys in bracket notation

use async_trait::async_trait;
use serde::Deserialize;

use super::{CheckoutSession, PaymentProvider, ProviderError, SessionRequest};
use crate::config::CheckoutConfig;

/// Stripe-backed [`PaymentProvider`]
#[derive(Clone)]
pub struct StripeProvider {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

impl StripeProvider {
    pub fn new(api_base: &str, secret_key: &str) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("folio-rs/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        })
    }

    /// Build from config, reading the secret from the configured
    /// environment variable
    pub fn from_env(config: &CheckoutConfig) -> Result<Self, ProviderError> {
        let secret = std::env::var(&config.secret_key_env)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ProviderError::MissingSecret(config.secret_key_env.clone()))?;
        Self::new(&config.api_base, &secret)
    }
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    async fn create_checkout_session(
        &self,
        request: &SessionRequest,
    ) -> Result<CheckoutSession, ProviderError> {
        let url = format!("{}/checkout/sessions", self.api_base);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&form_params(request))
            .send()
            .await?;
        parse_session(response).await
    }

    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, ProviderError> {
        let url = format!("{}/checkout/sessions/{}", self.api_base, session_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .query(&[("expand[]", "line_items")])
            .send()
            .await?;
        parse_session(response).await
    }
}

async fn parse_session(response: reqwest::Response) -> Result<CheckoutSession, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<CheckoutSession>()
            .await
            .map_err(|e| ProviderError::Parse(format!("Failed to parse session: {e}")));
    }

    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Api {
        status: status.as_u16(),
        message: error_message(body),
    })
}

/// The `error.message` of a Stripe error body, else the raw body
fn error_message(body: String) -> String {
    serde_json::from_str::<StripeErrorBody>(&body)
        .ok()
        .and_then(|b| b.error.message)
        .unwrap_or(body)
}

/// Flatten a session request into Stripe's bracketed form fields
fn form_params(request: &SessionRequest) -> Vec<(String, String)> {
    let mut params = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];

    for (i, item) in request.line_items.iter().enumerate() {
        params.push((format!("line_items[{i}][price]"), item.price.clone()));
        params.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
    }

    params.push((
        "automatic_tax[enabled]".to_string(),
        request.automatic_tax.to_string(),
    ));

    for (i, country) in request.allowed_countries.iter().enumerate() {
        params.push((
            format!("shipping_address_collection[allowed_countries][{i}]"),
            country.clone(),
        ));
    }

    params
}
