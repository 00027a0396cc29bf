//! Hosted checkout bridge
//!
//! Turns cart line items into a checkout session request, hands it to a
//! [`PaymentProvider`] and returns the URL to redirect the buyer to. The
//! bridge never touches the cart; clearing it after a successful payment
//! is the job of [`CheckoutState::resolve`].

mod state;
mod stripe;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::cart::{CartStorage, CartStore, CheckoutLineItem};
use crate::config::CheckoutConfig;

pub use state::CheckoutState;
pub use stripe::StripeProvider;

/// Errors raised by a payments provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with an error status
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The response body could not be understood
    #[error("Parse error: {0}")]
    Parse(String),

    /// No secret key in the configured environment variable
    #[error("missing secret key: set {0}")]
    MissingSecret(String),

    /// A session came back without a redirect URL
    #[error("checkout session {0} has no redirect URL")]
    MissingUrl(String),
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("no items in cart")]
    EmptyCart,

    #[error("checkout failed: {0}")]
    Provider(#[from] ProviderError),
}

impl CheckoutError {
    /// Whether trying again with the same cart may succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, CheckoutError::EmptyCart)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutMode {
    Payment,
}

/// Everything the provider needs to open a hosted checkout page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRequest {
    pub mode: CheckoutMode,
    pub line_items: Vec<CheckoutLineItem>,
    pub success_url: String,
    pub cancel_url: String,
    pub automatic_tax: bool,
    /// Countries shipping addresses may be collected for
    pub allowed_countries: Vec<String>,
}

/// A session as reported by the provider
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    /// Total charged, in minor units
    #[serde(default)]
    pub amount_total: Option<u64>,
    #[serde(default)]
    pub currency: Option<String>,
    /// Only present when the session was retrieved with line items expanded
    #[serde(default)]
    pub line_items: Option<SessionLineItems>,
}

impl CheckoutSession {
    /// Purchased lines, empty unless they were expanded
    pub fn items(&self) -> &[SessionLineItem] {
        self.line_items
            .as_ref()
            .map(|list| list.data.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SessionLineItems {
    #[serde(default)]
    pub data: Vec<SessionLineItem>,
}

/// One purchased line of a completed session
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionLineItem {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub amount_total: u64,
    #[serde(default)]
    pub currency: String,
}

/// Where to send the buyer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutRedirect {
    pub session_id: String,
    pub url: String,
}

/// A hosted-checkout payments provider
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &SessionRequest,
    ) -> Result<CheckoutSession, ProviderError>;

    /// Look up a session by id, with its line items
    async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, ProviderError>;
}

/// Builds session requests and asks the provider for a redirect URL
#[derive(Clone)]
pub struct CheckoutBridge {
    provider: Arc<dyn PaymentProvider>,
    base_url: String,
    config: CheckoutConfig,
}

impl CheckoutBridge {
    /// `base_url` is the public site address the provider redirects back to
    pub fn new(provider: Arc<dyn PaymentProvider>, base_url: &str, config: CheckoutConfig) -> Self {
        Self {
            provider,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
        }
    }

    /// The request sent for `line_items`, zero quantities dropped
    pub fn session_request(&self, line_items: Vec<CheckoutLineItem>) -> SessionRequest {
        SessionRequest {
            mode: CheckoutMode::Payment,
            line_items: line_items.into_iter().filter(|i| i.quantity > 0).collect(),
            success_url: format!("{}{}", self.base_url, self.config.success_path),
            cancel_url: format!("{}{}", self.base_url, self.config.cancel_path),
            automatic_tax: self.config.automatic_tax,
            allowed_countries: self.config.allowed_countries.clone(),
        }
    }

    /// Create a hosted checkout session. An empty list is rejected before
    /// the provider is contacted.
    pub async fn create_session(
        &self,
        line_items: Vec<CheckoutLineItem>,
    ) -> Result<CheckoutRedirect, CheckoutError> {
        let request = self.session_request(line_items);
        if request.line_items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let session = match self.provider.create_checkout_session(&request).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("Error creating checkout session: {}", e);
                return Err(e.into());
            }
        };

        match session.url {
            Some(url) if !url.is_empty() => {
                tracing::info!("Created checkout session {}", session.id);
                Ok(CheckoutRedirect {
                    session_id: session.id,
                    url,
                })
            }
            _ => {
                tracing::error!("Checkout session {} came back without a URL", session.id);
                Err(ProviderError::MissingUrl(session.id).into())
            }
        }
    }

    /// Check out everything in `cart`
    pub async fn checkout_cart<S: CartStorage>(
        &self,
        cart: &CartStore<S>,
    ) -> Result<CheckoutRedirect, CheckoutError> {
        self.create_session(cart.cart_items()).await
    }

    /// Fetch a finished session so the buyer can see what was bought
    pub async fn retrieve_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, CheckoutError> {
        match self.provider.retrieve_checkout_session(session_id).await {
            Ok(session) => Ok(session),
            Err(e) => {
                tracing::error!("Error retrieving checkout session {}: {}", session_id, e);
                Err(e.into())
            }
        }
    }

    /// Buy one price directly, bypassing the cart
    pub async fn single_product_checkout(
        &self,
        price_id: &str,
        quantity: u32,
    ) -> Result<CheckoutRedirect, CheckoutError> {
        self.create_session(vec![CheckoutLineItem::new(price_id, quantity)])
            .await
    }
}
