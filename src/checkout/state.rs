//! Checkout UI state, derived from the query string the provider redirects
//! back with. Never persisted.

use percent_encoding::percent_decode_str;

use crate::cart::{CartError, CartStorage, CartStore};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CheckoutState {
    #[default]
    Idle,
    Success {
        session_id: Option<String>,
    },
    Failure,
}

impl CheckoutState {
    /// `checkout=success` or any `session_id` means success,
    /// `checkout=failure` means failure, anything else is idle
    pub fn from_query<'a, I>(params: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut checkout = None;
        let mut session_id = None;
        for (key, value) in params {
            match key {
                "checkout" => checkout = Some(value),
                "session_id" => session_id = Some(value.to_string()),
                _ => {}
            }
        }

        if checkout == Some("success") || session_id.is_some() {
            CheckoutState::Success { session_id }
        } else if checkout == Some("failure") {
            CheckoutState::Failure
        } else {
            CheckoutState::Idle
        }
    }

    /// Parse a raw query string such as `?session_id=cs_123`
    pub fn from_query_string(query: &str) -> Self {
        let pairs: Vec<(String, String)> = query
            .trim_start_matches('?')
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode(key), decode(value))
            })
            .collect();
        Self::from_query(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CheckoutState::Success { .. })
    }

    /// Apply the state to a cart: a successful checkout empties it
    pub fn resolve<S: CartStorage>(&self, cart: &mut CartStore<S>) -> Result<(), CartError> {
        if self.is_success() {
            cart.clear_cart()?;
        }
        Ok(())
    }

    /// A failed attempt may be retried; other states are unchanged
    pub fn retry(self) -> Self {
        match self {
            CheckoutState::Failure => CheckoutState::Idle,
            other => other,
        }
    }
}

fn decode(s: &str) -> String {
    let s = s.replace('+', " ");
    percent_decode_str(&s).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{MemoryStorage, Price, Product};

    #[test]
    fn test_from_query() {
        assert_eq!(
            CheckoutState::from_query([("checkout", "success")]),
            CheckoutState::Success { session_id: None }
        );
        assert_eq!(
            CheckoutState::from_query([("session_id", "cs_1")]),
            CheckoutState::Success {
                session_id: Some("cs_1".to_string())
            }
        );
        assert_eq!(
            CheckoutState::from_query([("checkout", "failure")]),
            CheckoutState::Failure
        );
        assert_eq!(
            CheckoutState::from_query([("checkout", "maybe")]),
            CheckoutState::Idle
        );
        assert_eq!(
            CheckoutState::from_query(Vec::<(&str, &str)>::new()),
            CheckoutState::Idle
        );
    }

    #[test]
    fn test_from_query_string() {
        assert_eq!(
            CheckoutState::from_query_string("?session_id=cs%5F42&x=1"),
            CheckoutState::Success {
                session_id: Some("cs_42".to_string())
            }
        );
        assert_eq!(
            CheckoutState::from_query_string("checkout=failure"),
            CheckoutState::Failure
        );
        assert_eq!(CheckoutState::from_query_string(""), CheckoutState::Idle);
    }

    #[test]
    fn test_retry() {
        assert_eq!(CheckoutState::Failure.retry(), CheckoutState::Idle);
        let success = CheckoutState::Success { session_id: None };
        assert_eq!(success.clone().retry(), success);
    }

    #[test]
    fn test_resolve_success_clears_cart() {
        let product = Product {
            id: "prod_a".to_string(),
            name: "A".to_string(),
            description: None,
            images: Vec::new(),
            metadata: Default::default(),
            prices: vec![Price {
                id: "price_a".to_string(),
                active: true,
                currency: "usd".to_string(),
                unit_amount: 500,
                nickname: None,
            }],
        };
        let mut cart = CartStore::new(MemoryStorage::new());
        cart.add_to_cart(&product, "price_a", 1).unwrap();

        CheckoutState::Failure.resolve(&mut cart).unwrap();
        assert_eq!(cart.total_count(), 1);

        CheckoutState::from_query_string("session_id=cs_1")
            .resolve(&mut cart)
            .unwrap();
        assert!(cart.is_empty());
    }
}
