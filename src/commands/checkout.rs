//! Check out the persisted cart, or apply the provider's return URL

use anyhow::Result;
use std::sync::Arc;

use crate::cart::{currency, CartStorage, CartStore};
use crate::checkout::{
    CheckoutBridge, CheckoutError, CheckoutRedirect, CheckoutState, PaymentProvider,
    StripeProvider,
};
use crate::commands::cart;
use crate::Folio;

/// Create a hosted checkout session for the persisted cart and print its
/// URL. With `return_query`, resolve the query string the provider
/// redirected back with instead.
pub async fn run(folio: &Folio, return_query: Option<&str>) -> Result<()> {
    let mut store = cart::open(folio);

    if let Some(query) = return_query {
        let state = resolve_return(&mut store, query)?;
        match state {
            CheckoutState::Success { session_id } => {
                println!("Payment successful. Cart cleared.");
                if let Some(id) = session_id {
                    println!("Session: {}", id);
                    print_purchase(folio, &id).await;
                }
            }
            CheckoutState::Failure => {
                println!("Checkout failed. Your items are still in your cart; try again.");
            }
            CheckoutState::Idle => {
                println!("Your checkout was cancelled. Don't worry, your items are still in your cart.");
            }
        }
        return Ok(());
    }

    if store.is_empty() {
        return Err(CheckoutError::EmptyCart.into());
    }

    let provider = StripeProvider::from_env(&folio.config.checkout)?;
    let redirect = create_session(folio, Arc::new(provider), &store).await?;
    println!("{}", redirect.url);
    Ok(())
}

async fn print_purchase(folio: &Folio, session_id: &str) {
    let provider = match StripeProvider::from_env(&folio.config.checkout) {
        Ok(provider) => provider,
        Err(e) => {
            tracing::debug!("Order details unavailable: {}", e);
            return;
        }
    };
    match purchase_summary(folio, Arc::new(provider), session_id).await {
        Ok(lines) => lines.iter().for_each(|line| println!("{}", line)),
        Err(e) => tracing::warn!("Could not load order details: {}", e),
    }
}

fn bridge(folio: &Folio, provider: Arc<dyn PaymentProvider>) -> CheckoutBridge {
    CheckoutBridge::new(
        provider,
        &folio.config.checkout_base_url(),
        folio.config.checkout.clone(),
    )
}

/// Ask `provider` for a session covering everything in `store`
pub async fn create_session<S: CartStorage>(
    folio: &Folio,
    provider: Arc<dyn PaymentProvider>,
    store: &CartStore<S>,
) -> Result<CheckoutRedirect> {
    Ok(bridge(folio, provider).checkout_cart(store).await?)
}

/// What a finished session bought, one line per item plus the total
pub async fn purchase_summary(
    folio: &Folio,
    provider: Arc<dyn PaymentProvider>,
    session_id: &str,
) -> Result<Vec<String>> {
    let session = bridge(folio, provider).retrieve_session(session_id).await?;

    let mut lines = vec![format!(
        "Order {} ({})",
        session.id,
        session.payment_status.as_deref().unwrap_or("unknown")
    )];
    for item in session.items() {
        lines.push(format!(
            "  {} x {} = {}",
            item.quantity,
            item.description.as_deref().unwrap_or("item"),
            currency::format_price(item.amount_total, &item.currency)
        ));
    }
    if let (Some(total), Some(code)) = (session.amount_total, session.currency.as_deref()) {
        lines.push(format!("Total: {}", currency::format_price(total, code)));
    }
    Ok(lines)
}

/// Apply a return query string to the cart
pub fn resolve_return<S: CartStorage>(
    store: &mut CartStore<S>,
    query: &str,
) -> Result<CheckoutState> {
    let state = CheckoutState::from_query_string(query);
    state.resolve(store)?;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{MemoryStorage, Price, Product};
    use crate::checkout::tests::FakeProvider;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    fn product() -> Product {
        Product {
            id: "prod_book".to_string(),
            name: "Book".to_string(),
            description: None,
            images: Vec::new(),
            metadata: Default::default(),
            prices: vec![Price {
                id: "price_book".to_string(),
                active: true,
                currency: "usd".to_string(),
                unit_amount: 2000,
                nickname: None,
            }],
        }
    }

    #[tokio::test]
    async fn test_checkout_uses_site_url() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("_config.yml"), "url: https://folio.example/\n").unwrap();
        let folio = Folio::new(tmp.path()).unwrap();

        let mut store = CartStore::new(MemoryStorage::new());
        store.add_to_cart(&product(), "price_book", 3).unwrap();

        let provider = Arc::new(FakeProvider::ok());
        let redirect = create_session(&folio, provider.clone(), &store).await.unwrap();
        assert!(redirect.url.starts_with("https://checkout.example.com/"));

        let request = provider.last.lock().unwrap().clone().unwrap();
        assert_eq!(request.cancel_url, "https://folio.example/checkout/cancelled");
        assert_eq!(request.line_items[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let tmp = TempDir::new().unwrap();
        let folio = Folio::new(tmp.path()).unwrap();
        let store = CartStore::new(MemoryStorage::new());

        let provider = Arc::new(FakeProvider::ok());
        let err = create_session(&folio, provider.clone(), &store).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CheckoutError>(),
            Some(CheckoutError::EmptyCart)
        ));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_cart_reported_before_secret_lookup() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("_config.yml"),
            "checkout:\n  secret_key_env: FOLIO_TEST_SECRET_THAT_IS_NEVER_SET\n",
        )
        .unwrap();
        let folio = Folio::new(tmp.path()).unwrap();

        let err = run(&folio, None).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CheckoutError>(),
            Some(CheckoutError::EmptyCart)
        ));
    }

    #[tokio::test]
    async fn test_purchase_summary() {
        let tmp = TempDir::new().unwrap();
        let folio = Folio::new(tmp.path()).unwrap();

        let lines = purchase_summary(&folio, Arc::new(FakeProvider::ok()), "cs_paid")
            .await
            .unwrap();
        assert_eq!(
            lines,
            vec!["Order cs_paid (paid)", "  2 x Book = $40.00", "Total: $40.00"]
        );

        assert!(
            purchase_summary(&folio, Arc::new(FakeProvider::failing()), "cs_gone")
                .await
                .is_err()
        );
    }

    #[test]
    fn test_resolve_return() {
        let mut store = CartStore::new(MemoryStorage::new());
        store.add_to_cart(&product(), "price_book", 1).unwrap();

        let state = resolve_return(&mut store, "checkout=failure").unwrap();
        assert_eq!(state.retry(), CheckoutState::Idle);
        assert!(!store.is_empty());

        let state = resolve_return(&mut store, "?session_id=cs_test_9").unwrap();
        assert!(state.is_success());
        assert!(store.is_empty());
    }
}
