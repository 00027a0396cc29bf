//! Cart state store
//!
//! [`CartStore`] owns the cart and a [`CartStorage`] adapter. State is
//! loaded when the store is created and saved after every change, under a
//! single key, in the shape `{"state":{"cart":[...]},"version":0}`.
//!
//! After every operation no product has zero variants and no variant has
//! a zero quantity.

mod catalog;
pub mod currency;
mod storage;
mod types;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use catalog::Catalog;
pub use storage::{CartStorage, FileStorage, MemoryStorage};
pub use types::{CartItem, CartPrice, CheckoutLineItem, Price, Product};

/// Default storage key for the persisted cart
pub const STORAGE_KEY: &str = "cart-storage";

const STORAGE_VERSION: u32 = 0;

#[derive(Debug, Error)]
pub enum CartError {
    #[error("failed to persist cart under {key:?}: {source}")]
    Storage {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize cart: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The persisted envelope around the cart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedCart {
    pub state: PersistedState,
    #[serde(default)]
    pub version: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub cart: Vec<CartItem>,
}

/// A cart with load-on-create and save-on-change persistence
pub struct CartStore<S: CartStorage> {
    cart: Vec<CartItem>,
    storage: S,
    key: String,
}

impl<S: CartStorage> CartStore<S> {
    /// Open the cart persisted under the default key
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, STORAGE_KEY)
    }

    /// Open the cart persisted under `key`. Unreadable or corrupt state is
    /// logged and replaced by an empty cart.
    pub fn with_key(storage: S, key: &str) -> Self {
        let cart = match storage.load(key) {
            Ok(Some(json)) => match serde_json::from_str::<PersistedCart>(&json) {
                Ok(persisted) => persisted.state.cart,
                Err(e) => {
                    tracing::warn!("Ignoring corrupt cart state under {:?}: {}", key, e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read cart state under {:?}: {}", key, e);
                Vec::new()
            }
        };

        let mut store = Self {
            cart,
            storage,
            key: key.to_string(),
        };
        store.prune();
        store
    }

    /// Read access to the cart contents
    pub fn items(&self) -> &[CartItem] {
        &self.cart
    }

    pub fn is_empty(&self) -> bool {
        self.cart.is_empty()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Add `quantity` of `price_id` for `product`.
    ///
    /// A new product enters the cart with only that variant. For a product
    /// already in the cart the variant's quantity is incremented, or the
    /// variant is appended from the product's price list. A zero quantity
    /// or a price the product doesn't have changes nothing.
    pub fn add_to_cart(
        &mut self,
        product: &Product,
        price_id: &str,
        quantity: u32,
    ) -> Result<(), CartError> {
        if quantity == 0 {
            return Ok(());
        }

        match self.cart.iter_mut().find(|item| item.id == product.id) {
            Some(item) => {
                if let Some(existing) = item.prices.iter_mut().find(|p| p.price.id == price_id) {
                    existing.quantity = existing.quantity.saturating_add(quantity);
                } else if let Some(price) = product.price(price_id) {
                    item.prices.push(CartPrice {
                        price: price.clone(),
                        quantity,
                    });
                } else {
                    tracing::debug!("Product {} has no price {}", product.id, price_id);
                    return Ok(());
                }
            }
            None => {
                let Some(price) = product.price(price_id) else {
                    tracing::debug!("Product {} has no price {}", product.id, price_id);
                    return Ok(());
                };
                self.cart.push(CartItem::new(product, price, quantity));
            }
        }

        self.persist()
    }

    /// Remove a whole product when `id` names one in the cart, otherwise
    /// the price variant with that id
    pub fn remove_from_cart(&mut self, id: &str) -> Result<(), CartError> {
        let before = self.cart.len();
        self.cart.retain(|item| item.id != id);

        if self.cart.len() == before {
            for item in &mut self.cart {
                for price in &mut item.prices {
                    if price.price.id == id {
                        price.quantity = 0;
                    }
                }
            }
            self.prune();
        }

        self.persist()
    }

    /// Set the quantity of a variant; zero or less removes it
    pub fn update_quantity(&mut self, price_id: &str, quantity: i64) -> Result<(), CartError> {
        if quantity <= 0 {
            return self.remove_from_cart(price_id);
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);

        for item in &mut self.cart {
            for price in &mut item.prices {
                if price.price.id == price_id {
                    price.quantity = quantity;
                }
            }
        }

        self.persist()
    }

    pub fn clear_cart(&mut self) -> Result<(), CartError> {
        self.cart.clear();
        self.persist()
    }

    /// Number of units across all variants
    pub fn total_count(&self) -> u64 {
        self.cart
            .iter()
            .flat_map(|item| &item.prices)
            .map(|p| u64::from(p.quantity))
            .sum()
    }

    /// Σ unit_amount × quantity, in minor units
    pub fn subtotal(&self) -> u64 {
        self.cart
            .iter()
            .flat_map(|item| &item.prices)
            .map(CartPrice::line_total)
            .sum()
    }

    /// Line items for checkout, one per variant with a non-zero quantity
    pub fn cart_items(&self) -> Vec<CheckoutLineItem> {
        self.cart
            .iter()
            .flat_map(|item| &item.prices)
            .filter(|p| p.quantity > 0)
            .map(|p| CheckoutLineItem::new(p.price.id.clone(), p.quantity))
            .collect()
    }

    /// Currency of the first variant in the cart
    pub fn currency(&self) -> Option<&str> {
        self.cart
            .iter()
            .flat_map(|item| &item.prices)
            .map(|p| p.price.currency.as_str())
            .next()
    }

    /// Drop zero-quantity variants and products left without variants
    fn prune(&mut self) {
        for item in &mut self.cart {
            item.prices.retain(|p| p.quantity > 0);
        }
        self.cart.retain(|item| !item.prices.is_empty());
    }

    fn persist(&mut self) -> Result<(), CartError> {
        let persisted = PersistedCart {
            state: PersistedState {
                cart: self.cart.clone(),
            },
            version: STORAGE_VERSION,
        };
        let json = serde_json::to_string(&persisted)?;
        self.storage
            .save(&self.key, &json)
            .map_err(|source| CartError::Storage {
                key: self.key.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use std::io;

    fn price(id: &str, amount: u64) -> Price {
        Price {
            id: id.to_string(),
            active: true,
            currency: "usd".to_string(),
            unit_amount: amount,
            nickname: None,
        }
    }

    fn product(id: &str, prices: Vec<Price>) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            description: None,
            images: Vec::new(),
            metadata: IndexMap::new(),
            prices,
        }
    }

    fn shirt() -> Product {
        product(
            "prod_shirt",
            vec![price("price_small", 2000), price("price_large", 2500)],
        )
    }

    fn store() -> CartStore<MemoryStorage> {
        CartStore::new(MemoryStorage::new())
    }

    #[test]
    fn test_add_same_variant_accumulates() {
        let mut cart = store();
        let p = shirt();
        cart.add_to_cart(&p, "price_small", 2).unwrap();
        cart.add_to_cart(&p, "price_small", 3).unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].prices.len(), 1);
        assert_eq!(cart.items()[0].prices[0].quantity, 5);
    }

    #[test]
    fn test_new_product_holds_only_chosen_variant() {
        let mut cart = store();
        cart.add_to_cart(&shirt(), "price_large", 1).unwrap();
        let prices: Vec<_> = cart.items()[0].prices.iter().map(|p| p.price.id.as_str()).collect();
        assert_eq!(prices, vec!["price_large"]);
    }

    #[test]
    fn test_add_second_variant_appends() {
        let mut cart = store();
        let p = shirt();
        cart.add_to_cart(&p, "price_small", 1).unwrap();
        cart.add_to_cart(&p, "price_large", 2).unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].prices.len(), 2);
        assert_eq!(cart.total_count(), 3);
    }

    #[test]
    fn test_zero_quantity_or_unknown_price_is_noop() {
        let mut cart = store();
        let p = shirt();
        cart.add_to_cart(&p, "price_small", 1).unwrap();
        let before = cart.subtotal();

        cart.add_to_cart(&p, "price_large", 0).unwrap();
        cart.add_to_cart(&p, "price_missing", 4).unwrap();
        cart.add_to_cart(&product("prod_other", vec![]), "price_x", 1).unwrap();

        assert_eq!(cart.subtotal(), before);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].prices.len(), 1);
    }

    #[test]
    fn test_remove_product_removes_all_variants() {
        let mut cart = store();
        let p = shirt();
        cart.add_to_cart(&p, "price_small", 1).unwrap();
        cart.add_to_cart(&p, "price_large", 1).unwrap();
        cart.add_to_cart(&product("prod_mug", vec![price("price_mug", 900)]), "price_mug", 1)
            .unwrap();

        cart.remove_from_cart("prod_shirt").unwrap();
        assert_eq!(cart.cart_items(), vec![CheckoutLineItem::new("price_mug", 1)]);
    }

    #[test]
    fn test_remove_last_variant_prunes_product() {
        let mut cart = store();
        let p = shirt();
        cart.add_to_cart(&p, "price_small", 1).unwrap();
        cart.add_to_cart(&p, "price_large", 1).unwrap();

        cart.remove_from_cart("price_small").unwrap();
        assert_eq!(cart.items()[0].prices.len(), 1);
        cart.remove_from_cart("price_large").unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_zero_equals_remove() {
        let p = shirt();
        let mut a = store();
        let mut b = store();
        for cart in [&mut a, &mut b] {
            cart.add_to_cart(&p, "price_small", 2).unwrap();
            cart.add_to_cart(&p, "price_large", 1).unwrap();
        }

        a.update_quantity("price_large", 0).unwrap();
        b.remove_from_cart("price_large").unwrap();
        assert_eq!(a.items(), b.items());

        a.update_quantity("price_small", -4).unwrap();
        assert!(a.is_empty());
    }

    #[test]
    fn test_update_quantity_sets_value() {
        let mut cart = store();
        cart.add_to_cart(&shirt(), "price_small", 2).unwrap();
        cart.update_quantity("price_small", 7).unwrap();
        assert_eq!(cart.total_count(), 7);
        assert_eq!(cart.subtotal(), 14000);
    }

    #[test]
    fn test_subtotal_and_line_items() {
        let mut cart = store();
        let p = shirt();
        cart.add_to_cart(&p, "price_small", 2).unwrap();
        cart.add_to_cart(&p, "price_large", 1).unwrap();

        assert_eq!(cart.subtotal(), 2 * 2000 + 2500);
        assert_eq!(
            cart.cart_items(),
            vec![
                CheckoutLineItem::new("price_small", 2),
                CheckoutLineItem::new("price_large", 1)
            ]
        );
        assert_eq!(cart.currency(), Some("usd"));
    }

    #[test]
    fn test_clear_cart() {
        let mut cart = store();
        cart.add_to_cart(&shirt(), "price_small", 2).unwrap();
        cart.clear_cart().unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal(), 0);
        assert!(cart.cart_items().is_empty());
    }

    #[test]
    fn test_persisted_shape_and_reload() {
        let mut cart = store();
        cart.add_to_cart(&shirt(), "price_small", 2).unwrap();

        let json = cart.storage().get(STORAGE_KEY).unwrap().to_string();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], 0);
        assert_eq!(value["state"]["cart"][0]["id"], "prod_shirt");
        assert_eq!(value["state"]["cart"][0]["prices"][0]["quantity"], 2);
        assert_eq!(value["state"]["cart"][0]["prices"][0]["unit_amount"], 2000);

        let reopened = CartStore::new(cart.storage().clone());
        assert_eq!(reopened.items(), cart.items());
    }

    #[test]
    fn test_corrupt_state_starts_empty() {
        let mut storage = MemoryStorage::new();
        storage.save(STORAGE_KEY, "{not json").unwrap();
        let cart = CartStore::new(storage);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_loaded_state_is_pruned() {
        let mut storage = MemoryStorage::new();
        let json = r#"{"state":{"cart":[
            {"id":"prod_a","name":"A","prices":[
                {"id":"price_a","currency":"usd","unit_amount":100,"quantity":0}]},
            {"id":"prod_b","name":"B","prices":[
                {"id":"price_b1","currency":"usd","unit_amount":100,"quantity":0},
                {"id":"price_b2","currency":"usd","unit_amount":300,"quantity":2}]},
            {"id":"prod_c","name":"C","prices":[]}
        ]},"version":0}"#;
        storage.save(STORAGE_KEY, json).unwrap();

        let cart = CartStore::new(storage);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].id, "prod_b");
        assert_eq!(cart.cart_items(), vec![CheckoutLineItem::new("price_b2", 2)]);
    }

    struct FailingStorage;

    impl CartStorage for FailingStorage {
        fn load(&self, _key: &str) -> io::Result<Option<String>> {
            Ok(None)
        }

        fn save(&mut self, _key: &str, _value: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"))
        }

        fn remove(&mut self, _key: &str) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_storage_failure_keeps_memory_state() {
        let mut cart = CartStore::new(FailingStorage);
        let err = cart.add_to_cart(&shirt(), "price_small", 1).unwrap_err();
        assert!(matches!(err, CartError::Storage { .. }));
        assert_eq!(cart.total_count(), 1);
    }
}
