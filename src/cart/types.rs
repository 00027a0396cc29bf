//! Product, price and cart line types

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A sellable product with its price variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    /// Free-form flags such as `featured` or `hidequantity`
    #[serde(default)]
    pub metadata: IndexMap<String, String>,
    #[serde(default)]
    pub prices: Vec<Price>,
}

impl Product {
    pub fn price(&self, price_id: &str) -> Option<&Price> {
        self.prices.iter().find(|p| p.id == price_id)
    }

    pub fn is_featured(&self) -> bool {
        self.metadata.get("featured").is_some_and(|v| v == "true")
    }

    /// Lowest and highest unit amount across active prices
    pub fn price_range(&self) -> Option<(u64, u64)> {
        let amounts = self.prices.iter().filter(|p| p.active).map(|p| p.unit_amount);
        let min = amounts.clone().min()?;
        let max = amounts.max()?;
        Some((min, max))
    }
}

/// One price variant of a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub id: String,
    #[serde(default = "default_active")]
    pub active: bool,
    /// ISO 4217 code, any case
    pub currency: String,
    /// Amount in the currency's minor unit
    pub unit_amount: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

fn default_active() -> bool {
    true
}

/// A price variant held in the cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartPrice {
    #[serde(flatten)]
    pub price: Price,
    pub quantity: u32,
}

impl CartPrice {
    pub fn line_total(&self) -> u64 {
        self.price.unit_amount.saturating_mul(u64::from(self.quantity))
    }
}

/// A product in the cart with the variants chosen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub metadata: IndexMap<String, String>,
    pub prices: Vec<CartPrice>,
}

impl CartItem {
    /// A cart entry for `product` holding only `price` at `quantity`
    pub fn new(product: &Product, price: &Price, quantity: u32) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            description: product.description.clone(),
            images: product.images.clone(),
            metadata: product.metadata.clone(),
            prices: vec![CartPrice {
                price: price.clone(),
                quantity,
            }],
        }
    }
}

/// A `{ price, quantity }` pair sent to the payments provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutLineItem {
    pub price: String,
    pub quantity: u32,
}

impl CheckoutLineItem {
    pub fn new(price: impl Into<String>, quantity: u32) -> Self {
        Self {
            price: price.into(),
            quantity,
        }
    }
}
