//! Product catalog loaded from `_products.yml`

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::{Price, Product};

/// The products a site sells
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub products: Vec<Product>,
}

impl Catalog {
    /// Load a catalog file; a missing file is an empty catalog
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog {:?}", path))?;
        let mut catalog: Catalog = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse catalog {:?}", path))?;

        // Products without prices cannot be sold
        catalog.products.retain(|p| !p.prices.is_empty());
        for product in &mut catalog.products {
            product.prices.sort_by_key(|p| p.unit_amount);
        }
        Ok(catalog)
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// The product owning `price_id`, and the price itself
    pub fn find_price(&self, price_id: &str) -> Option<(&Product, &Price)> {
        self.products
            .iter()
            .find_map(|product| product.price(price_id).map(|price| (product, price)))
    }

    /// Up to `limit` products, featured ones only when `featured_only`
    pub fn listing(&self, limit: usize, featured_only: bool) -> Vec<&Product> {
        self.products
            .iter()
            .filter(|p| !featured_only || p.is_featured())
            .take(limit)
            .collect()
    }
}
