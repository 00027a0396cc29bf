//! Inspect and edit the persisted cart

use anyhow::Result;

use crate::cart::{currency, CartStore, Catalog, FileStorage};
use crate::Folio;

/// What to do with the cart
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    Show,
    Add { price_id: String, quantity: u32 },
    Remove { id: String },
    Update { price_id: String, quantity: i64 },
    Clear,
}

/// Open the cart persisted for this site
pub fn open(folio: &Folio) -> CartStore<FileStorage> {
    CartStore::with_key(
        FileStorage::new(folio.cart_dir()),
        &folio.config.cart.storage_key,
    )
}

/// Apply `action` to the persisted cart, then print it
pub fn run(folio: &Folio, action: CartAction) -> Result<()> {
    let mut cart = open(folio);
    apply(folio, &mut cart, action)?;
    for line in summary(&cart) {
        println!("{}", line);
    }
    Ok(())
}

fn apply(folio: &Folio, cart: &mut CartStore<FileStorage>, action: CartAction) -> Result<()> {
    match action {
        CartAction::Show => {}
        CartAction::Add { price_id, quantity } => {
            let catalog = Catalog::load(folio.catalog_path())?;
            let Some((product, price)) = catalog.find_price(&price_id) else {
                anyhow::bail!("Unknown price: {}", price_id);
            };
            if !price.active {
                anyhow::bail!("Price {} is not active", price_id);
            }
            cart.add_to_cart(product, &price.id, quantity)?;
            tracing::info!("Added {} x {} ({})", quantity, product.name, price_id);
        }
        CartAction::Remove { id } => {
            cart.remove_from_cart(&id)?;
            tracing::info!("Removed {}", id);
        }
        CartAction::Update { price_id, quantity } => {
            cart.update_quantity(&price_id, quantity)?;
            tracing::info!("Set {} to {}", price_id, quantity);
        }
        CartAction::Clear => {
            cart.clear_cart()?;
            tracing::info!("Cart cleared");
        }
    }
    Ok(())
}

/// Human-readable cart contents
pub fn summary<S: crate::cart::CartStorage>(cart: &CartStore<S>) -> Vec<String> {
    if cart.is_empty() {
        return vec!["Cart is empty".to_string()];
    }

    let mut lines = vec![format!("Cart ({} items):", cart.total_count())];
    for item in cart.items() {
        lines.push(format!("  {} [{}]", item.name, item.id));
        for variant in &item.prices {
            let label = variant
                .price
                .nickname
                .clone()
                .unwrap_or_else(|| variant.price.id.clone());
            lines.push(format!(
                "    {} x {} @ {} = {}",
                variant.quantity,
                label,
                currency::format_price(variant.price.unit_amount, &variant.price.currency),
                currency::format_price(variant.line_total(), &variant.price.currency)
            ));
        }
    }
    let code = cart.currency().unwrap_or("usd");
    lines.push(format!(
        "Subtotal: {}",
        currency::format_price(cart.subtotal(), code)
    ));
    lines
}
