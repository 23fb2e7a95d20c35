//! Shopping cart state holder.
//!
//! A [`Cart`] belongs to one user session. Every mutation writes the full
//! line list back to its [`CartStorage`]; a failed write is logged and the
//! in-memory cart stays authoritative.

mod error;
mod storage;

pub use error::*;
pub use storage::*;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::Product;

/// A cart line: the product as it was when added, plus the quantity wanted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    pub fn line_total(&self) -> Decimal {
        self.product.effective_price() * Decimal::from(self.quantity)
    }
}

#[derive(Debug)]
pub struct Cart<S: CartStorage> {
    items: Vec<CartItem>,
    storage: S,
}

impl<S: CartStorage> Cart<S> {
    /// Rehydrate the cart from `storage`. Unreadable or corrupt contents are
    /// discarded and the cart starts empty. Lines for the same product are
    /// merged and empty lines dropped.
    pub fn load(storage: S) -> Self {
        let items = match storage.load() {
            Ok(Some(contents)) => match serde_json::from_str::<Vec<CartItem>>(&contents) {
                Ok(stored) => {
                    let stored_lines = stored.len();
                    let items = merge_lines(stored);
                    if items.len() != stored_lines {
                        warn!(stored_lines, lines = items.len(), "Normalized stored cart lines");
                    }
                    items
                }
                Err(e) => {
                    warn!(error = %e, "Discarding corrupt cart data");
                    if let Err(e) = storage.remove() {
                        warn!(error = %e, "Failed to remove corrupt cart data");
                    }
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read stored cart");
                Vec::new()
            }
        };

        debug!(lines = items.len(), "Cart loaded");
        Self { items, storage }
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Add `quantity` of `product`, merging into an existing line. Returns the
    /// notice to show the customer.
    pub fn add_to_cart(&mut self, product: &Product, quantity: u32) -> Result<String, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        let notice = match self.items.iter_mut().find(|item| item.product.id == product.id) {
            Some(item) => {
                let total = item
                    .quantity
                    .checked_add(quantity)
                    .filter(|total| *total <= product.stock)
                    .ok_or(CartError::NotEnoughStock {
                        available: product.stock,
                        in_cart: true,
                    })?;
                item.quantity = total;
                format!("{} quantity updated.", product.name)
            }
            None => {
                if quantity > product.stock {
                    return Err(CartError::NotEnoughStock {
                        available: product.stock,
                        in_cart: false,
                    });
                }
                self.items.push(CartItem {
                    product: product.clone(),
                    quantity,
                });
                format!("{quantity} x {} added.", product.name)
            }
        };

        info!(product_id = %product.id, quantity, "Added to cart");
        self.persist();
        Ok(notice)
    }

    /// Set a line's quantity; zero removes the line. Unknown ids are ignored.
    pub fn update_quantity(&mut self, product_id: &str, quantity: u32) -> Result<(), CartError> {
        let Some(index) = self.items.iter().position(|item| item.product.id == product_id) else {
            return Ok(());
        };

        let available = self.items[index].product.stock;
        if quantity > available {
            return Err(CartError::NotEnoughStock {
                available,
                in_cart: false,
            });
        }

        if quantity == 0 {
            self.items.remove(index);
        } else {
            self.items[index].quantity = quantity;
        }

        debug!(product_id, quantity, "Cart quantity updated");
        self.persist();
        Ok(())
    }

    pub fn remove_from_cart(&mut self, product_id: &str) -> String {
        self.items.retain(|item| item.product.id != product_id);
        debug!(product_id, "Removed from cart");
        self.persist();
        "Item removed from cart.".to_string()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.persist();
    }

    pub fn cart_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    fn persist(&self) {
        let contents = match serde_json::to_string(&self.items) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(error = %e, "Failed to serialize cart");
                return;
            }
        };
        if let Err(e) = self.storage.save(&contents) {
            warn!(error = %e, "Failed to persist cart");
        }
    }
}

/// One line per product, first snapshot wins; zero-quantity lines are dropped.
fn merge_lines(stored: Vec<CartItem>) -> Vec<CartItem> {
    let mut items: Vec<CartItem> = Vec::with_capacity(stored.len());
    for line in stored.into_iter().filter(|line| line.quantity > 0) {
        match items.iter_mut().find(|item| item.product.id == line.product.id) {
            Some(item) => item.quantity = item.quantity.saturating_add(line.quantity),
            None => items.push(line),
        }
    }
    items
}
