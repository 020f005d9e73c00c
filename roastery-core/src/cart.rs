//! Storefront shopping cart.
//!
//! A cart holds one line per product. Adding a product that is already in
//! the cart bumps its quantity; a line whose quantity drops to zero is
//! removed rather than kept at zero.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Product;

/// A product in the cart together with how many of it were added.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    #[serde(flatten)]
    pub product: Product,
    /// Always at least 1 while the item is in a cart
    pub quantity: u32,
}

impl CartItem {
    /// Price times quantity, saturating at `u64::MAX`.
    pub fn line_total(&self) -> u64 {
        self.product.price.saturating_mul(u64::from(self.quantity))
    }
}

impl fmt::Display for CartItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<30} x{:<3} {}",
            self.product.name,
            self.quantity,
            self.line_total()
        )
    }
}

/// In-memory cart for one storefront session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Adds one unit of `product`.
    pub fn add(&mut self, product: &Product) {
        match self.items.iter_mut().find(|i| i.product.id == product.id) {
            Some(item) => item.quantity = item.quantity.saturating_add(1),
            None => self.items.push(CartItem {
                product: product.clone(),
                quantity: 1,
            }),
        }
    }

    /// Changes a line's quantity by `delta`. Lines that would reach zero or
    /// below are removed. Returns false if no line has that id.
    pub fn update_quantity(&mut self, id: &str, delta: i64) -> bool {
        let Some(pos) = self.items.iter().position(|i| i.product.id == id) else {
            return false;
        };

        let next = i64::from(self.items[pos].quantity).saturating_add(delta);
        if next <= 0 {
            self.items.remove(pos);
        } else {
            self.items[pos].quantity = u32::try_from(next).unwrap_or(u32::MAX);
        }
        true
    }

    /// Removes a line regardless of quantity. Returns true if one was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let len_before = self.items.len();
        self.items.retain(|i| i.product.id != id);
        self.items.len() != len_before
    }

    /// Total number of units across all lines.
    pub fn count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    pub fn subtotal(&self) -> u64 {
        self.items
            .iter()
            .map(CartItem::line_total)
            .fold(0, u64::saturating_add)
    }
}
