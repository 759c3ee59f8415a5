//! Local cart shapes.
//!
//! These types are the client's canonical view of the cart, separate from
//! the wire DTOs in [`super::decode`]. They are only ever produced by the
//! decode layer and replaced wholesale after each successful mutation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use marketfront_core::{CartItemId, CurrencyCode, Price, ProductId, VariationId};

/// A shopping cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    /// Backend cart identifier.
    pub id: String,
    /// Ordered line items.
    pub items: Vec<CartItem>,
    /// Aggregate total across all lines.
    pub total: Decimal,
    /// Total item quantity.
    pub item_count: u32,
    /// Cart currency.
    pub currency: CurrencyCode,
    /// Creation timestamp.
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Cart {
    /// Find a line item by its identifier.
    #[must_use]
    pub fn item(&self, item_id: &CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.id == item_id)
    }

    /// Aggregate total as a displayable price.
    #[must_use]
    pub const fn total_price(&self) -> Price {
        Price::new(self.total, self.currency)
    }
}

/// A line item in the cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    /// Line item identifier.
    pub id: CartItemId,
    /// Embedded product snapshot.
    pub product: ProductSnapshot,
    /// Quantity; always >= 1 (enforced at decode).
    pub quantity: u32,
    /// Selected variation, if the product has one.
    pub variation: Option<Variation>,
    /// Line total (unit price times quantity unless the server says otherwise).
    pub line_total: Decimal,
}

impl CartItem {
    /// Line total as a displayable price in the cart's currency.
    #[must_use]
    pub const fn line_price(&self, currency: CurrencyCode) -> Price {
        Price::new(self.line_total, currency)
    }
}

/// Product data embedded in a cart line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSnapshot {
    /// Product identifier.
    pub id: ProductId,
    /// Product title.
    pub title: String,
    /// Unit price.
    pub price: Decimal,
    /// Product image URLs.
    pub images: Vec<String>,
}

/// A product variation (specific size/color/sku combination).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variation {
    /// Variation identifier.
    pub id: VariationId,
    /// Size, if applicable.
    pub size: Option<String>,
    /// Color, if applicable.
    pub color: Option<String>,
    /// SKU code.
    pub sku: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_cart() -> Cart {
        Cart {
            id: "cart-1".to_string(),
            items: vec![CartItem {
                id: CartItemId::from("item-42-0"),
                product: ProductSnapshot {
                    id: ProductId::new(42),
                    title: "Desk Lamp".to_string(),
                    price: Decimal::new(1250, 2),
                    images: vec![],
                },
                quantity: 2,
                variation: None,
                line_total: Decimal::new(2500, 2),
            }],
            total: Decimal::new(2500, 2),
            item_count: 2,
            currency: CurrencyCode::USD,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_item_lookup() {
        let cart = sample_cart();
        assert!(cart.item(&CartItemId::from("item-42-0")).is_some());
        assert!(cart.item(&CartItemId::from("item-7-0")).is_none());
    }

    #[test]
    fn test_total_price_display() {
        let cart = sample_cart();
        assert_eq!(cart.total_price().display(), "$25.00");
    }
}
