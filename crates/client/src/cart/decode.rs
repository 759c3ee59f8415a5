//! Schema-validated decoding of the server's cart DTO.
//!
//! The backend is loose with shapes: money fields arrive as strings or
//! numbers, arrays may be missing entirely, and counts are sometimes omitted.
//! Everything funnels through explicit serde DTOs plus a fallible conversion
//! that enforces the cart invariants and names each violation, rather than
//! defaulting inline at use sites.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use marketfront_core::{CartItemId, CurrencyCode, ProductId, VariationId};

use super::types::{Cart, CartItem, ProductSnapshot, Variation};

/// Named decode failures for the cart payload.
#[derive(Debug, Error)]
pub enum CartDecodeError {
    /// The payload was not valid JSON or missed required fields.
    #[error("invalid cart payload: {0}")]
    Json(#[from] serde_json::Error),

    /// A line item carried a quantity below 1.
    #[error("item {item_id} has non-positive quantity {quantity}")]
    NonPositiveQuantity {
        item_id: String,
        quantity: i64,
    },

    /// A line item carried a negative line total.
    #[error("item {item_id} has a negative line total")]
    NegativeLineTotal { item_id: String },

    /// The aggregate total was negative.
    #[error("cart total is negative")]
    NegativeTotal,

    /// The server sent a currency code this client does not know.
    #[error("unknown currency code: {0}")]
    UnknownCurrency(String),
}

/// Decode a cart response body into the local cart shape.
///
/// # Errors
///
/// Returns a [`CartDecodeError`] naming the first violated constraint.
pub fn decode_cart(body: &str) -> Result<Cart, CartDecodeError> {
    let dto: CartDto = serde_json::from_str(body)?;
    Cart::try_from(dto)
}

// =============================================================================
// Wire DTOs
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartDto {
    id: String,
    #[serde(default)]
    items: Vec<CartItemDto>,
    #[serde(deserialize_with = "decimal_from_string_or_number")]
    total: Decimal,
    #[serde(default)]
    item_count: Option<u32>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartItemDto {
    id: String,
    product: ProductDto,
    #[serde(deserialize_with = "i64_from_string_or_number")]
    quantity: i64,
    #[serde(default)]
    variation: Option<VariationDto>,
    #[serde(default, deserialize_with = "opt_decimal_from_string_or_number")]
    total_price: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductDto {
    #[serde(deserialize_with = "i64_from_string_or_number")]
    id: i64,
    title: String,
    #[serde(deserialize_with = "decimal_from_string_or_number")]
    price: Decimal,
    #[serde(default)]
    images: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VariationDto {
    #[serde(deserialize_with = "i64_from_string_or_number")]
    id: i64,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    sku: Option<String>,
}

// =============================================================================
// Conversion
// =============================================================================

impl TryFrom<CartDto> for Cart {
    type Error = CartDecodeError;

    fn try_from(dto: CartDto) -> Result<Self, Self::Error> {
        if dto.total.is_sign_negative() {
            return Err(CartDecodeError::NegativeTotal);
        }

        let currency = match dto.currency.as_deref() {
            None | Some("USD") => CurrencyCode::USD,
            Some("EUR") => CurrencyCode::EUR,
            Some("GBP") => CurrencyCode::GBP,
            Some("CAD") => CurrencyCode::CAD,
            Some("AUD") => CurrencyCode::AUD,
            Some(other) => return Err(CartDecodeError::UnknownCurrency(other.to_string())),
        };

        let items = dto
            .items
            .into_iter()
            .map(CartItem::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        // The server may omit the count; recompute it from the lines.
        let item_count = dto
            .item_count
            .unwrap_or_else(|| items.iter().map(|item| item.quantity).sum());

        Ok(Self {
            id: dto.id,
            items,
            total: dto.total,
            item_count,
            currency,
            created_at: dto.created_at,
            updated_at: dto.updated_at,
        })
    }
}

impl TryFrom<CartItemDto> for CartItem {
    type Error = CartDecodeError;

    fn try_from(dto: CartItemDto) -> Result<Self, Self::Error> {
        if dto.quantity < 1 {
            return Err(CartDecodeError::NonPositiveQuantity {
                item_id: dto.id,
                quantity: dto.quantity,
            });
        }
        // Bounds-checked above; quantities fit comfortably in u32.
        let quantity = u32::try_from(dto.quantity).map_err(|_| {
            CartDecodeError::NonPositiveQuantity {
                item_id: dto.id.clone(),
                quantity: dto.quantity,
            }
        })?;

        let line_total = dto
            .total_price
            .unwrap_or_else(|| dto.product.price * Decimal::from(quantity));
        if line_total.is_sign_negative() {
            return Err(CartDecodeError::NegativeLineTotal { item_id: dto.id });
        }

        Ok(Self {
            id: CartItemId::new(dto.id),
            product: ProductSnapshot {
                id: ProductId::new(dto.product.id),
                title: dto.product.title,
                price: dto.product.price,
                images: dto.product.images,
            },
            quantity,
            variation: dto.variation.map(|v| Variation {
                id: VariationId::new(v.id),
                size: v.size,
                color: v.color,
                sku: v.sku,
            }),
            line_total,
        })
    }
}

// =============================================================================
// Coercing Deserializers
// =============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Number(f64),
    String(String),
}

fn decimal_from_string_or_number<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Number(n) => Decimal::from_f64(n)
            .ok_or_else(|| serde::de::Error::custom(format!("non-finite amount: {n}"))),
        StringOrNumber::String(s) => s
            .trim()
            .parse::<Decimal>()
            .map_err(|e| serde::de::Error::custom(format!("invalid decimal string: {e}"))),
    }
}

fn opt_decimal_from_string_or_number<'de, D>(
    deserializer: D,
) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<StringOrNumber>::deserialize(deserializer)?;
    raw.map(|value| match value {
        StringOrNumber::Number(n) => Decimal::from_f64(n)
            .ok_or_else(|| serde::de::Error::custom(format!("non-finite amount: {n}"))),
        StringOrNumber::String(s) => s
            .trim()
            .parse::<Decimal>()
            .map_err(|e| serde::de::Error::custom(format!("invalid decimal string: {e}"))),
    })
    .transpose()
}

#[allow(clippy::cast_possible_truncation)]
fn i64_from_string_or_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Number(n) => {
            if n.fract() != 0.0 {
                return Err(serde::de::Error::custom(format!("not an integer: {n}")));
            }
            Ok(n as i64)
        }
        StringOrNumber::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| serde::de::Error::custom(format!("invalid integer string: {e}"))),
    }
}
