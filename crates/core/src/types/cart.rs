//! Checkout request payloads.
//!
//! A cart and its customer exist only for the duration of one payment
//! request; nothing here is persisted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single cart entry as submitted by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Upstream product identifier.
    pub id: String,
    /// Display name of the product.
    pub name: String,
    /// Unit price in the currency's standard unit (e.g. "10.00").
    pub price: Decimal,
    /// Currency code as it appears in the feed (e.g. "RUB").
    pub currency: String,
}

/// Customer contact details submitted alongside the cart.
///
/// `name` and `email` are required for checkout; the phone number is
/// optional and passed through to the gateway and notifications as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Customer {
    /// Whether the required contact fields are present and non-empty.
    #[must_use]
    pub fn has_required_fields(&self) -> bool {
        !self.name.trim().is_empty() && !self.email.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_item_price_parses_from_string() {
        let item: CartItem = serde_json::from_str(
            r#"{"id":"a","name":"Widget","price":"10.00","currency":"RUB"}"#,
        )
        .expect("valid cart item");
        assert_eq!(item.price, Decimal::new(1000, 2));
    }

    #[test]
    fn test_customer_required_fields() {
        let customer = Customer {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
        };
        assert!(customer.has_required_fields());

        let missing_email = Customer {
            name: "Ada".to_string(),
            email: "   ".to_string(),
            phone: None,
        };
        assert!(!missing_email.has_required_fields());
    }

    #[test]
    fn test_customer_phone_defaults_to_none() {
        let customer: Customer =
            serde_json::from_str(r#"{"name":"Ada","email":"ada@example.com"}"#)
                .expect("valid customer");
        assert_eq!(customer.phone, None);
    }
}
