//! Payment initiation against the Tinkoff Init API.
//!
//! Builds a signed `Init` request from a cart and customer, submits it as a
//! JSON POST, and relays the gateway-provided payment URL. The signature
//! token is a SHA-256 over the scalar request fields plus the shared
//! password; the receipt and passthrough blocks are excluded from the
//! signed set and the password itself is never transmitted.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use larkspur_core::{CartItem, Customer, to_minor_units};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::instrument;

use crate::config::{ShopConfig, TinkoffConfig};

/// Outbound request timeout.
const GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);

/// The gateway rejects receipt item names longer than this.
const RECEIPT_NAME_MAX_CHARS: usize = 128;

/// Errors that can occur when initiating a payment.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway answered but declined the request.
    #[error("gateway rejected the payment: {message}")]
    Rejected { message: String },

    /// An amount does not fit in integer minor units.
    #[error("amount out of range")]
    AmountOutOfRange,
}

impl PaymentError {
    /// Client-facing message; transport details stay server-side.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::Http(_) => "Payment gateway is unreachable".to_string(),
            Self::Rejected { message } => format!("Payment was rejected: {message}"),
            Self::AmountOutOfRange => "Order amount is out of range".to_string(),
        }
    }
}

/// A signed, single-use `Init` request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InitPaymentRequest {
    pub terminal_key: String,
    /// Order total in integer minor units.
    pub amount: i64,
    pub order_id: String,
    pub description: String,
    pub receipt: Receipt,
    #[serde(rename = "DATA")]
    pub data: PassthroughData,
    pub token: String,
}

/// Fiscal receipt block; excluded from the signature.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Receipt {
    pub email: String,
    pub phone: String,
    pub taxation: String,
    pub items: Vec<ReceiptItem>,
}

/// One fiscal receipt line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReceiptItem {
    pub name: String,
    /// Unit price in minor units.
    pub price: i64,
    pub quantity: f64,
    /// Line total in minor units.
    pub amount: i64,
    pub tax: String,
}

/// Opaque passthrough block returned in gateway callbacks; excluded from
/// the signature.
#[derive(Debug, Clone, Serialize)]
pub struct PassthroughData {
    #[serde(rename = "CustomerName")]
    pub customer_name: String,
    #[serde(rename = "CustomerEmail")]
    pub customer_email: String,
    #[serde(rename = "CustomerPhone", skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
}

/// Gateway response envelope.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitResponse {
    success: bool,
    #[serde(rename = "PaymentURL")]
    payment_url: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

/// Capability to submit an `Init` request to the payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Submit the request; returns the gateway-provided payment URL.
    async fn init_payment(&self, request: &InitPaymentRequest) -> Result<String, PaymentError>;
}

/// Production gateway client.
pub struct TinkoffClient {
    client: reqwest::Client,
    api_url: String,
}

impl TinkoffClient {
    /// Create a new gateway client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &TinkoffConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder().timeout(GATEWAY_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
        })
    }
}

#[async_trait]
impl PaymentGateway for TinkoffClient {
    #[instrument(skip(self, request), fields(order_id = %request.order_id, amount = request.amount))]
    async fn init_payment(&self, request: &InitPaymentRequest) -> Result<String, PaymentError> {
        let response = self.client.post(&self.api_url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PaymentError::Rejected {
                message: format!("{status}: {message}"),
            });
        }

        let result: InitResponse = response.json().await?;
        if result.success {
            result.payment_url.ok_or_else(|| PaymentError::Rejected {
                message: "gateway returned success without a payment URL".to_string(),
            })
        } else {
            let message = result
                .message
                .or(result.details)
                .unwrap_or_else(|| "unknown gateway error".to_string());
            Err(PaymentError::Rejected { message })
        }
    }
}

/// Build a signed `Init` request for the given cart and customer.
///
/// The order total and each receipt line are converted to minor units
/// independently; with sub-cent prices their rounded values can disagree,
/// and that disagreement is intentional - the gateway validates the total
/// it was sent, not a reconciliation of the lines.
///
/// # Errors
///
/// Returns `PaymentError::AmountOutOfRange` if an amount does not fit in
/// integer minor units.
pub fn build_init_request(
    config: &TinkoffConfig,
    shop: &ShopConfig,
    cart: &[CartItem],
    customer: &Customer,
) -> Result<InitPaymentRequest, PaymentError> {
    build_init_request_with_order_id(config, shop, cart, customer, new_order_id())
}

fn build_init_request_with_order_id(
    config: &TinkoffConfig,
    shop: &ShopConfig,
    cart: &[CartItem],
    customer: &Customer,
    order_id: String,
) -> Result<InitPaymentRequest, PaymentError> {
    let total: Decimal = cart.iter().map(|item| item.price).sum();
    let amount = to_minor_units(total).ok_or(PaymentError::AmountOutOfRange)?;
    let description = format!("Order {order_id} at {}", shop.name);

    let items = cart
        .iter()
        .map(|item| {
            let line_amount = to_minor_units(item.price).ok_or(PaymentError::AmountOutOfRange)?;
            Ok(ReceiptItem {
                name: truncate_chars(&item.name, RECEIPT_NAME_MAX_CHARS),
                price: line_amount,
                quantity: 1.0,
                amount: line_amount,
                tax: "none".to_string(),
            })
        })
        .collect::<Result<Vec<_>, PaymentError>>()?;

    let token = signature_token(
        &config.terminal_key,
        amount,
        &order_id,
        &description,
        config.password.expose_secret(),
    );

    Ok(InitPaymentRequest {
        terminal_key: config.terminal_key.clone(),
        amount,
        order_id,
        description,
        receipt: Receipt {
            email: customer.email.clone(),
            phone: customer.phone.clone().unwrap_or_default(),
            taxation: "usn_income".to_string(),
            items,
        },
        data: PassthroughData {
            customer_name: customer.name.clone(),
            customer_email: customer.email.clone(),
            customer_phone: customer.phone.clone(),
        },
        token,
    })
}

/// Order id: fixed prefix plus the current epoch millisecond timestamp.
fn new_order_id() -> String {
    format!("cart-{}", Utc::now().timestamp_millis())
}

fn truncate_chars(name: &str, max: usize) -> String {
    name.chars().take(max).collect()
}

/// Compute the request signature token.
///
/// The signed set is exactly the scalar request fields plus the shared
/// password. Field names sort by code point; the values concatenate in
/// that order with no separator; the token is the SHA-256 hex digest of
/// the UTF-8 bytes.
fn signature_token(
    terminal_key: &str,
    amount: i64,
    order_id: &str,
    description: &str,
    password: &str,
) -> String {
    let mut signed: BTreeMap<&str, String> = BTreeMap::new();
    signed.insert("TerminalKey", terminal_key.to_string());
    signed.insert("Amount", amount.to_string());
    signed.insert("OrderId", order_id.to_string());
    signed.insert("Description", description.to_string());
    signed.insert("Password", password.to_string());

    let concatenated: String = signed.values().map(String::as_str).collect();
    hex::encode(Sha256::digest(concatenated.as_bytes()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use std::str::FromStr;

    fn config() -> TinkoffConfig {
        TinkoffConfig {
            terminal_key: "TestTerminal".to_string(),
            password: SecretString::from("test_password"),
            api_url: "https://securepay.tinkoff.ru/v2/Init".to_string(),
        }
    }

    fn shop() -> ShopConfig {
        ShopConfig {
            name: "Larkspur".to_string(),
            url: "https://larkspur.shop".to_string(),
        }
    }

    fn customer() -> Customer {
        Customer {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
        }
    }

    fn item(name: &str, price: &str) -> CartItem {
        CartItem {
            id: "a".to_string(),
            name: name.to_string(),
            price: Decimal::from_str(price).unwrap(),
            currency: "RUB".to_string(),
        }
    }

    fn build(cart: &[CartItem]) -> InitPaymentRequest {
        build_init_request_with_order_id(
            &config(),
            &shop(),
            cart,
            &customer(),
            "cart-1700000000000".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_amount_is_total_in_minor_units() {
        let request = build(&[item("Widget", "10.00")]);
        assert_eq!(request.amount, 1000);
        assert_eq!(request.receipt.items.len(), 1);
        assert_eq!(request.receipt.items[0].price, 1000);
        assert_eq!(request.receipt.items[0].amount, 1000);
    }

    #[test]
    fn test_receipt_lines_fixed_quantity_and_tax() {
        let request = build(&[item("Widget", "10.00"), item("Gadget", "2.50")]);
        assert_eq!(request.amount, 1250);
        for line in &request.receipt.items {
            assert!((line.quantity - 1.0).abs() < f64::EPSILON);
            assert_eq!(line.tax, "none");
        }
        assert_eq!(request.receipt.taxation, "usn_income");
    }

    #[test]
    fn test_receipt_name_truncated_to_128_chars() {
        let long_name = "x".repeat(200);
        let request = build(&[item(&long_name, "1.00")]);
        assert_eq!(request.receipt.items[0].name.chars().count(), 128);
    }

    #[test]
    fn test_signature_token_deterministic() {
        let first = signature_token("T", 1000, "cart-1", "Order", "pw");
        let second = signature_token("T", 1000, "cart-1", "Order", "pw");
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_signature_token_changes_with_any_signed_field() {
        let base = signature_token("T", 1000, "cart-1", "Order", "pw");
        assert_ne!(base, signature_token("U", 1000, "cart-1", "Order", "pw"));
        assert_ne!(base, signature_token("T", 1001, "cart-1", "Order", "pw"));
        assert_ne!(base, signature_token("T", 1000, "cart-2", "Order", "pw"));
        assert_ne!(base, signature_token("T", 1000, "cart-1", "Order!", "pw"));
        assert_ne!(base, signature_token("T", 1000, "cart-1", "Order", "pw2"));
    }

    #[test]
    fn test_signature_ignores_receipt_and_passthrough() {
        // Same scalar fields, different receipt lines and customer details:
        // the token must not change.
        let first = build(&[item("Widget", "6.00"), item("Gadget", "4.00")]);
        let with_other_details = build_init_request_with_order_id(
            &config(),
            &shop(),
            &[item("Sprocket", "7.00"), item("Flange", "3.00")],
            &Customer {
                name: "Grace".to_string(),
                email: "grace@example.com".to_string(),
                phone: Some("+700000000".to_string()),
            },
            "cart-1700000000000".to_string(),
        )
        .unwrap();

        assert_eq!(first.amount, with_other_details.amount);
        assert_eq!(first.token, with_other_details.token);
        assert_ne!(first.receipt.items[0].name, with_other_details.receipt.items[0].name);
    }

    #[test]
    fn test_password_never_serialized() {
        let request = build(&[item("Widget", "10.00")]);
        let wire = serde_json::to_string(&request).unwrap();
        assert!(!wire.contains("test_password"));
        assert!(wire.contains("\"Token\""));
        assert!(wire.contains("\"TerminalKey\":\"TestTerminal\""));
        assert!(wire.contains("\"Amount\":1000"));
        assert!(wire.contains("\"DATA\""));
    }

    #[test]
    fn test_phone_omitted_when_absent() {
        let request = build(&[item("Widget", "10.00")]);
        let wire = serde_json::to_string(&request).unwrap();
        assert!(!wire.contains("CustomerPhone"));
        // Receipt phone degrades to an empty string instead.
        assert!(wire.contains("\"Phone\":\"\""));
    }

    #[test]
    fn test_order_id_has_cart_prefix() {
        let order_id = new_order_id();
        assert!(order_id.starts_with("cart-"));
        let millis: i64 = order_id
            .trim_start_matches("cart-")
            .parse()
            .expect("timestamp suffix");
        assert!(millis > 0);
    }

    #[test]
    fn test_total_rounds_independently_of_lines() {
        // Two sub-cent prices: the summed total rounds up once, while each
        // line rounds down. The mismatch is the documented behavior.
        let request = build(&[item("A", "10.004"), item("B", "10.004")]);
        let line_sum: i64 = request.receipt.items.iter().map(|line| line.amount).sum();
        assert_eq!(request.amount, 2001);
        assert_eq!(line_sum, 2000);
    }
}
