//! Order confirmation emails.
//!
//! After a successful payment initiation, two messages go out: a
//! confirmation to the customer and an alert to the administrator. Both
//! are sent from a detached task so that a slow or failing transport never
//! affects the payment response the customer is already holding.

use std::sync::Arc;

use askama::Template;
use larkspur_core::{CartItem, Customer};
use rust_decimal::Decimal;

use crate::config::ShopConfig;
use crate::services::email::{EmailError, Mailer, OutgoingEmail};

/// Everything the order emails need, captured before the response returns.
#[derive(Debug, Clone)]
pub struct OrderNotification {
    pub order_id: String,
    pub customer: Customer,
    pub items: Vec<CartItem>,
    pub total: Decimal,
    pub payment_url: String,
}

/// HTML template for the customer confirmation.
#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    customer_name: &'a str,
    order_id: &'a str,
    items: &'a [CartItem],
    total: &'a str,
    payment_url: &'a str,
    shop_name: &'a str,
    shop_url: &'a str,
}

/// Plain text template for the customer confirmation.
#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    customer_name: &'a str,
    order_id: &'a str,
    items: &'a [CartItem],
    total: &'a str,
    payment_url: &'a str,
    shop_name: &'a str,
    shop_url: &'a str,
}

/// HTML template for the admin alert.
#[derive(Template)]
#[template(path = "email/admin_alert.html")]
struct AdminAlertHtml<'a> {
    order_id: &'a str,
    customer_name: &'a str,
    customer_email: &'a str,
    customer_phone: &'a str,
    items: &'a [CartItem],
    total: &'a str,
}

/// Plain text template for the admin alert.
#[derive(Template)]
#[template(path = "email/admin_alert.txt")]
struct AdminAlertText<'a> {
    order_id: &'a str,
    customer_name: &'a str,
    customer_email: &'a str,
    customer_phone: &'a str,
    items: &'a [CartItem],
    total: &'a str,
}

/// Fire off the customer confirmation and the admin alert.
///
/// Failures are logged and swallowed; the payment has already succeeded
/// from the gateway's perspective.
pub fn spawn_order_emails(
    mailer: Arc<dyn Mailer>,
    admin_to: Option<String>,
    shop: ShopConfig,
    order: OrderNotification,
) {
    tokio::spawn(async move {
        let total = format!("{:.2}", order.total);

        match render_customer_email(&shop, &order, &total) {
            Ok(email) => {
                if let Err(error) = mailer.send(email).await {
                    tracing::warn!(error = %error, order_id = %order.order_id, "customer notification failed");
                }
            }
            Err(error) => {
                tracing::warn!(error = %error, order_id = %order.order_id, "customer notification render failed");
            }
        }

        let Some(admin_to) = admin_to else { return };
        match render_admin_email(&order, &total, admin_to) {
            Ok(email) => {
                if let Err(error) = mailer.send(email).await {
                    tracing::warn!(error = %error, order_id = %order.order_id, "admin notification failed");
                }
            }
            Err(error) => {
                tracing::warn!(error = %error, order_id = %order.order_id, "admin notification render failed");
            }
        }
    });
}

fn render_customer_email(
    shop: &ShopConfig,
    order: &OrderNotification,
    total: &str,
) -> Result<OutgoingEmail, EmailError> {
    let html = OrderConfirmationHtml {
        customer_name: &order.customer.name,
        order_id: &order.order_id,
        items: &order.items,
        total,
        payment_url: &order.payment_url,
        shop_name: &shop.name,
        shop_url: &shop.url,
    }
    .render()?;
    let text = OrderConfirmationText {
        customer_name: &order.customer.name,
        order_id: &order.order_id,
        items: &order.items,
        total,
        payment_url: &order.payment_url,
        shop_name: &shop.name,
        shop_url: &shop.url,
    }
    .render()?;

    Ok(OutgoingEmail {
        to: order.customer.email.clone(),
        subject: format!("Your order {} at {} has been created", order.order_id, shop.name),
        text,
        html,
    })
}

fn render_admin_email(
    order: &OrderNotification,
    total: &str,
    to: String,
) -> Result<OutgoingEmail, EmailError> {
    let phone = order.customer.phone.as_deref().unwrap_or("Not provided");

    let html = AdminAlertHtml {
        order_id: &order.order_id,
        customer_name: &order.customer.name,
        customer_email: &order.customer.email,
        customer_phone: phone,
        items: &order.items,
        total,
    }
    .render()?;
    let text = AdminAlertText {
        order_id: &order.order_id,
        customer_name: &order.customer.name,
        customer_email: &order.customer.email,
        customer_phone: phone,
        items: &order.items,
        total,
    }
    .render()?;

    Ok(OutgoingEmail {
        to,
        subject: format!("New order {}", order.order_id),
        text,
        html,
    })
}
