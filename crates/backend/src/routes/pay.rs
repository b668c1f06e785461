//! Payment initiation route handler.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use larkspur_core::{CartItem, Customer};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::services::notifications::{self, OrderNotification};
use crate::services::payments::{self, PaymentError};
use crate::state::AppState;

/// Checkout request body.
#[derive(Debug, Deserialize)]
pub struct PayRequest {
    pub cart: Vec<CartItem>,
    pub customer: Customer,
}

/// Successful checkout response.
#[derive(Debug, Serialize)]
pub struct PayResponse {
    #[serde(rename = "paymentUrl")]
    pub payment_url: String,
}

/// Initiate a payment for the submitted cart.
///
/// Validates the payload, submits a signed request to the gateway, and on
/// success relays the payment URL while the order notifications go out in
/// the background. Notification failures never affect the response.
#[instrument(skip(state, request), fields(items = request.cart.len()))]
pub async fn pay(
    State(state): State<AppState>,
    Json(request): Json<PayRequest>,
) -> Result<Json<PayResponse>> {
    if request.cart.is_empty() || !request.customer.has_required_fields() {
        return Err(AppError::BadRequest(
            "Incomplete order data: cart items and customer name/email are required.".to_string(),
        ));
    }

    let Some(gateway) = state.gateway() else {
        return Err(AppError::NotConfigured("payment gateway"));
    };
    let Some(payments_config) = state.config().payments.as_ref() else {
        return Err(AppError::NotConfigured("payment gateway"));
    };

    let init = payments::build_init_request(
        payments_config,
        &state.config().shop,
        &request.cart,
        &request.customer,
    )
    .map_err(|error| match error {
        PaymentError::AmountOutOfRange => {
            AppError::BadRequest("Order amount is out of range.".to_string())
        }
        other => AppError::Gateway(other),
    })?;

    let payment_url = gateway.init_payment(&init).await?;
    tracing::info!(order_id = %init.order_id, "payment initiated");

    let total: Decimal = request.cart.iter().map(|item| item.price).sum();
    notifications::spawn_order_emails(
        Arc::clone(state.mailer()),
        state
            .config()
            .email
            .as_ref()
            .map(|email| email.admin_email.clone()),
        state.config().shop.clone(),
        OrderNotification {
            order_id: init.order_id.clone(),
            customer: request.customer,
            items: request.cart,
            total,
            payment_url: payment_url.clone(),
        },
    );

    Ok(Json(PayResponse { payment_url }))
}
