// SPDX-FileCopyrightText: 2026 Intercab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Handles GET /health, GET /api/orders/active, GET /api/locations and
//! POST /api/payments/webhook.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use intercab_core::types::{Location, Order, OrderId, OrderStatus};
use intercab_dispatch::{PaymentOutcome, apply_payment_status};

use crate::server::GatewayState;
use crate::signature;

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Public view of an order; rider contact details stay out of the web API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderView {
    pub id: OrderId,
    pub status: OrderStatus,
    pub origin: String,
    pub destination: String,
    pub tariff: String,
    pub price: i64,
    pub currency: String,
    pub passengers: u32,
    /// `None` means "as soon as possible".
    pub pickup_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            status: order.status,
            origin: order.origin_name,
            destination: order.destination_name,
            tariff: order.tariff_name,
            price: order.price,
            currency: order.currency,
            passengers: order.passengers,
            pickup_time: order.pickup_time,
            created_at: order.created_at,
        }
    }
}

/// Payment provider callback body.
#[derive(Debug, Deserialize)]
pub struct PaymentCallback {
    #[serde(rename = "InvoiceId")]
    pub invoice_id: InvoiceId,
    #[serde(rename = "Amount", default)]
    pub amount: Option<serde_json::Number>,
    #[serde(rename = "Status")]
    pub status: String,
}

/// Providers send the invoice id either as a number or as a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum InvoiceId {
    Number(i64),
    Text(String),
}

impl InvoiceId {
    pub fn order_id(&self) -> Option<OrderId> {
        match self {
            InvoiceId::Number(n) => Some(*n),
            InvoiceId::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Acknowledgement body the payment provider expects.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct WebhookAck {
    pub code: i32,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /api/orders/active
pub async fn get_active_orders(State(state): State<GatewayState>) -> Response {
    match state.ctx.storage.active_orders().await {
        Ok(orders) => {
            let views: Vec<OrderView> = orders.into_iter().map(OrderView::from).collect();
            Json(views).into_response()
        }
        Err(e) => {
            warn!(error = %e, "failed to list active orders");
            error(StatusCode::INTERNAL_SERVER_ERROR, "failed to list active orders")
        }
    }
}

/// GET /api/locations
pub async fn get_locations(State(state): State<GatewayState>) -> Response {
    match state.ctx.storage.list_locations().await {
        Ok(locations) => Json::<Vec<Location>>(locations).into_response(),
        Err(e) => {
            warn!(error = %e, "failed to list locations");
            error(StatusCode::INTERNAL_SERVER_ERROR, "failed to list locations")
        }
    }
}

/// POST /api/payments/webhook
///
/// The body is taken raw so the signature is checked over the exact bytes the
/// provider signed.
pub async fn post_payment_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(secret) = state.webhook_secret.as_deref() {
        let header = headers
            .get(signature::SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok());
        if !signature::verify(secret, &body, header) {
            warn!("payment webhook rejected: bad signature");
            return error(StatusCode::UNAUTHORIZED, "invalid signature");
        }
    }

    let callback: PaymentCallback = match serde_json::from_slice(&body) {
        Ok(callback) => callback,
        Err(e) => return error(StatusCode::BAD_REQUEST, format!("malformed body: {e}")),
    };
    let Some(order_id) = callback.invoice_id.order_id() else {
        return error(StatusCode::BAD_REQUEST, "InvoiceId is not an order id");
    };

    match apply_payment_status(&state.ctx, order_id, &callback.status).await {
        Ok(outcome) => {
            match outcome {
                PaymentOutcome::Published(_) => {
                    info!(order_id, amount = ?callback.amount, "payment settled order")
                }
                PaymentOutcome::AlreadyHandled => {
                    info!(order_id, "payment callback for an order already handled")
                }
                PaymentOutcome::Ignored => {}
            }
            Json(WebhookAck { code: 0 }).into_response()
        }
        Err(e) => {
            warn!(order_id, error = %e, "payment callback failed");
            error(StatusCode::INTERNAL_SERVER_ERROR, "failed to apply payment")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::Request;
    use intercab_core::types::{NewOrder, Role};
    use intercab_dispatch::approval;
    use intercab_test_utils::TestHarness;
    use tower::ServiceExt;

    use crate::server::{GatewayState, router};

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn pending_order(harness: &mut TestHarness) -> Order {
        let rider = harness.register_rider(100, "+79990000100").await.unwrap();
        let new = NewOrder {
            rider_id: rider.id,
            origin_id: harness.locations[0],
            destination_id: harness.locations[1],
            tariff_id: harness.tariffs[0],
            price: 900,
            currency: "RUB".into(),
            passengers: 1,
            pickup_time: None,
            rider_username: rider.username.clone(),
            rider_phone: rider.phone.clone(),
        };
        approval::submit_order(&harness.ctx, &new).await.unwrap()
    }

    fn webhook(body: &str, signature: Option<String>) -> Request<Body> {
        let mut request = Request::post("/api/payments/webhook")
            .header("content-type", "application/json");
        if let Some(signature) = signature {
            request = request.header(signature::SIGNATURE_HEADER, signature);
        }
        request.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let harness = TestHarness::builder().build().await.unwrap();
        let app = router(GatewayState::new(harness.ctx.clone(), None));

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = body_json(response).await;
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn locations_are_listed() {
        let harness = TestHarness::builder().build().await.unwrap();
        let app = router(GatewayState::new(harness.ctx.clone(), None));

        let response = app
            .oneshot(Request::get("/api/locations").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let locations: Vec<Location> = body_json(response).await;
        let names: Vec<_> = locations.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Airport", "Downtown"]);
    }

    #[tokio::test]
    async fn unsigned_payment_publishes_without_secret() {
        let mut harness = TestHarness::builder().build().await.unwrap();
        let driver = harness.active_driver(200, "+70000000200").await.unwrap();
        let order = pending_order(&mut harness).await;
        let app = router(GatewayState::new(harness.ctx.clone(), None));

        let body = format!(r#"{{"InvoiceId":"{}","Amount":900,"Status":"Completed"}}"#, order.id);
        let response = app.clone().oneshot(webhook(&body, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json::<WebhookAck>(response).await, WebhookAck { code: 0 });

        let stored = harness.storage.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Active);
        assert_eq!(
            harness.channel(Role::Driver).sent_to(driver.platform_id).await.len(),
            1
        );

        let response = app
            .oneshot(Request::get("/api/orders/active").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let views: Vec<OrderView> = body_json(response).await;
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].id, order.id);
        assert_eq!(views[0].origin, "Airport");
    }

    #[tokio::test]
    async fn repeated_payment_is_acknowledged() {
        let mut harness = TestHarness::builder().build().await.unwrap();
        let order = pending_order(&mut harness).await;
        let app = router(GatewayState::new(harness.ctx.clone(), None));

        let body = format!(r#"{{"InvoiceId":{},"Amount":900,"Status":"Authorized"}}"#, order.id);
        for _ in 0..2 {
            let response = app.clone().oneshot(webhook(&body, None)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body_json::<WebhookAck>(response).await, WebhookAck { code: 0 });
        }
    }

    #[tokio::test]
    async fn signature_is_enforced_when_secret_set() {
        let mut harness = TestHarness::builder().build().await.unwrap();
        let order = pending_order(&mut harness).await;
        let app = router(GatewayState::new(harness.ctx.clone(), Some("s3cret")));
        let body = format!(r#"{{"InvoiceId":{},"Amount":900,"Status":"Completed"}}"#, order.id);

        let response = app.clone().oneshot(webhook(&body, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bad = signature::sign("other", body.as_bytes());
        let response = app.clone().oneshot(webhook(&body, Some(bad))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let stored = harness.storage.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);

        let good = signature::sign("s3cret", body.as_bytes());
        let response = app.oneshot(webhook(&body, Some(good))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let stored = harness.storage.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Active);
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let harness = TestHarness::builder().build().await.unwrap();
        let app = router(GatewayState::new(harness.ctx.clone(), None));

        let response = app.clone().oneshot(webhook("not json", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(webhook(r#"{"InvoiceId":"abc","Status":"Completed"}"#, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn declined_payment_leaves_order_pending() {
        let mut harness = TestHarness::builder().build().await.unwrap();
        let order = pending_order(&mut harness).await;
        let app = router(GatewayState::new(harness.ctx.clone(), None));

        let body = format!(r#"{{"InvoiceId":{},"Amount":900,"Status":"Declined"}}"#, order.id);
        let response = app.oneshot(webhook(&body, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let stored = harness.storage.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
    }
}
