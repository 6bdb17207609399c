//! Razorpay REST client for the two calls checkout needs.
//!
//! Timeouts and transport failures always surface as
//! `GatewayError::Unavailable`, never as a payment state.

use {
    crate::{
        config::{GatewayConfig, Secret},
        domain::{
            BoxFuture,
            error::GatewayError,
            gateway::{GatewayPaymentStatus, OrderHandle, OrderIntent, PaymentGateway, PaymentRecord},
            id::{OrderId, PaymentId},
            money::{Currency, Money, MoneyAmount},
        },
    },
    reqwest::StatusCode,
    serde::{Deserialize, Serialize},
    std::collections::BTreeMap,
};

pub struct RazorpayClient {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: Secret,
}

impl RazorpayClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Unavailable(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        })
    }

    async fn create_order_inner(&self, intent: OrderIntent) -> Result<OrderHandle, GatewayError> {
        let body = CreateOrderBody {
            amount: intent.money.amount().minor(),
            currency: intent.money.currency().as_str(),
            receipt: &intent.receipt,
            notes: &intent.notes,
        };

        let resp = self
            .http
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.key_id, Some(self.key_secret.expose()))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            tracing::error!(%status, detail = %detail, receipt = %intent.receipt, "order creation rejected by gateway");
            return Err(GatewayError::Unavailable(format!("orders.create returned {status}")));
        }

        let order: OrderResponse = resp.json().await.map_err(transport_error)?;
        order.into_handle(&intent.receipt)
    }

    async fn fetch_payment_inner(&self, id: &PaymentId) -> Result<PaymentRecord, GatewayError> {
        let resp = self
            .http
            .get(format!("{}/payments/{}", self.base_url, id.as_str()))
            .basic_auth(&self.key_id, Some(self.key_secret.expose()))
            .send()
            .await
            .map_err(transport_error)?;

        match resp.status() {
            s if s.is_success() => {}
            // Razorpay answers unknown ids with 400 BAD_REQUEST_ERROR.
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => {
                return Err(GatewayError::PaymentNotFound(id.as_str().to_string()));
            }
            s => {
                return Err(GatewayError::Unavailable(format!("payments.fetch returned {s}")));
            }
        }

        let payment: PaymentResponse = resp.json().await.map_err(transport_error)?;
        payment.into_record()
    }
}

impl PaymentGateway for RazorpayClient {
    fn create_order(&self, intent: OrderIntent) -> BoxFuture<'_, Result<OrderHandle, GatewayError>> {
        Box::pin(self.create_order_inner(intent))
    }

    fn fetch_payment(&self, id: &PaymentId) -> BoxFuture<'_, Result<PaymentRecord, GatewayError>> {
        let id = id.clone();
        Box::pin(async move { self.fetch_payment_inner(&id).await })
    }
}

fn transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Unavailable("gateway timed out".into())
    } else {
        GatewayError::Unavailable(format!("gateway request failed: {e}"))
    }
}

fn malformed(what: impl std::fmt::Display) -> GatewayError {
    GatewayError::Unavailable(format!("malformed gateway response: {what}"))
}

#[derive(Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    notes: &'a BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    amount: i64,
    currency: String,
    receipt: Option<String>,
}

impl OrderResponse {
    fn into_handle(self, requested_receipt: &str) -> Result<OrderHandle, GatewayError> {
        Ok(OrderHandle {
            id: OrderId::new(self.id).map_err(malformed)?,
            money: Money::new(
                MoneyAmount::new(self.amount).map_err(malformed)?,
                Currency::try_from(self.currency.as_str()).map_err(malformed)?,
            ),
            receipt: self.receipt.unwrap_or_else(|| requested_receipt.to_string()),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct AcquirerData {
    bank_transaction_id: Option<String>,
    rrn: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    id: String,
    order_id: Option<String>,
    amount: i64,
    currency: String,
    status: String,
    method: Option<String>,
    wallet: Option<String>,
    vpa: Option<String>,
    email: Option<String>,
    contact: Option<String>,
    #[serde(default)]
    notes: serde_json::Value,
    #[serde(default)]
    acquirer_data: Option<AcquirerData>,
}

impl PaymentResponse {
    fn into_record(self) -> Result<PaymentRecord, GatewayError> {
        // Empty notes come back as `[]`.
        let notes = match self.notes {
            serde_json::Value::Object(_) => self.notes,
            _ => serde_json::json!({}),
        };
        let bank_reference = self
            .acquirer_data
            .and_then(|a| a.bank_transaction_id.or(a.rrn));

        Ok(PaymentRecord {
            id: PaymentId::new(self.id).map_err(malformed)?,
            order_id: self
                .order_id
                .filter(|o| !o.is_empty())
                .map(OrderId::new)
                .transpose()
                .map_err(malformed)?,
            money: Money::new(
                MoneyAmount::new(self.amount).map_err(malformed)?,
                Currency::try_from(self.currency.as_str()).map_err(malformed)?,
            ),
            status: GatewayPaymentStatus::from(self.status.as_str()),
            method: self.method,
            bank_reference,
            wallet: self.wallet,
            vpa: self.vpa,
            email: self.email,
            contact: self.contact,
            notes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_captured_upi_payment() {
        let raw = serde_json::json!({
            "id": "pay_29QQoUBi66xm2f",
            "entity": "payment",
            "amount": 1000,
            "currency": "INR",
            "status": "captured",
            "order_id": "order_9A33XWu170gUtm",
            "method": "upi",
            "vpa": "asha@okbank",
            "wallet": null,
            "email": "asha@example.com",
            "contact": "+919876543210",
            "notes": [],
            "acquirer_data": { "rrn": "313436018052" }
        });
        let payment: PaymentResponse = serde_json::from_value(raw).unwrap();
        let record = payment.into_record().unwrap();

        assert_eq!(record.id.as_str(), "pay_29QQoUBi66xm2f");
        assert_eq!(record.order_id.unwrap().as_str(), "order_9A33XWu170gUtm");
        assert_eq!(record.money.amount().minor(), 1000);
        assert_eq!(record.money.currency(), Currency::Inr);
        assert_eq!(record.status, GatewayPaymentStatus::Captured);
        assert_eq!(record.vpa.as_deref(), Some("asha@okbank"));
        assert_eq!(record.bank_reference.as_deref(), Some("313436018052"));
        assert_eq!(record.notes, serde_json::json!({}));
    }

    #[test]
    fn unknown_status_is_kept_verbatim() {
        let raw = serde_json::json!({
            "id": "pay_1", "amount": 500, "currency": "INR", "status": "disputed"
        });
        let record = serde_json::from_value::<PaymentResponse>(raw)
            .unwrap()
            .into_record()
            .unwrap();
        assert_eq!(record.status, GatewayPaymentStatus::Other("disputed".into()));
        assert!(record.order_id.is_none());
    }

    #[test]
    fn negative_amount_is_malformed() {
        let raw = serde_json::json!({
            "id": "pay_1", "amount": -5, "currency": "INR", "status": "captured"
        });
        let err = serde_json::from_value::<PaymentResponse>(raw)
            .unwrap()
            .into_record()
            .unwrap_err();
        assert!(matches!(err, GatewayError::Unavailable(_)));
    }

    #[test]
    fn order_response_falls_back_to_requested_receipt() {
        let order = OrderResponse {
            id: "order_1".into(),
            amount: 1000,
            currency: "INR".into(),
            receipt: None,
        };
        let handle = order.into_handle("giveaway_1_abc").unwrap();
        assert_eq!(handle.receipt, "giveaway_1_abc");
        assert_eq!(handle.money.amount().minor(), 1000);
    }
}
