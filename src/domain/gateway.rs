use {
    super::error::GatewayError,
    super::id::{OrderId, PaymentId},
    super::money::Money,
    super::BoxFuture,
    std::collections::BTreeMap,
    std::fmt,
};

/// Request to mint a gateway order. Not persisted locally.
#[derive(Debug, Clone)]
pub struct OrderIntent {
    pub money: Money,
    pub receipt: String,
    pub notes: BTreeMap<String, String>,
}

/// What the gateway hands back for a created order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderHandle {
    pub id: OrderId,
    pub money: Money,
    pub receipt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayPaymentStatus {
    Created,
    Authorized,
    Captured,
    Failed,
    Refunded,
    Other(String),
}

impl GatewayPaymentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::Authorized => "authorized",
            Self::Captured => "captured",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for GatewayPaymentStatus {
    fn from(s: &str) -> Self {
        match s {
            "created" => Self::Created,
            "authorized" => Self::Authorized,
            "captured" => Self::Captured,
            "failed" => Self::Failed,
            "refunded" => Self::Refunded,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for GatewayPaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The gateway's ground truth for a payment. Amount and status are only
/// ever taken from here, never from the client.
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub order_id: Option<OrderId>,
    pub money: Money,
    pub status: GatewayPaymentStatus,
    pub method: Option<String>,
    pub bank_reference: Option<String>,
    pub wallet: Option<String>,
    pub vpa: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub notes: serde_json::Value,
}

pub trait PaymentGateway: Send + Sync {
    /// Mints a new order. Not idempotent: every call may create one.
    fn create_order(&self, intent: OrderIntent) -> BoxFuture<'_, Result<OrderHandle, GatewayError>>;

    fn fetch_payment(&self, id: &PaymentId) -> BoxFuture<'_, Result<PaymentRecord, GatewayError>>;
}
