use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::error::CheckoutError;

/// Gateway payment identifier (`pay_xxx`). Unique per gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(String);

impl PaymentId {
    pub fn new(id: impl Into<String>) -> Result<Self, CheckoutError> {
        let id = id.into();
        let id = id.trim();
        if id.is_empty() {
            return Err(CheckoutError::Validation("payment id is required".into()));
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Gateway order identifier (`order_xxx`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> Result<Self, CheckoutError> {
        let id = id.into();
        let id = id.trim();
        if id.is_empty() {
            return Err(CheckoutError::Validation("order id is required".into()));
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
