use {derive_more::Display, thiserror::Error};

/// Unique keys the store enforces. Also the idempotency keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum UniqueField {
    #[display("email")]
    Email,
    #[display("payment_id")]
    PaymentId,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated on {field}")]
    UniqueViolation { field: UniqueField },

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    #[error("payment not found: {0}")]
    PaymentNotFound(String),
}

/// How a failure is reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request, client fault.
    Validation,
    /// Business rule said no. Terminal for this attempt.
    Rejected,
    /// Gateway or storage failure.
    Faulted,
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("email already registered")]
    EmailAlreadyRegistered,

    #[error("invalid payment signature")]
    InvalidSignature,

    #[error("amount mismatch: gateway has {actual}, claimed {claimed}")]
    AmountMismatch { claimed: i64, actual: i64 },

    #[error("currency mismatch: gateway has {actual}, expected {expected}")]
    CurrencyMismatch { expected: String, actual: String },

    #[error("payment not captured (status {status})")]
    PaymentNotCaptured { status: String },

    #[error("payment already processed")]
    PaymentAlreadyProcessed,

    #[error("payment not found at gateway: {0}")]
    PaymentNotFound(String),

    #[error("gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("storage: {0}")]
    Storage(StoreError),
}

impl CheckoutError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::EmailAlreadyRegistered
            | Self::InvalidSignature
            | Self::AmountMismatch { .. }
            | Self::CurrencyMismatch { .. }
            | Self::PaymentNotCaptured { .. }
            | Self::PaymentAlreadyProcessed
            | Self::PaymentNotFound(_) => ErrorKind::Rejected,
            Self::GatewayUnavailable(_) | Self::Storage(_) => ErrorKind::Faulted,
        }
    }

    /// Stable machine-readable code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_failed",
            Self::EmailAlreadyRegistered => "email_already_registered",
            Self::InvalidSignature => "invalid_signature",
            Self::AmountMismatch { .. } | Self::CurrencyMismatch { .. } => "amount_mismatch",
            Self::PaymentNotCaptured { .. } => "payment_not_captured",
            Self::PaymentAlreadyProcessed => "payment_already_processed",
            Self::PaymentNotFound(_) => "payment_not_found",
            Self::GatewayUnavailable(_) => "gateway_unavailable",
            Self::Storage(_) => "storage_error",
        }
    }
}

impl From<StoreError> for CheckoutError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation {
                field: UniqueField::PaymentId,
            } => Self::PaymentAlreadyProcessed,
            StoreError::UniqueViolation {
                field: UniqueField::Email,
            } => Self::EmailAlreadyRegistered,
            other => Self::Storage(other),
        }
    }
}

impl From<GatewayError> for CheckoutError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unavailable(msg) => Self::GatewayUnavailable(msg),
            GatewayError::PaymentNotFound(id) => Self::PaymentNotFound(id),
        }
    }
}
