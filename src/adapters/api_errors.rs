use crate::domain::error::{CheckoutError, ErrorKind, StoreError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Newtype so the domain error can become an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub CheckoutError);

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        Self(err)
    }
}

/// Direct store reads from handlers. The service layer logs its own faults,
/// these have no other place to be logged.
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let err = CheckoutError::from(err);
        if err.kind() == ErrorKind::Faulted {
            tracing::error!(error = %err, "store read failed");
        }
        Self(err)
    }
}

fn client_message(err: &CheckoutError) -> String {
    match err {
        CheckoutError::Validation(msg) => msg.clone(),
        CheckoutError::EmailAlreadyRegistered => {
            "This email has already participated in the giveaway".into()
        }
        CheckoutError::InvalidSignature => "Payment verification failed - invalid signature".into(),
        CheckoutError::AmountMismatch { .. } | CheckoutError::CurrencyMismatch { .. } => {
            "Payment amount does not match expected amount".into()
        }
        CheckoutError::PaymentNotCaptured { .. } => {
            "Payment was not successfully captured".into()
        }
        CheckoutError::PaymentAlreadyProcessed => "This payment has already been processed".into(),
        CheckoutError::PaymentNotFound(_) => {
            "Payment verification failed - payment not found".into()
        }
        CheckoutError::GatewayUnavailable(_) => {
            "Payment service temporarily unavailable. Please try again later.".into()
        }
        CheckoutError::Storage(_) => {
            "Failed to save payment data. Please try again later.".into()
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::Validation | ErrorKind::Rejected => StatusCode::BAD_REQUEST,
            // Detail stays server-side; logged where the fault arose.
            ErrorKind::Faulted => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "success": false,
            "error": self.0.code(),
            "message": client_message(&self.0),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };
    use tracing_subscriber::{Layer, layer::SubscriberExt};

    #[derive(Clone, Default)]
    struct ErrorCount(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for ErrorCount {
        fn on_event(&self, event: &tracing::Event<'_>, _: tracing_subscriber::layer::Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::ERROR {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn errors_logged(f: impl FnOnce()) -> usize {
        let count = ErrorCount::default();
        let subscriber = tracing_subscriber::registry().with(count.clone());
        tracing::subscriber::with_default(subscriber, f);
        count.0.load(Ordering::SeqCst)
    }

    #[test]
    fn rendering_a_fault_does_not_log_it_again() {
        let logged = errors_logged(|| {
            let resp = ApiError(CheckoutError::GatewayUnavailable("timeout".into())).into_response();
            assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        });
        assert_eq!(logged, 0);
    }

    #[test]
    fn store_read_fault_is_logged_once() {
        let logged = errors_logged(|| {
            let resp = ApiError::from(StoreError::Unavailable("closed".into())).into_response();
            assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        });
        assert_eq!(logged, 1);

        let logged = errors_logged(|| {
            let _ = ApiError::from(StoreError::UniqueViolation {
                field: crate::domain::error::UniqueField::Email,
            });
        });
        assert_eq!(logged, 0);
    }

    #[test]
    fn rejections_are_bad_request() {
        let resp = ApiError(CheckoutError::PaymentAlreadyProcessed).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn faults_are_internal_errors() {
        let resp = ApiError(CheckoutError::Storage(StoreError::Unavailable("x".into()))).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let resp = ApiError(CheckoutError::GatewayUnavailable("timeout".into())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn fault_message_hides_detail() {
        let err = CheckoutError::Storage(StoreError::Unavailable("pool timed out on 10.0.0.5".into()));
        assert!(!client_message(&err).contains("10.0.0.5"));
        assert_eq!(err.code(), "storage_error");
    }

    #[test]
    fn currency_mismatch_uses_amount_message() {
        let err = CheckoutError::CurrencyMismatch {
            expected: "INR".into(),
            actual: "USD".into(),
        };
        assert_eq!(
            client_message(&err),
            "Payment amount does not match expected amount"
        );
    }
}
