//! Checkout orchestration.
//!
//! Two pipelines. Order creation validates the entrant, fast-fails on a
//! known email and mints a gateway order. Verification authenticates the
//! callback, fetches the gateway's record of the payment and only records
//! the entrant once every gate has passed:
//!
//! ```text
//! Received -> SignatureChecked -> PaymentFetched -> AmountVerified
//!          -> StatusVerified -> DedupChecked -> Recorded
//! ```
//!
//! Any gate failing halts the pipeline. Nothing is retried internally;
//! the client starts a new attempt.

use {
    crate::{
        config::CheckoutSettings,
        domain::{
            audit::{NewAuditEntry, RequestOrigin},
            error::{CheckoutError, ErrorKind, StoreError, UniqueField},
            gateway::{GatewayPaymentStatus, OrderHandle, OrderIntent, PaymentGateway},
            id::{OrderId, PaymentId},
            money::{Money, MoneyAmount},
            participant::{NewParticipant, NewParticipantParams},
            signature,
            store::ParticipantStore,
        },
        services::{idempotency, recorder, validation},
    },
    chrono::Utc,
    derive_more::Display,
    std::{collections::BTreeMap, sync::Arc},
    tracing::Instrument,
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
pub enum VerificationStage {
    #[display("received")]
    Received,
    #[display("signature_checked")]
    SignatureChecked,
    #[display("payment_fetched")]
    PaymentFetched,
    #[display("amount_verified")]
    AmountVerified,
    #[display("status_verified")]
    StatusVerified,
    #[display("dedup_checked")]
    DedupChecked,
    #[display("recorded")]
    Recorded,
}

/// Failure plus the last gate that passed before it.
struct Halt {
    stage: VerificationStage,
    error: CheckoutError,
}

trait AtStage<T> {
    fn at(self, stage: VerificationStage) -> Result<T, Halt>;
}

impl<T, E: Into<CheckoutError>> AtStage<T> for Result<T, E> {
    fn at(self, stage: VerificationStage) -> Result<T, Halt> {
        self.map_err(|e| Halt {
            stage,
            error: e.into(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    /// Major units as typed by the entrant.
    pub amount: f64,
}

#[derive(Debug, Clone)]
pub struct Entrant {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreatedOrder {
    pub order: OrderHandle,
    pub entrant: Entrant,
}

#[derive(Debug, Clone)]
pub struct VerificationRequest {
    pub payment_id: String,
    pub order_id: String,
    pub signature: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    /// Major units claimed by the client. Checked, never trusted.
    pub amount: f64,
}

#[derive(Debug, Clone)]
pub struct VerifiedParticipant {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub payment_id: PaymentId,
}

struct ValidVerification {
    payment_id: PaymentId,
    order_id: OrderId,
    signature: String,
    entrant: Entrant,
    claimed: MoneyAmount,
}

impl VerificationRequest {
    fn validate(self) -> Result<ValidVerification, CheckoutError> {
        let signature = validation::required("signature", &self.signature)?.to_string();
        Ok(ValidVerification {
            payment_id: PaymentId::new(self.payment_id)?,
            order_id: OrderId::new(self.order_id)?,
            signature,
            entrant: Entrant {
                name: validation::name(&self.name)?,
                email: validation::email(&self.email)?,
                phone: validation::phone(self.phone.as_deref()),
            },
            claimed: MoneyAmount::from_major(self.amount)?,
        })
    }
}

/// Fresh per call, so a retried create-order never reuses a receipt.
pub fn new_receipt() -> String {
    let entropy = Uuid::new_v4().simple().to_string();
    format!("giveaway_{}_{}", Utc::now().timestamp_millis(), &entropy[..9])
}

#[derive(Clone)]
pub struct Checkout {
    store: Arc<dyn ParticipantStore>,
    gateway: Arc<dyn PaymentGateway>,
    settings: CheckoutSettings,
}

impl Checkout {
    pub fn new(
        store: Arc<dyn ParticipantStore>,
        gateway: Arc<dyn PaymentGateway>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            store,
            gateway,
            settings,
        }
    }

    #[tracing::instrument(name = "create_order", skip_all, fields(email = tracing::field::Empty))]
    pub async fn create_order(&self, req: OrderRequest) -> Result<CreatedOrder, CheckoutError> {
        let entrant = Entrant {
            name: validation::name(&req.name)?,
            email: validation::email(&req.email)?,
            phone: validation::phone(req.phone.as_deref()),
        };
        let amount = validation::entry_amount(req.amount, self.settings.min_amount)?;
        tracing::Span::current().record("email", tracing::field::display(&entrant.email));

        // Advisory: the unique constraint at record time is authoritative.
        let known = idempotency::exists(&*self.store, UniqueField::Email, &entrant.email)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "email lookup failed"))?;
        if known {
            tracing::warn!("email already registered");
            return Err(CheckoutError::EmailAlreadyRegistered);
        }

        let mut notes = BTreeMap::new();
        notes.insert("participant_name".to_string(), entrant.name.clone());
        notes.insert("participant_email".to_string(), entrant.email.clone());
        if let Some(phone) = &entrant.phone {
            notes.insert("participant_phone".to_string(), phone.clone());
        }

        let intent = OrderIntent {
            money: Money::new(amount, self.settings.currency),
            receipt: new_receipt(),
            notes,
        };
        let receipt = intent.receipt.clone();

        let order = self.gateway.create_order(intent).await.map_err(|e| {
            tracing::error!(receipt = %receipt, error = %e, "order creation failed");
            CheckoutError::from(e)
        })?;

        tracing::info!(order_id = %order.id, amount = %order.money.amount(), "order created");
        Ok(CreatedOrder { order, entrant })
    }

    #[tracing::instrument(
        name = "verify_payment",
        skip_all,
        fields(payment_id = %req.payment_id, order_id = %req.order_id, stage = tracing::field::Empty)
    )]
    pub async fn verify_payment(
        &self,
        req: VerificationRequest,
        origin: &RequestOrigin,
    ) -> Result<VerifiedParticipant, CheckoutError> {
        let valid = req.validate()?;

        // Runs detached so a dropped caller cannot abandon a half-written record.
        let this = self.clone();
        let origin = origin.clone();
        let task = tokio::spawn(
            async move { this.settle_verification(valid, &origin).await }.in_current_span(),
        );

        task.await.unwrap_or_else(|e| {
            tracing::error!(error = %e, "verification task failed");
            Err(CheckoutError::Storage(StoreError::Unavailable(format!(
                "verification task failed: {e}"
            ))))
        })
    }

    async fn settle_verification(
        &self,
        valid: ValidVerification,
        origin: &RequestOrigin,
    ) -> Result<VerifiedParticipant, CheckoutError> {
        let payment_id = valid.payment_id.clone();

        match self.run_verification(valid, origin).await {
            Ok(verified) => {
                tracing::Span::current()
                    .record("stage", tracing::field::display(VerificationStage::Recorded));
                Ok(verified)
            }
            Err(Halt { stage, error }) => {
                tracing::Span::current().record("stage", tracing::field::display(stage));
                match error.kind() {
                    ErrorKind::Faulted => {
                        tracing::error!(error = %error, "verification faulted")
                    }
                    _ => tracing::warn!(error = %error, "verification rejected"),
                }
                // Past the signature gate the caller is known to hold a real
                // payment, so the rejection is worth keeping for reconciliation.
                if error.kind() == ErrorKind::Rejected && stage >= VerificationStage::SignatureChecked
                {
                    self.audit_rejection(&payment_id, stage, &error, origin).await;
                }
                Err(error)
            }
        }
    }

    async fn run_verification(
        &self,
        req: ValidVerification,
        origin: &RequestOrigin,
    ) -> Result<VerifiedParticipant, Halt> {
        use VerificationStage::*;

        if !signature::verify(
            req.payment_id.as_str(),
            req.order_id.as_str(),
            &req.signature,
            self.settings.key_secret.expose(),
        ) {
            return Err(CheckoutError::InvalidSignature).at(Received);
        }

        let record = self
            .gateway
            .fetch_payment(&req.payment_id)
            .await
            .at(SignatureChecked)?;

        if record.money.currency() != self.settings.currency {
            return Err(CheckoutError::CurrencyMismatch {
                expected: self.settings.currency.to_string(),
                actual: record.money.currency().to_string(),
            })
            .at(PaymentFetched);
        }
        let actual = record.money.amount();
        if actual != req.claimed {
            return Err(CheckoutError::AmountMismatch {
                claimed: req.claimed.minor(),
                actual: actual.minor(),
            })
            .at(PaymentFetched);
        }

        if record.status != GatewayPaymentStatus::Captured {
            return Err(CheckoutError::PaymentNotCaptured {
                status: record.status.to_string(),
            })
            .at(AmountVerified);
        }

        if idempotency::exists(&*self.store, UniqueField::PaymentId, req.payment_id.as_str())
            .await
            .at(StatusVerified)?
        {
            return Err(CheckoutError::PaymentAlreadyProcessed).at(StatusVerified);
        }

        let participant = NewParticipant::completed(NewParticipantParams {
            name: req.entrant.name.clone(),
            email: req.entrant.email.clone(),
            phone: req.entrant.phone.clone(),
            amount: actual,
            payment_id: req.payment_id.clone(),
            order_id: req.order_id.clone(),
            signature: req.signature.clone(),
        });

        let id = recorder::record(&*self.store, &participant, record, origin)
            .await
            .at(DedupChecked)?;

        Ok(VerifiedParticipant {
            id,
            name: req.entrant.name,
            email: req.entrant.email,
            payment_id: req.payment_id,
        })
    }

    async fn audit_rejection(
        &self,
        payment_id: &PaymentId,
        stage: VerificationStage,
        error: &CheckoutError,
        origin: &RequestOrigin,
    ) {
        let mut audit = NewAuditEntry::new(
            "verification_rejected",
            serde_json::json!({
                "stage": stage.to_string(),
                "reason": error.code(),
                "message": error.to_string(),
            }),
        );
        audit.payment_id = Some(payment_id.as_str().to_string());
        audit.ip_address = origin.ip_address.clone();
        audit.user_agent = origin.user_agent.clone();

        if let Err(e) = self.store.append_audit(&audit).await {
            tracing::error!(error = %e, "failed to write rejection audit entry");
        }
    }
}
