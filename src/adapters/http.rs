use {
    crate::{
        AppState,
        adapters::api_errors::ApiError,
        domain::{
            audit::{AuditEntry, RequestOrigin},
            error::{CheckoutError, UniqueField},
            participant::{Participant, PaymentStatus},
            transaction::Transaction,
        },
        services::{
            checkout::{OrderRequest, VerificationRequest},
            stats, validation,
        },
    },
    axum::{
        Json, Router,
        extract::{DefaultBodyLimit, Path, State, rejection::JsonRejection},
        http::{HeaderMap, Method, StatusCode},
        response::{IntoResponse, Response},
        routing::{get, post},
    },
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::time::Duration,
    tower_http::{
        cors::{Any, CorsLayer},
        timeout::TimeoutLayer,
        trace::TraceLayer,
    },
    uuid::Uuid,
};

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler).options(options_handler))
        .route("/create-order", post(create_order_handler).options(options_handler))
        .route("/verify-payment", post(verify_payment_handler).options(options_handler))
        .route("/participants", get(participants_handler).options(options_handler))
        .route(
            "/participants/check-email/{email}",
            get(check_email_handler).options(options_handler),
        )
        .route(
            "/participants/{id}",
            get(participant_detail_handler).options(options_handler),
        )
        .route(
            "/participants/{id}/logs",
            get(participant_logs_handler).options(options_handler),
        )
        .route("/stats", get(stats_handler).options(options_handler))
        .layer(DefaultBodyLimit::max(64 * 1024)) // checkout payloads are well under 1 KB
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Accepts `10`, `10.5` or `"10"`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(f64),
    Text(String),
}

impl AmountInput {
    fn to_major(field: Option<&Self>) -> Result<f64, CheckoutError> {
        match field {
            Some(Self::Number(n)) => Ok(*n),
            Some(Self::Text(s)) => s
                .trim()
                .parse()
                .map_err(|_| CheckoutError::Validation("amount must be a number".into())),
            None => Err(CheckoutError::Validation("amount is required".into())),
        }
    }
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError(CheckoutError::Validation(e.body_text())))
}

fn request_origin(headers: &HeaderMap) -> RequestOrigin {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };
    RequestOrigin {
        ip_address: header("x-forwarded-for")
            .and_then(|v| v.split(',').next().map(|s| s.trim().to_string())),
        user_agent: header("user-agent"),
    }
}

fn not_found(what: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "success": false,
            "error": "not_found",
            "message": format!("{what} not found"),
        })),
    )
        .into_response()
}

// ── Views ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ParticipantView {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    amount: f64,
    payment_id: String,
    order_id: String,
    status: PaymentStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<&Participant> for ParticipantView {
    fn from(p: &Participant) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            email: p.email.clone(),
            phone: p.phone.clone(),
            amount: p.amount.major(),
            payment_id: p.payment_id.clone(),
            order_id: p.order_id.clone(),
            status: p.status,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ParticipantDetailView {
    #[serde(flatten)]
    participant: ParticipantView,
    payment_method: Option<String>,
    bank_reference: Option<String>,
    wallet: Option<String>,
    vpa: Option<String>,
    currency: Option<String>,
    integrity_verified: bool,
}

impl ParticipantDetailView {
    fn new(p: &Participant, t: Option<&Transaction>) -> Self {
        Self {
            participant: p.into(),
            payment_method: t.and_then(|t| t.method.clone()),
            bank_reference: t.and_then(|t| t.bank_reference.clone()),
            wallet: t.and_then(|t| t.wallet.clone()),
            vpa: t.and_then(|t| t.vpa.clone()),
            currency: t.map(|t| t.currency.as_str().to_string()),
            integrity_verified: p.integrity_verified(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuditView {
    action: String,
    details: serde_json::Value,
    ip_address: Option<String>,
    user_agent: Option<String>,
    timestamp: DateTime<Utc>,
}

impl From<AuditEntry> for AuditView {
    fn from(e: AuditEntry) -> Self {
        Self {
            action: e.action,
            details: e.detail,
            ip_address: e.ip_address,
            user_agent: e.user_agent,
            timestamp: e.created_at,
        }
    }
}

// ── Handlers ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderBody {
    amount: Option<AmountInput>,
    #[serde(default)]
    participant_name: String,
    #[serde(default)]
    participant_email: String,
    participant_phone: Option<String>,
}

pub async fn create_order_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateOrderBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let body = json_body(payload)?;
    let req = OrderRequest {
        amount: AmountInput::to_major(body.amount.as_ref())?,
        name: body.participant_name,
        email: body.participant_email,
        phone: body.participant_phone,
    };

    let created = state.checkout.create_order(req).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "order": {
            "id": created.order.id.as_str(),
            "amount": created.order.money.amount().minor(),
            "currency": created.order.money.currency().as_str(),
            "receipt": created.order.receipt,
        },
        "participant": {
            "name": created.entrant.name,
            "email": created.entrant.email,
            "phone": created.entrant.phone,
        },
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentBody {
    #[serde(default, rename = "razorpay_payment_id")]
    payment_id: String,
    #[serde(default, rename = "razorpay_order_id")]
    order_id: String,
    #[serde(default, rename = "razorpay_signature")]
    signature: String,
    #[serde(default)]
    participant_name: String,
    #[serde(default)]
    participant_email: String,
    participant_phone: Option<String>,
    amount: Option<AmountInput>,
}

pub async fn verify_payment_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<VerifyPaymentBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let body = json_body(payload)?;
    let req = VerificationRequest {
        amount: AmountInput::to_major(body.amount.as_ref())?,
        payment_id: body.payment_id,
        order_id: body.order_id,
        signature: body.signature,
        name: body.participant_name,
        email: body.participant_email,
        phone: body.participant_phone,
    };

    let verified = state
        .checkout
        .verify_payment(req, &request_origin(&headers))
        .await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Payment verified successfully",
        "participant": {
            "id": verified.id,
            "name": verified.name,
            "email": verified.email,
            "paymentId": verified.payment_id.as_str(),
        },
    })))
}

pub async fn participants_handler(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let participants = state.store.scan_by_status(PaymentStatus::Completed).await?;
    let views: Vec<ParticipantView> = participants.iter().map(ParticipantView::from).collect();

    Ok(Json(serde_json::json!({
        "success": true,
        "totalCount": views.len(),
        "participants": views,
    })))
}

pub async fn participant_detail_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let Some((participant, transaction)) = state.store.participant_detail(id).await? else {
        return Ok(not_found("participant"));
    };

    if !participant.integrity_verified() {
        tracing::warn!(participant_id = %id, "participant integrity hash mismatch");
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "participant": ParticipantDetailView::new(&participant, transaction.as_ref()),
    }))
    .into_response())
}

pub async fn participant_logs_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    if state.store.participant_detail(id).await?.is_none() {
        return Ok(not_found("participant"));
    }

    let logs: Vec<AuditView> = state
        .store
        .audit_trail(id)
        .await?
        .into_iter()
        .map(AuditView::from)
        .collect();

    Ok(Json(serde_json::json!({
        "success": true,
        "logs": logs,
    }))
    .into_response())
}

pub async fn check_email_handler(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let email = validation::email(&email)?;

    let existing = match state
        .store
        .find_by_unique_field(UniqueField::Email, &email)
        .await?
    {
        Some(id) => state.store.participant_detail(id).await?.map(|(p, _)| p),
        None => None,
    };

    Ok(Json(serde_json::json!({
        "success": true,
        "exists": existing.is_some(),
        "participant": existing.map(|p| serde_json::json!({
            "name": p.name,
            "paymentDate": p.created_at,
        })),
    })))
}

pub async fn stats_handler(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let stats = stats::compute(&*state.store).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "stats": stats,
    })))
}

/// `OPTIONS` without CORS preflight headers. Real preflights are answered by
/// the CORS layer before they reach the router.
pub async fn options_handler() -> StatusCode {
    StatusCode::OK
}

/// Process liveness plus a storage ping. Always 200 while the process serves.
pub async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let storage = match state.store.ping().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::error!(error = %e, "storage health check failed");
            "unavailable"
        }
    };
    Json(serde_json::json!({"status": "ok", "storage": storage}))
}
