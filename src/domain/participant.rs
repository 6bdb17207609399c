use {
    super::error::CheckoutError,
    super::id::{OrderId, PaymentId},
    super::money::MoneyAmount,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    sha2::{Digest, Sha256},
    std::fmt,
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = CheckoutError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            other => Err(CheckoutError::Validation(format!(
                "unknown payment status: {other}"
            ))),
        }
    }
}

/// SHA-256 over the identifying fields, hex encoded.
pub fn integrity_hash(
    name: &str,
    email: &str,
    phone: Option<&str>,
    amount: MoneyAmount,
    payment_id: &str,
    order_id: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(email.as_bytes());
    hasher.update(phone.unwrap_or("").as_bytes());
    hasher.update(amount.minor().to_string().as_bytes());
    hasher.update(payment_id.as_bytes());
    hasher.update(order_id.as_bytes());
    hex::encode(hasher.finalize())
}

/// Participant as read back from the store.
#[derive(Debug, Clone, Serialize)]
pub struct Participant {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub amount: MoneyAmount,
    pub status: PaymentStatus,
    pub payment_id: String,
    pub order_id: String,
    pub signature: String,
    pub data_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Participant {
    /// `false` if a stored hash no longer matches the row. Rows without a
    /// hash are reported as unverified.
    pub fn integrity_verified(&self) -> bool {
        match &self.data_hash {
            Some(hash) => {
                *hash
                    == integrity_hash(
                        &self.name,
                        &self.email,
                        self.phone.as_deref(),
                        self.amount,
                        &self.payment_id,
                        &self.order_id,
                    )
            }
            None => false,
        }
    }
}

/// For INSERT. The id is generated up front so the transaction can reference it.
#[derive(Debug, Clone)]
pub struct NewParticipant {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    amount: MoneyAmount,
    status: PaymentStatus,
    payment_id: PaymentId,
    order_id: OrderId,
    signature: String,
    data_hash: String,
    created_at: DateTime<Utc>,
}

pub struct NewParticipantParams {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub amount: MoneyAmount,
    pub payment_id: PaymentId,
    pub order_id: OrderId,
    pub signature: String,
}

impl NewParticipant {
    /// Builds a completed participant. No pending rows are ever written.
    pub fn completed(params: NewParticipantParams) -> Self {
        let data_hash = integrity_hash(
            &params.name,
            &params.email,
            params.phone.as_deref(),
            params.amount,
            params.payment_id.as_str(),
            params.order_id.as_str(),
        );
        Self {
            id: Uuid::now_v7(),
            name: params.name,
            email: params.email,
            phone: params.phone,
            amount: params.amount,
            status: PaymentStatus::Completed,
            payment_id: params.payment_id,
            order_id: params.order_id,
            signature: params.signature,
            data_hash,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn amount(&self) -> MoneyAmount {
        self.amount
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn payment_id(&self) -> &PaymentId {
        &self.payment_id
    }

    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn data_hash(&self) -> &str {
        &self.data_hash
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Read-side view of this record as it will look once stored.
    pub fn to_participant(&self) -> Participant {
        Participant {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            amount: self.amount,
            status: self.status,
            payment_id: self.payment_id.as_str().to_string(),
            order_id: self.order_id.as_str().to_string(),
            signature: self.signature.clone(),
            data_hash: Some(self.data_hash.clone()),
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}
