use {
    super::gateway::PaymentRecord,
    super::money::Currency,
    super::money::MoneyAmount,
    chrono::{DateTime, Utc},
    serde::Serialize,
    uuid::Uuid,
};

/// Financial detail row, owned by exactly one participant.
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    pub id: Uuid,
    pub participant_id: Uuid,
    pub payment_id: String,
    pub order_id: String,
    pub amount: MoneyAmount,
    pub currency: Currency,
    pub status: String,
    pub method: Option<String>,
    pub bank_reference: Option<String>,
    pub wallet: Option<String>,
    pub vpa: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub notes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    id: Uuid,
    participant_id: Uuid,
    record: PaymentRecord,
    order_id: String,
}

impl NewTransaction {
    /// Mirrors the gateway record. `order_id` is the one the signature was
    /// checked against, in case the record itself omits it.
    pub fn from_record(participant_id: Uuid, order_id: &str, record: PaymentRecord) -> Self {
        let order_id = record
            .order_id
            .as_ref()
            .map(|id| id.as_str().to_string())
            .unwrap_or_else(|| order_id.to_string());
        Self {
            id: Uuid::now_v7(),
            participant_id,
            record,
            order_id,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn participant_id(&self) -> Uuid {
        self.participant_id
    }

    pub fn payment_id(&self) -> &str {
        self.record.id.as_str()
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn amount(&self) -> MoneyAmount {
        self.record.money.amount()
    }

    pub fn currency(&self) -> Currency {
        self.record.money.currency()
    }

    pub fn status(&self) -> &str {
        self.record.status.as_str()
    }

    pub fn record(&self) -> &PaymentRecord {
        &self.record
    }

    pub fn to_transaction(&self, created_at: DateTime<Utc>) -> Transaction {
        Transaction {
            id: self.id,
            participant_id: self.participant_id,
            payment_id: self.payment_id().to_string(),
            order_id: self.order_id.clone(),
            amount: self.amount(),
            currency: self.currency(),
            status: self.status().to_string(),
            method: self.record.method.clone(),
            bank_reference: self.record.bank_reference.clone(),
            wallet: self.record.wallet.clone(),
            vpa: self.record.vpa.clone(),
            email: self.record.email.clone(),
            contact: self.record.contact.clone(),
            notes: self.record.notes.clone(),
            created_at,
        }
    }
}
