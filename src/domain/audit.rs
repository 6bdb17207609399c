use {
    chrono::{DateTime, Utc},
    serde::Serialize,
    uuid::Uuid,
};

pub struct NewAuditEntry {
    pub id: Uuid,
    pub participant_id: Option<Uuid>,
    pub payment_id: Option<String>,
    pub action: String,
    pub detail: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl NewAuditEntry {
    pub fn new(action: &str, detail: serde_json::Value) -> Self {
        Self {
            id: Uuid::now_v7(),
            participant_id: None,
            payment_id: None,
            action: action.to_string(),
            detail,
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn to_entry(&self, created_at: DateTime<Utc>) -> AuditEntry {
        AuditEntry {
            id: self.id,
            participant_id: self.participant_id,
            payment_id: self.payment_id.clone(),
            action: self.action.clone(),
            detail: self.detail.clone(),
            ip_address: self.ip_address.clone(),
            user_agent: self.user_agent.clone(),
            created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub participant_id: Option<Uuid>,
    pub payment_id: Option<String>,
    pub action: String,
    pub detail: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Who made the request, as far as the headers tell.
#[derive(Debug, Clone, Default)]
pub struct RequestOrigin {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}
