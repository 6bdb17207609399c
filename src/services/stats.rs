use {
    crate::domain::{
        error::CheckoutError,
        participant::{Participant, PaymentStatus},
        store::ParticipantStore,
    },
    serde::Serialize,
};

/// Aggregate over completed participants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_participants: u64,
    /// Major units.
    pub total_collected: f64,
    /// Major units; 0 when nobody has entered yet.
    pub average_amount: f64,
}

impl Stats {
    pub fn from_participants<'a>(participants: impl IntoIterator<Item = &'a Participant>) -> Self {
        let (count, total_minor) = participants
            .into_iter()
            .filter(|p| p.status == PaymentStatus::Completed)
            .fold((0u64, 0i128), |(n, sum), p| {
                (n + 1, sum + i128::from(p.amount.minor()))
            });

        let average_amount = if count == 0 {
            0.0
        } else {
            total_minor as f64 / count as f64 / 100.0
        };

        Self {
            total_participants: count,
            total_collected: total_minor as f64 / 100.0,
            average_amount,
        }
    }
}

/// Read-only scan; may lag concurrent writes.
pub async fn compute(store: &dyn ParticipantStore) -> Result<Stats, CheckoutError> {
    let completed = store
        .scan_by_status(PaymentStatus::Completed)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "stats scan failed"))?;
    Ok(Stats::from_participants(&completed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::MoneyAmount;
    use chrono::Utc;
    use uuid::Uuid;

    fn participant(amount: i64, status: PaymentStatus) -> Participant {
        Participant {
            id: Uuid::now_v7(),
            name: "Test".into(),
            email: format!("{}@example.com", Uuid::now_v7()),
            phone: None,
            amount: MoneyAmount::new(amount).unwrap(),
            status,
            payment_id: format!("pay_{}", Uuid::now_v7().simple()),
            order_id: "order_1".into(),
            signature: "sig".into(),
            data_hash: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn empty_store_has_zero_average() {
        let stats = Stats::from_participants(&[]);
        assert_eq!(stats.total_participants, 0);
        assert_eq!(stats.total_collected, 0.0);
        assert_eq!(stats.average_amount, 0.0);
    }

    #[test]
    fn pending_rows_are_ignored() {
        let rows = [
            participant(1000, PaymentStatus::Completed),
            participant(3000, PaymentStatus::Completed),
            participant(9900, PaymentStatus::Pending),
        ];
        let stats = Stats::from_participants(&rows);
        assert_eq!(stats.total_participants, 2);
        assert_eq!(stats.total_collected, 40.0);
        assert_eq!(stats.average_amount, 20.0);
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(Stats::from_participants(&[])).unwrap();
        assert!(json.get("totalParticipants").is_some());
        assert!(json.get("averageAmount").is_some());
    }
}
