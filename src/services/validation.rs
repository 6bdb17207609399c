use crate::domain::{error::CheckoutError, money::MoneyAmount};

const MAX_EMAIL_LEN: usize = 254;
const MIN_NAME_CHARS: usize = 2;

pub fn name(raw: &str) -> Result<String, CheckoutError> {
    let name = raw.trim();
    if name.chars().count() < MIN_NAME_CHARS {
        return Err(CheckoutError::Validation(
            "name must be at least 2 characters".into(),
        ));
    }
    Ok(name.to_string())
}

/// Trimmed and lower-cased, so the dedup key is stable across spellings.
pub fn email(raw: &str) -> Result<String, CheckoutError> {
    let email = raw.trim().to_lowercase();
    if !is_plausible_email(&email) {
        return Err(CheckoutError::Validation("valid email is required".into()));
    }
    Ok(email)
}

pub fn phone(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
}

pub fn entry_amount(major: f64, min: MoneyAmount) -> Result<MoneyAmount, CheckoutError> {
    let amount = MoneyAmount::from_major(major)?;
    if amount < min {
        return Err(CheckoutError::Validation(format!(
            "amount must be at least {}",
            min.major()
        )));
    }
    Ok(amount)
}

pub fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, CheckoutError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CheckoutError::Validation(format!("{field} is required")));
    }
    Ok(value)
}

fn is_plausible_email(email: &str) -> bool {
    if email.len() > MAX_EMAIL_LEN || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|l| {
            !l.is_empty() && !l.starts_with('-') && !l.ends_with('-')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalized() {
        assert_eq!(email("  A@X.com ").unwrap(), "a@x.com");
    }

    #[test]
    fn bad_emails_are_rejected() {
        for bad in ["", "plain", "@x.com", "a@", "a@x", "a@@x.com", "a b@x.com", "a@x..com"] {
            assert!(email(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn short_names_are_rejected() {
        assert!(name(" A ").is_err());
        assert_eq!(name(" Al ").unwrap(), "Al");
    }

    #[test]
    fn blank_phone_is_none() {
        assert_eq!(phone(Some("  ")), None);
        assert_eq!(phone(None), None);
        assert_eq!(phone(Some(" 98765 ")).as_deref(), Some("98765"));
    }

    #[test]
    fn entry_amount_enforces_minimum() {
        let min = MoneyAmount::new(100).unwrap();
        assert!(entry_amount(0.5, min).is_err());
        assert_eq!(entry_amount(1.0, min).unwrap().minor(), 100);
        assert_eq!(entry_amount(10.0, min).unwrap().minor(), 1000);
    }
}
