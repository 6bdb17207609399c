use {
    super::error::CheckoutError,
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Upper bound for major-unit input. Well inside exact f64 integer range.
const MAX_MAJOR: f64 = 1.0e12;

/// Amount in minor currency units (paise for INR).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MoneyAmount(i64);

impl MoneyAmount {
    pub fn new(minor: i64) -> Result<Self, CheckoutError> {
        if minor < 0 {
            return Err(CheckoutError::Validation(format!(
                "MoneyAmount cannot be negative, got: {minor}"
            )));
        }
        Ok(Self(minor))
    }

    /// Converts a major-unit amount (rupees) to minor units. Accepts at most
    /// two decimal places; anything finer is rejected rather than rounded.
    pub fn from_major(major: f64) -> Result<Self, CheckoutError> {
        if !major.is_finite() || major < 0.0 || major > MAX_MAJOR {
            return Err(CheckoutError::Validation(format!(
                "amount out of range: {major}"
            )));
        }
        let minor = (major * 100.0).round();
        if (minor / 100.0 - major).abs() > 1e-9 {
            return Err(CheckoutError::Validation(format!(
                "amount has more than two decimal places: {major}"
            )));
        }
        Ok(Self(minor as i64))
    }

    pub fn minor(&self) -> i64 {
        self.0
    }

    pub fn major(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Inr,
    Usd,
    Eur,
    Gbp,
    Sgd,
    Aed,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inr => "INR",
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Sgd => "SGD",
            Self::Aed => "AED",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Currency {
    type Error = CheckoutError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.to_ascii_uppercase().as_str() {
            "INR" => Ok(Self::Inr),
            "USD" => Ok(Self::Usd),
            "EUR" => Ok(Self::Eur),
            "GBP" => Ok(Self::Gbp),
            "SGD" => Ok(Self::Sgd),
            "AED" => Ok(Self::Aed),
            other => Err(CheckoutError::Validation(format!(
                "unknown currency: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: MoneyAmount,
    currency: Currency,
}

impl Money {
    pub fn new(amount: MoneyAmount, currency: Currency) -> Self {
        Self { amount, currency }
    }

    pub fn amount(&self) -> MoneyAmount {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }
}
