//! Process configuration, read once at startup.
//!
//! Secrets have no defaults. A missing gateway key aborts startup instead
//! of silently running against a bundled key.

use {
    crate::domain::money::{Currency, MoneyAmount},
    std::{fmt, fs, net::SocketAddr, str::FromStr, time::Duration},
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("failed to read secret file {path}: {source}")]
    SecretFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// String that never shows up in logs.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres { database_url: String },
    Memory,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub key_id: String,
    pub key_secret: Secret,
    pub base_url: String,
    pub timeout: Duration,
}

/// Rules the checkout flow enforces.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub key_secret: Secret,
    pub min_amount: MoneyAmount,
    pub currency: Currency,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub storage: StorageBackend,
    pub db_max_connections: u32,
    pub gateway: GatewayConfig,
    pub min_amount: MoneyAmount,
    pub currency: Currency,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let key_id = get("RAZORPAY_KEY_ID").ok_or(ConfigError::Missing("RAZORPAY_KEY_ID"))?;
        let key_secret = match get("RAZORPAY_KEY_SECRET") {
            Some(secret) => secret,
            None => {
                let path = get("RAZORPAY_KEY_SECRET_FILE")
                    .ok_or(ConfigError::Missing("RAZORPAY_KEY_SECRET"))?;
                read_secret(&path)?
            }
        };

        let storage = match get("STORAGE_BACKEND").as_deref().unwrap_or("postgres") {
            "postgres" => StorageBackend::Postgres {
                database_url: get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            },
            "memory" => StorageBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    key: "STORAGE_BACKEND",
                    message: format!("expected postgres or memory, got {other}"),
                });
            }
        };

        let min_major: f64 = parse_or(&get, "MIN_ENTRY_AMOUNT", 1.0)?;
        let min_amount = MoneyAmount::from_major(min_major).map_err(|e| ConfigError::Invalid {
            key: "MIN_ENTRY_AMOUNT",
            message: e.to_string(),
        })?;

        let currency = match get("ENTRY_CURRENCY") {
            Some(code) => {
                Currency::try_from(code.as_str()).map_err(|e| ConfigError::Invalid {
                    key: "ENTRY_CURRENCY",
                    message: e.to_string(),
                })?
            }
            None => Currency::default(),
        };

        Ok(Self {
            bind_addr: parse_or(&get, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            storage,
            db_max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", 20)?,
            gateway: GatewayConfig {
                key_id,
                key_secret: Secret::new(key_secret),
                base_url: get("RAZORPAY_BASE_URL")
                    .unwrap_or_else(|| "https://api.razorpay.com/v1".to_string()),
                timeout: Duration::from_secs(parse_or(&get, "GATEWAY_TIMEOUT_SECS", 10)?),
            },
            min_amount,
            currency,
        })
    }

    pub fn checkout_settings(&self) -> CheckoutSettings {
        CheckoutSettings {
            key_secret: self.gateway.key_secret.clone(),
            min_amount: self.min_amount,
            currency: self.currency,
        }
    }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn read_secret(path: &str) -> Result<String, ConfigError> {
    fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|source| ConfigError::SecretFile {
            path: path.to_string(),
            source,
        })
}
