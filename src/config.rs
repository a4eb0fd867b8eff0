use anyhow::Context;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub log_format: LogFormat,
    pub policy: OrderPolicy,
}

/// Business knobs for the order engine and reporter.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct OrderPolicy {
    pub order_number_prefix: String,
    pub min_address_len: usize,
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub low_stock_threshold: i32,
    pub max_report_days: u32,
    /// Attempts at drawing an unused order number before giving up.
    pub order_number_attempts: u32,
}

impl Default for OrderPolicy {
    fn default() -> Self {
        Self {
            order_number_prefix: "DCF".to_string(),
            min_address_len: 10,
            default_page_size: 10,
            max_page_size: 50,
            low_stock_threshold: 5,
            max_report_days: 365,
            order_number_attempts: 5,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        let defaults = OrderPolicy::default();
        let policy = OrderPolicy {
            order_number_prefix: env::var("ORDER_NUMBER_PREFIX")
                .unwrap_or(defaults.order_number_prefix),
            min_address_len: parse_or("MIN_ADDRESS_LENGTH", defaults.min_address_len)?,
            default_page_size: parse_or("DEFAULT_PAGE_SIZE", defaults.default_page_size)?,
            max_page_size: parse_or("MAX_PAGE_SIZE", defaults.max_page_size)?,
            low_stock_threshold: parse_or("LOW_STOCK_THRESHOLD", defaults.low_stock_threshold)?,
            max_report_days: defaults.max_report_days,
            order_number_attempts: defaults.order_number_attempts,
        };
        policy.validate()?;

        let log_format = match env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "text".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "text" => LogFormat::Text,
            "json" => LogFormat::Json,
            other => anyhow::bail!("LOG_FORMAT must be 'text' or 'json', got '{}'", other),
        };

        Ok(Config {
            server_port: parse_or("SERVER_PORT", 3000)?,
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 5)?,
            log_format,
            policy,
        })
    }
}

impl OrderPolicy {
    pub fn validate(&self) -> anyhow::Result<()> {
        let prefix = &self.order_number_prefix;
        if prefix.is_empty()
            || prefix.len() > 8
            || !prefix.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        {
            anyhow::bail!("ORDER_NUMBER_PREFIX must be 1-8 uppercase letters or digits");
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            anyhow::bail!("DEFAULT_PAGE_SIZE must be between 1 and MAX_PAGE_SIZE");
        }
        if self.low_stock_threshold < 1 {
            anyhow::bail!("LOW_STOCK_THRESHOLD must be at least 1");
        }
        if self.order_number_attempts == 0 {
            anyhow::bail!("order number attempts must be at least 1");
        }
        Ok(())
    }
}

fn parse_or<T>(var: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: '{}'", var, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_valid() {
        assert!(OrderPolicy::default().validate().is_ok());
    }

    #[test]
    fn rejects_lowercase_prefix() {
        let policy = OrderPolicy {
            order_number_prefix: "dcf".to_string(),
            ..OrderPolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn rejects_default_page_above_max() {
        let policy = OrderPolicy {
            default_page_size: 80,
            ..OrderPolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn parse_or_falls_back_when_unset() {
        let value: u32 = parse_or("ORDER_CORE_TEST_SURELY_UNSET", 42).unwrap();
        assert_eq!(value, 42);
    }
}
