//! Application configuration

use std::path::PathBuf;

use clap::Parser;

use crate::domain::Locale;

const DEFAULT_LOG_FILTER: &str = "info";
const DEFAULT_CART_PATH: &str = ".storefront/cart.json";
const DEFAULT_MEDIA_ROOT: &str = ".storefront/media";
const DEFAULT_MEDIA_BASE_URL: &str = "/media";
const DEFAULT_TRANSACTION_ATTEMPTS: u32 = 5;
const DEFAULT_STORE_BUFFER: usize = 32;

/// Storefront configuration
#[derive(Debug, Clone, PartialEq, Parser)]
#[command(name = "storefront", about = "Storefront core", long_about = None)]
pub struct StoreConfig {
    /// Tracing filter used when `RUST_LOG` is unset
    #[arg(long, env = "STOREFRONT_LOG", default_value = DEFAULT_LOG_FILTER)]
    pub log_filter: String,

    /// File the cart is persisted to
    #[arg(long, env = "STOREFRONT_CART_PATH", default_value = DEFAULT_CART_PATH)]
    pub cart_path: PathBuf,

    /// Directory uploaded product images are written to
    #[arg(long, env = "STOREFRONT_MEDIA_ROOT", default_value = DEFAULT_MEDIA_ROOT)]
    pub media_root: PathBuf,

    /// URL prefix images are served under
    #[arg(long, env = "STOREFRONT_MEDIA_BASE_URL", default_value = DEFAULT_MEDIA_BASE_URL)]
    pub media_base_url: String,

    /// Maximum runs of a checkout transaction before a conflict is reported
    #[arg(
        long,
        env = "STOREFRONT_TRANSACTION_ATTEMPTS",
        default_value_t = DEFAULT_TRANSACTION_ATTEMPTS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub transaction_attempts: u32,

    /// Capacity of the document store's request channel
    #[arg(long, env = "STOREFRONT_STORE_BUFFER", default_value_t = DEFAULT_STORE_BUFFER)]
    pub store_buffer: usize,

    /// Language catalog text is shown in
    #[arg(long, env = "STOREFRONT_LOCALE", value_enum, default_value_t = Locale::English)]
    pub locale: Locale,
}

impl StoreConfig {
    /// Load configuration from `.env`, the environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        _ = dotenvy::dotenv();

        Self::try_parse()
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            cart_path: PathBuf::from(DEFAULT_CART_PATH),
            media_root: PathBuf::from(DEFAULT_MEDIA_ROOT),
            media_base_url: DEFAULT_MEDIA_BASE_URL.to_string(),
            transaction_attempts: DEFAULT_TRANSACTION_ATTEMPTS,
            store_buffer: DEFAULT_STORE_BUFFER,
            locale: Locale::English,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_override_defaults() {
        let config = StoreConfig::try_parse_from([
            "storefront",
            "--transaction-attempts",
            "9",
            "--media-base-url",
            "https://cdn.example.com",
        ])
        .unwrap();

        assert_eq!(config.transaction_attempts, 9);
        assert_eq!(config.media_base_url, "https://cdn.example.com");
        assert_eq!(config.locale, Locale::English);

        let sinhala = StoreConfig::try_parse_from(["storefront", "--locale", "sinhala"]).unwrap();
        assert_eq!(sinhala.locale, Locale::Sinhala);
    }

    #[test]
    fn zero_attempts_is_rejected() {
        assert!(StoreConfig::try_parse_from(["storefront", "--transaction-attempts", "0"]).is_err());
    }

    #[test]
    fn default_matches_documented_values() {
        let config = StoreConfig::default();

        assert_eq!(config.transaction_attempts, 5);
        assert_eq!(config.store_buffer, 32);
        assert_eq!(config.cart_path, PathBuf::from(".storefront/cart.json"));
    }
}
