use anyhow::{Context, Result};
use od_api_types::Offering;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::cart::Amount;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Where the offering catalog comes from. The site historically shipped
/// one widget per catalog flavour; they differ only in URL and array key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogSource {
    StaticJson { url: String },
    #[default]
    Offerings,
    Products,
}

impl CatalogSource {
    pub fn url(&self) -> &str {
        match self {
            CatalogSource::StaticJson { url } => url,
            CatalogSource::Offerings => "/static/configurations/offerings.json",
            CatalogSource::Products => "/static/configurations/products.json",
        }
    }

    fn array_key(&self) -> &'static str {
        match self {
            CatalogSource::Products => "products",
            CatalogSource::StaticJson { .. } | CatalogSource::Offerings => "offerings",
        }
    }

    /// Accepts `{"offerings": [...]}` (or `products`) as well as a bare array.
    pub fn parse_catalog(&self, body: &str) -> Result<Vec<Offering>> {
        let value: serde_json::Value =
            serde_json::from_str(body).context("catalog is not valid JSON")?;
        let list = match value {
            serde_json::Value::Array(_) => value,
            serde_json::Value::Object(mut map) => map
                .remove(self.array_key())
                .with_context(|| format!("catalog has no `{}` array", self.array_key()))?,
            _ => anyhow::bail!("catalog must be an object or an array"),
        };
        serde_json::from_value(list).context("catalog entries are malformed")
    }
}

/// Drawer configuration. Every field has a default, so a partial JSON
/// object is enough to override a single setting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DrawerConfig {
    /// Empty means same origin.
    pub api_base_url: String,
    pub send_otp_path: String,
    pub verify_otp_path: String,
    pub resend_otp_path: String,
    pub generate_qr_path: String,
    pub request_timeout_secs: u64,
    pub verify_retry: RetryPolicy,
    pub resend_seconds: u32,
    pub qr_refresh_seconds: u32,
    pub min_phone_length: usize,
    pub default_country_code: String,
    pub fallback_amount_paise: u64,
    pub transaction_note: String,
    pub catalog: CatalogSource,
    /// `None` keeps a verified phone indefinitely.
    pub verification_ttl_days: Option<u32>,
    pub qr_placeholder_url: String,
}

impl Default for DrawerConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            send_otp_path: "/api/otp/send".to_owned(),
            verify_otp_path: "/api/otp/verify".to_owned(),
            resend_otp_path: "/api/otp/resend".to_owned(),
            generate_qr_path: "/api/payment/generate-qr".to_owned(),
            request_timeout_secs: 20,
            verify_retry: RetryPolicy::default(),
            resend_seconds: 30,
            qr_refresh_seconds: 60,
            min_phone_length: 10,
            default_country_code: "+91".to_owned(),
            fallback_amount_paise: 100_000,
            transaction_note: "Payment for order".to_owned(),
            catalog: CatalogSource::default(),
            verification_ttl_days: None,
            qr_placeholder_url: "/static/images/qr-placeholder.png".to_owned(),
        }
    }
}

impl DrawerConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("invalid drawer config")
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url.trim_end_matches('/'), path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn fallback_amount(&self) -> Amount {
        Amount::from_paise(self.fallback_amount_paise)
    }

    pub fn verification_ttl_ms(&self) -> Option<u64> {
        self.verification_ttl_days
            .map(|days| u64::from(days) * 24 * 60 * 60 * 1000)
    }
}
