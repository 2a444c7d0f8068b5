use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use od_api_types::Offering;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::warn;

/// Durable string key-value storage (browser `localStorage` or a stand-in).
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

#[derive(Default)]
pub struct InMemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Storage keys shared with the rest of the site scripts.
pub mod keys {
    pub const PHONE_VERIFIED: &str = "phoneVerified";
    pub const VERIFIED_PHONE: &str = "verifiedPhone";
    pub const VERIFIED_COUNTRY_CODE: &str = "verifiedCountryCode";
    pub const VERIFICATION_TIMESTAMP: &str = "verificationTimestamp";
    pub const CURRENT_PHONE: &str = "currentPhone";
    pub const AUTH_TOKEN: &str = "authToken";
    pub const CART_ITEMS: &str = "cartItems";
    pub const OFFERINGS_DATA: &str = "offeringsData";
    pub const ANALYTICS_CONSENT: &str = "analytics_consent";
    pub const ANALYTICS_CONSENT_EXPIRY: &str = "analytics_consent_expiry";
}

pub const CONSENT_TTL_MS: u64 = 30 * 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifiedSessionRecord {
    pub phone_number: String,
    pub country_code: String,
    pub verified_at_epoch_ms: u64,
}

impl VerifiedSessionRecord {
    /// International form, e.g. `+919876543210`.
    pub fn full_number(&self) -> String {
        format!("{}{}", self.country_code, self.phone_number)
    }

    pub fn is_expired(&self, now_epoch_ms: u64, ttl_ms: Option<u64>) -> bool {
        match ttl_ms {
            Some(ttl) => now_epoch_ms.saturating_sub(self.verified_at_epoch_ms) > ttl,
            None => false,
        }
    }
}

/// Consent decision. `expires_at_epoch_ms` is `None` when the stored record
/// carries no readable expiry; such a record never expires.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConsentRecord {
    pub granted: bool,
    pub expires_at_epoch_ms: Option<u64>,
}

/// `analytics_consent_expiry` is an ISO-8601 timestamp, as written by
/// `Date.toISOString()`. Bare epoch milliseconds are still accepted.
fn parse_expiry(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.timestamp_millis().max(0) as u64);
    }
    raw.parse::<u64>().ok()
}

fn format_expiry(epoch_ms: u64) -> Result<String> {
    let at = i64::try_from(epoch_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .with_context(|| format!("consent expiry {epoch_ms} out of range"))?;
    Ok(at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Typed access to the records the drawer, cart widget and consent banner
/// share through durable storage.
#[derive(Clone)]
pub struct SiteStorage {
    store: Rc<dyn KeyValueStore>,
}

impl SiteStorage {
    pub fn new(store: Rc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn load_verified_session(&self) -> Result<Option<VerifiedSessionRecord>> {
        if self.store.get(keys::PHONE_VERIFIED)?.as_deref() != Some("true") {
            return Ok(None);
        }
        let Some(phone_number) = self.store.get(keys::VERIFIED_PHONE)? else {
            return Ok(None);
        };
        if phone_number.trim().is_empty() {
            return Ok(None);
        }
        let country_code = self
            .store
            .get(keys::VERIFIED_COUNTRY_CODE)?
            .unwrap_or_default();
        let verified_at_epoch_ms = self
            .store
            .get(keys::VERIFICATION_TIMESTAMP)?
            .and_then(|raw| raw.parse::<u64>().ok())
            .unwrap_or_default();

        Ok(Some(VerifiedSessionRecord {
            phone_number,
            country_code,
            verified_at_epoch_ms,
        }))
    }

    pub fn save_verified_session(&self, record: &VerifiedSessionRecord) -> Result<()> {
        self.store.set(keys::VERIFIED_PHONE, &record.phone_number)?;
        self.store
            .set(keys::VERIFIED_COUNTRY_CODE, &record.country_code)?;
        self.store.set(
            keys::VERIFICATION_TIMESTAMP,
            &record.verified_at_epoch_ms.to_string(),
        )?;
        // Flag last so a partial write never reads as verified.
        self.store.set(keys::PHONE_VERIFIED, "true")?;
        Ok(())
    }

    pub fn clear_verified_session(&self) -> Result<()> {
        for key in [
            keys::PHONE_VERIFIED,
            keys::VERIFIED_PHONE,
            keys::VERIFIED_COUNTRY_CODE,
            keys::VERIFICATION_TIMESTAMP,
            keys::AUTH_TOKEN,
        ] {
            self.store.remove(key)?;
        }
        Ok(())
    }

    pub fn current_phone(&self) -> Result<Option<String>> {
        self.store.get(keys::CURRENT_PHONE)
    }

    pub fn set_current_phone(&self, phone: &str) -> Result<()> {
        self.store.set(keys::CURRENT_PHONE, phone)
    }

    pub fn auth_token(&self) -> Result<Option<String>> {
        self.store.get(keys::AUTH_TOKEN)
    }

    /// Selected offering ids. A malformed entry reads as an empty cart.
    pub fn load_cart_items(&self) -> Result<Vec<String>> {
        let Some(raw) = self.store.get(keys::CART_ITEMS)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(items) => Ok(items),
            Err(err) => {
                warn!("ignoring malformed cart items: {}", err);
                Ok(Vec::new())
            }
        }
    }

    pub fn save_cart_items(&self, items: &[String]) -> Result<()> {
        let value = serde_json::to_string(items)?;
        self.store.set(keys::CART_ITEMS, &value)
    }

    pub fn clear_cart_items(&self) -> Result<()> {
        self.store.remove(keys::CART_ITEMS)
    }

    /// Cached offering catalog; `None` when absent or unreadable.
    pub fn load_catalog(&self) -> Result<Option<Vec<Offering>>> {
        let Some(raw) = self.store.get(keys::OFFERINGS_DATA)? else {
            return Ok(None);
        };
        match serde_json::from_str::<Vec<Offering>>(&raw) {
            Ok(offerings) => Ok(Some(offerings)),
            Err(err) => {
                warn!("ignoring malformed offering catalog: {}", err);
                Ok(None)
            }
        }
    }

    pub fn save_catalog(&self, offerings: &[Offering]) -> Result<()> {
        let value = serde_json::to_string(offerings)?;
        self.store.set(keys::OFFERINGS_DATA, &value)
    }

    /// Current consent decision. A record whose expiry has passed is removed
    /// and reads as no decision; a record without a readable expiry is kept.
    pub fn load_consent(&self, now_epoch_ms: u64) -> Result<Option<ConsentRecord>> {
        let granted = match self.store.get(keys::ANALYTICS_CONSENT)?.as_deref() {
            Some("true") => true,
            Some("false") => false,
            _ => return Ok(None),
        };
        let expiry = self.store.get(keys::ANALYTICS_CONSENT_EXPIRY)?;
        let expires_at_epoch_ms = expiry.as_deref().and_then(parse_expiry);
        if expiry.is_some() && expires_at_epoch_ms.is_none() {
            warn!("ignoring unreadable consent expiry");
        }

        if expires_at_epoch_ms.is_some_and(|expires_at| now_epoch_ms > expires_at) {
            self.store.remove(keys::ANALYTICS_CONSENT)?;
            self.store.remove(keys::ANALYTICS_CONSENT_EXPIRY)?;
            return Ok(None);
        }
        Ok(Some(ConsentRecord {
            granted,
            expires_at_epoch_ms,
        }))
    }

    pub fn save_consent(&self, granted: bool, now_epoch_ms: u64) -> Result<ConsentRecord> {
        let expires_at = now_epoch_ms.saturating_add(CONSENT_TTL_MS);
        let expiry = format_expiry(expires_at)?;
        self.store
            .set(keys::ANALYTICS_CONSENT, if granted { "true" } else { "false" })?;
        self.store.set(keys::ANALYTICS_CONSENT_EXPIRY, &expiry)?;
        Ok(ConsentRecord {
            granted,
            expires_at_epoch_ms: Some(expires_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> (Rc<InMemoryStore>, SiteStorage) {
        let store = Rc::new(InMemoryStore::default());
        let site = SiteStorage::new(store.clone());
        (store, site)
    }

    #[test]
    fn verified_session_requires_flag() -> Result<()> {
        let (store, site) = storage();
        store.set(keys::VERIFIED_PHONE, "9876543210")?;
        assert_eq!(site.load_verified_session()?, None);

        let record = VerifiedSessionRecord {
            phone_number: "9876543210".to_owned(),
            country_code: "+91".to_owned(),
            verified_at_epoch_ms: 1_700_000_000_000,
        };
        site.save_verified_session(&record)?;
        let loaded = site
            .load_verified_session()?
            .expect("verified session should exist");
        assert_eq!(loaded, record);
        assert_eq!(loaded.full_number(), "+919876543210");
        Ok(())
    }

    #[test]
    fn clearing_session_keeps_cart() -> Result<()> {
        let (store, site) = storage();
        site.save_cart_items(&["mentoring".to_owned()])?;
        site.save_verified_session(&VerifiedSessionRecord {
            phone_number: "9876543210".to_owned(),
            country_code: "+91".to_owned(),
            verified_at_epoch_ms: 1,
        })?;
        store.set(keys::AUTH_TOKEN, "token")?;

        site.clear_verified_session()?;

        assert_eq!(site.load_verified_session()?, None);
        assert_eq!(site.auth_token()?, None);
        assert_eq!(site.load_cart_items()?, vec!["mentoring".to_owned()]);
        Ok(())
    }

    #[test]
    fn session_expiry_is_opt_in() {
        let record = VerifiedSessionRecord {
            phone_number: "9876543210".to_owned(),
            country_code: "+91".to_owned(),
            verified_at_epoch_ms: 1_000,
        };
        assert!(!record.is_expired(u64::MAX, None));
        assert!(!record.is_expired(1_500, Some(1_000)));
        assert!(record.is_expired(2_001, Some(1_000)));
    }

    #[test]
    fn malformed_cart_and_catalog_read_as_empty() -> Result<()> {
        let (store, site) = storage();
        store.set(keys::CART_ITEMS, "not json")?;
        store.set(keys::OFFERINGS_DATA, "{")?;
        assert!(site.load_cart_items()?.is_empty());
        assert_eq!(site.load_catalog()?, None);
        Ok(())
    }

    #[test]
    fn expired_consent_is_removed() -> Result<()> {
        let (store, site) = storage();
        let record = site.save_consent(true, 1_000)?;
        let expires_at = 1_000 + CONSENT_TTL_MS;
        assert_eq!(record.expires_at_epoch_ms, Some(expires_at));
        assert_eq!(site.load_consent(2_000)?, Some(record));

        assert_eq!(site.load_consent(expires_at + 1)?, None);
        assert_eq!(store.get(keys::ANALYTICS_CONSENT)?, None);
        assert_eq!(store.get(keys::ANALYTICS_CONSENT_EXPIRY)?, None);
        Ok(())
    }

    #[test]
    fn consent_expiry_is_written_as_iso_timestamp() -> Result<()> {
        let (store, site) = storage();
        // 2026-01-01T00:00:00.000Z
        site.save_consent(true, 1_767_225_600_000)?;
        assert_eq!(
            store.get(keys::ANALYTICS_CONSENT_EXPIRY)?.as_deref(),
            Some("2026-01-31T00:00:00.000Z")
        );
        Ok(())
    }

    #[test]
    fn iso_expiry_written_by_the_page_is_honoured() -> Result<()> {
        let (store, site) = storage();
        store.set(keys::ANALYTICS_CONSENT, "true")?;
        store.set(keys::ANALYTICS_CONSENT_EXPIRY, "2099-01-01T00:00:00.000Z")?;

        let record = site
            .load_consent(1_767_225_600_000)?
            .expect("consent decision should survive");
        assert!(record.granted);
        assert_eq!(record.expires_at_epoch_ms, Some(4_070_908_800_000));
        assert_eq!(store.get(keys::ANALYTICS_CONSENT)?.as_deref(), Some("true"));

        store.set(keys::ANALYTICS_CONSENT_EXPIRY, "2020-01-01T00:00:00.000Z")?;
        assert_eq!(site.load_consent(1_767_225_600_000)?, None);
        assert_eq!(store.get(keys::ANALYTICS_CONSENT)?, None);
        Ok(())
    }

    #[test]
    fn consent_without_expiry_is_kept() -> Result<()> {
        let (store, site) = storage();
        store.set(keys::ANALYTICS_CONSENT, "false")?;

        let record = site.load_consent(u64::MAX)?.expect("decision kept");
        assert!(!record.granted);
        assert_eq!(record.expires_at_epoch_ms, None);
        assert_eq!(store.get(keys::ANALYTICS_CONSENT)?.as_deref(), Some("false"));
        Ok(())
    }

    #[test]
    fn epoch_millis_expiry_is_still_read() -> Result<()> {
        let (store, site) = storage();
        store.set(keys::ANALYTICS_CONSENT, "true")?;
        store.set(keys::ANALYTICS_CONSENT_EXPIRY, "5000")?;
        assert!(site.load_consent(4_000)?.is_some());
        assert_eq!(site.load_consent(6_000)?, None);
        Ok(())
    }

    #[test]
    fn rejection_is_remembered() -> Result<()> {
        let (_store, site) = storage();
        site.save_consent(false, 0)?;
        let loaded = site.load_consent(10)?.expect("consent decision should exist");
        assert!(!loaded.granted);
        Ok(())
    }
}
