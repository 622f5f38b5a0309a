use std::env;

use chrono::Duration;

use crate::emv::MAX_KEY;
use crate::{Error, Result};

pub const DEFAULT_MERCHANT_NAME: &str = "TECH GADGETS STORE";
pub const DEFAULT_MERCHANT_CITY: &str = "SAO PAULO";
pub const DEFAULT_TTL_MINUTES: i64 = 30;
pub const DEFAULT_QR_ENDPOINT: &str = "https://api.qrserver.com/v1/create-qr-code/";

/// Who gets paid, and how issued codes are presented.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerchantConfig {
    /// The receiving Pix key: email, phone, tax id or random key.
    pub key: String,
    pub name: String,
    pub city: String,
    /// How long after issue a code is advertised as valid. Informational.
    pub ttl: Duration,
    /// Image service that renders `data` as a QR code.
    pub qr_endpoint: String,
}

impl MerchantConfig {
    pub fn new(key: impl Into<String>) -> Self {
        MerchantConfig {
            key: key.into(),
            name: DEFAULT_MERCHANT_NAME.to_owned(),
            city: DEFAULT_MERCHANT_CITY.to_owned(),
            ttl: Duration::minutes(DEFAULT_TTL_MINUTES),
            qr_endpoint: DEFAULT_QR_ENDPOINT.to_owned(),
        }
    }

    /// Reads `PIX_KEY` (required, at most 77 bytes) and the optional
    /// `PIX_MERCHANT_NAME`, `PIX_MERCHANT_CITY`, `PIX_TTL_MINUTES` and
    /// `PIX_QR_ENDPOINT`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let key = lookup("PIX_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(Error::MissingConfig("PIX_KEY"))?;
        let key = key.trim();
        if key.len() > MAX_KEY {
            return Err(Error::InvalidConfig(format!(
                "PIX_KEY is {} bytes, at most {} fit",
                key.len(),
                MAX_KEY
            )));
        }
        let mut config = MerchantConfig::new(key);
        if let Some(name) = lookup("PIX_MERCHANT_NAME") {
            config.name = name;
        }
        if let Some(city) = lookup("PIX_MERCHANT_CITY") {
            config.city = city;
        }
        if let Some(ttl) = lookup("PIX_TTL_MINUTES") {
            let minutes: u32 = ttl
                .trim()
                .parse()
                .map_err(|_| Error::InvalidConfig(format!("PIX_TTL_MINUTES={:?} is not a number of minutes", ttl)))?;
            config.ttl = Duration::minutes(i64::from(minutes));
        }
        if let Some(endpoint) = lookup("PIX_QR_ENDPOINT") {
            config.qr_endpoint = endpoint;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    pub fn defaults_apply() {
        let config = MerchantConfig::from_lookup(lookup(&[("PIX_KEY", " pix@techgadgets.store ")])).unwrap();
        assert_eq!(config, MerchantConfig::new("pix@techgadgets.store"));
        assert_eq!(config.ttl, Duration::minutes(30));
    }

    #[test]
    pub fn key_is_required() {
        assert_eq!(
            MerchantConfig::from_lookup(lookup(&[])),
            Err(Error::MissingConfig("PIX_KEY"))
        );
        assert_eq!(
            MerchantConfig::from_lookup(lookup(&[("PIX_KEY", "  ")])),
            Err(Error::MissingConfig("PIX_KEY"))
        );
    }

    #[test]
    pub fn overrides_read() {
        let config = MerchantConfig::from_lookup(lookup(&[
            ("PIX_KEY", "+5511999999999"),
            ("PIX_MERCHANT_NAME", "LOJA"),
            ("PIX_MERCHANT_CITY", "CURITIBA"),
            ("PIX_TTL_MINUTES", "5"),
            ("PIX_QR_ENDPOINT", "https://qr.example/"),
        ]))
        .unwrap();
        assert_eq!(config.name, "LOJA");
        assert_eq!(config.city, "CURITIBA");
        assert_eq!(config.ttl, Duration::minutes(5));
        assert_eq!(config.qr_endpoint, "https://qr.example/");
    }

    #[test]
    pub fn bad_ttl_rejected() {
        let err = MerchantConfig::from_lookup(lookup(&[("PIX_KEY", "k"), ("PIX_TTL_MINUTES", "half an hour")]));
        assert!(matches!(err, Err(Error::InvalidConfig(_))));
    }

    #[test]
    pub fn overlong_key_rejected() {
        let key = "k".repeat(MAX_KEY + 1);
        let err = MerchantConfig::from_lookup(lookup(&[("PIX_KEY", key.as_str())]));
        assert!(matches!(err, Err(Error::InvalidConfig(_))));
        assert!(!err.unwrap_err().is_client_error());

        let key = "k".repeat(MAX_KEY);
        assert_eq!(MerchantConfig::from_lookup(lookup(&[("PIX_KEY", key.as_str())])).unwrap().key, key);
    }
}
