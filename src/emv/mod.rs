//! The Pix flavour of the EMV merchant-presented QR payload.
//!
//! A payload is a run of `TAG + LEN + VALUE` fields (see [`field`]) in a fixed
//! order, closed by field `63` holding a CRC16 of everything before it,
//! `6304` included. Lengths, truncation and the checksum all work on UTF-8
//! bytes; for the ASCII text wallets expect that is the same as characters.

pub mod crc;
mod decode;
pub mod field;

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::{Error, Result, Tag};
use field::{nested, truncate, write_field};

pub use decode::decode;

pub const PAYLOAD_FORMAT_INDICATOR: Tag = "00";
pub const MERCHANT_ACCOUNT_INFO: Tag = "26";
pub const MERCHANT_CATEGORY_CODE: Tag = "52";
pub const TRANSACTION_CURRENCY: Tag = "53";
pub const TRANSACTION_AMOUNT: Tag = "54";
pub const COUNTRY_CODE: Tag = "58";
pub const MERCHANT_NAME: Tag = "59";
pub const MERCHANT_CITY: Tag = "60";
pub const ADDITIONAL_DATA: Tag = "62";
pub const CRC: Tag = "63";

// Inside MERCHANT_ACCOUNT_INFO.
pub const GUI: Tag = "00";
pub const KEY: Tag = "01";
// Inside ADDITIONAL_DATA.
pub const REFERENCE_LABEL: Tag = "05";

pub const FORMAT_VERSION: &str = "01";
pub const PIX_GUI: &str = "br.gov.bcb.pix";
pub const CATEGORY_UNSPECIFIED: &str = "0000";
/// ISO 4217 numeric code for BRL.
pub const CURRENCY_BRL: &str = "986";
pub const COUNTRY_BR: &str = "BR";

/// What fits next to the GUI inside field 26.
pub const MAX_KEY: usize = 77;
pub const MAX_MERCHANT_NAME: usize = 25;
pub const MAX_MERCHANT_CITY: usize = 15;

/// `63` followed by the length of a 4 digit checksum. Covered by the CRC.
pub const CRC_PREFIX: &str = "6304";

/// A positive amount of BRL, held as centavos.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u64);

impl Amount {
    // Past this the f64 -> u64 conversion stops being exact.
    const MAX_CENTS: u64 = 1 << 53;

    pub fn from_cents(cents: u64) -> Result<Self> {
        if cents == 0 {
            return Err(Error::invalid("amount must be positive"));
        }
        if cents > Self::MAX_CENTS {
            return Err(Error::invalid(format!("amount of {} centavos is too large", cents)));
        }
        Ok(Amount(cents))
    }

    /// Rounds to centavos half away from zero, after scaling by 100.
    ///
    /// `10.5` becomes `10.50` and `0.125` becomes `0.13`. Values that round
    /// down to `0.00` are rejected along with zero, negatives, NaN and
    /// infinities.
    pub fn from_f64(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(Error::invalid(format!("amount {} is not finite", value)));
        }
        if value <= 0.0 {
            return Err(Error::invalid(format!("amount {} is not positive", value)));
        }
        let cents = (value * 100.0).round();
        if cents > Self::MAX_CENTS as f64 {
            return Err(Error::invalid(format!("amount {} is too large", value)));
        }
        Self::from_cents(cents as u64)
    }

    pub fn cents(self) -> u64 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for Amount {
    type Err = Error;

    /// Accepts what [`Display`](fmt::Display) writes, plus the shorter forms
    /// other encoders emit (`10`, `10.5`).
    fn from_str(s: &str) -> Result<Self> {
        let bad = || Error::invalid(format!("{:?} is not an amount", s));
        let (units, frac) = match s.find('.') {
            Some(dot) => (&s[..dot], &s[dot + 1..]),
            None => (s, ""),
        };
        let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if units.is_empty() || !digits(units) || frac.len() > 2 || !digits(frac) {
            return Err(bad());
        }
        let units: u64 = units.parse().map_err(|_| bad())?;
        let mut cents = 0;
        for (i, b) in frac.bytes().enumerate() {
            let digit = u64::from(b - b'0');
            cents += if i == 0 { digit * 10 } else { digit };
        }
        let total = units
            .checked_mul(100)
            .and_then(|u| u.checked_add(cents))
            .ok_or_else(bad)?;
        Self::from_cents(total)
    }
}

/// The inputs of one payment request.
///
/// [`Payload::new`] truncates name and city, so a value built with it is
/// exactly what ends up in (and comes back out of) the payload. Built by hand
/// with longer text, encoding still truncates and decoding gives back the
/// truncated form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payload {
    pub amount: Amount,
    pub key: String,
    pub merchant_name: String,
    pub merchant_city: String,
    pub tx_id: String,
}

impl Payload {
    pub fn new(
        amount: Amount,
        key: &str,
        merchant_name: &str,
        merchant_city: &str,
        tx_id: &str,
    ) -> Self {
        Payload {
            amount,
            key: key.to_owned(),
            merchant_name: truncate(merchant_name, MAX_MERCHANT_NAME).to_owned(),
            merchant_city: truncate(merchant_city, MAX_MERCHANT_CITY).to_owned(),
            tx_id: tx_id.to_owned(),
        }
    }

    /// Serializes to the "Copia e Cola" string, checksum included.
    pub fn encode(&self) -> Result<String> {
        let amount = self.amount.to_string();
        let account = nested(MERCHANT_ACCOUNT_INFO, &[(GUI, PIX_GUI), (KEY, self.key.as_str())])?;
        let additional = nested(ADDITIONAL_DATA, &[(REFERENCE_LABEL, self.tx_id.as_str())])?;

        let mut out = String::with_capacity(128);
        write_field(&mut out, PAYLOAD_FORMAT_INDICATOR, FORMAT_VERSION)?;
        out.push_str(&account);
        write_field(&mut out, MERCHANT_CATEGORY_CODE, CATEGORY_UNSPECIFIED)?;
        write_field(&mut out, TRANSACTION_CURRENCY, CURRENCY_BRL)?;
        write_field(&mut out, TRANSACTION_AMOUNT, &amount)?;
        write_field(&mut out, COUNTRY_CODE, COUNTRY_BR)?;
        write_field(&mut out, MERCHANT_NAME, truncate(&self.merchant_name, MAX_MERCHANT_NAME))?;
        write_field(&mut out, MERCHANT_CITY, truncate(&self.merchant_city, MAX_MERCHANT_CITY))?;
        out.push_str(&additional);
        out.push_str(CRC_PREFIX);

        let checksum = crc::checksum_hex(out.as_bytes());
        debug!(tx_id = %self.tx_id, %amount, %checksum, "encoded pix payload");
        out.push_str(&checksum);
        Ok(out)
    }

    pub fn decode(payload: &str) -> Result<Self> {
        decode(payload)
    }
}

/// Builds the payload for `amount` BRL paid to `key`.
///
/// Fails with [`Error::InvalidArgument`] when the amount is not a positive
/// finite number or when a value (after truncating name to 25 bytes and city
/// to 15) does not fit a two digit length.
pub fn encode(
    amount: f64,
    key: &str,
    merchant_name: &str,
    merchant_city: &str,
    tx_id: &str,
) -> Result<String> {
    let amount = Amount::from_f64(amount)?;
    Payload::new(amount, key, merchant_name, merchant_city, tx_id).encode()
}
