//! The storefront's `POST /api/pix` contract, minus the transport.
//!
//! Whatever hosts this (a serverless function, an axum route, a test) hands
//! over the request body and the current time and writes back [`Reply`].

mod config;

pub use config::*;

use std::convert::TryFrom;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{Amount, Error, Payload, Result, TxId};

/// Prefix of every transaction id this store issues.
pub const TX_ID_PREFIX: &str = "TG";

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct PixRequest {
    pub amount: Option<f64>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixResponse {
    pub success: bool,
    pub pix_code: String,
    pub qr_code_url: String,
    pub tx_id: TxId,
    pub amount: f64,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

/// `TG` followed by the epoch milliseconds of `now` in uppercase base 36.
pub fn transaction_id(now: DateTime<Utc>) -> TxId {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let mut millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
    let mut digits = Vec::new();
    loop {
        digits.push(DIGITS[(millis % 36) as usize]);
        millis /= 36;
        if millis == 0 {
            break;
        }
    }
    digits.reverse();
    let mut id = String::with_capacity(TX_ID_PREFIX.len() + digits.len());
    id.push_str(TX_ID_PREFIX);
    id.extend(digits.into_iter().map(char::from));
    id
}

/// Link that renders `code` as a 300x300 QR image.
pub fn qr_code_url(endpoint: &str, code: &str) -> String {
    format!("{}?size=300x300&data={}", endpoint, urlencoding::encode(code))
}

/// Issues a code for `request.amount`.
///
/// Once the amount is accepted, the only text left to fail is the merchant's
/// own, so encoding errors come back as [`Error::InvalidConfig`].
pub fn generate(config: &MerchantConfig, request: &PixRequest, now: DateTime<Utc>) -> Result<PixResponse> {
    let requested = match request.amount {
        Some(amount) if amount.is_finite() && amount > 0.0 => amount,
        _ => return Err(Error::invalid("amount must be a positive number")),
    };
    let amount = Amount::from_f64(requested)?;
    let tx_id = transaction_id(now);
    let pix_code = Payload::new(amount, &config.key, &config.name, &config.city, &tx_id)
        .encode()
        .map_err(|e| Error::InvalidConfig(e.to_string()))?;

    info!(
        %tx_id,
        %amount,
        description = request.description.as_deref().unwrap_or(""),
        "issued pix code"
    );
    Ok(PixResponse {
        success: true,
        qr_code_url: qr_code_url(&config.qr_endpoint, &pix_code),
        pix_code,
        tx_id,
        amount: requested,
        expires_at: now + config.ttl,
    })
}

/// Runs [`generate`] on a JSON body and renders the JSON reply.
pub fn handle(config: &MerchantConfig, body: &str, now: DateTime<Utc>) -> Reply {
    let request: PixRequest = match serde_json::from_str(body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "unreadable pix request");
            return error_reply(400, "invalid request body");
        }
    };
    match generate(config, &request, now) {
        Ok(response) => match serde_json::to_string(&response) {
            Ok(body) => Reply { status: 200, body },
            Err(e) => {
                warn!(error = %e, "failed to serialize pix response");
                error_reply(500, "failed to generate pix code")
            }
        },
        Err(e) => {
            warn!(error = %e, "rejected pix request");
            let status = if e.is_client_error() { 400 } else { 500 };
            error_reply(status, &e.to_string())
        }
    }
}

fn error_reply(status: u16, message: &str) -> Reply {
    let body = ErrorBody {
        error: message.to_owned(),
    };
    Reply {
        status,
        // A struct of one string always serializes.
        body: serde_json::to_string(&body).unwrap_or_default(),
    }
}
