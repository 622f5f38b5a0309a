//! Pix "Copia e Cola" payloads: the EMV-derived TLV text that Brazilian
//! wallet apps turn into a payment, plus the request/response glue used by
//! the storefront's Pix endpoint.

pub mod emv;
mod error;
#[cfg(feature = "handler")]
pub mod handler;

pub use emv::{decode, encode, Amount, Payload};
pub use error::{Error, Result};

/// Two ASCII digits identifying an EMV field.
pub type Tag = &'static str;
pub type TxId = String;
pub type Crc = u16;
