use tracing::debug;

use super::field::{fields, fields_at, Field, Fields};
use super::*;

/// Parses a "Copia e Cola" string back into its [`Payload`].
///
/// The checksum is verified before anything else is looked at. The Pix GUI,
/// currency and country must be present and hold the Pix values. Top level
/// tags this crate does not write are skipped.
pub fn decode(payload: &str) -> Result<Payload> {
    let crc_at = payload
        .len()
        .checked_sub(4)
        .filter(|&at| at >= CRC_PREFIX.len() && payload.is_char_boundary(at))
        .ok_or(Error::Malformed {
            offset: 0,
            reason: "too short to hold a checksum",
        })?;
    let (body, found) = payload.split_at(crc_at);
    if !body.ends_with(CRC_PREFIX) {
        return Err(Error::MissingField(CRC));
    }
    let expected = crc::checksum_hex(body.as_bytes());
    if !expected.eq_ignore_ascii_case(found) {
        return Err(Error::ChecksumMismatch {
            expected,
            found: found.to_owned(),
        });
    }

    let mut amount = None;
    let mut key = None;
    let mut merchant_name = None;
    let mut merchant_city = None;
    let mut tx_id = None;
    let mut format_seen = false;
    let mut gui_seen = false;
    let mut currency_seen = false;
    let mut country_seen = false;
    let mut crc_seen = false;

    for field in fields(payload) {
        let field = field?;
        match field.tag {
            PAYLOAD_FORMAT_INDICATOR => {
                require(PAYLOAD_FORMAT_INDICATOR, field.value, FORMAT_VERSION)?;
                format_seen = true;
            }
            MERCHANT_ACCOUNT_INFO => {
                for inner in template(&field) {
                    let inner = inner?;
                    match inner.tag {
                        GUI if !inner.value.eq_ignore_ascii_case(PIX_GUI) => {
                            return Err(unexpected(MERCHANT_ACCOUNT_INFO, inner.value));
                        }
                        GUI => gui_seen = true,
                        KEY => key = Some(inner.value),
                        _ => {}
                    }
                }
            }
            TRANSACTION_CURRENCY => {
                require(TRANSACTION_CURRENCY, field.value, CURRENCY_BRL)?;
                currency_seen = true;
            }
            TRANSACTION_AMOUNT => {
                let parsed = field
                    .value
                    .parse::<Amount>()
                    .map_err(|_| unexpected(TRANSACTION_AMOUNT, field.value))?;
                amount = Some(parsed);
            }
            COUNTRY_CODE => {
                require(COUNTRY_CODE, field.value, COUNTRY_BR)?;
                country_seen = true;
            }
            MERCHANT_NAME => merchant_name = Some(field.value),
            MERCHANT_CITY => merchant_city = Some(field.value),
            ADDITIONAL_DATA => {
                for inner in template(&field) {
                    let inner = inner?;
                    if inner.tag == REFERENCE_LABEL {
                        tx_id = Some(inner.value);
                    }
                }
            }
            CRC => {
                if field.offset != crc_at - CRC_PREFIX.len() {
                    return Err(Error::Malformed {
                        offset: field.offset,
                        reason: "checksum field is not last",
                    });
                }
                crc_seen = true;
            }
            _ => {}
        }
    }

    if !format_seen {
        return Err(Error::MissingField(PAYLOAD_FORMAT_INDICATOR));
    }
    // Without these the code may be any EMV merchant payload, not a Pix one.
    if !gui_seen {
        return Err(Error::MissingField(MERCHANT_ACCOUNT_INFO));
    }
    if !currency_seen {
        return Err(Error::MissingField(TRANSACTION_CURRENCY));
    }
    if !country_seen {
        return Err(Error::MissingField(COUNTRY_CODE));
    }
    if !crc_seen {
        return Err(Error::MissingField(CRC));
    }
    let decoded = Payload {
        amount: amount.ok_or(Error::MissingField(TRANSACTION_AMOUNT))?,
        key: key.ok_or(Error::MissingField(MERCHANT_ACCOUNT_INFO))?.to_owned(),
        merchant_name: merchant_name.ok_or(Error::MissingField(MERCHANT_NAME))?.to_owned(),
        merchant_city: merchant_city.ok_or(Error::MissingField(MERCHANT_CITY))?.to_owned(),
        tx_id: tx_id.ok_or(Error::MissingField(ADDITIONAL_DATA))?.to_owned(),
    };
    debug!(tx_id = %decoded.tx_id, amount = %decoded.amount, "decoded pix payload");
    Ok(decoded)
}

fn template<'a>(field: &Field<'a>) -> Fields<'a> {
    fields_at(field.value, field.offset + 4)
}

fn require(tag: Tag, value: &str, wanted: &str) -> Result<()> {
    if value == wanted {
        Ok(())
    } else {
        Err(unexpected(tag, value))
    }
}

fn unexpected(tag: Tag, value: &str) -> Error {
    Error::UnexpectedValue {
        tag,
        value: value.to_owned(),
    }
}
