//! CRC-16/CCITT-FALSE: init 0xFFFF, poly 0x1021, MSB first, no final xor.

use crate::Crc;
use lazy_static::lazy_static;

pub const INIT: Crc = 0xFFFF;
pub const POLY: Crc = 0x1021;

lazy_static! {
    static ref TABLE: [Crc; 256] = {
        let mut table = [0; 256];
        for (byte, entry) in table.iter_mut().enumerate() {
            let mut crc = (byte as Crc) << 8;
            for _ in 0..8 {
                crc = step(crc);
            }
            *entry = crc;
        }
        table
    };
}

#[inline]
fn step(crc: Crc) -> Crc {
    if crc & 0x8000 != 0 {
        (crc << 1) ^ POLY
    } else {
        crc << 1
    }
}

pub fn crc16(data: &[u8]) -> Crc {
    data.iter().fold(INIT, |crc, &byte| {
        let index = ((crc >> 8) as u8 ^ byte) as usize;
        (crc << 8) ^ TABLE[index]
    })
}

/// Table-less form, one bit at a time. Kept as the reference for the table.
pub fn crc16_bitwise(data: &[u8]) -> Crc {
    let mut crc = INIT;
    for &byte in data {
        crc ^= (byte as Crc) << 8;
        for _ in 0..8 {
            crc = step(crc);
        }
    }
    crc
}

/// The checksum as it appears in a payload: 4 uppercase hex digits.
pub fn checksum_hex(data: &[u8]) -> String {
    format!("{:04X}", crc16(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn check_value() {
        assert_eq!(crc16(b"123456789"), 0x29B1);
        assert_eq!(crc16_bitwise(b"123456789"), 0x29B1);
    }

    #[test]
    pub fn empty_input_is_init() {
        assert_eq!(crc16(b""), INIT);
        assert_eq!(checksum_hex(b""), "FFFF");
    }

    #[test]
    pub fn table_matches_bitwise() {
        let data: Vec<u8> = (0..=255u8).chain((0..=255u8).rev()).collect();
        for len in 0..data.len() {
            assert_eq!(crc16(&data[..len]), crc16_bitwise(&data[..len]));
        }
    }

    #[test]
    pub fn hex_is_padded() {
        // Any input works, the point is the width.
        for s in ["", "A", "6304", "br.gov.bcb.pix"].iter() {
            let hex = checksum_hex(s.as_bytes());
            assert_eq!(hex.len(), 4);
            assert!(hex.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
        }
    }
}
