//! # CRC-8 Implementation
//!
//! CRC-8 checksum shared by the packet encoder and decoder.
//!
//! **Polynomial**: 0x07 (x^8 + x^2 + x + 1)
//! **Initial Value**: 0xFF
//! **Bit order**: MSB first, no reflection, no final XOR
//!
//! The checksum covers the type byte followed by every payload byte, folded
//! strictly left to right. It must match the robot firmware bit for bit.

/// CRC-8 polynomial
pub const CRC8_POLYNOMIAL: u8 = 0x07;

/// CRC-8 seed used for every packet
pub const CRC8_INITIAL: u8 = 0xFF;

/// Precomputed CRC8 lookup table for fast calculation
const CRC8_TABLE: [u8; 256] = generate_crc8_table();

/// Generate CRC8 lookup table at compile time
const fn generate_crc8_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = i as u8;
        let mut j = 0;

        while j < 8 {
            if (crc & 0x80) != 0 {
                crc = (crc << 1) ^ CRC8_POLYNOMIAL;
            } else {
                crc <<= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Fold one byte into a running CRC-8
///
/// # Arguments
///
/// * `previous` - CRC after the preceding bytes (or [`CRC8_INITIAL`])
/// * `next` - Byte to fold in
///
/// # Examples
///
/// ```
/// use sbr_link::protocol::crc::{crc8_update, CRC8_INITIAL};
///
/// assert_eq!(crc8_update(CRC8_INITIAL, 0x00), 0xF3);
/// ```
#[inline]
pub fn crc8_update(previous: u8, next: u8) -> u8 {
    CRC8_TABLE[(previous ^ next) as usize]
}

/// Calculate the CRC-8 of a whole byte slice, seeded with [`CRC8_INITIAL`]
///
/// # Arguments
///
/// * `data` - Type byte followed by the payload
///
/// # Returns
///
/// * `u8` - Calculated CRC8 checksum
pub fn crc8(data: &[u8]) -> u8 {
    data.iter().fold(CRC8_INITIAL, |crc, &byte| crc8_update(crc, byte))
}

/// Fold one byte with the shift/XOR rounds directly (slow, for verification)
#[allow(dead_code)]
fn crc8_update_slow(previous: u8, next: u8) -> u8 {
    let mut crc = previous ^ next;

    for _ in 0..8 {
        if (crc & 0x80) != 0 {
            crc = (crc << 1) ^ CRC8_POLYNOMIAL;
        } else {
            crc <<= 1;
        }
    }

    crc
}
