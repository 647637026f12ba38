//! Current Time Service Protocol
//!
//! UUIDs and the binary codec for the standard CTS Current Time
//! characteristic.

use crate::domain::models::TimeSample;
use anyhow::Result;
use chrono::{Datelike, NaiveDateTime, Timelike};
use thiserror::Error;
use windows::core::GUID;

/// Standard Current Time Service UUID
pub const CTS_SERVICE_UUID: &str = "00001805-0000-1000-8000-00805f9b34fb";

/// Current Time Characteristic UUID
pub const CURRENT_TIME_CHAR_UUID: &str = "00002a2b-0000-1000-8000-00805f9b34fb";

/// Wire size of a Current Time value
pub const CURRENT_TIME_LEN: usize = 10;

/// Adjust Reason bit for a manual time update
pub const ADJUST_REASON_MANUAL: u8 = 0x01;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("current time payload too short: {len} bytes (expected {CURRENT_TIME_LEN})")]
    ShortPayload { len: usize },
}

/// Pack a calendar instant into the Current Time wire layout.
///
/// # Payload structure (10 bytes)
///
/// ```text
/// [0-1] : Year (u16 little-endian)
/// [2]   : Month (1-12)
/// [3]   : Day (1-31)
/// [4]   : Hour (0-23)
/// [5]   : Minute (0-59)
/// [6]   : Second (0-59)
/// [7]   : Day of week (1 = Monday .. 7 = Sunday)
/// [8]   : Fractions of a second in 1/256 units (always 0 here)
/// [9]   : Adjust reason (manual update)
/// ```
pub fn encode_current_time(instant: &NaiveDateTime) -> [u8; CURRENT_TIME_LEN] {
    let year = (instant.year() as u16).to_le_bytes();
    [
        year[0],
        year[1],
        instant.month() as u8,
        instant.day() as u8,
        instant.hour() as u8,
        instant.minute() as u8,
        instant.second() as u8,
        instant.weekday().number_from_monday() as u8,
        0,
        ADJUST_REASON_MANUAL,
    ]
}

/// Unpack a Current Time value read back from a peripheral.
///
/// Field values are passed through as received; the peripheral is trusted
/// to report sane calendar fields.
pub fn decode_current_time(bytes: &[u8]) -> Result<TimeSample, DecodeError> {
    if bytes.len() < CURRENT_TIME_LEN {
        return Err(DecodeError::ShortPayload { len: bytes.len() });
    }

    Ok(TimeSample {
        year: u16::from_le_bytes([bytes[0], bytes[1]]),
        month: bytes[2],
        day: bytes[3],
        hour: bytes[4],
        minute: bytes[5],
        second: bytes[6],
        day_of_week: bytes[7],
        fraction256: bytes[8],
        adjust_reason: bytes[9],
    })
}

/// Parse a UUID string into a Windows GUID
pub fn parse_uuid(uuid_str: &str) -> Result<GUID> {
    let uuid_str = uuid_str.replace('-', "");

    if uuid_str.len() != 32 {
        return Err(anyhow::anyhow!("Invalid UUID format"));
    }

    let d1 = u32::from_str_radix(&uuid_str[0..8], 16)?;
    let d2 = u16::from_str_radix(&uuid_str[8..12], 16)?;
    let d3 = u16::from_str_radix(&uuid_str[12..16], 16)?;

    let mut d4 = [0u8; 8];
    for i in 0..8 {
        d4[i] = u8::from_str_radix(&uuid_str[16 + i * 2..18 + i * 2], 16)?;
    }

    Ok(GUID {
        data1: d1,
        data2: d2,
        data3: d3,
        data4: d4,
    })
}
