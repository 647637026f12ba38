use serde::{Deserialize, Serialize};
use std::fmt;

/// A BLE peripheral as we remember or discover it.
///
/// Doubles as the persisted "last device" record and the handle type for
/// scan results. Replaced wholesale whenever a device is confirmed or
/// selected, never mutated field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRef {
    pub name: String,
    pub address: String,
}

impl DeviceRef {
    /// Address comparison is case-insensitive: `AA:BB:CC:DD:EE:FF` and
    /// `aa:bb:cc:dd:ee:ff` name the same peripheral.
    pub fn matches_address(&self, address: &str) -> bool {
        self.address.eq_ignore_ascii_case(address)
    }
}

impl fmt::Display for DeviceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}

/// One decoded Current Time value.
///
/// Built fresh from the host clock before every write, or decoded from the
/// peripheral's read-back bytes. Field encoding lives in
/// `infrastructure::bluetooth::protocol`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSample {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// 1 = Monday .. 7 = Sunday
    pub day_of_week: u8,
    /// Sub-second fraction in 1/256 s units
    pub fraction256: u8,
    pub adjust_reason: u8,
}

impl fmt::Display for TimeSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02} (weekday {}, fraction {}/256, adjust {:#04x})",
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
            self.day_of_week,
            self.fraction256,
            self.adjust_reason
        )
    }
}

/// What one timed scan produced.
///
/// A targeted scan yields at most a single [`Match`](Self::Match); a broad
/// scan yields the [`Visible`](Self::Visible) set in first-seen order.
/// "Nothing found" and "scan failed" both surface as `None` at the adapter
/// boundary.
#[derive(Debug, Clone)]
pub enum DiscoveryResult {
    Match(DeviceRef),
    Visible(Vec<DeviceRef>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_matching_ignores_case() {
        let device = DeviceRef {
            name: "Watch".to_string(),
            address: "AA:BB:CC:DD:EE:FF".to_string(),
        };
        assert!(device.matches_address("aa:bb:cc:dd:ee:ff"));
        assert!(!device.matches_address("11:22:33:44:55:66"));
    }
}
