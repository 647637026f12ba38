//! Bluetooth address rendering
//!
//! WinRT surfaces BLE addresses as raw `u64`; the config file and logs
//! carry them in colon-separated hex form.

use anyhow::Result;

/// Render a raw 48-bit address as `AA:BB:CC:DD:EE:FF`.
pub fn format_address(raw: u64) -> String {
    let b = raw.to_be_bytes();
    format!(
        "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
        b[2], b[3], b[4], b[5], b[6], b[7]
    )
}

/// Parse a colon- or dash-separated hex address back into the raw form
/// WinRT expects. Case-insensitive.
pub fn parse_address(address: &str) -> Result<u64> {
    let hex: String = address.chars().filter(|c| *c != ':' && *c != '-').collect();
    if hex.len() != 12 {
        anyhow::bail!("invalid Bluetooth address: {address}");
    }
    Ok(u64::from_str_radix(&hex, 16)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_and_parses_round_trip() {
        let raw = 0xAABBCCDDEEFF_u64;
        let formatted = format_address(raw);
        assert_eq!(formatted, "AA:BB:CC:DD:EE:FF");
        assert_eq!(parse_address(&formatted).unwrap(), raw);
    }

    #[test]
    fn parses_lowercase_and_dashed_forms() {
        assert_eq!(parse_address("aa:bb:cc:dd:ee:ff").unwrap(), 0xAABBCCDDEEFF);
        assert_eq!(parse_address("AA-BB-CC-DD-EE-FF").unwrap(), 0xAABBCCDDEEFF);
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(parse_address("AA:BB:CC").is_err());
        assert!(parse_address("not an address").is_err());
    }

    #[test]
    fn leading_zeroes_survive() {
        assert_eq!(format_address(0xA1B2C3_u64), "00:00:00:A1:B2:C3");
    }
}
