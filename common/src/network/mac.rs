use std::str::FromStr;

use pnet::util::MacAddr;

/// Parses a MAC address written with `:` or `-` separators, in any casing.
///
/// The all-zero address (an incomplete ARP entry) is rejected.
pub fn parse_mac(raw: &str) -> Option<MacAddr> {
    let cleaned: String = raw.trim().replace('-', ":");
    if cleaned.split(':').count() != 6 {
        return None;
    }
    let mac: MacAddr = MacAddr::from_str(&cleaned).ok()?;
    if mac == MacAddr::zero() {
        return None;
    }
    Some(mac)
}

/// Renders a MAC in the canonical uppercase colon-delimited form.
pub fn to_canonical(mac: MacAddr) -> String {
    format!(
        "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
        mac.0, mac.1, mac.2, mac.3, mac.4, mac.5
    )
}

/// `aa-bb-cc-dd-ee-ff` and `AA:BB:CC:DD:EE:FF` normalize to the same key.
pub fn normalize(raw: &str) -> Option<String> {
    parse_mac(raw).map(to_canonical)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
