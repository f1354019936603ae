//! Identifiers, timestamps and MAC addresses for envelope objects.
//!
//! Assemblers draw every random or time-dependent value from an
//! [`IdSource`], so a whole envelope can be rebuilt deterministically by
//! swapping in a fixed source.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

/// VirtualBox OUI used as the fixed prefix of generated MAC addresses.
pub const VBOX_MAC_PREFIX: &str = "080027";

/// Source of unique identifiers and the current time.
pub trait IdSource {
    /// A fresh lowercase hyphenated UUID.
    fn uuid(&mut self) -> String;

    /// The time to stamp onto created objects.
    fn now(&self) -> DateTime<Utc>;

    /// Three random bytes completing a MAC address after the OUI.
    fn mac_suffix(&mut self) -> [u8; 3];
}

/// Random UUIDs (v4), wall-clock time and random MAC bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn uuid(&mut self) -> String {
        get_uuid()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn mac_suffix(&mut self) -> [u8; 3] {
        rand::random()
    }
}

/// Generate a random version 4 UUID as a lowercase hyphenated string.
pub fn get_uuid() -> String {
    Uuid::new_v4().to_string()
}

/// Timestamp in the oVirt engine format: `YYYY/MM/DD HH:MM:SS`, UTC.
pub fn olvm_timestamp(time: DateTime<Utc>) -> String {
    time.format("%Y/%m/%d %H:%M:%S").to_string()
}

/// ISO-8601 timestamp with second precision and a `Z` suffix.
pub fn iso_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// MAC address in VirtualBox notation: twelve hex digits, no separators.
pub fn mac_address(suffix: [u8; 3]) -> String {
    format!(
        "{}{:02x}{:02x}{:02x}",
        VBOX_MAC_PREFIX, suffix[0], suffix[1], suffix[2]
    )
}
