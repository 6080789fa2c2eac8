//! Size and offset parsing
//!
//! Sizes are given the way ESP-IDF partition tables write them: a plain
//! byte count, or a number with a `K` or `M` suffix (case-insensitive).
//! Offsets are hex when prefixed with `0x`, decimal otherwise.

use crate::error::{Error, Result};

const KIB: u32 = 1024;
const MIB: u32 = 1024 * 1024;

fn invalid_size(input: &str, reason: impl Into<String>) -> Error {
    Error::InvalidSize {
        input: input.to_string(),
        reason: reason.into(),
    }
}

/// Parse a size string like "3M", "512k" or "4096" into bytes
pub fn parse_size(s: &str) -> Result<u32> {
    let upper = s.trim().to_uppercase();

    let (num_str, multiplier) = if let Some(n) = upper.strip_suffix('M') {
        (n, MIB)
    } else if let Some(n) = upper.strip_suffix('K') {
        (n, KIB)
    } else {
        (upper.as_str(), 1)
    };

    let num: u32 = num_str
        .parse()
        .map_err(|e| invalid_size(s, format!("invalid number: {}", e)))?;

    num.checked_mul(multiplier)
        .ok_or_else(|| invalid_size(s, "size does not fit in 32 bits"))
}

/// Parse a flash offset: hex with a `0x` prefix, decimal otherwise
pub fn parse_offset(s: &str) -> Result<u32> {
    let s_trim = s.trim();
    let parsed = if let Some(hex) = s_trim
        .strip_prefix("0x")
        .or_else(|| s_trim.strip_prefix("0X"))
    {
        u32::from_str_radix(hex, 16).map_err(|e| format!("invalid hex value: {}", e))
    } else {
        s_trim
            .parse::<u32>()
            .map_err(|e| format!("invalid number: {}", e))
    };

    parsed.map_err(|reason| Error::InvalidOffset {
        input: s.to_string(),
        reason,
    })
}

/// Format a byte count as kilobytes with two decimals ("2.93 KB")
pub fn format_kib(bytes: u64) -> String {
    format!("{:.2} KB", bytes as f64 / KIB as f64)
}

/// Format a byte count as megabytes with two decimals ("3.00 MB")
pub fn format_mib(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / MIB as f64)
}
