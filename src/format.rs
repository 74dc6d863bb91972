//! Human-readable magnitudes for report lines.

const BYTE_UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];
const BIT_UNITS: [&str; 5] = ["bit", "Kbit", "Mbit", "Gbit", "Tbit"];

/// Format a byte count with a 1024-based scale, e.g. "1.50 MB"
pub fn byte_size(bytes: f64) -> String {
    scaled(bytes, 1024.0, &BYTE_UNITS)
}

/// Format a bit rate with a 1000-based scale, e.g. "12.00 Mbit".
/// The caller appends the time unit.
pub fn bit_rate(bits_per_sec: f64) -> String {
    scaled(bits_per_sec, 1000.0, &BIT_UNITS)
}

fn scaled(value: f64, step: f64, units: &[&str]) -> String {
    // Negative, NaN and infinite inputs read as zero rather than leaking into the report
    let mut value = if value.is_finite() && value > 0.0 { value } else { 0.0 };
    let mut unit = 0;
    while value >= step && unit + 1 < units.len() {
        value /= step;
        unit += 1;
    }

    if unit == 0 {
        format!("{:.0} {}", value, units[0])
    } else {
        format!("{:.2} {}", value, units[unit])
    }
}
