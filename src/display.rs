//! Presentation-ready formatting of metric values.

use crate::constants::aggregate::{DISPLAY_DECIMALS, UNDEFINED_RATIO_TEXT};

/// Round `value` to `decimals` places (half away from zero).
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Round to the dashboard's display precision.
pub fn round2(value: f64) -> f64 {
    round_to(value, DISPLAY_DECIMALS)
}

/// Milliseconds with two decimals, e.g. `87.50ms`.
pub fn format_ms(value: f64) -> String {
    format!("{:.2}ms", value)
}

/// Signed millisecond delta with one decimal, e.g. `+12.3ms` or `-4.0ms`.
pub fn format_delta_ms(value: f64) -> String {
    format!("{:+.1}ms", value)
}

/// Optional value with two decimals, `N/A` when absent.
pub fn format_optional(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{:.2}", value),
        None => UNDEFINED_RATIO_TEXT.to_string(),
    }
}
