//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Floor a f64 and clamp it to the i64 range, returning 0 for non-finite values.
#[must_use]
pub fn floor_f64_to_i64(value: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    let min = cast::<i64, f64>(i64::MIN).unwrap_or(f64::MIN);
    let max = cast::<i64, f64>(i64::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(min, max).floor();
    cast::<f64, i64>(clamped).unwrap_or(0)
}

/// Convert i64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn i64_to_f64(value: i64) -> f64 {
    cast::<i64, f64>(value).unwrap_or(0.0)
}

/// Floor a currency amount to whole units, keeping it in f64 form.
#[must_use]
pub fn whole_units(value: f64) -> f64 {
    i64_to_f64(floor_f64_to_i64(value))
}

/// Non-negative floor of a score, saturating into u32.
#[must_use]
pub fn floor_f64_to_u32(value: f64) -> u32 {
    let floored = floor_f64_to_i64(value).max(0);
    u32::try_from(floored).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_handles_non_finite() {
        assert_eq!(floor_f64_to_i64(f64::NAN), 0);
        assert_eq!(floor_f64_to_i64(f64::INFINITY), 0);
        assert_eq!(floor_f64_to_i64(-2.5), -3);
    }

    #[test]
    fn whole_units_drops_fractions() {
        assert!((whole_units(5_399.99) - 5_399.0).abs() < f64::EPSILON);
        assert!((whole_units(0.4)).abs() < f64::EPSILON);
    }

    #[test]
    fn u32_floor_saturates() {
        assert_eq!(floor_f64_to_u32(-4.0), 0);
        assert_eq!(floor_f64_to_u32(12.9), 12);
        assert_eq!(floor_f64_to_u32(1e12), u32::MAX);
    }
}
