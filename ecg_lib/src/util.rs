/**
 * Extract a hex field from a packet string and parse it as a u16
 *
 * # Example
 *
 * ```ignore
 * use crate::util::extract_hex_field;
 * //                 029D
 * //             |>------<|
 * let packet = "A55A02B3029D";
 * let offset = 8;
 * let size   = 4;
 *
 * let result = extract_hex_field(packet, offset, size);
 * assert!(result == Some(0x029D));
 */
pub fn extract_hex_field(packet: &str, offset: usize, size: usize) -> Option<u16> {
    let field = packet.get(offset..offset + size)?;
    u16::from_str_radix(field, 16).ok()
}

/**
 * Sign of a value as -1, 0 or 1. Zero (and NaN) map to 0.
 */
pub fn sign(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

/**
 * Round half up by truncating `x + 0.5`
 *
 * This is not `f64::round`: `-2.5` maps to `-2`, not `-3`.
 */
pub fn round_half_up(x: f64) -> i64 {
    (x + 0.5).trunc() as i64
}

/**
 * Median of a slice, averaging the two middle elements for even lengths.
 *
 * The slice is reordered in place. Returns NaN on empty input.
 */
pub fn median_in_place(values: &mut [f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return f64::NAN;
    }

    let mid = n / 2;
    let (lower, upper_mid, _) = values.select_nth_unstable_by(mid, f64::total_cmp);
    let upper_mid = *upper_mid;
    if n % 2 == 1 {
        return upper_mid;
    }

    // The lower half holds every element below the pivot
    let lower_mid = lower.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (lower_mid + upper_mid) / 2.0
}

pub fn median(values: &[f64]) -> f64 {
    median_in_place(&mut values.to_vec())
}

/**
 * Sample quantile of sorted values, interpolating between order statistics
 *
 * For sorted values x_0..x_{n-1} and probability p, h = (n - 1) * p and the
 * result is x_floor(h) + (h - floor(h)) * (x_floor(h)+1 - x_floor(h)).
 * Returns NaN on empty input.
 */
pub fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }

    let h = (sorted.len() - 1) as f64 * p.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/**
 * P(X <= k) for X ~ Binomial(trials, 1/2)
 */
pub fn binomial_half_cdf(k: usize, trials: usize) -> f64 {
    if k >= trials {
        return 1.0;
    }

    // Walk the binomial coefficients iteratively to stay in f64 range
    let mut coefficient = 1.0;
    let mut cumulative = 1.0;
    for i in 1..=k {
        coefficient *= (trials - i + 1) as f64 / i as f64;
        cumulative += coefficient;
    }
    cumulative / 2f64.powi(trials as i32)
}
