//! Sample quantiles with linear interpolation between order statistics.
//!
//! For sorted values `x[0..n]` and `q ∈ [0, 1]`, the position is `h = (n - 1) * q`
//! and the result is `x[⌊h⌋] + (h - ⌊h⌋) * (x[⌊h⌋ + 1] - x[⌊h⌋])`.

/// Quantile of `values` at `q` (clamped to `[0, 1]`).
///
/// Non-finite values are ignored. Returns `None` when nothing finite remains.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    Some(quantile_sorted(&sorted, q))
}

/// Quantile of already-sorted, finite, non-empty `sorted`.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let q = if q.is_nan() { 0.5 } else { q.clamp(0.0, 1.0) };
    let h = (n - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = h - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_between_ranks() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert!((quantile(&v, 0.5).unwrap() - 2.5).abs() < 1e-12);
        assert!((quantile(&v, 0.9).unwrap() - 3.7).abs() < 1e-12);
        assert_eq!(quantile(&v, 0.0), Some(1.0));
        assert_eq!(quantile(&v, 1.0), Some(4.0));
    }

    #[test]
    fn unsorted_input_and_nan_are_handled() {
        let v = [10.0, f64::NAN, 0.0, 5.0];
        assert_eq!(quantile(&v, 0.5), Some(5.0));
    }

    #[test]
    fn empty_and_single() {
        assert_eq!(quantile(&[], 0.3), None);
        assert_eq!(quantile(&[7.0], 0.95), Some(7.0));
    }
}
