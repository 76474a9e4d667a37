/// Expresses `part` as a percentage of `total`. Returns 0.0 when `total` is zero.
pub fn pct(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Count-weighted mean of `(value, weight)` pairs. Returns `None` when the
/// weights sum to zero.
pub fn weighted_mean(pairs: impl IntoIterator<Item = (f64, u64)>) -> Option<f64> {
    let (sum, weight) = pairs
        .into_iter()
        .fold((0.0, 0u64), |(sum, weight), (value, w)| {
            (sum + value * w as f64, weight + w)
        });
    if weight == 0 {
        None
    } else {
        Some(sum / weight as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(pct(10, 0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(pct(50, 100), 50.0);
        assert_eq!(pct(1, 4), 25.0);
    }

    #[test]
    fn test_weighted_mean() {
        assert_eq!(weighted_mean([(40.0, 1), (60.0, 3)]), Some(55.0));
        assert_eq!(weighted_mean([(40.0, 0)]), None);
        assert_eq!(weighted_mean(std::iter::empty()), None);
    }
}
