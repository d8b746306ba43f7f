//! Dynamic sampling distance
//!
//! `f(x) = (min · x_max) / (x + x_max · min / max)`: `f(0) = max`, falls
//! monotonically towards `min` as `x → x_max`.

/// Emission spacing for a volatility ratio `x` in `[0, x_max]`
pub fn dynamic_sampling_distance(x: f64, minimum: f64, maximum: f64, x_max: f64) -> f64 {
    (minimum * x_max) / (x + x_max * minimum / maximum)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: f64 = 50.0;
    const MAX: f64 = 30_000.0;
    const X_MAX: f64 = 0.5;

    #[test]
    fn limits() {
        assert!((dynamic_sampling_distance(0.0, MIN, MAX, X_MAX) - MAX).abs() < 1e-9);

        let at_max = dynamic_sampling_distance(X_MAX, MIN, MAX, X_MAX);
        let expected = MIN / (1.0 + MIN / MAX);
        assert!((at_max - expected).abs() < 1e-9);
        assert!(at_max < MIN && at_max > MIN * 0.99);
    }

    #[test]
    fn monotonically_decreasing() {
        let mut previous = f64::INFINITY;
        for step in 0..=100 {
            let x = X_MAX * step as f64 / 100.0;
            let value = dynamic_sampling_distance(x, MIN, MAX, X_MAX);
            assert!(value < previous, "not decreasing at x = {x}");
            previous = value;
        }
    }
}
