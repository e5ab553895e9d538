//! Numerical primitives: statistics, color space conversion, histograms.

use super::types::Rgb;

/// Mean and sample standard deviation of a set of values.
///
/// Returns `None` for an empty slice; a single value has zero deviation.
/// Accumulates in f64.
pub fn mean_and_std(values: &[f32]) -> Option<(f32, f32)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let sum: f64 = values.iter().map(|&v| v as f64).sum();
    let mean = sum / n;
    if values.len() < 2 {
        return Some((mean as f32, 0.0));
    }
    let variance: f64 = values
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / (n - 1.0);
    Some((mean as f32, variance.sqrt() as f32))
}

/// Convert RGB to HSV with every channel in [0, 1].
///
/// Hue wraps at 1.0; achromatic colors have hue and saturation 0.
pub fn rgb_to_hsv(color: Rgb) -> [f32; 3] {
    let r = color.r as f32 / 255.0;
    let g = color.g as f32 / 255.0;
    let b = color.b as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let v = max;
    if delta <= f32::EPSILON || max <= 0.0 {
        return [0.0, 0.0, v];
    }
    let s = delta / max;

    let sector = if max == r {
        ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };

    [(sector / 6.0).rem_euclid(1.0), s, v]
}

/// Fixed-range histogram with equal-width bins.
///
/// Values outside `[min, max]` are ignored; `max` itself lands in the last
/// bin. Non-finite values are ignored.
pub fn histogram(values: impl IntoIterator<Item = f32>, bins: usize, min: f32, max: f32) -> Vec<f32> {
    let mut counts = vec![0.0f32; bins];
    if bins == 0 || max <= min {
        return counts;
    }
    let width = (max - min) / bins as f32;
    for v in values {
        if !v.is_finite() || v < min || v > max {
            continue;
        }
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1.0;
    }
    counts
}

/// Scale a vector so it sums to one. An all-zero vector is returned as is.
pub fn normalize_sum(values: &mut [f32]) {
    let total: f32 = values.iter().sum();
    if total > 0.0 {
        for v in values.iter_mut() {
            *v /= total;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_std() {
        let (mean, std) = mean_and_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_relative_eq!(mean, 5.0);
        // Sample deviation (n - 1)
        assert_relative_eq!(std, 2.138_09, epsilon = 1e-4);
        assert!(mean_and_std(&[]).is_none());
        assert_eq!(mean_and_std(&[3.0]), Some((3.0, 0.0)));
    }

    #[test]
    fn test_rgb_to_hsv_primaries() {
        assert_eq!(rgb_to_hsv(Rgb::new(255, 0, 0)), [0.0, 1.0, 1.0]);
        let green = rgb_to_hsv(Rgb::new(0, 255, 0));
        assert_relative_eq!(green[0], 1.0 / 3.0, epsilon = 1e-6);
        let blue = rgb_to_hsv(Rgb::new(0, 0, 255));
        assert_relative_eq!(blue[0], 2.0 / 3.0, epsilon = 1e-6);
        assert_eq!(rgb_to_hsv(Rgb::new(128, 128, 128))[1], 0.0);
        assert_eq!(rgb_to_hsv(Rgb::new(0, 0, 0)), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_histogram_edges() {
        let h = histogram([0.0, 0.5, 0.99, 1.0, 1.5, f32::NAN], 2, 0.0, 1.0);
        assert_eq!(h, vec![1.0, 3.0]);
    }

    #[test]
    fn test_normalize_sum() {
        let mut v = vec![1.0, 3.0];
        normalize_sum(&mut v);
        assert_eq!(v, vec![0.25, 0.75]);

        let mut zeros = vec![0.0; 3];
        normalize_sum(&mut zeros);
        assert_eq!(zeros, vec![0.0; 3]);
    }
}
