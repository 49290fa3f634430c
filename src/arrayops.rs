use std::iter::Sum;

use num_traits::{AsPrimitive, Float};

/// Integrate `y` over `x` with the trapezoid rule. Fewer than two points integrate to zero.
pub fn trapz<
    A: Float + Clone + AsPrimitive<B> + 'static,
    B: Float + Clone + AsPrimitive<A> + 'static + Sum,
>(
    x: &[A],
    y: &[B],
) -> B {
    let n = x.len().min(y.len());
    if n < 2 {
        return B::zero();
    }
    (0..n - 1)
        .map(|i| {
            let delta = x[i + 1] - x[i];
            delta.as_() * B::from(0.5).unwrap_or_else(B::zero) * (y[i + 1] + y[i])
        })
        .sum()
}

pub fn minmax<T: Float>(values: &[T]) -> (T, T) {
    let mut max = -T::infinity();
    let mut min = T::infinity();

    for v in values.iter() {
        if *v > max {
            max = *v;
        }
        if *v < min {
            min = *v
        }
    }
    (min, max)
}

/// The median of `values`, averaging the two middle values of an even-length
/// slice, or `None` when `values` is empty.
pub fn median<T: Float>(values: &[T]) -> Option<T> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 1 {
        Some(sorted[n / 2])
    } else {
        let two = T::one() + T::one();
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / two)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_trapz() {
        let x = [0.0f64, 1.0, 2.0, 3.0];
        let y = [0.0f32, 2.0, 2.0, 0.0];
        let area: f32 = trapz(&x, &y);
        assert!((area - 4.0).abs() < 1e-6);

        let area: f32 = trapz(&x[..1], &y[..1]);
        assert_eq!(area, 0.0);
    }

    #[test]
    fn test_median_minmax() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median::<f64>(&[]), None);
        assert_eq!(minmax(&[3.0, -1.0, 2.0]), (-1.0, 3.0));
    }
}
