//! Binary searches over m/z-sorted data.
use num_traits::Float;

/// Find the insertion point of `q` in the sorted `array`.
pub fn binsearch<T: Float>(array: &[T], q: T) -> usize {
    match array.binary_search_by(|x| x.partial_cmp(&q).unwrap_or(std::cmp::Ordering::Less)) {
        Ok(i) => i,
        Err(i) => i,
    }
}

/// Find the index of the first item in `items` whose `key` is greater than or equal
/// to `target`. `items` must be sorted ascending by `key`.
///
/// When the binary search lands on one of several items with exactly the key `target`,
/// it walks left until it reaches the first of them. If every key is less than `target`,
/// `items.len()` is returned.
pub fn find_first_by<T, F: Fn(&T) -> f64>(items: &[T], target: f64, key: F) -> usize {
    match items.binary_search_by(|x| key(x).total_cmp(&target)) {
        Ok(mut i) => {
            while i > 0 && key(&items[i - 1]) >= target {
                i -= 1;
            }
            i
        }
        Err(i) => i,
    }
}

/// Find the first index in the sorted `mz_array` whose value is at least `mz`
pub fn find_first_mass(mz_array: &[f64], mz: f64) -> usize {
    find_first_by(mz_array, mz, |x| *x)
}

/// Find the index of the value in the sorted `vec` closest to `target_val`, or `None`
/// if `vec` is empty.
///
/// On a tie, the lower index wins.
pub fn nearest<T: Float>(vec: &[T], target_val: T) -> Option<usize> {
    let n = vec.len();
    if n == 0 {
        return None;
    }
    let i = binsearch(vec, target_val);
    if i == 0 {
        return Some(0);
    }
    if i >= n {
        return Some(n - 1);
    }
    let left = (vec[i - 1] - target_val).abs();
    let right = (vec[i] - target_val).abs();
    if right < left {
        Some(i)
    } else {
        Some(i - 1)
    }
}

/// Find the index of the value in the sorted `vec` closest to `target_val` so long as
/// it is no further away than `tolerance`.
pub fn nearest_within<T: Float>(vec: &[T], target_val: T, tolerance: T) -> Option<usize> {
    nearest(vec, target_val).filter(|i| (vec[*i] - target_val).abs() <= tolerance)
}
