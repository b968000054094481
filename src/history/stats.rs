//! Order statistics over history windows

/// Median of `values`, sorting the slice in place.
///
/// An even-length slice averages the two middle values. Returns NaN for an
/// empty slice; history queries never call it with one.
pub fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_unstable_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
