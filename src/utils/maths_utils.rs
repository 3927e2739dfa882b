use argminmax::ArgMinMax;
use statrs::statistics::Statistics;

/// Relative price matcher shared by every confluence and proximity check.
///
/// Two prices match when `|a - b| / max(a, b) <= tolerance`. A non-positive
/// scale never matches, so zero or negative prices cannot divide by zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToleranceBand {
    pub tolerance: f64,
}

impl ToleranceBand {
    pub const fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn matches(&self, price: f64, candidate: f64) -> bool {
        let scale = price.max(candidate);
        if !(scale > 0.0) {
            return false;
        }
        (price - candidate).abs() / scale <= self.tolerance
    }
}

/// `|value - reference| / reference`, or None when the reference is not a positive number.
pub fn relative_distance(value: f64, reference: f64) -> Option<f64> {
    if reference > 0.0 && value.is_finite() {
        Some((value - reference).abs() / reference)
    } else {
        None
    }
}

pub fn get_max(vec: &[f64]) -> Option<f64> {
    argmax(vec).map(|idx| vec[idx])
}

pub fn get_min(vec: &[f64]) -> Option<f64> {
    argmin(vec).map(|idx| vec[idx])
}

/// Index of the first occurrence of the maximum.
pub fn argmax(vec: &[f64]) -> Option<usize> {
    if vec.is_empty() {
        return None;
    }
    Some(vec.argmax())
}

/// Index of the first occurrence of the minimum.
pub fn argmin(vec: &[f64]) -> Option<usize> {
    if vec.is_empty() {
        return None;
    }
    Some(vec.argmin())
}

/// Arithmetic mean. NaN for an empty slice.
pub fn mean(vec: &[f64]) -> f64 {
    vec.iter().mean()
}

/// Sample standard deviation (n - 1 denominator). NaN with fewer than two values.
pub fn sample_std_dev(vec: &[f64]) -> f64 {
    vec.iter().std_dev()
}

/// Quantile with linear interpolation between closest ranks (`q` in [0, 1]).
pub fn quantile(vec: &[f64], q: f64) -> Option<f64> {
    if vec.is_empty() {
        return None;
    }
    let mut sorted = vec.to_vec();
    sorted.sort_by(f64::total_cmp);

    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Least-squares slope of `values` against their index (0, 1, 2, ...).
pub fn regression_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(values);

    let (mut numerator, mut denominator) = (0.0, 0.0);
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        numerator += dx * (y - y_mean);
        denominator += dx * dx;
    }
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Close-to-close fractional returns.
pub fn pct_changes(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}
