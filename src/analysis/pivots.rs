//! Local extrema detection shared by the trendline, level and structure engines.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotType {
    High,
    Low,
}

/// Indices that are pivots of order `order`: the value is >= (High) or <= (Low) the
/// `order` values on each side. Indices within `order` of either end are never
/// flagged, and a window where every value equals the candidate is a plateau, not
/// an extremum.
pub fn find_pivots(values: &[f64], order: usize, pivot_type: PivotType) -> Vec<usize> {
    if order == 0 || values.len() < 2 * order + 1 {
        return Vec::new();
    }

    (order..values.len() - order)
        .filter(|&i| {
            let candidate = values[i];
            let window = &values[i - order..=i + order];
            let dominates = window.iter().all(|&v| match pivot_type {
                PivotType::High => candidate >= v,
                PivotType::Low => candidate <= v,
            });
            let flat = window.iter().all(|&v| v == candidate);
            dominates && !flat
        })
        .collect()
}

pub fn pivot_highs(highs: &[f64], order: usize) -> Vec<usize> {
    find_pivots(highs, order, PivotType::High)
}

pub fn pivot_lows(lows: &[f64], order: usize) -> Vec<usize> {
    find_pivots(lows, order, PivotType::Low)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_simple_peaks_and_troughs() {
        let values = [1.0, 3.0, 2.0, 0.5, 2.0, 4.0, 1.0];
        assert_eq!(pivot_highs(&values, 1), vec![1, 5]);
        assert_eq!(pivot_lows(&values, 1), vec![3]);
    }

    #[test]
    fn never_flags_indices_near_boundaries() {
        let values: Vec<f64> = (0..40).map(|i| ((i * 7) % 11) as f64).collect();
        for order in 1..5 {
            for idx in pivot_highs(&values, order)
                .into_iter()
                .chain(pivot_lows(&values, order))
            {
                assert!(
                    idx >= order && idx < values.len() - order,
                    "index {} flagged within order {} of an edge",
                    idx,
                    order
                );
            }
        }
    }

    #[test]
    fn v_shape_has_a_single_trough() {
        let values = [3.0, 1.0, 3.0];
        assert_eq!(pivot_lows(&values, 1), vec![1]);
        assert!(pivot_highs(&values, 1).is_empty());
        assert!(pivot_lows(&values, 2).is_empty(), "needs 2k+1 values");
    }

    #[test]
    fn flat_plateau_is_not_a_pivot() {
        let flat = [5.0; 10];
        assert!(pivot_highs(&flat, 3).is_empty());
        assert!(pivot_lows(&flat, 3).is_empty());

        // Shared peak: both equal tops still dominate their windows
        let twin = [1.0, 2.0, 5.0, 5.0, 2.0, 1.0];
        assert_eq!(pivot_highs(&twin, 1), vec![2, 3]);
    }
}
