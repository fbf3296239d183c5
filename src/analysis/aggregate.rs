use crate::models::gri::round1;

/// Network median of overall scores. Empty input is 0.
pub fn median_of(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }

    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;

    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Arithmetic mean rounded to one decimal. Empty input is 0.
pub fn mean_of(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    round1(scores.iter().sum::<f64>() / scores.len() as f64)
}
