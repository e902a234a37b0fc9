/// Confidence arithmetic for span classification and chunk merging.

/// Clamp a heuristic score into the open interval heuristic rules are
/// allowed to produce: never exactly 0 and never exactly 1.
pub fn clamp_heuristic(score: f64) -> f64 {
    if score.is_nan() {
        return 0.05;
    }
    score.clamp(0.05, 0.95)
}

/// Clamp into the closed [0, 1] range used for final span confidences.
pub fn clamp_unit(score: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 1.0)
}

/// Confidence of a merged chunk: the weakest contributing span bounds
/// the whole chunk.
pub fn merged_confidence(confidences: &[f64]) -> f64 {
    if confidences.is_empty() {
        return 0.0;
    }
    let min = confidences.iter().copied().fold(f64::INFINITY, f64::min);
    clamp_unit(min)
}

/// Whether a classification passes its per-type acceptance threshold.
pub fn meets_threshold(confidence: f64, threshold: f64) -> bool {
    confidence >= threshold
}
