use crate::config::PenaltyConfig;
use crate::detection::round2;
use crate::model::{PlagiarismVerdict, Severity};

/// Correctness after the plagiarism penalty.
///
/// Only a `Found` verdict with a correctness score is penalized; otherwise the
/// correctness score passes through unchanged (including when it is unset).
/// The result never exceeds the correctness score.
pub fn final_score(
    correctness_score: Option<f64>,
    verdict: Option<PlagiarismVerdict>,
    severity: Severity,
    penalties: &PenaltyConfig,
) -> Option<f64> {
    let score = correctness_score?;
    if !verdict.is_some_and(|v| v.is_found()) {
        return Some(score);
    }
    let penalty = penalties.fraction(severity);
    Some(round2(score * (1.0 - penalty)).min(score))
}
