use crate::model::Criterion;
use std::collections::{HashMap, HashSet};

pub const MIN_SCORE: f64 = 1.0;
pub const MAX_SCORE: f64 = 10.0;
pub const SCORE_STEP: f64 = 0.5;

/// A judge's full evaluation of one project, ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub project_id: String,
    pub judge_id: String,
    /// criterion id -> score
    pub scores: HashMap<String, f64>,
    pub comment: String,
}

/// Check that a score lies in [1, 10] on a 0.5 grid
pub fn validate_score(score: f64) -> Result<(), String> {
    if !score.is_finite() {
        return Err("score must be a number".to_string());
    }
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(format!(
            "score {} out of range ({}-{})",
            score, MIN_SCORE, MAX_SCORE
        ));
    }
    if (score / SCORE_STEP).fract() != 0.0 {
        return Err(format!("score {} is not a multiple of {}", score, SCORE_STEP));
    }
    Ok(())
}

/// Validate a submission before it reaches the provider.
/// Returns all validation errors at once (not just the first).
pub fn validate_submission(submission: &Submission, criteria: &[Criterion]) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    let known: HashSet<&str> = criteria.iter().map(|c| c.id.as_str()).collect();

    // Every criterion needs a score
    for criterion in criteria {
        if !submission.scores.contains_key(&criterion.id) {
            errors.push(format!("{}: not scored", criterion.name));
        }
    }

    // Scores must be valid and point at known criteria
    let mut scored: Vec<(&String, &f64)> = submission.scores.iter().collect();
    scored.sort_by(|a, b| a.0.cmp(b.0));
    for (criterion_id, score) in scored {
        if !known.contains(criterion_id.as_str()) {
            errors.push(format!("{}: unknown criterion", criterion_id));
            continue;
        }
        if let Err(e) = validate_score(*score) {
            let name = criteria
                .iter()
                .find(|c| &c.id == criterion_id)
                .map(|c| c.name.as_str())
                .unwrap_or(criterion_id);
            errors.push(format!("{}: {}", name, e));
        }
    }

    if submission.comment.trim().is_empty() {
        errors.push("comment: required".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
