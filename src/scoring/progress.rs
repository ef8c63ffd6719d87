use crate::model::{Comment, Criterion, Project, Rating};
use std::collections::HashSet;

/// How far one judge got with one project
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JudgeProgress {
    pub rated: usize,
    pub total: usize,
    pub has_comment: bool,
}

impl JudgeProgress {
    /// Every criterion rated and a non-empty comment left
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.rated == self.total && self.has_comment
    }

    /// Fraction of criteria rated, for progress bars
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.rated as f64 / self.total as f64
        }
    }
}

pub fn judge_progress(
    judge_id: &str,
    project_id: &str,
    criteria: &[Criterion],
    ratings: &[Rating],
    comments: &[Comment],
) -> JudgeProgress {
    let known: HashSet<&str> = criteria.iter().map(|c| c.id.as_str()).collect();

    let rated: HashSet<&str> = ratings
        .iter()
        .filter(|r| r.judge_id == judge_id && r.project_id == project_id)
        .map(|r| r.criterion_id.as_str())
        .filter(|id| known.contains(id))
        .collect();

    let has_comment = comments
        .iter()
        .any(|c| c.judge_id == judge_id && c.project_id == project_id && !c.is_blank());

    JudgeProgress {
        rated: rated.len(),
        total: criteria.len(),
        has_comment,
    }
}

/// Number of projects the judge has fully evaluated
pub fn completed_count(
    judge_id: &str,
    projects: &[Project],
    criteria: &[Criterion],
    ratings: &[Rating],
    comments: &[Comment],
) -> usize {
    projects
        .iter()
        .filter(|p| judge_progress(judge_id, &p.id, criteria, ratings, comments).is_complete())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria() -> Vec<Criterion> {
        vec![
            Criterion { id: "c1".to_string(), name: "Method".to_string() },
            Criterion { id: "c2".to_string(), name: "Presentation".to_string() },
        ]
    }

    fn rating(judge_id: &str, criterion_id: &str) -> Rating {
        Rating {
            project_id: "p1".to_string(),
            judge_id: judge_id.to_string(),
            criterion_id: criterion_id.to_string(),
            score: 7.0,
        }
    }

    fn comment(judge_id: &str, text: &str) -> Comment {
        Comment {
            project_id: "p1".to_string(),
            judge_id: judge_id.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_complete_needs_all_criteria_and_comment() {
        let ratings = vec![rating("j1", "c1"), rating("j1", "c2")];
        let comments = vec![comment("j1", "Nice work")];

        let progress = judge_progress("j1", "p1", &criteria(), &ratings, &comments);
        assert_eq!(progress.rated, 2);
        assert!(progress.has_comment);
        assert!(progress.is_complete());
    }

    #[test]
    fn test_missing_comment_is_incomplete() {
        let ratings = vec![rating("j1", "c1"), rating("j1", "c2")];
        let comments = vec![comment("j1", "  ")];

        let progress = judge_progress("j1", "p1", &criteria(), &ratings, &comments);
        assert!(!progress.has_comment);
        assert!(!progress.is_complete());
    }

    #[test]
    fn test_other_judges_do_not_count() {
        let ratings = vec![rating("j1", "c1"), rating("j2", "c2")];
        let comments = vec![comment("j2", "Not mine")];

        let progress = judge_progress("j1", "p1", &criteria(), &ratings, &comments);
        assert_eq!(progress.rated, 1);
        assert!(!progress.has_comment);
        assert_eq!(progress.ratio(), 0.5);
    }

    #[test]
    fn test_no_criteria_never_complete() {
        let comments = vec![comment("j1", "Nice work")];
        let progress = judge_progress("j1", "p1", &[], &[], &comments);
        assert!(!progress.is_complete());
        assert_eq!(progress.ratio(), 0.0);
    }

    #[test]
    fn test_retired_criterion_not_counted() {
        let ratings = vec![rating("j1", "c1"), rating("j1", "old")];
        let progress = judge_progress("j1", "p1", &criteria(), &ratings, &[]);
        assert_eq!(progress.rated, 1);
    }

    #[test]
    fn test_completed_count() {
        let projects = vec![
            Project { id: "p1".to_string(), name: "One".to_string() },
            Project { id: "p2".to_string(), name: "Two".to_string() },
        ];
        let ratings = vec![rating("j1", "c1"), rating("j1", "c2")];
        let comments = vec![comment("j1", "Done")];

        assert_eq!(completed_count("j1", &projects, &criteria(), &ratings, &comments), 1);
        assert_eq!(completed_count("j2", &projects, &criteria(), &ratings, &comments), 0);
    }
}
