use super::ranking::criterion_means;
use crate::model::{Comment, Criterion, Judge, Project, Rating};
use std::collections::HashSet;

/// Printable feedback for one project.
///
/// `average` divides the sum of every rating row by the number of rows. It is
/// NOT the ranking total (a sum of per-criterion means) and the two diverge
/// whenever criteria carry different numbers of ratings.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectReport {
    pub project: Project,
    /// Per-criterion means in criteria order, 0.0 when unrated
    pub criterion_averages: Vec<(Criterion, f64)>,
    pub average: f64,
    pub rating_count: usize,
    pub comments: Vec<ReportComment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportComment {
    pub judge: Option<String>, // judge name when known
    pub text: String,
}

/// Build one report per project, keeping the given project order.
pub fn build_reports(
    projects: &[Project],
    criteria: &[Criterion],
    judges: &[Judge],
    ratings: &[Rating],
    comments: &[Comment],
) -> Vec<ProjectReport> {
    let means = criterion_means(projects, criteria, ratings);
    let criterion_ids: HashSet<&str> = criteria.iter().map(|c| c.id.as_str()).collect();

    projects
        .iter()
        .map(|project| {
            let criterion_averages = criteria
                .iter()
                .map(|c| {
                    let avg = means
                        .get(&(project.id.as_str(), c.id.as_str()))
                        .copied()
                        .unwrap_or(0.0);
                    (c.clone(), avg)
                })
                .collect();

            let scores: Vec<f64> = ratings
                .iter()
                .filter(|r| {
                    r.project_id == project.id && criterion_ids.contains(r.criterion_id.as_str())
                })
                .map(|r| r.score)
                .collect();
            let rating_count = scores.len();
            let average = if rating_count > 0 {
                scores.iter().sum::<f64>() / rating_count as f64
            } else {
                0.0
            };

            let comments = comments
                .iter()
                .filter(|c| c.project_id == project.id && !c.is_blank())
                .map(|c| ReportComment {
                    judge: judges
                        .iter()
                        .find(|j| j.id == c.judge_id)
                        .map(|j| j.name.clone()),
                    text: c.text.trim().to_string(),
                })
                .collect();

            ProjectReport {
                project: project.clone(),
                criterion_averages,
                average,
                rating_count,
                comments,
            }
        })
        .collect()
}
