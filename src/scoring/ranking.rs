use crate::model::{Criterion, Project, Rating};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// One line of the ranking table. Derived, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingRow {
    pub position: usize, // 1-based
    pub project: Project,
    /// criterion id -> mean score across every rating row for that criterion.
    /// Criteria nobody rated map to 0.0.
    pub scores: HashMap<String, f64>,
    /// Sum of the per-criterion averages
    pub total: f64,
}

impl RankingRow {
    pub fn average_for(&self, criterion_id: &str) -> f64 {
        self.scores.get(criterion_id).copied().unwrap_or(0.0)
    }
}

#[derive(Default)]
struct Accumulator {
    sum: f64,
    count: u32,
}

impl Accumulator {
    fn mean(&self) -> f64 {
        if self.count > 0 {
            self.sum / self.count as f64
        } else {
            0.0
        }
    }
}

/// Mean score per (project id, criterion id), over rating rows whose project and
/// criterion are both known. Ratings pointing elsewhere are dropped.
pub(crate) fn criterion_means<'a>(
    projects: &'a [Project],
    criteria: &'a [Criterion],
    ratings: &'a [Rating],
) -> HashMap<(&'a str, &'a str), f64> {
    let project_ids: HashSet<&str> = projects.iter().map(|p| p.id.as_str()).collect();
    let criterion_ids: HashSet<&str> = criteria.iter().map(|c| c.id.as_str()).collect();

    let mut groups: HashMap<(&str, &str), Accumulator> = HashMap::new();
    let mut dropped = 0usize;

    for rating in ratings {
        let project_id = rating.project_id.as_str();
        let criterion_id = rating.criterion_id.as_str();
        if !project_ids.contains(project_id) || !criterion_ids.contains(criterion_id) {
            dropped += 1;
            continue;
        }
        let acc = groups.entry((project_id, criterion_id)).or_default();
        acc.sum += rating.score;
        acc.count += 1;
    }

    if dropped > 0 {
        tracing::warn!(dropped, "ignored ratings referencing unknown projects or criteria");
    }

    groups
        .into_iter()
        .map(|(key, acc)| (key, acc.mean()))
        .collect()
}

/// Compute the ranking for a snapshot.
///
/// Every project gets one row. Rows are ordered by total descending; equal
/// totals fall back to project name, then project id, so the order never
/// depends on input order. Empty projects or criteria yield an empty ranking.
pub fn compute_ranking(
    projects: &[Project],
    criteria: &[Criterion],
    ratings: &[Rating],
) -> Vec<RankingRow> {
    if projects.is_empty() || criteria.is_empty() {
        return Vec::new();
    }

    let means = criterion_means(projects, criteria, ratings);

    let mut rows: Vec<RankingRow> = projects
        .iter()
        .map(|project| {
            let scores: HashMap<String, f64> = criteria
                .iter()
                .map(|criterion| {
                    let avg = means
                        .get(&(project.id.as_str(), criterion.id.as_str()))
                        .copied()
                        .unwrap_or(0.0);
                    (criterion.id.clone(), avg)
                })
                .collect();

            // Sum in criteria order so the total is reproducible bit for bit
            let total = criteria
                .iter()
                .map(|c| scores.get(&c.id).copied().unwrap_or(0.0))
                .sum();

            RankingRow {
                position: 0,
                project: project.clone(),
                scores,
                total,
            }
        })
        .collect();

    rows.sort_by(compare_rows);

    for (idx, row) in rows.iter_mut().enumerate() {
        row.position = idx + 1;
    }

    rows
}

fn compare_rows(a: &RankingRow, b: &RankingRow) -> Ordering {
    // Primary: total descending
    b.total
        .total_cmp(&a.total)
        // Tie-breakers: name, then id
        .then_with(|| a.project.name.cmp(&b.project.name))
        .then_with(|| a.project.id.cmp(&b.project.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(id: &str, name: &str) -> Project {
        Project { id: id.to_string(), name: name.to_string() }
    }

    fn criterion(id: &str, name: &str) -> Criterion {
        Criterion { id: id.to_string(), name: name.to_string() }
    }

    fn rating(project_id: &str, judge_id: &str, criterion_id: &str, score: f64) -> Rating {
        Rating {
            project_id: project_id.to_string(),
            judge_id: judge_id.to_string(),
            criterion_id: criterion_id.to_string(),
            score,
        }
    }

    #[test]
    fn test_two_projects_single_criterion() {
        let projects = vec![project("p1", "Alpha"), project("p2", "Beta")];
        let criteria = vec![criterion("c1", "Method")];
        let ratings = vec![
            rating("p1", "judgeA", "c1", 8.0),
            rating("p1", "judgeB", "c1", 6.0),
            rating("p2", "judgeA", "c1", 9.0),
        ];

        let rows = compute_ranking(&projects, &criteria, &ratings);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].project.id, "p2");
        assert_eq!(rows[0].position, 1);
        assert_eq!(rows[0].total, 9.0);
        assert_eq!(rows[1].project.id, "p1");
        assert_eq!(rows[1].position, 2);
        assert_eq!(rows[1].average_for("c1"), 7.0);
        assert_eq!(rows[1].total, 7.0);
    }

    #[test]
    fn test_mean_is_over_rows_not_per_judge() {
        // judgeA rated c1 twice (duplicate row); the mean counts every row
        let projects = vec![project("p1", "Alpha")];
        let criteria = vec![criterion("c1", "Method")];
        let ratings = vec![
            rating("p1", "judgeA", "c1", 10.0),
            rating("p1", "judgeA", "c1", 10.0),
            rating("p1", "judgeB", "c1", 4.0),
        ];

        let rows = compute_ranking(&projects, &criteria, &ratings);
        assert_eq!(rows[0].average_for("c1"), 8.0);
    }

    #[test]
    fn test_unrated_criterion_is_zero_and_present() {
        let projects = vec![project("p1", "Alpha")];
        let criteria = vec![criterion("c1", "Method"), criterion("c2", "Creativity")];
        let ratings = vec![rating("p1", "j", "c1", 5.0)];

        let rows = compute_ranking(&projects, &criteria, &ratings);
        assert_eq!(rows[0].scores.len(), 2);
        assert_eq!(rows[0].scores.get("c2"), Some(&0.0));
        assert_eq!(rows[0].total, 5.0);
    }

    #[test]
    fn test_unknown_references_are_dropped() {
        let projects = vec![project("p1", "Alpha")];
        let criteria = vec![criterion("c1", "Method")];
        let ratings = vec![
            rating("p1", "j", "c1", 6.0),
            rating("p1", "j", "ghost-criterion", 10.0),
            rating("ghost-project", "j", "c1", 10.0),
        ];

        let rows = compute_ranking(&projects, &criteria, &ratings);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total, 6.0);
        assert!(!rows[0].scores.contains_key("ghost-criterion"));
    }

    #[test]
    fn test_empty_inputs_yield_empty_ranking() {
        let projects = vec![project("p1", "Alpha")];
        let criteria = vec![criterion("c1", "Method")];

        assert!(compute_ranking(&[], &criteria, &[]).is_empty());
        assert!(compute_ranking(&projects, &[], &[]).is_empty());
    }

    #[test]
    fn test_ties_break_by_name_then_id() {
        let projects = vec![
            project("p3", "Zeta"),
            project("p2", "Alpha"),
            project("p1", "Alpha"),
        ];
        let criteria = vec![criterion("c1", "Method")];

        let rows = compute_ranking(&projects, &criteria, &[]);
        let order: Vec<&str> = rows.iter().map(|r| r.project.id.as_str()).collect();
        assert_eq!(order, vec!["p1", "p2", "p3"]);
        assert_eq!(rows.iter().map(|r| r.position).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_order_independent_of_input_order() {
        let criteria = vec![criterion("c1", "Method")];
        let ratings = vec![rating("p1", "j", "c1", 5.0), rating("p2", "j", "c1", 5.0)];

        let forward = compute_ranking(
            &[project("p1", "One"), project("p2", "Two")],
            &criteria,
            &ratings,
        );
        let reversed = compute_ranking(
            &[project("p2", "Two"), project("p1", "One")],
            &criteria,
            &ratings,
        );
        assert_eq!(forward, reversed);
    }
}
