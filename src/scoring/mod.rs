pub mod progress;
pub mod ranking;
pub mod report;
pub mod validation;

pub use progress::{completed_count, judge_progress, JudgeProgress};
pub use ranking::{compute_ranking, RankingRow};
pub use report::{build_reports, ProjectReport, ReportComment};
pub use validation::{validate_score, validate_submission, Submission, MAX_SCORE, MIN_SCORE, SCORE_STEP};
