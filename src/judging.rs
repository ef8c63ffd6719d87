use crate::model::{Comment, Criterion, Rating};
use crate::provider::{DataProvider, ProviderError};
use crate::scoring::{validate_submission, Submission};

/// Validate and write one judge's evaluation of a project.
///
/// Ratings are upserted in criteria order, then the comment. The provider
/// keeps one row per key, so resubmitting replaces the previous evaluation.
/// A failure part-way leaves earlier rows written; submitting again converges.
pub async fn submit_evaluation<P: DataProvider>(
    provider: &P,
    submission: &Submission,
    criteria: &[Criterion],
) -> Result<(), ProviderError> {
    validate_submission(submission, criteria).map_err(|errors| ProviderError::Invalid(errors.join("; ")))?;

    for criterion in criteria {
        // validate_submission guarantees every criterion is scored
        let Some(&score) = submission.scores.get(&criterion.id) else {
            continue;
        };
        provider
            .upsert_rating(&Rating {
                project_id: submission.project_id.clone(),
                judge_id: submission.judge_id.clone(),
                criterion_id: criterion.id.clone(),
                score,
            })
            .await?;
    }

    provider
        .upsert_comment(&Comment {
            project_id: submission.project_id.clone(),
            judge_id: submission.judge_id.clone(),
            text: submission.comment.trim().to_string(),
        })
        .await?;

    tracing::debug!(
        project = %submission.project_id,
        judge = %submission.judge_id,
        ratings = criteria.len(),
        "evaluation saved"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::FileProvider;
    use std::collections::HashMap;
    use std::env;

    #[tokio::test]
    async fn test_submit_then_resubmit_replaces() {
        let path = env::temp_dir().join("challenge_hub_test_submit.json");
        let _ = std::fs::remove_file(&path);
        let provider = FileProvider::new(path.clone());

        provider.add_project("AI for Recycling").await.unwrap();
        provider.add_criterion("Creativity").await.unwrap();
        provider.add_criterion("Presentation").await.unwrap();
        provider.add_judge("Dr. Smith", "1234").await.unwrap();

        let project_id = provider.list_projects().await.unwrap()[0].id.clone();
        let judge_id = provider.list_judges().await.unwrap()[0].id.clone();
        let criteria = provider.list_criteria().await.unwrap();

        let mut submission = Submission {
            project_id,
            judge_id,
            scores: criteria.iter().map(|c| (c.id.clone(), 6.0)).collect::<HashMap<_, _>>(),
            comment: "Promising ".to_string(),
        };
        submit_evaluation(&provider, &submission, &criteria).await.unwrap();

        for score in submission.scores.values_mut() {
            *score = 9.0;
        }
        submission.comment = "Much improved".to_string();
        submit_evaluation(&provider, &submission, &criteria).await.unwrap();

        let ratings = provider.list_ratings().await.unwrap();
        assert_eq!(ratings.len(), 2);
        assert!(ratings.iter().all(|r| r.score == 9.0));

        let comments = provider.list_comments().await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].text, "Much improved");

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_incomplete_submission_writes_nothing() {
        let path = env::temp_dir().join("challenge_hub_test_submit_invalid.json");
        let _ = std::fs::remove_file(&path);
        let provider = FileProvider::new(path.clone());

        provider.add_project("Mars Habitat Design").await.unwrap();
        provider.add_criterion("Creativity").await.unwrap();
        provider.add_judge("Prof. Johnson", "1234").await.unwrap();
        let criteria = provider.list_criteria().await.unwrap();

        let submission = Submission {
            project_id: provider.list_projects().await.unwrap()[0].id.clone(),
            judge_id: provider.list_judges().await.unwrap()[0].id.clone(),
            scores: HashMap::new(),
            comment: String::new(),
        };
        let err = submit_evaluation(&provider, &submission, &criteria)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Invalid(_)));
        assert!(provider.list_ratings().await.unwrap().is_empty());

        let _ = std::fs::remove_file(&path);
    }
}
