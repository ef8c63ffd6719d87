use challenge_hub::admin::{remove_record, seed_sample_data, RecordKind};
use challenge_hub::credentials::{authenticate, AuthError};
use challenge_hub::fetch::{fetch_or_cached, fetch_snapshot, rank_snapshot, Loaded};
use challenge_hub::judging::submit_evaluation;
use challenge_hub::provider::cache::CacheConfig;
use challenge_hub::provider::{DataProvider, FileProvider};
use challenge_hub::scoring::{build_reports, completed_count, judge_progress, Submission};
use challenge_hub::session::Identity;
use std::collections::HashMap;
use std::path::PathBuf;

fn temp_store(name: &str) -> (FileProvider, PathBuf) {
    let path = std::env::temp_dir().join(format!("challenge_hub_it_{}.json", name));
    let _ = std::fs::remove_file(&path);
    (FileProvider::new(path.clone()), path)
}

fn login(judges: &[challenge_hub::model::Judge], name: &str) -> (String, String) {
    match authenticate(judges, name, "1234", Some("admin-secret")) {
        Ok(Identity::Judge { id, name }) => (id, name),
        other => panic!("expected judge login, got {:?}", other),
    }
}

#[tokio::test]
async fn judges_evaluate_and_the_ranking_follows() {
    let (provider, path) = temp_store("evaluate");
    seed_sample_data(&provider).await.unwrap();

    let snapshot = fetch_snapshot(&provider).await.unwrap();
    let (smith, _) = login(&snapshot.judges, "dr. smith");
    let (johnson, _) = login(&snapshot.judges, "Prof. Johnson");
    let criteria = snapshot.criteria.clone();

    let mars = snapshot
        .projects
        .iter()
        .find(|p| p.name == "Mars Habitat Design")
        .unwrap()
        .id
        .clone();

    for (judge, score) in [(&smith, 9.0), (&johnson, 8.0)] {
        let submission = Submission {
            project_id: mars.clone(),
            judge_id: judge.clone(),
            scores: criteria.iter().map(|c| (c.id.clone(), score)).collect::<HashMap<_, _>>(),
            comment: "Well researched".to_string(),
        };
        submit_evaluation(&provider, &submission, &criteria).await.unwrap();
    }

    let snapshot = fetch_snapshot(&provider).await.unwrap();
    let rows = rank_snapshot(&snapshot);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].project.id, mars);
    // Three criteria, each averaging 8.5
    assert!((rows[0].total - 25.5).abs() < 1e-9);
    assert_eq!(rows[1].total, 0.0);

    let progress = judge_progress(&smith, &mars, &snapshot.criteria, &snapshot.ratings, &snapshot.comments);
    assert!(progress.is_complete());
    assert_eq!(
        completed_count(&smith, &snapshot.projects, &snapshot.criteria, &snapshot.ratings, &snapshot.comments),
        1
    );

    let reports = build_reports(
        &snapshot.projects,
        &snapshot.criteria,
        &snapshot.judges,
        &snapshot.ratings,
        &snapshot.comments,
    );
    let report = reports.iter().find(|r| r.project.id == mars).unwrap();
    assert_eq!(report.rating_count, 6);
    assert!((report.average - 8.5).abs() < 1e-9);
    assert_eq!(report.comments.len(), 2);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn wrong_password_is_rejected() {
    let judges = vec![challenge_hub::model::Judge {
        id: "j-1".to_string(),
        name: "Dr. Smith".to_string(),
        password_hash: "1234".to_string(),
    }];
    assert_eq!(
        authenticate(&judges, "Dr. Smith", "4321", Some("admin-secret")),
        Err(AuthError::InvalidCredentials)
    );
    assert_eq!(
        authenticate(&judges, "anyone", "admin-secret", Some("admin-secret")),
        Ok(Identity::Admin)
    );
}

#[tokio::test]
async fn removing_a_project_drops_its_evaluations() {
    let (provider, path) = temp_store("remove");
    seed_sample_data(&provider).await.unwrap();

    let snapshot = fetch_snapshot(&provider).await.unwrap();
    let (judge, _) = login(&snapshot.judges, "Dr. Smith");
    let project = snapshot.projects[0].id.clone();
    let submission = Submission {
        project_id: project.clone(),
        judge_id: judge,
        scores: snapshot.criteria.iter().map(|c| (c.id.clone(), 7.5)).collect(),
        comment: "Nice".to_string(),
    };
    submit_evaluation(&provider, &submission, &snapshot.criteria).await.unwrap();
    assert_eq!(provider.list_ratings().await.unwrap().len(), 3);

    remove_record(&provider, RecordKind::Project, &project).await.unwrap();

    let snapshot = fetch_snapshot(&provider).await.unwrap();
    assert_eq!(snapshot.projects.len(), 2);
    assert!(snapshot.ratings.is_empty());
    assert!(snapshot.comments.is_empty());
    assert_eq!(rank_snapshot(&snapshot).len(), 2);

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn reset_keeps_catalog() {
    let (provider, path) = temp_store("reset");
    seed_sample_data(&provider).await.unwrap();
    let snapshot = fetch_snapshot(&provider).await.unwrap();
    let (judge, _) = login(&snapshot.judges, "Prof. Johnson");
    let submission = Submission {
        project_id: snapshot.projects[1].id.clone(),
        judge_id: judge,
        scores: snapshot.criteria.iter().map(|c| (c.id.clone(), 3.0)).collect(),
        comment: "Needs work".to_string(),
    };
    submit_evaluation(&provider, &submission, &snapshot.criteria).await.unwrap();

    provider.reset_evaluations().await.unwrap();

    let snapshot = fetch_snapshot(&provider).await.unwrap();
    assert_eq!(snapshot.projects.len(), 3);
    assert_eq!(snapshot.judges.len(), 2);
    assert!(snapshot.ratings.is_empty());
    assert!(snapshot.comments.is_empty());

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn broken_store_falls_back_to_cached_snapshot() {
    let (provider, path) = temp_store("fallback");
    let cache_dir = std::env::temp_dir().join("challenge_hub_it_fallback_cache");
    let _ = std::fs::remove_dir_all(&cache_dir);
    let cache = CacheConfig { enabled: true };

    seed_sample_data(&provider).await.unwrap();
    let first = fetch_or_cached(&provider, "it-store", &cache, &cache_dir).await.unwrap();
    let Loaded::Fresh(fresh) = first else {
        panic!("first load should be fresh");
    };

    std::fs::write(&path, b"{ not json").unwrap();

    match fetch_or_cached(&provider, "it-store", &cache, &cache_dir).await.unwrap() {
        Loaded::Stale(stale, _) => {
            assert_eq!(stale.projects, fresh.projects);
            assert_eq!(rank_snapshot(&stale).len(), 3);
        }
        Loaded::Fresh(_) => panic!("corrupt store should not load"),
    }

    let disabled = CacheConfig { enabled: false };
    assert!(fetch_or_cached(&provider, "it-store", &disabled, &cache_dir).await.is_err());

    let _ = std::fs::remove_file(&path);
    let _ = std::fs::remove_dir_all(&cache_dir);
}
