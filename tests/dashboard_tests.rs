//! Dashboard persistence around the check-in pipeline

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use neurocalm::core::{CheckinStore, ScorePair};
use neurocalm::dashboard::Dashboard;
use neurocalm::generators::{
    Generators, Guidance, GuidanceGenerator, GuidanceInput, HabitToolGenerator, HabitToolInput,
    PersonalizedInput, PersonalizedRecommendationGenerator, Recommendations, ScoreGenerator,
    ScoreInput,
};
use neurocalm::monitoring::ErrorTracker;
use neurocalm::pipeline::{CheckinOutcome, CheckinPipeline, CHECKIN_FAILED};

/// Coach whose scoring step can be switched off
struct Coach {
    scoring_down: bool,
}

#[async_trait]
impl ScoreGenerator for Coach {
    async fn generate_scores(&self, _input: ScoreInput) -> Result<ScorePair> {
        if self.scoring_down {
            return Err(anyhow!("model unavailable"));
        }
        Ok(ScorePair::new(75.0, 80.0))
    }
}

#[async_trait]
impl PersonalizedRecommendationGenerator for Coach {
    async fn recommend(&self, _input: PersonalizedInput) -> Result<Recommendations> {
        Ok(Recommendations {
            recommendations: vec!["Take breaks".to_string()],
        })
    }
}

#[async_trait]
impl HabitToolGenerator for Coach {
    async fn recommend_habit_tools(&self, _input: HabitToolInput) -> Result<Recommendations> {
        Ok(Recommendations {
            recommendations: vec!["Deep breathing".to_string()],
        })
    }
}

#[async_trait]
impl GuidanceGenerator for Coach {
    async fn answer(&self, _input: GuidanceInput) -> Result<Guidance> {
        Ok(Guidance {
            answer: "Go for a walk.".to_string(),
        })
    }
}

fn dashboard(scoring_down: bool, store: CheckinStore) -> (Dashboard, Arc<ErrorTracker>) {
    let tracker = Arc::new(ErrorTracker::default());
    let pipeline = CheckinPipeline::new(
        Generators::from_shared(Arc::new(Coach { scoring_down })),
        tracker.clone(),
    );
    (Dashboard::new(pipeline, store, 7), tracker)
}

fn valid_form() -> HashMap<String, String> {
    [
        ("mood", "7"),
        ("sleep", "8"),
        ("diet", "Healthy meals"),
        ("exercise", "30 min walk"),
        ("stressors", "Work deadlines"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

#[tokio::test]
async fn test_failed_generation_stores_nothing() {
    let store = CheckinStore::new(PathBuf::from(":memory:")).unwrap();
    let (dashboard, _tracker) = dashboard(true, store);

    let outcome = dashboard.check_in("alice", &valid_form()).await;
    assert!(matches!(outcome, CheckinOutcome::Error { ref error } if error == CHECKIN_FAILED));

    assert!(dashboard.history("alice", None).await.unwrap().is_empty());
    let state = dashboard.state("alice").await.unwrap();
    assert!(!state.has_checked_in());
}

#[tokio::test]
async fn test_save_failure_still_returns_scores() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("neurocalm.db");
    let store = CheckinStore::new(db_path.clone()).unwrap();

    // break the table from a second connection
    rusqlite::Connection::open(&db_path)
        .unwrap()
        .execute_batch("DROP TABLE daily_checkins")
        .unwrap();

    let (dashboard, tracker) = dashboard(false, store);
    let outcome = dashboard.check_in("bob", &valid_form()).await;

    match outcome {
        CheckinOutcome::Success { data } => assert_eq!(data.scores, ScorePair::new(75.0, 80.0)),
        other => panic!("expected success, got {:?}", other),
    }

    let events = tracker.recent();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].flow, "save_checkin");
}
