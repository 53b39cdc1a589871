use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, info_span, Instrument};

use crate::ai_provider::AIProviderClient;
use crate::config::Config;
use crate::core::{
    generate_insights, ChatTurn, CheckinEntry, CheckinStore, DailyState, Insight,
    RecommendationSet, ScoreHistoryItem, HISTORY_LIMIT,
};
use crate::export::{DataExport, ExportFormat};
use crate::flows::LlmFlows;
use crate::generators::Generators;
use crate::monitoring::{ErrorTracker, Severity};
use crate::pipeline::{ChatOutcome, CheckinOutcome, CheckinPipeline};

/// Per-user wellness dashboard: runs the pipeline and keeps what it produces
pub struct Dashboard {
    pipeline: CheckinPipeline,
    store: Mutex<CheckinStore>,
    history_days: usize,
}

impl Dashboard {
    pub fn new(pipeline: CheckinPipeline, store: CheckinStore, history_days: usize) -> Self {
        Self {
            pipeline,
            store: Mutex::new(store),
            history_days,
        }
    }

    /// Wire up LLM-backed generators and the on-disk store from config
    pub fn from_config(
        config: &Config,
        provider: Option<String>,
        model: Option<String>,
    ) -> Result<Self> {
        let ai_config = config.get_ai_config(provider, model)?;
        let client = AIProviderClient::new(ai_config)?;
        let generators = Generators::from_shared(Arc::new(LlmFlows::new(client)));
        let tracker = Arc::new(ErrorTracker::new(
            config.error_tracking.enabled,
            config.error_tracking.max_events,
        ));

        let store = CheckinStore::new(config.database_path())
            .context("Failed to open check-in database")?;

        Ok(Self::new(
            CheckinPipeline::new(generators, tracker),
            store,
            config.history_days as usize,
        ))
    }

    /// Run a check-in and keep today's entry when it succeeds
    pub async fn check_in(
        &self,
        user_id: &str,
        fields: &HashMap<String, String>,
    ) -> CheckinOutcome {
        async {
            let submission = self.pipeline.process_checkin(fields).await;

            if let (Some(check_in), CheckinOutcome::Success { data }) =
                (submission.check_in, &submission.outcome)
            {
                let entry = CheckinEntry::new(
                    user_id,
                    today(),
                    check_in,
                    data.scores,
                    RecommendationSet {
                        personalized: data.personalized_recommendations.clone(),
                        habit_tools: data.habit_tools.clone(),
                    },
                );

                let saved = self.store.lock().await.save_daily_checkin(&entry);
                match saved {
                    Ok(()) => info!(date = %entry.date, "check-in saved"),
                    // caller still gets the scores
                    Err(e) => {
                        self.pipeline.tracker().capture(
                            &anyhow::Error::new(e).context("saving check-in failed"),
                            "save_checkin",
                            Severity::Medium,
                        );
                    }
                }
            }

            submission.outcome
        }
        .instrument(info_span!("check_in", user_id))
        .await
    }

    /// Ask the coach a question. Without a snapshot the stored state is used.
    pub async fn chat(
        &self,
        user_id: &str,
        question: &str,
        snapshot: Option<(Value, Value)>,
    ) -> Result<ChatOutcome> {
        async {
            let (check_in, scores) = match snapshot {
                Some(snapshot) => snapshot,
                None => {
                    let state = self.state(user_id).await?;
                    (
                        serde_json::to_value(&state.check_in)?,
                        serde_json::to_value(state.scores)?,
                    )
                }
            };

            if !question.trim().is_empty() {
                self.store
                    .lock()
                    .await
                    .append_chat_turn(user_id, &ChatTurn::user(question.trim()))?;
            }

            let outcome = self
                .pipeline
                .submit_chat_message(question, &check_in, &scores)
                .await;

            self.store
                .lock()
                .await
                .append_chat_turn(user_id, &ChatTurn::assistant(outcome.message()))?;

            Ok::<_, anyhow::Error>(outcome)
        }
        .instrument(info_span!("chat", user_id))
        .await
    }

    /// Latest check-in, recent scores and the conversation so far
    pub async fn state(&self, user_id: &str) -> Result<DailyState> {
        let store = self.store.lock().await;
        let mut state = DailyState::default();

        if let Some(latest) = store.latest_checkin(user_id)? {
            state.apply_checkin(&latest);
        }

        // stored history replaces the single entry apply_checkin added
        state.score_history = store.score_history(user_id, HISTORY_LIMIT)?.into_iter().collect();
        state.chat_history.extend(store.chat_history(user_id)?);

        Ok(state)
    }

    pub async fn history(&self, user_id: &str, days: Option<usize>) -> Result<Vec<ScoreHistoryItem>> {
        let days = days.unwrap_or(self.history_days);
        Ok(self.store.lock().await.score_history(user_id, days)?)
    }

    pub async fn insights(&self, user_id: &str) -> Result<Vec<Insight>> {
        let entries = self.store.lock().await.list_checkins(user_id)?;
        Ok(generate_insights(&entries, today()))
    }

    pub async fn export(&self, user_id: &str, format: ExportFormat) -> Result<String> {
        let export = {
            let store = self.store.lock().await;
            DataExport {
                user_id: user_id.to_string(),
                check_ins: store.list_checkins(user_id)?,
                chat_history: store.chat_history(user_id)?,
            }
        };
        export.render(format)
    }

    /// Forget everything stored for a user; returns the number of rows removed
    pub async fn reset(&self, user_id: &str) -> Result<usize> {
        let removed = self.store.lock().await.delete_user_data(user_id)?;
        info!(user_id, removed, "user data deleted");
        Ok(removed)
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}
