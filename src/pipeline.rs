//! Check-in to insight pipeline.
//!
//! A submission is validated, then scored, then turned into personalized and
//! habit-tool recommendations, strictly in that order. Failures never cross
//! this boundary as errors: callers get a tagged outcome with a fixed
//! user-facing message, and the cause goes to the [`ErrorTracker`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::{validate_chat, validate_checkin, CheckIn, ScorePair};
use crate::generators::{GuidanceInput, Generators, HabitToolInput, PersonalizedInput, ScoreInput};
use crate::monitoring::{ErrorTracker, Severity};

pub const INVALID_FORM_DATA: &str = "Invalid form data.";
pub const CHECKIN_FAILED: &str = "Failed to process data. Please try again.";
pub const CHAT_FAILED: &str = "Sorry, I couldn't process that. Please try again.";
pub const CHECKIN_REQUIRED: &str = "I can answer your questions more effectively once you've completed your daily check-in. Please fill out the check-in form first.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinResult {
    pub scores: ScorePair,
    pub personalized_recommendations: Vec<String>,
    pub habit_tools: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CheckinOutcome {
    Success { data: CheckinResult },
    Error { error: String },
}

impl CheckinOutcome {
    fn error(message: &str) -> Self {
        CheckinOutcome::Error {
            error: message.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CheckinOutcome::Success { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ChatOutcome {
    Success { answer: String },
    Error { error: String },
}

impl ChatOutcome {
    /// The text shown in the conversation either way
    pub fn message(&self) -> &str {
        match self {
            ChatOutcome::Success { answer } => answer,
            ChatOutcome::Error { error } => error,
        }
    }
}

/// A processed check-in together with the validated input, when it validated
#[derive(Debug, Clone)]
pub struct CheckinSubmission {
    pub check_in: Option<CheckIn>,
    pub outcome: CheckinOutcome,
}

pub struct CheckinPipeline {
    generators: Generators,
    tracker: Arc<ErrorTracker>,
}

impl CheckinPipeline {
    pub fn new(generators: Generators, tracker: Arc<ErrorTracker>) -> Self {
        Self {
            generators,
            tracker,
        }
    }

    pub fn tracker(&self) -> &ErrorTracker {
        &self.tracker
    }

    /// Validate raw form fields and run the three generators in sequence
    pub async fn submit_checkin(&self, fields: &HashMap<String, String>) -> CheckinOutcome {
        self.process_checkin(fields).await.outcome
    }

    /// Same as [`submit_checkin`](Self::submit_checkin), also handing back the
    /// validated check-in so callers can persist it
    pub async fn process_checkin(&self, fields: &HashMap<String, String>) -> CheckinSubmission {
        let check_in = match validate_checkin(fields) {
            Ok(check_in) => check_in,
            Err(e) => {
                warn!(errors = ?e.field_errors(), "check-in rejected");
                return CheckinSubmission {
                    check_in: None,
                    outcome: CheckinOutcome::error(INVALID_FORM_DATA),
                };
            }
        };

        let outcome = match self.generate(&check_in).await {
            Ok(data) => {
                info!(
                    calm_index = data.scores.calm_index,
                    productivity_index = data.scores.productivity_index,
                    "check-in scored"
                );
                CheckinOutcome::Success { data }
            }
            Err(err) => {
                self.tracker.capture(&err, "daily_checkin", Severity::High);
                CheckinOutcome::error(CHECKIN_FAILED)
            }
        };

        CheckinSubmission {
            check_in: Some(check_in),
            outcome,
        }
    }

    async fn generate(&self, check_in: &CheckIn) -> Result<CheckinResult> {
        let scores = self
            .generators
            .scores
            .generate_scores(ScoreInput {
                mood: check_in.mood,
                sleep: check_in.sleep,
                diet: check_in.diet.clone(),
                exercise: check_in.exercise.clone(),
                stressors: check_in.stressors.clone(),
            })
            .await
            .context("score generation failed")?;
        debug!(?scores, "scores generated");

        let personalized = self
            .generators
            .personalized
            .recommend(PersonalizedInput {
                calm_index: scores.calm_index,
                productivity_index: scores.productivity_index,
                user_goals: check_in.user_goals.clone(),
            })
            .await
            .context("personalized recommendation generation failed")?;

        let habit_tools = self
            .generators
            .habit_tools
            .recommend_habit_tools(HabitToolInput {
                mood: check_in.mood_label(),
                sleep: check_in.sleep_label(),
                diet: check_in.diet.clone(),
                exercise: check_in.exercise.clone(),
                stressors: check_in.stressors.clone(),
                calm_index: scores.calm_index,
                productivity_index: scores.productivity_index,
            })
            .await
            .context("habit tool generation failed")?;

        Ok(CheckinResult {
            scores,
            personalized_recommendations: personalized.recommendations,
            habit_tools: habit_tools.recommendations,
        })
    }

    /// Answer a coaching question grounded in the caller's latest snapshot
    pub async fn submit_chat_message(
        &self,
        question: &str,
        check_in: &Value,
        scores: &Value,
    ) -> ChatOutcome {
        let request = match validate_chat(question, check_in, scores) {
            Ok(request) => request,
            Err(e) => {
                warn!(errors = ?e.field_errors(), "chat message rejected");
                return ChatOutcome::Error {
                    error: e.field_errors().join(", "),
                };
            }
        };

        if request.check_in.diet.is_empty() || request.scores.calm_index == 0.0 {
            debug!("no check-in yet, skipping guidance");
            return ChatOutcome::Success {
                answer: CHECKIN_REQUIRED.to_string(),
            };
        }

        let input = GuidanceInput {
            question: request.question,
            calm_index: request.scores.calm_index,
            productivity_index: request.scores.productivity_index,
            mood: request.check_in.mood_label(),
            sleep: request.check_in.sleep_label(),
            diet: request.check_in.diet,
            exercise: request.check_in.exercise,
            stressors: request.check_in.stressors,
        };

        match self
            .generators
            .guidance
            .answer(input)
            .await
            .context("guidance generation failed")
        {
            Ok(guidance) => ChatOutcome::Success {
                answer: guidance.answer,
            },
            Err(err) => {
                self.tracker.capture(&err, "coach_chat", Severity::Medium);
                ChatOutcome::Error {
                    error: CHAT_FAILED.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_wire_shape() {
        let success = CheckinOutcome::Success {
            data: CheckinResult {
                scores: ScorePair::new(75.0, 80.0),
                personalized_recommendations: vec!["Take breaks".to_string()],
                habit_tools: vec![],
            },
        };
        let value = serde_json::to_value(&success).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["data"]["scores"]["calmIndex"], 75.0);
        assert_eq!(value["data"]["personalizedRecommendations"][0], "Take breaks");
        assert!(value["data"]["habitTools"].as_array().unwrap().is_empty());

        let error = serde_json::to_value(CheckinOutcome::error(INVALID_FORM_DATA)).unwrap();
        assert_eq!(
            error,
            serde_json::json!({"status": "error", "error": "Invalid form data."})
        );
    }

    #[test]
    fn test_chat_outcome_message() {
        let ok = ChatOutcome::Success {
            answer: "Breathe".to_string(),
        };
        assert_eq!(ok.message(), "Breathe");
        let value = serde_json::to_value(&ok).unwrap();
        assert_eq!(value, serde_json::json!({"status": "success", "answer": "Breathe"}));
    }
}
