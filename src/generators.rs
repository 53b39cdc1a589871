//! Capabilities the check-in pipeline calls out to.
//!
//! Each generator is an opaque async function that may fail. The LLM-backed
//! implementations live in [`crate::flows`].

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::ScorePair;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreInput {
    pub mood: u8,
    pub sleep: f64,
    pub diet: String,
    pub exercise: String,
    pub stressors: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalizedInput {
    pub calm_index: f64,
    pub productivity_index: f64,
    pub user_goals: String,
}

/// Mood and sleep arrive pre-formatted ("7/10", "8 hours")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitToolInput {
    pub mood: String,
    pub sleep: String,
    pub diet: String,
    pub exercise: String,
    pub stressors: String,
    pub calm_index: f64,
    pub productivity_index: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidanceInput {
    pub question: String,
    pub calm_index: f64,
    pub productivity_index: f64,
    pub mood: String,
    pub sleep: String,
    pub diet: String,
    pub exercise: String,
    pub stressors: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guidance {
    pub answer: String,
}

#[async_trait]
pub trait ScoreGenerator: Send + Sync {
    async fn generate_scores(&self, input: ScoreInput) -> Result<ScorePair>;
}

#[async_trait]
pub trait PersonalizedRecommendationGenerator: Send + Sync {
    async fn recommend(&self, input: PersonalizedInput) -> Result<Recommendations>;
}

#[async_trait]
pub trait HabitToolGenerator: Send + Sync {
    async fn recommend_habit_tools(&self, input: HabitToolInput) -> Result<Recommendations>;
}

#[async_trait]
pub trait GuidanceGenerator: Send + Sync {
    async fn answer(&self, input: GuidanceInput) -> Result<Guidance>;
}

/// The four generators a pipeline needs
#[derive(Clone)]
pub struct Generators {
    pub scores: Arc<dyn ScoreGenerator>,
    pub personalized: Arc<dyn PersonalizedRecommendationGenerator>,
    pub habit_tools: Arc<dyn HabitToolGenerator>,
    pub guidance: Arc<dyn GuidanceGenerator>,
}

impl Generators {
    /// Use one implementation for every capability
    pub fn from_shared<G>(generator: Arc<G>) -> Self
    where
        G: ScoreGenerator
            + PersonalizedRecommendationGenerator
            + HabitToolGenerator
            + GuidanceGenerator
            + 'static,
    {
        Self {
            scores: generator.clone(),
            personalized: generator.clone(),
            habit_tools: generator.clone(),
            guidance: generator,
        }
    }
}
