use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::ai_provider::AIProviderClient;
use crate::core::ScorePair;
use crate::generators::{
    Guidance, GuidanceGenerator, GuidanceInput, HabitToolGenerator, HabitToolInput,
    PersonalizedInput, PersonalizedRecommendationGenerator, Recommendations, ScoreGenerator,
    ScoreInput,
};

const SYSTEM_PROMPT: &str = "You are a personal brain coach focused on mental wellness and \
productivity. Always reply with a single JSON object and nothing else.";

/// Generators backed by prompts to a chat-completion model
pub struct LlmFlows {
    client: AIProviderClient,
}

impl LlmFlows {
    pub fn new(client: AIProviderClient) -> Self {
        Self { client }
    }

    async fn run<T: serde::de::DeserializeOwned>(&self, flow: &str, prompt: String) -> Result<T> {
        debug!(
            flow,
            provider = %self.client.get_provider(),
            model = self.client.get_model(),
            "running flow"
        );
        self.client
            .complete_json(prompt, Some(SYSTEM_PROMPT.to_string()))
            .await
    }
}

fn score_prompt(input: &ScoreInput) -> String {
    format!(
        "Analyze the user's daily check-in data and provide a Calm Index and Productivity Index score.

Data:
Mood: {mood}
Sleep: {sleep} hours
Diet: {diet}
Exercise: {exercise}
Stressors: {stressors}

Instructions:
1. Consider all factors to determine the Calm Index and Productivity Index.
2. Calm Index reflects the user's overall calmness and peace of mind.
3. Productivity Index reflects the user's ability to focus and be productive.
4. Both indices should be on a scale of 0-100.
5. Provide scores that are reasonable and reflect the data provided.

Respond as JSON: {{\"calmIndex\": number, \"productivityIndex\": number}}",
        mood = input.mood,
        sleep = input.sleep,
        diet = input.diet,
        exercise = input.exercise,
        stressors = input.stressors,
    )
}

fn personalized_prompt(input: &PersonalizedInput) -> String {
    format!(
        "Generate personalized recommendations based on the user's Calm Index, Productivity Index, and stated goals.

Calm Index: {calm}
Productivity Index: {productivity}
User Goals: {goals}

Provide 3-5 actionable recommendations to help the user rewire habits, reduce stress, and improve focus.

Respond as JSON: {{\"recommendations\": [string, ...]}}",
        calm = input.calm_index,
        productivity = input.productivity_index,
        goals = input.user_goals,
    )
}

fn habit_tool_prompt(input: &HabitToolInput) -> String {
    format!(
        "Based on the user's self-reported data, provide a list of specific, actionable recommendations to detoxify their thinking and improve their mental habits.

Consider the following factors:
- Mood: {mood}
- Sleep: {sleep}
- Diet: {diet}
- Exercise: {exercise}
- Stressors: {stressors}
- Calm Index: {calm}
- Productivity Index: {productivity}

Example items: \"Practice mindfulness meditation for 10 minutes daily.\", \"Reduce caffeine intake after 2 PM.\"

Respond as JSON: {{\"recommendations\": [string, ...]}}",
        mood = input.mood,
        sleep = input.sleep,
        diet = input.diet,
        exercise = input.exercise,
        stressors = input.stressors,
        calm = input.calm_index,
        productivity = input.productivity_index,
    )
}

fn guidance_prompt(input: &GuidanceInput) -> String {
    format!(
        "You are an AI Brain Coach answering questions about mental wellness with personalized guidance.

You know the following about the user:
- Calm Index: {calm}
- Productivity Index: {productivity}
- Mood: {mood}
- Sleep: {sleep}
- Diet: {diet}
- Exercise: {exercise}
- Stressors: {stressors}

Based on this information, answer the following question and provide personalized guidance:
{question}

Do not provide medical advice. Refer to rewiring habits, not clinical intervention.

Respond as JSON: {{\"answer\": string}}",
        calm = input.calm_index,
        productivity = input.productivity_index,
        mood = input.mood,
        sleep = input.sleep,
        diet = input.diet,
        exercise = input.exercise,
        stressors = input.stressors,
        question = input.question,
    )
}

#[async_trait]
impl ScoreGenerator for LlmFlows {
    async fn generate_scores(&self, input: ScoreInput) -> Result<ScorePair> {
        self.run("analyze_mental_state", score_prompt(&input)).await
    }
}

#[async_trait]
impl PersonalizedRecommendationGenerator for LlmFlows {
    async fn recommend(&self, input: PersonalizedInput) -> Result<Recommendations> {
        self.run("personalized_recommendations", personalized_prompt(&input))
            .await
    }
}

#[async_trait]
impl HabitToolGenerator for LlmFlows {
    async fn recommend_habit_tools(&self, input: HabitToolInput) -> Result<Recommendations> {
        self.run("recommend_habit_tools", habit_tool_prompt(&input))
            .await
    }
}

#[async_trait]
impl GuidanceGenerator for LlmFlows {
    async fn answer(&self, input: GuidanceInput) -> Result<Guidance> {
        self.run("answer_questions", guidance_prompt(&input)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_prompt_includes_data() {
        let prompt = score_prompt(&ScoreInput {
            mood: 7,
            sleep: 7.5,
            diet: "Healthy meals".to_string(),
            exercise: "30 min walk".to_string(),
            stressors: "Work deadlines".to_string(),
        });
        assert!(prompt.contains("Mood: 7\n"));
        assert!(prompt.contains("Sleep: 7.5 hours"));
        assert!(prompt.contains("Stressors: Work deadlines"));
        assert!(prompt.contains("\"calmIndex\": number"));
    }

    #[test]
    fn test_guidance_prompt_uses_labels() {
        let prompt = guidance_prompt(&GuidanceInput {
            question: "How do I focus?".to_string(),
            calm_index: 60.0,
            productivity_index: 55.0,
            mood: "6/10".to_string(),
            sleep: "7 hours".to_string(),
            diet: "Toast".to_string(),
            exercise: "None".to_string(),
            stressors: "Exams".to_string(),
        });
        assert!(prompt.contains("- Mood: 6/10"));
        assert!(prompt.contains("- Sleep: 7 hours"));
        assert!(prompt.ends_with("{\"answer\": string}"));
        assert!(prompt.contains("How do I focus?"));
    }

    #[test]
    fn test_model_output_shapes() {
        let scores: ScorePair =
            crate::ai_provider::parse_json_content(r#"{"calmIndex": 72, "productivityIndex": 64.5}"#)
                .unwrap();
        assert_eq!(scores, ScorePair::new(72.0, 64.5));

        let recs: Recommendations =
            crate::ai_provider::parse_json_content(r#"{"recommendations": ["Walk", "Journal"]}"#)
                .unwrap();
        assert_eq!(recs.recommendations, vec!["Walk", "Journal"]);
    }
}
