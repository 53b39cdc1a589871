use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use ulid::Ulid;

/// Number of days kept in the rolling score history
pub const HISTORY_LIMIT: usize = 7;

pub const DEFAULT_GOALS: &str = "Reduce stress and improve focus.";

pub const COACH_GREETING: &str = "Hello! I'm your AI Brain Coach. How can I help you today?";

/// A submitted daily check-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckIn {
    /// Self-reported mood, 1 to 10
    pub mood: u8,

    /// Hours slept, 0 to 24 in half-hour steps
    pub sleep: f64,

    pub diet: String,
    pub exercise: String,
    pub stressors: String,

    #[serde(default)]
    pub user_goals: String,
}

impl CheckIn {
    /// Mood as shown to the coach, e.g. "7/10"
    pub fn mood_label(&self) -> String {
        format!("{}/10", self.mood)
    }

    /// Sleep as shown to the coach, e.g. "8 hours"
    pub fn sleep_label(&self) -> String {
        format!("{} hours", self.sleep)
    }
}

impl Default for CheckIn {
    fn default() -> Self {
        Self {
            mood: 7,
            sleep: 8.0,
            diet: String::new(),
            exercise: String::new(),
            stressors: String::new(),
            user_goals: DEFAULT_GOALS.to_string(),
        }
    }
}

/// Calm and Productivity indices, each 0-100
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScorePair {
    #[serde(serialize_with = "whole_or_fraction")]
    pub calm_index: f64,
    #[serde(serialize_with = "whole_or_fraction")]
    pub productivity_index: f64,
}

/// Whole scores go out as integers (`75`, not `75.0`)
fn whole_or_fraction<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

impl ScorePair {
    pub fn new(calm_index: f64, productivity_index: f64) -> Self {
        Self {
            calm_index,
            productivity_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreHistoryItem {
    #[serde(flatten)]
    pub scores: ScorePair,
    pub date: NaiveDate,
}

/// Rolling window of the most recent scores, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreHistory {
    items: VecDeque<ScoreHistoryItem>,
}

impl ScoreHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a score, dropping the oldest entries past `HISTORY_LIMIT`
    pub fn push(&mut self, item: ScoreHistoryItem) {
        self.items.push_back(item);
        while self.items.len() > HISTORY_LIMIT {
            self.items.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn latest(&self) -> Option<&ScoreHistoryItem> {
        self.items.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoreHistoryItem> {
        self.items.iter()
    }
}

impl FromIterator<ScoreHistoryItem> for ScoreHistory {
    fn from_iter<I: IntoIterator<Item = ScoreHistoryItem>>(iter: I) -> Self {
        let mut history = ScoreHistory::new();
        for item in iter {
            history.push(item);
        }
        history
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationSet {
    pub personalized: Vec<String>,
    pub habit_tools: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(ChatRole::User),
            "assistant" => Some(ChatRole::Assistant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// One persisted day: the check-in and everything generated from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinEntry {
    /// ULID, time-sortable
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub check_in: CheckIn,
    pub scores: ScorePair,
    pub recommendations: RecommendationSet,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CheckinEntry {
    pub fn new(
        user_id: impl Into<String>,
        date: NaiveDate,
        check_in: CheckIn,
        scores: ScorePair,
        recommendations: RecommendationSet,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Ulid::new().to_string(),
            user_id: user_id.into(),
            date,
            check_in,
            scores,
            recommendations,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn history_item(&self) -> ScoreHistoryItem {
        ScoreHistoryItem {
            scores: self.scores,
            date: self.date,
        }
    }
}

/// Everything the dashboard shows for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyState {
    pub check_in: CheckIn,
    pub scores: ScorePair,
    pub score_history: ScoreHistory,
    pub recommendations: RecommendationSet,
    pub chat_history: Vec<ChatTurn>,
    pub user_goals: String,
}

impl Default for DailyState {
    fn default() -> Self {
        Self {
            check_in: CheckIn::default(),
            scores: ScorePair::default(),
            score_history: ScoreHistory::new(),
            recommendations: RecommendationSet::default(),
            chat_history: vec![ChatTurn::assistant(COACH_GREETING)],
            user_goals: DEFAULT_GOALS.to_string(),
        }
    }
}

impl DailyState {
    /// Fold a successful check-in into the state. Latest wins for everything
    /// except the history, which gains one entry.
    pub fn apply_checkin(&mut self, entry: &CheckinEntry) {
        self.check_in = entry.check_in.clone();
        self.scores = entry.scores;
        self.recommendations = entry.recommendations.clone();
        self.score_history.push(entry.history_item());
        if !entry.check_in.user_goals.is_empty() {
            self.user_goals = entry.check_in.user_goals.clone();
        }
    }

    /// True once a real check-in with scores exists
    pub fn has_checked_in(&self) -> bool {
        !self.check_in.diet.is_empty() && self.scores.calm_index != 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn sample_checkin() -> CheckIn {
        CheckIn {
            mood: 7,
            sleep: 7.5,
            diet: "Healthy meals".to_string(),
            exercise: "30 min walk".to_string(),
            stressors: "Work deadlines".to_string(),
            user_goals: "Sleep better".to_string(),
        }
    }

    #[test]
    fn test_labels() {
        let check_in = sample_checkin();
        assert_eq!(check_in.mood_label(), "7/10");
        assert_eq!(check_in.sleep_label(), "7.5 hours");

        let whole = CheckIn {
            sleep: 8.0,
            ..sample_checkin()
        };
        assert_eq!(whole.sleep_label(), "8 hours");
    }

    #[test]
    fn test_history_keeps_last_seven() {
        let mut history = ScoreHistory::new();
        for d in 1..=10 {
            history.push(ScoreHistoryItem {
                scores: ScorePair::new(d as f64, 50.0),
                date: day(d),
            });
        }

        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history.iter().next().unwrap().date, day(4));
        assert_eq!(history.latest().unwrap().date, day(10));
    }

    #[test]
    fn test_default_state() {
        let state = DailyState::default();
        assert_eq!(state.check_in.mood, 7);
        assert_eq!(state.check_in.sleep, 8.0);
        assert_eq!(state.user_goals, DEFAULT_GOALS);
        assert_eq!(state.chat_history.len(), 1);
        assert_eq!(state.chat_history[0].role, ChatRole::Assistant);
        assert!(!state.has_checked_in());
    }

    #[test]
    fn test_apply_checkin() {
        let mut state = DailyState::default();
        let entry = CheckinEntry::new(
            "alice",
            day(5),
            sample_checkin(),
            ScorePair::new(75.0, 80.0),
            RecommendationSet {
                personalized: vec!["Take breaks".to_string()],
                habit_tools: vec!["Deep breathing".to_string()],
            },
        );

        state.apply_checkin(&entry);

        assert_eq!(state.scores, ScorePair::new(75.0, 80.0));
        assert_eq!(state.score_history.len(), 1);
        assert_eq!(state.user_goals, "Sleep better");
        assert_eq!(state.recommendations.habit_tools, vec!["Deep breathing"]);
        assert!(state.has_checked_in());
    }

    #[test]
    fn test_serialized_shape() {
        let item = ScoreHistoryItem {
            scores: ScorePair::new(75.0, 80.0),
            date: day(1),
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"calmIndex": 75, "productivityIndex": 80, "date": "2024-03-01"})
        );

        let turn = serde_json::to_value(ChatTurn::user("hi")).unwrap();
        assert_eq!(turn["role"], "user");
    }

    #[test]
    fn test_fractional_scores_keep_decimals() {
        let text = serde_json::to_string(&ScorePair::new(72.5, 0.0)).unwrap();
        assert_eq!(text, r#"{"calmIndex":72.5,"productivityIndex":0}"#);

        let back: ScorePair = serde_json::from_str(&text).unwrap();
        assert_eq!(back, ScorePair::new(72.5, 0.0));
    }
}
