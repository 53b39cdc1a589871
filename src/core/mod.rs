pub mod checkin;
pub mod error;
pub mod insights;
pub mod store;
pub mod validation;

pub use checkin::{
    ChatRole, ChatTurn, CheckIn, CheckinEntry, DailyState, RecommendationSet, ScoreHistory,
    ScoreHistoryItem, ScorePair, HISTORY_LIMIT,
};
pub use error::{CoreError, Result};
pub use insights::{generate_insights, Insight};
pub use store::CheckinStore;
pub use validation::{validate_chat, validate_checkin, ChatRequest};
