use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::checkin::CheckinEntry;

/// Longest streak counted back from today
const MAX_STREAK_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub direction: TrendDirection,
    pub change: f64,
    pub significance: Level,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Trend,
    Pattern,
    Recommendation,
    Achievement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
    pub actionable: bool,
    pub priority: Level,
}

/// Compare the mean of the later half of a series with the earlier half
pub fn calculate_trend(values: &[f64]) -> Trend {
    if values.len() < 3 {
        return Trend {
            direction: TrendDirection::Stable,
            change: 0.0,
            significance: Level::Low,
        };
    }

    let (first, second) = values.split_at(values.len() / 2);
    let first_avg = mean(first);
    let change = mean(second) - first_avg;

    let relative = if first_avg == 0.0 {
        0.0
    } else {
        change.abs() / first_avg
    };
    let significance = if relative > 0.2 {
        Level::High
    } else if relative > 0.1 {
        Level::Medium
    } else {
        Level::Low
    };

    let direction = if change > 0.5 {
        TrendDirection::Improving
    } else if change < -0.5 {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    };

    Trend {
        direction,
        change,
        significance,
    }
}

/// Pearson correlation, 0 when undefined
pub fn correlation(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.is_empty() {
        return 0.0;
    }

    let n = x.len() as f64;
    let sum_x: f64 = x.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xy: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
    let sum_x2: f64 = x.iter().map(|a| a * a).sum();
    let sum_y2: f64 = y.iter().map(|b| b * b).sum();

    let numerator = n * sum_xy - sum_x * sum_y;
    let denominator = ((n * sum_x2 - sum_x * sum_x) * (n * sum_y2 - sum_y * sum_y)).sqrt();

    if denominator == 0.0 || denominator.is_nan() {
        0.0
    } else {
        numerator / denominator
    }
}

/// Consecutive days with a check-in, counting back from `today`
pub fn current_streak(entries: &[CheckinEntry], today: NaiveDate) -> u32 {
    let mut streak = 0;
    for offset in 0..MAX_STREAK_DAYS {
        let day = today - Duration::days(offset);
        if entries.iter().any(|e| e.date == day) {
            streak += 1;
        } else {
            break;
        }
    }
    streak
}

/// Every insight that applies to a user's check-ins, highest priority first
pub fn generate_insights(entries: &[CheckinEntry], today: NaiveDate) -> Vec<Insight> {
    let mut insights = Vec::new();
    insights.extend(trend_insights(entries));
    insights.extend(correlation_insight(entries));
    insights.extend(low_score_insights(entries));
    insights.extend(streak_insight(entries, today));

    // stable sort keeps generation order within a priority
    insights.sort_by(|a, b| b.priority.cmp(&a.priority));
    insights
}

fn trend_insights(entries: &[CheckinEntry]) -> Vec<Insight> {
    let mut insights = Vec::new();

    let moods: Vec<f64> = entries.iter().map(|e| e.check_in.mood as f64).collect();
    let mood = calculate_trend(&moods);
    if mood.significance == Level::High {
        insights.push(Insight {
            kind: InsightKind::Trend,
            title: "Mood Trend Analysis".to_string(),
            description: format!(
                "Your mood has been {} over the past period with a {:.1} point change.",
                direction_word(mood.direction),
                mood.change.abs()
            ),
            actionable: true,
            priority: declining_priority(mood.direction),
        });
    }

    let sleep: Vec<f64> = entries.iter().map(|e| e.check_in.sleep).collect();
    let sleep = calculate_trend(&sleep);
    if sleep.significance == Level::High {
        insights.push(Insight {
            kind: InsightKind::Trend,
            title: "Sleep Pattern Analysis".to_string(),
            description: format!(
                "Your sleep duration has been {} with an average change of {:.1} hours.",
                direction_word(sleep.direction),
                sleep.change.abs()
            ),
            actionable: true,
            priority: declining_priority(sleep.direction),
        });
    }

    insights
}

fn correlation_insight(entries: &[CheckinEntry]) -> Option<Insight> {
    let moods: Vec<f64> = entries.iter().map(|e| e.check_in.mood as f64).collect();
    let calm: Vec<f64> = entries.iter().map(|e| e.scores.calm_index).collect();
    let sleep: Vec<f64> = entries.iter().map(|e| e.check_in.sleep).collect();
    let productivity: Vec<f64> = entries.iter().map(|e| e.scores.productivity_index).collect();

    let candidates = [
        (correlation(&moods, &calm), "mood and calm index"),
        (correlation(&sleep, &productivity), "sleep and productivity"),
    ];

    candidates
        .iter()
        .find(|(r, _)| r.abs() > 0.7)
        .map(|(r, pair)| Insight {
            kind: InsightKind::Pattern,
            title: "Score Correlation Insight".to_string(),
            description: format!(
                "Strong {} correlation between {}.",
                if *r > 0.0 { "positive" } else { "negative" },
                pair
            ),
            actionable: true,
            priority: Level::Medium,
        })
}

fn low_score_insights(entries: &[CheckinEntry]) -> Vec<Insight> {
    let recent = &entries[entries.len().saturating_sub(7)..];
    let low_calm = recent.iter().filter(|e| e.scores.calm_index < 50.0).count();
    let low_productivity = recent
        .iter()
        .filter(|e| e.scores.productivity_index < 50.0)
        .count();

    let mut insights = Vec::new();
    if low_calm > 3 {
        insights.push(Insight {
            kind: InsightKind::Recommendation,
            title: "Calm Index Improvement".to_string(),
            description: "Your calm index has been low recently. Consider practicing mindfulness or stress-reduction techniques.".to_string(),
            actionable: true,
            priority: Level::High,
        });
    }
    if low_productivity > 3 {
        insights.push(Insight {
            kind: InsightKind::Recommendation,
            title: "Productivity Enhancement".to_string(),
            description: "Your productivity index could use a boost. Try breaking tasks into smaller chunks or improving your sleep routine.".to_string(),
            actionable: true,
            priority: Level::High,
        });
    }
    insights
}

fn streak_insight(entries: &[CheckinEntry], today: NaiveDate) -> Option<Insight> {
    let streak = current_streak(entries, today);
    (streak >= 7).then(|| Insight {
        kind: InsightKind::Achievement,
        title: "Weekly Streak!".to_string(),
        description: format!("Amazing! You've completed {} days in a row.", streak),
        actionable: false,
        priority: Level::Low,
    })
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn direction_word(direction: TrendDirection) -> &'static str {
    match direction {
        TrendDirection::Improving => "improving",
        TrendDirection::Declining => "declining",
        TrendDirection::Stable => "stable",
    }
}

fn declining_priority(direction: TrendDirection) -> Level {
    if direction == TrendDirection::Declining {
        Level::High
    } else {
        Level::Medium
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::checkin::{CheckIn, RecommendationSet, ScorePair};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn entry(date: NaiveDate, mood: u8, sleep: f64, calm: f64, productivity: f64) -> CheckinEntry {
        CheckinEntry::new(
            "alice",
            date,
            CheckIn {
                mood,
                sleep,
                diet: "Rice".to_string(),
                exercise: "Swim".to_string(),
                stressors: "Noise".to_string(),
                user_goals: String::new(),
            },
            ScorePair::new(calm, productivity),
            RecommendationSet::default(),
        )
    }

    #[test]
    fn test_trend_needs_three_points() {
        let trend = calculate_trend(&[1.0, 9.0]);
        assert_eq!(trend.direction, TrendDirection::Stable);
        assert_eq!(trend.significance, Level::Low);
    }

    #[test]
    fn test_trend_improving() {
        let trend = calculate_trend(&[4.0, 4.0, 8.0, 8.0]);
        assert_eq!(trend.direction, TrendDirection::Improving);
        assert_eq!(trend.significance, Level::High);
        assert_eq!(trend.change, 4.0);
    }

    #[test]
    fn test_trend_declining_medium() {
        // 10 -> 8.75: 12.5% drop
        let trend = calculate_trend(&[10.0, 10.0, 9.0, 8.5]);
        assert_eq!(trend.direction, TrendDirection::Declining);
        assert_eq!(trend.significance, Level::Medium);
    }

    #[test]
    fn test_correlation() {
        let r = correlation(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]);
        assert!((r - 1.0).abs() < 1e-9);
        assert_eq!(correlation(&[1.0, 1.0], &[3.0, 5.0]), 0.0);
        assert_eq!(correlation(&[], &[]), 0.0);
    }

    #[test]
    fn test_streak() {
        let entries: Vec<_> = (3..=10).map(|d| entry(day(d), 6, 7.0, 60.0, 60.0)).collect();
        assert_eq!(current_streak(&entries, day(10)), 8);
        assert_eq!(current_streak(&entries, day(12)), 0);
    }

    #[test]
    fn test_low_scores_and_streak_insights() {
        let entries: Vec<_> = (1..=7).map(|d| entry(day(d), 5, 7.0, 30.0, 70.0)).collect();
        let insights = generate_insights(&entries, day(7));

        assert_eq!(insights[0].title, "Calm Index Improvement");
        assert_eq!(insights[0].priority, Level::High);
        assert!(insights.iter().any(|i| i.kind == InsightKind::Achievement));
        assert!(!insights.iter().any(|i| i.title == "Productivity Enhancement"));
    }

    #[test]
    fn test_declining_mood_is_high_priority() {
        let entries = vec![
            entry(day(1), 9, 8.0, 60.0, 60.0),
            entry(day(2), 9, 8.0, 60.0, 60.0),
            entry(day(3), 4, 8.0, 60.0, 60.0),
            entry(day(4), 4, 8.0, 60.0, 60.0),
        ];
        let insights = generate_insights(&entries, day(20));
        let mood = insights
            .iter()
            .find(|i| i.title == "Mood Trend Analysis")
            .unwrap();
        assert_eq!(mood.priority, Level::High);
        assert!(mood.description.contains("declining"));
    }

    #[test]
    fn test_no_insights_for_empty_history() {
        assert!(generate_insights(&[], day(1)).is_empty());
    }
}
