use serde_json::Value;
use std::collections::HashMap;

use super::checkin::{CheckIn, ScorePair};
use super::error::{CoreError, Result};

pub const MAX_TEXT_LEN: usize = 500;
pub const MAX_GOALS_LEN: usize = 1000;
pub const MAX_QUESTION_LEN: usize = 1000;

/// A chat request whose snapshots matched the CheckIn/ScorePair shape
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub question: String,
    pub check_in: CheckIn,
    pub scores: ScorePair,
}

/// Collects field-level messages in the order fields are checked
#[derive(Default)]
struct Errors(Vec<String>);

impl Errors {
    fn add(&mut self, path: &str, message: &str) {
        self.0.push(format!("{}: {}", path, message));
    }

    fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T> {
        if self.0.is_empty() {
            Ok(value())
        } else {
            Err(CoreError::Validation(self.0))
        }
    }
}

/// Validate raw check-in form fields into a `CheckIn`
pub fn validate_checkin(fields: &HashMap<String, String>) -> Result<CheckIn> {
    let mut errors = Errors::default();

    let mood = check_mood(fields.get("mood").map(String::as_str), "mood", true, &mut errors);
    let sleep = check_sleep(fields.get("sleep").map(String::as_str), "sleep", true, &mut errors);
    let diet = check_text(fields.get("diet"), "diet", &mut errors);
    let exercise = check_text(fields.get("exercise"), "exercise", &mut errors);
    let stressors = check_text(fields.get("stressors"), "stressors", &mut errors);

    let user_goals = fields
        .get("userGoals")
        .map(|g| g.trim().to_string())
        .unwrap_or_default();
    if user_goals.chars().count() > MAX_GOALS_LEN {
        errors.add("userGoals", "Goals are too long");
    }

    errors.finish(|| CheckIn {
        mood: mood.unwrap_or_default(),
        sleep: sleep.unwrap_or_default(),
        diet,
        exercise,
        stressors,
        user_goals,
    })
}

/// Validate a chat question together with the caller-held snapshots
pub fn validate_chat(question: &str, check_in: &Value, scores: &Value) -> Result<ChatRequest> {
    let mut errors = Errors::default();

    let question = question.trim().to_string();
    if question.is_empty() {
        errors.add("question", "Message is required");
    } else if question.chars().count() > MAX_QUESTION_LEN {
        errors.add("question", "Message is too long");
    }

    let mut snapshot = CheckIn {
        user_goals: String::new(),
        ..CheckIn::default()
    };
    match check_in.as_object() {
        Some(obj) => {
            // snapshots are checked for range only
            let mood = numeric_field(obj.get("mood"), "checkInData.mood", &mut errors)
                .and_then(|raw| {
                    check_mood(Some(raw.as_str()), "checkInData.mood", false, &mut errors)
                });
            let sleep = numeric_field(obj.get("sleep"), "checkInData.sleep", &mut errors)
                .and_then(|raw| {
                    check_sleep(Some(raw.as_str()), "checkInData.sleep", false, &mut errors)
                });
            snapshot.mood = mood.unwrap_or_default();
            snapshot.sleep = sleep.unwrap_or_default();
            snapshot.diet = string_field(obj.get("diet"), "checkInData.diet", &mut errors);
            snapshot.exercise =
                string_field(obj.get("exercise"), "checkInData.exercise", &mut errors);
            snapshot.stressors =
                string_field(obj.get("stressors"), "checkInData.stressors", &mut errors);
        }
        None => errors.add("checkInData", "Expected object"),
    }

    let mut score_pair = ScorePair::default();
    match scores.as_object() {
        Some(obj) => {
            score_pair.calm_index =
                number_field(obj.get("calmIndex"), "scores.calmIndex", &mut errors);
            score_pair.productivity_index = number_field(
                obj.get("productivityIndex"),
                "scores.productivityIndex",
                &mut errors,
            );
        }
        None => errors.add("scores", "Expected object"),
    }

    errors.finish(|| ChatRequest {
        question,
        check_in: snapshot,
        scores: score_pair,
    })
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Range check; `steps` also requires a whole number, otherwise the value is rounded
fn check_mood(raw: Option<&str>, path: &str, steps: bool, errors: &mut Errors) -> Option<u8> {
    let Some(value) = raw.and_then(parse_number) else {
        errors.add(path, "Mood must be a number");
        return None;
    };
    if value < 1.0 {
        errors.add(path, "Mood must be at least 1");
        None
    } else if value > 10.0 {
        errors.add(path, "Mood must be at most 10");
        None
    } else if steps && value.fract() != 0.0 {
        errors.add(path, "Mood must be a whole number");
        None
    } else {
        Some(value.round() as u8)
    }
}

fn check_sleep(raw: Option<&str>, path: &str, steps: bool, errors: &mut Errors) -> Option<f64> {
    let Some(value) = raw.and_then(parse_number) else {
        errors.add(path, "Sleep must be a number");
        return None;
    };
    if value < 0.0 {
        errors.add(path, "Sleep cannot be negative");
        None
    } else if value > 24.0 {
        errors.add(path, "Sleep cannot exceed 24 hours");
        None
    } else if steps && (value * 2.0).fract() != 0.0 {
        errors.add(path, "Sleep must be in 30-minute increments");
        None
    } else {
        Some(value)
    }
}

fn check_text(raw: Option<&String>, path: &str, errors: &mut Errors) -> String {
    let value = raw.map(|s| s.trim()).unwrap_or_default();
    if value.is_empty() {
        errors.add(path, "This field is required");
    } else if value.chars().count() > MAX_TEXT_LEN {
        errors.add(path, "Text is too long");
    }
    value.to_string()
}

/// Numbers or numeric strings, rendered back to text for the range checks
fn numeric_field(value: Option<&Value>, path: &str, errors: &mut Errors) -> Option<String> {
    match value {
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.add(path, "Expected number");
            None
        }
        None => {
            errors.add(path, "Required");
            None
        }
    }
}

fn number_field(value: Option<&Value>, path: &str, errors: &mut Errors) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or_default(),
        Some(_) => {
            errors.add(path, "Expected number");
            0.0
        }
        None => {
            errors.add(path, "Required");
            0.0
        }
    }
}

fn string_field(value: Option<&Value>, path: &str, errors: &mut Errors) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(_) => {
            errors.add(path, "Expected string");
            String::new()
        }
        None => {
            errors.add(path, "Required");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn valid_form() -> HashMap<String, String> {
        form(&[
            ("mood", "7"),
            ("sleep", "8"),
            ("diet", "Healthy meals"),
            ("exercise", "30 min walk"),
            ("stressors", "Work deadlines"),
            ("userGoals", "Reduce stress"),
        ])
    }

    #[test]
    fn test_valid_checkin() {
        let check_in = validate_checkin(&valid_form()).unwrap();
        assert_eq!(check_in.mood, 7);
        assert_eq!(check_in.sleep, 8.0);
        assert_eq!(check_in.diet, "Healthy meals");
        assert_eq!(check_in.user_goals, "Reduce stress");
    }

    #[test]
    fn test_text_is_trimmed() {
        let mut fields = valid_form();
        fields.insert("diet".to_string(), "  salad  ".to_string());
        let check_in = validate_checkin(&fields).unwrap();
        assert_eq!(check_in.diet, "salad");
    }

    #[test]
    fn test_goals_optional() {
        let mut fields = valid_form();
        fields.remove("userGoals");
        let check_in = validate_checkin(&fields).unwrap();
        assert_eq!(check_in.user_goals, "");
    }

    #[test]
    fn test_mood_bounds() {
        for bad in ["0", "11", "-3", "abc", "", "7.5", "NaN"] {
            let mut fields = valid_form();
            fields.insert("mood".to_string(), bad.to_string());
            let err = validate_checkin(&fields).unwrap_err();
            assert_eq!(err.field_errors().len(), 1, "mood {:?}", bad);
            assert!(err.field_errors()[0].starts_with("mood:"));
        }
    }

    #[test]
    fn test_sleep_bounds_and_steps() {
        for good in ["0", "24", "7.5", " 6 "] {
            let mut fields = valid_form();
            fields.insert("sleep".to_string(), good.to_string());
            assert!(validate_checkin(&fields).is_ok(), "sleep {:?}", good);
        }
        for bad in ["-1", "24.5", "7.25", "inf"] {
            let mut fields = valid_form();
            fields.insert("sleep".to_string(), bad.to_string());
            assert!(validate_checkin(&fields).is_err(), "sleep {:?}", bad);
        }
    }

    #[test]
    fn test_blank_text_fields() {
        let mut fields = valid_form();
        fields.insert("exercise".to_string(), "   ".to_string());
        fields.remove("stressors");
        let err = validate_checkin(&fields).unwrap_err();
        assert_eq!(
            err.field_errors(),
            &[
                "exercise: This field is required".to_string(),
                "stressors: This field is required".to_string(),
            ]
        );
    }

    #[test]
    fn test_text_too_long() {
        let mut fields = valid_form();
        fields.insert("diet".to_string(), "x".repeat(MAX_TEXT_LEN + 1));
        let err = validate_checkin(&fields).unwrap_err();
        assert_eq!(err.field_errors(), &["diet: Text is too long".to_string()]);
    }

    #[test]
    fn test_valid_chat() {
        let request = validate_chat(
            "  How can I sleep better?  ",
            &json!({"mood": 7, "sleep": 8, "diet": "Salad", "exercise": "Run", "stressors": "Exams"}),
            &json!({"calmIndex": 60, "productivityIndex": 70}),
        )
        .unwrap();

        assert_eq!(request.question, "How can I sleep better?");
        assert_eq!(request.check_in.mood, 7);
        assert_eq!(request.scores, ScorePair::new(60.0, 70.0));
    }

    #[test]
    fn test_chat_allows_empty_text_and_string_mood() {
        let request = validate_chat(
            "Hi",
            &json!({"mood": "5", "sleep": "6.5", "diet": "", "exercise": "", "stressors": ""}),
            &json!({"calmIndex": 0, "productivityIndex": 0}),
        )
        .unwrap();
        assert_eq!(request.check_in.mood, 5);
        assert_eq!(request.check_in.sleep, 6.5);
        assert!(request.check_in.diet.is_empty());
    }

    #[test]
    fn test_chat_snapshot_checks_range_only() {
        let request = validate_chat(
            "Tips?",
            &json!({"mood": 6.5, "sleep": 7.3, "diet": "", "exercise": "", "stressors": ""}),
            &json!({"calmIndex": 60, "productivityIndex": 65}),
        )
        .unwrap();
        assert_eq!(request.check_in.mood, 7);
        assert_eq!(request.check_in.sleep, 7.3);

        let err = validate_chat(
            "Tips?",
            &json!({"mood": 11, "sleep": 25, "diet": "", "exercise": "", "stressors": ""}),
            &json!({"calmIndex": 60, "productivityIndex": 65}),
        )
        .unwrap_err();
        assert_eq!(
            err.field_errors(),
            &[
                "checkInData.mood: Mood must be at most 10".to_string(),
                "checkInData.sleep: Sleep cannot exceed 24 hours".to_string(),
            ]
        );
    }

    #[test]
    fn test_chat_field_messages() {
        let err = validate_chat(
            "",
            &json!({"mood": 7, "sleep": 8, "diet": 3, "exercise": ""}),
            &json!({"calmIndex": "high", "productivityIndex": 70}),
        )
        .unwrap_err();

        assert_eq!(
            err.field_errors(),
            &[
                "question: Message is required".to_string(),
                "checkInData.diet: Expected string".to_string(),
                "checkInData.stressors: Required".to_string(),
                "scores.calmIndex: Expected number".to_string(),
            ]
        );
    }

    #[test]
    fn test_chat_snapshot_not_object() {
        let err = validate_chat("Hi", &json!(null), &json!([1, 2])).unwrap_err();
        assert_eq!(
            err.field_errors(),
            &[
                "checkInData: Expected object".to_string(),
                "scores: Expected object".to_string(),
            ]
        );
    }
}
