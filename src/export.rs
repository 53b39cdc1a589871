use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::{ChatTurn, CheckinEntry};

pub const EXPORT_VERSION: &str = "1.0.0";

const CSV_HEADER: &str = "Date,Mood,Sleep,Diet,Exercise,Stressors,Calm Index,Productivity Index";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            _ => Err(anyhow!("Unsupported export format: {}", s)),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Metadata {
    exported_at: DateTime<Utc>,
    version: &'static str,
    format: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonExport<'a> {
    user_id: &'a str,
    check_ins: &'a [CheckinEntry],
    chat_history: &'a [ChatTurn],
    metadata: Metadata,
}

/// Everything stored for one user, ready to be written out
pub struct DataExport {
    pub user_id: String,
    pub check_ins: Vec<CheckinEntry>,
    pub chat_history: Vec<ChatTurn>,
}

impl DataExport {
    pub fn render(&self, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Json => self.to_json(),
            ExportFormat::Csv => Ok(self.to_csv()),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        let export = JsonExport {
            user_id: &self.user_id,
            check_ins: &self.check_ins,
            chat_history: &self.chat_history,
            metadata: Metadata {
                exported_at: Utc::now(),
                version: EXPORT_VERSION,
                format: "json",
            },
        };
        Ok(serde_json::to_string_pretty(&export)?)
    }

    /// One row per check-in; the chat history is not part of the CSV
    pub fn to_csv(&self) -> String {
        let mut rows = vec![CSV_HEADER.to_string()];
        for entry in &self.check_ins {
            rows.push(
                [
                    entry.date.to_string(),
                    entry.check_in.mood.to_string(),
                    entry.check_in.sleep.to_string(),
                    quote(&entry.check_in.diet),
                    quote(&entry.check_in.exercise),
                    quote(&entry.check_in.stressors),
                    entry.scores.calm_index.to_string(),
                    entry.scores.productivity_index.to_string(),
                ]
                .join(","),
            );
        }
        rows.join("\n")
    }
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CheckIn, RecommendationSet, ScorePair};
    use chrono::NaiveDate;

    fn export() -> DataExport {
        DataExport {
            user_id: "alice".to_string(),
            check_ins: vec![CheckinEntry::new(
                "alice",
                NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
                CheckIn {
                    mood: 8,
                    sleep: 7.5,
                    diet: "Eggs, \"lots\" of tea".to_string(),
                    exercise: "Run".to_string(),
                    stressors: "None".to_string(),
                    user_goals: String::new(),
                },
                ScorePair::new(70.0, 82.5),
                RecommendationSet::default(),
            )],
            chat_history: vec![ChatTurn::user("Hi")],
        }
    }

    #[test]
    fn test_csv() {
        let csv = export().to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(
            lines[1],
            "2024-07-01,8,7.5,\"Eggs, \"\"lots\"\" of tea\",\"Run\",\"None\",70,82.5"
        );
    }

    #[test]
    fn test_json_has_metadata() {
        let json = export().render(ExportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["userId"], "alice");
        assert_eq!(value["checkIns"][0]["checkIn"]["mood"], 8);
        assert_eq!(value["chatHistory"][0]["role"], "user");
        assert_eq!(value["metadata"]["version"], EXPORT_VERSION);
        assert_eq!(value["metadata"]["format"], "json");
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }
}
