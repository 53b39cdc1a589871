use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::PathBuf;

use super::checkin::{
    ChatRole, ChatTurn, CheckIn, CheckinEntry, RecommendationSet, ScoreHistoryItem, ScorePair,
};
use super::error::{CoreError, Result};

const ENTRY_COLUMNS: &str = "id, user_id, date, mood, sleep, diet, exercise, stressors, user_goals,
     calm_index, productivity_index, personalized, habit_tools, created_at, updated_at";

/// SQLite-backed storage for daily check-ins and coach conversations
pub struct CheckinStore {
    conn: Connection,
}

impl CheckinStore {
    /// Open (or create) the store at the given database path
    pub fn new(db_path: PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS daily_checkins (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                date TEXT NOT NULL,
                mood INTEGER NOT NULL,
                sleep REAL NOT NULL,
                diet TEXT NOT NULL,
                exercise TEXT NOT NULL,
                stressors TEXT NOT NULL,
                user_goals TEXT NOT NULL,
                calm_index REAL NOT NULL,
                productivity_index REAL NOT NULL,
                personalized TEXT NOT NULL,
                habit_tools TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (user_id, date)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS chat_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_checkins_user_date ON daily_checkins(user_id, date)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_chat_user ON chat_messages(user_id)",
            [],
        )?;

        Ok(Self { conn })
    }

    /// Store one day's check-in. A second submission on the same day replaces
    /// the first, keeping its id and creation time.
    pub fn save_daily_checkin(&self, entry: &CheckinEntry) -> Result<()> {
        let personalized = serde_json::to_string(&entry.recommendations.personalized)?;
        let habit_tools = serde_json::to_string(&entry.recommendations.habit_tools)?;

        self.conn.execute(
            "INSERT INTO daily_checkins (
                id, user_id, date, mood, sleep, diet, exercise, stressors, user_goals,
                calm_index, productivity_index, personalized, habit_tools, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
             ON CONFLICT(user_id, date) DO UPDATE SET
                mood = excluded.mood,
                sleep = excluded.sleep,
                diet = excluded.diet,
                exercise = excluded.exercise,
                stressors = excluded.stressors,
                user_goals = excluded.user_goals,
                calm_index = excluded.calm_index,
                productivity_index = excluded.productivity_index,
                personalized = excluded.personalized,
                habit_tools = excluded.habit_tools,
                updated_at = excluded.updated_at",
            params![
                &entry.id,
                &entry.user_id,
                entry.date.to_string(),
                entry.check_in.mood,
                entry.check_in.sleep,
                &entry.check_in.diet,
                &entry.check_in.exercise,
                &entry.check_in.stressors,
                &entry.check_in.user_goals,
                entry.scores.calm_index,
                entry.scores.productivity_index,
                personalized,
                habit_tools,
                entry.created_at.to_rfc3339(),
                entry.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get the check-in a user submitted on a given day
    pub fn get_daily_checkin(&self, user_id: &str, date: NaiveDate) -> Result<CheckinEntry> {
        let sql = format!(
            "SELECT {} FROM daily_checkins WHERE user_id = ?1 AND date = ?2",
            ENTRY_COLUMNS
        );
        self.conn
            .query_row(&sql, params![user_id, date.to_string()], row_to_entry)
            .optional()?
            .ok_or_else(|| CoreError::NotFound(format!("{} on {}", user_id, date)))
    }

    /// Most recent check-in for a user, if any
    pub fn latest_checkin(&self, user_id: &str) -> Result<Option<CheckinEntry>> {
        let sql = format!(
            "SELECT {} FROM daily_checkins WHERE user_id = ?1 ORDER BY date DESC LIMIT 1",
            ENTRY_COLUMNS
        );
        let entry = self
            .conn
            .query_row(&sql, params![user_id], row_to_entry)
            .optional()?;
        Ok(entry)
    }

    /// All check-ins for a user, oldest first
    pub fn list_checkins(&self, user_id: &str) -> Result<Vec<CheckinEntry>> {
        let sql = format!(
            "SELECT {} FROM daily_checkins WHERE user_id = ?1 ORDER BY date ASC",
            ENTRY_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params![user_id], row_to_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Scores from the latest `days` check-ins, in chronological order
    pub fn score_history(&self, user_id: &str, days: usize) -> Result<Vec<ScoreHistoryItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, calm_index, productivity_index FROM daily_checkins
             WHERE user_id = ?1
             ORDER BY date DESC
             LIMIT ?2",
        )?;

        let mut history = stmt
            .query_map(params![user_id, days as i64], |row| {
                let date: String = row.get(0)?;
                Ok(ScoreHistoryItem {
                    scores: ScorePair::new(row.get(1)?, row.get(2)?),
                    date: parse_date(&date, 0)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        history.reverse();
        Ok(history)
    }

    /// Append one turn to the user's conversation
    pub fn append_chat_turn(&self, user_id: &str, turn: &ChatTurn) -> Result<()> {
        self.conn.execute(
            "INSERT INTO chat_messages (user_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                user_id,
                turn.role.as_str(),
                &turn.content,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// The user's conversation in the order it happened
    pub fn chat_history(&self, user_id: &str) -> Result<Vec<ChatTurn>> {
        let mut stmt = self.conn.prepare(
            "SELECT role, content FROM chat_messages WHERE user_id = ?1 ORDER BY id ASC",
        )?;

        let turns = stmt
            .query_map(params![user_id], |row| {
                let role: String = row.get(0)?;
                let role = ChatRole::parse(&role).ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        0,
                        rusqlite::types::Type::Text,
                        format!("unknown chat role: {}", role).into(),
                    )
                })?;
                Ok(ChatTurn {
                    role,
                    content: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(turns)
    }

    /// Remove every check-in and chat message for a user
    pub fn delete_user_data(&self, user_id: &str) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let checkins = tx.execute("DELETE FROM daily_checkins WHERE user_id = ?1", params![user_id])?;
        let messages = tx.execute("DELETE FROM chat_messages WHERE user_id = ?1", params![user_id])?;
        tx.commit()?;
        Ok(checkins + messages)
    }

    /// Count check-ins stored for a user
    pub fn count(&self, user_id: &str) -> Result<usize> {
        let count: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM daily_checkins WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<CheckinEntry> {
    let date: String = row.get(2)?;
    let personalized: String = row.get(11)?;
    let habit_tools: String = row.get(12)?;
    let created_at: String = row.get(13)?;
    let updated_at: String = row.get(14)?;

    Ok(CheckinEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        date: parse_date(&date, 2)?,
        check_in: CheckIn {
            mood: row.get(3)?,
            sleep: row.get(4)?,
            diet: row.get(5)?,
            exercise: row.get(6)?,
            stressors: row.get(7)?,
            user_goals: row.get(8)?,
        },
        scores: ScorePair::new(row.get(9)?, row.get(10)?),
        recommendations: RecommendationSet {
            personalized: parse_list(&personalized, 11)?,
            habit_tools: parse_list(&habit_tools, 12)?,
        },
        created_at: parse_timestamp(&created_at, 13)?,
        updated_at: parse_timestamp(&updated_at, 14)?,
    })
}

fn parse_date(value: &str, column: usize) -> rusqlite::Result<NaiveDate> {
    value.parse::<NaiveDate>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_timestamp(value: &str, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

fn parse_list(value: &str, column: usize) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}
