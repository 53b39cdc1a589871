use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// A captured failure, kept for diagnosis and never shown to users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub message: String,
    pub flow: String,
    pub severity: Severity,
    pub fingerprint: String,
    pub timestamp: DateTime<Utc>,
}

/// Records generator and storage failures to the log and a bounded buffer
pub struct ErrorTracker {
    enabled: bool,
    max_events: usize,
    events: Mutex<VecDeque<ErrorEvent>>,
}

impl ErrorTracker {
    pub fn new(enabled: bool, max_events: usize) -> Self {
        Self {
            enabled,
            max_events,
            events: Mutex::new(VecDeque::new()),
        }
    }

    /// Log the error with its full cause chain and keep it if tracking is on
    pub fn capture(&self, err: &anyhow::Error, flow: &str, severity: Severity) -> String {
        let message = format!("{:#}", err);
        let fingerprint = fingerprint(&message);

        error!(
            flow,
            severity = ?severity,
            fingerprint = %fingerprint,
            "{}",
            message
        );

        if self.enabled && self.max_events > 0 {
            let event = ErrorEvent {
                message,
                flow: flow.to_string(),
                severity,
                fingerprint: fingerprint.clone(),
                timestamp: Utc::now(),
            };

            let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
            events.push_back(event);
            while events.len() > self.max_events {
                events.pop_front();
            }
        }

        fingerprint
    }

    /// Most recent events, oldest first
    pub fn recent(&self) -> Vec<ErrorEvent> {
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.iter().cloned().collect()
    }
}

impl Default for ErrorTracker {
    fn default() -> Self {
        Self::new(true, 100)
    }
}

/// First 32 hex characters of the message's SHA-256
pub fn fingerprint(message: &str) -> String {
    let digest = Sha256::digest(message.as_bytes());
    digest
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<String>()
        .chars()
        .take(32)
        .collect()
}
