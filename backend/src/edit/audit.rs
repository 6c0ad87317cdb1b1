//! Append-only change history.

use chrono::{DateTime, Local};
use serde::Serialize;

/// Timestamp layout used when rendering entries.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One committed change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    timestamp: DateTime<Local>,
    description: String,
}

/// Replace control characters (newlines, tabs) with spaces so a rendered
/// entry stays on one line.
pub fn single_line(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

impl AuditEntry {
    pub fn new(timestamp: DateTime<Local>, description: impl Into<String>) -> Self {
        Self {
            timestamp,
            description: single_line(&description.into()),
        }
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// `[2024-05-01 13:45:00] Added column: total`
    pub fn render(&self) -> String {
        format!(
            "[{}] {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.description
        )
    }
}

/// Ordered history of committed changes. Entries can only be appended.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry stamped with the current local time.
    pub fn record(&mut self, description: impl Into<String>) -> &AuditEntry {
        self.record_at(Local::now(), description)
    }

    pub fn record_at(
        &mut self,
        timestamp: DateTime<Local>,
        description: impl Into<String>,
    ) -> &AuditEntry {
        self.entries.push(AuditEntry::new(timestamp, description));
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&AuditEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One rendered line per entry.
    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(AuditEntry::render).collect()
    }

    /// Plain-text export, entries separated by newlines.
    pub fn render(&self) -> String {
        self.lines().join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_render_format() {
        let at = Local.with_ymd_and_hms(2024, 5, 1, 13, 45, 7).unwrap();
        let entry = AuditEntry::new(at, "Added column: total");
        assert_eq!(entry.render(), "[2024-05-01 13:45:07] Added column: total");
    }

    #[test]
    fn test_description_kept_on_one_line() {
        let mut log = AuditLog::new();
        log.record("Added column: c = a +\n 1");
        log.record("tab\there\r\n");

        assert_eq!(log.entries()[0].description(), "Added column: c = a +  1");
        assert_eq!(log.render().lines().count(), log.len());
    }

    #[test]
    fn test_log_is_ordered() {
        let mut log = AuditLog::new();
        let at = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        log.record_at(at, "first");
        log.record_at(at, "second");

        assert_eq!(log.len(), 2);
        assert_eq!(log.last().unwrap().description(), "second");
        assert_eq!(
            log.render(),
            "[2024-01-02 03:04:05] first\n[2024-01-02 03:04:05] second"
        );
    }

    #[test]
    fn test_record_returns_new_entry() {
        let mut log = AuditLog::new();
        let entry = log.record("Dropped columns: a").clone();
        assert_eq!(entry.description(), "Dropped columns: a");
        assert!(!log.is_empty());
    }
}
