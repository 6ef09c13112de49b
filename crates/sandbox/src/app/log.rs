//! Append-only editor log, most recent entry first.

use std::collections::VecDeque;

use time::OffsetDateTime;

use crate::domain::model::{LogLevel, LogMessage};

#[derive(Debug, Default, Clone)]
pub struct LogStream {
    entries: VecDeque<LogMessage>,
}

impl LogStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message and mirror it to `tracing`.
    pub fn push(&mut self, level: LogLevel, text: impl Into<String>) -> &LogMessage {
        let text = text.into();
        match level {
            LogLevel::Error => tracing::error!(target: "sandbox::log", "{text}"),
            LogLevel::Warning => tracing::warn!(target: "sandbox::log", "{text}"),
            LogLevel::Info | LogLevel::Success => {
                tracing::info!(target: "sandbox::log", kind = level.as_str(), "{text}")
            }
        }
        self.entries.push_front(LogMessage {
            timestamp: OffsetDateTime::now_utc(),
            text,
            level,
        });
        &self.entries[0]
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(LogLevel::Error, text);
    }

    pub fn warning(&mut self, text: impl Into<String>) {
        self.push(LogLevel::Warning, text);
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(LogLevel::Info, text);
    }

    pub fn success(&mut self, text: impl Into<String>) {
        self.push(LogLevel::Success, text);
    }

    pub fn latest(&self) -> Option<&LogMessage> {
        self.entries.front()
    }

    /// Entries ordered from newest to oldest.
    pub fn entries(&self) -> impl Iterator<Item = &LogMessage> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_entry_comes_first() {
        let mut log = LogStream::new();
        log.info("loaded");
        log.error("boom");

        let texts: Vec<_> = log.entries().map(|entry| entry.text.as_str()).collect();
        assert_eq!(texts, vec!["boom", "loaded"]);
        assert_eq!(log.latest().unwrap().level, LogLevel::Error);
        assert_eq!(log.len(), 2);
    }
}
