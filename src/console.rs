use std::collections::VecDeque;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

/// Bounded in-memory log channel. Soft-failure warnings land here so tests
/// can assert on them instead of scraping stderr.
#[derive(Debug)]
pub(crate) struct Console {
    logs: VecDeque<LogEntry>,
    log_limit: usize,
    to_stderr: bool,
}

impl Default for Console {
    fn default() -> Self {
        Self {
            logs: VecDeque::new(),
            log_limit: 10_000,
            to_stderr: false,
        }
    }
}

impl Console {
    pub(crate) fn info(&mut self, message: String) {
        self.push(LogLevel::Info, message);
    }

    pub(crate) fn warn(&mut self, message: String) {
        self.push(LogLevel::Warn, message);
    }

    fn push(&mut self, level: LogLevel, message: String) {
        if self.to_stderr {
            let tag = match level {
                LogLevel::Info => "info",
                LogLevel::Warn => "warn",
            };
            eprintln!("[{tag}] {message}");
        }
        while self.logs.len() >= self.log_limit {
            self.logs.pop_front();
        }
        self.logs.push_back(LogEntry { level, message });
    }

    pub(crate) fn take_logs(&mut self) -> Vec<LogEntry> {
        self.logs.drain(..).collect()
    }

    pub(crate) fn set_limit(&mut self, limit: usize) -> Result<()> {
        if limit == 0 {
            return Err(Error::InvalidArgument("log limit must be positive".into()));
        }
        self.log_limit = limit;
        while self.logs.len() > self.log_limit {
            self.logs.pop_front();
        }
        Ok(())
    }

    pub(crate) fn set_to_stderr(&mut self, enabled: bool) {
        self.to_stderr = enabled;
    }
}
