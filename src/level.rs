//! Log level definitions for severity tagging and filtering
//!
//! The four severities mirror the console channels they print through.
//! Filtering is allow-list based (set membership), so the enum carries
//! no ordering.

use serde::{Deserialize, Serialize};

use crate::console::Channel;

/// Severity of a log call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Raw data payloads, printed through the plain log channel
    Data,
    /// Critical failures
    Error,
    /// Standard operational messages
    Info,
    /// Issues that need attention but are not critical
    Warn,
}

impl Level {
    /// Get string representation for formatted output
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Data => "DATA",
            Level::Error => "ERROR",
            Level::Info => "INFO",
            Level::Warn => "WARN",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DATA" => Some(Level::Data),
            "ERROR" => Some(Level::Error),
            "INFO" => Some(Level::Info),
            "WARN" | "WARNING" => Some(Level::Warn),
            _ => None,
        }
    }

    /// Console channel this severity prints through
    pub fn channel(&self) -> Channel {
        match self {
            Level::Data => Channel::Log,
            Level::Error => Channel::Error,
            Level::Info => Channel::Info,
            Level::Warn => Channel::Warn,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
