//! Item status definitions for tracking load progress
//!
//! This module defines the states an item moves through while it is loaded
//! and which transitions between them are legal.

use std::fmt;

/// Represents the current state of an item in the load process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemStatus {
    /// Item has been created but no request has been dispatched yet
    Pending,

    /// A request is in flight and the item awaits the transport result
    Open,

    /// The page was fetched and parsed
    Complete,

    /// The last attempt failed but more attempts remain
    Warning,

    /// Every attempt failed; the item will not be retried
    Error,
}

impl ItemStatus {
    /// Returns true if no further transitions can occur
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }

    /// Returns true if this status carries an error value
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Warning | Self::Error)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    ///
    /// ```text
    /// Pending -> Open -> Complete
    ///              |  -> Error
    ///              |  -> Warning -> Open
    /// ```
    pub fn can_transition_to(&self, next: ItemStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Open)
                | (Self::Open, Self::Complete)
                | (Self::Open, Self::Warning)
                | (Self::Open, Self::Error)
                | (Self::Warning, Self::Open)
        )
    }

    /// Converts the status to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Open => "open",
            Self::Complete => "complete",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// Returns all possible statuses
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Open,
            Self::Complete,
            Self::Warning,
            Self::Error,
        ]
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
