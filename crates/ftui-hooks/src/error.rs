#![forbid(unsafe_code)]

//! Error types for the hooks core.
//!
//! Only misuse is an error. A target or region that is not resolvable yet is
//! normal and makes the operation inert; it never produces a value here.

use std::fmt;

/// Configuration misuse, reported at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A delay was given as a negative number of milliseconds.
    NegativeDelay(i64),
    /// The outside-interaction detector was configured with no pointer kinds
    /// and with keyboard activation disabled.
    NoModalities,
    /// Keyboard activation is enabled but the activation key is empty.
    EmptyActivationKey,
    /// A policy file could not be parsed.
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeDelay(ms) => write!(f, "delay must be non-negative, got {ms}ms"),
            Self::NoModalities => {
                write!(
                    f,
                    "outside detection needs at least one pointer kind or keyboard activation"
                )
            }
            Self::EmptyActivationKey => write!(f, "keyboard activation key is empty"),
            Self::Parse(msg) => write!(f, "policy parse error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// One receiver that panicked while a combined receiver was delivering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstituentFailure {
    /// Position of the receiver in declaration order (absent slots included).
    pub index: usize,
    /// Panic payload, when it was a string.
    pub message: String,
}

/// Aggregated failures from a single delivery of a combined receiver.
///
/// Every constituent was still offered the value; this only reports which
/// ones failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombineError {
    pub failures: Vec<ConstituentFailure>,
}

impl fmt::Display for CombineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} receiver(s) failed:", self.failures.len())?;
        for failure in &self.failures {
            write!(f, " [#{}: {}]", failure.index, failure.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for CombineError {}
