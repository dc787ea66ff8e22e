//! Error types for the suggestion popup.

use std::fmt;

use horizon_suggest_core::{CoreError, SchedulerError};

/// The main error type for popup operations.
#[derive(Debug, Clone, PartialEq)]
pub enum SuggestError {
    /// The anchor is not attached to a root surface.
    AnchorDetached,
    /// A core (scheduler or signal) error.
    Core(CoreError),
    /// Invalid popup configuration.
    Config(ConfigError),
}

impl fmt::Display for SuggestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AnchorDetached => write!(f, "Anchor is not attached to a root surface"),
            Self::Core(err) => write!(f, "Core error: {err}"),
            Self::Config(err) => write!(f, "Configuration error: {err}"),
        }
    }
}

impl std::error::Error for SuggestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::AnchorDetached => None,
            Self::Core(err) => Some(err),
            Self::Config(err) => Some(err),
        }
    }
}

impl From<CoreError> for SuggestError {
    fn from(err: CoreError) -> Self {
        Self::Core(err)
    }
}

impl From<SchedulerError> for SuggestError {
    fn from(err: SchedulerError) -> Self {
        Self::Core(err.into())
    }
}

impl From<ConfigError> for SuggestError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

/// Errors from loading or validating popup settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The settings document could not be parsed.
    Parse(String),
    /// A setting has a value outside its allowed range.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "Failed to parse settings: {msg}"),
            Self::Invalid(msg) => write!(f, "Invalid setting: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// A specialized Result type for popup operations.
pub type Result<T> = std::result::Result<T, SuggestError>;
