//! Error kinds for taskrun operations

use std::fmt;

/// The kind of error that occurred.
///
/// This enum categorizes errors to help users write clear error handling logic.
/// Users can match on ErrorKind to decide how to handle specific error cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    /// The requested feature or operation is not supported
    Unsupported,

    /// Invalid configuration or parameters
    ConfigInvalid,

    // =========================================================================
    // Parse/Validation errors
    // =========================================================================
    /// Failed to decode an action from model output
    ParseFailed,

    /// A decoded action failed required-field or bounds validation
    ValidationFailed,

    /// The action type is not known to any handler
    ActionUnknown,

    // =========================================================================
    // Policy/Approval errors
    // =========================================================================
    /// The interactive approval prompt could not be read
    PromptFailed,

    /// A policy rule pattern could not be compiled
    PatternInvalid,

    // =========================================================================
    // Provider/LLM errors
    // =========================================================================
    /// LLM completion failed
    CompletionFailed,

    /// Provider not available
    ProviderUnavailable,

    /// Rate limit exceeded
    RateLimited,

    /// Authentication with the provider failed
    AuthFailed,

    // =========================================================================
    // Execution errors
    // =========================================================================
    /// A dispatched action failed to execute
    ExecFailed,

    /// A dispatched action timed out
    ExecTimeout,

    // =========================================================================
    // IO errors
    // =========================================================================
    /// File not found
    FileNotFound,

    /// Permission denied
    PermissionDenied,

    /// IO operation failed
    IoFailed,

    /// Network error
    NetworkFailed,

    /// Serialization/deserialization failed
    SerializationFailed,

    // =========================================================================
    // Argument errors
    // =========================================================================
    /// Invalid argument passed to function
    InvalidArgument,

    /// Feature or operation not yet implemented
    NotImplemented,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            // General
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::Unsupported => "Unsupported",
            ErrorKind::ConfigInvalid => "ConfigInvalid",

            // Parse/Validation
            ErrorKind::ParseFailed => "ParseFailed",
            ErrorKind::ValidationFailed => "ValidationFailed",
            ErrorKind::ActionUnknown => "ActionUnknown",

            // Policy/Approval
            ErrorKind::PromptFailed => "PromptFailed",
            ErrorKind::PatternInvalid => "PatternInvalid",

            // Provider
            ErrorKind::CompletionFailed => "CompletionFailed",
            ErrorKind::ProviderUnavailable => "ProviderUnavailable",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::AuthFailed => "AuthFailed",

            // Execution
            ErrorKind::ExecFailed => "ExecFailed",
            ErrorKind::ExecTimeout => "ExecTimeout",

            // IO
            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::IoFailed => "IoFailed",
            ErrorKind::NetworkFailed => "NetworkFailed",
            ErrorKind::SerializationFailed => "SerializationFailed",

            // Arguments
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::NotImplemented => "NotImplemented",
        }
    }

    /// Check if this error kind is retryable by default
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::CompletionFailed
                | ErrorKind::NetworkFailed
                | ErrorKind::RateLimited
                | ErrorKind::ExecTimeout
                | ErrorKind::ProviderUnavailable
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
