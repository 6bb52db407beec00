//! Script failure taxonomy.

use thiserror::Error;

/// Why a script run did not complete.
///
/// The `Display` text is what ends up in
/// [`ScriptExecutionResult::error_message`](scriptbox_domain::ScriptExecutionResult::error_message).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScriptError {
    /// A syntax or runtime error raised by the interpreter, including
    /// assertion failures thrown outside a `test()` block.
    #[error("JavaScript Error: {message}")]
    Script {
        /// Interpreter message.
        message: String,
        /// Source line, `0` when unknown.
        line: u32,
    },

    /// The run exceeded its wall-clock or execution budget.
    #[error("{0}")]
    Timeout(String),

    /// The host failed around the interpreter.
    #[error("Error: {0}")]
    Host(String),
}

impl ScriptError {
    /// Source line of the failure, `0` when unknown.
    #[must_use]
    pub const fn line(&self) -> u32 {
        match self {
            Self::Script { line, .. } => *line,
            Self::Timeout(_) | Self::Host(_) => 0,
        }
    }

    /// Whether this is a timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
