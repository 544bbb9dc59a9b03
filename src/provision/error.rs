use std::fmt;

/// Ways a run ends early that the code saw coming.
///
/// By the time one of these reaches the top level, the operator has already
/// been told what happened; all that is left is choosing the exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Abort {
    /// Operator declined the configuration summary
    Cancelled,
    /// A required answer was left empty
    MissingField(&'static str),
    /// An essential step failed and was reported at the call site
    Fatal { message: String, hint: String },
}

impl Abort {
    pub fn exit_code(&self) -> i32 {
        match self {
            Abort::Cancelled => 0,
            Abort::MissingField(_) | Abort::Fatal { .. } => 1,
        }
    }
}

impl fmt::Display for Abort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Abort::Cancelled => write!(f, "Provisioning cancelled by user"),
            Abort::MissingField(field) => write!(f, "{} is required", field),
            Abort::Fatal { message, .. } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for Abort {}

/// A command the pipeline needed to succeed exited non-zero.
///
/// Nothing at the call site handles this; it travels to the failure handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFailure {
    /// Source location of the call that ran the command
    pub location: String,
    /// The command as it was logged
    pub command: String,
    pub code: i32,
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Command failed at {} (exit code {}): {}",
            self.location, self.code, self.command
        )
    }
}

impl std::error::Error for CommandFailure {}
