use rhai::EvalAltResult;
use std::error::Error as StdError;
use std::io;
use thiserror::Error;

/// Error type returned by task actions and loaders.
pub type ActionError = Box<dyn StdError>;

/// Failures that abort a run. Every variant surfaces at the application
/// boundary, which prints it and exits non-zero.
#[derive(Debug, Error)]
pub enum RakeError {
    #[error("No Rakefile found (looking for: {})", .candidates.join(", "))]
    RakefileNotFound { candidates: Vec<String> },

    #[error("unrecognized option `{0}'")]
    UnrecognizedOption(String),

    #[error("invalid value for option `{option}': {message}")]
    InvalidOptionValue { option: String, message: String },

    #[error("no such file to load -- {0}")]
    RequiredFileNotFound(String),

    #[error("no loader registered for import '{file}' (extension '{extension}')")]
    UnknownImportLoader { file: String, extension: String },

    #[error("failed to load '{file}': {source}")]
    LoadFailure {
        file: String,
        #[source]
        source: ActionError,
    },

    #[error("Don't know how to build task '{0}'")]
    UnknownTask(String),

    #[error("{source}")]
    TaskActionFailure {
        task: String,
        #[source]
        source: ActionError,
    },

    #[error("failed to evaluate '{file}': {source}")]
    Script {
        file: String,
        #[source]
        source: Box<EvalAltResult>,
    },

    #[error("task name cannot be empty")]
    InvalidTaskName,

    #[error("closures can only be registered while a build script is running")]
    NoActiveScript,

    #[error("build-script runtime is not available")]
    MissingRuntime,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl RakeError {
    pub(crate) fn action_failure(task: &str, source: ActionError) -> Self {
        Self::TaskActionFailure {
            task: task.to_string(),
            source,
        }
    }

    /// Name of the task whose action raised this error, if any.
    pub fn failed_task(&self) -> Option<&str> {
        match self {
            Self::TaskActionFailure { task, .. } => Some(task),
            _ => None,
        }
    }
}

pub type Result<T, E = RakeError> = std::result::Result<T, E>;
