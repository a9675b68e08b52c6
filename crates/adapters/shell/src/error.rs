//! Shell adapter error type.

use std::time::Duration;

use homectl_domain::error::HomectlError;

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("no program given")]
    MissingProgram,

    #[error("invalid output pattern")]
    Pattern(#[from] regex::Error),

    #[error("unbalanced quote in arguments {0:?}")]
    UnbalancedQuote(String),

    #[error("unable to run {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Status { program: String, status: String },

    #[error("{program} did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },
}

impl From<ShellError> for HomectlError {
    fn from(err: ShellError) -> Self {
        Self::Command(Box::new(err))
    }
}
