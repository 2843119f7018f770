//! Error kinds raised by the request/response engine.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A failure reported by the child process itself, recovered from the lines it
/// wrote to its error channel.
///
/// `code` and `state` are whatever the [`ErrorClassifier`](crate::ErrorClassifier)
/// could extract; `lines` always holds the raw diagnostic text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteError {
    pub code: Option<i32>,
    pub state: Option<String>,
    pub lines: Vec<String>,
}

impl RemoteError {
    /// True when neither a code nor a state could be extracted.
    pub fn is_unclassified(&self) -> bool {
        self.code.is_none() && self.state.is_none()
    }

    /// First non-empty diagnostic line, used as a one-line summary.
    pub fn summary(&self) -> &str {
        self.lines
            .iter()
            .map(|l| l.trim())
            .find(|l| !l.is_empty())
            .unwrap_or("")
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, &self.state) {
            (Some(code), Some(state)) => write!(f, "code {code}, state {state}")?,
            (Some(code), None) => write!(f, "code {code}")?,
            (None, Some(state)) => write!(f, "state {state}")?,
            (None, None) => write!(f, "unclassified")?,
        }
        let summary = self.summary();
        if !summary.is_empty() {
            write!(f, ": {summary}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RemoteError {}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Unable to start {program}")]
    Spawn {
        program: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("{0} process is disconnected")]
    ProcessUnavailable(String),

    #[error("Timeout after {0:?} waiting for the prompt")]
    Timeout(Duration),

    #[error("Remote error ({0})")]
    Remote(RemoteError),

    #[error("Unclassified error output: {}", .lines.join(" | "))]
    Unclassified { lines: Vec<String> },

    #[error("No database alias is catalogued")]
    NoDatabaseAlias,

    #[error("Response parser failed: {0}")]
    Parser(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// The remote error carried by this error, if any.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            EngineError::Remote(err) => Some(err),
            _ => None,
        }
    }
}
