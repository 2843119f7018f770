//! The contracts between the engine and the code that interprets a response.

use crate::error::{EngineError, RemoteError};
use anyhow::Result;

/// Turns the normal output lines of one request into a value.
///
/// A fresh parser is handed to every request, so the shape of the result is
/// fixed by the call site rather than by engine state.
pub trait ResponseParser {
    type Output;

    /// One line of normal output, in arrival order.
    fn on_line(&mut self, line: &str) -> Result<()>;

    /// Called once the prompt has come back and no error output was seen.
    fn finish(self) -> Result<Self::Output>;
}

/// Classifies the error lines collected for a request.
pub trait ErrorClassifier: Send + Sync {
    /// Extract what is known about the failure. A result with neither code nor
    /// state is reported as [`EngineError::Unclassified`].
    fn classify(&self, lines: Vec<String>) -> RemoteError;
}

/// Result of a request made with `errors_as_values`: exactly one of a parsed
/// value or a remote failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Success(T),
    Failed(RemoteError),
}

impl<T> Outcome<T> {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn success(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Failed(_) => None,
        }
    }

    /// Raise a failure as [`EngineError::Remote`].
    pub fn into_result(self) -> Result<T, EngineError> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Failed(err) => Err(EngineError::Remote(err)),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Failed(err) => Outcome::Failed(err),
        }
    }
}

/// Keeps the response lines as they arrived.
#[derive(Debug, Default)]
pub struct RawLines(Vec<String>);

impl RawLines {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResponseParser for RawLines {
    type Output = Vec<String>;

    fn on_line(&mut self, line: &str) -> Result<()> {
        self.0.push(line.to_string());
        Ok(())
    }

    fn finish(self) -> Result<Vec<String>> {
        Ok(self.0)
    }
}

/// Wraps error lines without extracting anything from them.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawErrors;

impl ErrorClassifier for RawErrors {
    fn classify(&self, lines: Vec<String>) -> RemoteError {
        RemoteError {
            lines,
            ..Default::default()
        }
    }
}
