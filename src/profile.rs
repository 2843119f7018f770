//! Describes one kind of prompt-driven target: how to launch it, what its
//! prompt looks like and how its errors are recognised.

use crate::response::{ErrorClassifier, RawErrors};
use crate::router::{ErrorPredicate, never_error};
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct Profile {
    name: String,
    program: String,
    args: Vec<String>,
    prompt: String,
    is_error_start: ErrorPredicate,
    classifier: Arc<dyn ErrorClassifier>,
}

impl Profile {
    /// A target launched as `program`, ready whenever it prints `prompt`.
    ///
    /// Defaults: no arguments, no stdout error marker, error lines left unclassified.
    pub fn new(name: impl Into<String>, program: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            prompt: prompt.into(),
            is_error_start: never_error(),
            classifier: Arc::new(RawErrors),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Launch a different binary (another install path, a wrapper script)
    /// with the same arguments.
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Replace the whole command line, keeping prompt and error handling.
    pub fn command_line_override<I, S>(mut self, program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.program = program.into();
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn error_start(mut self, predicate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.is_error_start = Arc::new(predicate);
        self
    }

    pub fn classifier(mut self, classifier: impl ErrorClassifier + 'static) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn command_line(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    pub(crate) fn is_error_start(&self) -> ErrorPredicate {
        Arc::clone(&self.is_error_start)
    }

    pub(crate) fn error_classifier(&self) -> &dyn ErrorClassifier {
        self.classifier.as_ref()
    }
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profile")
            .field("name", &self.name)
            .field("command_line", &self.command_line())
            .field("prompt", &self.prompt)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line() {
        let p = Profile::new("db2", "db2", "db2 => ").arg("-td@");
        assert_eq!(p.command_line(), vec!["db2", "-td@"]);
        let p = p.program("/opt/ibm/db2/bin/db2");
        assert_eq!(p.command_line(), vec!["/opt/ibm/db2/bin/db2", "-td@"]);
    }

    #[test]
    fn test_override_keeps_prompt() {
        let p = Profile::new("db2", "db2", "db2 => ").command_line_override("sh", ["fake.sh"]);
        assert_eq!(p.command_line(), vec!["sh", "fake.sh"]);
        assert_eq!(p.prompt(), "db2 => ");
    }

    #[test]
    fn test_default_predicate_never_matches() {
        let p = Profile::new("x", "x", "> ");
        assert!(!(p.is_error_start())("SQL0104N  boom"));
        let p = p.error_start(|l| l.starts_with("ERR"));
        assert!((p.is_error_start())("ERR 1"));
    }
}
