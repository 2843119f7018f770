//! The [`ScriptCommand`] trait and the [`Context`] commands receive when executed.

use crate::db2::Db2Cli;
use crate::engine::RequestOptions;
use crate::error::{EngineError, RemoteError};
use anyhow::Result;
use async_trait::async_trait;
use std::io::Write;
use tracing::warn;

/// Execution context passed to [`ScriptCommand::execute`].
///
/// Holds the DB2 session, the sink results are printed to, and the
/// keep-going policy for failed statements.
pub struct Context {
    pub(crate) db2: Db2Cli,
    pub(crate) out: Box<dyn Write>,
    pub(crate) keep_going: bool,
    pub(crate) failures: usize,
}

impl Context {
    pub fn new(db2: Db2Cli, out: impl Write + 'static) -> Self {
        Context {
            db2,
            out: Box::new(out),
            keep_going: false,
            failures: 0,
        }
    }

    /// Report SQL failures and continue instead of stopping the script.
    pub fn keep_going(mut self, yes: bool) -> Self {
        self.keep_going = yes;
        self
    }

    pub fn db2(&mut self) -> &mut Db2Cli {
        &mut self.db2
    }

    /// Write raw bytes to the output sink.
    pub fn emit(&mut self, data: &[u8]) -> Result<()> {
        self.out.write_all(data)?;
        self.out.flush()?;
        Ok(())
    }

    pub fn emit_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "{line}")?;
        Ok(())
    }

    /// Request options for one statement under the current policy.
    pub fn statement_options(&self) -> RequestOptions {
        RequestOptions::new().errors_as_values(self.keep_going)
    }

    /// Print a failed statement and count it.
    pub fn report_failure(&mut self, err: &RemoteError) -> Result<()> {
        warn!("Statement failed: {}", err);
        self.failures += 1;
        self.emit_line(&format!("FAILED: {err}"))
    }

    /// Under keep-going, turn a remote failure into `Ok(None)` after reporting
    /// it. Every other error is passed on.
    pub fn tolerate<T>(&mut self, result: Result<T, EngineError>) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(EngineError::Remote(err)) if self.keep_going => {
                self.report_failure(&err)?;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Number of statements that failed so far.
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Execute commands in order, stopping at the first error.
    pub async fn run(&mut self, commands: &[Box<dyn ScriptCommand>]) -> Result<()> {
        for command in commands {
            command.execute(self).await?;
        }
        self.out.flush()?;
        Ok(())
    }

    pub fn into_db2(self) -> Db2Cli {
        self.db2
    }
}

/// A single script command.
///
/// To add one:
///
/// 1. Define `pub const NAME: &'static str` on your struct, the script keyword
///    used by the parser.
/// 2. Re-export the struct from `src/commands/mod.rs`.
/// 3. Add `(MyCmd::NAME, MyCmd::parse_boxed)` to the `REGISTRY` in [`crate::script`].
#[async_trait(?Send)]
pub trait ScriptCommand: 'static {
    /// Implementations return their `NAME` constant.
    fn name(&self) -> &'static str;

    /// Parse this command from the argument string (everything after the
    /// command keyword on the script line).
    fn parse(args: &str) -> Result<Self>
    where
        Self: Sized;

    /// Parse and box this command; the function-pointer type stored in the registry.
    fn parse_boxed(args: &str) -> Result<Box<dyn ScriptCommand>>
    where
        Self: Sized,
    {
        Ok(Box::new(Self::parse(args)?))
    }

    async fn execute(&self, ctx: &mut Context) -> Result<()>;
}
