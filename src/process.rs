use crate::error::EngineError;
use std::io::{self, Write};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use tracing::{debug, info};

/// Line terminator written after every command.
#[cfg(windows)]
pub const LINE_TERMINATOR: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_TERMINATOR: &str = "\n";

/// A child process driven over plain pipes.
pub struct ChildProcess {
    program: String,
    child: Child,
    stdin: Option<ChildStdin>,
}

impl ChildProcess {
    /// Launch `command_line[0]` with the remaining entries as arguments,
    /// returning the session and its output pipes separately.
    pub fn spawn(command_line: &[String]) -> Result<(Self, ChildStdout, ChildStderr), EngineError> {
        let (program, args) = command_line.split_first().ok_or_else(|| EngineError::Spawn {
            program: String::new(),
            source: None,
        })?;

        debug!("Exec process cmd: {:?}", command_line);

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EngineError::Spawn {
                program: program.clone(),
                source: Some(e),
            })?;

        let missing_pipe = || EngineError::Spawn {
            program: program.clone(),
            source: None,
        };
        let stdin = child.stdin.take().ok_or_else(missing_pipe)?;
        let stdout = child.stdout.take().ok_or_else(missing_pipe)?;
        let stderr = child.stderr.take().ok_or_else(missing_pipe)?;

        info!("Started {} (pid {})", program, child.id());

        let session = ChildProcess {
            program: program.clone(),
            child,
            stdin: Some(stdin),
        };
        Ok((session, stdout, stderr))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Write `command` plus the line terminator and flush.
    pub fn write_command(&mut self, command: &str) -> io::Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "stdin already closed"))?;
        stdin.write_all(command.as_bytes())?;
        stdin.write_all(LINE_TERMINATOR.as_bytes())?;
        stdin.flush()
    }

    /// Liveness probe: the process has not exited yet.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Close our end of stdin. Most shells exit on their own once they see EOF.
    pub fn close_stdin(&mut self) {
        self.stdin.take();
    }

    /// Wait for the child process to exit.
    pub fn wait(&mut self) -> io::Result<ExitStatus> {
        self.close_stdin();
        self.child.wait()
    }
}
