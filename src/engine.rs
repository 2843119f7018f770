use crate::assembler::{DEFAULT_IDLE_BACKOFF, Mirror};
use crate::error::EngineError;
use crate::process::ChildProcess;
use crate::profile::Profile;
use crate::response::{Outcome, ResponseParser};
use crate::router::{Routed, Stream, StreamRouter};
use std::time::Duration;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, info, trace, warn};

/// Stand-in deadline for limits too large to add to the current instant.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

fn deadline_after(limit: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(limit).unwrap_or_else(|| now + FAR_FUTURE)
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Deadline for a request when the caller does not give one.
    pub request_timeout: Duration,
    /// How long to wait for the first prompt after launch.
    pub startup_timeout: Duration,
    /// Reader pause when a stream has nothing to give.
    pub idle_backoff: Duration,
    /// Quiet period after the prompt during which late stderr lines are still
    /// attributed to the request.
    pub settle: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(300),
            startup_timeout: Duration::from_secs(10),
            idle_backoff: DEFAULT_IDLE_BACKOFF,
            settle: Duration::from_millis(25),
        }
    }
}

impl EngineConfig {
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    pub fn with_idle_backoff(mut self, backoff: Duration) -> Self {
        self.idle_backoff = backoff;
        self
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }
}

/// Per-call options for [`Engine::get_response`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub timeout: Option<Duration>,
    /// Return remote failures as [`Outcome::Failed`] instead of raising them.
    pub errors_as_values: bool,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn errors_as_values(mut self, yes: bool) -> Self {
        self.errors_as_values = yes;
        self
    }
}

/// Drives one prompt-based child process: write a command, wait for the
/// prompt, parse what came back.
///
/// Requests take `&mut self`, so a session serves one request at a time.
pub struct Engine {
    profile: Profile,
    config: EngineConfig,
    child: ChildProcess,
    router: StreamRouter,
    closed: bool,
}

impl Engine {
    /// Launch the profile's command line and wait for its first prompt.
    /// Anything printed before that prompt is discarded.
    pub async fn spawn(profile: Profile, config: EngineConfig) -> Result<Self, EngineError> {
        let (mut child, stdout, stderr) = ChildProcess::spawn(&profile.command_line())?;
        if !child.is_alive() {
            return Err(EngineError::Spawn {
                program: child.program().to_string(),
                source: None,
            });
        }

        let router = StreamRouter::attach(
            profile.name(),
            stdout,
            stderr,
            profile.prompt(),
            profile.is_error_start(),
            config.idle_backoff,
        )?;

        let mut engine = Engine {
            profile,
            config,
            child,
            router,
            closed: false,
        };
        engine.await_first_prompt().await?;
        info!("{} session ready (pid {})", engine.profile.name(), engine.child.id());
        Ok(engine)
    }

    async fn await_first_prompt(&mut self) -> Result<(), EngineError> {
        let deadline = deadline_after(self.config.startup_timeout);
        loop {
            match timeout_at(deadline, self.router.next()).await {
                Err(_) => {
                    warn!(
                        "{}: no prompt within {:?} of startup",
                        self.profile.name(),
                        self.config.startup_timeout
                    );
                    return Err(EngineError::Timeout(self.config.startup_timeout));
                }
                Ok(None) | Ok(Some(Routed::Closed(Stream::Stdout))) => {
                    return Err(self.disconnected());
                }
                Ok(Some(Routed::Prompt)) => return Ok(()),
                Ok(Some(other)) => trace!("{}: startup {:?}", self.profile.name(), other),
            }
        }
    }

    /// Send `command` and block until the prompt comes back or the deadline passes.
    ///
    /// Normal output goes to `parser`. If any error output was collected the
    /// profile's classifier decides what failed; classified failures are raised
    /// as [`EngineError::Remote`] unless `options.errors_as_values` is set.
    ///
    /// After a [`EngineError::Timeout`] the child keeps running and its late
    /// output may still arrive; close the session rather than reuse it.
    pub async fn get_response<P: ResponseParser>(
        &mut self,
        command: &str,
        mut parser: P,
        options: &RequestOptions,
    ) -> Result<Outcome<P::Output>, EngineError> {
        if self.closed || self.router.stdout_closed() || !self.child.is_alive() {
            return Err(self.disconnected());
        }

        let stale = self.router.begin_request();
        if stale > 0 {
            warn!("{}: discarded {} events from an earlier request", self.profile.name(), stale);
        }
        // The discarded events may include the end of stdout.
        if self.router.stdout_closed() {
            return Err(self.disconnected());
        }

        let limit = options.timeout.unwrap_or(self.config.request_timeout);
        let deadline = deadline_after(limit);

        debug!("<<<{}", command);
        self.child.write_command(command)?;

        let mut errors = Vec::new();
        let mut parse_failure: Option<anyhow::Error> = None;
        loop {
            let routed = match timeout_at(deadline, self.router.next()).await {
                Err(_) => {
                    warn!("{}: timeout after {:?} on {:?}", self.profile.name(), limit, command);
                    return Err(EngineError::Timeout(limit));
                }
                Ok(None) => return Err(self.disconnected()),
                Ok(Some(routed)) => routed,
            };
            match routed {
                Routed::Output(line) => {
                    debug!(">>{}", line);
                    if parse_failure.is_none() {
                        if let Err(e) = parser.on_line(&line) {
                            warn!("{}: response parser failed: {:#}", self.profile.name(), e);
                            parse_failure = Some(e);
                        }
                    }
                }
                Routed::Error(line) => {
                    debug!("!!{}", line);
                    errors.push(line);
                }
                Routed::Prompt => break,
                Routed::Closed(Stream::Stdout) => return Err(self.disconnected()),
                Routed::Closed(Stream::Stderr) => debug!("{}: stderr closed", self.profile.name()),
            }
        }

        self.collect_late_errors(&mut errors).await;

        if !errors.is_empty() {
            let remote = self.profile.error_classifier().classify(errors);
            if remote.is_unclassified() {
                return Err(EngineError::Unclassified {
                    lines: remote.lines,
                });
            }
            return if options.errors_as_values {
                Ok(Outcome::Failed(remote))
            } else {
                Err(EngineError::Remote(remote))
            };
        }

        if let Some(e) = parse_failure {
            return Err(EngineError::Parser(format!("{e:#}")));
        }
        parser
            .finish()
            .map(Outcome::Success)
            .map_err(|e| EngineError::Parser(format!("{e:#}")))
    }

    /// stderr is read on its own thread, so its lines can land after the prompt
    /// even when the child wrote them first.
    async fn collect_late_errors(&mut self, errors: &mut Vec<String>) {
        while let Ok(Some(routed)) = timeout(self.config.settle, self.router.next()).await {
            match routed {
                Routed::Error(line) => {
                    debug!("!!{}", line);
                    errors.push(line);
                }
                other => trace!("{}: ignoring {:?} after the prompt", self.profile.name(), other),
            }
        }
    }

    fn disconnected(&self) -> EngineError {
        EngineError::ProcessUnavailable(self.profile.name().to_string())
    }

    /// Liveness probe for the child process.
    pub fn is_alive(&mut self) -> bool {
        !self.closed && self.child.is_alive()
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Copy everything the child writes on `stream` to `mirror`, replacing any
    /// previous mirror for that stream.
    pub fn set_mirror(&self, stream: Stream, mirror: Option<Mirror>) -> Result<(), EngineError> {
        Ok(self.router.set_mirror(stream, mirror)?)
    }

    /// Stop both readers, release the mirrors and close the child's stdin.
    /// The child process itself is not killed.
    pub fn close(&mut self) -> Result<(), EngineError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.child.close_stdin();
        info!("{} session closed", self.profile.name());
        Ok(self.router.close()?)
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("{}: close failed: {}", self.profile.name(), e);
        }
    }
}
