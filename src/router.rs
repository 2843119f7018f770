//! Binds a stdout and a stderr [`LineAssembler`] to one child process and
//! classifies what they produce for the request currently in flight.
//!
//! Both reader threads push [`StreamEvent`]s onto one queue. The engine drains
//! it through [`StreamRouter::next`], which applies the per-request routing
//! state machine: stdout lines are normal output until the error-start
//! predicate matches, after which the rest of the request's stdout goes to the
//! error side. stderr is always error output.

use crate::assembler::{AssemblerHandle, LineAssembler, LineHandler, Mirror};
use anyhow::anyhow;
use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

/// Decides whether a stdout line opens an error block.
pub type ErrorPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// The predicate that never matches; every stdout line is normal output.
pub fn never_error() -> ErrorPredicate {
    Arc::new(|_| false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Stdout => f.write_str("stdout"),
            Stream::Stderr => f.write_str("stderr"),
        }
    }
}

/// What the reader threads report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Line(Stream, String),
    /// The exact prompt appeared on stdout.
    Prompt,
    Closed(Stream),
}

/// A [`StreamEvent`] after routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    Output(String),
    Error(String),
    Prompt,
    Closed(Stream),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteState {
    Normal,
    Error,
}

/// Forwards one stream's lines to the router queue. On stdout it also
/// recognises the prompt in the unterminated line.
struct Forwarder {
    stream: Stream,
    prompt: Option<Vec<u8>>,
    events: UnboundedSender<StreamEvent>,
}

impl LineHandler for Forwarder {
    fn on_line(&mut self, line: String) -> anyhow::Result<()> {
        self.events
            .send(StreamEvent::Line(self.stream, line))
            .map_err(|_| anyhow!("{} event queue closed", self.stream))
    }

    fn on_partial(&mut self, partial: &[u8]) -> bool {
        if self.prompt.as_deref() != Some(partial) {
            return false;
        }
        // A dropped receiver means the session is gone; the boundary still applies.
        let _ = self.events.send(StreamEvent::Prompt);
        true
    }

    fn on_eof(&mut self) {
        let _ = self.events.send(StreamEvent::Closed(self.stream));
    }
}

pub struct StreamRouter {
    events: UnboundedReceiver<StreamEvent>,
    stdout: AssemblerHandle,
    stderr: AssemblerHandle,
    is_error_start: ErrorPredicate,
    state: RouteState,
    stdout_closed: bool,
}

impl StreamRouter {
    /// Start one reader thread per stream. Threads are named `<name>.stdout`
    /// and `<name>.stderr`.
    pub fn attach<O, E>(
        name: &str,
        stdout: O,
        stderr: E,
        prompt: &str,
        is_error_start: ErrorPredicate,
        idle_backoff: Duration,
    ) -> io::Result<Self>
    where
        O: Read + Send + 'static,
        E: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();

        let stdout = LineAssembler::new(
            &format!("{name}.stdout"),
            stdout,
            Forwarder {
                stream: Stream::Stdout,
                prompt: Some(prompt.as_bytes().to_vec()),
                events: tx.clone(),
            },
        )
        .idle_backoff(idle_backoff)
        .spawn()?;

        let stderr = LineAssembler::new(
            &format!("{name}.stderr"),
            stderr,
            Forwarder {
                stream: Stream::Stderr,
                prompt: None,
                events: tx,
            },
        )
        .idle_backoff(idle_backoff)
        .spawn()?;

        Ok(Self {
            events: rx,
            stdout,
            stderr,
            is_error_start,
            state: RouteState::Normal,
            stdout_closed: false,
        })
    }

    /// Prepare for a new request: drop events left over from an earlier one
    /// (for example after a timeout) and go back to [`RouteState::Normal`].
    ///
    /// Returns how many stale events were discarded.
    pub fn begin_request(&mut self) -> usize {
        let mut stale = 0;
        while let Ok(event) = self.events.try_recv() {
            let routed = self.route(event);
            debug!("Discarding stale {:?}", routed);
            stale += 1;
        }
        self.state = RouteState::Normal;
        stale
    }

    /// Wait for the next event and route it. `None` once both readers are gone.
    pub async fn next(&mut self) -> Option<Routed> {
        let event = self.events.recv().await?;
        Some(self.route(event))
    }

    /// Route one event, advancing the state machine.
    pub fn route(&mut self, event: StreamEvent) -> Routed {
        match event {
            StreamEvent::Line(Stream::Stderr, line) => Routed::Error(line),
            StreamEvent::Line(Stream::Stdout, line) => {
                if self.state == RouteState::Normal && (self.is_error_start)(&line) {
                    self.state = RouteState::Error;
                }
                match self.state {
                    RouteState::Normal => Routed::Output(line),
                    RouteState::Error => Routed::Error(line),
                }
            }
            StreamEvent::Prompt => Routed::Prompt,
            StreamEvent::Closed(stream) => {
                if stream == Stream::Stdout {
                    self.stdout_closed = true;
                }
                Routed::Closed(stream)
            }
        }
    }

    pub fn state(&self) -> RouteState {
        self.state
    }

    /// True once the child's stdout has reached end of stream.
    pub fn stdout_closed(&self) -> bool {
        self.stdout_closed
    }

    pub fn set_mirror(&self, stream: Stream, mirror: Option<Mirror>) -> io::Result<()> {
        match stream {
            Stream::Stdout => self.stdout.set_mirror(mirror),
            Stream::Stderr => self.stderr.set_mirror(mirror),
        }
    }

    /// Stop both readers and release their mirrors.
    pub fn close(&self) -> io::Result<()> {
        let stdout = self.stdout.close();
        let stderr = self.stderr.close();
        stdout.and(stderr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sql_error(line: &str) -> bool {
        line.starts_with("SQL") && line.contains("N ")
    }

    fn router(stdout: &[u8], stderr: &[u8], predicate: ErrorPredicate) -> StreamRouter {
        StreamRouter::attach(
            "test",
            Cursor::new(stdout.to_vec()),
            Cursor::new(stderr.to_vec()),
            "db2 => ",
            predicate,
            Duration::from_millis(5),
        )
        .unwrap()
    }

    #[test]
    fn test_error_state_is_one_way_within_request() {
        let mut r = router(b"", b"", Arc::new(sql_error));
        let line = |s: &str| StreamEvent::Line(Stream::Stdout, s.to_string());

        assert_eq!(r.route(line("ok")), Routed::Output("ok".into()));
        assert_eq!(
            r.route(line("SQL0104N  An unexpected token")),
            Routed::Error("SQL0104N  An unexpected token".into())
        );
        assert_eq!(r.state(), RouteState::Error);
        assert_eq!(
            r.route(line("SQLSTATE=42601")),
            Routed::Error("SQLSTATE=42601".into())
        );

        r.begin_request();
        assert_eq!(r.state(), RouteState::Normal);
        assert_eq!(r.route(line("fine")), Routed::Output("fine".into()));
        r.close().unwrap();
    }

    #[test]
    fn test_stderr_always_error() {
        let mut r = router(b"", b"", never_error());
        assert_eq!(
            r.route(StreamEvent::Line(Stream::Stderr, "oops".into())),
            Routed::Error("oops".into())
        );
        assert_eq!(r.state(), RouteState::Normal);
        r.close().unwrap();
    }

    #[tokio::test]
    async fn test_readers_feed_queue() {
        let mut r = router(b"header\ndb2 => ", b"warning\n", never_error());
        let mut seen = Vec::new();
        while seen.len() < 5 {
            seen.push(r.next().await.unwrap());
        }
        r.close().unwrap();

        let stdout: Vec<_> = seen
            .iter()
            .filter(|e| matches!(e, Routed::Output(_) | Routed::Prompt | Routed::Closed(Stream::Stdout)))
            .cloned()
            .collect();
        assert_eq!(
            stdout,
            vec![
                Routed::Output("header".into()),
                Routed::Prompt,
                Routed::Closed(Stream::Stdout)
            ]
        );
        assert!(seen.contains(&Routed::Error("warning".into())));
        assert!(seen.contains(&Routed::Closed(Stream::Stderr)));
        assert!(r.stdout_closed());
    }
}
