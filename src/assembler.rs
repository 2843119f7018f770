//! Reassembles the raw bytes of one child stream into lines.
//!
//! A [`LineAssembler`] owns the read side of a pipe and runs on its own thread
//! for the lifetime of a session. Completed lines go to
//! [`LineHandler::on_line`]; after every other byte the partial line is offered
//! to [`LineHandler::on_partial`], which lets a consumer recognise a prompt that
//! is never followed by a newline.

use std::io::{self, ErrorKind, Read, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;
use tracing::{debug, trace, warn};

const EOL: u8 = b'\n';
const CR: u8 = b'\r';

/// Default pause between reads once the source has nothing to give.
pub const DEFAULT_IDLE_BACKOFF: Duration = Duration::from_millis(200);

/// Optional copy of everything a stream produced.
pub type Mirror = Box<dyn Write + Send>;

/// Receives the lines reassembled from one stream.
///
/// Called from the reader thread. Errors and panics are logged and swallowed so
/// a misbehaving handler never stops the reader.
pub trait LineHandler: Send + 'static {
    /// A complete line, without the `\n` delimiter and without any `\r`.
    fn on_line(&mut self, line: String) -> anyhow::Result<()>;

    /// The current unterminated line. Returning `true` ends the line here: the
    /// buffer is reset as if a delimiter had arrived, but `on_line` is not called.
    fn on_partial(&mut self, _partial: &[u8]) -> bool {
        false
    }

    /// The source reported end of stream. Called at most once.
    fn on_eof(&mut self) {}
}

/// Control side of a running [`LineAssembler`], shared with the reader thread.
#[derive(Clone)]
pub struct AssemblerHandle {
    name: Arc<str>,
    closed: Arc<AtomicBool>,
    mirror: Arc<Mutex<Option<Mirror>>>,
}

impl AssemblerHandle {
    fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            closed: Arc::new(AtomicBool::new(false)),
            mirror: Arc::new(Mutex::new(None)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the output mirror. The previous mirror, if any, is flushed and dropped.
    pub fn set_mirror(&self, mirror: Option<Mirror>) -> io::Result<()> {
        let mut guard = self.lock_mirror();
        if let Some(previous) = guard.as_mut() {
            previous.flush()?;
        }
        *guard = mirror;
        Ok(())
    }

    /// Flush and release the mirror, then ask the reader loop to stop.
    ///
    /// A read that is already blocked on the source is not interrupted; the loop
    /// exits once that read returns.
    pub fn close(&self) -> io::Result<()> {
        let flushed = {
            let mut guard = self.lock_mirror();
            let flushed = match guard.as_mut() {
                Some(mirror) => mirror.flush(),
                None => Ok(()),
            };
            *guard = None;
            flushed
        };
        self.closed.store(true, Ordering::SeqCst);
        flushed
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn write_mirror(&self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        let mut guard = self.lock_mirror();
        if let Some(mirror) = guard.as_mut() {
            if let Err(e) = mirror.write_all(data) {
                warn!("{}: mirror write failed: {}", self.name, e);
            }
        }
    }

    fn lock_mirror(&self) -> MutexGuard<'_, Option<Mirror>> {
        self.mirror.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Reads one stream and turns its bytes into handler calls.
pub struct LineAssembler<R, H> {
    reader: R,
    handler: H,
    buffer: Vec<u8>,
    handle: AssemblerHandle,
    idle_backoff: Duration,
    at_eof: bool,
}

impl<R, H> LineAssembler<R, H>
where
    R: Read + Send + 'static,
    H: LineHandler,
{
    pub fn new(name: &str, reader: R, handler: H) -> Self {
        LineAssembler {
            reader,
            handler,
            buffer: Vec::new(),
            handle: AssemblerHandle::new(name),
            idle_backoff: DEFAULT_IDLE_BACKOFF,
            at_eof: false,
        }
    }

    /// Pause used when a read yields nothing, so an exhausted source is not spun on.
    pub fn idle_backoff(mut self, backoff: Duration) -> Self {
        self.idle_backoff = backoff;
        self
    }

    /// Start with an output mirror already attached.
    pub fn mirror(self, mirror: Mirror) -> Self {
        *self.handle.lock_mirror() = Some(mirror);
        self
    }

    pub fn handle(&self) -> AssemblerHandle {
        self.handle.clone()
    }

    /// Run the read loop on a dedicated, named thread until the handle is closed.
    pub fn spawn(self) -> io::Result<AssemblerHandle> {
        let handle = self.handle();
        thread::Builder::new()
            .name(handle.name().to_string())
            .spawn(move || self.run())?;
        Ok(handle)
    }

    /// The read loop. Keeps polling an exhausted source every `idle_backoff`
    /// until the handle is closed.
    pub fn run(mut self) {
        let mut chunk = [0u8; 4096];
        while !self.handle.is_closed() {
            if !self.read_once(&mut chunk) {
                thread::sleep(self.idle_backoff);
            }
        }
        debug!("Ending reader thread {}", self.handle.name());
    }

    /// Process a finite source (a recorded transcript, a test fixture) up to
    /// end of stream and give the handler back.
    pub fn drain(mut self) -> H {
        let mut chunk = [0u8; 4096];
        while !self.at_eof && !self.handle.is_closed() {
            self.read_once(&mut chunk);
        }
        self.handler
    }

    /// One read from the source. Returns false when there was nothing to consume.
    fn read_once(&mut self, chunk: &mut [u8]) -> bool {
        match self.reader.read(chunk) {
            Ok(0) => {
                self.mark_eof();
                false
            }
            Ok(n) => {
                self.consume(&chunk[..n]);
                true
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => true,
            Err(e) if e.kind() == ErrorKind::WouldBlock => false,
            Err(e) => {
                warn!("{}: read failed: {}", self.handle.name(), e);
                self.mark_eof();
                false
            }
        }
    }

    fn mark_eof(&mut self) {
        if !self.at_eof {
            self.at_eof = true;
            debug!("{}: end of stream", self.handle.name());
            self.handler.on_eof();
        }
    }

    fn consume(&mut self, chunk: &[u8]) {
        let kept: Vec<u8> = chunk.iter().copied().filter(|&b| b != CR).collect();
        // The mirror sees a chunk before any handler does.
        self.handle.write_mirror(&kept);

        for byte in kept {
            match byte {
                EOL => {
                    let line = String::from_utf8_lossy(&self.buffer).into_owned();
                    self.buffer.clear();
                    deliver_line(self.handle.name(), &mut self.handler, line);
                }
                _ => {
                    self.buffer.push(byte);
                    if offer_partial(self.handle.name(), &mut self.handler, &self.buffer) {
                        trace!(
                            "{}: >>>{}",
                            self.handle.name(),
                            String::from_utf8_lossy(&self.buffer)
                        );
                        self.buffer.clear();
                    }
                }
            }
        }
    }
}

fn deliver_line<H: LineHandler>(name: &str, handler: &mut H, line: String) {
    match panic::catch_unwind(AssertUnwindSafe(|| handler.on_line(line))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("{}: line handler failed: {:#}", name, e),
        Err(_) => warn!("{}: line handler panicked", name),
    }
}

fn offer_partial<H: LineHandler>(name: &str, handler: &mut H, partial: &[u8]) -> bool {
    panic::catch_unwind(AssertUnwindSafe(|| handler.on_partial(partial))).unwrap_or_else(|_| {
        warn!("{}: partial line handler panicked", name);
        false
    })
}
