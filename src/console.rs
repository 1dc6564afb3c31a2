//! Console channel abstraction
//!
//! Models the host environment's console: four output channels (log,
//! info, warn, error), a clear operation, and a one-way silencing switch
//! used by production mode. All writes go through a pluggable sink so
//! embedders and tests can capture output instead of printing it.

use std::io::{self, ErrorKind, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};

// =============================================================================
// CHANNELS AND SINKS
// =============================================================================

/// The four console output channels, one per severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Log,
    Info,
    Warn,
    Error,
}

/// Backend a [`Console`] writes through.
pub trait ConsoleSink: Send + Sync {
    /// Write one finished line to the given channel.
    fn write_line(&self, channel: Channel, line: &str);

    /// Discard any output shown or buffered so far.
    fn clear(&self);
}

/// Terminal sink: log and info lines go to stdout, warn and error to
/// stderr. Clearing wipes the screen and scrollback.
pub struct TermSink;

impl ConsoleSink for TermSink {
    fn write_line(&self, channel: Channel, line: &str) {
        match channel {
            Channel::Log | Channel::Info => write_stdout_safe(line),
            Channel::Warn | Channel::Error => write_stderr_safe(line),
        }
    }

    fn clear(&self) {
        let _ = execute!(io::stdout(), Clear(ClearType::Purge), Clear(ClearType::All));
    }
}

/// Print to stdout but handle broken pipes gracefully (e.g. when piped to `head`)
fn write_stdout_safe(line: &str) {
    if let Err(e) = writeln!(io::stdout(), "{}", line) {
        if e.kind() == ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        let _ = writeln!(io::stderr(), "Error writing to stdout: {}", e);
    }
    if let Err(e) = io::stdout().flush() {
        if e.kind() == ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
    }
}

/// Print to stderr with the same broken-pipe handling
fn write_stderr_safe(line: &str) {
    if let Err(e) = writeln!(io::stderr(), "{}", line) {
        if e.kind() == ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
    }
    let _ = io::stderr().flush();
}

/// In-memory sink that records every line; clones share one buffer.
#[derive(Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<(Channel, String)>>>,
    clears: Arc<AtomicUsize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written since the last clear, in write order
    pub fn lines(&self) -> Vec<(Channel, String)> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(_) => Vec::new(),
        }
    }

    /// Lines written to one channel since the last clear
    pub fn lines_for(&self, channel: Channel) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, line)| line)
            .collect()
    }

    /// How many times the sink has been cleared
    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl ConsoleSink for MemorySink {
    fn write_line(&self, channel: Channel, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((channel, line.to_string()));
        }
    }

    fn clear(&self) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.clear();
        }
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}

/// Sink that drops everything; installed when the console is silenced.
struct NoopSink;

impl ConsoleSink for NoopSink {
    fn write_line(&self, _channel: Channel, _line: &str) {}

    fn clear(&self) {}
}

// =============================================================================
// CONSOLE FRONT
// =============================================================================

/// Shared four-channel console.
///
/// Clones share the same underlying sink, so a clone held by a scheduled
/// task observes a later [`Console::silence`]. Silencing is one-way: it
/// clears existing output once and swaps every channel for a no-op.
#[derive(Clone)]
pub struct Console {
    sink: Arc<RwLock<Box<dyn ConsoleSink>>>,
}

impl Console {
    /// Console over the process terminal
    pub fn term() -> Self {
        Self::with_sink(Box::new(TermSink))
    }

    /// Console over a caller-supplied sink
    pub fn with_sink(sink: Box<dyn ConsoleSink>) -> Self {
        Console {
            sink: Arc::new(RwLock::new(sink)),
        }
    }

    /// Write one line to the given channel
    pub fn write(&self, channel: Channel, line: &str) {
        if let Ok(sink) = self.sink.read() {
            sink.write_line(channel, line);
        }
    }

    pub fn log(&self, line: &str) {
        self.write(Channel::Log, line);
    }

    pub fn info(&self, line: &str) {
        self.write(Channel::Info, line);
    }

    pub fn warn(&self, line: &str) {
        self.write(Channel::Warn, line);
    }

    pub fn error(&self, line: &str) {
        self.write(Channel::Error, line);
    }

    /// Discard output shown so far
    pub fn clear(&self) {
        if let Ok(sink) = self.sink.read() {
            sink.clear();
        }
    }

    /// Clear once, then permanently replace all channels with no-ops.
    /// There is no way to undo this on the same console.
    pub(crate) fn silence(&self) {
        self.clear();
        if let Ok(mut sink) = self.sink.write() {
            *sink = Box::new(NoopSink);
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::term()
    }
}

// =============================================================================
// TESTS
// =============================================================================
