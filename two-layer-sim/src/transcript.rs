//! Human-readable transcript of every layer transition.
//!
//! Both connection drivers write to the same sink.  To keep their output
//! readable, each logical block (head rule, text, tail rule) is rendered
//! into one buffer first and then written while holding the sink's mutex,
//! so blocks from different connections can never interleave.
//!
//! Failing to write the transcript is not a protocol failure: errors are
//! logged and the simulation carries on.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

const RULE_WIDTH: usize = 75;

/// Which part of the stack produced a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Application,
    Transport,
    Channel,
}

impl Layer {
    fn title(self) -> &'static str {
        match self {
            Layer::Application => "Application Layer",
            Layer::Transport => "Transport Layer",
            Layer::Channel => "Channel",
        }
    }

    fn fill(self) -> char {
        match self {
            Layer::Application => '*',
            Layer::Transport => '-',
            Layer::Channel => '~',
        }
    }

    /// `*****[Application Layer]*****…` padded to the rule width.
    pub fn head(self) -> String {
        let fill = self.fill();
        let mut line: String = std::iter::repeat(fill).take(5).collect();
        line.push('[');
        line.push_str(self.title());
        line.push(']');
        let used = line.chars().count();
        line.extend(std::iter::repeat(fill).take(RULE_WIDTH.saturating_sub(used)));
        line
    }

    pub fn tail(self) -> String {
        std::iter::repeat(self.fill()).take(RULE_WIDTH).collect()
    }
}

type Sink = Box<dyn Write + Send>;

/// Cloneable handle to a shared, line-atomic transcript sink.
#[derive(Clone)]
pub struct Transcript {
    sink: Arc<Mutex<Sink>>,
}

impl fmt::Debug for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transcript").finish_non_exhaustive()
    }
}

impl Transcript {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// A transcript that discards everything.
    pub fn sink() -> Self {
        Self::new(io::sink())
    }

    /// A transcript captured in memory, plus a handle to read it back.
    pub fn in_memory() -> (Self, SharedBuffer) {
        let buffer = SharedBuffer::default();
        (Self::new(buffer.clone()), buffer)
    }

    /// Write one framed block for `layer`, tagged with the connection label.
    pub fn block(&self, layer: Layer, connection: &str, text: fmt::Arguments<'_>) {
        let rendered = format!(
            "{}\n\n[{connection}] {text}\n\n{}\n\n",
            layer.head(),
            layer.tail()
        );
        self.write_atomic(&rendered);
    }

    /// Closing notice for a connection.
    pub fn closing(&self, connection: &str, closed_by: &str) {
        self.write_atomic(&format!(
            "    /|\\/|\\/|\\    closing {connection} by {closed_by}...    /|\\/|\\/|\\\n\n"
        ));
    }

    /// A free-standing line such as the start/finish banners.
    pub fn banner(&self, text: &str) {
        self.write_atomic(&format!("{text}\n\n"));
    }

    fn write_atomic(&self, rendered: &str) {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = sink.write_all(rendered.as_bytes()).and_then(|()| sink.flush()) {
            log::warn!("transcript write failed: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// SharedBuffer
// ---------------------------------------------------------------------------

/// In-memory `Write` target that can be read while writers still hold it.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
