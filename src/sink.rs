use std::fs::File;
use std::io::{self, IsTerminal, Write};

/// A byte-stream destination for rendered log lines.
///
/// The formatter auto-colorizes only when the sink reports that it is
/// attached to an interactive terminal. Destinations without a file
/// descriptor to check, such as in-memory buffers, keep the default `false`
/// and are never auto-colorized. The capability is a plain method so tests
/// can substitute a sink with a fixed answer.
pub trait LogSink: Write + Send {
    /// Whether this sink writes to an interactive terminal.
    fn is_terminal(&self) -> bool {
        false
    }
}

impl LogSink for io::Stderr {
    fn is_terminal(&self) -> bool {
        IsTerminal::is_terminal(self)
    }
}

impl LogSink for io::Stdout {
    fn is_terminal(&self) -> bool {
        IsTerminal::is_terminal(self)
    }
}

impl LogSink for File {
    fn is_terminal(&self) -> bool {
        IsTerminal::is_terminal(self)
    }
}

impl LogSink for Vec<u8> {}
