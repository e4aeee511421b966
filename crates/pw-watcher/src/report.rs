//! Operator-facing result reporting.
//!
//! Each accepted event produces one `processing model source: …` line and
//! one result line:
//!
//! ```text
//! generated model diagram: /work/seq.png
//! error: exit code 1 processing file /work/seq.pu
//! error: No such file or directory (os error 2)
//! ```

use std::fmt;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::RenderError;

/// The outcome of rendering one source file.
#[derive(Debug)]
pub struct RenderResult {
    /// The source file that triggered the render.
    pub source_file: Utf8PathBuf,
    /// The file the renderer is expected to have produced.
    pub output_file: Utf8PathBuf,
    /// Whether the render succeeded.
    pub status: Result<(), RenderError>,
}

impl RenderResult {
    /// Returns `true` if the renderer exited with code 0.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status.is_ok()
    }
}

impl fmt::Display for RenderResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            Ok(()) => write!(f, "generated model diagram: {}", self.output_file),
            Err(err @ RenderError::Launch(_)) => write!(f, "error: {err}"),
            Err(err) => write!(f, "error: {err} processing file {}", self.source_file),
        }
    }
}

/// Receives per-event progress from the watcher.
pub trait Reporter: Send {
    /// Called before the renderer is launched for `source_file`.
    fn processing(&mut self, source_file: &Utf8Path);

    /// Called once the render finished or failed to launch.
    fn finished(&mut self, result: &RenderResult);
}

/// Writes one line per report to a writer, stdout by default.
#[derive(Debug)]
pub struct LineReporter<W> {
    out: W,
}

impl LineReporter<io::Stdout> {
    /// Creates a reporter writing to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> LineReporter<W> {
    /// Creates a reporter writing to `out`.
    #[must_use]
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, args: fmt::Arguments<'_>) {
        // A closed stdout must not take the session down.
        let _ = writeln!(self.out, "{args}");
        let _ = self.out.flush();
    }
}

impl<W: Write + Send> Reporter for LineReporter<W> {
    fn processing(&mut self, source_file: &Utf8Path) {
        self.line(format_args!("processing model source: {source_file}"));
    }

    fn finished(&mut self, result: &RenderResult) {
        self.line(format_args!("{result}"));
    }
}
