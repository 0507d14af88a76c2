//! Line-addressed terminal display surface.
//!
//! The board only ever draws a handful of fixed rows: a banner, one row per
//! playback slot, and a status line. This module exposes that as a small
//! trait so the registry and supervisors can write rows without knowing
//! about the terminal, and so tests can capture output instead of drawing.

use crossterm::{
    cursor::MoveTo,
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};
use std::io::{self, Stdout, Write};
use std::sync::Mutex;

/// Display writes available to the input loop and supervisors.
///
/// Implementations must be safe to call from multiple threads: each active
/// channel writes only its own row, but rows are written concurrently.
pub trait Surface: Send + Sync {
    /// Clear the whole surface.
    fn clear_all(&self) -> io::Result<()>;
    /// Write `text` at the start of `row` and clear the rest of the line.
    fn write_row(&self, row: u16, text: &str) -> io::Result<()>;
    /// Blank out `row`.
    fn clear_row(&self, row: u16) -> io::Result<()>;
}

/// Crossterm-backed surface writing to stdout.
///
/// A single mutex serializes queued writes and the flush, so interleaved
/// row updates from supervisor threads cannot tear.
pub struct TerminalSurface {
    out: Mutex<Stdout>,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self {
            out: Mutex::new(io::stdout()),
        }
    }

    fn with_out<F>(&self, f: F) -> io::Result<()>
    where
        F: FnOnce(&mut Stdout) -> io::Result<()>,
    {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut out)?;
        out.flush()
    }
}

impl Default for TerminalSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface for TerminalSurface {
    fn clear_all(&self) -> io::Result<()> {
        self.with_out(|out| {
            queue!(out, MoveTo(0, 0), Clear(ClearType::All))?;
            Ok(())
        })
    }

    fn write_row(&self, row: u16, text: &str) -> io::Result<()> {
        self.with_out(|out| {
            queue!(
                out,
                MoveTo(0, row),
                Print(text),
                Clear(ClearType::UntilNewLine)
            )?;
            Ok(())
        })
    }

    fn clear_row(&self, row: u16) -> io::Result<()> {
        self.with_out(|out| {
            queue!(out, MoveTo(0, row), Clear(ClearType::CurrentLine))?;
            Ok(())
        })
    }
}
