//! External player process lifecycle.
//!
//! Playback is delegated to one external decoder process per clip: `aplay`
//! for WAV, `mpg123` for MP3. The process is modeled as an opaque capability
//! (alive check + terminate) so the registry and its tests never depend on a
//! real executable being installed.

use std::error::Error;
use std::fmt;
use std::io;
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// A running (or finished) player process.
///
/// The channel registry is the sole owner of each boxed process and the only
/// code that terminates it.
pub trait PlayerProcess: Send {
    /// True while the process has not yet exited.
    fn is_alive(&mut self) -> bool;
    /// Terminate and reap the process. Must tolerate an already-dead process.
    fn terminate(&mut self);
}

/// Starts a player for a clip path.
pub trait PlayerLauncher: Send + Sync {
    fn launch(&self, path: &Path) -> Result<Box<dyn PlayerProcess>, LaunchError>;
}

#[derive(Debug)]
pub enum LaunchError {
    /// No external player is configured for this file extension.
    UnsupportedFormat(String),
    /// The player executable could not be started.
    Spawn(io::Error),
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchError::UnsupportedFormat(ext) => {
                write!(f, "unsupported audio format: {ext}")
            }
            LaunchError::Spawn(e) => write!(f, "failed to start player: {e}"),
        }
    }
}

impl Error for LaunchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LaunchError::Spawn(e) => Some(e),
            LaunchError::UnsupportedFormat(_) => None,
        }
    }
}

/// Maps file extensions to external player executables and spawns them with
/// all standard streams discarded.
pub struct ExternalLauncher;

fn player_command(path: &Path) -> Result<Command, LaunchError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let executable = match ext.as_str() {
        "wav" => "aplay",
        "mp3" => "mpg123",
        _ => return Err(LaunchError::UnsupportedFormat(ext)),
    };

    let mut cmd = Command::new(executable);
    cmd.arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    Ok(cmd)
}

impl PlayerLauncher for ExternalLauncher {
    fn launch(&self, path: &Path) -> Result<Box<dyn PlayerProcess>, LaunchError> {
        let child = player_command(path)?.spawn().map_err(LaunchError::Spawn)?;
        log::debug!("launched player for {}", path.display());
        Ok(Box::new(SpawnedPlayer { child }))
    }
}

/// A spawned external player.
struct SpawnedPlayer {
    child: Child,
}

impl PlayerProcess for SpawnedPlayer {
    fn is_alive(&mut self) -> bool {
        // try_wait reaps on exit; an error means the child is gone
        matches!(self.child.try_wait(), Ok(None))
    }

    fn terminate(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
