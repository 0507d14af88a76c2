//! Interactive board: terminal lifecycle and key dispatch.
//!
//! This module owns the main loop. It sets the terminal up (raw mode,
//! alternate screen), blocks on one key press at a time, and routes each
//! key: quit, stop-all, or a clip lookup that funnels into the channel
//! registry. Playback and probing failures never escape this loop; only the
//! quit key or a terminal I/O error ends it.

use crossterm::{
    cursor::{Hide, Show},
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::info;
use std::error::Error;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::constants::HEADER_TEXT;

use super::launcher::{ExternalLauncher, PlayerLauncher};
use super::probe::probe_duration;
use super::registry::ChannelRegistry;
use super::supervisor::spawn_supervisor;
use super::surface::{Surface, TerminalSurface};

pub(crate) enum Flow {
    Continue,
    Quit,
}

pub struct Board {
    config: Config,
    registry: Arc<ChannelRegistry>,
    launcher: Arc<dyn PlayerLauncher>,
    surface: Arc<dyn Surface>,
    poll_interval: Duration,
}

impl Board {
    pub fn new(
        config: Config,
        launcher: Arc<dyn PlayerLauncher>,
        surface: Arc<dyn Surface>,
    ) -> Self {
        let registry = Arc::new(ChannelRegistry::new(config.max_channels));
        let poll_interval = Duration::from_millis(config.poll_interval_ms);
        Self {
            config,
            registry,
            launcher,
            surface,
            poll_interval,
        }
    }

    /// Status line sits below the channel rows.
    fn status_row(&self) -> u16 {
        self.config.max_channels as u16 + 2
    }

    fn show_status(&self, text: &str) -> io::Result<()> {
        self.surface.write_row(self.status_row(), text)
    }

    pub(crate) fn handle_key(&self, key: char) -> Result<Flow, Box<dyn Error>> {
        match key {
            'q' | 'Q' => {
                self.registry.release_all(self.surface.as_ref());
                self.show_status("Quitting.")?;
                Ok(Flow::Quit)
            }
            ' ' => {
                self.registry.release_all(self.surface.as_ref());
                self.show_status("All sounds stopped.")?;
                Ok(Flow::Continue)
            }
            _ => {
                match self.config.sound_for(key) {
                    Some(path) if !path.is_empty() => {
                        self.start_sound(Path::new(path))?;
                    }
                    _ => {
                        self.show_status(&format!("No sound mapped for '{key}'"))?;
                    }
                }
                Ok(Flow::Continue)
            }
        }
    }

    fn start_sound(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        let fallback = self.config.fallback_duration_secs;
        let launcher = self.launcher.as_ref();

        let outcome = self.registry.try_acquire(path, || {
            let duration = probe_duration(path, fallback);
            let player = launcher.launch(path)?;
            Ok((player, duration))
        });

        match outcome {
            Ok(Some(handle)) => {
                // Detached on purpose: the supervisor exits on its own as
                // soon as the channel leaves the registry.
                let _ = spawn_supervisor(
                    self.registry.clone(),
                    handle,
                    self.surface.clone(),
                    self.poll_interval,
                    self.config.progress_width,
                );
            }
            Ok(None) => {
                // Admission control: excess requests are dropped, not queued
                log::debug!("at capacity, dropped {}", path.display());
            }
            Err(e) => {
                log::warn!("launch failed for {}: {e}", path.display());
                self.show_status(&format!("Cannot play {}: {e}", path.display()))?;
            }
        }

        Ok(())
    }

    fn run_loop(&self) -> Result<(), Box<dyn Error>> {
        self.surface.clear_all()?;
        self.surface.write_row(0, HEADER_TEXT)?;

        loop {
            // Blocks until the next event; no polling while idle
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                // Raw mode swallows SIGINT; treat Ctrl-C as quit
                if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
                {
                    self.registry.release_all(self.surface.as_ref());
                    self.show_status("Quitting.")?;
                    break;
                }

                if let KeyCode::Char(c) = key.code
                    && let Flow::Quit = self.handle_key(c)?
                {
                    break;
                }
            }
        }

        info!("quit requested");
        Ok(())
    }
}

pub fn run(config: Config) -> Result<(), Box<dyn Error>> {
    init_logging()?;
    info!("starting sndpad board");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, Hide)?;

    let board = Board::new(
        config,
        Arc::new(ExternalLauncher),
        Arc::new(TerminalSurface::new()),
    );
    let res = board.run_loop();

    // Restore terminal before surfacing any error
    execute!(io::stdout(), Show, LeaveAlternateScreen)?;
    disable_raw_mode()?;

    res
}

fn init_logging() -> Result<(), Box<dyn Error>> {
    use simplelog::{CombinedLogger, LevelFilter, WriteLogger};
    use std::fs::File;

    let log_file = "/tmp/sndpad.log";
    CombinedLogger::init(vec![WriteLogger::new(
        LevelFilter::Debug,
        simplelog::Config::default(),
        File::create(log_file)?,
    )])?;

    Ok(())
}
