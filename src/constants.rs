//! Project-wide constants used across multiple modules.
//!
//! This module centralizes constant definitions to avoid duplication and ensure
//! consistency across the codebase.

/// Maximum number of concurrently playing channels unless configured otherwise
pub const DEFAULT_MAX_CHANNELS: usize = 3;

/// Supervisor poll period in milliseconds unless configured otherwise
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Progress bar width in characters unless configured otherwise
pub const DEFAULT_PROGRESS_WIDTH: usize = 20;

/// Duration substituted whenever probing a clip fails
pub const DEFAULT_FALLBACK_DURATION_SECS: f32 = 3.0;

/// Audio file extensions with a dedicated external player
pub const PLAYABLE_EXTENSIONS: &[&str] = &["wav", "mp3"];

/// Banner shown at the top of the interactive board
pub const HEADER_TEXT: &str = "Press keys to play sounds. SPACE = stop all, Q = quit";
