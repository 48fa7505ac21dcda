//! Local terminal helpers

use std::io;

use crossterm::terminal;

/// Raw mode for the lifetime of the guard
///
/// Restores the mode that was active before [`RawModeGuard::enter`] when
/// dropped.
#[derive(Debug)]
pub struct RawModeGuard {
    was_raw: bool,
}

impl RawModeGuard {
    pub fn enter() -> io::Result<Self> {
        let was_raw = terminal::is_raw_mode_enabled()?;
        if !was_raw {
            terminal::enable_raw_mode()?;
        }
        Ok(Self { was_raw })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if !self.was_raw {
            if let Err(e) = terminal::disable_raw_mode() {
                tracing::warn!("Failed to restore terminal mode: {}", e);
            }
        }
    }
}

/// Current terminal size as `(cols, rows)`
pub fn size() -> io::Result<(u16, u16)> {
    terminal::size()
}
