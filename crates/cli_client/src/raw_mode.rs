//! Raw mode terminal handling for crossterm
//!
//! The key loop runs in raw mode (single keystrokes, no echo). Menus that
//! need a whole line drop back to cooked mode with [`cooked`].

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io::{BufRead, Write};
use std::time::Duration;

/// Guard that enables raw mode and restores normal mode on drop.
///
/// # Example
/// ```no_run
/// let _guard = RawModeGuard::enable()?;
/// // Terminal is now in raw mode
/// // Raw mode automatically disabled when guard is dropped
/// # Ok::<(), anyhow::Error>(())
/// ```
pub struct RawModeGuard;

impl RawModeGuard {
    /// Enable raw mode for the terminal.
    ///
    /// The terminal is restored when the guard is dropped, even on panic.
    pub fn enable() -> Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        // Best-effort restore - ignore errors during cleanup
        let _ = terminal::disable_raw_mode();
    }
}

/// One keystroke as the shell sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Char(char),
    /// Ctrl-C: raw mode swallows SIGINT, so it arrives as a key
    Interrupt,
    /// Arrows, function keys and the like
    Other,
}

/// Wait up to `timeout` for a key press
///
/// Blocking; call from `spawn_blocking`. `None` when nothing was pressed.
pub fn poll_key(timeout: Duration) -> Result<Option<KeyInput>> {
    if !event::poll(timeout)? {
        return Ok(None);
    }
    let key = match event::read()? {
        // Windows also reports releases
        Event::Key(key) if key.kind == KeyEventKind::Press => key,
        _ => return Ok(None),
    };

    let input = match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyInput::Interrupt,
        KeyCode::Char(c) => KeyInput::Char(c),
        _ => KeyInput::Other,
    };
    Ok(Some(input))
}

/// Line-mode stand-in for [`poll_key`] when raw mode is unavailable
///
/// Blocks until a whole line arrives; end of input counts as Interrupt.
pub fn read_key_line() -> Result<Option<KeyInput>> {
    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(Some(KeyInput::Interrupt));
    }
    Ok(key_from_line(&line))
}

/// First character of a typed line, ignoring the line ending
fn key_from_line(line: &str) -> Option<KeyInput> {
    line.trim_end_matches(['\r', '\n']).chars().next().map(KeyInput::Char)
}

/// Run `f` with raw mode off, restoring it afterwards if it was on
pub fn cooked<T>(f: impl FnOnce() -> T) -> T {
    let was_raw = terminal::is_raw_mode_enabled().unwrap_or(false);
    if was_raw {
        let _ = terminal::disable_raw_mode();
    }
    let out = f();
    if was_raw {
        let _ = terminal::enable_raw_mode();
    }
    out
}

/// Print text in either terminal mode (raw mode needs explicit `\r`)
pub fn say(text: &str) {
    let mut stdout = std::io::stdout();
    let _ = stdout.write_all(text.replace('\n', "\r\n").as_bytes());
    let _ = stdout.write_all(b"\r\n");
    let _ = stdout.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_from_line() {
        assert_eq!(key_from_line("w\n"), Some(KeyInput::Char('w')));
        assert_eq!(key_from_line(" \r\n"), Some(KeyInput::Char(' ')));
        assert_eq!(key_from_line("\n"), None);
    }
}
