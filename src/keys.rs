//! Interactive keyboard side channel, enabled by TTY_MODE.
//!
//! Runs the terminal in raw mode on a blocking task and translates key
//! presses into commands: `t` pushes a test event, `Ctrl-C` quits. This
//! feeds the notifier directly and never touches outage state.

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    PushTestEvent,
    Quit,
}

/// Enable raw mode and start forwarding key commands. The reader task
/// stops on its own once a quit is sent or the receiver is dropped.
pub fn listen() -> Result<mpsc::UnboundedReceiver<Command>> {
    terminal::enable_raw_mode()?;
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::task::spawn_blocking(move || loop {
        if !event::poll(Duration::from_millis(200)).unwrap_or(false) {
            if tx.is_closed() {
                break;
            }
            continue;
        }
        match event::read() {
            Ok(Event::Key(key)) => {
                if let Some(cmd) = map_key(key) {
                    let quit = cmd == Command::Quit;
                    if tx.send(cmd).is_err() || quit {
                        break;
                    }
                }
            }
            Ok(_) => {}
            Err(_) => break,
        }
    });

    Ok(rx)
}

/// Leave raw mode before exiting so the terminal is usable afterwards.
pub fn restore() -> Result<()> {
    terminal::disable_raw_mode()?;
    Ok(())
}

fn map_key(key: KeyEvent) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Command::Quit),
        KeyCode::Char('t') => Some(Command::PushTestEvent),
        _ => None,
    }
}
