use crate::braille::dot_position;
use crate::config::KeyLayout;
use crate::display::Parking;
use crossbeam_channel::{Sender, TrySendError};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Room for a burst of keystrokes between two drains of the main loop.
pub(crate) const KEY_QUEUE_CAPACITY: usize = 16;

// Back-off after a failed read so a dead stdin doesn't spin a core.
const READ_RETRY_DELAY: Duration = Duration::from_millis(10);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    TogglePause,
    Move(Direction),
    /// Flip the pixel at this (row, col) offset inside the glyph cell under the cursor.
    TogglePixel { row: usize, col: usize },
    ClearCell,
    ClearAll,
    Randomize,
    Quit,
}

/// Fixed key-to-action table.
#[derive(Clone, Debug)]
pub(crate) struct KeyMap {
    toggles: Vec<(char, (usize, usize))>,
}

impl KeyMap {
    pub(crate) fn new(layout: KeyLayout) -> Self {
        let toggles = match layout {
            // Mirrors the keypad's physical shape over the 2x4 block.
            KeyLayout::Numpad => vec![
                ('7', (0, 0)),
                ('8', (0, 1)),
                ('4', (1, 0)),
                ('5', (1, 1)),
                ('1', (2, 0)),
                ('2', (2, 1)),
                ('0', (3, 0)),
                ('.', (3, 1)),
            ],
            // Digit n toggles Braille dot n.
            KeyLayout::DigitRow => (1..=8u8)
                .filter_map(|dot| {
                    let pos = dot_position(dot)?;
                    Some((char::from(b'0' + dot), pos))
                })
                .collect(),
        };
        Self { toggles }
    }

    pub(crate) fn action(&self, key: &KeyEvent) -> Option<Action> {
        if key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
        {
            return None;
        }
        match key.code {
            KeyCode::Char(' ') => Some(Action::TogglePause),
            KeyCode::Esc | KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Up | KeyCode::Char('k') => Some(Action::Move(Direction::Up)),
            KeyCode::Down | KeyCode::Char('j') => Some(Action::Move(Direction::Down)),
            KeyCode::Left | KeyCode::Char('h') => Some(Action::Move(Direction::Left)),
            KeyCode::Right | KeyCode::Char('l') => Some(Action::Move(Direction::Right)),
            KeyCode::Delete | KeyCode::Char('x') => Some(Action::ClearCell),
            KeyCode::Char('c') => Some(Action::ClearAll),
            KeyCode::Char('r') => Some(Action::Randomize),
            KeyCode::Char(ch) => self
                .toggles
                .iter()
                .find(|(key, _)| *key == ch)
                .map(|&(_, (row, col))| Action::TogglePixel { row, col }),
            _ => None,
        }
    }
}

fn is_interrupt(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
}

/// Parks the cursor below the frame, restores the terminal and ends the
/// process without going through the main loop.
pub(crate) fn interrupt(parking: &Parking) -> ! {
    info!("interrupted");
    parking.park_and_restore();
    std::process::exit(0);
}

/// Why [`forward_keys`] stopped.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ListenEnd {
    Interrupted,
    Disconnected,
}

/// Pulls events from `next` and queues each key press on `tx` without
/// blocking. A full queue drops the key. Returns on Ctrl-C or once the
/// receiving side is gone.
pub(crate) fn forward_keys(
    mut next: impl FnMut() -> io::Result<Event>,
    tx: &Sender<KeyEvent>,
) -> ListenEnd {
    loop {
        let key = match next() {
            Ok(Event::Key(k)) if k.kind != KeyEventKind::Release => k,
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "keystroke read failed");
                thread::sleep(READ_RETRY_DELAY);
                continue;
            }
        };
        if is_interrupt(&key) {
            return ListenEnd::Interrupted;
        }
        match tx.try_send(key) {
            Ok(()) => {}
            Err(TrySendError::Full(k)) => debug!(key = ?k.code, "key queue full, dropping key"),
            Err(TrySendError::Disconnected(_)) => return ListenEnd::Disconnected,
        }
    }
}

/// Spawns the thread that blocks on keystrokes and queues each key press.
///
/// Raw mode swallows SIGINT, so a Ctrl-C keystroke is handled here directly.
pub(crate) fn spawn_key_listener(
    tx: Sender<KeyEvent>,
    parking: Arc<Parking>,
) -> anyhow::Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name("key-listener".into())
        .spawn(move || {
            if forward_keys(event::read, &tx) == ListenEnd::Interrupted {
                interrupt(&parking);
            }
        })?;
    Ok(handle)
}

/// Spawns the thread that waits for SIGINT (or the platform equivalent)
/// delivered from outside the terminal.
pub(crate) fn spawn_signal_listener(parking: Arc<Parking>) -> anyhow::Result<JoinHandle<()>> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let handle = thread::Builder::new()
        .name("signal-listener".into())
        .spawn(move || {
            match rt.block_on(tokio::signal::ctrl_c()) {
                Ok(()) => interrupt(&parking),
                Err(e) => warn!(error = %e, "could not listen for interrupts"),
            }
        })?;
    Ok(handle)
}
