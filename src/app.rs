use crate::config::Config;
use crate::display::{TermGuard, TerminalDisplay};
use crate::grid::Grid;
use crate::input::{spawn_key_listener, spawn_signal_listener, KeyMap, KEY_QUEUE_CAPACITY};
use crate::session::{Flow, Mode, Session};
use crossbeam_channel::{bounded, RecvTimeoutError};
use rand::{rngs::StdRng, SeedableRng};
use std::{io, thread};
use tracing::info;

pub(crate) fn run(config: Config) -> anyhow::Result<()> {
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let (rows, cols) = (config.size.rows, config.size.cols);
    let grid = if config.empty {
        Grid::new(rows, cols)
    } else {
        Grid::random(rows, cols, &mut rng)
    };
    info!(
        rows,
        cols,
        tick_ms = config.tick,
        population = grid.population(),
        "starting"
    );

    let mut session = Session::new(grid, KeyMap::new(config.layout()), rng);
    let tick = config.tick_interval();

    spawn_signal_listener(session.parking())?;
    let _guard = TermGuard::new()?;
    let (tx, rx) = bounded(KEY_QUEUE_CAPACITY);
    spawn_key_listener(tx, session.parking())?;

    let mut display = TerminalDisplay::new(io::stdout());
    session.draw(&mut display)?;

    loop {
        // While paused nothing moves on its own, so block on the next key.
        let waited = if session.mode() == Mode::Paused {
            match rx.recv_timeout(tick) {
                Ok(key) => Some(key),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => {
                    thread::sleep(tick);
                    None
                }
            }
        } else {
            None
        };

        for key in waited.into_iter().chain(rx.try_iter()) {
            if session.handle_key(&key, &mut display)? == Flow::Quit {
                session.leave(&mut display)?;
                info!("quit");
                return Ok(());
            }
        }

        if session.mode() == Mode::Running {
            session.step(&mut display)?;
            thread::sleep(tick);
        }
    }
}
