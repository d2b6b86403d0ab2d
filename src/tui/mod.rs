//! Terminal client for the memory game.

mod app;
mod ui;

pub use app::{App, CardView, GRID_COLUMNS};

use crate::authority::HttpAuthority;
use crate::controller::{ControllerHandle, SessionController};
use crate::events::GameEvent;
use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, instrument};

/// Runs the TUI client against the match authority at `server_url`.
pub async fn run_tui(server_url: String, environment: String) -> Result<()> {
    // Log to a file so tracing output doesn't fight the TUI
    let log_file = std::fs::File::create("pairmatch_tui.log")?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::sync::Arc::new(log_file))
        .with_ansi(false)
        .try_init();

    info!(server_url = %server_url, environment = %environment, "starting TUI client");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let authority = HttpAuthority::new(server_url);
    let (controller, handle) = SessionController::new(authority, event_tx);
    tokio::spawn(controller.run());
    handle.start(environment.clone());

    let res = run_game(&mut terminal, &handle, &mut event_rx, App::new(environment)).await;

    handle.shutdown();
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        error!(error = ?err, "game loop error");
    }
    res
}

/// Draw/input loop: applies pending game events, renders, and forwards key
/// presses as controller commands.
#[instrument(skip_all)]
async fn run_game<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    handle: &ControllerHandle,
    event_rx: &mut mpsc::UnboundedReceiver<GameEvent>,
    mut app: App,
) -> Result<()> {
    loop {
        while let Ok(game_event) = event_rx.try_recv() {
            app.handle_event(game_event);
        }

        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Non-blocking input check; the controller keeps working while we
        // wait.
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => {
                        info!("user quit");
                        return Ok(());
                    }
                    KeyCode::Char('r') => {
                        info!("user requested restart");
                        handle.restart();
                    }
                    KeyCode::Left | KeyCode::Char('h') => app.cursor_left(),
                    KeyCode::Right | KeyCode::Char('l') => app.cursor_right(),
                    KeyCode::Up | KeyCode::Char('k') => app.cursor_up(),
                    KeyCode::Down | KeyCode::Char('j') => app.cursor_down(),
                    KeyCode::Enter | KeyCode::Char(' ') => {
                        if !app.completed() {
                            handle.flip(app.cursor());
                        }
                    }
                    _ => {}
                }
            }
        }

        tokio::time::sleep(Duration::from_millis(30)).await;
    }
}
