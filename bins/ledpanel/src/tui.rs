//! Interactive terminal front end.

use std::io::{self, Stdout};

use anyhow::{Context, Result};
use crossterm::event::{Event, EventStream, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use ledpanel_client::Session;
use ledpanel_core::PanelSettings;

use crate::app::App;
use crate::input;
use crate::ui;

type Term = Terminal<CrosstermBackend<Stdout>>;

fn setup_terminal() -> Result<Term> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;
    terminal.hide_cursor()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Term) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run the form until the user quits. The terminal is restored either way.
pub async fn run(settings: PanelSettings) -> Result<()> {
    let mut terminal = setup_terminal().context("Failed to set up the terminal")?;
    let result = run_app(&mut terminal, settings).await;
    restore_terminal(&mut terminal).context("Failed to restore the terminal")?;
    result
}

async fn run_app(terminal: &mut Term, settings: PanelSettings) -> Result<()> {
    let session = Session::connect(&settings, |message| {
        if let Err(e) = terminal.draw(|f| ui::draw_loading(f, message)) {
            tracing::warn!(error = %e, "Failed to draw");
        }
    })
    .await
    .with_context(|| format!("Failed to load the settings form from {}", settings.http_base()))?;

    let mut app = App::new(session, settings.host.clone());
    let mut events = EventStream::new();

    loop {
        terminal.draw(|f| ui::draw(f, &app))?;

        tokio::select! {
            maybe_event = events.next() => match maybe_event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    if let Some(action) = input::map_key(key) {
                        if !app.handle(action) {
                            break;
                        }
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).context("Terminal input failed"),
                None => break,
            },
            event = app.session_mut().next_event() => match event {
                Some(_) => app.keep_focus_visible(),
                None => anyhow::bail!("Device session ended"),
            },
        }
    }

    tracing::info!("Quitting");
    Ok(())
}
