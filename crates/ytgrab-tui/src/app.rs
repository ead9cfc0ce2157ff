//! App — event loop and top-level flow dispatch.
//!
//! Architecture:
//! - A `tokio::mpsc` channel carries terminal events in from a blocking
//!   reader task; a second channel carries probe/download outcomes back
//!   from `DownloadManager` tasks.
//! - The loop draws a frame only when something changed, then awaits the
//!   next message. All state mutation happens on this one task.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use ytgrab_core::config::Config;
use ytgrab_core::format::TrackKind;
use ytgrab_core::runner::Runner;

use crate::download_manager::{DownloadManager, WorkMessage, WorkResult};
use crate::flow::{FlowSession, Stage};
use crate::selection::{Phase, SelectionState};
use crate::ui;
use crate::widgets::url_input::UrlAction;

const KIND_ORDER: [TrackKind; 3] = [TrackKind::Video, TrackKind::Audio, TrackKind::Subtitles];

enum Screen {
    Picker { choice: usize },
    Flow(FlowSession),
}

pub struct App {
    items_per_page: usize,
    screen: Screen,
    manager: DownloadManager,
    work_rx: mpsc::Receiver<WorkMessage>,
    spinner: usize,
    should_quit: bool,
}

impl App {
    pub fn new(config: &Config, runner: Runner) -> Self {
        let (work_tx, work_rx) = mpsc::channel::<WorkMessage>(16);
        Self {
            items_per_page: config.ui.items_per_page,
            screen: Screen::Picker { choice: 0 },
            manager: DownloadManager::new(Arc::new(runner), work_tx),
            work_rx,
            spinner: 0,
            should_quit: false,
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(mut self) -> anyhow::Result<()> {
        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        let (tx, mut rx) = mpsc::channel::<Event>(256);

        // ── Background task: keyboard events ──────────────────────────────────
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if tx.blocking_send(ev).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // Spinner animation while a subprocess is in flight.
        let mut spinner_tick = tokio::time::interval(Duration::from_millis(100));
        spinner_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(ev) = rx.recv() => {
                    needs_redraw = self.handle_event(ev);
                }
                Some(work) = self.work_rx.recv() => {
                    needs_redraw = self.handle_work(work);
                }
                _ = spinner_tick.tick() => {
                    if self.is_busy() {
                        self.spinner = self.spinner.wrapping_add(1);
                        needs_redraw = true;
                    }
                }
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        self.manager.cancel();
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        Ok(())
    }

    fn is_busy(&self) -> bool {
        match &self.screen {
            Screen::Flow(session) => match &session.stage {
                Stage::Probing { .. } => true,
                Stage::Selecting { selection, .. } => *selection.phase() == Phase::Downloading,
                Stage::EnteringUrl(_) => false,
            },
            Screen::Picker { .. } => false,
        }
    }

    // ── Input handling ────────────────────────────────────────────────────────

    fn handle_event(&mut self, ev: Event) -> bool {
        match ev {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
            Event::Resize(_, _) => true,
            _ => false,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return true;
        }

        match &mut self.screen {
            Screen::Picker { choice } => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => {
                    self.should_quit = true;
                    true
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    *choice = choice.saturating_sub(1);
                    true
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    *choice = (*choice + 1).min(KIND_ORDER.len() - 1);
                    true
                }
                KeyCode::Enter => {
                    let kind = KIND_ORDER[*choice];
                    info!("starting {kind} flow");
                    self.screen = Screen::Flow(FlowSession::new(kind));
                    true
                }
                _ => false,
            },
            Screen::Flow(session) => match &mut session.stage {
                Stage::EnteringUrl(input) => match input.handle_key(key) {
                    UrlAction::Submitted(url) => {
                        session.last_error = None;
                        self.manager.start_probe(url.clone(), session.kind);
                        session.stage = Stage::Probing { url };
                        true
                    }
                    UrlAction::Back => {
                        self.screen = Screen::Picker { choice: 0 };
                        true
                    }
                    UrlAction::Changed => true,
                    UrlAction::None => false,
                },
                Stage::Probing { url } => match key.code {
                    KeyCode::Esc | KeyCode::Backspace => {
                        let url = url.clone();
                        self.manager.cancel();
                        session.rewind_to_entry(url);
                        true
                    }
                    KeyCode::Char('q') => {
                        self.should_quit = true;
                        true
                    }
                    _ => false,
                },
                Stage::Selecting { url, selection } => {
                    let handled = Self::handle_selection_key(
                        key,
                        url,
                        selection,
                        session.kind,
                        &mut self.manager,
                        &mut self.should_quit,
                    );
                    match handled {
                        None => false,
                        Some(None) => true,
                        Some(Some(url)) => {
                            self.manager.cancel();
                            session.rewind_to_entry(url);
                            true
                        }
                    }
                }
            },
        }
    }

    /// Returns `None` for an ignored key, `Some(None)` for a handled key, and
    /// `Some(Some(url))` when the session should rewind to URL entry.
    fn handle_selection_key(
        key: KeyEvent,
        url: &str,
        selection: &mut SelectionState,
        kind: TrackKind,
        manager: &mut DownloadManager,
        should_quit: &mut bool,
    ) -> Option<Option<String>> {
        match key.code {
            KeyCode::Char('q') => {
                *should_quit = true;
                Some(None)
            }
            KeyCode::Esc | KeyCode::Backspace => Some(Some(url.to_string())),
            KeyCode::Enter => match selection.phase() {
                Phase::Browsing => {
                    // confirm() gates re-dispatch; a second Enter is a no-op
                    if let Some(format_id) = selection.confirm() {
                        info!("downloading {kind} format {format_id}");
                        manager.start_download(url.to_string(), format_id, kind);
                    }
                    Some(None)
                }
                Phase::Done | Phase::Error(_) => Some(Some(url.to_string())),
                Phase::Downloading => Some(None),
            },
            KeyCode::Down | KeyCode::Char('j') => {
                selection.move_down();
                Some(None)
            }
            KeyCode::Up | KeyCode::Char('k') => {
                selection.move_up();
                Some(None)
            }
            KeyCode::Right | KeyCode::Char('l') => {
                selection.page_right();
                Some(None)
            }
            KeyCode::Left | KeyCode::Char('h') => {
                selection.page_left();
                Some(None)
            }
            _ => None,
        }
    }

    // ── Background outcomes ───────────────────────────────────────────────────

    fn handle_work(&mut self, work: WorkMessage) -> bool {
        if !self.manager.is_current(work.generation) {
            debug!("dropping stale work result (generation {})", work.generation);
            return false;
        }
        let Screen::Flow(session) = &mut self.screen else {
            return false;
        };

        match work.result {
            WorkResult::Probe(Ok(formats)) => {
                if let Stage::Probing { url } = &session.stage {
                    info!("probe returned {} formats", formats.len());
                    let url = url.clone();
                    session.stage = Stage::Selecting {
                        url,
                        selection: SelectionState::new(formats, self.items_per_page),
                    };
                    return true;
                }
                false
            }
            WorkResult::Probe(Err(msg)) => {
                if let Stage::Probing { url } = &session.stage {
                    warn!("probe failed: {msg}");
                    let url = url.clone();
                    session.rewind_to_entry(url);
                    session.last_error = Some(msg);
                    return true;
                }
                false
            }
            WorkResult::Download(result) => {
                if let Stage::Selecting { selection, .. } = &mut session.stage {
                    match &result {
                        Ok(()) => info!("download finished"),
                        Err(msg) => warn!("download failed: {msg}"),
                    }
                    selection.finish(result);
                    return true;
                }
                false
            }
        }
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    fn draw(&self, frame: &mut Frame) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(frame.area());

        match &self.screen {
            Screen::Picker { choice } => {
                ui::draw_picker(frame, rows[0], *choice);
                ui::draw_status_bar(frame, rows[1], " j/k move  enter select  q quit");
            }
            Screen::Flow(session) => {
                ui::draw_flow(frame, rows[0], session, self.spinner);
                let hint = match &session.stage {
                    Stage::EnteringUrl(_) => " enter fetch formats  esc back",
                    Stage::Probing { .. } => " esc cancel",
                    Stage::Selecting { .. } => " enter download  backspace back  q quit",
                };
                ui::draw_status_bar(frame, rows[1], hint);
            }
        }
    }
}
