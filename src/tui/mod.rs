pub mod app;
pub mod event;
pub mod theme;
pub mod ui;

pub use app::{Action, App, Command, Route};
pub use theme::{resolve_theme, Theme, ThemeColors};

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::fetch::fetch_snapshot;
use crate::judging::submit_evaluation;
use crate::model::{Criterion, Snapshot};
use crate::provider::cache::{write_cached_snapshot, CacheConfig};
use crate::provider::{Backend, ProviderError};
use crate::scoring::{Submission, SCORE_STEP};
use app::{InputMode, JudgeScreen};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use event::{Event, EventHandler};
use tokio::task::JoinHandle;
use tokio::time::error::Elapsed;

const TICK_RATE: Duration = Duration::from_millis(250);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
/// Auto-refresh waits this long after the last key press
const INTERACTION_GRACE: Duration = Duration::from_secs(10);

/// A backend request running off the UI thread, bounded by `REQUEST_TIMEOUT`
type Task<T> = JoinHandle<Result<Result<T, ProviderError>, Elapsed>>;

/// Where fetched snapshots are remembered between runs
pub struct SnapshotCache {
    pub config: CacheConfig,
    pub path: PathBuf,
}

pub async fn run_tui(
    mut app: App,
    backend: Backend,
    colors: ThemeColors,
    cache: SnapshotCache,
) -> anyhow::Result<()> {
    // Keep log output from tearing the display
    crate::stderr_buffer::activate();

    // Init terminal (sets up panic hooks automatically)
    let mut terminal = ratatui::init();
    let mut events = EventHandler::new(TICK_RATE, app.refresh_interval);

    let backend_key = backend.describe();
    let mut pending_fetch = Some(spawn_fetch(&backend, &backend_key, &cache));
    let mut pending_save: Option<Task<()>> = None;
    // Some(manual) while a refresh is wanted but not yet started
    let mut queued_refresh: Option<bool> = None;
    app.is_loading = true;

    let result = loop {
        if let Err(e) = terminal.draw(|frame| ui::draw(frame, &mut app, &colors)) {
            break Err(e.into());
        }

        let command = match events.next().await {
            Event::Key(key) => {
                app.last_interaction = Instant::now();
                key_to_action(&app, key).and_then(|action| app.dispatch(action))
            }
            Event::Tick => app.dispatch(Action::Tick),
            Event::Refresh => app.dispatch(Action::AutoRefresh),
        };

        match command {
            Some(Command::Refresh { manual }) => {
                queued_refresh = Some(manual || queued_refresh == Some(true));
            }
            Some(Command::Submit(submission)) => {
                pending_save = Some(spawn_save(&backend, submission, app.criteria().to_vec()));
            }
            None => {}
        }

        if pending_fetch.as_ref().is_some_and(|h| h.is_finished()) {
            if let Some(handle) = pending_fetch.take() {
                let action = match handle.await {
                    Ok(Ok(Ok(snapshot))) => Action::Loaded(snapshot),
                    Ok(Ok(Err(e))) => Action::LoadFailed(e.to_string()),
                    Ok(Err(_elapsed)) => Action::LoadFailed("timed out after 20s".to_string()),
                    Err(e) => Action::LoadFailed(format!("refresh task panicked: {}", e)),
                };
                app.dispatch(action);
            }
        }

        if pending_save.as_ref().is_some_and(|h| h.is_finished()) {
            if let Some(handle) = pending_save.take() {
                let action = match handle.await {
                    Ok(Ok(Ok(()))) => Action::Saved,
                    Ok(Ok(Err(e))) => Action::SaveFailed(e.to_string()),
                    Ok(Err(_elapsed)) => Action::SaveFailed("timed out after 20s".to_string()),
                    Err(e) => Action::SaveFailed(format!("save task panicked: {}", e)),
                };
                if let Some(Command::Refresh { manual }) = app.dispatch(action) {
                    queued_refresh = Some(manual || queued_refresh == Some(true));
                }
            }
        }

        // Only one fetch at a time. Auto-refresh waits while a popup is open
        // or the user is busy; it stays queued and retries on the next tick.
        if let Some(manual) = queued_refresh {
            let modal_open = app.input_mode != InputMode::Normal;
            let recent_interaction = app.last_interaction.elapsed() < INTERACTION_GRACE;
            if pending_fetch.is_none() && (manual || (!modal_open && !recent_interaction)) {
                queued_refresh = None;
                pending_fetch = Some(spawn_fetch(&backend, &backend_key, &cache));
                app.is_loading = true;
            }
        }

        if app.should_quit {
            break Ok(());
        }
    };

    ratatui::restore();

    // Buffered log lines are safe to print once the terminal is restored
    crate::stderr_buffer::flush_to_stderr();

    result
}

fn spawn_fetch(backend: &Backend, backend_key: &str, cache: &SnapshotCache) -> Task<Snapshot> {
    let backend = backend.clone();
    let backend_key = backend_key.to_string();
    let cache_enabled = cache.config.enabled;
    let cache_path = cache.path.clone();

    tokio::spawn(async move {
        tokio::time::timeout(REQUEST_TIMEOUT, async {
            let snapshot = fetch_snapshot(&backend).await?;
            if cache_enabled {
                if let Err(e) = write_cached_snapshot(&cache_path, &backend_key, &snapshot) {
                    tracing::warn!("Failed to cache snapshot: {}", e);
                }
            }
            Ok::<_, ProviderError>(snapshot)
        })
        .await
    })
}

fn spawn_save(
    backend: &Backend,
    submission: Submission,
    criteria: Vec<Criterion>,
) -> Task<()> {
    let backend = backend.clone();
    tokio::spawn(async move {
        tokio::time::timeout(REQUEST_TIMEOUT, submit_evaluation(&backend, &submission, &criteria)).await
    })
}

/// Translate a key press into an action for the current mode
fn key_to_action(app: &App, key: KeyEvent) -> Option<Action> {
    match app.input_mode {
        InputMode::Help => Some(Action::DismissHelp),
        InputMode::CommentInput => match key.code {
            KeyCode::Enter | KeyCode::Esc => Some(Action::FinishComment),
            KeyCode::Backspace => Some(Action::CommentBackspace),
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::CommentChar(c)),
            _ => None,
        },
        InputMode::Normal => {
            let in_form = app.route == Route::Judge && matches!(app.judge_screen, JudgeScreen::Form(_));
            match key.code {
                KeyCode::Char('q') => Some(Action::Quit),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),

                KeyCode::Char('j') | KeyCode::Down => Some(Action::Down),
                KeyCode::Char('k') | KeyCode::Up => Some(Action::Up),

                KeyCode::Tab => Some(Action::NextRoute),
                KeyCode::Char('1') => Some(Action::SelectRoute(Route::Ranking)),
                KeyCode::Char('2') => Some(Action::SelectRoute(Route::Judge)),
                KeyCode::Char('3') => Some(Action::SelectRoute(Route::Reports)),

                KeyCode::Char('r') => Some(Action::Refresh),
                KeyCode::Char('?') => Some(Action::ShowHelp),

                // Rating form
                KeyCode::Char('h') | KeyCode::Left if in_form => Some(Action::AdjustScore(-SCORE_STEP)),
                KeyCode::Char('l') | KeyCode::Right if in_form => Some(Action::AdjustScore(SCORE_STEP)),
                KeyCode::Char(' ') if in_form => Some(Action::SetScore),
                KeyCode::Char('c') if in_form => Some(Action::StartComment),
                KeyCode::Char('s') if in_form => Some(Action::Submit),
                KeyCode::Esc if in_form => Some(Action::Back),

                KeyCode::Enter => Some(Action::Open),
                _ => None,
            }
        }
    }
}
