use crate::fetch::rank_snapshot;
use crate::model::{Criterion, Project, Snapshot};
use crate::scoring::{
    build_reports, completed_count, judge_progress, validate_submission, JudgeProgress, ProjectReport,
    RankingRow, Submission, MAX_SCORE, MIN_SCORE, SCORE_STEP,
};
use crate::session::Identity;
use ratatui::widgets::TableState;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Score a slider shows before the judge touches it
pub const DEFAULT_SCORE: f64 = 5.0;

const FLASH_SECS: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Ranking,
    Judge,
    Reports,
}

impl Route {
    pub const ALL: [Route; 3] = [Route::Ranking, Route::Judge, Route::Reports];

    pub fn title(self) -> &'static str {
        match self {
            Route::Ranking => "Ranking",
            Route::Judge => "Judge",
            Route::Reports => "Reports",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Route::Ranking => 0,
            Route::Judge => 1,
            Route::Reports => 2,
        }
    }

    fn next(self) -> Route {
        Route::ALL[(self.index() + 1) % Route::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Help,
    CommentInput,
}

/// In-progress evaluation of one project
#[derive(Debug, Clone, PartialEq)]
pub struct RatingForm {
    pub project: Project,
    pub criteria: Vec<Criterion>,
    /// criterion id -> score; absent until the judge sets it
    pub scores: HashMap<String, f64>,
    pub comment: String,
    pub selected: usize,
}

impl RatingForm {
    /// Open the form pre-filled with the judge's saved scores and comment
    pub fn open(snapshot: &Snapshot, judge_id: &str, project: &Project) -> Self {
        let scores = snapshot
            .ratings_by(judge_id, &project.id)
            .into_iter()
            .filter(|r| snapshot.criteria.iter().any(|c| c.id == r.criterion_id))
            .map(|r| (r.criterion_id.clone(), r.score))
            .collect();
        let comment = snapshot
            .comment_by(judge_id, &project.id)
            .map(|c| c.text.clone())
            .unwrap_or_default();

        Self {
            project: project.clone(),
            criteria: snapshot.criteria.clone(),
            scores,
            comment,
            selected: 0,
        }
    }

    pub fn score(&self, criterion_id: &str) -> Option<f64> {
        self.scores.get(criterion_id).copied()
    }

    pub fn selected_criterion(&self) -> Option<&Criterion> {
        self.criteria.get(self.selected)
    }

    /// Move the selected score by `delta`, starting from the slider default
    pub fn adjust(&mut self, delta: f64) {
        let Some(id) = self.selected_criterion().map(|c| c.id.clone()) else {
            return;
        };
        let current = self.score(&id).unwrap_or(DEFAULT_SCORE);
        let next = ((current + delta) / SCORE_STEP).round() * SCORE_STEP;
        self.scores.insert(id, next.clamp(MIN_SCORE, MAX_SCORE));
    }

    /// Accept the displayed value for the selected criterion
    pub fn set_current(&mut self) {
        if let Some(id) = self.selected_criterion().map(|c| c.id.clone()) {
            self.scores.entry(id).or_insert(DEFAULT_SCORE);
        }
    }

    pub fn next_criterion(&mut self) {
        if !self.criteria.is_empty() {
            self.selected = (self.selected + 1) % self.criteria.len();
        }
    }

    pub fn previous_criterion(&mut self) {
        if !self.criteria.is_empty() {
            self.selected = (self.selected + self.criteria.len() - 1) % self.criteria.len();
        }
    }

    pub fn submission(&self, judge_id: &str) -> Submission {
        Submission {
            project_id: self.project.id.clone(),
            judge_id: judge_id.to_string(),
            scores: self.scores.clone(),
            comment: self.comment.clone(),
        }
    }

    /// Every criterion scored and a non-blank comment
    pub fn can_submit(&self) -> bool {
        self.criteria.iter().all(|c| self.scores.contains_key(&c.id)) && !self.comment.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JudgeScreen {
    List,
    Form(RatingForm),
}

/// Everything the user or the event loop can do to the app
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Quit,
    NextRoute,
    SelectRoute(Route),
    Up,
    Down,
    Open,
    Back,
    Refresh,
    AutoRefresh,
    ShowHelp,
    DismissHelp,
    AdjustScore(f64),
    SetScore,
    StartComment,
    CommentChar(char),
    CommentBackspace,
    FinishComment,
    Submit,
    Tick,
    Loaded(Snapshot),
    LoadFailed(String),
    Saved,
    SaveFailed(String),
}

/// Side effects the event loop runs on behalf of the app
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Refresh { manual: bool },
    Submit(Submission),
}

pub struct App {
    pub route: Route,
    pub input_mode: InputMode,
    pub identity: Option<Identity>,
    pub snapshot: Option<Snapshot>,
    pub ranking: Vec<RankingRow>,
    pub reports: Vec<ProjectReport>,
    /// The ranking on screen is older than the last refresh attempt
    pub stale: bool,
    pub ranking_state: TableState,
    pub judge_state: TableState,
    pub report_state: TableState,
    pub judge_screen: JudgeScreen,
    pub flash_message: Option<(String, Instant)>,
    pub last_refresh: Instant,
    pub last_interaction: Instant,
    pub refresh_interval: Duration,
    pub backend_label: String,
    pub is_loading: bool,
    pub is_saving: bool,
    pub spinner_frame: usize,
    pub should_quit: bool,
}

impl App {
    /// Create an app with no data yet, in loading state
    pub fn new_loading(
        identity: Option<Identity>,
        route: Route,
        refresh_interval: Duration,
        backend_label: String,
    ) -> Self {
        let mut app = Self {
            route: Route::Ranking,
            input_mode: InputMode::Normal,
            identity,
            snapshot: None,
            ranking: Vec::new(),
            reports: Vec::new(),
            stale: false,
            ranking_state: TableState::default(),
            judge_state: TableState::default(),
            report_state: TableState::default(),
            judge_screen: JudgeScreen::List,
            flash_message: None,
            last_refresh: Instant::now(),
            last_interaction: Instant::now(),
            refresh_interval,
            backend_label,
            is_loading: true,
            is_saving: false,
            spinner_frame: 0,
            should_quit: false,
        };
        app.dispatch(Action::SelectRoute(route));
        app
    }

    /// Show a snapshot from the on-disk cache until the first fetch lands
    pub fn with_cached_snapshot(mut self, snapshot: Snapshot) -> Self {
        self.apply_snapshot(snapshot);
        self.stale = true;
        self
    }

    pub fn judge_id(&self) -> Option<&str> {
        self.identity.as_ref().and_then(|i| i.judge_id())
    }

    /// Progress of the logged-in judge on one project
    pub fn progress_for(&self, project_id: &str) -> Option<JudgeProgress> {
        let snapshot = self.snapshot.as_ref()?;
        let judge_id = self.judge_id()?;
        Some(judge_progress(
            judge_id,
            project_id,
            &snapshot.criteria,
            &snapshot.ratings,
            &snapshot.comments,
        ))
    }

    /// (completed, total) projects for the logged-in judge
    pub fn judge_totals(&self) -> Option<(usize, usize)> {
        let snapshot = self.snapshot.as_ref()?;
        let judge_id = self.judge_id()?;
        let done = completed_count(
            judge_id,
            &snapshot.projects,
            &snapshot.criteria,
            &snapshot.ratings,
            &snapshot.comments,
        );
        Some((done, snapshot.projects.len()))
    }

    pub fn projects(&self) -> &[Project] {
        self.snapshot.as_ref().map(|s| s.projects.as_slice()).unwrap_or(&[])
    }

    pub fn criteria(&self) -> &[Criterion] {
        self.snapshot.as_ref().map(|s| s.criteria.as_slice()).unwrap_or(&[])
    }

    pub fn selected_report(&self) -> Option<&ProjectReport> {
        self.report_state.selected().and_then(|i| self.reports.get(i))
    }

    pub fn show_flash(&mut self, msg: String) {
        self.flash_message = Some((msg, Instant::now()));
    }

    pub fn update_flash(&mut self) {
        if let Some((_, timestamp)) = self.flash_message {
            if timestamp.elapsed().as_secs() >= FLASH_SECS {
                self.flash_message = None;
            }
        }
    }

    /// Advance the loading spinner animation frame
    pub fn advance_spinner(&mut self) {
        self.spinner_frame = self.spinner_frame.wrapping_add(1);
    }

    /// Apply an action and return the side effect to run, if any
    pub fn dispatch(&mut self, action: Action) -> Option<Command> {
        match action {
            Action::Quit => {
                self.should_quit = true;
                None
            }
            Action::NextRoute => {
                let mut next = self.route.next();
                if next == Route::Judge && self.judge_id().is_none() {
                    next = next.next();
                }
                self.route = next;
                None
            }
            Action::SelectRoute(route) => {
                if route == Route::Judge && self.judge_id().is_none() {
                    self.show_flash("Log in as a judge to evaluate (challenge-hub login)".to_string());
                } else {
                    self.route = route;
                }
                None
            }
            Action::Up => {
                self.move_selection(false);
                None
            }
            Action::Down => {
                self.move_selection(true);
                None
            }
            Action::Open => {
                self.open_selected_project();
                None
            }
            Action::Back => {
                if self.route == Route::Judge {
                    self.judge_screen = JudgeScreen::List;
                }
                None
            }
            Action::Refresh => {
                self.show_flash("Refreshing...".to_string());
                Some(Command::Refresh { manual: true })
            }
            Action::AutoRefresh => Some(Command::Refresh { manual: false }),
            Action::ShowHelp => {
                self.input_mode = InputMode::Help;
                None
            }
            Action::DismissHelp => {
                self.input_mode = InputMode::Normal;
                None
            }
            Action::AdjustScore(delta) => {
                if let JudgeScreen::Form(form) = &mut self.judge_screen {
                    form.adjust(delta);
                }
                None
            }
            Action::SetScore => {
                if let JudgeScreen::Form(form) = &mut self.judge_screen {
                    form.set_current();
                }
                None
            }
            Action::StartComment => {
                if matches!(self.judge_screen, JudgeScreen::Form(_)) && self.route == Route::Judge {
                    self.input_mode = InputMode::CommentInput;
                }
                None
            }
            Action::CommentChar(c) => {
                if let JudgeScreen::Form(form) = &mut self.judge_screen {
                    form.comment.push(c);
                }
                None
            }
            Action::CommentBackspace => {
                if let JudgeScreen::Form(form) = &mut self.judge_screen {
                    form.comment.pop();
                }
                None
            }
            Action::FinishComment => {
                self.input_mode = InputMode::Normal;
                None
            }
            Action::Submit => self.submit(),
            Action::Tick => {
                self.update_flash();
                self.advance_spinner();
                None
            }
            Action::Loaded(snapshot) => {
                self.apply_snapshot(snapshot);
                self.stale = false;
                self.is_loading = false;
                self.last_refresh = Instant::now();
                None
            }
            Action::LoadFailed(msg) => {
                self.is_loading = false;
                if self.snapshot.is_some() {
                    self.stale = true;
                    self.show_flash(format!("Refresh failed: {} (showing last ranking)", msg));
                } else {
                    self.show_flash(format!("Refresh failed: {}", msg));
                }
                None
            }
            Action::Saved => {
                self.is_saving = false;
                self.show_flash("Evaluation saved".to_string());
                Some(Command::Refresh { manual: true })
            }
            Action::SaveFailed(msg) => {
                self.is_saving = false;
                self.show_flash(format!("Error saving evaluation: {}. Try again", msg));
                None
            }
        }
    }

    fn submit(&mut self) -> Option<Command> {
        if self.is_saving {
            return None;
        }
        let judge_id = self.judge_id()?.to_string();
        let JudgeScreen::Form(form) = &self.judge_screen else {
            return None;
        };

        let submission = form.submission(&judge_id);
        if let Err(errors) = validate_submission(&submission, &form.criteria) {
            self.show_flash(format!("Cannot submit: {}", errors.join(", ")));
            return None;
        }

        self.is_saving = true;
        Some(Command::Submit(submission))
    }

    fn open_selected_project(&mut self) {
        if self.route != Route::Judge || !matches!(self.judge_screen, JudgeScreen::List) {
            return;
        }
        let (Some(snapshot), Some(judge_id)) = (self.snapshot.as_ref(), self.judge_id()) else {
            return;
        };
        let Some(project) = self.judge_state.selected().and_then(|i| snapshot.projects.get(i)) else {
            return;
        };
        let form = RatingForm::open(snapshot, judge_id, project);
        self.judge_screen = JudgeScreen::Form(form);
    }

    fn move_selection(&mut self, down: bool) {
        if let (Route::Judge, JudgeScreen::Form(form)) = (self.route, &mut self.judge_screen) {
            if down {
                form.next_criterion();
            } else {
                form.previous_criterion();
            }
            return;
        }

        let len = match self.route {
            Route::Ranking => self.ranking.len(),
            Route::Judge => self.projects().len(),
            Route::Reports => self.reports.len(),
        };
        let state = match self.route {
            Route::Ranking => &mut self.ranking_state,
            Route::Judge => &mut self.judge_state,
            Route::Reports => &mut self.report_state,
        };
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) if down => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        state.select(Some(i));
    }

    /// Replace the snapshot and recompute everything derived from it.
    /// An open rating form keeps the judge's unsaved edits.
    fn apply_snapshot(&mut self, snapshot: Snapshot) {
        self.ranking = rank_snapshot(&snapshot);
        self.reports = build_reports(
            &snapshot.projects,
            &snapshot.criteria,
            &snapshot.judges,
            &snapshot.ratings,
            &snapshot.comments,
        );

        clamp_selection(&mut self.ranking_state, self.ranking.len());
        clamp_selection(&mut self.judge_state, snapshot.projects.len());
        clamp_selection(&mut self.report_state, self.reports.len());

        let form_orphaned = match &self.judge_screen {
            JudgeScreen::Form(form) => !snapshot.projects.iter().any(|p| p.id == form.project.id),
            JudgeScreen::List => false,
        };
        if form_orphaned {
            self.judge_screen = JudgeScreen::List;
            self.show_flash("Project was removed".to_string());
        }

        self.snapshot = Some(snapshot);
    }
}

/// Preserve selection if possible, clamped to the new list length
fn clamp_selection(state: &mut TableState, len: usize) {
    if len == 0 {
        state.select(None);
    } else if let Some(selected) = state.selected() {
        if selected >= len {
            state.select(Some(len - 1));
        }
    } else {
        state.select(Some(0));
    }
}
