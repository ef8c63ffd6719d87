use challenge_hub::admin::{self, RecordKind};
use challenge_hub::config::{self, Config};
use challenge_hub::credentials;
use challenge_hub::fetch::{self, Loaded};
use challenge_hub::output;
use challenge_hub::provider::cache::{self, CacheConfig};
use challenge_hub::provider::{self, Backend, DataProvider, ProviderError};
use challenge_hub::scoring::build_reports;
use challenge_hub::session::{self, Session};
use challenge_hub::stderr_buffer::BufferedStderr;
use challenge_hub::tui::{self, App, Route, SnapshotCache, ThemeColors};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::{Duration, Instant};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_AUTH: i32 = 1;
const EXIT_NETWORK: i32 = 2;
const EXIT_CONFIG: i32 = 4;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Live ranking of all projects (default if no subcommand)
    Ranking {
        /// Print the ranking once and exit
        #[arg(long)]
        once: bool,

        /// Print tab-separated rows and exit
        #[arg(long)]
        tsv: bool,

        /// Auto-refresh period, e.g. "30s" or "2m"
        #[arg(long, value_parser = humantime::parse_duration)]
        interval: Option<Duration>,
    },
    /// Score projects (needs a judge session)
    Judge,
    /// Print per-project reports
    Report {
        /// Only the project with this name
        #[arg(long)]
        project: Option<String>,
    },
    /// Log in as a judge or as the admin
    Login {
        /// Judge name (prompted if omitted)
        name: Option<String>,
    },
    /// End the current session
    Logout,
    /// Show who is logged in
    Whoami,
    /// Manage judges, projects and criteria (needs the admin session)
    Admin {
        #[command(subcommand)]
        action: AdminCommand,
    },
    /// Create a config file interactively
    Init,
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    /// List judges, projects and criteria with their ids
    List,
    AddJudge {
        name: String,
        /// Judge password (prompted if omitted)
        #[arg(long)]
        password: Option<String>,
    },
    AddProject {
        name: String,
    },
    AddCriterion {
        name: String,
    },
    /// Delete a record and every rating and comment that points at it
    Remove {
        kind: RecordKind,
        id: String,
    },
    /// Delete every rating and comment
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
    /// Load sample judges, projects and criteria
    Seed,
}

#[derive(Parser, Debug)]
#[command(name = "challenge-hub")]
#[command(about = "Judge a competition and follow the live ranking", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/challenge-hub/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Bypass the snapshot cache
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "warn" };

    let filter = tracing_subscriber::EnvFilter::try_from_env("CHALLENGE_HUB_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(BufferedStderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

/// Exit code for a failed backend call
fn provider_exit_code(error: &ProviderError) -> i32 {
    match error {
        ProviderError::Unauthorized(_) => EXIT_AUTH,
        ProviderError::NotFound { .. } | ProviderError::Duplicate { .. } | ProviderError::Invalid(_) => {
            EXIT_CONFIG
        }
        _ => EXIT_NETWORK,
    }
}

fn fail(message: impl std::fmt::Display, code: i32) -> ! {
    eprintln!("{}", message);
    std::process::exit(code);
}

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for rustls 0.23+).
    // An error only means a provider is already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = Cli::parse();
    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("{}", e);
    }

    let command = cli.command.unwrap_or(Commands::Ranking {
        once: false,
        tsv: false,
        interval: None,
    });
    let start_time = Instant::now();
    let config_path = cli.config.map(PathBuf::from);

    if let Commands::Init = command {
        if let Err(e) = config::init::run_init_wizard(config_path) {
            fail(format!("Init failed: {:#}", e), EXIT_CONFIG);
        }
        std::process::exit(EXIT_SUCCESS);
    }

    let config = match config::load_config(config_path) {
        Ok(c) => c,
        Err(e) => fail(format!("Config error: {:#}", e), EXIT_CONFIG),
    };
    if let Err(errors) = config::validate_config(&config) {
        eprintln!("Config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }

    let session_path = session::get_session_path();
    let mut session = match session::load_session(&session_path) {
        Ok(s) => s,
        Err(e) => fail(format!("Session error: {:#}. Run `challenge-hub logout` to reset", e), EXIT_AUTH),
    };

    // Session commands that never touch the backend
    match &command {
        Commands::Logout => {
            let was_logged_in = session.logout();
            if let Err(e) = session::save_session(&session_path, &session) {
                fail(format!("Failed to save session: {:#}", e), EXIT_AUTH);
            }
            println!("{}", if was_logged_in { "Logged out" } else { "Not logged in" });
            std::process::exit(EXIT_SUCCESS);
        }
        Commands::Whoami => match &session.identity {
            Some(identity) => {
                println!("{}", identity);
                std::process::exit(EXIT_SUCCESS);
            }
            None => fail("Not logged in", EXIT_AUTH),
        },
        _ => {}
    }

    let api_key = match credentials::resolve_api_key(&config.backend) {
        Ok(k) => k,
        Err(e) => fail(format!("Credential error: {:#}", e), EXIT_AUTH),
    };
    let backend = match provider::create_provider(&config, api_key.as_deref()) {
        Ok(b) => b,
        Err(e) => fail(format!("Backend error: {:#}", e), EXIT_CONFIG),
    };
    tracing::debug!("using backend {}", backend.describe());

    let cache_config = CacheConfig { enabled: !cli.no_cache };
    let cache_path = cache::get_cache_path();
    if cli.no_cache {
        if let Err(e) = cache::clear_cache() {
            tracing::warn!("Failed to clear cache: {}", e);
        }
    }

    match command {
        Commands::Ranking { once, tsv, interval } => {
            if once || tsv {
                print_ranking(&backend, &cache_config, &cache_path, tsv).await;
            } else {
                let interval = interval.unwrap_or(Duration::from_secs(config.auto_refresh_interval));
                if interval.is_zero() {
                    fail("--interval must be greater than 0", EXIT_CONFIG);
                }
                run_live(&backend, &session, Route::Ranking, interval, cache_config, cache_path).await;
            }
        }
        Commands::Judge => {
            if let Err(e) = credentials::require_judge(&session) {
                fail(e, EXIT_AUTH);
            }
            let interval = Duration::from_secs(config.auto_refresh_interval);
            run_live(&backend, &session, Route::Judge, interval, cache_config, cache_path).await;
        }
        Commands::Report { project } => {
            print_reports(&backend, &cache_config, &cache_path, project.as_deref()).await;
        }
        Commands::Login { name } => {
            login(&backend, &config, &mut session, &session_path, name).await;
        }
        Commands::Admin { action } => {
            if let Err(e) = credentials::require_admin(&session) {
                fail(e, EXIT_AUTH);
            }
            run_admin(&backend, action).await;
        }
        Commands::Init | Commands::Logout | Commands::Whoami => {}
    }

    tracing::debug!("done in {:?}", start_time.elapsed());
    std::process::exit(EXIT_SUCCESS);
}

/// Load a snapshot for one-shot output. A stale cached snapshot is still
/// printed, but the process exits with the network code afterwards.
async fn load_for_print(
    backend: &Backend,
    cache_config: &CacheConfig,
    cache_path: &std::path::Path,
) -> (challenge_hub::model::Snapshot, bool) {
    match fetch::fetch_or_cached(backend, &backend.describe(), cache_config, cache_path).await {
        Ok(Loaded::Fresh(snapshot)) => (snapshot, false),
        Ok(Loaded::Stale(snapshot, e)) => {
            eprintln!(
                "Warning: {}. Showing the ranking as of {}",
                e,
                snapshot.fetched_at.format("%Y-%m-%d %H:%M UTC")
            );
            (snapshot, true)
        }
        Err(e) => fail(format!("Failed to load data: {}", e), provider_exit_code(&e)),
    }
}

async fn print_ranking(backend: &Backend, cache_config: &CacheConfig, cache_path: &std::path::Path, tsv: bool) {
    let (snapshot, stale) = load_for_print(backend, cache_config, cache_path).await;
    let rows = fetch::rank_snapshot(&snapshot);

    if tsv {
        print!("{}", output::format_ranking_tsv(&rows, &snapshot.criteria));
    } else {
        let use_colors = output::should_use_colors();
        println!("{}", output::format_ranking_table(&rows, &snapshot.criteria, use_colors));
    }

    if stale {
        std::process::exit(EXIT_NETWORK);
    }
}

async fn print_reports(
    backend: &Backend,
    cache_config: &CacheConfig,
    cache_path: &std::path::Path,
    project: Option<&str>,
) {
    let (snapshot, stale) = load_for_print(backend, cache_config, cache_path).await;
    let mut reports = build_reports(
        &snapshot.projects,
        &snapshot.criteria,
        &snapshot.judges,
        &snapshot.ratings,
        &snapshot.comments,
    );

    if let Some(name) = project {
        reports.retain(|r| r.project.name.eq_ignore_ascii_case(name.trim()));
        if reports.is_empty() {
            fail(format!("No project named '{}'", name), EXIT_CONFIG);
        }
    }

    let use_colors = output::should_use_colors();
    println!("{}", output::format_reports(&reports, chrono::Utc::now(), use_colors));

    if stale {
        std::process::exit(EXIT_NETWORK);
    }
}

async fn run_live(
    backend: &Backend,
    session: &Session,
    route: Route,
    interval: Duration,
    cache_config: CacheConfig,
    cache_path: PathBuf,
) {
    let mut app = App::new_loading(session.identity.clone(), route, interval, backend.describe());
    if cache_config.enabled {
        if let Some(snapshot) = cache::read_cached_snapshot(&cache_path, &backend.describe()) {
            app = app.with_cached_snapshot(snapshot);
        }
    }

    let colors = ThemeColors::for_theme(tui::resolve_theme());
    let cache = SnapshotCache {
        config: cache_config,
        path: cache_path,
    };
    if let Err(e) = tui::run_tui(app, backend.clone(), colors, cache).await {
        fail(format!("TUI error: {:#}", e), EXIT_NETWORK);
    }
}

async fn login(
    backend: &Backend,
    config: &Config,
    session: &mut Session,
    session_path: &std::path::Path,
    name: Option<String>,
) {
    let name = match name {
        Some(n) => n,
        None => match credentials::prompt_for_username() {
            Ok(n) => n,
            Err(e) => fail(format!("Login cancelled: {:#}", e), EXIT_AUTH),
        },
    };
    let password = match credentials::prompt_for_password(&name) {
        Ok(p) => p,
        Err(e) => fail(format!("Login cancelled: {:#}", e), EXIT_AUTH),
    };

    let judges = match backend.list_judges().await {
        Ok(j) => j,
        Err(e) => fail(format!("Failed to load judges: {}", e), provider_exit_code(&e)),
    };

    match credentials::authenticate(&judges, &name, &password, config.admin_password.as_deref()) {
        Ok(identity) => {
            tracing::debug!(admin = identity.is_admin(), "login succeeded");
            let greeting = format!("Logged in as {}", identity);
            session.login(identity);
            if let Err(e) = session::save_session(session_path, session) {
                fail(format!("Failed to save session: {:#}", e), EXIT_AUTH);
            }
            println!("{}", greeting);
        }
        Err(e) => fail(e, EXIT_AUTH),
    }
}

async fn run_admin(backend: &Backend, action: AdminCommand) {
    let result = match action {
        AdminCommand::List => match fetch::fetch_snapshot(backend).await {
            Ok(snapshot) => {
                println!("{}", output::format_catalog(&snapshot, output::should_use_colors()));
                Ok(())
            }
            Err(e) => Err(e),
        },
        AdminCommand::AddJudge { name, password } => {
            let password = match password {
                Some(p) => p,
                None => match credentials::prompt_for_password(&name) {
                    Ok(p) => p,
                    Err(e) => fail(format!("Cancelled: {:#}", e), EXIT_AUTH),
                },
            };
            admin::add_record(backend, RecordKind::Judge, &name, Some(&password))
                .await
                .map(|()| println!("Added judge '{}'", name))
        }
        AdminCommand::AddProject { name } => admin::add_record(backend, RecordKind::Project, &name, None)
            .await
            .map(|()| println!("Added project '{}'", name)),
        AdminCommand::AddCriterion { name } => admin::add_record(backend, RecordKind::Criterion, &name, None)
            .await
            .map(|()| println!("Added criterion '{}'", name)),
        AdminCommand::Remove { kind, id } => admin::remove_record(backend, kind, &id)
            .await
            .map(|()| println!("Removed {} {}", format!("{:?}", kind).to_lowercase(), id)),
        AdminCommand::Reset { yes } => {
            if !yes {
                fail("This deletes every rating and comment. Pass --yes to confirm", EXIT_CONFIG);
            }
            backend
                .reset_evaluations()
                .await
                .map(|()| println!("All ratings and comments deleted"))
        }
        AdminCommand::Seed => admin::seed_sample_data(backend).await.map(|summary| {
            println!(
                "Sample data loaded: {} added, {} already present",
                summary.added, summary.skipped
            )
        }),
    };

    if let Err(e) = result {
        let code = provider_exit_code(&e);
        fail(e, code);
    }
}
