use std::fmt;

use chrono::Local;
use progress_core::model::{
    Identity, LessonIndex, NotificationPreferences, SyncSettings, SyncSettingsDraft,
};
use progress_core::reminders::{ReminderPlan, ReminderTime};
use services::{AppServices, AppServicesConfig, Clock, CompletionOutcome, ProgressSnapshot};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const DEFAULT_DB_URL: &str = "sqlite://progress.sqlite3";
const DEFAULT_TOTAL_LESSONS: u32 = 30;
const DEFAULT_LOG_FILTER: &str = "services=info,app=info";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidLesson { raw: String },
    InvalidToggle { flag: &'static str, raw: String },
    InvalidNumber { name: &'static str, raw: String },
    InvalidDbUrl { raw: String },
    InvalidUser { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidLesson { raw } => write!(f, "invalid lesson index: {raw}"),
            ArgsError::InvalidToggle { flag, raw } => {
                write!(f, "invalid {flag} value: {raw} (expected on or off)")
            }
            ArgsError::InvalidNumber { name, raw } => write!(f, "invalid {name} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidUser { raw } => write!(f, "invalid --user value: {raw:?}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_toggle(flag: &'static str, raw: String) -> Result<bool, ArgsError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        _ => Err(ArgsError::InvalidToggle { flag, raw }),
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [status]            [options]");
    eprintln!("  cargo run -p app -- complete <lesson>   [options]");
    eprintln!("  cargo run -p app -- reset               [options]");
    eprintln!("  cargo run -p app -- prefs [--daily on|off] [--streak on|off] [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>   default {DEFAULT_DB_URL}");
    eprintln!("  --user <id>         act as a signed-in user (syncs when configured)");
    eprintln!("  --guest             act as a fresh guest (never syncs)");
    eprintln!("  --offline           skip the remote service");
    eprintln!("  --total <n>         lessons in the curriculum (default {DEFAULT_TOTAL_LESSONS})");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PROGRESS_DB_URL, PROGRESS_USER_ID, PROGRESS_TOTAL_LESSONS,");
    eprintln!("  PROGRESS_SYNC_ENDPOINT, PROGRESS_SYNC_API_KEY, PROGRESS_REMINDER_HOUR");
    eprintln!("  RUST_LOG (default {DEFAULT_LOG_FILTER})");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Status,
    Complete(LessonIndex),
    Reset,
    Prefs {
        daily: Option<bool>,
        streak: Option<bool>,
    },
}

/// Values taken from the environment before flags are applied.
#[derive(Debug, Clone, Default)]
struct Defaults {
    db_url: Option<String>,
    user_id: Option<String>,
    total_lessons: Option<String>,
    reminder_hour: Option<String>,
}

impl Defaults {
    fn from_env() -> Self {
        Self {
            db_url: std::env::var("PROGRESS_DB_URL").ok(),
            user_id: std::env::var("PROGRESS_USER_ID").ok(),
            total_lessons: std::env::var("PROGRESS_TOTAL_LESSONS").ok(),
            reminder_hour: std::env::var("PROGRESS_REMINDER_HOUR").ok(),
        }
    }
}

#[derive(Debug)]
struct Args {
    command: Command,
    db_url: String,
    identity: Identity,
    offline: bool,
    total_lessons: u32,
    reminder_hour: Option<u32>,
}

impl Args {
    fn parse(argv: Vec<String>, defaults: Defaults) -> Result<Self, ArgsError> {
        let mut args = argv.into_iter().peekable();

        let first = args.peek().cloned();
        let mut command = match first.as_deref() {
            Some("status") => {
                args.next();
                Command::Status
            }
            Some("complete") => {
                args.next();
                let raw = require_value(&mut args, "complete")?;
                let lesson = raw
                    .parse::<LessonIndex>()
                    .map_err(|_| ArgsError::InvalidLesson { raw: raw.clone() })?;
                Command::Complete(lesson)
            }
            Some("reset") => {
                args.next();
                Command::Reset
            }
            Some("prefs") => {
                args.next();
                Command::Prefs {
                    daily: None,
                    streak: None,
                }
            }
            Some(first) if !first.starts_with("--") => {
                return Err(ArgsError::UnknownArg(first.to_string()));
            }
            _ => Command::Status,
        };

        let mut db_url = defaults
            .db_url
            .map_or_else(|| DEFAULT_DB_URL.to_string(), normalize_sqlite_url);
        let mut identity = match defaults.user_id {
            Some(id) if !id.trim().is_empty() => Identity::user(id.trim()),
            _ => Identity::guest(),
        };
        let mut total_lessons = match defaults.total_lessons {
            Some(raw) => raw.trim().parse::<u32>().map_err(|_| ArgsError::InvalidNumber {
                name: "PROGRESS_TOTAL_LESSONS",
                raw,
            })?,
            None => DEFAULT_TOTAL_LESSONS,
        };
        let reminder_hour = defaults
            .reminder_hour
            .map(|raw| {
                raw.trim().parse::<u32>().map_err(|_| ArgsError::InvalidNumber {
                    name: "PROGRESS_REMINDER_HOUR",
                    raw,
                })
            })
            .transpose()?;
        let mut offline = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--user" => {
                    let value = require_value(&mut args, "--user")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidUser { raw: value });
                    }
                    identity = Identity::user(value.trim());
                }
                "--guest" => identity = Identity::guest(),
                "--offline" => offline = true,
                "--total" => {
                    let value = require_value(&mut args, "--total")?;
                    total_lessons = value.trim().parse().map_err(|_| ArgsError::InvalidNumber {
                        name: "--total",
                        raw: value.clone(),
                    })?;
                }
                "--daily" | "--streak" => {
                    let Command::Prefs { daily, streak } = &mut command else {
                        return Err(ArgsError::UnknownArg(arg));
                    };
                    if arg == "--daily" {
                        let value = require_value(&mut args, "--daily")?;
                        *daily = Some(parse_toggle("--daily", value)?);
                    } else {
                        let value = require_value(&mut args, "--streak")?;
                        *streak = Some(parse_toggle("--streak", value)?);
                    }
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            command,
            db_url,
            identity,
            offline,
            total_lessons,
            reminder_hour,
        })
    }
}

/// Sync settings from the environment, plus the validated reminder time.
fn load_settings(
    reminder_hour: Option<u32>,
) -> Result<(SyncSettings, ReminderTime), progress_core::Error> {
    let sync = SyncSettingsDraft {
        endpoint: std::env::var("PROGRESS_SYNC_ENDPOINT").ok(),
        api_key: std::env::var("PROGRESS_SYNC_API_KEY").ok(),
    }
    .validate()?;

    let reminder_time = match reminder_hour {
        Some(hour) => ReminderTime::new(hour)?,
        None => ReminderTime::default(),
    };

    Ok((sync, reminder_time))
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ─── Output ────────────────────────────────────────────────────────────────

fn print_status(snapshot: &ProgressSnapshot, services: &AppServices, total_lessons: u32) {
    let summary = services.progress().summary(total_lessons);
    let identity = snapshot
        .identity
        .as_ref()
        .map_or_else(|| "signed out".to_string(), |id| id.id().to_string());

    println!("user:        {identity}");
    println!(
        "progress:    {}/{} lessons ({}%)",
        summary.completed, summary.total, summary.percent
    );
    if summary.is_finished {
        println!("next lesson: all lessons completed");
    } else {
        println!("next lesson: {}", summary.next_lesson);
    }
    println!("streak:      {} day(s)", snapshot.streak.current);
    match snapshot.streak.last_study_at {
        Some(at) => println!(
            "last study:  {}",
            at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        ),
        None => println!("last study:  never"),
    }
    println!(
        "reminders:   daily {}, streak {}",
        on_off(snapshot.preferences.daily_reminder),
        on_off(snapshot.preferences.streak_reminder)
    );
    println!(
        "sync:        {}",
        if services.sync_enabled() { "configured" } else { "local only" }
    );
}

fn print_plans(plans: &[ReminderPlan]) {
    if plans.is_empty() {
        println!("no reminders scheduled");
        return;
    }
    for plan in plans {
        println!(
            "scheduled \"{}\" at {}{}",
            plan.kind.title(),
            plan.fire_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            if plan.repeat.is_some() { " (daily)" } else { "" }
        );
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    if matches!(argv.first().map(String::as_str), Some("--help" | "-h")) {
        print_usage();
        return Ok(());
    }

    let parsed = Args::parse(argv, Defaults::from_env()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    let (sync, reminder_time) = load_settings(parsed.reminder_hour)?;

    prepare_sqlite_file(&parsed.db_url)?;
    let services = AppServices::new_sqlite(
        &parsed.db_url,
        Clock::default_clock(),
        AppServicesConfig {
            sync,
            reminder_time,
            lesson_count: Some(parsed.total_lessons),
            force_offline: parsed.offline,
            ..AppServicesConfig::default()
        },
    )
    .await?;
    debug!(db = %parsed.db_url, user = %parsed.identity.id(), command = ?parsed.command, "starting");

    let progress = services.progress();
    let identity = Some(&parsed.identity);
    let mut snapshot = progress.load(identity).await?;

    match parsed.command {
        Command::Status => {}
        Command::Complete(lesson) => {
            let outcome = progress.record_completion(identity, Some(lesson)).await?;
            debug!(?outcome, "completion handled");
            if outcome == CompletionOutcome::OutOfRange {
                eprintln!(
                    "lesson {lesson} is outside the curriculum of {} lessons",
                    parsed.total_lessons
                );
            }
            snapshot = progress.snapshot();
        }
        Command::Reset => {
            progress.clear_progress(identity).await?;
            snapshot = progress.snapshot();
        }
        Command::Prefs { daily, streak } => {
            let current = snapshot.preferences;
            let preferences = NotificationPreferences::new(
                daily.unwrap_or(current.daily_reminder),
                streak.unwrap_or(current.streak_reminder),
            );
            if preferences.any_enabled()
                && !progress.notification_permission().await?
                && !progress.permission_requested().await?
            {
                progress.request_notification_permission().await?;
            }
            let plans = progress.update_preferences(identity, preferences).await?;
            print_plans(&plans);
            snapshot = progress.snapshot();
        }
    }

    print_status(&snapshot, &services, parsed.total_lessons);
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn defaults_to_status_as_guest() {
        let args = Args::parse(Vec::new(), Defaults::default()).unwrap();
        assert_eq!(args.command, Command::Status);
        assert!(args.identity.is_guest());
        assert_eq!(args.db_url, DEFAULT_DB_URL);
        assert_eq!(args.total_lessons, DEFAULT_TOTAL_LESSONS);
        assert!(!args.offline);
    }

    #[test]
    fn parses_complete_with_flags() {
        let args = Args::parse(
            argv(&["complete", "4", "--user", "u-1", "--offline", "--db", "sqlite::memory:"]),
            Defaults::default(),
        )
        .unwrap();
        assert_eq!(args.command, Command::Complete(LessonIndex::new(4)));
        assert_eq!(args.identity, Identity::user("u-1"));
        assert!(args.offline);
        assert_eq!(args.db_url, "sqlite::memory:");
    }

    #[test]
    fn env_user_is_overridden_by_guest_flag() {
        let defaults = Defaults {
            user_id: Some("env-user".into()),
            ..Defaults::default()
        };
        let args = Args::parse(argv(&["status"]), defaults.clone()).unwrap();
        assert_eq!(args.identity, Identity::user("env-user"));

        let args = Args::parse(argv(&["--guest"]), defaults).unwrap();
        assert!(args.identity.is_guest());
    }

    #[test]
    fn prefs_toggles_are_parsed() {
        let args = Args::parse(
            argv(&["prefs", "--daily", "on", "--streak", "off"]),
            Defaults::default(),
        )
        .unwrap();
        assert_eq!(
            args.command,
            Command::Prefs {
                daily: Some(true),
                streak: Some(false)
            }
        );
    }

    #[test]
    fn bad_reminder_hour_reports_raw_value() {
        let defaults = Defaults {
            reminder_hour: Some("abc".into()),
            ..Defaults::default()
        };
        match Args::parse(Vec::new(), defaults) {
            Err(err @ ArgsError::InvalidNumber { .. }) => {
                assert_eq!(err.to_string(), "invalid PROGRESS_REMINDER_HOUR value: abc");
            }
            other => panic!("unexpected result {other:?}"),
        }

        let defaults = Defaults {
            reminder_hour: Some(" 7 ".into()),
            ..Defaults::default()
        };
        let args = Args::parse(Vec::new(), defaults).unwrap();
        assert_eq!(args.reminder_hour, Some(7));
        assert!(load_settings(Some(24)).is_err());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            Args::parse(argv(&["complete", "x"]), Defaults::default()),
            Err(ArgsError::InvalidLesson { .. })
        ));
        assert!(matches!(
            Args::parse(argv(&["status", "--daily", "on"]), Defaults::default()),
            Err(ArgsError::UnknownArg(_))
        ));
        assert!(matches!(
            Args::parse(argv(&["prefs", "--daily", "maybe"]), Defaults::default()),
            Err(ArgsError::InvalidToggle { .. })
        ));
        assert!(matches!(
            Args::parse(argv(&["bogus"]), Defaults::default()),
            Err(ArgsError::UnknownArg(_))
        ));
        assert!(matches!(
            Args::parse(argv(&["complete"]), Defaults::default()),
            Err(ArgsError::MissingValue { .. })
        ));
    }
}
