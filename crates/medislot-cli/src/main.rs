use std::io::IsTerminal;

use chrono::{Duration, NaiveDateTime};
use clap::Parser;
use dialoguer::{Input, Password};

use medislot_core::{
    model, Config, ConfigError, CoreError, Engine, EngineEvent, ProviderClient, RetryPolicy,
    RunOptions, SearchCriteria, TimeRange,
};

mod table;

#[derive(Parser)]
#[command(
    name = "medislot",
    version,
    about = "Search and book free visit slots at the provider portal"
)]
struct Cli {
    /// Desired specialty; repeat the positional for several
    #[arg(required = true, value_name = "SPECIALTY")]
    specialties: Vec<String>,

    /// Region name (account home region when omitted)
    #[arg(short, long)]
    region: Option<String>,

    /// Login; falls back to MEDISLOT_USERNAME, then the config file,
    /// then an interactive prompt
    #[arg(short, long)]
    username: Option<String>,

    /// Password; falls back to MEDISLOT_PASSWORD, then a hidden prompt
    #[arg(short, long)]
    password: Option<String>,

    /// Desired doctor, repeatable
    #[arg(short, long = "doctor")]
    doctors: Vec<String>,

    /// Desired clinic, repeatable
    #[arg(short, long = "clinic")]
    clinics: Vec<String>,

    /// Search window start
    #[arg(short = 'A', long, default_value = "2000-01-01", value_parser = parse_after)]
    after: NaiveDateTime,

    /// Search window end
    #[arg(short = 'B', long, default_value = "2100-01-01", value_parser = parse_before)]
    before: NaiveDateTime,

    /// Minimum lead time from now till the visit, e.g. 1h, 2d, 1d2h30m
    #[arg(short, long, default_value = "1h", value_parser = parse_margin)]
    margin: Duration,

    /// Book the first available visit automatically
    #[arg(short, long)]
    autobook: bool,

    /// Allow rescheduling an existing colliding appointment when autobooking
    #[arg(short = 'R', long)]
    reschedule: bool,

    /// Retry until a visit is found
    #[arg(short, long)]
    keep_going: bool,

    /// Seconds between retries; negative for a random sleep up to that
    /// magnitude. Config file default when omitted.
    #[arg(short, long, allow_negative_numbers = true)]
    interval: Option<i64>,

    /// Acceptable visit time of day, e.g. 08:00-13:30
    #[arg(long, value_parser = parse_time_range)]
    time: Option<TimeRange>,

    /// Include remote/phone consultations in the results
    #[arg(long)]
    telemedicine: bool,

    /// Search diagnostic procedures instead of consultations
    #[arg(long)]
    diagnostic: bool,

    /// Provider deployment URL (config file default when omitted)
    #[arg(long)]
    base_url: Option<String>,
}

fn parse_after(s: &str) -> Result<NaiveDateTime, String> {
    model::parse_datetime(s, false).ok_or_else(|| format!("unrecognized date-time: {s}"))
}

fn parse_before(s: &str) -> Result<NaiveDateTime, String> {
    model::parse_datetime(s, true).ok_or_else(|| format!("unrecognized date-time: {s}"))
}

fn parse_margin(s: &str) -> Result<Duration, String> {
    model::parse_margin(s).ok_or_else(|| format!("unrecognized duration: {s} (try 1h, 2d, 30m)"))
}

fn parse_time_range(s: &str) -> Result<TimeRange, String> {
    TimeRange::parse(s).ok_or_else(|| format!("unrecognized time range: {s} (try 08:00-13:30)"))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let code = tokio::select! {
        result = run(cli) => match result {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("error: {e}");
                exit_code(&e)
            }
        },
        _ = tokio::signal::ctrl_c() => {
            eprintln!("aborted");
            130
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<(), CoreError> {
    let config = Config::load_or_default()?;

    let username = match stored_username(
        cli.username,
        std::env::var("MEDISLOT_USERNAME").ok(),
        &config,
    ) {
        Some(username) => username,
        None => prompt_username()?,
    };
    let password = match stored_password(cli.password, std::env::var("MEDISLOT_PASSWORD").ok()) {
        Some(password) => password,
        None => prompt_password()?,
    };

    let options = RunOptions {
        criteria: SearchCriteria {
            region: cli.region.or_else(|| config.region.clone()),
            specialties: cli.specialties,
            doctors: cli.doctors,
            clinics: cli.clinics,
            after: cli.after,
            before: cli.before,
            margin: cli.margin,
            time_of_day: cli.time,
            include_remote: cli.telemedicine,
            diagnostic: cli.diagnostic,
        },
        autobook: cli.autobook,
        allow_reschedule: cli.reschedule,
        retry: RetryPolicy {
            keep_going: cli.keep_going,
            interval_secs: cli.interval.unwrap_or(config.retry_interval_secs),
        },
    };

    let provider = ProviderClient::new(cli.base_url.unwrap_or_else(|| config.base_url.clone()));
    let mut engine = Engine::new(provider);
    let report = engine
        .run(&username, &password, &options, print_event)
        .await?;

    println!("{}", table::render(&report.visits));
    Ok(())
}

/// Resolution order: flag, environment, config file.
fn stored_username(flag: Option<String>, env: Option<String>, config: &Config) -> Option<String> {
    flag.or(env).or_else(|| config.username.clone())
}

/// Resolution order: flag, environment. Never the config file.
fn stored_password(flag: Option<String>, env: Option<String>) -> Option<String> {
    flag.or(env)
}

/// Last resort for a missing credential: ask on the terminal. Refused
/// outright when stdin is not interactive, so scripted runs fail fast
/// instead of hanging on a prompt.
fn prompt_username() -> Result<String, CoreError> {
    if !std::io::stdin().is_terminal() {
        return Err(ConfigError::MissingCredentials.into());
    }
    Input::new()
        .with_prompt("Username")
        .interact_text()
        .map_err(|_| ConfigError::MissingCredentials.into())
}

fn prompt_password() -> Result<String, CoreError> {
    if !std::io::stdin().is_terminal() {
        return Err(ConfigError::MissingCredentials.into());
    }
    Password::new()
        .with_prompt("Password")
        .interact()
        .map_err(|_| ConfigError::MissingCredentials.into())
}

fn print_event(event: EngineEvent) {
    match event {
        EngineEvent::LoggedIn => eprintln!("logged in"),
        EngineEvent::Resolved { searches } => {
            eprintln!("searching {searches} specialty/doctor combination(s)")
        }
        EngineEvent::EmptyAttempt { attempt, sleep } => eprintln!(
            "no visits found on attempt {attempt}, waiting {:.1}s...",
            sleep.as_secs_f64()
        ),
        EngineEvent::Found { unique } => eprintln!("found {unique} visit(s)"),
        EngineEvent::Booked(report) => match report {
            medislot_core::BookingReport::Booked => eprintln!("autobooking successful"),
            medislot_core::BookingReport::Rescheduled { cancelled } => eprintln!(
                "autobooking successful, cancelled {} with {} at {}",
                cancelled.specialty, cancelled.doctor, cancelled.date
            ),
        },
    }
}

/// One distinct status per failure class, for scripting around the tool.
fn exit_code(error: &CoreError) -> i32 {
    use medislot_core::BookingError;
    match error {
        CoreError::Auth(_) => 2,
        CoreError::Resolution(_) => 3,
        CoreError::Transport(_) => 4,
        CoreError::Exhausted => 5,
        CoreError::Booking(BookingError::Conflict { .. }) => 6,
        CoreError::Booking(BookingError::Rejected(_)) => 6,
        CoreError::Booking(BookingError::AmbiguousOutcome) => 7,
        CoreError::Config(_) => 8,
        CoreError::WindowClosed { .. } => 9,
    }
}
