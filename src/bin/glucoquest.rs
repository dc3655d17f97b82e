use std::io::Read;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "glucoquest", about = "Glucose-tracking game progress CLI")]
struct Cli {
    /// Database path (default: ~/.glucoquest/glucoquest.db)
    #[arg(long)]
    db: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current progress record
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add experience points
    Xp {
        /// Points earned
        points: u64,
    },
    /// Record a streak-qualifying activity
    Activity {
        /// Activity date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Link this device's progress to an authenticated account
    Link {
        /// File holding the server's progress record as JSON, or `-` for stdin
        #[arg(value_name = "FILE")]
        server_record: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show past account links
    History {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let db = match &cli.db {
        Some(path) => glucoquest::Database::open_at(path).await?,
        None => glucoquest::Database::open().await?,
    };
    let app = glucoquest::GlucoQuest::new(db);

    match cli.command {
        Commands::Status { json } => {
            let record = app.active_progress().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                print_record(&record);
            }
        }
        Commands::Xp { points } => {
            let gain = app.add_experience(points).await?;
            println!(
                "Experience: {} -> {}",
                gain.old_experience, gain.new_experience
            );
            if gain.leveled_up() {
                println!("Level up! {} -> {}", gain.old_level, gain.new_level);
            }
        }
        Commands::Activity { date } => {
            let date = match date {
                Some(s) => glucoquest::date_util::parse_calendar_date(&s)?,
                None => glucoquest::date_util::today(),
            };
            let (outcome, record) = app.record_activity(date).await?;
            let label = match outcome {
                glucoquest::ActivityOutcome::Started => "Streak started",
                glucoquest::ActivityOutcome::Extended => "Streak extended",
                glucoquest::ActivityOutcome::AlreadyCounted => "Already counted for this day",
                glucoquest::ActivityOutcome::OutOfOrder => "Ignored (earlier than last activity)",
            };
            println!("{label}: {} day(s)", record.streak_length);
        }
        Commands::Link {
            server_record,
            json,
        } => {
            let raw = read_input(&server_record)?;
            let server: glucoquest::ProgressRecord =
                serde_json::from_str(&raw).map_err(glucoquest::Error::from)?;
            let report = app.link(server).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                if report.merged_guest {
                    println!(
                        "Merged guest progress ({} XP) into account ({} XP).",
                        report.guest_experience, report.server_experience
                    );
                } else {
                    println!("No guest progress to merge; using account progress.");
                }
                print_record(&report.record);
            }
        }
        Commands::History { json } => {
            let events = app.link_history().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&events)?);
            } else if events.is_empty() {
                println!("No account links yet.");
            } else {
                for e in events {
                    println!(
                        "{}  {}  {} XP, streak {}{}",
                        e.linked_on,
                        e.account_id.as_deref().unwrap_or("-"),
                        e.merged_experience,
                        e.merged_streak,
                        if e.merged_guest { "  (guest merged)" } else { "" },
                    );
                }
            }
        }
        Commands::Config { action } => {
            handle_config(&app, action).await?;
        }
    }

    Ok(())
}

fn read_input(path: &str) -> anyhow::Result<String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {path}: {e}"))
    }
}

fn print_record(record: &glucoquest::ProgressRecord) {
    println!("Progress ({})", record.account_kind);
    if let Some(name) = record.username.as_deref().or(record.account_id.as_deref()) {
        println!("  Account:    {name}");
    }
    println!("  Experience: {}", record.experience_points);
    println!("  Level:      {}", record.level);
    println!("  Streak:     {} day(s)", record.streak_length);
    println!(
        "  Last day:   {}",
        record
            .last_streak_activity_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "never".to_string())
    );
}

async fn handle_config(app: &glucoquest::GlucoQuest, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => match app.config_get(&key).await? {
            Some(v) => println!("{key} = {v}"),
            None => println!("{key} is not set"),
        },
        ConfigAction::Set { key, value } => {
            app.config_set(&key, &value).await?;
            println!("Config updated.");
        }
        ConfigAction::List => {
            let items = app.config_list().await?;
            if items.is_empty() {
                println!("No configuration set.");
            } else {
                for (k, v) in items {
                    println!("{k} = {v}");
                }
            }
        }
    }
    Ok(())
}
