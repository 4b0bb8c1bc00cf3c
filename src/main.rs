use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use studydeck::config::{Config, DEFAULT_ACTIVITY_DAYS, DEFAULT_HISTORY_DAYS};
use studydeck::domain::{NewSet, SessionCompletion, SetUpdate};
use studydeck::{db, StudyResult, StudyService};

#[derive(Parser)]
#[command(name = "studydeck", about = "Flashcard study maintenance tool", version)]
struct Cli {
  /// Database file (overrides config.toml and DATABASE_PATH)
  #[arg(long, global = true)]
  db: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Create or migrate the database
  Init,
  /// Register a user
  AddUser {
    username: String,
    #[arg(long)]
    admin: bool,
  },
  /// Create a flashcard set owned by a user
  AddSet {
    #[arg(long)]
    user: i64,
    title: String,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    public: bool,
  },
  /// Change title, description or visibility of a set
  EditSet {
    #[arg(long)]
    user: i64,
    #[arg(long)]
    set: i64,
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    public: Option<bool>,
  },
  /// Add a card to a set
  AddCard {
    #[arg(long)]
    user: i64,
    #[arg(long)]
    set: i64,
    front: String,
    back: String,
  },
  /// Cards to study now (whole set when nothing is due)
  Due {
    #[arg(long)]
    user: i64,
    #[arg(long)]
    set: i64,
  },
  /// Grade an answer, 0 (forgot) to 5 (perfect)
  Answer {
    #[arg(long)]
    user: i64,
    #[arg(long)]
    card: i64,
    #[arg(long, allow_negative_numbers = true)]
    quality: i64,
  },
  /// Reset every card of a set back to new
  Reset {
    #[arg(long)]
    user: i64,
    #[arg(long)]
    set: i64,
  },
  /// Progress summary for a set
  Progress {
    #[arg(long)]
    user: i64,
    #[arg(long)]
    set: i64,
  },
  /// Begin a study session
  StartSession {
    #[arg(long)]
    user: i64,
    #[arg(long)]
    set: i64,
  },
  /// Finish a study session and update the leaderboard
  CompleteSession {
    #[arg(long)]
    user: i64,
    #[arg(long)]
    session: i64,
    #[arg(long)]
    studied: i64,
    #[arg(long)]
    correct: i64,
    #[arg(long)]
    incorrect: i64,
    #[arg(long, default_value_t = 0)]
    minutes: i64,
  },
  /// Completed sessions, optionally for one set
  Sessions {
    #[arg(long)]
    user: i64,
    #[arg(long)]
    set: Option<i64>,
  },
  /// Latest completion time per set
  LastStudied {
    #[arg(long)]
    user: i64,
  },
  /// Consecutive correct answers across perfect sessions
  Streak {
    #[arg(long)]
    user: i64,
  },
  /// Daily session history
  History {
    #[arg(long)]
    user: i64,
    #[arg(long, default_value_t = DEFAULT_HISTORY_DAYS)]
    days: i64,
  },
  /// Activity heatmap data
  Activity {
    #[arg(long)]
    user: i64,
    #[arg(long, default_value_t = DEFAULT_ACTIVITY_DAYS)]
    days: i64,
  },
}

fn main() -> ExitCode {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "studydeck=info".into()),
    )
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();

  let cli = Cli::parse();

  let mut config = Config::load();
  if let Some(path) = cli.db {
    config.database_path = path;
  }

  let pool = match db::init_db(&config.database_path) {
    Ok(pool) => pool,
    Err(e) => {
      tracing::error!("Failed to open {}: {}", config.database_path.display(), e);
      return ExitCode::FAILURE;
    }
  };
  let service = StudyService::new(pool, config);

  match run(&service, cli.command) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      tracing::error!("{}", e);
      ExitCode::FAILURE
    }
  }
}

fn run(service: &StudyService, command: Command) -> StudyResult<()> {
  match command {
    Command::Init => {
      tracing::info!("Database at {} is up to date", service.config().database_path.display());
      Ok(())
    }
    Command::AddUser { username, admin } => print(&service.add_user(&username, admin)?),
    Command::AddSet {
      user,
      title,
      description,
      public,
    } => {
      let new_set = NewSet {
        title,
        description,
        is_public: public,
      };
      print(&service.create_set(user, &new_set)?)
    }
    Command::EditSet {
      user,
      set,
      title,
      description,
      public,
    } => {
      let update = SetUpdate {
        title,
        description,
        is_public: public,
      };
      print(&service.update_set(user, set, &update)?)
    }
    Command::AddCard {
      user,
      set,
      front,
      back,
    } => print(&service.add_card(user, set, &front, &back)?),
    Command::Due { user, set } => print(&service.due_cards(user, set)?),
    Command::Answer {
      user,
      card,
      quality,
    } => print(&service.submit_answer(user, card, quality)?),
    Command::Reset { user, set } => {
      let cards_reset = service.reset_progress(user, set)?;
      print(&serde_json::json!({ "cards_reset": cards_reset }))
    }
    Command::Progress { user, set } => print(&service.progress(user, set)?),
    Command::StartSession { user, set } => print(&service.start_session(user, set)?),
    Command::CompleteSession {
      user,
      session,
      studied,
      correct,
      incorrect,
      minutes,
    } => {
      let completion = SessionCompletion {
        cards_studied: studied,
        cards_correct: correct,
        cards_incorrect: incorrect,
        duration_minutes: minutes,
      };
      print(&service.complete_session(user, session, &completion)?)
    }
    Command::Sessions { user, set } => print(&service.sessions(user, set)?),
    Command::LastStudied { user } => print(&service.last_studied(user)?),
    Command::Streak { user } => print(&service.correct_streak(user)?),
    Command::History { user, days } => print(&service.session_history(user, days)?),
    Command::Activity { user, days } => print(&service.activity(user, days)?),
  }
}

fn print<T: Serialize>(value: &T) -> StudyResult<()> {
  match serde_json::to_string_pretty(value) {
    Ok(json) => println!("{}", json),
    Err(e) => tracing::error!("Could not serialize output: {}", e),
  }
  Ok(())
}
