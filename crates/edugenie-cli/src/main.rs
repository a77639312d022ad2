//! EduGenie CLI
//!
//! Command-line front end for the EduGenie course marketplace.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args as ClapArgs, Parser, Subcommand};
use edugenie_client::{
    ApiClient, AuthContext, Config, CourseFilters, CourseStatus, CourseUpdate, FileSessionStore,
    NewCourse, NormalizedResult, RegisterRequest, Role,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// EduGenie - course marketplace client
///
/// Signs in, browses and manages courses against an EduGenie backend.
/// The session is kept on disk between invocations.
#[derive(Parser, Debug)]
#[command(name = "edugenie")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: edugenie.json in current directory)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<String>,

    /// Backend base URL, overriding the configuration
    #[arg(long, value_name = "URL", global = true)]
    base_url: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and store the session
    Login {
        /// Account email
        #[arg(long)]
        email: String,
        /// Account password
        #[arg(long)]
        password: String,
    },
    /// Create an account and store the session
    Register {
        /// Display name
        #[arg(long)]
        name: String,
        /// Account email
        #[arg(long)]
        email: String,
        /// Account password
        #[arg(long)]
        password: String,
        /// Role: student or instructor
        #[arg(long, default_value = "student")]
        role: Role,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the stored session without contacting the backend
    Whoami,
    /// Fetch the profile and refresh the stored user
    Profile,
    /// Check that the backend is up
    Health,
    /// Show the backend banner and version
    Info,
    /// Course operations
    #[command(subcommand)]
    Courses(CoursesCommand),
    /// List catalog categories
    Categories,
    /// Ask for AI course recommendations
    Recommend {
        /// What you want to learn (10 to 500 characters)
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
    },
    /// Most-enrolled courses, when recommendations are unavailable
    Popular,
    /// AI recommendation quota (instructors)
    Usage,
}

#[derive(Subcommand, Debug)]
enum CoursesCommand {
    /// Browse the catalog
    Browse(BrowseArgs),
    /// Courses you teach
    Mine,
    /// Courses you are enrolled in
    Enrolled,
    /// Show one course
    Show {
        /// Course id
        id: String,
    },
    /// Create a course
    Create(CreateArgs),
    /// Update a course
    Update(UpdateArgs),
    /// Delete a course
    Delete {
        /// Course id
        id: String,
    },
    /// Enroll in a course
    Enroll {
        /// Course id
        id: String,
    },
    /// Students enrolled in a course you teach
    Students {
        /// Course id
        id: String,
    },
}

#[derive(ClapArgs, Debug)]
struct BrowseArgs {
    /// Category name
    #[arg(long)]
    category: Option<String>,
    /// Difficulty level
    #[arg(long)]
    level: Option<String>,
    /// Minimum price
    #[arg(long)]
    price_min: Option<f64>,
    /// Maximum price
    #[arg(long)]
    price_max: Option<f64>,
    /// Free-text search
    #[arg(long)]
    search: Option<String>,
}

#[derive(ClapArgs, Debug)]
struct CreateArgs {
    /// Title
    #[arg(long)]
    title: String,
    /// Short description
    #[arg(long)]
    description: String,
    /// Full course content
    #[arg(long, default_value = "")]
    content: String,
    /// Category name
    #[arg(long)]
    category: String,
    /// Price
    #[arg(long, default_value_t = 0.0)]
    price: f64,
    /// Length in hours
    #[arg(long, default_value_t = 0.0)]
    duration: f64,
    /// Difficulty level
    #[arg(long, default_value = "beginner")]
    level: String,
    /// Tag (repeatable)
    #[arg(long = "tag")]
    tags: Vec<String>,
    /// Enrollment cap
    #[arg(long)]
    max_students: Option<u32>,
}

#[derive(ClapArgs, Debug)]
struct UpdateArgs {
    /// Course id
    id: String,
    /// New title
    #[arg(long)]
    title: Option<String>,
    /// New description
    #[arg(long)]
    description: Option<String>,
    /// New price
    #[arg(long)]
    price: Option<f64>,
    /// New level
    #[arg(long)]
    level: Option<String>,
    /// New status (draft, published, archived)
    #[arg(long)]
    status: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(config = ?args.config, base_url = ?args.base_url, "Starting");

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Runs one command. Returns whether the backend call succeeded.
async fn run(args: Args) -> anyhow::Result<bool> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(url) = args.base_url {
        config.base_url = Some(url);
    }
    // Re-validate after overrides
    config.validate()?;

    let store = Arc::new(FileSessionStore::new(&config.session_file));
    let client = Arc::new(ApiClient::new(&config, store)?);
    tracing::debug!(base_url = %client.base_url(), "Using backend");

    let auth = AuthContext::new(Arc::clone(&client));
    auth.initialize().await?;

    let ok = match args.command {
        Command::Login { email, password } => print_result(&auth.login(&email, &password).await)?,
        Command::Register {
            name,
            email,
            password,
            role,
        } => {
            let registration = RegisterRequest {
                name,
                email,
                password,
                role,
            };
            print_result(&auth.register(&registration).await)?
        }
        Command::Logout => {
            let result = auth.logout().await;
            if let Some(message) = result.error_message() {
                eprintln!("Server logout failed ({message}); local session cleared");
            }
            println!("Signed out");
            true
        }
        Command::Whoami => {
            println!("{}", serde_json::to_string_pretty(&auth.snapshot())?);
            true
        }
        Command::Profile => print_result(&auth.refresh_profile().await)?,
        Command::Health => print_result(&client.health_check().await)?,
        Command::Info => print_result(&client.api_info().await)?,
        Command::Courses(command) => run_courses(&client, command).await?,
        Command::Categories => print_result(&client.course_categories().await)?,
        Command::Recommend { prompt } => {
            print_result(&client.course_recommendations(&prompt.join(" ")).await)?
        }
        Command::Popular => print_result(&client.popular_courses().await)?,
        Command::Usage => {
            let result = client.gpt_usage().await;
            if let Some(warning) = result.payload().and_then(|usage| usage.warning.as_deref()) {
                eprintln!("Warning: {warning}");
            }
            print_result(&result)?
        }
    };

    Ok(ok)
}

async fn run_courses(client: &ApiClient, command: CoursesCommand) -> anyhow::Result<bool> {
    match command {
        CoursesCommand::Browse(filters) => {
            let filters = CourseFilters {
                category: filters.category,
                level: filters.level,
                price_min: filters.price_min,
                price_max: filters.price_max,
                search: filters.search,
            };
            print_result(&client.browse_courses(&filters).await)
        }
        CoursesCommand::Mine => print_result(&client.instructor_courses().await),
        CoursesCommand::Enrolled => print_result(&client.enrolled_courses().await),
        CoursesCommand::Show { id } => print_result(&client.course_details(&id).await),
        CoursesCommand::Create(args) => {
            let course = NewCourse {
                title: args.title,
                description: args.description,
                content: args.content,
                category: args.category,
                price: args.price,
                duration: args.duration,
                level: args.level,
                tags: args.tags,
                max_students: args.max_students,
                ..NewCourse::default()
            };
            print_result(&client.create_course(&course).await)
        }
        CoursesCommand::Update(args) => {
            let update = CourseUpdate {
                title: args.title,
                description: args.description,
                price: args.price,
                level: args.level,
                status: args.status.as_deref().map(CourseStatus::normalize),
                ..CourseUpdate::default()
            };
            if update.is_empty() {
                anyhow::bail!(
                    "Nothing to update\n\nSuggestion: Pass at least one of --title, --description, --price, --level, --status"
                );
            }
            print_result(&client.update_course(&args.id, &update).await)
        }
        CoursesCommand::Delete { id } => print_result(&client.delete_course(&id).await),
        CoursesCommand::Enroll { id } => print_result(&client.enroll(&id).await),
        CoursesCommand::Students { id } => print_result(&client.course_students(&id).await),
    }
}

/// Loads configuration from file or uses defaults.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => Config::load().map_err(|e| anyhow::anyhow!("{e}")),
    }
}

/// Prints a result as pretty JSON and reports whether it succeeded.
fn print_result<T: Serialize>(result: &NormalizedResult<T>) -> anyhow::Result<bool> {
    println!("{}", serde_json::to_string_pretty(result)?);
    if result.error_kind().is_some_and(|kind| kind.is_transient()) {
        eprintln!("The backend could not be reached; retrying later may succeed");
    }
    Ok(result.is_success())
}
