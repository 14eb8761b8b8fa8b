mod app;
mod auth_cmd;
mod claims_cmd;
mod config;
mod config_cmd;
mod detail_cmd;
mod history_cmd;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use detail_cmd::Direction;
use output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "satya",
    version,
    about = "SatyaShodhak CLI - verify claims and review the evidence"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password (SATYA_PASSWORD skips the prompt)
    Login {
        #[arg(long)]
        email: Option<String>,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show who is signed in
    Whoami,

    /// Submit a claim for verification
    Verify {
        /// The claim text
        #[arg(required = true, num_args = 1..)]
        claim: Vec<String>,
    },

    /// Browse the public claims catalog
    Claims {
        /// Match against title, summary and tags
        #[arg(long, short)]
        query: Option<String>,
        /// all, true, false, misleading or pending
        #[arg(long, default_value = "all")]
        verdict: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List your past verifications
    History {
        /// Match against claim text, status and explanation
        #[arg(long, short)]
        query: Option<String>,
        /// Additional older pages to fetch
        #[arg(long, default_value_t = 0)]
        more: usize,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show a verification with its claim, evidence and comments
    Show {
        id: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Comment on a verification
    Comment {
        id: String,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Vote on a comment; repeating the same direction clears your vote
    Vote {
        /// Verification id
        id: String,
        comment_id: String,
        #[arg(value_enum)]
        direction: Direction,
    },

    /// Show or initialize configuration
    Config(config_cmd::ConfigArgs),

    /// Check the verdict service
    Health,
}

fn init_tracing() {
    let mut filter = EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into());
    if let Ok(directive) = "satya=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Login { email } => auth_cmd::run_login(email).await,
        Commands::Logout => auth_cmd::run_logout().await,
        Commands::Whoami => auth_cmd::run_whoami().await,
        Commands::Verify { claim } => claims_cmd::run_verify(claim).await,
        Commands::Claims {
            query,
            verdict,
            format,
        } => claims_cmd::run_claims(query, &verdict, format).await,
        Commands::History {
            query,
            more,
            format,
        } => history_cmd::run_history(query, more, format).await,
        Commands::Show { id, format } => detail_cmd::run_show(&id, format).await,
        Commands::Comment { id, text } => detail_cmd::run_comment(&id, text).await,
        Commands::Vote {
            id,
            comment_id,
            direction,
        } => detail_cmd::run_vote(&id, &comment_id, direction).await,
        Commands::Config(args) => config_cmd::run(args),
        Commands::Health => claims_cmd::run_health().await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        eprintln!("Re-run the command to try again.");
        std::process::exit(1);
    }
}
