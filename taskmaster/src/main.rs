//! Taskmaster - spy mission game in the terminal.

mod terminal;

use taskmaster_core::{GameConfig, SessionRegistry};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn print_help() {
    println!("Taskmaster - spy missions run by an AI handler");
    println!();
    println!("USAGE:");
    println!("    taskmaster [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --offline-missions  Use the built-in mission catalogue");
    println!("    -h, --help          Print this help");
    println!();
    println!("ENVIRONMENT:");
    println!("    ANTHROPIC_API_KEY       Required");
    println!("    TASKMASTER_MODEL        Model override");
    println!("    TASKMASTER_MAX_TOOL_ROUNDS  Tool rounds per turn (default 10)");
    println!("    OPENWEATHER_API_KEY     Enables live weather intel");
    println!("    TASKMASTER_STATE_FILE   Keep game state in this file");
    println!("    TASKMASTER_MISSION_LOG  Record every exchange in this file");
    println!("    RUST_LOG                Log filter (default info)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays a clean transcript.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    if std::env::var("ANTHROPIC_API_KEY").is_err() {
        eprintln!("Error: ANTHROPIC_API_KEY environment variable not set.");
        eprintln!("Please set it in .env file or with: export ANTHROPIC_API_KEY=your_key_here");
        std::process::exit(1);
    }

    let config = GameConfig::from_env()
        .with_offline_missions(args.iter().any(|a| a == "--offline-missions"));

    let registry = SessionRegistry::new();
    let id = registry.create(config).await?;
    tracing::info!(session = %id, "session started");

    terminal::run(&registry, id).await?;
    registry.remove(id).await;
    Ok(())
}
