//! CrashDesk — crash report analysis and case triage server.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crashdesk_core::{CrashDeskConfig, DataPaths};
use crashdesk_server::{build_router, AppState};
use crashdesk_store::CrashStore;
use crashdesk_triage::ResponseParser;

fn resolve_data_dir() -> PathBuf {
    std::env::var("CRASHDESK_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

fn print_help() {
    println!("CrashDesk — crash report analysis and case triage");
    println!();
    println!("Usage: crashdesk [command]");
    println!();
    println!("Commands:");
    println!("  (none)                   Start the server");
    println!("  parse <reply-file>       Parse a saved model reply and print it as JSON");
    println!("  help                     Show this help message");
}

/// Parse a reply file with the data directory's rule tables.
fn parse_file(path: &str) -> anyhow::Result<()> {
    let paths = DataPaths::new(resolve_data_dir())?;
    let parser = ResponseParser::load(&paths.artifact_rules_file, &paths.section_headers_file);
    let reply = std::fs::read_to_string(path)?;
    let report = parser.parse(&reply);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    // Handle CLI subcommands
    if args.len() > 1 {
        match args[1].as_str() {
            "parse" => {
                if args.len() < 3 {
                    eprintln!("Usage: crashdesk parse <reply-file>");
                    std::process::exit(1);
                }
                return parse_file(&args[2]);
            }
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'crashdesk help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = CrashDeskConfig::from_env(&data_dir)?;
    let port = config.port;

    let store = CrashStore::open(&config.data_paths.db)
        .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;

    let state = Arc::new(AppState::new(config, store));
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("CrashDesk server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
