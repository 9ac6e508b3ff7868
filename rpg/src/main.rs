//! Headless driver for the combat engine.
//!
//! Reads one JSON tool call per line on stdin and writes one JSON result per
//! line on stdout. Logs go to stderr.
//!
//! ```bash
//! echo '{"tool": "get_combat_status"}' | cargo run -p rpg -- --session demo
//! ```

mod headless;

use rpg_core::EngineConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rpg=info,rpg_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    if args.iter().any(|a| a == "--tools") {
        let definitions = rpg_core::CombatTools::definitions();
        println!("{}", serde_json::to_string_pretty(&definitions)?);
        return Ok(());
    }

    let options = headless::parse_options(&args, EngineConfig::from_env());
    tracing::info!(
        session = %options.session_id,
        data_dir = %options.config.data_dir.display(),
        "starting headless combat driver"
    );
    headless::run(options).await?;
    Ok(())
}

fn print_help() {
    println!("rpg - headless combat engine driver");
    println!();
    println!("USAGE:");
    println!("    rpg [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --session <ID>      Session key for saved combat (default: default)");
    println!("    --data-dir <DIR>    Data directory (default: $RPG_DATA_DIR or gamedata)");
    println!("    --character <ID>    Player character id to load from the data directory");
    println!("    --tools             Print tool definitions as JSON and exit");
    println!("    -h, --help          Show this help");
    println!();
    println!("INPUT:");
    println!("    One JSON object per line: {{\"tool\": \"<name>\", \"input\": {{...}}}}");
    println!("    #status, #tools, #help and #quit are also accepted.");
}
