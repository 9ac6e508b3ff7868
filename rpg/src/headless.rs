//! Line-oriented JSON protocol over stdin/stdout.

use rpg_core::{
    CharacterId, CharacterStore, CombatTools, EngineConfig, JsonCharacterStore, ToolSession,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};

/// Options for a headless run.
#[derive(Debug, Clone)]
pub struct Options {
    pub session_id: String,
    pub character_id: Option<String>,
    pub config: EngineConfig,
}

/// One request line.
#[derive(Debug, Deserialize)]
struct Request {
    tool: String,
    #[serde(default)]
    input: Value,
}

/// Parse `--session`, `--data-dir` and `--character` from the command line.
pub fn parse_options(args: &[String], mut config: EngineConfig) -> Options {
    let mut session_id = "default".to_string();
    let mut character_id = None;

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1).cloned();
        match (args[i].as_str(), value) {
            ("--session", Some(v)) => {
                session_id = v;
                i += 1;
            }
            ("--data-dir", Some(v)) => {
                config.data_dir = v.into();
                i += 1;
            }
            ("--character", Some(v)) => {
                character_id = Some(v);
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }

    Options {
        session_id,
        character_id,
        config,
    }
}

fn load_session(options: &Options) -> ToolSession {
    let session = ToolSession::new(options.session_id.clone());
    let Some(raw) = &options.character_id else {
        return session;
    };

    let store = JsonCharacterStore::new(options.config.characters_dir());
    let character = raw
        .parse::<CharacterId>()
        .map_err(|e| format!("not a character id: {e}"))
        .and_then(|id| store.get_character(id).map_err(|e| e.to_string()));
    match character {
        Ok(character) => {
            tracing::info!(character = %character.name, "playing as stored character");
            session.with_character(character)
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not load player character, continuing without one");
            session
        }
    }
}

/// Run the protocol until stdin closes or `#quit` is read.
pub async fn run(options: Options) -> io::Result<()> {
    let session = load_session(&options);
    let tools = CombatTools::from_config(options.config);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = if let Some(command) = line.strip_prefix('#') {
            match command.split_whitespace().next() {
                Some("quit") | Some("exit") => break,
                Some("status") => tools.execute(&session, "get_combat_status", &Value::Null).await,
                Some("tools") => json!(CombatTools::definitions()),
                Some("help") => json!({
                    "usage": "{\"tool\": \"<name>\", \"input\": {...}}",
                    "commands": ["#status", "#tools", "#help", "#quit"],
                }),
                _ => json!({ "error": format!("Unknown command: {line}") }),
            }
        } else {
            match serde_json::from_str::<Request>(line) {
                Ok(request) => tools.execute(&session, &request.tool, &request.input).await,
                Err(e) => json!({ "error": format!("Malformed request: {e}") }),
            }
        };

        writeln!(stdout, "{response}")?;
        stdout.flush()?;
    }

    Ok(())
}
