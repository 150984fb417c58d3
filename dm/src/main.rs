//! Command-line front end for the dungeon master engine.
//!
//! Reads player utterances line by line from stdin. Requires a running
//! NLU parse server (`RASA_URL`); falls back to the built-in sample
//! adventure.
//!
//! ```bash
//! RASA_URL=http://localhost:5005 cargo run -p dm -- --seed 42
//! ```

use dm_core::nlu::RasaClassifier;
use dm_core::{AdventureDef, InstinctPlanner, Session, SessionConfig};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn print_help() {
    println!("Usage: dm [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --seed <N>        Seed the session RNG for a reproducible game");
    println!("  --adventure <F>   Load an adventure definition from a JSON file");
    println!("  --snapshot <F>    Resume from (and save to) a snapshot file");
    println!("  -h, --help        Show this help");
    println!();
    println!("In game, /help lists the available commands.");
}

fn arg_value(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let classifier = match RasaClassifier::from_env() {
        Ok(classifier) => classifier,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Set RASA_URL to your NLU parse server, e.g. http://localhost:5005");
            std::process::exit(1);
        }
    };

    let snapshot: Option<PathBuf> = arg_value(&args, "--snapshot").map(PathBuf::from);

    let mut session = match &snapshot {
        Some(path) if path.exists() => {
            let session = Session::load(path, classifier, InstinctPlanner).await?;
            println!("Resumed from {}.", path.display());
            session
        }
        _ => {
            let mut config = SessionConfig::new();
            if let Some(seed) = arg_value(&args, "--seed") {
                config = config.with_seed(seed.parse()?);
            }
            let adventure = match arg_value(&args, "--adventure") {
                Some(file) => AdventureDef::from_json(&std::fs::read_to_string(file)?)?,
                None => AdventureDef::sample(),
            };
            let mut session = Session::new(config, &adventure, classifier, InstinctPlanner)?;
            println!("{}", session.start());
            session
        }
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let reply = session.input(&line).await;
        if !reply.text.is_empty() {
            println!("{}", reply.text);
        }
        if let Some(path) = &snapshot {
            session.save(path).await?;
        }
        if reply.exit {
            break;
        }
    }
    Ok(())
}
