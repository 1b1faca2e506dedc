//! Interactive chat REPL with tracked-file context.
//!
//! Reads the API key from the `OPENAI_API_KEY` environment variable.
//!
//! # Examples
//!
//! ```sh
//! # Chat with files tracked from the current directory
//! lenschat
//!
//! # Persist tracked files and lenses across sessions
//! lenschat --persist -d /path/to/project
//! ```

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{BasicHistory, Input};
use lenschat::{
    ChatSession, Command, DEFAULT_MODEL, OpenAiClient, PER_FILE_TOKEN_LIMIT, TiktokenCounter,
    TrackOutcome, TrackedContextStore,
};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Interactive chat client that prepends tracked-file context to every turn.
#[derive(Parser)]
#[command(name = "lenschat")]
struct Cli {
    /// Persist tracked files and lenses across sessions
    #[arg(long)]
    persist: bool,

    /// Working directory that tracked-file paths resolve against
    #[arg(short = 'd', long, default_value = ".")]
    directory: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Log warnings to stderr; the transcript itself stays on stdout.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(LevelFilter::WARN),
        )
        .init();

    let workdir = std::fs::canonicalize(&cli.directory)
        .unwrap_or_else(|_| PathBuf::from(&cli.directory));

    let api_key = match std::env::var("OPENAI_API_KEY") {
        Ok(key) => key,
        Err(_) => {
            eprintln!("Error: OPENAI_API_KEY environment variable is not set");
            std::process::exit(1);
        }
    };
    let client = match OpenAiClient::new(api_key) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: failed to create API client: {e}");
            std::process::exit(1);
        }
    };

    let counter = TiktokenCounter::for_model(DEFAULT_MODEL);
    let mut store = match TrackedContextStore::new(Box::new(counter), &workdir, cli.persist) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: failed to load tracking state: {e}");
            std::process::exit(1);
        }
    };
    if cli.persist {
        announce_loaded_state(&store);
    }

    let mut session = ChatSession::new(DEFAULT_MODEL);

    println!("lenschat initialized. Type '/add <filename>' to track a file, or just chat normally.");

    let mut history = BasicHistory::new();
    loop {
        let input: String = match Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt("You")
            .allow_empty(true)
            .history_with(&mut history)
            .interact_text()
        {
            Ok(line) => line,
            // Closed input stream (Ctrl-D or a broken terminal) ends the session.
            Err(_) => break,
        };

        match Command::parse(&input) {
            Command::Track(path) => match store.track(&path) {
                Ok(tokens) => println!("Tracking file: {path}, Tokens: {tokens}"),
                Err(e) => println!("{e}"),
            },
            Command::TrackDir(dir) => match store.track_directory(&dir, PER_FILE_TOKEN_LIMIT) {
                Ok(outcomes) => {
                    for outcome in &outcomes {
                        print_outcome(outcome);
                    }
                    println!("Tracking all files within: {dir}");
                }
                Err(e) => println!("{e}"),
            },
            Command::List => print_tracked_files(&store),
            Command::Remove(path) => match store.remove(&path) {
                Ok(_) => println!("Removed file from tracking: {path}"),
                Err(e) => println!("{e}"),
            },
            Command::RemoveDir(dir) => match store.remove_directory(&dir) {
                Ok(0) => println!("No tracked files found in directory: {dir}"),
                Ok(count) => println!("Removed {count} tracked file(s) in directory: {dir}"),
                Err(e) => println!("{e}"),
            },
            Command::Clear => match store.clear() {
                Ok(()) => println!("All tracked files have been cleared."),
                Err(e) => println!("{e}"),
            },
            Command::CreateLens(name) => match store.create_lens(&name) {
                Ok(()) => println!("Lens '{name}' created."),
                Err(e) => println!("{e}"),
            },
            Command::ListLenses => print_lenses(&store),
            Command::SwitchLens(name) => match store.switch_lens(&name) {
                Ok(()) if name == "none" => println!("Switched to no active lens."),
                Ok(()) => println!("Switched to lens '{name}'."),
                Err(e) => println!("{e}"),
            },
            Command::AddToLens(path) => match store.add_file_to_lens(&path) {
                Ok(lens) => println!("File {path} added to lens '{lens}'."),
                Err(e) => println!("{e}"),
            },
            Command::RemoveFromLens(path) => match store.remove_file_from_lens(&path) {
                Ok(lens) => println!("File {path} removed from lens '{lens}'."),
                Err(e) => println!("{e}"),
            },
            Command::ListLens(name) => print_lens_files(&store, &name),
            Command::ListActiveLens => match store.active_lens() {
                Some(name) => {
                    let name = name.to_string();
                    print_lens_files(&store, &name);
                }
                None => println!("There is no active lens."),
            },
            Command::Quit => {
                println!("Quitting lenschat.");
                break;
            }
            Command::Chat(text) => {
                print!("{} ", "Bot:".yellow());
                flush_stdout();
                let result = session
                    .send_turn(&client, &store, &text, |delta| {
                        print!("{delta}");
                        flush_stdout();
                    })
                    .await;
                match result {
                    Ok(_) => println!(),
                    Err(e) => eprintln!("\nError: {e}"),
                }
            }
        }
    }
}

fn flush_stdout() {
    let _ = std::io::stdout().flush();
}

fn print_outcome(outcome: &TrackOutcome) {
    match outcome {
        TrackOutcome::Tracked { path, tokens } => {
            println!("Tracking file: {path}, Tokens: {tokens}");
        }
        TrackOutcome::TooLarge { path, limit, .. } => {
            println!("Skipping {path}: exceeds {limit} token limit.");
        }
        TrackOutcome::OverBudget { path } => {
            println!("Adding {path} would exceed the token limit. Not added.");
        }
        TrackOutcome::Unreadable { path, error } => {
            println!("Error processing {path}: {error}. Skipping.");
        }
    }
}

fn print_tracked_files(store: &TrackedContextStore) {
    if store.is_empty() {
        println!("No files are being tracked.");
        return;
    }
    println!("Tracked Files and Token Counts:");
    for (path, tokens) in store.files() {
        println!("- {path} (Tokens: {tokens})");
    }
    println!("Total Tokens Used: {}", store.total_tokens());
    println!("Tokens Remaining: {}", store.remaining_budget());
}

fn print_lenses(store: &TrackedContextStore) {
    let names: Vec<&str> = store.lens_names().collect();
    if names.is_empty() {
        println!("No lenses available.");
        return;
    }
    println!("Available Lenses:");
    for name in names {
        println!("- {name}");
    }
    println!("Active Lens: {}", store.active_lens().unwrap_or("None"));
}

fn print_lens_files(store: &TrackedContextStore, name: &str) {
    match store.lens_files(name) {
        Ok(files) if files.is_empty() => println!("No files in the lens '{name}'."),
        Ok(files) => {
            println!("Files in lens '{name}':");
            for (path, tokens) in files {
                println!("- {path} (Tokens: {tokens})");
            }
        }
        Err(e) => println!("{e}"),
    }
}

fn announce_loaded_state(store: &TrackedContextStore) {
    if store.is_empty() && store.lens_names().next().is_none() {
        return;
    }
    let tracked: Vec<&str> = store.files().map(|(path, _)| path).collect();
    println!("Loaded tracked files:\n====\n{}\n====", tracked.join("\n"));
    let lenses: Vec<&str> = store.lens_names().collect();
    println!(
        "Loaded lenses: {}",
        if lenses.is_empty() {
            "None".to_string()
        } else {
            lenses.join(", ")
        }
    );
    println!("Active lens: {}", store.active_lens().unwrap_or("None"));
}
