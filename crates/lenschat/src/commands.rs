//! Line-oriented slash-command parsing.
//!
//! Commands are recognized by literal, case-sensitive prefix; anything
//! that doesn't match is a chat message. Parsing never fails: a command
//! with a missing argument (e.g. `/add` with nothing after it) is not a
//! command form at all and falls through to chat, while an empty argument
//! after the space parses as that command and fails naturally downstream.

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/add <path>`
    Track(String),
    /// `/add_dir <dir>`
    TrackDir(String),
    /// `/list`
    List,
    /// `/remove <path>`
    Remove(String),
    /// `/remove_dir <dir>`
    RemoveDir(String),
    /// `/clear`
    Clear,
    /// `/create_lens <name>`
    CreateLens(String),
    /// `/list_lenses`
    ListLenses,
    /// `/switch_lens <name|none>`
    SwitchLens(String),
    /// `/add_to_lens <path>`
    AddToLens(String),
    /// `/remove_from_lens <path>`
    RemoveFromLens(String),
    /// `/list_lens <name>`
    ListLens(String),
    /// `/list_lens` with no argument: the active lens.
    ListActiveLens,
    /// `/quit`
    Quit,
    /// Anything else: a chat message.
    Chat(String),
}

impl Command {
    pub fn parse(input: &str) -> Command {
        match input {
            "/list" => return Command::List,
            "/clear" => return Command::Clear,
            "/quit" => return Command::Quit,
            "/list_lenses" => return Command::ListLenses,
            "/list_lens" => return Command::ListActiveLens,
            _ => {}
        }

        // Longer prefixes first so `/add_dir` never parses as `/add`.
        let prefixed = [
            ("/add_dir ", Command::TrackDir as fn(String) -> Command),
            ("/add_to_lens ", Command::AddToLens),
            ("/add ", Command::Track),
            ("/remove_dir ", Command::RemoveDir),
            ("/remove_from_lens ", Command::RemoveFromLens),
            ("/remove ", Command::Remove),
            ("/create_lens ", Command::CreateLens),
            ("/switch_lens ", Command::SwitchLens),
            ("/list_lens ", Command::ListLens),
        ];
        for (prefix, build) in prefixed {
            if let Some(rest) = input.strip_prefix(prefix) {
                return build(rest.to_string());
            }
        }

        Command::Chat(input.to_string())
    }
}
