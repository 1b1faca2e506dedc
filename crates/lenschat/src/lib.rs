//! Interactive command-line chat client with token-budgeted file context.
//!
//! `lenschat` augments every chat turn with the contents of locally
//! tracked files, subject to a 100k-token budget. Files are tracked with
//! `/add` and `/add_dir`, curated into named subsets called *lenses*, and
//! optionally persisted across sessions. The core of the crate is the
//! [`TrackedContextStore`]; everything around it is thin plumbing to the
//! token-counting oracle ([`tokens`]), the streaming chat provider
//! ([`api`]), and the line-oriented REPL (`main.rs`).
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`context`] | [`TrackedContextStore`], lenses, JSON persistence, budget enforcement |
//! | [`session`] | [`ChatSession`] history + [`ChatProvider`] seam |
//! | [`api`] | OpenAI chat completions client and SSE streaming |
//! | [`tokens`] | [`TokenCounter`] trait and the tiktoken-backed counter |
//! | [`commands`] | Slash-command parsing for the REPL |

pub mod api;
pub mod commands;
pub mod context;
pub mod session;
pub mod tokens;

pub use api::{ChatRequest, DEFAULT_MODEL, Message, MessageRole, OpenAiClient};
pub use commands::Command;
pub use context::{
    ContextError, PER_FILE_TOKEN_LIMIT, TOKEN_LIMIT, TrackOutcome, TrackedContextStore,
};
pub use session::{ChatProvider, ChatSession};
pub use tokens::{TiktokenCounter, TokenCounter};
