//! Conversation history and the per-turn request flow.
//!
//! [`ChatSession`] owns the ordered, append-only message history for the
//! process lifetime (history is never persisted). Each turn asks the
//! [`TrackedContextStore`] for the current context string and prepends it
//! to the outbound request as a leading user message, so the provider sees
//! the tracked files before the conversation.

use crate::api::streaming::{StreamEvent, collect_text};
use crate::api::{ChatRequest, Message, OpenAiClient};
use crate::context::TrackedContextStore;

/// Streaming chat-completion provider.
///
/// `stream` yields ordered text fragments through `on_delta` as they are
/// produced and resolves to the concatenated reply. A mid-stream failure
/// resolves to `Err`; fragments already delivered are not retracted.
#[allow(async_fn_in_trait)]
pub trait ChatProvider {
    async fn stream(
        &self,
        request: &ChatRequest,
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<String, String>;
}

impl ChatProvider for OpenAiClient {
    async fn stream(
        &self,
        request: &ChatRequest,
        on_delta: &mut dyn FnMut(&str),
    ) -> Result<String, String> {
        let events = self
            .chat_stream_live(request, |event| {
                if let StreamEvent::TextDelta(delta) = event {
                    on_delta(delta);
                }
            })
            .await?;
        Ok(collect_text(&events))
    }
}

/// One interactive conversation.
pub struct ChatSession {
    model: String,
    history: Vec<Message>,
}

impl ChatSession {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            history: Vec::new(),
        }
    }

    /// The conversation so far.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Run one chat turn.
    ///
    /// Appends the user message, sends `[context] + history` to the
    /// provider, and appends the assistant reply on success. An aborted
    /// turn (context read failure or provider failure) appends no
    /// assistant message; the user message stays in history.
    pub async fn send_turn<P: ChatProvider>(
        &mut self,
        provider: &P,
        store: &TrackedContextStore,
        user_text: &str,
        mut on_delta: impl FnMut(&str),
    ) -> Result<String, String> {
        self.history.push(Message::user(user_text));

        let context = store
            .current_context()
            .map_err(|e| format!("failed to read tracked context: {e}"))?;

        let mut messages = Vec::with_capacity(self.history.len() + 1);
        messages.push(Message::user(context));
        messages.extend(self.history.iter().cloned());

        let request = ChatRequest::streaming(&self.model, messages);
        let reply = provider.stream(&request, &mut on_delta).await?;

        self.history.push(Message::assistant(&reply));
        Ok(reply)
    }
}
