//! Server-Sent Events (SSE) streaming for the chat completions API.
//!
//! The assistant's reply arrives as an ordered sequence of text deltas; the
//! caller sees each fragment as it comes off the wire and the full list is
//! returned for assembly. There is no explicit completion signal beyond
//! exhaustion — a [`StreamEvent::Done`] is always appended, whether the
//! server sent `data: [DONE]` or the stream simply ended.

use serde::Deserialize;
use tracing::{debug, warn};

use super::{ChatRequest, OPENAI_CHAT_URL, OpenAiClient};

/// A single event from an SSE stream.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// An incremental text content delta.
    TextDelta(String),
    /// The stream is complete.
    Done,
}

/// Raw SSE data chunk.
#[derive(Deserialize, Debug)]
struct StreamChunk {
    choices: Option<Vec<StreamChoice>>,
}

#[derive(Deserialize, Debug)]
struct StreamChoice {
    delta: Option<StreamDelta>,
}

#[derive(Deserialize, Debug)]
struct StreamDelta {
    content: Option<String>,
}

impl OpenAiClient {
    /// Send a streaming chat request, invoking `on_event` for each event
    /// as it arrives off the wire.
    ///
    /// The full event list is also returned so the caller can assemble
    /// the complete reply. A provider-side failure mid-stream surfaces as
    /// an `Err`; fragments already emitted to `on_event` are not
    /// retracted.
    pub async fn chat_stream_live(
        &self,
        body: &ChatRequest,
        mut on_event: impl FnMut(&StreamEvent),
    ) -> Result<Vec<StreamEvent>, String> {
        debug!("sending streaming chat request ({} messages)", body.messages.len());

        let mut resp = self
            .client
            .post(OPENAI_CHAT_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .map_err(|e| format!("streaming request failed: {e}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(format!("OpenAI API HTTP {status}: {text}"));
        }

        let mut events = Vec::new();
        let mut buffer = String::new();
        let mut done = false;

        // Read the SSE stream incrementally via chunk() and process every
        // complete line in the buffer.
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| format!("failed to read streaming chunk: {e}"))?
        {
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(newline_pos) = buffer.find('\n') {
                let line: String = buffer.drain(..=newline_pos).collect();
                let line = line.trim();
                if line.is_empty() || line.starts_with(':') {
                    continue;
                }
                if line == "data: [DONE]" {
                    let ev = StreamEvent::Done;
                    on_event(&ev);
                    events.push(ev);
                    done = true;
                    break;
                }
                if let Some(data) = line.strip_prefix("data: ") {
                    let before = events.len();
                    parse_sse_data(data, &mut events);
                    for ev in &events[before..] {
                        on_event(ev);
                    }
                }
            }

            if done {
                break;
            }
        }

        // Any remaining data in the buffer is an incomplete final line.
        let remaining = buffer.trim();
        if !remaining.is_empty()
            && remaining != "data: [DONE]"
            && let Some(data) = remaining.strip_prefix("data: ")
        {
            let before = events.len();
            parse_sse_data(data, &mut events);
            for ev in &events[before..] {
                on_event(ev);
            }
        }

        if !events.iter().any(|e| matches!(e, StreamEvent::Done)) {
            let ev = StreamEvent::Done;
            on_event(&ev);
            events.push(ev);
        }

        debug!("stream completed with {} events", events.len());
        Ok(events)
    }
}

/// Parse a single SSE `data:` payload into stream events.
fn parse_sse_data(data: &str, events: &mut Vec<StreamEvent>) {
    match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => {
            for choice in chunk.choices.unwrap_or_default() {
                if let Some(delta) = choice.delta
                    && let Some(content) = delta.content
                    && !content.is_empty()
                {
                    events.push(StreamEvent::TextDelta(content));
                }
            }
        }
        Err(e) => {
            warn!("failed to parse SSE chunk: {e} (data: {data})");
        }
    }
}

/// Assemble the complete reply text from a sequence of stream events.
pub fn collect_text(events: &[StreamEvent]) -> String {
    let mut text = String::new();
    for event in events {
        if let StreamEvent::TextDelta(delta) = event {
            text.push_str(delta);
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_text_from_deltas() {
        let events = vec![
            StreamEvent::TextDelta("Hello ".into()),
            StreamEvent::TextDelta("world!".into()),
            StreamEvent::Done,
        ];
        assert_eq!(collect_text(&events), "Hello world!");
    }

    #[test]
    fn parse_content_delta() {
        let mut events = Vec::new();
        parse_sse_data(
            r#"{"choices":[{"delta":{"content":"hi"}}]}"#,
            &mut events,
        );
        assert!(matches!(&events[..], [StreamEvent::TextDelta(d)] if d == "hi"));
    }

    #[test]
    fn parse_empty_delta_emits_nothing() {
        let mut events = Vec::new();
        parse_sse_data(r#"{"choices":[{"delta":{"content":""}}]}"#, &mut events);
        parse_sse_data(r#"{"choices":[{"delta":{}}]}"#, &mut events);
        parse_sse_data(r#"{"choices":[{"finish_reason":"stop"}]}"#, &mut events);
        assert!(events.is_empty());
    }

    #[test]
    fn malformed_chunk_is_skipped() {
        let mut events = Vec::new();
        parse_sse_data("not json", &mut events);
        assert!(events.is_empty());
    }
}
