// Conversation entry point shared by the web UI and the terminal chat.
//
// One inbound message produces one outbound message. Attachments get a fixed
// reply; text goes through sentiment analysis, prompt composition and a
// streamed completion whose fragments are relayed as they arrive.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::config::Settings;
use crate::constants::{ATTACHMENT_REPLY, GENERATION_FAILED_NOTICE};
use crate::error::ChatError;
use crate::llm_interaction::InferenceClient;
use crate::prompt;
use crate::sentiment::SentimentAnalyzer;

/// Bound on undelivered outbound events per connection.
pub const OUTBOUND_CAPACITY: usize = 32;

/// A file or media item attached to an inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    #[serde(default)]
    pub mime: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub content: String,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl InboundMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            elements: Vec::new(),
        }
    }
}

/// Events relayed to the UI for a single turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// A complete message that is not streamed.
    Reply { id: Uuid, content: String },
    /// An empty assistant message was created; tokens follow.
    Start { id: Uuid },
    Token { id: Uuid, token: String },
    /// The message is complete.
    End { id: Uuid },
    /// Generation stopped early. Tokens already sent stay visible.
    Failed { id: Uuid, error: String },
    /// The inbound message was rejected before any reply was started.
    Error { error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    StaticReply,
    Completed { response: String },
    Failed { partial: String },
    Rejected,
    /// The receiver went away mid-turn.
    Abandoned { partial: String },
}

/// Holds the shared, read-only pieces every turn needs.
pub struct Conversation {
    analyzer: Arc<SentimentAnalyzer>,
    client: InferenceClient,
    system_prompt: String,
    max_tokens: u32,
}

impl Conversation {
    pub fn new(
        analyzer: Arc<SentimentAnalyzer>,
        client: InferenceClient,
        system_prompt: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            analyzer,
            client,
            system_prompt: system_prompt.into(),
            max_tokens,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Arc::new(SentimentAnalyzer::new()),
            InferenceClient::from_settings(settings),
            settings.system_prompt.clone(),
            settings.max_tokens,
        )
    }

    /// Handles one inbound message, sending every outbound event through `tx`.
    #[instrument(skip_all, fields(content_len = message.content.len(), elements = message.elements.len()))]
    pub async fn on_message(
        &self,
        message: InboundMessage,
        tx: &mpsc::Sender<OutboundEvent>,
    ) -> TurnOutcome {
        if !message.elements.is_empty() {
            info!("Message carries attachments; sending static reply");
            let reply = OutboundEvent::Reply {
                id: Uuid::new_v4(),
                content: ATTACHMENT_REPLY.to_string(),
            };
            if tx.send(reply).await.is_err() {
                warn!("Outbound channel closed before static reply was sent");
            }
            return TurnOutcome::StaticReply;
        }

        let sentiment = match self.analyzer.analyze(&message.content) {
            Ok(sentiment) => sentiment,
            Err(e) => {
                warn!(error = %e, "Rejecting inbound message");
                let _ = tx.send(OutboundEvent::Error { error: e.to_string() }).await;
                return TurnOutcome::Rejected;
            }
        };

        let formatted_prompt = prompt::compose(&self.system_prompt, &message.content, &sentiment);
        debug!(prompt_len = formatted_prompt.len(), overall = ?sentiment.overall, "Prompt composed");

        let id = Uuid::new_v4();
        if tx.send(OutboundEvent::Start { id }).await.is_err() {
            warn!("Outbound channel closed before streaming started");
            return TurnOutcome::Abandoned { partial: String::new() };
        }

        let mut response = String::new();
        let mut tokens = self.client.stream(&formatted_prompt, self.max_tokens);

        while let Some(item) = tokens.next().await {
            match item {
                Ok(token) => {
                    response.push_str(&token);
                    if tx.send(OutboundEvent::Token { id, token }).await.is_err() {
                        warn!(received = response.len(), "Outbound channel closed mid-stream; dropping turn");
                        return TurnOutcome::Abandoned { partial: response };
                    }
                }
                Err(e) => {
                    error!(error = %e, partial_len = response.len(), "Generation failed");
                    let _ = tx
                        .send(OutboundEvent::Failed {
                            id,
                            error: GENERATION_FAILED_NOTICE.to_string(),
                        })
                        .await;
                    return TurnOutcome::Failed { partial: response };
                }
            }
        }

        if tx.send(OutboundEvent::End { id }).await.is_err() {
            warn!(received = response.len(), "Outbound channel closed before the reply was committed");
            return TurnOutcome::Abandoned { partial: response };
        }
        info!(response_len = response.len(), "Turn completed");
        TurnOutcome::Completed { response }
    }
}

/// Parses one line of terminal input. `/file <path>` attaches a file, `/quit` ends the session.
fn parse_terminal_line(line: &str) -> Option<InboundMessage> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim() == "/quit" {
        return None;
    }
    if let Some(path) = line.strip_prefix("/file ") {
        let path = path.trim();
        let name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());
        return Some(InboundMessage {
            content: String::new(),
            elements: vec![Element {
                name,
                mime: None,
                path: Some(path.to_string()),
            }],
        });
    }
    Some(InboundMessage::text(line))
}

/// Interactive stdin/stdout chat driving the same turn logic as the web UI.
pub async fn run_terminal_chat(conversation: Arc<Conversation>) -> Result<()> {
    info!("Starting terminal chat...");
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(b"Ashley is here. Type a message, /file <path> to attach, /quit to leave.\n")
        .await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"\nYou: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await.context("Failed to read from stdin")? else {
            break;
        };
        let Some(message) = parse_terminal_line(&line) else {
            break;
        };
        if message.elements.is_empty() && message.content.trim().is_empty() {
            continue;
        }

        let (tx, mut rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let turn_conversation = conversation.clone();
        let turn = tokio::spawn(async move { turn_conversation.on_message(message, &tx).await });

        while let Some(event) = rx.recv().await {
            match event {
                OutboundEvent::Reply { content, .. } => {
                    stdout.write_all(format!("Ashley: {}\n", content).as_bytes()).await?;
                }
                OutboundEvent::Start { .. } => stdout.write_all(b"Ashley: ").await?,
                OutboundEvent::Token { token, .. } => {
                    stdout.write_all(token.as_bytes()).await?;
                    stdout.flush().await?;
                }
                OutboundEvent::End { .. } => stdout.write_all(b"\n").await?,
                OutboundEvent::Failed { error, .. } => {
                    stdout.write_all(format!("\n[{}]\n", error).as_bytes()).await?;
                }
                OutboundEvent::Error { error } => {
                    stdout.write_all(format!("[{}]\n", error).as_bytes()).await?;
                }
            }
        }
        stdout.flush().await?;

        let outcome = turn.await.context("Chat turn task panicked")?;
        debug!(?outcome, "Terminal turn finished");
    }

    info!("Terminal chat finished.");
    Ok(())
}

/// Maps an undecodable client frame to the same error the analyzer uses.
pub fn invalid_frame(reason: impl std::fmt::Display) -> OutboundEvent {
    OutboundEvent::Error {
        error: ChatError::InvalidInput(reason.to_string()).to_string(),
    }
}
