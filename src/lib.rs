pub mod chat;
pub mod config;
pub mod constants;
pub mod error;
pub mod llm_interaction;
pub mod prompt;
pub mod sentiment;
pub mod subjectivity;
pub mod web_server;

pub use chat::{Conversation, InboundMessage, OutboundEvent, TurnOutcome};
pub use error::ChatError;
pub use sentiment::{SentimentAnalyzer, SentimentSummary};
