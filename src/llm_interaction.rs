use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::error::ChatError;

/// Text fragments in generation order. Ends after `[DONE]`, body exhaustion, or the first error.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send + 'static>>;

// OpenAI-compatible chat completion request (HF Inference / TGI)
#[derive(Serialize, Debug)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize, Debug)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct ChatCompletionChunk {
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize, Debug)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Deserialize, Debug, Default)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

// TGI reports mid-stream failures as an event carrying only an error field.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum StreamPayload {
    Error {
        error: String,
        #[serde(default)]
        error_type: Option<String>,
    },
    Chunk(ChatCompletionChunk),
}

/// Stateless handle to the hosted completion endpoint; clone freely.
#[derive(Clone, Debug)]
pub struct InferenceClient {
    http: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl InferenceClient {
    pub fn new(inference_url: &str, model: &str, api_key: &str) -> Self {
        Self {
            http: Client::new(),
            endpoint: format!(
                "{}/{}/v1/chat/completions",
                inference_url.trim_end_matches('/'),
                model
            ),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.inference_url, &settings.model, &settings.api_key)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends `prompt` as a single user turn and streams the reply.
    /// Nothing is sent until the returned stream is first polled.
    pub fn stream(&self, prompt: &str, max_tokens: u32) -> TokenStream {
        let http = self.http.clone();
        let endpoint = self.endpoint.clone();
        let model = self.model.clone();
        let api_key = self.api_key.clone();
        let prompt = prompt.to_string();

        Box::pin(async_stream::try_stream! {
            let request_payload = ChatCompletionRequest {
                model: &model,
                messages: vec![ChatMessage { role: "user", content: &prompt }],
                max_tokens,
                stream: true,
            };

            info!(%endpoint, %model, max_tokens, prompt_len = prompt.len(), "Requesting streamed completion");
            let response = http
                .post(&endpoint)
                .bearer_auth(&api_key)
                .json(&request_payload)
                .send()
                .await
                .map_err(|e| {
                    error!(error = %e, "Failed to reach inference service");
                    ChatError::RemoteService(format!("request to {} failed: {}", endpoint, e))
                })?;

            let response = ensure_success(response).await?;

            let events = response.bytes_stream().eventsource();
            futures::pin_mut!(events);
            let mut fragments = 0usize;

            while let Some(event) = events.next().await {
                let event = event.map_err(|e| {
                    error!(error = %e, fragments, "Completion stream interrupted");
                    ChatError::RemoteService(format!("stream error: {}", e))
                })?;

                let data = event.data.trim();
                if data.is_empty() {
                    continue;
                }
                if data == "[DONE]" {
                    break;
                }

                if let Some(token) = parse_event_data(data)? {
                    fragments += 1;
                    yield token;
                }
            }

            debug!(fragments, "Completion stream finished");
        })
    }
}

/// Turns a non-success response into a `RemoteService` error carrying the status and body.
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ChatError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let error_body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error body".to_string());
    error!(%status, %error_body, "Inference API request failed");
    Err(ChatError::RemoteService(format!(
        "inference API returned {}: {}",
        status, error_body
    )))
}

/// Extracts the text fragment from one SSE `data:` payload.
/// Chunks without content yield `None`; malformed chunks are logged and skipped.
fn parse_event_data(data: &str) -> Result<Option<String>, ChatError> {
    match serde_json::from_str::<StreamPayload>(data) {
        Ok(StreamPayload::Chunk(chunk)) => Ok(chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|text| !text.is_empty())),
        Ok(StreamPayload::Error { error, error_type }) => {
            error!(%error, ?error_type, "Inference service reported an error mid-stream");
            Err(ChatError::RemoteService(error))
        }
        Err(e) => {
            warn!("Failed to parse stream chunk: {} - Error: {}", data, e);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_is_model_scoped() {
        let client = InferenceClient::new("https://example.test/models/", "org/model", "k");
        assert_eq!(
            client.endpoint(),
            "https://example.test/models/org/model/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_shape() {
        let request = ChatCompletionRequest {
            model: "org/model",
            messages: vec![ChatMessage { role: "user", content: "hi" }],
            max_tokens: 500,
            stream: true,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "model": "org/model",
                "messages": [{"role": "user", "content": "hi"}],
                "max_tokens": 500,
                "stream": true
            })
        );
    }

    #[test]
    fn test_payload_parsing() {
        let chunk: StreamPayload = serde_json::from_str(
            r#"{"id":"x","choices":[{"index":0,"delta":{"role":"assistant","content":"Hi"},"finish_reason":null}]}"#,
        )
        .unwrap();
        match chunk {
            StreamPayload::Chunk(c) => assert_eq!(c.choices[0].delta.content.as_deref(), Some("Hi")),
            other => panic!("unexpected payload: {:?}", other),
        }

        let finish: StreamPayload =
            serde_json::from_str(r#"{"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#)
                .unwrap();
        match finish {
            StreamPayload::Chunk(c) => assert!(c.choices[0].delta.content.is_none()),
            other => panic!("unexpected payload: {:?}", other),
        }

        let failure: StreamPayload =
            serde_json::from_str(r#"{"error":"Model is overloaded","error_type":"overloaded"}"#)
                .unwrap();
        assert!(matches!(failure, StreamPayload::Error { .. }));
    }

    #[test]
    fn test_parse_event_data() {
        assert_eq!(
            parse_event_data(r#"{"choices":[{"delta":{"content":"Hello"}}]}"#).unwrap(),
            Some("Hello".to_string())
        );
        assert_eq!(
            parse_event_data(r#"{"choices":[{"delta":{"content":""}}]}"#).unwrap(),
            None
        );
        assert_eq!(parse_event_data(r#"{"choices":[]}"#).unwrap(), None);
        assert_eq!(parse_event_data("not json").unwrap(), None);
        assert_eq!(
            parse_event_data(r#"{"error":"Input validation error"}"#).unwrap_err(),
            ChatError::RemoteService("Input validation error".to_string())
        );
    }
}
