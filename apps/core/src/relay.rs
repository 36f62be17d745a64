use std::fmt::{Display, Formatter};
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::contract::{
    PromptRequest, TitleRequest, TitleResponse, TranslateRequest, TranslateResponse,
};

/// Decoded answer text, in arrival order, ending at end-of-stream or the first error.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, RelayError>> + Send>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    Transport(String),
    Application { status: u16, body: String },
    Decode(String),
}

impl RelayError {
    /// The one line shown in the error region.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(message) => format!("Network error: {message}"),
            Self::Application { status, body } => {
                let body = body.trim();
                if body.is_empty() {
                    format!("Error ({status}): the relay rejected the request")
                } else {
                    format!("Error ({status}): {body}")
                }
            }
            Self::Decode(message) => format!("Error: malformed response: {message}"),
        }
    }
}

impl Display for RelayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "transport error: {message}"),
            Self::Application { status, body } => {
                write!(f, "relay responded with status {status}: {body}")
            }
            Self::Decode(message) => write!(f, "decode error: {message}"),
        }
    }
}

impl std::error::Error for RelayError {}

impl From<reqwest::Error> for RelayError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Decode(value.to_string())
        } else {
            Self::Transport(value.to_string())
        }
    }
}

/// The three operations the pipeline needs from the model relay.
#[async_trait]
pub trait RelayClient: Send + Sync {
    async fn stream_prompt(
        &self,
        request: PromptRequest,
        use_high_capability_model: bool,
    ) -> Result<TextStream, RelayError>;

    async fn translate(&self, request: TranslateRequest) -> Result<TranslateResponse, RelayError>;

    async fn summarize_title(&self, request: TitleRequest) -> Result<TitleResponse, RelayError>;
}

#[derive(Debug, Clone)]
pub struct HttpRelayClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRelayClient {
    pub fn new(base_url: &str, connect_timeout: Duration) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn post(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<reqwest::Response, RelayError> {
        let response = self
            .client
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Application {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, RelayError> {
        let response = self.post(path, body).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|error| RelayError::Decode(error.to_string()))
    }
}

#[async_trait]
impl RelayClient for HttpRelayClient {
    async fn stream_prompt(
        &self,
        request: PromptRequest,
        use_high_capability_model: bool,
    ) -> Result<TextStream, RelayError> {
        let path = format!("prompt/{use_high_capability_model}");
        let response = self.post(&path, &request).await?;
        let bytes = Box::pin(response.bytes_stream());

        let stream = futures_util::stream::unfold(
            (bytes, Utf8ChunkDecoder::default(), false),
            |(mut bytes, mut decoder, finished)| async move {
                if finished {
                    return None;
                }
                loop {
                    match bytes.next().await {
                        Some(Ok(chunk)) => match decoder.push(&chunk) {
                            Ok(text) if text.is_empty() => continue,
                            Ok(text) => return Some((Ok(text), (bytes, decoder, false))),
                            Err(error) => return Some((Err(error), (bytes, decoder, true))),
                        },
                        Some(Err(error)) => {
                            return Some((Err(RelayError::from(error)), (bytes, decoder, true)))
                        }
                        None => {
                            return match decoder.finish() {
                                Ok(()) => None,
                                Err(error) => Some((Err(error), (bytes, decoder, true))),
                            }
                        }
                    }
                }
            },
        );

        Ok(Box::pin(stream))
    }

    async fn translate(&self, request: TranslateRequest) -> Result<TranslateResponse, RelayError> {
        self.post_json("translate", &request).await
    }

    async fn summarize_title(&self, request: TitleRequest) -> Result<TitleResponse, RelayError> {
        self.post_json("title", &request).await
    }
}

/// Turns a byte stream into text without splitting multi-byte characters
/// that straddle two network chunks.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Result<String, RelayError> {
        self.pending.extend_from_slice(chunk);
        match std::str::from_utf8(&self.pending) {
            Ok(text) => {
                let out = text.to_string();
                self.pending.clear();
                Ok(out)
            }
            Err(error) if error.error_len().is_some() => {
                Err(RelayError::Decode("invalid UTF-8 in response body".to_string()))
            }
            Err(error) => {
                let valid = error.valid_up_to();
                let out = String::from_utf8_lossy(&self.pending[..valid]).into_owned();
                self.pending.drain(..valid);
                Ok(out)
            }
        }
    }

    pub fn finish(&mut self) -> Result<(), RelayError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        self.pending.clear();
        Err(RelayError::Decode(
            "response body ended inside a UTF-8 sequence".to_string(),
        ))
    }
}
