//! Request orchestration against the completion endpoint
//!
//! [`RequestOrchestrator`] owns one outbound call: it fetches the credential,
//! builds the JSON body, POSTs it and turns whatever comes back into a
//! displayable string. Failures never escape as errors from
//! [`RequestOrchestrator::send`]; each failure class resolves to its own
//! bracketed placeholder (see [`RequestError`]).
//!
//! [`RequestSlot`] is the single-slot resource that keeps at most one
//! request pending per session.

use crate::config::EndpointConfig;
use crate::credentials::CredentialStore;
use crate::error::{AtchatError, RequestError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Placeholder used when the endpoint answers without candidate text
pub const NO_RESPONSE: &str = "[No response from model]";

/// Request body: `{ contents: [{ parts: [{ text }] }] }`
#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

impl<'a> GenerateContentRequest<'a> {
    fn single(prompt: &'a str) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        }
    }
}

/// Success/error response shape
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Outcome of one completion call, always displayable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Assistant text, or the placeholder for the failure
    pub content: String,
    /// Failure class when the call did not succeed
    pub failure: Option<RequestError>,
}

impl Reply {
    /// Build a reply from a typed completion result
    pub fn from_result(result: std::result::Result<String, RequestError>) -> Self {
        match result {
            Ok(content) => Self {
                content,
                failure: None,
            },
            Err(err) => Self {
                content: err.to_string(),
                failure: Some(err),
            },
        }
    }

    /// Whether the model produced an answer
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Whether the call was skipped for lack of a credential
    pub fn is_missing_credential(&self) -> bool {
        matches!(self.failure, Some(RequestError::MissingCredential))
    }
}

/// Anything that turns a prompt into a displayable reply
///
/// Implementations never fail: every failure class is folded into
/// [`Reply::failure`] with a placeholder as the content.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send one prompt and wait for the reply
    async fn send(&self, prompt: &str) -> Reply;
}

/// Client for the fixed completion endpoint
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use atchat::config::EndpointConfig;
/// use atchat::credentials::KeyringStore;
/// use atchat::orchestrator::RequestOrchestrator;
///
/// # async fn example() -> atchat::error::Result<()> {
/// let orchestrator = RequestOrchestrator::new(
///     &EndpointConfig::default(),
///     Arc::new(KeyringStore::new("atchat")),
///     "geminiApiKey",
/// )?;
/// let reply = orchestrator.send("Hello!").await;
/// println!("{}", reply.content);
/// # Ok(())
/// # }
/// ```
pub struct RequestOrchestrator {
    client: Client,
    endpoint_url: String,
    timeout: Duration,
    credentials: Arc<dyn CredentialStore>,
    secret_name: String,
}

impl RequestOrchestrator {
    /// Create an orchestrator for the configured endpoint
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(
        endpoint: &EndpointConfig,
        credentials: Arc<dyn CredentialStore>,
        secret_name: impl Into<String>,
    ) -> Result<Self> {
        let timeout = Duration::from_secs(endpoint.timeout_seconds);
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint_url: endpoint.generate_content_url(),
            timeout,
            credentials,
            secret_name: secret_name.into(),
        })
    }

    /// Full endpoint URL (without the credential)
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// Send `prompt` and always resolve to a displayable reply
    pub async fn send(&self, prompt: &str) -> Reply {
        let reply = Reply::from_result(self.complete(prompt).await);
        match &reply.failure {
            None => tracing::info!(chars = reply.content.len(), "Received assistant reply"),
            Some(err) => tracing::error!(kind = err.kind(), "Completion request failed: {}", err),
        }
        reply
    }

    /// Send `prompt` and return the typed outcome
    pub async fn complete(&self, prompt: &str) -> std::result::Result<String, RequestError> {
        let body = GenerateContentRequest::single(prompt);

        let request = {
            let key = match self.credentials.get_secret(&self.secret_name) {
                Ok(Some(key)) => key,
                Ok(None) => {
                    tracing::warn!(secret = %self.secret_name, "No API key stored");
                    return Err(RequestError::MissingCredential);
                }
                Err(e) => {
                    tracing::warn!("Credential lookup failed: {}", e);
                    return Err(RequestError::MissingCredential);
                }
            };
            self.client
                .post(&self.endpoint_url)
                .query(&[("key", key.as_str())])
                .json(&body)
        };

        tracing::debug!(url = %self.endpoint_url, chars = prompt.len(), "Sending completion request");

        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;

        parse_completion(status, &text)
    }

    fn transport_error(&self, err: reqwest::Error) -> RequestError {
        if err.is_timeout() {
            RequestError::Timeout(self.timeout)
        } else {
            // the URL carries the key as a query parameter
            RequestError::Transport(err.without_url().to_string())
        }
    }
}

#[async_trait]
impl CompletionClient for RequestOrchestrator {
    async fn send(&self, prompt: &str) -> Reply {
        RequestOrchestrator::send(self, prompt).await
    }
}

/// Interpret a response body
///
/// A body that is not a JSON object is malformed; an `error` member is an
/// endpoint error; otherwise the first candidate's first text part is the
/// answer, falling back to [`NO_RESPONSE`].
pub(crate) fn parse_completion(
    status: StatusCode,
    body: &str,
) -> std::result::Result<String, RequestError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| RequestError::MalformedResponse(e.to_string()))?;
    if !value.is_object() {
        return Err(RequestError::MalformedResponse(
            "expected a JSON object".to_string(),
        ));
    }

    let response: GenerateContentResponse = serde_json::from_value(value)
        .map_err(|e| RequestError::MalformedResponse(e.to_string()))?;

    if let Some(error) = response.error {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(RequestError::Endpoint(message));
    }

    if !status.is_success() {
        return Err(RequestError::Endpoint(format!("HTTP {}", status)));
    }

    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .filter(|t| !t.is_empty());

    Ok(text.unwrap_or_else(|| NO_RESPONSE.to_string()))
}

/// Single-slot resource guarding the one pending request
///
/// Acquisition fails fast instead of waiting.
#[derive(Debug, Clone)]
pub struct RequestSlot {
    semaphore: Arc<Semaphore>,
}

/// Held while a request is pending; dropping it frees the slot
#[derive(Debug)]
pub struct SlotGuard {
    _permit: OwnedSemaphorePermit,
}

impl RequestSlot {
    /// Create a free slot
    pub fn new() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
        }
    }

    /// Take the slot, or fail with [`AtchatError::RequestInFlight`]
    pub fn try_acquire(&self) -> std::result::Result<SlotGuard, AtchatError> {
        Arc::clone(&self.semaphore)
            .try_acquire_owned()
            .map(|permit| SlotGuard { _permit: permit })
            .map_err(|_| AtchatError::RequestInFlight)
    }

    /// Whether a request currently holds the slot
    pub fn is_busy(&self) -> bool {
        self.semaphore.available_permits() == 0
    }
}

impl Default for RequestSlot {
    fn default() -> Self {
        Self::new()
    }
}
