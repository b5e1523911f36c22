//! Gmail REST API collaborator
//!
//! Thin transport layer over the Gmail v1 API. Owns the HTTP client and
//! bearer token and is passed explicitly into tool handlers; the compose and
//! extract cores never touch it, keeping them pure and testable offline.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::ServerConfig;
use crate::errors::{AppError, AppResult};
use crate::extract::MimePart;

/// Maximum error body length carried into upstream error messages
const ERROR_BODY_MAX_LEN: usize = 512;

/// Gmail API client
///
/// Cheap to clone; `reqwest::Client` is internally reference-counted.
#[derive(Debug, Clone)]
pub struct GmailClient {
    http: Client,
    base_url: String,
    access_token: SecretString,
}

/// Message resource returned by `users.messages.get`
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    /// Message identifier
    pub id: String,
    /// Owning thread identifier
    #[serde(rename = "threadId")]
    pub thread_id: Option<String>,
    /// Root of the MIME part tree
    pub payload: Option<MessagePayload>,
}

/// Payload root: a [`MimePart`] plus the header list Gmail attaches to it
#[derive(Debug, Clone, Deserialize)]
pub struct MessagePayload {
    /// Message headers as name/value pairs
    pub headers: Option<Vec<Header>>,
    /// The MIME part tree itself
    #[serde(flatten)]
    pub part: MimePart,
}

/// Single message header
#[derive(Debug, Clone, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// Stub entry in a message list response
#[derive(Debug, Clone, Deserialize)]
pub struct MessageStub {
    pub id: String,
}

/// Response of `users.messages.list`
#[derive(Debug, Clone, Deserialize)]
pub struct MessageList {
    pub messages: Option<Vec<MessageStub>>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

/// Thread resource returned by `users.threads.get`
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadResponse {
    pub id: String,
    pub messages: Option<Vec<MessageResponse>>,
}

/// Label resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
    /// `system` or `user`
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub label_type: Option<String>,
    #[serde(rename = "messageListVisibility", skip_serializing_if = "Option::is_none")]
    pub message_list_visibility: Option<String>,
    #[serde(rename = "labelListVisibility", skip_serializing_if = "Option::is_none")]
    pub label_list_visibility: Option<String>,
}

/// Response of `users.labels.list`
#[derive(Debug, Clone, Deserialize)]
struct LabelList {
    labels: Option<Vec<Label>>,
}

/// Attachment body returned by `users.messages.attachments.get`
#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentData {
    /// base64url-encoded bytes
    pub data: Option<String>,
}

impl GmailClient {
    /// Build a client from server configuration
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the underlying HTTP client cannot be constructed.
    pub fn new(config: &ServerConfig) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            access_token: config.access_token.clone(),
        })
    }

    /// Send a composed MIME message
    ///
    /// The raw bytes are base64url-encoded without padding into the `raw`
    /// transport envelope. Returns the new message id.
    pub async fn send_message(&self, raw: &[u8], thread_id: Option<&str>) -> AppResult<String> {
        let mut payload = json!({ "raw": URL_SAFE_NO_PAD.encode(raw) });
        if let Some(thread_id) = thread_id {
            payload["threadId"] = json!(thread_id);
        }
        let response = self
            .request(Method::POST, "users/me/messages/send")
            .json(&payload)
            .send()
            .await
            .map_err(request_error)?;
        let sent: MessageStub = self.read_json(response).await?;
        debug!(message_id = %sent.id, "message sent");
        Ok(sent.id)
    }

    /// Create a draft from a composed MIME message, returning the draft id
    pub async fn create_draft(&self, raw: &[u8], thread_id: Option<&str>) -> AppResult<String> {
        let mut message = json!({ "raw": URL_SAFE_NO_PAD.encode(raw) });
        if let Some(thread_id) = thread_id {
            message["threadId"] = json!(thread_id);
        }
        let response = self
            .request(Method::POST, "users/me/drafts")
            .json(&json!({ "message": message }))
            .send()
            .await
            .map_err(request_error)?;

        #[derive(Deserialize)]
        struct Draft {
            id: String,
        }
        let draft: Draft = self.read_json(response).await?;
        debug!(draft_id = %draft.id, "draft created");
        Ok(draft.id)
    }

    /// Fetch a full message including its MIME part tree
    pub async fn get_message(&self, message_id: &str) -> AppResult<MessageResponse> {
        let response = self
            .request(Method::GET, &format!("users/me/messages/{message_id}"))
            .query(&[("format", "full")])
            .send()
            .await
            .map_err(request_error)?;
        self.read_json(response).await
    }

    /// Fetch message metadata limited to the Subject, From, and Date headers
    pub async fn get_message_metadata(&self, message_id: &str) -> AppResult<MessageResponse> {
        let response = self
            .request(Method::GET, &format!("users/me/messages/{message_id}"))
            .query(&[
                ("format", "metadata"),
                ("metadataHeaders", "Subject"),
                ("metadataHeaders", "From"),
                ("metadataHeaders", "Date"),
            ])
            .send()
            .await
            .map_err(request_error)?;
        self.read_json(response).await
    }

    /// List message ids matching a Gmail search query
    pub async fn list_messages(
        &self,
        query: Option<&str>,
        max_results: usize,
        page_token: Option<&str>,
    ) -> AppResult<MessageList> {
        let mut request = self
            .request(Method::GET, "users/me/messages")
            .query(&[("maxResults", max_results.to_string())]);
        if let Some(query) = query {
            request = request.query(&[("q", query)]);
        }
        if let Some(page_token) = page_token {
            request = request.query(&[("pageToken", page_token)]);
        }
        let response = request.send().await.map_err(request_error)?;
        self.read_json(response).await
    }

    /// Permanently delete a message
    pub async fn delete_message(&self, message_id: &str) -> AppResult<()> {
        let response = self
            .request(Method::DELETE, &format!("users/me/messages/{message_id}"))
            .send()
            .await
            .map_err(request_error)?;
        self.ensure_success(response).await?;
        debug!(message_id, "message deleted");
        Ok(())
    }

    /// Add and/or remove label ids on a message
    pub async fn modify_message_labels(
        &self,
        message_id: &str,
        add_label_ids: &[String],
        remove_label_ids: &[String],
    ) -> AppResult<()> {
        let mut body = serde_json::Map::new();
        if !add_label_ids.is_empty() {
            body.insert("addLabelIds".to_owned(), json!(add_label_ids));
        }
        if !remove_label_ids.is_empty() {
            body.insert("removeLabelIds".to_owned(), json!(remove_label_ids));
        }
        let response = self
            .request(
                Method::POST,
                &format!("users/me/messages/{message_id}/modify"),
            )
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;
        self.ensure_success(response).await?;
        Ok(())
    }

    /// List all labels
    pub async fn list_labels(&self) -> AppResult<Vec<Label>> {
        let response = self
            .request(Method::GET, "users/me/labels")
            .send()
            .await
            .map_err(request_error)?;
        let list: LabelList = self.read_json(response).await?;
        Ok(list.labels.unwrap_or_default())
    }

    /// Create a label
    pub async fn create_label(&self, body: serde_json::Value) -> AppResult<Label> {
        let response = self
            .request(Method::POST, "users/me/labels")
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;
        self.read_json(response).await
    }

    /// Patch an existing label
    pub async fn update_label(&self, label_id: &str, patch: serde_json::Value) -> AppResult<Label> {
        let response = self
            .request(Method::PATCH, &format!("users/me/labels/{label_id}"))
            .json(&patch)
            .send()
            .await
            .map_err(request_error)?;
        self.read_json(response).await
    }

    /// Delete a label
    pub async fn delete_label(&self, label_id: &str) -> AppResult<()> {
        let response = self
            .request(Method::DELETE, &format!("users/me/labels/{label_id}"))
            .send()
            .await
            .map_err(request_error)?;
        self.ensure_success(response).await?;
        debug!(label_id, "label deleted");
        Ok(())
    }

    /// Fetch the base64url content blob of an attachment
    pub async fn get_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> AppResult<AttachmentData> {
        let response = self
            .request(
                Method::GET,
                &format!("users/me/messages/{message_id}/attachments/{attachment_id}"),
            )
            .send()
            .await
            .map_err(request_error)?;
        self.read_json(response).await
    }

    /// Fetch a thread with all of its messages
    pub async fn get_thread(&self, thread_id: &str) -> AppResult<ThreadResponse> {
        let response = self
            .request(Method::GET, &format!("users/me/threads/{thread_id}"))
            .query(&[("format", "metadata")])
            .send()
            .await
            .map_err(request_error)?;
        self.read_json(response).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!(%method, path, "gmail api request");
        self.http
            .request(method, format!("{}/{path}", self.base_url))
            .bearer_auth(self.access_token.expose_secret())
    }

    /// Map an error status to an `AppError`, or parse the JSON body
    async fn read_json<T: serde::de::DeserializeOwned>(&self, response: Response) -> AppResult<T> {
        let response = self.ensure_success(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| AppError::Upstream(format!("failed to parse gmail response: {e}")))
    }

    async fn ensure_success(&self, response: Response) -> AppResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(ERROR_BODY_MAX_LEN).collect();
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                AppError::AuthFailed(format!("gmail api rejected credentials: {snippet}"))
            }
            StatusCode::NOT_FOUND => AppError::NotFound(format!("gmail resource: {snippet}")),
            _ => AppError::Upstream(format!("gmail api returned {status}: {snippet}")),
        })
    }
}

/// Map transport-level failures (connect, timeout) to `AppError`
fn request_error(err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::Upstream(format!("gmail api request timed out: {err}"))
    } else {
        AppError::Upstream(format!("gmail api request failed: {err}"))
    }
}

/// Get a header value by case-insensitive name
pub fn header_value(headers: &[Header], name: &str) -> Option<String> {
    headers
        .iter()
        .find_map(|h| h.name.eq_ignore_ascii_case(name).then(|| h.value.clone()))
}

#[cfg(test)]
mod tests {
    use super::{MessageResponse, header_value};

    #[test]
    fn header_value_is_case_insensitive() {
        let message: MessageResponse = serde_json::from_value(serde_json::json!({
            "id": "m1",
            "threadId": "t1",
            "payload": {
                "mimeType": "text/plain",
                "headers": [
                    { "name": "Subject", "value": "Hi" },
                    { "name": "From", "value": "sender@example.com" }
                ],
                "body": { "size": 2, "data": "aGk" }
            }
        }))
        .expect("must deserialize");

        let payload = message.payload.expect("payload present");
        let headers = payload.headers.expect("headers present");
        assert_eq!(header_value(&headers, "subject").as_deref(), Some("Hi"));
        assert_eq!(header_value(&headers, "X-Missing"), None);
        assert_eq!(payload.part.mime_type.as_deref(), Some("text/plain"));
    }
}
