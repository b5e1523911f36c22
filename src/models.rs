//! Input/output DTOs and schema-bearing types
//!
//! Defines all data structures used in MCP tool contracts. Each type is
//! annotated with `JsonSchema` for automatic schema generation.

use chrono::{SecondsFormat, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::extract::DEFAULT_HTML_LIMIT;
use crate::gmail::Label;
use crate::labels::LabelUpdate;

/// Metadata included in all tool responses
///
/// Provides timing information and current UTC timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Meta {
    /// Current UTC timestamp in RFC 3339 format with milliseconds
    pub now_utc: String,
    /// Tool execution duration in milliseconds
    pub duration_ms: u64,
}

impl Meta {
    /// Create metadata populated with current time and elapsed duration
    pub fn now(duration_ms: u64) -> Self {
        Self {
            now_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            duration_ms,
        }
    }
}

/// Standard response envelope for all tools
///
/// Wraps tool-specific data with human-readable summary and execution metadata.
/// This structure provides consistent response shape across all MCP tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ToolEnvelope<T>
where
    T: JsonSchema,
{
    /// Human-readable summary of the operation outcome
    pub summary: String,
    /// Tool-specific data payload
    pub data: T,
    /// Execution metadata (timestamp, duration)
    pub meta: Meta,
}

/// Attachment supplied inline with a send/draft request
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AttachmentInput {
    /// Filename emitted in the attachment part
    pub filename: String,
    /// File content, standard base64 encoded
    pub data_base64: String,
}

/// Input: send an email or create a draft
///
/// Used by `gmail_send_email` and `gmail_create_draft`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SendEmailInput {
    /// Recipient addresses (required, non-empty)
    pub to: Vec<String>,
    /// Subject line; non-ASCII text is RFC 2047 encoded automatically
    pub subject: String,
    /// Plain-text message body
    pub body: String,
    /// Carbon-copy addresses
    pub cc: Option<Vec<String>>,
    /// Blind carbon-copy addresses
    pub bcc: Option<Vec<String>>,
    /// Message ID being replied to; sets In-Reply-To and References headers
    pub in_reply_to: Option<String>,
    /// Thread to attach the message to
    pub thread_id: Option<String>,
    /// Inline attachments
    pub attachments: Option<Vec<AttachmentInput>>,
}

/// Input: read an email body with HTML paging
///
/// Used by `gmail_read_email`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ReadEmailInput {
    /// Message identifier
    pub message_id: String,
    /// Character offset into the HTML accumulator
    #[serde(default)]
    pub html_offset: usize,
    /// Maximum HTML characters to return (default 10000)
    #[serde(default = "default_html_limit")]
    pub html_limit: usize,
}

/// Output: extracted message body
///
/// `text` is always complete; `html` is the requested character window with
/// `next_offset` pointing at the next page when truncated.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EmailBody {
    /// Concatenated plain-text content, never paginated
    pub text: String,
    /// Requested window of readable text extracted from HTML parts
    pub html: String,
    /// Whether more HTML content remains past this window
    pub truncated: bool,
    /// Offset of the next window; absent when the window reached the end
    pub next_offset: Option<usize>,
}

/// Input: search messages
///
/// Used by `gmail_search_emails`. Pagination follows the Gmail API's opaque
/// page tokens.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchEmailsInput {
    /// Gmail search query (e.g., `is:unread newer_than:1d`)
    pub query: Option<String>,
    /// Maximum messages to return (1..100, default 10)
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Page token from a previous search result
    pub page_token: Option<String>,
}

/// Message summary for search and thread results
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EmailSummary {
    /// Message identifier
    pub id: String,
    /// Owning thread identifier
    pub thread_id: Option<String>,
    /// Parsed Subject header
    pub subject: Option<String>,
    /// Parsed From header
    pub from: Option<String>,
    /// Parsed Date header
    pub date: Option<String>,
}

/// Output: search result page
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchResult {
    /// Matching message summaries
    pub messages: Vec<EmailSummary>,
    /// Token for the next page, absent on the last page
    pub next_page_token: Option<String>,
}

/// Input: delete a message permanently
///
/// Requires explicit `confirm=true` and write-enabled configuration.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DeleteEmailInput {
    /// Message identifier
    pub message_id: String,
    /// Explicit confirmation required (must be `true`)
    pub confirm: bool,
}

/// Input: message id only
///
/// Used by the mark-read/unread/important tools and attachment download.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct MessageIdInput {
    /// Message identifier
    pub message_id: String,
}

/// Input: add/remove label ids on a message
///
/// Requires at least one of `add_label_ids`/`remove_label_ids`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ModifyLabelsInput {
    /// Message identifier
    pub message_id: String,
    /// Label ids to add
    pub add_label_ids: Option<Vec<String>>,
    /// Label ids to remove
    pub remove_label_ids: Option<Vec<String>>,
}

/// Label metadata exposed to tools
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LabelInfo {
    /// Label identifier
    pub id: String,
    /// Label name
    pub name: String,
    /// `system` or `user`
    pub label_type: Option<String>,
}

impl From<Label> for LabelInfo {
    fn from(label: Label) -> Self {
        Self {
            id: label.id,
            name: label.name,
            label_type: label.label_type,
        }
    }
}

/// Input: create a label (also used by get-or-create)
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateLabelInput {
    /// Label name
    pub name: String,
    /// Visibility in the message list (default `show`)
    #[serde(default = "default_message_list_visibility")]
    pub message_list_visibility: String,
    /// Visibility in the label list (default `labelShow`)
    #[serde(default = "default_label_list_visibility")]
    pub label_list_visibility: String,
}

/// Input: update a label located by name
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdateLabelInput {
    /// Name of the label to update
    pub name: String,
    /// Fields to change
    pub updates: LabelUpdate,
}

/// Input: delete a label located by name
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DeleteLabelInput {
    /// Name of the label to delete
    pub name: String,
    /// Explicit confirmation required (must be `true`)
    pub confirm: bool,
}

/// Input: label name only
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct LabelNameInput {
    /// Label name
    pub name: String,
}

/// Attachment saved to disk by the download tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SavedAttachment {
    /// Original attachment filename
    pub filename: String,
    /// Path the file was written to
    pub path: String,
    /// Size in bytes
    pub size_bytes: usize,
    /// MIME type of the attachment part
    pub mime_type: Option<String>,
}

/// Input: thread id only
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetThreadInput {
    /// Thread identifier
    pub thread_id: String,
}

/// Output: thread with per-message summaries
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ThreadDetail {
    /// Thread identifier
    pub thread_id: String,
    /// Messages in the thread, oldest first
    pub messages: Vec<EmailSummary>,
}

/// Default value for `html_limit` in read_email
///
/// Bounds the HTML window so a single response cannot overwhelm the host;
/// callers page through larger bodies via `next_offset`.
fn default_html_limit() -> usize {
    DEFAULT_HTML_LIMIT
}

/// Default value for `max_results` in search
///
/// Chosen as a reasonable balance between response size and pagination
/// overhead.
fn default_max_results() -> usize {
    10
}

fn default_message_list_visibility() -> String {
    "show".to_owned()
}

fn default_label_list_visibility() -> String {
    "labelShow".to_owned()
}
