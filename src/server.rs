//! MCP server implementation with tool handlers
//!
//! Implements the `ServerHandler` trait and registers the Gmail tools.
//! Handles input validation, business logic orchestration, and response
//! formatting. The compose/extract cores stay pure; all I/O goes through
//! the injected [`GmailClient`].

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{ErrorData, ServerCapabilities, ServerInfo};
use rmcp::{Json, ServerHandler, tool, tool_handler, tool_router};
use tracing::info;

use crate::compose::{Attachment, ComposeRequest, compose};
use crate::config::ServerConfig;
use crate::errors::{AppError, AppResult};
use crate::extract::{collect_attachments, decode_base64url_bytes, extract};
use crate::gmail::{GmailClient, MessageResponse, header_value};
use crate::labels;
use crate::models::{
    CreateLabelInput, DeleteEmailInput, DeleteLabelInput, EmailBody, EmailSummary, GetThreadInput,
    LabelInfo, LabelNameInput, MessageIdInput, Meta, ModifyLabelsInput, ReadEmailInput,
    SavedAttachment, SearchEmailsInput, SearchResult, SendEmailInput, ThreadDetail, ToolEnvelope,
    UpdateLabelInput,
};

/// Maximum messages per search page
const MAX_SEARCH_RESULTS: usize = 100;
/// Maximum HTML window size per read
const MAX_HTML_LIMIT: usize = 100_000;

/// Gmail MCP server
///
/// Holds shared configuration and the API client. Implements MCP tool
/// handlers via `#[tool]` attribute macro and `ServerHandler` trait.
#[derive(Clone)]
pub struct GmailMcpServer {
    /// Server config (credentials, base URL, write flag)
    config: Arc<ServerConfig>,
    /// Gmail API collaborator
    client: GmailClient,
    /// Tool router for dispatching MCP tool calls
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl GmailMcpServer {
    /// Create a new MCP server instance
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the HTTP client cannot be constructed.
    pub fn new(config: ServerConfig) -> AppResult<Self> {
        let client = GmailClient::new(&config)?;
        Ok(Self {
            config: Arc::new(config),
            client,
            tool_router: Self::tool_router(),
        })
    }

    /// Tool: Send an email
    ///
    /// Composes a MIME message from structured fields and transmits it.
    /// Supports reply threading and inline attachments.
    #[tool(name = "gmail_send_email", description = "Send an email")]
    async fn send_email(
        &self,
        Parameters(input): Parameters<SendEmailInput>,
    ) -> Result<Json<ToolEnvelope<serde_json::Value>>, ErrorData> {
        let started = Instant::now();
        finalize_tool(
            started,
            self.send_email_impl(input)
                .await
                .map(|id| (format!("Email sent: {id}"), serde_json::json!({ "id": id }))),
        )
    }

    /// Tool: Create an email draft
    ///
    /// Composes the same MIME message as send, but stores it as a draft.
    #[tool(name = "gmail_create_draft", description = "Create an email draft")]
    async fn create_draft(
        &self,
        Parameters(input): Parameters<SendEmailInput>,
    ) -> Result<Json<ToolEnvelope<serde_json::Value>>, ErrorData> {
        let started = Instant::now();
        finalize_tool(
            started,
            self.create_draft_impl(input)
                .await
                .map(|id| (format!("Draft created: {id}"), serde_json::json!({ "id": id }))),
        )
    }

    /// Tool: Read an email body
    ///
    /// Extracts plain text and readable HTML text from the message's MIME
    /// part tree. Large HTML output is paged by character window.
    #[tool(name = "gmail_read_email", description = "Read an email body with HTML paging")]
    async fn read_email(
        &self,
        Parameters(input): Parameters<ReadEmailInput>,
    ) -> Result<Json<ToolEnvelope<EmailBody>>, ErrorData> {
        let started = Instant::now();
        finalize_tool(
            started,
            self.read_email_impl(input)
                .await
                .map(|body| ("Message body extracted".to_owned(), body)),
        )
    }

    /// Tool: Search messages with Gmail query syntax
    #[tool(name = "gmail_search_emails", description = "Search messages with Gmail query syntax")]
    async fn search_emails(
        &self,
        Parameters(input): Parameters<SearchEmailsInput>,
    ) -> Result<Json<ToolEnvelope<SearchResult>>, ErrorData> {
        let started = Instant::now();
        finalize_tool(
            started,
            self.search_emails_impl(input).await.map(|result| {
                (
                    format!("{} message(s) returned", result.messages.len()),
                    result,
                )
            }),
        )
    }

    /// Tool: Permanently delete a message
    ///
    /// Requires explicit `confirm=true` and `GMAIL_WRITE_ENABLED=true`.
    #[tool(name = "gmail_delete_email", description = "Permanently delete a message")]
    async fn delete_email(
        &self,
        Parameters(input): Parameters<DeleteEmailInput>,
    ) -> Result<Json<ToolEnvelope<serde_json::Value>>, ErrorData> {
        let started = Instant::now();
        finalize_tool(
            started,
            self.delete_email_impl(input).await.map(|id| {
                (
                    format!("Email deleted: {id}"),
                    serde_json::json!({ "id": id }),
                )
            }),
        )
    }

    /// Tool: Add or remove labels on a message
    #[tool(name = "gmail_modify_labels", description = "Add or remove labels on a message")]
    async fn modify_labels(
        &self,
        Parameters(input): Parameters<ModifyLabelsInput>,
    ) -> Result<Json<ToolEnvelope<serde_json::Value>>, ErrorData> {
        let started = Instant::now();
        finalize_tool(
            started,
            self.modify_labels_impl(input).await.map(|id| {
                (
                    format!("Labels modified: {id}"),
                    serde_json::json!({ "id": id }),
                )
            }),
        )
    }

    /// Tool: List all labels
    #[tool(name = "gmail_list_labels", description = "List all Gmail labels")]
    async fn list_labels(&self) -> Result<Json<ToolEnvelope<Vec<LabelInfo>>>, ErrorData> {
        let started = Instant::now();
        let result = self.client.list_labels().await.map(|labels| {
            let infos: Vec<LabelInfo> = labels.into_iter().map(LabelInfo::from).collect();
            let system = infos
                .iter()
                .filter(|l| l.label_type.as_deref() == Some("system"))
                .count();
            let summary = format!(
                "{} label(s) ({} system, {} user)",
                infos.len(),
                system,
                infos.len() - system
            );
            (summary, infos)
        });
        finalize_tool(started, result)
    }

    /// Tool: Create a label
    #[tool(name = "gmail_create_label", description = "Create a Gmail label")]
    async fn create_label(
        &self,
        Parameters(input): Parameters<CreateLabelInput>,
    ) -> Result<Json<ToolEnvelope<LabelInfo>>, ErrorData> {
        let started = Instant::now();
        finalize_tool(
            started,
            self.create_label_impl(input).await.map(|label| {
                (
                    format!("Label created: {}: {}", label.id, label.name),
                    label,
                )
            }),
        )
    }

    /// Tool: Update a label located by name
    ///
    /// Accepts a closed set of updatable fields; colors must come from the
    /// Gmail palette.
    #[tool(name = "gmail_update_label", description = "Update a Gmail label by name")]
    async fn update_label(
        &self,
        Parameters(input): Parameters<UpdateLabelInput>,
    ) -> Result<Json<ToolEnvelope<LabelInfo>>, ErrorData> {
        let started = Instant::now();
        finalize_tool(
            started,
            self.update_label_impl(input).await.map(|label| {
                (
                    format!("Label updated: {}: {}", label.id, label.name),
                    label,
                )
            }),
        )
    }

    /// Tool: Delete a label located by name
    ///
    /// Requires explicit `confirm=true` and `GMAIL_WRITE_ENABLED=true`.
    #[tool(name = "gmail_delete_label", description = "Delete a Gmail label by name")]
    async fn delete_label(
        &self,
        Parameters(input): Parameters<DeleteLabelInput>,
    ) -> Result<Json<ToolEnvelope<serde_json::Value>>, ErrorData> {
        let started = Instant::now();
        finalize_tool(
            started,
            self.delete_label_impl(input).await.map(|name| {
                (
                    format!("Label deleted: {name}"),
                    serde_json::json!({ "name": name }),
                )
            }),
        )
    }

    /// Tool: Get a label by name, creating it if missing
    #[tool(
        name = "gmail_get_or_create_label",
        description = "Get a label by name or create it"
    )]
    async fn get_or_create_label(
        &self,
        Parameters(input): Parameters<CreateLabelInput>,
    ) -> Result<Json<ToolEnvelope<LabelInfo>>, ErrorData> {
        let started = Instant::now();
        finalize_tool(
            started,
            self.get_or_create_label_impl(input).await.map(|label| {
                (format!("Label ready: {}: {}", label.id, label.name), label)
            }),
        )
    }

    /// Tool: Find a label by name
    #[tool(name = "gmail_find_label", description = "Find a Gmail label by name")]
    async fn find_label(
        &self,
        Parameters(input): Parameters<LabelNameInput>,
    ) -> Result<Json<ToolEnvelope<LabelInfo>>, ErrorData> {
        let started = Instant::now();
        finalize_tool(
            started,
            self.find_label_impl(input).await.map(|label| {
                (
                    format!("Label found: {}: {}", label.id, label.name),
                    label,
                )
            }),
        )
    }

    /// Tool: Download all attachments of a message
    ///
    /// Saves decoded attachment bytes under the configured directory.
    #[tool(
        name = "gmail_download_attachments",
        description = "Download all attachments of a message"
    )]
    async fn download_attachments(
        &self,
        Parameters(input): Parameters<MessageIdInput>,
    ) -> Result<Json<ToolEnvelope<Vec<SavedAttachment>>>, ErrorData> {
        let started = Instant::now();
        finalize_tool(
            started,
            self.download_attachments_impl(input).await.map(|saved| {
                (format!("{} attachment(s) saved", saved.len()), saved)
            }),
        )
    }

    /// Tool: Get a thread with per-message summaries
    #[tool(name = "gmail_get_thread", description = "Get a thread with message summaries")]
    async fn get_thread(
        &self,
        Parameters(input): Parameters<GetThreadInput>,
    ) -> Result<Json<ToolEnvelope<ThreadDetail>>, ErrorData> {
        let started = Instant::now();
        finalize_tool(
            started,
            self.get_thread_impl(input).await.map(|thread| {
                (
                    format!("{} message(s) in thread", thread.messages.len()),
                    thread,
                )
            }),
        )
    }

    /// Tool: Mark a message as read
    #[tool(name = "gmail_mark_read", description = "Mark a message as read")]
    async fn mark_read(
        &self,
        Parameters(input): Parameters<MessageIdInput>,
    ) -> Result<Json<ToolEnvelope<serde_json::Value>>, ErrorData> {
        let started = Instant::now();
        finalize_tool(
            started,
            self.set_system_label(&input.message_id, &[], &["UNREAD"])
                .await
                .map(|id| (format!("Marked read: {id}"), serde_json::json!({ "id": id }))),
        )
    }

    /// Tool: Mark a message as unread
    #[tool(name = "gmail_mark_unread", description = "Mark a message as unread")]
    async fn mark_unread(
        &self,
        Parameters(input): Parameters<MessageIdInput>,
    ) -> Result<Json<ToolEnvelope<serde_json::Value>>, ErrorData> {
        let started = Instant::now();
        finalize_tool(
            started,
            self.set_system_label(&input.message_id, &["UNREAD"], &[])
                .await
                .map(|id| {
                    (
                        format!("Marked unread: {id}"),
                        serde_json::json!({ "id": id }),
                    )
                }),
        )
    }

    /// Tool: Mark a message as important
    #[tool(name = "gmail_mark_important", description = "Mark a message as important")]
    async fn mark_important(
        &self,
        Parameters(input): Parameters<MessageIdInput>,
    ) -> Result<Json<ToolEnvelope<serde_json::Value>>, ErrorData> {
        let started = Instant::now();
        finalize_tool(
            started,
            self.set_system_label(&input.message_id, &["IMPORTANT"], &[])
                .await
                .map(|id| {
                    (
                        format!("Marked important: {id}"),
                        serde_json::json!({ "id": id }),
                    )
                }),
        )
    }

    /// Tool: Remove the important marker from a message
    #[tool(
        name = "gmail_mark_not_important",
        description = "Remove the important marker from a message"
    )]
    async fn mark_not_important(
        &self,
        Parameters(input): Parameters<MessageIdInput>,
    ) -> Result<Json<ToolEnvelope<serde_json::Value>>, ErrorData> {
        let started = Instant::now();
        finalize_tool(
            started,
            self.set_system_label(&input.message_id, &[], &["IMPORTANT"])
                .await
                .map(|id| {
                    (
                        format!("Marked not important: {id}"),
                        serde_json::json!({ "id": id }),
                    )
                }),
        )
    }
}

/// MCP server handler implementation
///
/// Provides server info and capabilities to MCP client.
#[tool_handler(router = self.tool_router)]
impl ServerHandler for GmailMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build()).with_instructions(
            "Gmail MCP server. Read and send operations are enabled by default; deletion tools require GMAIL_WRITE_ENABLED=true.",
        )
    }
}

/// Tool implementation methods
///
/// Private methods handle the actual business logic for each tool, separated
/// from the public `#[tool]` methods that handle response formatting.
impl GmailMcpServer {
    async fn send_email_impl(&self, input: SendEmailInput) -> AppResult<String> {
        let thread_id = input.thread_id.clone();
        let request = self.build_compose_request(input)?;
        let raw = compose(&request)?;
        let id = self.client.send_message(&raw, thread_id.as_deref()).await?;
        info!(message_id = %id, "email sent");
        Ok(id)
    }

    async fn create_draft_impl(&self, input: SendEmailInput) -> AppResult<String> {
        let thread_id = input.thread_id.clone();
        let request = self.build_compose_request(input)?;
        let raw = compose(&request)?;
        let id = self.client.create_draft(&raw, thread_id.as_deref()).await?;
        info!(draft_id = %id, "draft created");
        Ok(id)
    }

    async fn read_email_impl(&self, input: ReadEmailInput) -> AppResult<EmailBody> {
        validate_resource_id(&input.message_id, "message_id")?;
        validate_range(input.html_limit, 1, MAX_HTML_LIMIT, "html_limit")?;

        let message = self.client.get_message(&input.message_id).await?;
        let payload = message.payload.ok_or_else(|| {
            AppError::NotFound(format!("message {} has no payload", input.message_id))
        })?;

        let body = extract(&payload.part, input.html_offset, input.html_limit)?;
        Ok(EmailBody {
            text: body.text,
            html: body.html,
            truncated: body.truncated,
            next_offset: body.next_offset,
        })
    }

    async fn search_emails_impl(&self, input: SearchEmailsInput) -> AppResult<SearchResult> {
        validate_range(input.max_results, 1, MAX_SEARCH_RESULTS, "max_results")?;

        let list = self
            .client
            .list_messages(
                input.query.as_deref(),
                input.max_results,
                input.page_token.as_deref(),
            )
            .await?;

        let mut messages = Vec::new();
        for stub in list.messages.unwrap_or_default() {
            let detail = self.client.get_message_metadata(&stub.id).await?;
            messages.push(summarize(detail));
        }

        Ok(SearchResult {
            messages,
            next_page_token: list.next_page_token,
        })
    }

    async fn delete_email_impl(&self, input: DeleteEmailInput) -> AppResult<String> {
        require_write_enabled(&self.config)?;
        validate_resource_id(&input.message_id, "message_id")?;
        if !input.confirm {
            return Err(AppError::invalid("delete requires confirm=true"));
        }
        self.client.delete_message(&input.message_id).await?;
        Ok(input.message_id)
    }

    async fn modify_labels_impl(&self, input: ModifyLabelsInput) -> AppResult<String> {
        validate_resource_id(&input.message_id, "message_id")?;
        let add = input.add_label_ids.unwrap_or_default();
        let remove = input.remove_label_ids.unwrap_or_default();
        if add.is_empty() && remove.is_empty() {
            return Err(AppError::invalid(
                "at least one of add_label_ids/remove_label_ids is required",
            ));
        }
        self.client
            .modify_message_labels(&input.message_id, &add, &remove)
            .await?;
        Ok(input.message_id)
    }

    async fn create_label_impl(&self, input: CreateLabelInput) -> AppResult<LabelInfo> {
        validate_label_name(&input.name)?;
        labels::validate_message_list_visibility(&input.message_list_visibility)?;
        labels::validate_label_list_visibility(&input.label_list_visibility)?;
        let label = self
            .client
            .create_label(serde_json::json!({
                "name": input.name,
                "messageListVisibility": input.message_list_visibility,
                "labelListVisibility": input.label_list_visibility,
            }))
            .await?;
        Ok(label.into())
    }

    async fn update_label_impl(&self, input: UpdateLabelInput) -> AppResult<LabelInfo> {
        validate_label_name(&input.name)?;
        let patch = input.updates.to_patch()?;
        let label = labels::find_label_by_name(&self.client, &input.name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("label '{}'", input.name)))?;
        let updated = self.client.update_label(&label.id, patch).await?;
        Ok(updated.into())
    }

    async fn delete_label_impl(&self, input: DeleteLabelInput) -> AppResult<String> {
        require_write_enabled(&self.config)?;
        validate_label_name(&input.name)?;
        if !input.confirm {
            return Err(AppError::invalid("delete requires confirm=true"));
        }
        let label = labels::find_label_by_name(&self.client, &input.name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("label '{}'", input.name)))?;
        self.client.delete_label(&label.id).await?;
        Ok(input.name)
    }

    async fn get_or_create_label_impl(&self, input: CreateLabelInput) -> AppResult<LabelInfo> {
        validate_label_name(&input.name)?;
        let label = labels::get_or_create_label(
            &self.client,
            &input.name,
            &input.message_list_visibility,
            &input.label_list_visibility,
        )
        .await?;
        Ok(label.into())
    }

    async fn find_label_impl(&self, input: LabelNameInput) -> AppResult<LabelInfo> {
        validate_label_name(&input.name)?;
        let label = labels::find_label_by_name(&self.client, &input.name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("label '{}'", input.name)))?;
        Ok(label.into())
    }

    async fn download_attachments_impl(
        &self,
        input: MessageIdInput,
    ) -> AppResult<Vec<SavedAttachment>> {
        validate_resource_id(&input.message_id, "message_id")?;

        let message = self.client.get_message(&input.message_id).await?;
        let payload = message.payload.ok_or_else(|| {
            AppError::NotFound(format!("message {} has no payload", input.message_id))
        })?;
        let attachments = collect_attachments(&payload.part)?;

        let dir = Path::new(&self.config.attachment_dir);
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| AppError::Internal(format!("failed to create attachment dir: {e}")))?;

        let mut saved = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            let blob = self
                .client
                .get_attachment(&input.message_id, &attachment.attachment_id)
                .await?;
            let data = blob.data.ok_or_else(|| {
                AppError::NotFound(format!(
                    "attachment {} has no data",
                    attachment.attachment_id
                ))
            })?;
            let bytes = decode_base64url_bytes(&data)?;

            let filename = sanitize_filename(&attachment.filename, &attachment.attachment_id);
            let path = dir.join(&filename);
            tokio::fs::write(&path, &bytes)
                .await
                .map_err(|e| AppError::Internal(format!("failed to write attachment: {e}")))?;
            info!(filename = %filename, size = bytes.len(), "attachment saved");

            saved.push(SavedAttachment {
                filename,
                path: path.to_string_lossy().into_owned(),
                size_bytes: bytes.len(),
                mime_type: attachment.mime_type,
            });
        }
        Ok(saved)
    }

    async fn get_thread_impl(&self, input: GetThreadInput) -> AppResult<ThreadDetail> {
        validate_resource_id(&input.thread_id, "thread_id")?;
        let thread = self.client.get_thread(&input.thread_id).await?;
        let messages = thread
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(summarize)
            .collect();
        Ok(ThreadDetail {
            thread_id: thread.id,
            messages,
        })
    }

    /// Shared implementation for the mark-read/unread/important tools
    async fn set_system_label(
        &self,
        message_id: &str,
        add: &[&str],
        remove: &[&str],
    ) -> AppResult<String> {
        validate_resource_id(message_id, "message_id")?;
        let add: Vec<String> = add.iter().map(|s| (*s).to_owned()).collect();
        let remove: Vec<String> = remove.iter().map(|s| (*s).to_owned()).collect();
        self.client
            .modify_message_labels(message_id, &add, &remove)
            .await?;
        Ok(message_id.to_owned())
    }

    /// Translate tool input into a compose request
    ///
    /// Decodes inline attachment content from standard base64.
    fn build_compose_request(&self, input: SendEmailInput) -> AppResult<ComposeRequest> {
        let mut attachments = Vec::new();
        for attachment in input.attachments.unwrap_or_default() {
            if attachment.filename.trim().is_empty() {
                return Err(AppError::invalid("attachment filename must not be empty"));
            }
            let data = STANDARD.decode(&attachment.data_base64).map_err(|e| {
                AppError::invalid(format!(
                    "attachment '{}' is not valid base64: {e}",
                    attachment.filename
                ))
            })?;
            attachments.push(Attachment {
                filename: attachment.filename,
                data,
            });
        }

        Ok(ComposeRequest {
            from: self.config.sender.clone(),
            to: input.to,
            cc: input.cc,
            bcc: input.bcc,
            subject: input.subject,
            body: input.body,
            in_reply_to: input.in_reply_to,
            attachments,
        })
    }
}

/// Calculate elapsed milliseconds
fn duration_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}

/// Build a standardized MCP tool response envelope from business logic output
fn finalize_tool<T>(
    started: Instant,
    result: AppResult<(String, T)>,
) -> Result<Json<ToolEnvelope<T>>, ErrorData>
where
    T: schemars::JsonSchema,
{
    match result {
        Ok((summary, data)) => Ok(Json(ToolEnvelope {
            summary,
            data,
            meta: Meta::now(duration_ms(started)),
        })),
        Err(e) => Err(e.to_error_data()),
    }
}

/// Build a message summary from a metadata response
fn summarize(message: MessageResponse) -> EmailSummary {
    let headers = message
        .payload
        .and_then(|p| p.headers)
        .unwrap_or_default();
    EmailSummary {
        id: message.id,
        thread_id: message.thread_id,
        subject: header_value(&headers, "Subject"),
        from: header_value(&headers, "From"),
        date: header_value(&headers, "Date"),
    }
}

/// Validate a Gmail message/thread identifier
///
/// Identifiers are opaque but always short, non-empty, and free of control
/// characters and path separators.
fn validate_resource_id(id: &str, field: &str) -> AppResult<()> {
    if id.is_empty() || id.len() > 128 {
        return Err(AppError::invalid(format!(
            "{field} must be 1..128 characters"
        )));
    }
    if id
        .chars()
        .any(|ch| ch.is_ascii_control() || matches!(ch, '/' | '\\' | ' '))
    {
        return Err(AppError::invalid(format!(
            "{field} must not contain spaces, slashes, or control characters"
        )));
    }
    Ok(())
}

/// Validate a label name
fn validate_label_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() || name.len() > 225 {
        return Err(AppError::invalid("label name must be 1..225 characters"));
    }
    if name.chars().any(|ch| ch.is_ascii_control()) {
        return Err(AppError::invalid(
            "label name must not contain control characters",
        ));
    }
    Ok(())
}

/// Validate numeric value in range
fn validate_range(value: usize, min: usize, max: usize, field: &str) -> AppResult<()> {
    if value < min || value > max {
        return Err(AppError::invalid(format!(
            "{field} must be in range {min}..{max}"
        )));
    }
    Ok(())
}

/// Check if destructive operations are enabled
fn require_write_enabled(config: &ServerConfig) -> AppResult<()> {
    if !config.write_enabled {
        return Err(AppError::invalid(
            "deletion tools are disabled; set GMAIL_WRITE_ENABLED=true",
        ));
    }
    Ok(())
}

/// Strip any path components from an attachment filename
///
/// Upstream filenames are untrusted; only the final component is kept and
/// an empty result falls back to the attachment id.
fn sanitize_filename(filename: &str, fallback: &str) -> String {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .trim_start_matches('.');
    if name.is_empty() {
        fallback.to_owned()
    } else {
        name.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::{sanitize_filename, validate_label_name, validate_range, validate_resource_id};

    #[test]
    fn accepts_typical_gmail_message_id() {
        validate_resource_id("18c2f1a9b3d4e5f6", "message_id").expect("must be valid");
    }

    #[test]
    fn rejects_message_id_with_path_separator() {
        let err = validate_resource_id("../etc/passwd", "message_id").expect_err("must fail");
        assert!(err.to_string().contains("message_id"));
    }

    #[test]
    fn rejects_empty_and_oversized_ids() {
        validate_resource_id("", "message_id").expect_err("empty must fail");
        validate_resource_id(&"x".repeat(200), "message_id").expect_err("oversized must fail");
    }

    #[test]
    fn rejects_control_chars_in_label_name() {
        let err = validate_label_name("bad\nname").expect_err("must fail");
        assert!(err.to_string().contains("control characters"));
    }

    #[test]
    fn validate_range_rejects_out_of_bounds() {
        validate_range(5, 1, 10, "limit").expect("in range");
        validate_range(0, 1, 10, "limit").expect_err("below min");
        validate_range(11, 1, 10, "limit").expect_err("above max");
    }

    #[test]
    fn sanitize_filename_strips_directories_and_dot_prefixes() {
        assert_eq!(sanitize_filename("report.pdf", "att-1"), "report.pdf");
        assert_eq!(sanitize_filename("../../evil.sh", "att-1"), "evil.sh");
        assert_eq!(sanitize_filename("dir\\file.txt", "att-1"), "file.txt");
        assert_eq!(sanitize_filename(".hidden", "att-1"), "hidden");
        assert_eq!(sanitize_filename("", "att-1"), "att-1");
        assert_eq!(sanitize_filename("..", "att-1"), "att-1");
    }
}
