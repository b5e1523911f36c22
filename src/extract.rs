//! MIME body extraction from Gmail part trees
//!
//! Recursively walks the nested part structure returned by the Gmail API,
//! decodes base64url body data, accumulates plain-text and readable HTML
//! text, and pages large HTML output by character window. Also locates
//! downloadable attachment parts for the attachment tools.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

/// Default character window for paged HTML output
///
/// Bounds response size toward the MCP host; callers page through larger
/// bodies using the returned `next_offset`.
pub const DEFAULT_HTML_LIMIT: usize = 10_000;

/// Maximum part nesting depth accepted before the walk aborts
///
/// Real MIME nesting is a handful of levels; the cap guards the recursion
/// against pathological upstream data.
const MAX_PART_DEPTH: usize = 64;

/// Node in the Gmail message payload tree
///
/// Mirrors the `payload` structure of `users.messages.get` with
/// `format=full`. A part may carry inline body data, child parts, both, or
/// neither.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MimePart {
    /// MIME type of this part (e.g., `text/plain`, `multipart/alternative`)
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Attachment filename; empty or absent for inline parts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Inline body payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<PartBody>,
    /// Child parts for multipart containers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parts: Option<Vec<MimePart>>,
}

/// Body payload of a single part
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartBody {
    /// Payload size in bytes as reported by the API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// base64url-encoded content, possibly without trailing padding
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Identifier for out-of-line attachment content
    #[serde(rename = "attachmentId", skip_serializing_if = "Option::is_none")]
    pub attachment_id: Option<String>,
}

/// Result of a body extraction
///
/// `text` is always returned whole; only the HTML accumulator is windowed,
/// since it aggregates markup-derived text across many leaf parts and can
/// grow large.
#[derive(Debug, Clone)]
pub struct BodyExtract {
    /// Concatenated `text/plain` leaf contents, pre-order
    pub text: String,
    /// Requested character window over the HTML accumulator
    pub html: String,
    /// Whether the HTML accumulator extends past `offset + limit`
    pub truncated: bool,
    /// Offset for the next window, present only when truncated
    pub next_offset: Option<usize>,
}

/// Downloadable attachment located in a part tree
#[derive(Debug, Clone)]
pub struct AttachmentRef {
    /// Filename from the part
    pub filename: String,
    /// Gmail attachment identifier for the attachments endpoint
    pub attachment_id: String,
    /// MIME type of the attachment part
    pub mime_type: Option<String>,
}

/// Extract readable body content from a message part tree
///
/// Performs a pre-order depth-first walk. `text/plain` leaves contribute
/// decoded content verbatim; `text/html` leaves contribute the text of their
/// `<p>` and `<div>` elements joined by newlines (an intentional
/// simplification, not a full renderer). Other mime types contribute
/// nothing. A part's own data never suppresses its children; contributions
/// are summed.
///
/// # Errors
///
/// - `InvalidBase64` if any part's data is not valid base64url
/// - `Decode` (naming the part's mime type) if decoded bytes are not UTF-8
/// - `InvalidInput` if nesting exceeds the depth cap
///
/// A failing part aborts the whole extraction; a corrupt part would make
/// downstream offsets meaningless.
pub fn extract(root: &MimePart, offset: usize, limit: usize) -> AppResult<BodyExtract> {
    let mut text = String::new();
    let mut html = String::new();
    walk(root, 0, &mut text, &mut html)?;

    let total_chars = html.chars().count();
    let truncated = total_chars > offset.saturating_add(limit);
    let chunk: String = html.chars().skip(offset).take(limit).collect();

    Ok(BodyExtract {
        text,
        html: chunk,
        truncated,
        next_offset: truncated.then(|| offset + limit),
    })
}

/// Recursive pre-order walk accumulating text and HTML contributions
fn walk(part: &MimePart, depth: usize, text: &mut String, html: &mut String) -> AppResult<()> {
    if depth > MAX_PART_DEPTH {
        return Err(AppError::invalid(format!(
            "message part nesting exceeds {MAX_PART_DEPTH} levels"
        )));
    }

    if let Some(body) = &part.body
        && let Some(data) = &body.data
        && !data.is_empty()
    {
        let mime_type = part.mime_type.as_deref().unwrap_or("");
        let content = decode_base64url(data).map_err(|e| match e {
            AppError::Decode(_) => AppError::Decode(mime_type.to_owned()),
            other => other,
        })?;

        match mime_type {
            "text/plain" => text.push_str(&content),
            "text/html" => html.push_str(&readable_html_text(&content)?),
            _ => {}
        }
    }

    if let Some(parts) = &part.parts {
        for sub in parts {
            walk(sub, depth + 1, text, html)?;
        }
    }
    Ok(())
}

/// Extract the text of every `<p>` and `<div>` element from HTML markup
///
/// Text nodes are trimmed and concatenated per element, and element
/// fragments joined with newlines. Other tags are ignored even when they
/// contain visible text.
fn readable_html_text(markup: &str) -> AppResult<String> {
    let document = Html::parse_document(markup);
    let selector = Selector::parse("p, div")
        .map_err(|e| AppError::Internal(format!("invalid html selector: {e:?}")))?;

    let fragments: Vec<String> = document
        .select(&selector)
        .map(|element| element.text().map(str::trim).collect::<String>())
        .collect();
    Ok(fragments.join("\n"))
}

/// Decode a base64url string (padding optional) into UTF-8 text
///
/// The Gmail API and JWT-style encodings commonly omit trailing `=`
/// padding; the required padding is computed and appended before decoding
/// with the URL-safe alphabet.
///
/// # Errors
///
/// - `InvalidBase64` if the padded string is not valid base64url
/// - `Decode` if the decoded bytes are not valid UTF-8
pub fn decode_base64url(data: &str) -> AppResult<String> {
    let padding = (4 - data.len() % 4) % 4;
    let padded = format!("{}{}", data, "=".repeat(padding));
    let bytes = decode_base64url_bytes_padded(&padded)?;
    String::from_utf8(bytes).map_err(|e| AppError::Decode(e.to_string()))
}

/// Decode base64url (padding optional) into raw bytes
///
/// Used for attachment content, which need not be text.
pub fn decode_base64url_bytes(data: &str) -> AppResult<Vec<u8>> {
    let padding = (4 - data.len() % 4) % 4;
    let padded = format!("{}{}", data, "=".repeat(padding));
    decode_base64url_bytes_padded(&padded)
}

fn decode_base64url_bytes_padded(padded: &str) -> AppResult<Vec<u8>> {
    URL_SAFE
        .decode(padded)
        .map_err(|e| AppError::InvalidBase64(e.to_string()))
}

/// Collect downloadable attachments from a part tree
///
/// An attachment part is one carrying both a non-empty filename and an
/// attachment id. The walk shares the extraction depth cap.
pub fn collect_attachments(root: &MimePart) -> AppResult<Vec<AttachmentRef>> {
    let mut found = Vec::new();
    collect_attachments_inner(root, 0, &mut found)?;
    Ok(found)
}

fn collect_attachments_inner(
    part: &MimePart,
    depth: usize,
    found: &mut Vec<AttachmentRef>,
) -> AppResult<()> {
    if depth > MAX_PART_DEPTH {
        return Err(AppError::invalid(format!(
            "message part nesting exceeds {MAX_PART_DEPTH} levels"
        )));
    }

    if let Some(filename) = &part.filename
        && !filename.is_empty()
        && let Some(body) = &part.body
        && let Some(attachment_id) = &body.attachment_id
    {
        found.push(AttachmentRef {
            filename: filename.clone(),
            attachment_id: attachment_id.clone(),
            mime_type: part.mime_type.clone(),
        });
    }

    if let Some(parts) = &part.parts {
        for sub in parts {
            collect_attachments_inner(sub, depth + 1, found)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    use super::{
        AttachmentRef, MimePart, PartBody, collect_attachments, decode_base64url, extract,
    };
    use crate::compose::{ComposeRequest, compose};
    use crate::errors::AppError;

    fn leaf(mime_type: &str, content: &str) -> MimePart {
        MimePart {
            mime_type: Some(mime_type.to_owned()),
            body: Some(PartBody {
                data: Some(URL_SAFE_NO_PAD.encode(content)),
                ..PartBody::default()
            }),
            ..MimePart::default()
        }
    }

    fn container(parts: Vec<MimePart>) -> MimePart {
        MimePart {
            mime_type: Some("multipart/mixed".to_owned()),
            parts: Some(parts),
            ..MimePart::default()
        }
    }

    #[test]
    fn decodes_unpadded_base64url() {
        assert_eq!(decode_base64url("aGVsbG8").expect("must decode"), "hello");
    }

    #[test]
    fn decodes_padded_base64url() {
        assert_eq!(decode_base64url("aGVsbG8=").expect("must decode"), "hello");
    }

    #[test]
    fn rejects_malformed_base64() {
        let err = decode_base64url("!!!not-base64!!!").expect_err("must fail");
        assert!(matches!(err, AppError::InvalidBase64(_)));
    }

    #[test]
    fn rejects_non_utf8_payload() {
        // 0xFF 0xFE is not valid UTF-8
        let data = URL_SAFE_NO_PAD.encode([0xFF_u8, 0xFE]);
        let err = decode_base64url(&data).expect_err("must fail");
        assert!(matches!(err, AppError::Decode(_)));
    }

    #[test]
    fn extracts_text_and_html_from_two_leaf_tree() {
        let root = container(vec![
            leaf("text/plain", "Hello"),
            container(vec![leaf("text/html", "<div>World</div>")]),
        ]);
        let result = extract(&root, 0, 100).expect("must extract");
        assert_eq!(result.text, "Hello");
        assert_eq!(result.html, "World");
        assert!(!result.truncated);
        assert_eq!(result.next_offset, None);
    }

    #[test]
    fn ignores_markup_outside_p_and_div_elements() {
        let root = leaf(
            "text/html",
            "<h1>Title</h1><p>First</p><span>skipped</span><div>Second</div>",
        );
        let result = extract(&root, 0, 100).expect("must extract");
        assert_eq!(result.html, "First\nSecond");
    }

    #[test]
    fn non_text_parts_contribute_nothing() {
        let root = container(vec![
            leaf("text/plain", "body"),
            leaf("image/png", "binarydata"),
        ]);
        let result = extract(&root, 0, 100).expect("must extract");
        assert_eq!(result.text, "body");
        assert_eq!(result.html, "");
    }

    #[test]
    fn part_with_data_and_children_sums_contributions() {
        let mut root = leaf("text/plain", "outer ");
        root.parts = Some(vec![leaf("text/plain", "inner")]);
        let result = extract(&root, 0, 100).expect("must extract");
        assert_eq!(result.text, "outer inner");
    }

    #[test]
    fn pages_large_html_in_character_windows() {
        let markup = format!("<div>{}</div>", "a".repeat(15_000));
        let root = leaf("text/html", &markup);

        let first = extract(&root, 0, 10_000).expect("must extract");
        assert_eq!(first.html.chars().count(), 10_000);
        assert!(first.truncated);
        assert_eq!(first.next_offset, Some(10_000));

        let second = extract(&root, 10_000, 10_000).expect("must extract");
        assert_eq!(second.html.chars().count(), 5_000);
        assert!(!second.truncated);
        assert_eq!(second.next_offset, None);
    }

    #[test]
    fn text_accumulator_is_never_paginated() {
        let root = leaf("text/plain", &"x".repeat(500));
        let result = extract(&root, 0, 10).expect("must extract");
        assert_eq!(result.text.len(), 500);
    }

    #[test]
    fn malformed_part_aborts_whole_extraction() {
        let bad = MimePart {
            mime_type: Some("text/plain".to_owned()),
            body: Some(PartBody {
                data: Some("!!!bad!!!".to_owned()),
                ..PartBody::default()
            }),
            ..MimePart::default()
        };
        let root = container(vec![leaf("text/plain", "fine"), container(vec![bad])]);
        let err = extract(&root, 0, 100).expect_err("must fail");
        assert!(matches!(err, AppError::InvalidBase64(_)));
    }

    #[test]
    fn decode_error_names_failing_mime_type() {
        let bad = MimePart {
            mime_type: Some("text/html".to_owned()),
            body: Some(PartBody {
                data: Some(URL_SAFE_NO_PAD.encode([0xFF_u8, 0xFE])),
                ..PartBody::default()
            }),
            ..MimePart::default()
        };
        let err = extract(&bad, 0, 100).expect_err("must fail");
        match err {
            AppError::Decode(mime_type) => assert_eq!(mime_type, "text/html"),
            other => panic!("expected Decode error, got {other}"),
        }
    }

    #[test]
    fn rejects_pathologically_deep_nesting() {
        let mut node = leaf("text/plain", "deep");
        for _ in 0..70 {
            node = container(vec![node]);
        }
        let err = extract(&node, 0, 100).expect_err("must fail");
        assert!(err.to_string().contains("nesting"));
    }

    #[test]
    fn composed_plain_text_survives_extraction_round_trip() {
        let request = ComposeRequest {
            from: "me".to_owned(),
            to: vec!["user@example.com".to_owned()],
            cc: None,
            bcc: None,
            subject: "Round trip".to_owned(),
            body: "The quick brown fox\r\njumps over the lazy dog.".to_owned(),
            in_reply_to: None,
            attachments: Vec::new(),
        };
        let raw = String::from_utf8(compose(&request).expect("compose")).expect("utf-8");
        let (_, body) = raw.split_once("\r\n\r\n").expect("separator");

        let root = leaf("text/plain", body);
        let result = extract(&root, 0, 100).expect("must extract");
        assert_eq!(result.text, request.body);
    }

    #[test]
    fn collects_attachment_parts_with_filename_and_id() {
        let attachment = MimePart {
            mime_type: Some("application/pdf".to_owned()),
            filename: Some("invoice.pdf".to_owned()),
            body: Some(PartBody {
                attachment_id: Some("att-1".to_owned()),
                size: Some(1024),
                data: None,
            }),
            parts: None,
        };
        let root = container(vec![leaf("text/plain", "see attached"), attachment]);

        let found = collect_attachments(&root).expect("must collect");
        assert_eq!(found.len(), 1);
        let AttachmentRef {
            filename,
            attachment_id,
            mime_type,
        } = &found[0];
        assert_eq!(filename, "invoice.pdf");
        assert_eq!(attachment_id, "att-1");
        assert_eq!(mime_type.as_deref(), Some("application/pdf"));
    }

    #[test]
    fn gmail_payload_json_deserializes_into_part_tree() {
        let payload = serde_json::json!({
            "mimeType": "multipart/alternative",
            "body": { "size": 0 },
            "parts": [
                {
                    "mimeType": "text/plain",
                    "body": { "size": 15, "data": "SnVzdCBwbGFpbiB0ZXh0" }
                },
                {
                    "mimeType": "text/html",
                    "body": { "size": 30, "data": URL_SAFE_NO_PAD.encode("<p>Just plain text</p>") }
                }
            ]
        });
        let root: MimePart = serde_json::from_value(payload).expect("must deserialize");
        let result = extract(&root, 0, 100).expect("must extract");
        assert_eq!(result.text, "Just plain text");
        assert_eq!(result.html, "Just plain text");
    }
}
