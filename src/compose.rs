//! MIME message composition
//!
//! Builds a transmittable RFC822 message from structured fields: validates
//! recipient addresses, encodes non-ASCII headers per RFC 2047, and assembles
//! single-part plain-text or `multipart/mixed` bodies with attachments.
//! Output is ready for base64url encoding into the Gmail `raw` field.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

/// Line width for base64 attachment content (RFC 2045 limit is 76)
const BASE64_LINE_WIDTH: usize = 76;

/// File attachment carried in a compose request
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Filename emitted in the Content-Disposition header
    pub filename: String,
    /// Raw file bytes (base64-encoded during composition)
    pub data: Vec<u8>,
}

/// Structured input for message composition
///
/// Request-scoped; constructed fresh per tool call and discarded after the
/// raw message bytes are handed to the transport layer.
#[derive(Debug, Clone)]
pub struct ComposeRequest {
    /// Sender identity (Gmail resolves the literal `me`)
    pub from: String,
    /// Recipient addresses; must be non-empty and each syntactically valid
    pub to: Vec<String>,
    /// Carbon-copy addresses
    pub cc: Option<Vec<String>>,
    /// Blind carbon-copy addresses
    pub bcc: Option<Vec<String>>,
    /// Subject line; may contain non-ASCII text
    pub subject: String,
    /// Plain-text body, emitted verbatim
    pub body: String,
    /// Message ID being replied to; sets In-Reply-To and References
    pub in_reply_to: Option<String>,
    /// Ordered attachments; presence switches the message to multipart/mixed
    pub attachments: Vec<Attachment>,
}

/// Compose a complete MIME message with CRLF line endings
///
/// Headers are emitted in a fixed order (From, To, Cc, Bcc, Subject,
/// In-Reply-To/References, MIME-Version, Content-Type,
/// Content-Transfer-Encoding) since some receivers are sensitive to
/// position. Pure transform; no I/O.
///
/// # Errors
///
/// - `InvalidAddress` if any `to` recipient fails the syntax check
/// - `Internal` if the address pattern fails to compile
pub fn compose(request: &ComposeRequest) -> AppResult<Vec<u8>> {
    if request.to.is_empty() {
        return Err(AppError::invalid("at least one recipient is required"));
    }

    let address_pattern = address_regex()?;
    for addr in &request.to {
        if !address_pattern.is_match(addr) {
            return Err(AppError::InvalidAddress(addr.clone()));
        }
    }

    let mut headers: Vec<String> = Vec::new();
    headers.push(format!("From: {}", request.from));
    headers.push(format!("To: {}", request.to.join(", ")));
    if let Some(cc) = &request.cc
        && !cc.is_empty()
    {
        headers.push(format!("Cc: {}", cc.join(", ")));
    }
    if let Some(bcc) = &request.bcc
        && !bcc.is_empty()
    {
        headers.push(format!("Bcc: {}", bcc.join(", ")));
    }
    headers.push(format!("Subject: {}", encode_header(&request.subject)));
    if let Some(reply_id) = &request.in_reply_to {
        headers.push(format!("In-Reply-To: {reply_id}"));
        headers.push(format!("References: {reply_id}"));
    }
    headers.push("MIME-Version: 1.0".to_owned());

    let message = if request.attachments.is_empty() {
        headers.push("Content-Type: text/plain; charset=UTF-8".to_owned());
        headers.push("Content-Transfer-Encoding: 7bit".to_owned());
        format!("{}\r\n\r\n{}", headers.join("\r\n"), request.body)
    } else {
        let boundary = generate_boundary();
        headers.push(format!(
            "Content-Type: multipart/mixed; boundary=\"{boundary}\""
        ));
        headers.push("Content-Transfer-Encoding: 7bit".to_owned());
        format!(
            "{}\r\n\r\n{}",
            headers.join("\r\n"),
            multipart_body(&boundary, &request.body, &request.attachments)
        )
    };

    Ok(message.into_bytes())
}

/// Permissive address syntax check
///
/// Requires a non-empty local part, `@`, and a domain containing at least
/// one dot, with no whitespace anywhere. Not an exhaustive RFC 5322
/// validation.
fn address_regex() -> AppResult<Regex> {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
        .map_err(|e| AppError::Internal(format!("invalid address regex: {e}")))
}

/// Encode a header value per RFC 2047 when it contains non-ASCII text
///
/// ASCII-only values pass through unchanged. Anything else is wrapped as a
/// single `=?UTF-8?B?...?=` encoded word, since raw non-ASCII bytes in a
/// header line violate the message transport format.
pub fn encode_header(text: &str) -> String {
    if text.is_ascii() {
        text.to_owned()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(text.as_bytes()))
    }
}

/// Generate a random multipart boundary token
///
/// A UUID gives enough entropy that collision with message content is not a
/// practical concern.
fn generate_boundary() -> String {
    format!("part_{}", Uuid::new_v4().as_simple())
}

/// Assemble the multipart/mixed body: text part first, then attachments
fn multipart_body(boundary: &str, body: &str, attachments: &[Attachment]) -> String {
    let mut out = String::new();
    out.push_str(&format!("--{boundary}\r\n"));
    out.push_str("Content-Type: text/plain; charset=UTF-8\r\n");
    out.push_str("Content-Transfer-Encoding: 7bit\r\n\r\n");
    out.push_str(body);
    out.push_str("\r\n");

    for attachment in attachments {
        out.push_str(&format!("--{boundary}\r\n"));
        out.push_str(&format!(
            "Content-Type: {}\r\n",
            content_type_for(&attachment.filename)
        ));
        out.push_str(&format!(
            "Content-Disposition: attachment; filename=\"{}\"\r\n",
            attachment.filename
        ));
        out.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
        out.push_str(&wrap_base64(&STANDARD.encode(&attachment.data)));
        out.push_str("\r\n");
    }

    out.push_str(&format!("--{boundary}--\r\n"));
    out
}

/// Guess a Content-Type from the attachment filename extension
///
/// Falls back to the binary default when the extension is unknown.
fn content_type_for(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "csv" => "text/csv",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "zip" => "application/zip",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Split base64 content into CRLF-terminated lines of at most 76 characters
fn wrap_base64(encoded: &str) -> String {
    encoded
        .as_bytes()
        .chunks(BASE64_LINE_WIDTH)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\r\n")
}

#[cfg(test)]
mod tests {
    use super::{Attachment, ComposeRequest, compose, encode_header};

    fn basic_request() -> ComposeRequest {
        ComposeRequest {
            from: "me".to_owned(),
            to: vec!["user@example.com".to_owned()],
            cc: None,
            bcc: None,
            subject: "Hi".to_owned(),
            body: "Hello there".to_owned(),
            in_reply_to: None,
            attachments: Vec::new(),
        }
    }

    fn compose_string(request: &ComposeRequest) -> String {
        String::from_utf8(compose(request).expect("compose must succeed")).expect("valid UTF-8")
    }

    #[test]
    fn emits_headers_in_fixed_order() {
        let message = compose_string(&basic_request());
        let (headers, _) = message
            .split_once("\r\n\r\n")
            .expect("blank line separator");
        let keys: Vec<&str> = headers
            .lines()
            .map(|l| l.split_once(':').expect("header line").0)
            .collect();
        assert_eq!(
            keys,
            vec![
                "From",
                "To",
                "Subject",
                "MIME-Version",
                "Content-Type",
                "Content-Transfer-Encoding"
            ]
        );
    }

    #[test]
    fn body_appears_verbatim_after_single_blank_line() {
        let message = compose_string(&basic_request());
        let (_, body) = message
            .split_once("\r\n\r\n")
            .expect("blank line separator");
        assert_eq!(body, "Hello there");
    }

    #[test]
    fn includes_reply_threading_headers() {
        let mut request = basic_request();
        request.in_reply_to = Some("<abc123@mail.gmail.com>".to_owned());
        let message = compose_string(&request);
        assert!(message.contains("In-Reply-To: <abc123@mail.gmail.com>\r\n"));
        assert!(message.contains("References: <abc123@mail.gmail.com>\r\n"));
    }

    #[test]
    fn encodes_non_ascii_subject_per_rfc2047() {
        let mut request = basic_request();
        request.subject = "héllo".to_owned();
        let message = compose_string(&request);
        let (headers, _) = message.split_once("\r\n\r\n").expect("separator");
        let subject = headers
            .lines()
            .find(|l| l.starts_with("Subject: "))
            .expect("subject header");
        assert!(subject.starts_with("Subject: =?UTF-8?B?"));
        assert!(subject.ends_with("?="));
        assert!(headers.is_ascii(), "headers must contain no raw non-ASCII");
    }

    #[test]
    fn ascii_subject_passes_through_unencoded() {
        assert_eq!(encode_header("plain subject"), "plain subject");
    }

    #[test]
    fn rejects_invalid_recipient_without_output() {
        let mut request = basic_request();
        request.to = vec!["not-an-email".to_owned()];
        let err = compose(&request).expect_err("must fail");
        assert!(err.to_string().contains("not-an-email"));
    }

    #[test]
    fn rejects_address_without_domain_dot() {
        let mut request = basic_request();
        request.to = vec!["user@localhost".to_owned()];
        compose(&request).expect_err("domain must contain a dot");
    }

    #[test]
    fn rejects_empty_recipient_list() {
        let mut request = basic_request();
        request.to = Vec::new();
        compose(&request).expect_err("must fail");
    }

    #[test]
    fn optional_cc_and_bcc_appear_between_to_and_subject() {
        let mut request = basic_request();
        request.cc = Some(vec!["cc@example.com".to_owned()]);
        request.bcc = Some(vec!["bcc@example.com".to_owned()]);
        let message = compose_string(&request);
        let to_pos = message.find("To: ").expect("To header");
        let cc_pos = message.find("Cc: cc@example.com").expect("Cc header");
        let bcc_pos = message.find("Bcc: bcc@example.com").expect("Bcc header");
        let subject_pos = message.find("Subject: ").expect("Subject header");
        assert!(to_pos < cc_pos && cc_pos < bcc_pos && bcc_pos < subject_pos);
    }

    #[test]
    fn attachment_message_parses_as_multipart_mixed() {
        let mut request = basic_request();
        request.attachments = vec![Attachment {
            filename: "report.pdf".to_owned(),
            data: vec![0x25, 0x50, 0x44, 0x46],
        }];
        let raw = compose(&request).expect("compose must succeed");

        let parsed = mailparse::parse_mail(&raw).expect("must parse as valid MIME");
        assert_eq!(parsed.ctype.mimetype, "multipart/mixed");
        assert_eq!(parsed.subparts.len(), 2);
        assert_eq!(parsed.subparts[0].ctype.mimetype, "text/plain");
        assert_eq!(
            parsed.subparts[0].get_body().expect("text body"),
            "Hello there"
        );
        assert_eq!(parsed.subparts[1].ctype.mimetype, "application/pdf");
        assert_eq!(
            parsed.subparts[1].get_body_raw().expect("attachment bytes"),
            vec![0x25, 0x50, 0x44, 0x46]
        );
        let disposition = parsed.subparts[1].get_content_disposition();
        assert_eq!(
            disposition.params.get("filename").map(String::as_str),
            Some("report.pdf")
        );
    }

    #[test]
    fn boundary_differs_between_messages() {
        let mut request = basic_request();
        request.attachments = vec![Attachment {
            filename: "a.bin".to_owned(),
            data: vec![1, 2, 3],
        }];
        let first = compose_string(&request);
        let second = compose_string(&request);
        let boundary_of = |msg: &str| {
            msg.lines()
                .find(|l| l.contains("boundary="))
                .expect("boundary header")
                .to_owned()
        };
        assert_ne!(boundary_of(&first), boundary_of(&second));
    }

    #[test]
    fn unknown_extension_falls_back_to_octet_stream() {
        let mut request = basic_request();
        request.attachments = vec![Attachment {
            filename: "data.xyzzy".to_owned(),
            data: vec![0],
        }];
        let message = compose_string(&request);
        assert!(message.contains("Content-Type: application/octet-stream\r\n"));
    }
}
