use anyhow::Result;
use mailparse::{DispositionType, MailHeaderMap, ParsedMail};

use crate::domain::message::{Attachment, RawMessage};

const HTML_WRAP_WIDTH: usize = 100;

#[derive(Default)]
struct Parts {
    plain: String,
    html: Option<String>,
    attachments: Vec<Attachment>,
}

/// Decodes an RFC 822 message into the fields the pipeline works on.
///
/// The body is every non-attachment `text/plain` part joined together; a
/// message with no plain text falls back to its first `text/html` part.
pub fn parse_raw_message(raw_rfc822: &[u8]) -> Result<RawMessage> {
    let parsed = mailparse::parse_mail(raw_rfc822)?;

    let subject = parsed
        .headers
        .get_first_value("Subject")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let sender = parsed
        .headers
        .get_first_value("From")
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let mut parts = Parts::default();
    collect_parts(&parsed, &mut parts);

    let body = if parts.plain.trim().is_empty() {
        parts.html.map(|h| html_to_text(&h)).unwrap_or_default()
    } else {
        parts.plain
    };

    Ok(RawMessage {
        subject,
        sender,
        body: body.replace("\r\n", "\n").trim().to_string(),
        attachments: parts.attachments,
    })
}

fn collect_parts(part: &ParsedMail, out: &mut Parts) {
    if !part.subparts.is_empty() {
        for sp in &part.subparts {
            collect_parts(sp, out);
        }
        return;
    }

    let disposition = part.get_content_disposition();
    if disposition.disposition == DispositionType::Attachment {
        match part.get_body_raw() {
            Ok(content) => {
                let filename = disposition
                    .params
                    .get("filename")
                    .or_else(|| part.ctype.params.get("name"))
                    .map(|f| f.trim().to_string())
                    .filter(|f| !f.is_empty())
                    .unwrap_or_else(|| format!("attachment-{}", out.attachments.len() + 1));
                out.attachments.push(Attachment { filename, content });
            }
            Err(e) => log::warn!("Skipping undecodable attachment: {e}"),
        }
        return;
    }

    let mime = part.ctype.mimetype.to_ascii_lowercase();
    if mime == "text/plain" {
        if let Ok(text) = part.get_body() {
            out.plain.push_str(&text);
        }
    } else if mime == "text/html"
        && out.html.is_none()
        && let Ok(html) = part.get_body()
    {
        out.html = Some(html);
    }
}

fn html_to_text(html: &str) -> String {
    html2text::from_read(html.as_bytes(), HTML_WRAP_WIDTH).unwrap_or_else(|_| html.to_string())
}
