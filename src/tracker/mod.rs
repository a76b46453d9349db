//! Outbound side: attachment paste service and ticket tracker.

pub mod github;

use std::collections::BTreeSet;

/// Stores one attachment and returns a link to it, or `None` on failure.
pub trait AttachmentSink {
    fn store(&self, filename: &str, content: &[u8]) -> Option<String>;
}

/// Outcome of filing one ticket; `details` is the ticket URL on success and
/// the tracker's error message otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub success: bool,
    pub details: String,
}

pub trait TicketSink {
    fn submit(&self, title: &str, body: &str, labels: &BTreeSet<String>) -> Submission;
}

/// A successfully uploaded attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentLink {
    pub filename: String,
    pub url: String,
}

/// Appends the reporter and attachment trailer to a cleaned body.
pub fn compose_issue_body(clean_body: &str, identity: &str, links: &[AttachmentLink]) -> String {
    let attachment_links: String = links
        .iter()
        .map(|l| format!("\n📎 [{}]({})", l.filename, l.url))
        .collect();
    format!("{clean_body}\n\n---\n**Reported by:** {identity}\n{attachment_links}")
}
