use std::collections::BTreeSet;

/// IMAP UID of a fetched message.
pub type MessageUid = u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content: Vec<u8>,
}

/// One unseen message as delivered by the mail source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMessage {
    /// `None` when the message carried no (or an empty) Subject header.
    pub subject: Option<String>,
    /// Raw `From` header value.
    pub sender: String,
    pub body: String,
    pub attachments: Vec<Attachment>,
}

/// A raw message together with the UID used to acknowledge it later.
#[derive(Debug, Clone)]
pub struct FetchedMessage {
    pub uid: MessageUid,
    pub message: RawMessage,
}

/// Ticket-ready view of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub title: String,
    /// Never empty: falls back to `review`.
    pub labels: BTreeSet<String>,
    pub clean_body: String,
    /// `"Name | address"`.
    pub identity: String,
}
