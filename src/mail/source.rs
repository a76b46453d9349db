use anyhow::Result;

use crate::domain::message::{FetchedMessage, MessageUid};

/// Where unseen mail comes from.
pub trait MailSource {
    /// Every currently unseen message, in fetch order. An error here is fatal
    /// for the batch.
    fn fetch_unseen(&self) -> Result<Vec<FetchedMessage>>;

    /// Called once per batch with every message whose issue exists. Sources
    /// that already marked messages read while fetching do nothing.
    fn acknowledge(&self, uids: &[MessageUid]) -> Result<()>;
}
