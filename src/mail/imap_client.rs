use anyhow::{Context, Result, anyhow};
use log::{debug, info, warn};
use native_tls::TlsConnector;

use crate::config::{Config, DEFAULT_IMAP_PORT, DEFAULT_MAILBOX, MarkSeen};
use crate::domain::message::{FetchedMessage, MessageUid};
use crate::mail::decoders::parse_raw_message;
use crate::mail::source::MailSource;

type ImapSession = imap::Session<native_tls::TlsStream<std::net::TcpStream>>;

pub struct ImapClient {
    pub server: String,
    pub port: u16,
    pub user: String,
    password: String,
    pub mailbox: String,
    pub mark_seen: MarkSeen,
}

impl ImapClient {
    pub fn new(
        server: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            port: DEFAULT_IMAP_PORT,
            user: user.into(),
            password: password.into(),
            mailbox: DEFAULT_MAILBOX.to_string(),
            mark_seen: MarkSeen::OnFetch,
        }
    }

    pub fn from_config(cfg: &Config, password: String) -> Result<Self> {
        let server = Config::required(&cfg.imap_server, "imap_server", "set it or IMAP_SERVER")?;
        let user = Config::required(&cfg.email_account, "email_account", "set it or EMAIL_ACCOUNT")?;

        let mut client = Self::new(server, user, password);
        client.port = cfg.imap_port.unwrap_or(DEFAULT_IMAP_PORT);
        if let Some(mb) = &cfg.mailbox {
            client.mailbox = mb.clone();
        }
        client.mark_seen = cfg.mark_seen;
        Ok(client)
    }

    fn connect_and_login(&self) -> Result<ImapSession> {
        let tls = TlsConnector::builder().build()?;
        let client = imap::connect((self.server.as_str(), self.port), self.server.as_str(), &tls)
            .with_context(|| format!("cannot connect to {}:{}", self.server, self.port))?;

        let mut session = client
            .login(&self.user, &self.password)
            .map_err(|(e, _)| anyhow!("IMAP login failed for {}: {e}", self.user))?;
        session
            .select(&self.mailbox)
            .with_context(|| format!("cannot select {}", self.mailbox))?;
        Ok(session)
    }

    fn fetch_query(&self) -> &'static str {
        match self.mark_seen {
            // plain RFC822 sets \Seen as a side effect
            MarkSeen::OnFetch => "(UID RFC822)",
            MarkSeen::OnSuccess => "(UID BODY.PEEK[])",
        }
    }
}

/// Comma-joined UID set for a single `UID STORE`.
fn uid_set(uids: &[MessageUid]) -> String {
    uids.iter()
        .map(|u| u.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Fetches and parses each UID on its own. A failed fetch, a missing body or
/// an unparsable message is logged and skipped; the rest are still returned.
fn collect_messages(
    uids: &[MessageUid],
    mut fetch: impl FnMut(MessageUid) -> Result<Option<Vec<u8>>>,
) -> Vec<FetchedMessage> {
    let mut out = Vec::with_capacity(uids.len());
    for &uid in uids {
        let raw = match fetch(uid) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                warn!("UID {uid}: server returned no body, skipping");
                continue;
            }
            Err(e) => {
                warn!("UID {uid}: fetch failed, skipping: {e}");
                continue;
            }
        };

        match parse_raw_message(&raw) {
            Ok(message) => out.push(FetchedMessage { uid, message }),
            Err(e) => warn!("UID {uid}: cannot parse message: {e}"),
        }
    }
    out
}

impl MailSource for ImapClient {
    fn fetch_unseen(&self) -> Result<Vec<FetchedMessage>> {
        let mut session = self.connect_and_login()?;

        let mut uids: Vec<MessageUid> = session.uid_search("UNSEEN")?.into_iter().collect();
        uids.sort_unstable();
        debug!("{} unseen UIDs in {}", uids.len(), self.mailbox);

        // In on_fetch mode messages are already flagged \Seen from here on,
        // so nothing past this point may drop what was fetched.
        let query = self.fetch_query();
        let out = collect_messages(&uids, |uid| {
            let fetches = session.uid_fetch(uid.to_string(), query)?;
            Ok(fetches.iter().next().and_then(|f| f.body()).map(<[u8]>::to_vec))
        });

        if let Err(e) = session.logout() {
            warn!("IMAP logout failed: {e}");
        }
        info!("Fetched {} unread emails.", out.len());
        Ok(out)
    }

    fn acknowledge(&self, uids: &[MessageUid]) -> Result<()> {
        if self.mark_seen == MarkSeen::OnFetch || uids.is_empty() {
            return Ok(());
        }
        let mut session = self.connect_and_login()?;
        session.uid_store(uid_set(uids), "+FLAGS (\\Seen)")?;
        debug!("Marked {} messages seen", uids.len());
        if let Err(e) = session.logout() {
            warn!("IMAP logout failed: {e}");
        }
        Ok(())
    }
}
