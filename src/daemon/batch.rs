use anyhow::Result;
use log::{error, info, warn};

use crate::domain::message::{FetchedMessage, MessageUid};
use crate::mail::source::MailSource;
use crate::pipeline::{DEFAULT_SUBJECT, LabelRules, SignatureTriggers, normalize};
use crate::tracker::{AttachmentLink, AttachmentSink, TicketSink, compose_issue_body};

/// What happened to one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageOutcome {
    pub uid: MessageUid,
    pub subject: String,
    pub success: bool,
    /// Issue URL on success, tracker error otherwise.
    pub details: String,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<MessageOutcome>,
}

impl BatchReport {
    pub fn created(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.created()
    }
}

/// Fetches every unseen message and files one issue per message, in fetch
/// order. Only a mail-source failure aborts the batch.
pub fn run_batch(
    source: &dyn MailSource,
    attachments: &dyn AttachmentSink,
    tickets: &dyn TicketSink,
    rules: &LabelRules,
    triggers: &SignatureTriggers,
) -> Result<BatchReport> {
    let messages = source.fetch_unseen()?;

    let mut report = BatchReport::default();
    let mut filed = Vec::new();
    for fetched in messages {
        let outcome = process_message(&fetched, attachments, tickets, rules, triggers);
        if outcome.success {
            info!("Issue created successfully: {}", outcome.details);
            filed.push(fetched.uid);
        } else {
            error!("Failed to create issue: {}", outcome.details);
        }
        report.outcomes.push(outcome);
    }

    if !filed.is_empty()
        && let Err(e) = source.acknowledge(&filed)
    {
        warn!("Issues created but {} messages not marked seen: {e}", filed.len());
    }
    Ok(report)
}

fn process_message(
    fetched: &FetchedMessage,
    attachments: &dyn AttachmentSink,
    tickets: &dyn TicketSink,
    rules: &LabelRules,
    triggers: &SignatureTriggers,
) -> MessageOutcome {
    let raw = &fetched.message;
    let record = normalize(raw, rules, triggers);
    let subject = raw
        .subject
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(DEFAULT_SUBJECT)
        .to_string();
    info!("Creating issue for email: {subject} from {}", raw.sender);

    let links: Vec<AttachmentLink> = raw
        .attachments
        .iter()
        .filter_map(|a| {
            attachments
                .store(&a.filename, &a.content)
                .map(|url| AttachmentLink {
                    filename: a.filename.clone(),
                    url,
                })
        })
        .collect();

    let body = compose_issue_body(&record.clean_body, &record.identity, &links);
    let submission = tickets.submit(&record.title, &body, &record.labels);

    MessageOutcome {
        uid: fetched.uid,
        subject,
        success: submission.success,
        details: submission.details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::BTreeSet;

    use anyhow::anyhow;

    use crate::domain::message::{Attachment, RawMessage};
    use crate::tracker::Submission;

    struct FakeSource {
        messages: Vec<FetchedMessage>,
        fail: bool,
        acked: RefCell<Vec<Vec<MessageUid>>>,
    }

    impl FakeSource {
        fn new(messages: Vec<RawMessage>) -> Self {
            Self {
                messages: messages
                    .into_iter()
                    .enumerate()
                    .map(|(i, message)| FetchedMessage {
                        uid: i as MessageUid + 1,
                        message,
                    })
                    .collect(),
                fail: false,
                acked: RefCell::new(vec![]),
            }
        }
    }

    impl MailSource for FakeSource {
        fn fetch_unseen(&self) -> Result<Vec<FetchedMessage>> {
            if self.fail {
                return Err(anyhow!("login failed"));
            }
            Ok(self.messages.clone())
        }

        fn acknowledge(&self, uids: &[MessageUid]) -> Result<()> {
            self.acked.borrow_mut().push(uids.to_vec());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeGists {
        stored: RefCell<Vec<String>>,
    }

    impl AttachmentSink for FakeGists {
        fn store(&self, filename: &str, _content: &[u8]) -> Option<String> {
            if filename.starts_with("broken") {
                return None;
            }
            self.stored.borrow_mut().push(filename.to_string());
            Some(format!("https://gist.example/{filename}"))
        }
    }

    #[derive(Debug, Clone)]
    struct Filed {
        title: String,
        body: String,
        labels: BTreeSet<String>,
    }

    #[derive(Default)]
    struct FakeTracker {
        filed: RefCell<Vec<Filed>>,
    }

    impl TicketSink for FakeTracker {
        fn submit(&self, title: &str, body: &str, labels: &BTreeSet<String>) -> Submission {
            if title.contains("reject") {
                return Submission {
                    success: false,
                    details: "422 Unprocessable Entity: Validation Failed".into(),
                };
            }
            let mut filed = self.filed.borrow_mut();
            filed.push(Filed {
                title: title.to_string(),
                body: body.to_string(),
                labels: labels.clone(),
            });
            Submission {
                success: true,
                details: format!("https://github.com/acme/app/issues/{}", filed.len()),
            }
        }
    }

    fn message(subject: &str, sender: &str, body: &str) -> RawMessage {
        RawMessage {
            subject: Some(subject.into()),
            sender: sender.into(),
            body: body.into(),
            attachments: vec![],
        }
    }

    #[test]
    fn files_one_issue_per_message_in_order() {
        let source = FakeSource::new(vec![
            message("[BUG] Crash on save", r#""A B" <a@b.com>"#, "It crashes.\n--\nSent from my phone"),
            message("Question", "c@d.com", "How do I export?"),
        ]);
        let gists = FakeGists::default();
        let tracker = FakeTracker::default();
        let rules = LabelRules::new([("BUG", "bug")]).unwrap();
        let triggers = SignatureTriggers::new(["^--$"]);

        let report = run_batch(&source, &gists, &tracker, &rules, &triggers).unwrap();

        assert_eq!(report.created(), 2);
        assert_eq!(report.failed(), 0);
        let filed = tracker.filed.borrow();
        assert_eq!(filed[0].title, "[A B | a@b.com] Crash on save");
        assert_eq!(
            filed[0].body,
            "It crashes.\n\n---\n**Reported by:** A B | a@b.com\n"
        );
        assert_eq!(filed[0].labels, BTreeSet::from(["bug".to_string()]));
        assert_eq!(filed[1].labels, BTreeSet::from(["review".to_string()]));
        assert_eq!(report.outcomes[1].details, "https://github.com/acme/app/issues/2");
        assert_eq!(*source.acked.borrow(), vec![vec![1, 2]]);
    }

    #[test]
    fn failed_attachment_is_left_out() {
        let mut raw = message("logs", "x@y.z", "see files");
        raw.attachments = vec![
            Attachment {
                filename: "broken.bin".into(),
                content: vec![1, 2, 3],
            },
            Attachment {
                filename: "app.log".into(),
                content: b"line".to_vec(),
            },
        ];
        let source = FakeSource::new(vec![raw]);
        let gists = FakeGists::default();
        let tracker = FakeTracker::default();

        let report = run_batch(
            &source,
            &gists,
            &tracker,
            &LabelRules::default(),
            &SignatureTriggers::default(),
        )
        .unwrap();

        assert_eq!(report.created(), 1);
        assert_eq!(*gists.stored.borrow(), vec!["app.log".to_string()]);
        let body = &tracker.filed.borrow()[0].body;
        assert!(body.ends_with("\n📎 [app.log](https://gist.example/app.log)"));
        assert!(!body.contains("broken.bin"));
    }

    #[test]
    fn one_rejection_does_not_stop_the_batch() {
        let source = FakeSource::new(vec![
            message("please reject me", "x@y.z", ""),
            message("fine", "x@y.z", ""),
        ]);
        let tracker = FakeTracker::default();

        let report = run_batch(
            &source,
            &FakeGists::default(),
            &tracker,
            &LabelRules::default(),
            &SignatureTriggers::default(),
        )
        .unwrap();

        assert_eq!(report.created(), 1);
        assert_eq!(report.failed(), 1);
        assert!(!report.outcomes[0].success);
        assert_eq!(report.outcomes[0].subject, "please reject me");
        assert!(report.outcomes[0].details.contains("Validation Failed"));
        assert_eq!(*source.acked.borrow(), vec![vec![2]]);
    }

    #[test]
    fn nothing_is_acknowledged_when_every_issue_fails() {
        let source = FakeSource::new(vec![message("reject", "x@y.z", "")]);

        run_batch(
            &source,
            &FakeGists::default(),
            &FakeTracker::default(),
            &LabelRules::default(),
            &SignatureTriggers::default(),
        )
        .unwrap();

        assert!(source.acked.borrow().is_empty());
    }

    #[test]
    fn missing_subject_is_reported_as_no_subject() {
        let mut untitled = message("", "x@y.z", "body");
        untitled.subject = None;
        let source = FakeSource::new(vec![untitled, message("   ", "x@y.z", "body")]);
        let tracker = FakeTracker::default();

        let report = run_batch(
            &source,
            &FakeGists::default(),
            &tracker,
            &LabelRules::default(),
            &SignatureTriggers::default(),
        )
        .unwrap();

        assert_eq!(report.outcomes[0].subject, "No Subject");
        assert_eq!(report.outcomes[1].subject, "No Subject");
        assert_eq!(tracker.filed.borrow()[0].title, "[x@y.z | x@y.z] No Subject");
    }

    #[test]
    fn source_failure_is_fatal() {
        let mut source = FakeSource::new(vec![message("x", "y", "z")]);
        source.fail = true;
        let tracker = FakeTracker::default();

        let result = run_batch(
            &source,
            &FakeGists::default(),
            &tracker,
            &LabelRules::default(),
            &SignatureTriggers::default(),
        );

        assert!(result.is_err());
        assert!(tracker.filed.borrow().is_empty());
    }

    #[test]
    fn empty_mailbox_is_an_empty_report() {
        let report = run_batch(
            &FakeSource::new(vec![]),
            &FakeGists::default(),
            &FakeTracker::default(),
            &LabelRules::default(),
            &SignatureTriggers::default(),
        )
        .unwrap();
        assert!(report.outcomes.is_empty());
    }
}
