use crate::domain::message::{NormalizedRecord, RawMessage};
use crate::pipeline::classifier::LabelRules;
use crate::pipeline::sender::parse_sender;
use crate::pipeline::signature::SignatureTriggers;

/// Subject used when the message has none.
pub const DEFAULT_SUBJECT: &str = "No Subject";

/// Builds the ticket-ready record for one message. Never fails: every
/// malformed field falls back to a default.
pub fn normalize(
    raw: &RawMessage,
    rules: &LabelRules,
    triggers: &SignatureTriggers,
) -> NormalizedRecord {
    let subject = raw
        .subject
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(DEFAULT_SUBJECT);

    let classification = rules.classify(subject);
    let clean_body = triggers.strip_signature(&raw.body);
    let identity = parse_sender(&raw.sender);
    let title = format!("[{identity}] {}", classification.cleaned_subject);

    NormalizedRecord {
        title,
        labels: classification.labels,
        clean_body,
        identity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn labels(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bug_report_end_to_end() {
        let raw = RawMessage {
            subject: Some("[BUG] Crash on save".into()),
            sender: r#""A B" <a@b.com>"#.into(),
            body: "It crashes.\n--\nSent from my phone".into(),
            attachments: vec![],
        };
        let rules = LabelRules::new([("BUG", "bug")]).unwrap();
        let triggers = SignatureTriggers::new(["^--$"]);

        let record = normalize(&raw, &rules, &triggers);

        assert_eq!(record.title, "[A B | a@b.com] Crash on save");
        assert_eq!(record.labels, labels(&["bug"]));
        assert_eq!(record.clean_body, "It crashes.");
        assert_eq!(record.identity, "A B | a@b.com");
    }

    #[test]
    fn missing_subject_uses_default() {
        let raw = RawMessage {
            subject: None,
            sender: "x@y.z".into(),
            body: "hi".into(),
            attachments: vec![],
        };
        let record = normalize(&raw, &LabelRules::default(), &SignatureTriggers::default());
        assert_eq!(record.title, "[x@y.z | x@y.z] No Subject");
        assert_eq!(record.labels, labels(&["review"]));
    }

    #[test]
    fn blank_subject_counts_as_missing() {
        let raw = RawMessage {
            subject: Some("   ".into()),
            sender: "x@y.z".into(),
            ..Default::default()
        };
        let record = normalize(&raw, &LabelRules::default(), &SignatureTriggers::default());
        assert!(record.title.ends_with("] No Subject"));
    }

    #[test]
    fn default_subject_is_classified_too() {
        let rules = LabelRules::new([("subject", "triage")]).unwrap();
        let record = normalize(&RawMessage::default(), &rules, &SignatureTriggers::default());
        assert_eq!(record.labels, labels(&["triage"]));
        assert_eq!(record.title, "[ | ] No");
    }

    #[test]
    fn malformed_input_degrades_to_defaults() {
        let raw = RawMessage {
            subject: None,
            sender: "<>".into(),
            body: "".into(),
            attachments: vec![],
        };
        let record = normalize(&raw, &LabelRules::default(), &SignatureTriggers::default());
        assert_eq!(record.identity, "Unknown | ");
        assert_eq!(record.title, "[Unknown | ] No Subject");
        assert_eq!(record.clean_body, "");
        assert!(!record.labels.is_empty());
    }

    #[test]
    fn normalization_is_repeatable() {
        let raw = RawMessage {
            subject: Some("FEATURE: dark mode, also a bug".into()),
            sender: "Dev <dev@x.io>".into(),
            body: "Please add it.\nThanks\nDev".into(),
            attachments: vec![],
        };
        let rules = LabelRules::new([("feature", "enhancement"), ("bug", "bug")]).unwrap();
        let triggers = SignatureTriggers::new(["^Thanks"]);

        let first = normalize(&raw, &rules, &triggers);
        let second = normalize(&raw, &rules, &triggers);
        assert_eq!(first, second);
        assert_eq!(first.labels, labels(&["bug", "enhancement"]));
        assert_eq!(first.title, "[Dev | dev@x.io] : dark mode, also a");
        assert_eq!(first.clean_body, "Please add it.");
    }
}
