//! Subject-line classification.
//!
//! Every rule whose keyword occurs in the subject (case-insensitively)
//! contributes its label, and every occurrence of every matched keyword is
//! removed from the title. A keyword written as a tag, e.g. `[BUG]` or
//! `(bug)`, is removed together with its brackets.

use std::collections::BTreeSet;

use regex::{Regex, RegexBuilder};

use crate::error::ConfigError;

/// Label used when no rule matches.
pub const FALLBACK_LABEL: &str = "review";

#[derive(Debug, Clone)]
pub struct LabelRule {
    keyword: String,
    label: String,
    pattern: Regex,
}

impl LabelRule {
    pub fn new(keyword: &str, label: &str) -> Result<Self, ConfigError> {
        let k = regex::escape(keyword);
        let pattern = RegexBuilder::new(&format!(r"\[\s*{k}\s*\]|\(\s*{k}\s*\)|{k}"))
            .case_insensitive(true)
            .build()
            .map_err(|source| ConfigError::InvalidKeyword {
                keyword: keyword.to_string(),
                source,
            })?;

        Ok(Self {
            keyword: keyword.to_string(),
            label: label.to_string(),
            pattern,
        })
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn matches(&self, subject: &str) -> bool {
        self.pattern.is_match(subject)
    }
}

/// Ordered keyword → label table, built once per run.
#[derive(Debug, Clone, Default)]
pub struct LabelRules {
    rules: Vec<LabelRule>,
}

/// Result of classifying one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub labels: BTreeSet<String>,
    pub cleaned_subject: String,
}

impl LabelRules {
    /// Builds the table from `(keyword, label)` pairs.
    ///
    /// Keywords and labels are trimmed. Pairs with an empty keyword or label
    /// are skipped, and a repeated keyword keeps its first label.
    pub fn new<I, K, L>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, L)>,
        K: AsRef<str>,
        L: AsRef<str>,
    {
        let mut rules: Vec<LabelRule> = Vec::new();
        for (keyword, label) in pairs {
            let (keyword, label) = (keyword.as_ref().trim(), label.as_ref().trim());
            if keyword.is_empty() || label.is_empty() {
                continue;
            }
            if rules.iter().any(|r| r.keyword == keyword) {
                continue;
            }
            rules.push(LabelRule::new(keyword, label)?);
        }
        Ok(Self { rules })
    }

    /// Parses the compact `KEY:label,KEY2:label2` form.
    pub fn parse_label_map(text: &str) -> Result<Self, ConfigError> {
        let mut pairs = Vec::new();
        for entry in text.split(',') {
            if entry.trim().is_empty() {
                continue;
            }
            let (keyword, label) =
                entry
                    .split_once(':')
                    .ok_or_else(|| ConfigError::InvalidLabelMap {
                        entry: entry.trim().to_string(),
                    })?;
            pairs.push((keyword, label));
        }
        Self::new(pairs)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabelRule> {
        self.rules.iter()
    }

    pub fn classify(&self, subject: &str) -> Classification {
        let mut labels = BTreeSet::new();
        let mut cleaned = subject.to_string();

        for rule in &self.rules {
            if rule.matches(subject) {
                labels.insert(rule.label.clone());
            }
            cleaned = rule.pattern.replace_all(&cleaned, "").into_owned();
        }

        if labels.is_empty() {
            labels.insert(FALLBACK_LABEL.to_string());
        }

        Classification {
            labels,
            cleaned_subject: cleaned.trim().to_string(),
        }
    }
}

pub fn classify(subject: &str, rules: &LabelRules) -> Classification {
    rules.classify(subject)
}
