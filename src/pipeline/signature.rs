//! Signature and quoted-reply stripping.

use std::fs;
use std::path::Path;

use log::warn;
use regex::Regex;

use crate::error::ConfigError;

#[derive(Debug, Clone)]
struct Trigger {
    source: String,
    // None when the pattern failed to compile; such a trigger never matches.
    regex: Option<Regex>,
}

/// Patterns that mark the first line of a signature block.
#[derive(Debug, Clone, Default)]
pub struct SignatureTriggers {
    triggers: Vec<Trigger>,
}

impl SignatureTriggers {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let triggers = patterns
            .into_iter()
            .map(|p| {
                let source = p.as_ref().to_string();
                let regex = match Regex::new(&source) {
                    Ok(r) => Some(r),
                    Err(e) => {
                        warn!("Ignoring invalid signature trigger {source:?}: {e}");
                        None
                    }
                };
                Trigger { source, regex }
            })
            .collect();
        Self { triggers }
    }

    /// One pattern per line; lines are trimmed and blank lines skipped.
    pub fn from_lines(text: &str) -> Self {
        Self::new(text.lines().map(str::trim).filter(|l| !l.is_empty()))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::SignatureFile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_lines(&text))
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.triggers.iter().map(|t| t.source.as_str())
    }

    /// True if any trigger finds a match anywhere in the trimmed line.
    pub fn is_boundary(&self, line: &str) -> bool {
        let line = line.trim();
        self.triggers
            .iter()
            .filter_map(|t| t.regex.as_ref())
            .any(|r| r.is_match(line))
    }

    /// Drops everything from the first boundary line onwards.
    pub fn strip_signature(&self, body: &str) -> String {
        let kept: Vec<&str> = body
            .trim()
            .lines()
            .take_while(|line| !self.is_boundary(line))
            .collect();
        kept.join("\n").trim().to_string()
    }
}

pub fn strip_signature(body: &str, triggers: &SignatureTriggers) -> String {
    triggers.strip_signature(body)
}
