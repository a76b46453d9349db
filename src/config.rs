use anyhow::Result;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::pipeline::{LabelRules, SignatureTriggers};

pub const DEFAULT_IMAP_PORT: u16 = 993;
pub const DEFAULT_MAILBOX: &str = "INBOX";
pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const SIGNATURE_FILE: &str = "signature_triggers.txt";

/// When a fetched message is flagged `\Seen` on the server.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MarkSeen {
    /// The fetch itself marks the message read.
    #[default]
    OnFetch,
    /// Only after its issue has been created.
    OnSuccess,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LabelEntry {
    pub keyword: String,
    pub label: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    pub imap_server: Option<String>,
    pub imap_port: Option<u16>,
    pub email_account: Option<String>,
    pub mailbox: Option<String>,
    /// `owner/name`
    pub github_repo: Option<String>,
    pub api_base: Option<String>,
    pub signature_triggers: Option<String>,
    #[serde(default)]
    pub mark_seen: MarkSeen,
    #[serde(default)]
    pub gist_public: bool,
    /// Compact `KEY:label,...` form; replaces `labels` when set.
    pub label_map: Option<String>,
    #[serde(default)]
    pub labels: Vec<LabelEntry>,
}

fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("no config dir available"))?
        .join("email_to_issue"))
}

pub fn config_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("config.toml");
    Ok(p)
}

pub fn default_signature_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(SIGNATURE_FILE))
}

fn template() -> Config {
    Config {
        imap_server: Some("imap.example.com".to_string()),
        imap_port: Some(DEFAULT_IMAP_PORT),
        email_account: Some("support@example.com".to_string()),
        mailbox: Some(DEFAULT_MAILBOX.to_string()),
        github_repo: Some("owner/repo".to_string()),
        api_base: None,
        signature_triggers: None,
        mark_seen: MarkSeen::OnFetch,
        gist_public: false,
        label_map: None,
        labels: vec![
            LabelEntry {
                keyword: "[BUG]".to_string(),
                label: "bug".to_string(),
            },
            LabelEntry {
                keyword: "[FEATURE]".to_string(),
                label: "enhancement".to_string(),
            },
        ],
    }
}

/// Loads the config file, then applies environment overrides.
///
/// Without an explicit path the file lives in the user config dir; if it is
/// missing there a template is written and an error returned.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = config_path()?;
            if !p.exists() {
                let tom = toml::to_string_pretty(&template())?;
                fs::write(&p, tom)?;
                return Err(anyhow::anyhow!(
                    "Created template config at {}, edit it and run again",
                    p.display()
                ));
            }
            p
        }
    };
    let s = fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", path.display()))?;
    let mut cfg: Config = toml::from_str(&s)?;
    cfg.apply_env(|key| std::env::var(key).ok());
    Ok(cfg)
}

impl Config {
    /// Overrides fields from `IMAP_SERVER`, `EMAIL_ACCOUNT`, `GITHUB_REPO`
    /// and `LABEL_MAP`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = var("IMAP_SERVER") {
            self.imap_server = Some(v);
        }
        if let Some(v) = var("EMAIL_ACCOUNT") {
            self.email_account = Some(v);
        }
        if let Some(v) = var("GITHUB_REPO") {
            self.github_repo = Some(v);
        }
        if let Some(v) = var("LABEL_MAP") {
            self.label_map = Some(v);
        }
    }

    pub fn label_rules(&self) -> Result<LabelRules, ConfigError> {
        match &self.label_map {
            Some(map) => LabelRules::parse_label_map(map),
            None => LabelRules::new(self.labels.iter().map(|e| (&e.keyword, &e.label))),
        }
    }

    /// Reads the signature trigger file. A configured file must exist; the
    /// default one may be absent, which disables stripping.
    pub fn signature_triggers(&self) -> Result<SignatureTriggers> {
        if let Some(p) = &self.signature_triggers {
            return Ok(SignatureTriggers::load(Path::new(p))?);
        }
        let path = default_signature_path()?;
        if !path.exists() {
            warn!(
                "No signature trigger file at {}; bodies are kept whole",
                path.display()
            );
            return Ok(SignatureTriggers::default());
        }
        Ok(SignatureTriggers::load(&path)?)
    }

    pub fn required<'a>(
        value: &'a Option<String>,
        key: &str,
        hint: &str,
    ) -> Result<&'a str, ConfigError> {
        value
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::Missing {
                key: key.to_string(),
                hint: hint.to_string(),
            })
    }
}
