use anyhow::{Result, anyhow};
use keyring::{Entry, Error as KeyringError};

const SERVICE: &str = "email_to_issue";

/// Secrets the tool needs at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SecretKind {
    EmailPassword,
    GithubToken,
}

impl SecretKind {
    /// Environment variable that takes precedence over the keyring.
    pub fn env_var(self) -> &'static str {
        match self {
            SecretKind::EmailPassword => "EMAIL_PASSWORD",
            SecretKind::GithubToken => "GITHUB_TOKEN",
        }
    }

    fn keyring_user(self) -> &'static str {
        match self {
            SecretKind::EmailPassword => "email-password",
            SecretKind::GithubToken => "github-token",
        }
    }
}

/// Save a secret into the OS keyring
pub fn save_secret(kind: SecretKind, value: &str) -> Result<()> {
    let entry = Entry::new(SERVICE, kind.keyring_user());
    entry?
        .set_password(value)
        .map_err(|e| anyhow!(e.to_string()))?;
    Ok(())
}

/// Load a secret from the keyring
pub fn load_secret(kind: SecretKind) -> Result<Option<String>> {
    let entry = Entry::new(SERVICE, kind.keyring_user());
    match entry?.get_password() {
        Ok(v) => Ok(Some(v)),
        Err(KeyringError::NoEntry) => Ok(None),
        Err(e) => Err(anyhow!(e.to_string())),
    }
}

/// Environment first, then keyring.
pub fn resolve_secret(kind: SecretKind) -> Result<String> {
    if let Some(v) = std::env::var(kind.env_var())
        .ok()
        .filter(|v| !v.is_empty())
    {
        return Ok(v);
    }
    load_secret(kind)?.ok_or_else(|| {
        anyhow!(
            "{} not set; export it or run `email_to_issue set-secret --name {}`",
            kind.env_var(),
            kind.keyring_user()
        )
    })
}
