use std::path::PathBuf;

/// Problems found while turning configuration into rule tables.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    Missing { key: String, hint: String },

    #[error("Invalid LABEL_MAP entry {entry:?}: expected KEYWORD:label")]
    InvalidLabelMap { entry: String },

    #[error("Keyword {keyword:?} cannot be compiled: {source}")]
    InvalidKeyword {
        keyword: String,
        #[source]
        source: regex::Error,
    },

    #[error("Cannot read signature triggers from {}: {source}", path.display())]
    SignatureFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
