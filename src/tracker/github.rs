use std::collections::BTreeSet;

use anyhow::{Result, anyhow};
use base64::{Engine as _, engine::general_purpose};
use log::warn;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde_json::{Value, json};
use url::Url;

use crate::config::{Config, DEFAULT_API_BASE};
use crate::tracker::{AttachmentSink, Submission, TicketSink};

const ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("email_to_issue/", env!("CARGO_PKG_VERSION"));

/// GitHub Issues as the ticket sink and Gists as the attachment sink.
pub struct GithubClient {
    http: Client,
    api_base: Url,
    repo: String,
    token: String,
    gist_public: bool,
}

impl GithubClient {
    pub fn new(api_base: &str, repo: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let mut api_base = Url::parse(api_base)?;
        if !api_base.path().ends_with('/') {
            let path = format!("{}/", api_base.path());
            api_base.set_path(&path);
        }
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            api_base,
            repo: repo.into(),
            token: token.into(),
            gist_public: false,
        })
    }

    pub fn from_config(cfg: &Config, token: String) -> Result<Self> {
        let repo = Config::required(&cfg.github_repo, "github_repo", "set it or GITHUB_REPO")?;
        if repo.split('/').filter(|p| !p.is_empty()).count() != 2 {
            return Err(anyhow!("github_repo must look like owner/name, got {repo:?}"));
        }
        let api_base = cfg.api_base.as_deref().unwrap_or(DEFAULT_API_BASE);
        let mut client = Self::new(api_base, repo, token)?;
        client.gist_public = cfg.gist_public;
        Ok(client)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.api_base.join(path)?)
    }

    fn post(&self, url: Url, payload: &Value) -> Result<(StatusCode, Value)> {
        let resp = self
            .http
            .post(url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", ACCEPT)
            .json(payload)
            .send()?;
        let status = resp.status();
        let body = resp.json::<Value>().unwrap_or(Value::Null);
        Ok((status, body))
    }

    fn upload_gist(&self, filename: &str, content: &[u8]) -> Result<String> {
        let (name, payload) = gist_payload(filename, content, self.gist_public);
        let (status, body) = self.post(self.endpoint("gists")?, &payload)?;
        if status != StatusCode::CREATED {
            return Err(anyhow!("gist upload returned {status}: {}", error_message(&body)));
        }
        body["files"][name.as_str()]["raw_url"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("gist response has no raw_url for {name}"))
    }

    fn create_issue(&self, title: &str, body: &str, labels: &BTreeSet<String>) -> Result<Submission> {
        let url = self.endpoint(&format!("repos/{}/issues", self.repo))?;
        let (status, resp) = self.post(url, &issue_payload(title, body, labels))?;
        Ok(submission_from_response(status, &resp))
    }
}

impl AttachmentSink for GithubClient {
    fn store(&self, filename: &str, content: &[u8]) -> Option<String> {
        match self.upload_gist(filename, content) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Attachment {filename} not uploaded: {e}");
                None
            }
        }
    }
}

impl TicketSink for GithubClient {
    fn submit(&self, title: &str, body: &str, labels: &BTreeSet<String>) -> Submission {
        self.create_issue(title, body, labels)
            .unwrap_or_else(|e| Submission {
                success: false,
                details: e.to_string(),
            })
    }
}

/// Gists only hold text, so binary content is base64-encoded under a `.b64`
/// name. Returns the file name used in the gist.
fn gist_payload(filename: &str, content: &[u8], public: bool) -> (String, Value) {
    let (name, text) = match std::str::from_utf8(content) {
        Ok(text) => (filename.to_string(), text.to_string()),
        Err(_) => (
            format!("{filename}.b64"),
            general_purpose::STANDARD.encode(content),
        ),
    };
    let payload = json!({
        "description": format!("Attachment: {filename}"),
        "public": public,
        "files": { (name.clone()): { "content": text } },
    });
    (name, payload)
}

fn issue_payload(title: &str, body: &str, labels: &BTreeSet<String>) -> Value {
    json!({
        "title": title,
        "body": body,
        "labels": labels,
    })
}

fn error_message(body: &Value) -> String {
    body["message"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| "no message".to_string())
}

fn submission_from_response(status: StatusCode, body: &Value) -> Submission {
    if status == StatusCode::CREATED {
        Submission {
            success: true,
            details: body["html_url"].as_str().unwrap_or_default().to_string(),
        }
    } else {
        Submission {
            success: false,
            details: format!("{status}: {}", error_message(body)),
        }
    }
}
