use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use log::{error, info};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use email_to_issue::auth::secret_store::{self, SecretKind};
use email_to_issue::config::{Config, load_config};
use email_to_issue::daemon::{DaemonConfig, log_report, run_batch, run_daemon};
use email_to_issue::mail::decoders::parse_raw_message;
use email_to_issue::mail::imap_client::ImapClient;
use email_to_issue::pipeline::{LabelRules, SignatureTriggers, normalize};
use email_to_issue::tracker::github::GithubClient;

#[derive(Parser)]
#[command(name = "email_to_issue")]
#[command(about = "File unread mail as GitHub issues", long_about = None)]
struct Cli {
    /// Config file (defaults to the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Append log output to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Process unread mail once (default)
    Run,

    /// Process unread mail repeatedly until Ctrl-C
    Watch {
        #[arg(long, default_value_t = 300)]
        interval: u64,
    },

    /// Print the issue a saved .eml file would produce
    Preview { path: PathBuf },

    /// Store a secret in the keyring
    SetSecret {
        #[arg(long, value_enum)]
        name: SecretKind,
    },
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(path) = log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn load_tables(cfg: &Config) -> Result<(LabelRules, SignatureTriggers)> {
    let rules = cfg.label_rules()?;
    let triggers = cfg.signature_triggers()?;
    info!(
        "{} label rules, {} signature triggers",
        rules.len(),
        triggers.len()
    );
    Ok((rules, triggers))
}

fn connect(cfg: &Config) -> Result<(ImapClient, GithubClient)> {
    let password = secret_store::resolve_secret(SecretKind::EmailPassword)?;
    let token = secret_store::resolve_secret(SecretKind::GithubToken)?;
    Ok((
        ImapClient::from_config(cfg, password)?,
        GithubClient::from_config(cfg, token)?,
    ))
}

fn run(cli: Cli) -> Result<()> {
    let load = || load_config(cli.config.as_deref()).map_err(|e| anyhow!("Configuration error: {e}"));

    match cli.cmd.unwrap_or(Command::Run) {
        Command::SetSecret { name } => {
            eprintln!("Paste {} (end with Ctrl-D):", name.env_var());
            let mut secret = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut secret)?;
            secret_store::save_secret(name, secret.trim())?;
            println!("Saved {} in keyring", name.env_var());
            Ok(())
        }

        Command::Preview { path } => {
            let cfg = load()?;
            let (rules, triggers) = load_tables(&cfg)?;
            let raw = parse_raw_message(&std::fs::read(&path)?)?;
            let record = normalize(&raw, &rules, &triggers);

            println!("Title:  {}", record.title);
            let labels: Vec<&str> = record.labels.iter().map(String::as_str).collect();
            println!("Labels: {}", labels.join(", "));
            for a in &raw.attachments {
                println!("Attachment: {} ({} bytes)", a.filename, a.content.len());
            }
            println!("\n{}", record.clean_body);
            Ok(())
        }

        Command::Run => {
            let cfg = load()?;
            let (rules, triggers) = load_tables(&cfg)?;
            let (imap, github) = connect(&cfg)?;
            let report = run_batch(&imap, &github, &github, &rules, &triggers)?;
            log_report(&report);
            Ok(())
        }

        Command::Watch { interval } => {
            let cfg = load()?;
            let (rules, triggers) = load_tables(&cfg)?;
            let (imap, github) = connect(&cfg)?;
            run_daemon(
                &imap,
                &github,
                &github,
                &rules,
                &triggers,
                DaemonConfig {
                    interval_secs: interval,
                },
            )
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    info!("email_to_issue started");
    let result = run(cli);
    if let Err(e) = &result {
        error!("Error: {e:#}");
    }
    info!("email_to_issue finished");
    result
}
