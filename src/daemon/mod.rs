pub mod batch;

use anyhow::Result;
use log::{error, info};
use std::{
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::Duration,
};

use crate::mail::source::MailSource;
use crate::pipeline::{LabelRules, SignatureTriggers};
use crate::tracker::{AttachmentSink, TicketSink};

pub use batch::{BatchReport, MessageOutcome, run_batch};

pub struct DaemonConfig {
    pub interval_secs: u64,
}

/// Runs a batch every `interval_secs` until Ctrl-C. A failed batch is logged
/// and retried on the next tick.
pub fn run_daemon(
    source: &dyn MailSource,
    attachments: &dyn AttachmentSink,
    tickets: &dyn TicketSink,
    rules: &LabelRules,
    triggers: &SignatureTriggers,
    cfg: DaemonConfig,
) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r2 = running.clone();
    ctrlc::set_handler(move || {
        r2.store(false, Ordering::SeqCst);
    })?;

    info!("Polling every {}s; Ctrl-C to stop", cfg.interval_secs);
    while running.load(Ordering::SeqCst) {
        match run_batch(source, attachments, tickets, rules, triggers) {
            Ok(report) => log_report(&report),
            Err(e) => error!("Error: {e:#}"),
        }

        // sleep in short steps so Ctrl-C is honoured promptly
        for _ in 0..cfg.interval_secs {
            if !running.load(Ordering::SeqCst) {
                break;
            }
            thread::sleep(Duration::from_secs(1));
        }
    }

    info!("Stopped polling");
    Ok(())
}

pub fn log_report(report: &BatchReport) {
    if report.outcomes.is_empty() {
        return;
    }
    info!(
        "Batch done: {} created, {} failed",
        report.created(),
        report.failed()
    );
}
