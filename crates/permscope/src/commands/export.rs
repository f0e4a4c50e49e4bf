//! Export command handlers: drive an `ExportOrchestrator` with a live
//! progress bar and write the finished workbook to disk.

use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

use permscope_core::{ExportKind, ExportOrchestrator, ExportStatus, ServiceConfig};

use crate::cli::{ExportArgs, ExportCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(
    service_config: &ServiceConfig,
    args: ExportArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let (kind, opts) = match args.command {
        ExportCommand::Bulk(opts) => (ExportKind::Bulk, opts),
        ExportCommand::Privileged(opts) => (ExportKind::Privileged, opts),
        ExportCommand::Template(t) => (ExportKind::Template(t.id), t.opts),
    };

    // Flag overrides onto the resolved service config, applied once.
    let mut config = service_config.clone();
    if let Some(page_size) = opts.page_size {
        config.page_size = page_size;
    }
    if let Some(batch_size) = opts.batch_size {
        config.batch_size = batch_size;
    }
    if opts.include_all_active_users {
        config.include_all_active_users = true;
    }

    let client = util::connect(&config)?;
    let orchestrator = ExportOrchestrator::new(client, kind, config.batch_size);
    let cancel = orchestrator.cancellation_token();
    let mut progress_rx = orchestrator.subscribe_progress();

    let bar = progress_bar(global.quiet);
    let bar_task = {
        let bar = bar.clone();
        tokio::spawn(async move {
            while progress_rx.changed().await.is_ok() {
                let snapshot = progress_rx.borrow().clone();
                bar.set_position(u64::from(snapshot.percent));
                let label = snapshot
                    .message
                    .unwrap_or_else(|| snapshot.status.to_string());
                if snapshot.total > 0 {
                    bar.set_message(format!(
                        "{label} ({}/{})",
                        snapshot.processed, snapshot.total
                    ));
                } else {
                    bar.set_message(label);
                }
            }
        })
    };

    // Ctrl-C requests cooperative cancellation; the job stops issuing
    // new fetches and settles into the Cancelled state.
    let run = orchestrator.run();
    tokio::pin!(run);
    let report = loop {
        tokio::select! {
            report = &mut run => break report,
            _ = tokio::signal::ctrl_c() => {
                bar.set_message("cancelling...".to_owned());
                cancel.cancel();
            }
        }
    };

    bar_task.abort();
    bar.finish_and_clear();

    match report.status {
        ExportStatus::Complete => {
            let file_name = report
                .file_name
                .expect("complete report carries a file name");
            let bytes = report.bytes.expect("complete report carries bytes");

            let out_dir = opts.out_dir.unwrap_or_else(|| PathBuf::from("."));
            std::fs::create_dir_all(&out_dir)?;
            let path = out_dir.join(&file_name);
            std::fs::write(&path, &bytes)?;

            if !global.quiet {
                let message = format!(
                    "Exported {} permissions to {}",
                    report.results.len(),
                    path.display()
                );
                if output::should_color(&global.color) {
                    println!("{}", message.green());
                } else {
                    println!("{message}");
                }

                if !report.fallback_permissions.is_empty() {
                    let warning = format!(
                        "{} permission(s) exported via fallback tiers: {}",
                        report.fallback_permissions.len(),
                        report.fallback_permissions.join(", ")
                    );
                    if output::should_color(&global.color) {
                        eprintln!("{}", warning.yellow());
                    } else {
                        eprintln!("{warning}");
                    }
                }
            }
            Ok(())
        }

        ExportStatus::Cancelled => {
            // Cancellation is not an error: report and exit cleanly.
            if !global.quiet {
                eprintln!(
                    "Export cancelled after {} permission(s); no file written.",
                    report.results.len()
                );
            }
            Ok(())
        }

        _ => Err(CliError::ExportFailed {
            message: report
                .message
                .unwrap_or_else(|| "export ended in an unexpected state".into()),
        }),
    }
}

fn progress_bar(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{bar:30.cyan/blue} {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}
