//! promproto: inspect a Prometheus protobuf metrics endpoint

mod config;

use anyhow::{Context, Result}; // alias std::result::Result with dynamic error type
use chrono::prelude::*;
use colored::Colorize;
use futures::channel::oneshot;
use std::cell::Cell;
use std::io::{self, Write};
use std::time::Instant;

use promproto_core::debug::DEBUG;
use promproto_core::error::{debug_error_enabled, warn};
use promproto_core::render::render;
use promproto_core::scrape::{ScrapeError, ScrapeTarget, ACCEPT_HEADER};
use promproto_core::decode_snapshot;

use crate::config::Config;

/// The program's main entry point.
fn main() -> Result<()> {
    let config = Config::load()?;
    debug_error_enabled(config.debug);
    if !config.color {
        colored::control::set_override(false);
    }

    let target = ScrapeTarget::new(config.url.clone());
    if !config.watch {
        let result = async_std::task::block_on(scrape_once(&target));
        if config.debug {
            DEBUG.publish();
        }
        if let Err(err) = result {
            report(&mut io::stderr(), &err)?;
            std::process::exit(1);
        }
        return Ok(());
    }

    let (send_shutdown, recv_shutdown) = oneshot::channel::<()>();

    // When we receive a SIGINT (or SIGTERM) signal, stop after the current refresh.
    let signal_once = Cell::new(Some(send_shutdown));
    ctrlc::set_handler(move || {
        // The first time we receive the signal, shutdown gracefully
        if let Some(sender) = signal_once.take() {
            sender.send(()).expect("failed to shutdown");
        }
        // The second time we receive the signal, shutdown immediately
        else {
            std::process::exit(1);
        }
    })?;

    async_std::task::block_on(watch(&config, &target, recv_shutdown))
}

/// Scrape, decode and render a single snapshot to stdout
async fn scrape_once(target: &ScrapeTarget) -> Result<()> {
    let scrape = target
        .scrape()
        .await
        .with_context(|| format!("failed to scrape {}", target.url))?;
    if !scrape.has_protobuf_content_type() {
        warn(anyhow::format_err!(
            "server returned Content-Type: {}\nExpected: {}",
            scrape.content_type.as_deref().unwrap_or(""),
            ACCEPT_HEADER
        ));
    }

    let snapshot = decode_snapshot(&scrape.body);
    for err in snapshot.errors {
        warn(err.into());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    render(&mut out, &snapshot.families).context("failed to write output")?;
    out.flush()?;
    Ok(())
}

/// Refresh the snapshot every `config.interval` until a shutdown signal arrives.
///
/// The signal is only checked between refreshes; an in-flight scrape always runs to
/// completion (or its own timeout).
async fn watch(config: &Config, target: &ScrapeTarget, mut shutdown: oneshot::Receiver<()>) -> Result<()> {
    loop {
        if !matches!(shutdown.try_recv(), Ok(None)) {
            break;
        }
        let start = Instant::now();

        {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            write!(out, "\x1b[2J\x1b[H")?; // clear screen and move cursor to top
            let now = Local::now().format("%Y-%m-%d %H:%M:%S");
            writeln!(out, "{}", format!("{} - {}", now, target.url).bright_black())?;
            writeln!(out)?;
        }

        // Errors are reported in place of the output, and retried on the next refresh
        if let Err(err) = scrape_once(target).await {
            report(&mut io::stdout(), &err)?;
        }

        // Sleep until the next refresh interval
        if let Some(delay) = config.interval.checked_sub(start.elapsed()) {
            if async_std::future::timeout(delay, &mut shutdown).await.is_ok() {
                break;
            }
        }
    }

    println!("\nStopped.");
    if config.debug {
        DEBUG.publish();
    }
    Ok(())
}

fn report<W: Write>(out: &mut W, err: &anyhow::Error) -> io::Result<()> {
    writeln!(out, "{}", format!("Error: {:#}", err).red())?;
    if let Some(hint) = err.downcast_ref::<ScrapeError>().and_then(ScrapeError::hint) {
        writeln!(out)?;
        writeln!(out, "{}", hint.bright_black())?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn reported(err: anyhow::Error) -> String {
        colored::control::set_override(false);
        let mut out = Vec::new();
        report(&mut out, &err).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn reports_scrape_errors_with_hints() {
        let err = anyhow::Error::new(ScrapeError::Refused).context("failed to scrape http://localhost:9090/metrics");
        let output = reported(err);
        assert!(output.starts_with("Error: failed to scrape http://localhost:9090/metrics: connection refused\n"));
        assert!(output.contains("Make sure the metrics server is running"));
    }

    #[test]
    fn reports_other_errors_without_hints() {
        let output = reported(anyhow::format_err!("failed to write output"));
        assert_eq!(output, "Error: failed to write output\n");
    }
}
