//! gcesd: keeps a Prometheus file-based discovery target file in sync with
//! the running Compute Engine instances selected by tag rules.
//!
//! A discovery cycle lists each configured project once, keeps the instances
//! carrying all of a rule's tags, maps them to `ip:port` targets with
//! `gce_instance_*` labels, and rewrites the output file only when the
//! resulting set differs from what was last written.
use std::time::Duration;

use inventory::{GceLister, TokenSource};
use metrics::Metrics;
use rules::RuleSet;
use trigger::TriggerLoop;

pub mod api;
pub mod cli;
pub mod discovery;
pub mod error;
pub mod fsutil;
pub mod inventory;
pub mod metrics;
pub mod rules;
pub mod target;
pub mod trigger;

/// Queued triggers. The ticker only enqueues into an empty queue, so at most
/// one tick is pending and the other slot is left for `SIGUSR1`.
const TRIGGER_QUEUE: usize = 2;

/// Runs gcesd until SIGINT or SIGTERM.
///
/// Loads and validates the rules, starts the metrics server, then drives the
/// discovery loop from a timer and `SIGUSR1`.
///
/// # Errors
///
/// Possible errors include:
/// - An unreadable, unparseable or invalid rule file.
/// - A zero discovery timeout.
/// - Failure to set up the HTTP client, metrics registry or signal handlers.
pub async fn run(cli: cli::Cli) -> Result<(), Box<dyn std::error::Error>> {
    let rules = RuleSet::load(&cli.config)?;
    log::info!(
        "Loaded {} rules from `{}`",
        rules.len(),
        cli.config.display()
    );
    check_schedule(cli.discovery_interval, cli.discovery_timeout)?;

    let token_source = match cli.access_token {
        Some(token) => TokenSource::Static(token),
        None => TokenSource::Metadata,
    };
    let lister = GceLister::new(cli.compute_endpoint, token_source)?;
    let metrics = Metrics::new()?;

    let mut discovery_loop = TriggerLoop::new(
        lister,
        rules,
        cli.output,
        cli.discovery_timeout,
        metrics.clone(),
    );
    discovery_loop.seed_from_output();

    {
        let addr = cli.metrics_addr;
        tokio::spawn(async move {
            let api = api::APIServer::new(metrics);
            if let Err(err) = api.listen(addr).await {
                log::error!("Could not serve metrics on {}: {}", addr, err);
                std::process::exit(1);
            }
        });
    }

    let (tx, rx) = tokio::sync::mpsc::channel(TRIGGER_QUEUE);
    trigger::spawn_signal_listener(tx.clone())?;
    trigger::spawn_ticker(cli.discovery_interval, tx);

    discovery_loop.run(rx, trigger::shutdown_signal()).await;
    Ok(())
}

fn check_schedule(interval: Duration, timeout: Duration) -> Result<(), String> {
    if timeout.is_zero() {
        return Err("discovery timeout must be greater than zero".to_owned());
    }
    if interval.is_zero() {
        return Err("discovery interval must be greater than zero".to_owned());
    }
    if timeout > interval {
        log::warn!(
            "Discovery timeout ({:?}) exceeds the interval ({:?}); ticks will be dropped while a cycle runs",
            timeout,
            interval
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_schedule() {
        assert!(check_schedule(Duration::from_secs(30), Duration::from_secs(25)).is_ok());
        assert!(check_schedule(Duration::from_secs(30), Duration::from_secs(60)).is_ok());
        assert!(check_schedule(Duration::from_secs(30), Duration::ZERO).is_err());
        assert!(check_schedule(Duration::ZERO, Duration::from_secs(25)).is_err());
    }
}
