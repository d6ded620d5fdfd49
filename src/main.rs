use clap::Parser;

/// Entry point for gcesd.
///
/// Loads the discovery rules, serves metrics and keeps the target file in
/// sync with the running Compute Engine instances until SIGINT/SIGTERM.
/// Send SIGUSR1 to force an immediate rewrite.
///
/// # Errors
///
/// Returns an error (and exits non-zero) if the rule file cannot be loaded or
/// validated, or if the process cannot set up its signal handlers.
///
/// # Examples
///
/// ```bash
/// RUST_LOG=info gcesd --config rules.yaml --output /etc/prometheus/gce.yaml
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    gcesd::run(gcesd::cli::Cli::parse()).await
}
