use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::inventory::DEFAULT_COMPUTE_ENDPOINT;

/// Discovers Compute Engine instances and writes them as Prometheus file-based
/// discovery targets.
#[derive(Debug, Parser)]
#[command(name = "gcesd", version, about)]
pub struct Cli {
    /// Path to the YAML rule file.
    #[arg(long, env = "GCESD_CONFIG")]
    pub config: PathBuf,

    /// Path of the target file to maintain.
    #[arg(long, env = "GCESD_OUTPUT")]
    pub output: PathBuf,

    /// Period of discovery updates.
    #[arg(long, env = "GCESD_DISCOVERY_INTERVAL", default_value = "30s", value_parser = humantime::parse_duration)]
    pub discovery_interval: Duration,

    /// Upper bound for one discovery run.
    #[arg(long, env = "GCESD_DISCOVERY_TIMEOUT", default_value = "25s", value_parser = humantime::parse_duration)]
    pub discovery_timeout: Duration,

    /// Address to serve metrics on.
    #[arg(long, env = "GCESD_METRICS_ADDR", default_value = "0.0.0.0:8080")]
    pub metrics_addr: SocketAddr,

    /// Static OAuth2 bearer token. Defaults to the instance service account.
    #[arg(long, env = "GCESD_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Base URL of the Compute Engine API.
    #[arg(long, env = "GCESD_COMPUTE_ENDPOINT", default_value = DEFAULT_COMPUTE_ENDPOINT)]
    pub compute_endpoint: String,
}
