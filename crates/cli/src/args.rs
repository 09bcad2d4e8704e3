//! CLI argument definitions.
//!
//! Responsibilities:
//! - Define the CLI structure using clap derive macros.
//! - Parse command-line arguments and environment variables.
//!
//! Non-responsibilities:
//! - Does not load configuration files (see `clusterhc-config`).
//! - Does not run checks (see `main`/`runner`).

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "clusterhc")]
#[command(about = "Health check for a distributed database cluster", long_about = None)]
#[command(version)]
#[command(
    after_help = "Examples:\n  clusterhc --config cluster.json\n  clusterhc --format json > results.ndjson\n  clusterhc --suite node\n  clusterhc --check db_shard_throughput\n  clusterhc --list\n"
)]
pub struct Cli {
    /// Control-plane API host (bare host, host:port, or full URL)
    #[arg(long, env = "CLUSTERHC_API_HOST")]
    pub api_host: Option<String>,

    /// API username for basic authentication
    #[arg(short, long, env = "CLUSTERHC_API_USER")]
    pub username: Option<String>,

    /// API password for basic authentication
    #[arg(short, long, env = "CLUSTERHC_API_PASSWORD")]
    pub password: Option<String>,

    /// Login user for remote command execution
    #[arg(long, env = "CLUSTERHC_SSH_USER")]
    pub ssh_user: Option<String>,

    /// Identity file for the ssh transport
    #[arg(long, env = "CLUSTERHC_SSH_KEY", value_name = "FILE")]
    pub ssh_key: Option<PathBuf>,

    /// Comma-separated node list: [user@]addr[=internal],...
    #[arg(long, env = "CLUSTERHC_SSH_HOSTS")]
    pub ssh_hosts: Option<String>,

    /// API request timeout in seconds
    #[arg(long, env = "CLUSTERHC_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Per-command timeout in seconds for remote execution
    #[arg(long, env = "CLUSTERHC_COMMAND_TIMEOUT")]
    pub command_timeout: Option<u64>,

    /// Skip TLS certificate verification (self-signed control planes)
    #[arg(long, env = "CLUSTERHC_SKIP_VERIFY")]
    pub skip_verify: bool,

    /// Run node commands on the local host instead of over ssh
    #[arg(long, env = "CLUSTERHC_LOCAL")]
    pub local: bool,

    /// Path to the JSON config file
    #[arg(long, env = "CLUSTERHC_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format (basic, json)
    #[arg(short, long, default_value = "basic")]
    pub format: String,

    /// JSON file with parameter blocks keyed by check name
    #[arg(long, value_name = "FILE")]
    pub params: Option<PathBuf>,

    /// Only run checks whose name starts with this prefix (e.g. node, db)
    #[arg(long, conflicts_with = "check")]
    pub suite: Option<String>,

    /// Only run the named check
    #[arg(long)]
    pub check: Option<String>,

    /// List available checks and exit
    #[arg(short, long)]
    pub list: bool,
}
