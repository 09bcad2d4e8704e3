//! clusterhc - health check for a distributed database cluster.
//!
//! Responsibilities:
//! - Parse command-line arguments and environment variables.
//! - Assemble the engine (API fetcher, remote executor) from layered
//!   configuration.
//! - Run the check registry sequentially and emit results through the
//!   selected renderer.
//!
//! Does NOT handle:
//! - Check logic (see `checks`) or engine internals (see
//!   `clusterhc-client`).
//!
//! Invariants:
//! - `.env` is loaded BEFORE CLI parsing so clap env defaults see it.
//! - The process exit status reflects the run: 0 healthy, 1 unhealthy,
//!   2 configuration error, 3 control plane unreachable, 130 interrupted.

mod args;
mod cancellation;
mod checks;
mod error;
mod render;
mod runner;

use std::time::Duration;

use clap::Parser;
use console::style;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use args::Cli;
use cancellation::CancellationToken;
use error::ExitCode;
use render::OutputFormat;
use runner::{CheckContext, CheckRunner};

use clusterhc_client::{ApiFetcher, RemoteExecutor};
use clusterhc_config::{ConfigLoader, parse_hosts_list};

#[tokio::main]
async fn main() {
    // .env before CLI parsing so clap env defaults can read .env values.
    let loader = ConfigLoader::new().load_dotenv();

    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let format = match cli.format.parse::<OutputFormat>() {
        Ok(format) => format,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(ExitCode::ConfigError.as_i32());
        }
    };

    if cli.list {
        print_check_list();
        std::process::exit(ExitCode::Success.as_i32());
    }

    // Layer configuration: CLI flags, then environment, then file.
    let mut loader = loader;
    if let Some(host) = cli.api_host {
        loader = loader.with_api_host(host);
    }
    if let Some(username) = cli.username {
        loader = loader.with_username(username);
    }
    if let Some(password) = cli.password {
        loader = loader.with_password(password);
    }
    if let Some(user) = cli.ssh_user {
        loader = loader.with_ssh_user(user);
    }
    if let Some(key) = cli.ssh_key {
        loader = loader.with_ssh_key(key);
    }
    if let Some(raw) = cli.ssh_hosts {
        match parse_hosts_list(&raw) {
            Ok(hosts) => loader = loader.with_hosts(hosts),
            Err(message) => {
                eprintln!("invalid --ssh-hosts: {message}");
                std::process::exit(ExitCode::ConfigError.as_i32());
            }
        }
    }
    if let Some(secs) = cli.timeout {
        loader = loader.with_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = cli.command_timeout {
        loader = loader.with_command_timeout(Duration::from_secs(secs));
    }
    if cli.skip_verify {
        loader = loader.with_skip_verify(true);
    }
    if cli.local {
        loader = loader.with_local(true);
    }
    if let Some(path) = cli.config {
        loader = loader.with_config_path(path);
    }

    let config = loader
        .from_env()
        .and_then(ConfigLoader::from_file)
        .and_then(ConfigLoader::build);
    let config = match config {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            std::process::exit(ExitCode::ConfigError.as_i32());
        }
    };

    let api = match ApiFetcher::from_config(&config.api) {
        Ok(api) => api,
        Err(err) => {
            eprintln!("could not set up the API client: {err}");
            std::process::exit(ExitCode::ConfigError.as_i32());
        }
    };
    let rex = match RemoteExecutor::from_config(&config.remote) {
        Ok(rex) => rex,
        Err(err) => {
            eprintln!("could not set up the remote executor: {err}");
            std::process::exit(ExitCode::ConfigError.as_i32());
        }
    };

    // Ctrl-C flips the token; the runner checks it between checks.
    let cancel = CancellationToken::new();
    let cancel_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\ninterrupt received, stopping after the current check");
            cancel_signal.cancel();
        }
    });

    // Without the control plane nothing meaningful can run; a dead
    // command channel only degrades the node checks.
    if !api.check_connection().await {
        eprintln!(
            "could not reach the control-plane API at {}",
            api.base_url()
        );
        std::process::exit(ExitCode::ConnectionError.as_i32());
    }
    if !rex.check_connection().await {
        tracing::warn!("no node reachable over the command channel; node checks will error");
    }

    let mut registry = checks::registry();
    if let Some(path) = cli.params {
        let table = std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|raw| serde_json::from_str(&raw).map_err(|e| e.to_string()));
        match table {
            Ok(table) => checks::apply_params(&mut registry, &table),
            Err(message) => {
                eprintln!("could not load parameter file {}: {message}", path.display());
                std::process::exit(ExitCode::ConfigError.as_i32());
            }
        }
    }
    if let Some(prefix) = &cli.suite {
        registry.retain(|def| def.name.starts_with(prefix.as_str()));
    }
    if let Some(name) = &cli.check {
        registry.retain(|def| def.name == name.as_str());
    }
    if registry.is_empty() {
        eprintln!("no checks matched the given filter");
        std::process::exit(ExitCode::ConfigError.as_i32());
    }

    let renderer = render::renderer_for(format);
    let ctx = CheckContext { api, rex };
    let mut runner = CheckRunner::new(&ctx, renderer.as_ref());
    let report = runner.run(&registry, &cancel).await;

    let code = if report.cancelled {
        ExitCode::Interrupted
    } else if report.stats.unhealthy() {
        ExitCode::ChecksFailed
    } else {
        ExitCode::Success
    };
    std::process::exit(code.as_i32());
}

fn print_check_list() {
    for def in checks::registry() {
        let marker = if def.takes_params {
            format!(" {}", style("[params]").red())
        } else {
            String::new()
        };
        println!(
            "{} {:<26} {}{marker}",
            style("-").yellow(),
            def.name,
            def.short_doc()
        );
    }
}
