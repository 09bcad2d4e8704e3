//! Node suite: setup, configuration and usage of each cluster node.

use anyhow::Context;
use serde_json::Value;

use crate::checks::{node_key, node_name, quorum_only_uids};
use crate::runner::{CheckContext, CheckOutput, InfoMap, Outcome};
use clusterhc_client::format::{to_gb, to_ms, to_percent};
use clusterhc_client::models::NodeStats;
use clusterhc_client::resolve_all;
use clusterhc_client::stats::{Summary, summarize, summarize_by};

pub const OS_VERSION: &str = "get OS version of each node";

pub async fn os_version(
    ctx: &CheckContext,
    _params: Option<&Value>,
) -> anyhow::Result<CheckOutput> {
    let handles = ctx
        .rex
        .exec_broadcast("cat /etc/os-release | grep PRETTY_NAME");

    let mut info = InfoMap::new();
    for (target, outcome) in resolve_all(handles).await {
        let output = outcome?;
        let pretty = output
            .trim()
            .strip_prefix("PRETTY_NAME=")
            .map(|v| v.trim_matches('"'))
            .with_context(|| format!("unexpected os-release output from {target}"))?;
        info.insert(node_key(ctx, &target).await?, Value::String(pretty.to_string()));
    }
    Ok(Outcome::report(info).into())
}

pub const SOFTWARE_VERSION: &str = "get cluster software version of each node";

pub async fn software_version(
    ctx: &CheckContext,
    _params: Option<&Value>,
) -> anyhow::Result<CheckOutput> {
    let uids = ctx.api.get_values("nodes", "uid").await?;
    let versions = ctx.api.get_values("nodes", "software_version").await?;

    let mut info = InfoMap::new();
    for (uid, version) in uids.iter().zip(versions) {
        info.insert(format!("node:{uid}"), version);
    }
    Ok(Outcome::report(info).into())
}

pub const LOG_FILE_PATH: &str = "\
check if log file path is not on the root filesystem

Reads the device backing the log directory on every node.

Remedy: Move the log directory to a dedicated volume.";

pub async fn log_file_path(
    ctx: &CheckContext,
    _params: Option<&Value>,
) -> anyhow::Result<CheckOutput> {
    let handles = ctx.rex.exec_broadcast("sudo df -h /var/opt/redislabs/log");

    let mut info = InfoMap::new();
    let mut healthy = true;
    for (target, outcome) in resolve_all(handles).await {
        let output = outcome?;
        let device = mounted_device(&output)
            .with_context(|| format!("unexpected df output from {target}"))?
            .to_string();
        if device.contains("/dev/root") {
            healthy = false;
        }
        info.insert(node_key(ctx, &target).await?, Value::String(device));
    }
    Ok(Outcome::passing(healthy, info).into())
}

pub const SWAPPINESS: &str = "\
check if swap is disabled on each node

Remedy: Disable swap in /etc/sysctl.conf and reboot the node.";

pub async fn swappiness(
    ctx: &CheckContext,
    _params: Option<&Value>,
) -> anyhow::Result<CheckOutput> {
    let handles = ctx
        .rex
        .exec_broadcast("grep swap /etc/sysctl.conf || echo inactive");

    let mut info = InfoMap::new();
    let mut healthy = true;
    for (target, outcome) in resolve_all(handles).await {
        let value = outcome?.trim().to_string();
        if value != "inactive" {
            healthy = false;
        }
        info.insert(node_key(ctx, &target).await?, Value::String(value));
    }
    Ok(Outcome::passing(healthy, info).into())
}

pub const TRANSPARENT_HUGEPAGES: &str = "\
check if transparent hugepages are disabled on each node

Remedy: Set /sys/kernel/mm/transparent_hugepage/enabled to 'never'.";

pub async fn transparent_hugepages(
    ctx: &CheckContext,
    _params: Option<&Value>,
) -> anyhow::Result<CheckOutput> {
    let handles = ctx
        .rex
        .exec_broadcast("cat /sys/kernel/mm/transparent_hugepage/enabled");

    let mut info = InfoMap::new();
    let mut healthy = true;
    for (target, outcome) in resolve_all(handles).await {
        let value = outcome?.trim().to_string();
        if value != "always madvise [never]" {
            healthy = false;
        }
        info.insert(node_key(ctx, &target).await?, Value::String(value));
    }
    Ok(Outcome::passing(healthy, info).into())
}

pub const CPU_USAGE: &str = "check CPU usage (min/avg/max/dev) of each node";

/// Maximum CPU usage a node may touch before the check fails.
const CPU_USAGE_CEILING: f64 = 0.8;

pub async fn cpu_usage(
    ctx: &CheckContext,
    _params: Option<&Value>,
) -> anyhow::Result<CheckOutput> {
    let quorum_only = quorum_only_uids(ctx).await?;
    let windows: Vec<NodeStats> = ctx.api.get_as("nodes/stats").await?;

    let mut info = InfoMap::new();
    let mut healthy = true;
    for window in windows {
        let summary = summarize_by(&window.intervals, "cpu_idle", |idle| 1.0 - idle)?;
        if summary.max > CPU_USAGE_CEILING {
            healthy = false;
        }
        info.insert(
            node_name(window.uid, &quorum_only),
            Value::String(format!(
                "{}/{}/{}/{} %",
                to_percent(summary.min),
                to_percent(summary.avg),
                to_percent(summary.max),
                to_percent(summary.std_dev)
            )),
        );
    }
    Ok(Outcome::passing(healthy, info).into())
}

pub const RAM_USAGE: &str = "check RAM usage (min/avg/max/dev) of each node";

pub async fn ram_usage(
    ctx: &CheckContext,
    _params: Option<&Value>,
) -> anyhow::Result<CheckOutput> {
    let mut info = InfoMap::new();
    let mut healthy = true;
    for window in capacity_windows(ctx, "free_memory", "total_memory").await? {
        // A node must keep two thirds of its memory available at all
        // times; dipping below that is a capacity failure.
        if window.summary.min < window.capacity * 2.0 / 3.0 {
            healthy = false;
        }
        info.insert(window.name.clone(), Value::String(used_line(&window)));
    }
    Ok(Outcome::passing(healthy, info).into())
}

pub const EPHEMERAL_STORAGE: &str = "get ephemeral storage usage (min/avg/max/dev) of each node";

pub async fn ephemeral_storage(
    ctx: &CheckContext,
    _params: Option<&Value>,
) -> anyhow::Result<CheckOutput> {
    let mut info = InfoMap::new();
    for window in capacity_windows(ctx, "ephemeral_storage_avail", "ephemeral_storage_size").await?
    {
        info.insert(window.name.clone(), Value::String(used_line(&window)));
    }
    Ok(Outcome::report(info).into())
}

pub const PERSISTENT_STORAGE: &str = "get persistent storage usage (min/avg/max/dev) of each node";

pub async fn persistent_storage(
    ctx: &CheckContext,
    _params: Option<&Value>,
) -> anyhow::Result<CheckOutput> {
    let mut info = InfoMap::new();
    for window in
        capacity_windows(ctx, "persistent_storage_avail", "persistent_storage_size").await?
    {
        info.insert(window.name.clone(), Value::String(used_line(&window)));
    }
    Ok(Outcome::report(info).into())
}

pub const NETWORK_LINK: &str = "get network link speed between nodes";

pub async fn network_link(
    ctx: &CheckContext,
    _params: Option<&Value>,
) -> anyhow::Result<CheckOutput> {
    let address_map = ctx.rex.address_map();
    let mut jobs = Vec::new();
    for source in ctx.rex.targets() {
        for (&external, &internal) in &address_map {
            if external == source.addr {
                continue;
            }
            jobs.push((format!("ping -c 4 {internal}"), source.clone()));
        }
    }
    if jobs.is_empty() {
        // Single-node cluster, nothing to measure.
        return Ok(Outcome::skip().into());
    }

    let results = resolve_all(ctx.rex.exec_batch(jobs)).await;
    let count = results.len() as f64;

    let mut label = "rtt min/avg/max/mdev".to_string();
    let mut min = f64::INFINITY;
    let mut max: f64 = 0.0;
    let mut avg_sum = 0.0;
    let mut mdev_sum = 0.0;
    for (target, outcome) in results {
        let output = outcome?;
        let (line_label, rtt) = parse_rtt_line(&output)
            .with_context(|| format!("unexpected ping output from {target}"))?;
        label = line_label;
        min = min.min(rtt[0]);
        avg_sum += rtt[1];
        max = max.max(rtt[2]);
        mdev_sum += rtt[3];
    }

    let mut info = InfoMap::new();
    info.insert(
        label,
        Value::String(format!(
            "{}/{}/{}/{} ms",
            to_ms(min),
            to_ms(avg_sum / count),
            to_ms(max),
            to_ms(mdev_sum / count)
        )),
    );
    Ok(Outcome::report(info).into())
}

/// One node's telemetry window paired with the matching capacity value
/// from its `nodes/{uid}` topic.
struct CapacityWindow {
    name: String,
    summary: Summary,
    capacity: f64,
}

async fn capacity_windows(
    ctx: &CheckContext,
    field: &str,
    capacity_key: &str,
) -> anyhow::Result<Vec<CapacityWindow>> {
    let quorum_only = quorum_only_uids(ctx).await?;
    let windows: Vec<NodeStats> = ctx.api.get_as("nodes/stats").await?;

    let mut out = Vec::with_capacity(windows.len());
    for window in windows {
        let summary = summarize(&window.intervals, field)?;
        let capacity = ctx
            .api
            .get_value(&format!("nodes/{}", window.uid), capacity_key)
            .await?
            .as_f64()
            .with_context(|| format!("node {} has no numeric {capacity_key}", window.uid))?;
        out.push(CapacityWindow {
            name: node_name(window.uid, &quorum_only),
            summary,
            capacity,
        });
    }
    Ok(out)
}

/// Usage formatted as used GB: the window tracks *available* space, so
/// min used corresponds to max available and vice versa.
fn used_line(window: &CapacityWindow) -> String {
    format!(
        "{}/{}/{}/{} GB",
        to_gb(window.capacity - window.summary.max),
        to_gb(window.capacity - window.summary.avg),
        to_gb(window.capacity - window.summary.min),
        to_gb(window.summary.std_dev)
    )
}

/// First column of the second `df` output line — the backing device.
fn mounted_device(output: &str) -> Option<&str> {
    output.lines().nth(1)?.split_whitespace().next()
}

/// Parse ping's trailing `rtt min/avg/max/mdev = a/b/c/d ms` line.
fn parse_rtt_line(output: &str) -> Option<(String, [f64; 4])> {
    let line = output.lines().rev().find(|line| line.contains(" = "))?;
    let (label, rest) = line.split_once(" = ")?;
    let values = rest.split_whitespace().next()?;
    let mut rtt = [0.0; 4];
    for (slot, part) in rtt.iter_mut().zip(values.split('/')) {
        *slot = part.parse().ok()?;
    }
    Some((label.to_string(), rtt))
}
