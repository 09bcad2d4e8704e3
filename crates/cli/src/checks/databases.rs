//! Database suite: configuration, status and usage of every database.

use std::time::Duration;

use anyhow::Context;
use serde_json::{Value, json};

use crate::runner::{CheckContext, CheckOutput, InfoMap, Outcome};
use clusterhc_client::format::{GB, to_gb, to_kops};
use clusterhc_client::models::{Database, ShardStats, SyncSource};
use clusterhc_client::ping::resp_ping;
use clusterhc_client::stats::summarize;

/// Per-endpoint budget for the liveness probe.
const PING_TIMEOUT: Duration = Duration::from_secs(5);

pub const CONFIG: &str = "\
check database configuration

Compares each database against the expected values from this check's
parameter block. Without parameters it reports a configuration subset
per database instead of judging it.

Remedy: Adapt the database configuration in the UI or through the REST API.";

pub async fn config(ctx: &CheckContext, params: Option<&Value>) -> anyhow::Result<CheckOutput> {
    let raw = ctx.api.get("bdbs").await?;
    let entries = raw
        .as_array()
        .context("bdbs topic is not an array")?;

    let mut outcomes = Vec::with_capacity(entries.len());
    match params {
        None => {
            let bdbs: Vec<Database> = ctx.api.get_as("bdbs").await?;
            for bdb in &bdbs {
                let mut info = InfoMap::new();
                info.insert("uid".to_string(), json!(bdb.uid));
                info.insert(
                    "memory limit".to_string(),
                    json!(format!(
                        "{} GB",
                        to_gb(bdb.memory_size.unwrap_or_default() as f64)
                    )),
                );
                info.insert("master shards".to_string(), json!(bdb.shards_count));
                info.insert("HA".to_string(), json!(bdb.replication));
                info.insert("OSS cluster".to_string(), json!(bdb.oss_cluster));
                info.insert("CRDB".to_string(), json!(bdb.crdt));
                outcomes.push(
                    Outcome::report(info)
                        .described(format!("get configuration of '{}'", bdb.name)),
                );
            }
        }
        Some(table) => {
            let defaults = table
                .get("__default__")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            for entry in entries {
                let name = entry.get("name").and_then(Value::as_str).unwrap_or("?");
                let mut expected = defaults.clone();
                if let Some(overrides) = table.get(name).and_then(Value::as_object) {
                    expected.extend(overrides.clone());
                }

                // Report only the keys that deviate, with their actual values.
                let mut info = InfoMap::new();
                for (key, wanted) in &expected {
                    if entry.get(key) != Some(wanted) {
                        info.insert(key.clone(), entry.get(key).cloned().unwrap_or(Value::Null));
                    }
                }
                let healthy = info.is_empty();
                outcomes.push(
                    Outcome::passing(healthy, info)
                        .described(format!("check configuration of '{name}'")),
                );
            }
        }
    }
    Ok(outcomes.into())
}

pub const OSS_CLUSTER_API: &str = "\
check OSS cluster API prerequisites of each database

Databases exposing the OSS cluster API need sparse shard placement and
the all-master-shards proxy policy.

Remedy: Adapt the database configuration through `rladmin`.";

pub async fn oss_cluster_api(
    ctx: &CheckContext,
    _params: Option<&Value>,
) -> anyhow::Result<CheckOutput> {
    let bdbs: Vec<Database> = ctx.api.get_as("bdbs").await?;

    let mut info = InfoMap::new();
    let mut healthy = true;
    for bdb in bdbs.iter().filter(|bdb| bdb.oss_cluster) {
        let ok = bdb.shards_placement.as_deref() == Some("sparse")
            && bdb.proxy_policy.as_deref() == Some("all-master-shards");
        if !ok {
            healthy = false;
        }
        info.insert(bdb.name.clone(), json!(ok));
    }
    if info.is_empty() {
        return Ok(Outcome::skip().into());
    }
    Ok(Outcome::passing(healthy, info).into())
}

pub const DENSE_PLACEMENT: &str = "\
check dense shard placement of each database

Databases with dense placement must run their master shards on the same
node as their single proxy.

Remedy: Move all master shards to the node where the proxy runs.";

pub async fn dense_placement(
    ctx: &CheckContext,
    _params: Option<&Value>,
) -> anyhow::Result<CheckOutput> {
    let bdbs: Vec<Database> = ctx.api.get_as("bdbs").await?;
    let dense: Vec<&Database> = bdbs
        .iter()
        .filter(|bdb| bdb.shards_placement.as_deref() == Some("dense"))
        .collect();
    if dense.is_empty() {
        return Ok(Outcome::skip().into());
    }

    let nodes = ctx.api.get("nodes").await?;
    let nodes = nodes.as_array().context("nodes topic is not an array")?;
    let shards = ctx.api.get("shards").await?;
    let shards = shards.as_array().context("shards topic is not an array")?;

    let mut info = InfoMap::new();
    let mut violations = 0usize;
    for bdb in dense {
        if bdb.proxy_policy.as_deref() != Some("single") {
            info.insert(
                bdb.name.clone(),
                json!(format!(
                    "proxy policy set to '{}' instead of 'single'",
                    bdb.proxy_policy.as_deref().unwrap_or("none")
                )),
            );
            violations += 1;
            continue;
        }

        let endpoint_addr = bdb
            .endpoints
            .first()
            .and_then(|endpoint| endpoint.addr.first());
        let endpoint_node = endpoint_addr.and_then(|addr| {
            nodes.iter().find_map(|node| {
                (node.get("addr").and_then(Value::as_str) == Some(addr.as_str()))
                    .then(|| node.get("uid").and_then(uid_value))
                    .flatten()
            })
        });
        let Some(endpoint_uid) = endpoint_node else {
            info.insert(bdb.name.clone(), json!("no endpoint node found"));
            violations += 1;
            continue;
        };

        let strays: Vec<String> = shards
            .iter()
            .filter(|shard| {
                shard.get("bdb_uid").and_then(uid_value) == Some(bdb.uid)
                    && shard.get("role").and_then(Value::as_str) == Some("master")
                    && shard.get("node_uid").and_then(uid_value) != Some(endpoint_uid)
            })
            .filter_map(|shard| shard.get("uid").and_then(uid_value))
            .map(|uid| format!("shard:{uid}"))
            .collect();
        if !strays.is_empty() {
            info.insert(bdb.name.clone(), json!(strays));
            violations += 1;
        }
    }
    Ok(Outcome::passing(violations == 0, info).into())
}

pub const MODULES: &str = "get loaded modules of each database";

pub async fn modules(
    ctx: &CheckContext,
    _params: Option<&Value>,
) -> anyhow::Result<CheckOutput> {
    let bdbs: Vec<Database> = ctx.api.get_as("bdbs").await?;

    let mut info = InfoMap::new();
    for bdb in &bdbs {
        let modules = if bdb.module_list.is_empty() {
            Value::Null
        } else {
            Value::Array(bdb.module_list.clone())
        };
        info.insert(bdb.name.clone(), modules);
    }
    Ok(Outcome::report(info).into())
}

pub const REPLICA_SOURCES: &str = "\
check replica-of sources of each database

Every configured replication source must report in-sync.

Remedy: Investigate the network link between the participating databases.";

pub async fn replica_sources(
    ctx: &CheckContext,
    _params: Option<&Value>,
) -> anyhow::Result<CheckOutput> {
    let bdbs: Vec<Database> = ctx.api.get_as("bdbs").await?;
    Ok(sync_sources_outcome(
        &bdbs,
        "replica_sync",
        |bdb| (&bdb.replica_sources, bdb.replica_sync.as_deref()),
    )
    .into())
}

pub const CRDT_SOURCES: &str = "\
check CRDT sources of each database

Every active-active participant must report in-sync.

Remedy: Investigate the network link between the participating databases.";

pub async fn crdt_sources(
    ctx: &CheckContext,
    _params: Option<&Value>,
) -> anyhow::Result<CheckOutput> {
    let bdbs: Vec<Database> = ctx.api.get_as("bdbs").await?;
    Ok(sync_sources_outcome(&bdbs, "crdt_sync", |bdb| {
        (&bdb.crdt_sources, bdb.crdt_sync.as_deref())
    })
    .into())
}

pub const ENDPOINT_PING: &str = "\
check endpoint liveness of each database

Sends a PING to every database endpoint and expects PONG back.

Remedy: Investigate the network connection to the endpoint.";

pub async fn endpoint_ping(
    ctx: &CheckContext,
    _params: Option<&Value>,
) -> anyhow::Result<CheckOutput> {
    let bdbs: Vec<Database> = ctx.api.get_as("bdbs").await?;

    let mut info = InfoMap::new();
    let mut healthy = true;
    for bdb in &bdbs {
        let Some(endpoint) = bdb.client_endpoint() else {
            info.insert(bdb.name.clone(), json!("no endpoint configured"));
            healthy = false;
            continue;
        };
        let Some(addr) = endpoint.addr.first() else {
            info.insert(bdb.name.clone(), json!("endpoint has no address"));
            healthy = false;
            continue;
        };

        let alive = resp_ping(addr, endpoint.port, PING_TIMEOUT).await?;
        if !alive {
            healthy = false;
        }
        let label = endpoint
            .dns_name
            .clone()
            .unwrap_or_else(|| format!("{addr}:{}", endpoint.port));
        info.insert(label, json!(alive));
    }
    Ok(Outcome::passing(healthy, info).into())
}

pub const ALERTS: &str = "\
check triggered database alerts

Remedy: Investigate triggered alerts in the cluster log files.";

pub async fn alerts(
    ctx: &CheckContext,
    _params: Option<&Value>,
) -> anyhow::Result<CheckOutput> {
    let alerts = ctx.api.get("bdbs/alerts").await?;
    let alerts = alerts
        .as_object()
        .context("bdbs/alerts topic is not an object")?;

    let mut info = InfoMap::new();
    for (uid, entries) in alerts {
        let Some(entries) = entries.as_object() else {
            continue;
        };
        let triggered: Vec<&str> = entries
            .iter()
            .filter(|(_, alert)| {
                alert
                    .get("state")
                    .and_then(Value::as_bool)
                    .unwrap_or(false)
            })
            .map(|(name, _)| name.as_str())
            .collect();
        if !triggered.is_empty() {
            info.insert(format!("db:{uid}"), json!(triggered));
        }
    }
    let healthy = info.is_empty();
    Ok(Outcome::passing(healthy, info).into())
}

pub const SHARD_THROUGHPUT: &str = "\
check throughput of each shard

Summarizes requests per second over the telemetry window and compares
the maximum against the recommended per-shard ceiling.

Remedy: Add more shards or investigate the key distribution.";

pub async fn shard_throughput(
    ctx: &CheckContext,
    _params: Option<&Value>,
) -> anyhow::Result<CheckOutput> {
    let bdbs: Vec<Database> = ctx.api.get_as("bdbs").await?;
    shard_usage(ctx, &bdbs, "total_req", "throughput", to_kops, "Kops", |bdb| {
        if bdb.bigstore {
            5_000.0
        } else if bdb.crdt_sync.as_deref().is_some_and(|sync| sync != "disabled") {
            17_500.0
        } else {
            25_000.0
        }
    })
    .await
    .map(CheckOutput::from)
}

pub const SHARD_MEMORY: &str = "\
check memory usage of each shard

Summarizes used memory over the telemetry window and compares the
maximum against the recommended per-shard ceiling.

Remedy: Add more shards or investigate the key distribution.";

pub async fn shard_memory(
    ctx: &CheckContext,
    _params: Option<&Value>,
) -> anyhow::Result<CheckOutput> {
    let bdbs: Vec<Database> = ctx.api.get_as("bdbs").await?;
    shard_usage(ctx, &bdbs, "used_memory", "memory usage", to_gb, "GB", |bdb| {
        if bdb.bigstore { 50.0 * GB } else { 25.0 * GB }
    })
    .await
    .map(CheckOutput::from)
}

/// Shared body of the per-shard usage checks: one outcome per database,
/// one info entry per shard.
async fn shard_usage(
    ctx: &CheckContext,
    bdbs: &[Database],
    field: &str,
    subject: &str,
    unit_fmt: fn(f64) -> String,
    unit: &str,
    ceiling_for: impl Fn(&Database) -> f64,
) -> anyhow::Result<Vec<Outcome>> {
    let mut outcomes = Vec::with_capacity(bdbs.len());
    for bdb in bdbs {
        let ceiling = ceiling_for(bdb);
        let mut info = InfoMap::new();
        let mut healthy = true;
        for shard_uid in &bdb.shard_list {
            let stats: ShardStats = ctx.api.get_as(&format!("shards/stats/{shard_uid}")).await?;
            let summary = summarize(&stats.intervals, field)?;
            if summary.max > ceiling {
                healthy = false;
            }
            let role = stats.role.as_deref().unwrap_or("unknown");
            info.insert(
                format!("shard:{shard_uid} ({role})"),
                Value::String(format!(
                    "{}/{}/{}/{} {unit}",
                    unit_fmt(summary.min),
                    unit_fmt(summary.avg),
                    unit_fmt(summary.max),
                    unit_fmt(summary.std_dev)
                )),
            );
        }
        outcomes.push(
            Outcome::passing(healthy, info)
                .described(format!("check {subject} of '{}' (min/avg/max/dev)", bdb.name)),
        );
    }
    Ok(outcomes)
}

/// One outcome covering every database that has sync sources configured;
/// skipped when none do.
fn sync_sources_outcome<'d>(
    bdbs: &'d [Database],
    sync_label: &str,
    pick: impl Fn(&'d Database) -> (&'d Vec<SyncSource>, Option<&'d str>),
) -> Outcome {
    let mut info = InfoMap::new();
    let mut healthy = true;
    for bdb in bdbs {
        let (sources, sync_state) = pick(bdb);
        if sources.is_empty() {
            continue;
        }

        let mut db_info = InfoMap::new();
        db_info.insert(sync_label.to_string(), json!(sync_state));
        for source in sources {
            if source.status.as_deref() != Some("in-sync") {
                healthy = false;
            }
            db_info.insert(
                source.address().to_string(),
                json!({
                    "status": source.status,
                    "lag": source.lag,
                    "compression": source.compression,
                }),
            );
        }
        info.insert(bdb.name.clone(), Value::Object(db_info));
    }

    if info.is_empty() {
        return Outcome::skip();
    }
    Outcome::passing(healthy, info)
}

/// UIDs appear as numbers or decimal strings depending on the topic.
fn uid_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
