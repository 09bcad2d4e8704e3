//! Check suites and the explicit registry.
//!
//! Every check is registered here deliberately — name, documentation,
//! optional parameter block, routine. Registration order is execution
//! order. Nothing is discovered by naming convention.

pub mod databases;
pub mod nodes;

use std::collections::HashSet;

use anyhow::Context;
use serde_json::Value;

use crate::runner::{CheckContext, CheckDef, CheckFn};
use clusterhc_client::Target;
use clusterhc_client::models::Node;

fn def(name: &'static str, doc: &'static str, func: CheckFn) -> CheckDef {
    CheckDef {
        name,
        doc,
        takes_params: false,
        params: None,
        func,
    }
}

/// Build the full registry in execution order.
pub fn registry() -> Vec<CheckDef> {
    vec![
        def("node_os_version", nodes::OS_VERSION, |c, p| {
            Box::pin(nodes::os_version(c, p))
        }),
        def("node_software_version", nodes::SOFTWARE_VERSION, |c, p| {
            Box::pin(nodes::software_version(c, p))
        }),
        def("node_log_file_path", nodes::LOG_FILE_PATH, |c, p| {
            Box::pin(nodes::log_file_path(c, p))
        }),
        def("node_swappiness", nodes::SWAPPINESS, |c, p| {
            Box::pin(nodes::swappiness(c, p))
        }),
        def(
            "node_transparent_hugepages",
            nodes::TRANSPARENT_HUGEPAGES,
            |c, p| Box::pin(nodes::transparent_hugepages(c, p)),
        ),
        def("node_cpu_usage", nodes::CPU_USAGE, |c, p| {
            Box::pin(nodes::cpu_usage(c, p))
        }),
        def("node_ram_usage", nodes::RAM_USAGE, |c, p| {
            Box::pin(nodes::ram_usage(c, p))
        }),
        def(
            "node_ephemeral_storage",
            nodes::EPHEMERAL_STORAGE,
            |c, p| Box::pin(nodes::ephemeral_storage(c, p)),
        ),
        def(
            "node_persistent_storage",
            nodes::PERSISTENT_STORAGE,
            |c, p| Box::pin(nodes::persistent_storage(c, p)),
        ),
        def("node_network_link", nodes::NETWORK_LINK, |c, p| {
            Box::pin(nodes::network_link(c, p))
        }),
        CheckDef {
            name: "db_config",
            doc: databases::CONFIG,
            takes_params: true,
            params: None,
            func: |c, p| Box::pin(databases::config(c, p)),
        },
        def("db_oss_cluster_api", databases::OSS_CLUSTER_API, |c, p| {
            Box::pin(databases::oss_cluster_api(c, p))
        }),
        def("db_dense_placement", databases::DENSE_PLACEMENT, |c, p| {
            Box::pin(databases::dense_placement(c, p))
        }),
        def("db_modules", databases::MODULES, |c, p| {
            Box::pin(databases::modules(c, p))
        }),
        def("db_replica_sources", databases::REPLICA_SOURCES, |c, p| {
            Box::pin(databases::replica_sources(c, p))
        }),
        def("db_crdt_sources", databases::CRDT_SOURCES, |c, p| {
            Box::pin(databases::crdt_sources(c, p))
        }),
        def("db_endpoint_ping", databases::ENDPOINT_PING, |c, p| {
            Box::pin(databases::endpoint_ping(c, p))
        }),
        def("db_alerts", databases::ALERTS, |c, p| {
            Box::pin(databases::alerts(c, p))
        }),
        def("db_shard_throughput", databases::SHARD_THROUGHPUT, |c, p| {
            Box::pin(databases::shard_throughput(c, p))
        }),
        def("db_shard_memory", databases::SHARD_MEMORY, |c, p| {
            Box::pin(databases::shard_memory(c, p))
        }),
    ]
}

/// Attach parameter blocks from a table keyed by check name.
pub fn apply_params(registry: &mut [CheckDef], table: &Value) {
    for def in registry.iter_mut() {
        def.params = table.get(def.name).cloned();
    }
}

/// `node:{uid}` label for a target, resolved through the control plane.
pub(crate) async fn node_key(ctx: &CheckContext, target: &Target) -> anyhow::Result<String> {
    let uid = ctx
        .api
        .resolve_uid(ctx.rex.address_of(target))
        .await
        .with_context(|| format!("target {target} is not a known cluster node"))?;
    Ok(format!("node:{uid}"))
}

/// `node:{uid}` label, annotated when the node is quorum-only.
pub(crate) fn node_name(uid: u64, quorum_only: &HashSet<u64>) -> String {
    if quorum_only.contains(&uid) {
        format!("node:{uid} (quorum only)")
    } else {
        format!("node:{uid}")
    }
}

/// UIDs of quorum-only nodes, read via the cluster admin tool on the
/// first target. Quorum-only nodes participate in consensus but serve no
/// shards, so usage checks annotate rather than judge them.
pub(crate) async fn quorum_only_uids(ctx: &CheckContext) -> anyhow::Result<HashSet<u64>> {
    let nodes: Vec<Node> = ctx.api.get_as("nodes").await?;
    let probe = ctx
        .rex
        .targets()
        .first()
        .context("no targets configured")?;

    let mut quorum_only = HashSet::new();
    for node in &nodes {
        let output = ctx
            .rex
            .exec_one(
                &format!("sudo /opt/redislabs/bin/rladmin info node {}", node.uid),
                probe,
            )
            .await?;
        let enabled = output
            .lines()
            .find(|line| line.contains("quorum only"))
            .is_some_and(|line| line.contains("enabled"));
        if enabled {
            quorum_only.insert(node.uid);
        }
    }
    Ok(quorum_only)
}
