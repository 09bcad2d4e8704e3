//! Check runner and the uniform result model.
//!
//! Responsibilities:
//! - Define the closed result vocabulary: [`CheckStatus`], [`Outcome`],
//!   [`ResultRecord`], [`RunStats`].
//! - Drive a fixed registry of checks strictly in registration order,
//!   one at a time, flattening single- and multi-outcome checks into
//!   independent records.
//! - Contain failures: a check that returns an error produces exactly
//!   one `Errored` record and never aborts the run.
//!
//! Does NOT handle:
//! - Rendering (see `render`); the runner only forwards records.
//! - Concurrency; checks run sequentially, so the runner and its
//!   counters need no locking.
//!
//! Invariants:
//! - Every outcome increments exactly one [`RunStats`] counter.
//! - The summary is rendered exactly once, after the last check (or
//!   after the check during which cancellation was observed).

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::debug;

use crate::cancellation::CancellationToken;
use crate::render::Renderer;
use clusterhc_client::{ApiFetcher, RemoteExecutor};

/// Ordered label→value mapping attached to a record. With the
/// `preserve_order` feature this keeps insertion order end to end.
pub type InfoMap = serde_json::Map<String, Value>;

/// Classified outcome of one check (or one sub-item of a check).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Succeeded,
    Failed,
    NoResult,
    Skipped,
    Errored,
}

impl CheckStatus {
    /// Wire label shared by both renderers.
    pub fn label(self) -> &'static str {
        match self {
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::NoResult => "NO RESULT",
            Self::Skipped => "SKIPPED",
            Self::Errored => "ERROR",
        }
    }
}

/// What a check asserts about its subject, before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The assertion held.
    Pass,
    /// The assertion did not hold.
    Fail,
    /// Nothing to assert, the check only gathered information.
    Info,
    /// The check did not apply to this cluster.
    Skip,
}

/// One raw outcome as produced by a check.
#[derive(Debug)]
pub struct Outcome {
    pub verdict: Verdict,
    pub info: InfoMap,
    /// Overrides the check's short doc when set (used by per-database
    /// outcomes that name their subject).
    pub description: Option<String>,
}

impl Outcome {
    pub fn new(verdict: Verdict, info: InfoMap) -> Self {
        Self {
            verdict,
            info,
            description: None,
        }
    }

    pub fn pass(info: InfoMap) -> Self {
        Self::new(Verdict::Pass, info)
    }

    pub fn fail(info: InfoMap) -> Self {
        Self::new(Verdict::Fail, info)
    }

    /// Pass/fail depending on `healthy`.
    pub fn passing(healthy: bool, info: InfoMap) -> Self {
        Self::new(if healthy { Verdict::Pass } else { Verdict::Fail }, info)
    }

    /// Information-only outcome, classified as `NO RESULT`.
    pub fn report(info: InfoMap) -> Self {
        Self::new(Verdict::Info, info)
    }

    /// The check does not apply to this cluster.
    pub fn skip() -> Self {
        Self::new(Verdict::Skip, InfoMap::new())
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A check returns either one outcome or one outcome per sub-resource.
#[derive(Debug)]
pub enum CheckOutput {
    Single(Outcome),
    Many(Vec<Outcome>),
}

impl CheckOutput {
    fn into_outcomes(self) -> Vec<Outcome> {
        match self {
            Self::Single(outcome) => vec![outcome],
            Self::Many(outcomes) => outcomes,
        }
    }
}

impl From<Outcome> for CheckOutput {
    fn from(outcome: Outcome) -> Self {
        Self::Single(outcome)
    }
}

impl From<Vec<Outcome>> for CheckOutput {
    fn from(outcomes: Vec<Outcome>) -> Self {
        Self::Many(outcomes)
    }
}

/// Shared engine handles injected into every check.
pub struct CheckContext {
    pub api: ApiFetcher,
    pub rex: RemoteExecutor,
}

/// A check routine. Both references share one lifetime so the registry
/// can hold plain function pointers.
pub type CheckFn =
    for<'a> fn(&'a CheckContext, Option<&'a Value>) -> BoxFuture<'a, anyhow::Result<CheckOutput>>;

/// One registry entry: name, documentation, optional parameter block,
/// and the routine itself. The registry is built explicitly at startup —
/// nothing is discovered by naming convention.
pub struct CheckDef {
    pub name: &'static str,
    /// Full documentation. The first line is the short description; a
    /// `Remedy:` line, when present, is attached to failed records.
    pub doc: &'static str,
    /// Whether the check interprets a parameter block.
    pub takes_params: bool,
    pub params: Option<Value>,
    pub func: CheckFn,
}

impl CheckDef {
    pub fn short_doc(&self) -> &str {
        self.doc.lines().next().unwrap_or(self.name).trim()
    }

    /// Operator guidance scanned out of the documentation.
    pub fn remedy(&self) -> Option<String> {
        self.doc
            .lines()
            .find_map(|line| line.trim().strip_prefix("Remedy:"))
            .map(|rest| rest.trim().to_string())
    }
}

/// The unit handed to renderers, one per outcome.
#[derive(Debug, Clone)]
pub struct ResultRecord {
    pub status: CheckStatus,
    pub info: InfoMap,
    pub description: String,
    /// Present only when the record failed and the check documents a
    /// remedy.
    pub remedy: Option<String>,
}

/// Monotonic per-run counters, one per status.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub succeeded: u64,
    pub no_result: u64,
    pub failed: u64,
    pub errors: u64,
    pub skipped: u64,
}

impl RunStats {
    pub fn total(&self) -> u64 {
        self.succeeded + self.no_result + self.failed + self.errors + self.skipped
    }

    /// True when the run should signal unhealthy to automation.
    pub fn unhealthy(&self) -> bool {
        self.failed > 0 || self.errors > 0
    }

    fn record(&mut self, status: CheckStatus) {
        match status {
            CheckStatus::Succeeded => self.succeeded += 1,
            CheckStatus::NoResult => self.no_result += 1,
            CheckStatus::Failed => self.failed += 1,
            CheckStatus::Errored => self.errors += 1,
            CheckStatus::Skipped => self.skipped += 1,
        }
    }
}

/// Result of a whole run.
#[derive(Debug)]
pub struct RunReport {
    pub stats: RunStats,
    pub cancelled: bool,
}

/// Drives the registry and owns the run counters.
pub struct CheckRunner<'a> {
    ctx: &'a CheckContext,
    renderer: &'a dyn Renderer,
    stats: RunStats,
}

impl<'a> CheckRunner<'a> {
    pub fn new(ctx: &'a CheckContext, renderer: &'a dyn Renderer) -> Self {
        Self {
            ctx,
            renderer,
            stats: RunStats::default(),
        }
    }

    /// Run every registry entry in order, then emit the summary.
    ///
    /// The cancellation token is consulted between checks, never
    /// mid-check; a cancelled run still renders the summary of what it
    /// measured.
    pub async fn run(&mut self, registry: &[CheckDef], cancel: &CancellationToken) -> RunReport {
        let mut cancelled = false;
        for def in registry {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            self.run_check(def).await;
        }
        self.renderer.summary(&self.stats);
        RunReport {
            stats: self.stats,
            cancelled,
        }
    }

    async fn run_check(&mut self, def: &CheckDef) {
        debug!(check = def.name, "running check");
        match (def.func)(self.ctx, def.params.as_ref()).await {
            Ok(output) => {
                for outcome in output.into_outcomes() {
                    let record = classify(def, outcome);
                    self.emit(def, record);
                }
            }
            Err(err) => {
                let mut info = InfoMap::new();
                info.insert("error".to_string(), Value::String(format!("{err:#}")));
                self.emit(
                    def,
                    ResultRecord {
                        status: CheckStatus::Errored,
                        info,
                        description: def.short_doc().to_string(),
                        remedy: None,
                    },
                );
            }
        }
    }

    fn emit(&mut self, def: &CheckDef, record: ResultRecord) {
        self.renderer.result(&record, def);
        self.stats.record(record.status);
    }
}

fn classify(def: &CheckDef, outcome: Outcome) -> ResultRecord {
    let status = match outcome.verdict {
        Verdict::Pass => CheckStatus::Succeeded,
        Verdict::Fail => CheckStatus::Failed,
        Verdict::Info => CheckStatus::NoResult,
        Verdict::Skip => CheckStatus::Skipped,
    };
    let description = outcome
        .description
        .unwrap_or_else(|| def.short_doc().to_string());
    let remedy = match status {
        CheckStatus::Failed => def.remedy(),
        _ => None,
    };
    ResultRecord {
        status,
        info: outcome.info,
        description,
        remedy,
    }
}
