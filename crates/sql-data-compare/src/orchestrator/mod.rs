//! Comparison orchestrator - runs every configured spec end to end.
//!
//! For each spec the two side queries run concurrently, each on its own
//! connection. Once both have been fetched the rows go through normalization,
//! reconciliation and (optionally) rendering. A failing spec is recorded and the
//! run moves on to the next one.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::compare::{compare_result_sets, ComparisonResult, PartitionCounts};
use crate::config::{ComparisonSpec, Config, DbType};
use crate::core::traits::{QueryRequest, RunnerFactory};
use crate::core::Row;
use crate::drivers::{execute_timed, DriverFactory};
use crate::error::{CompareError, Result, Side};
use crate::output::{Renderer, SqlTarget};

/// Sample rows logged per divergent partition.
const SAMPLE_ROWS: usize = 5;

/// Comparison orchestrator.
pub struct Orchestrator {
    config: Config,
    factory: Arc<dyn RunnerFactory>,
    only: Vec<String>,
}

/// Outcome of one spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecStatus {
    /// Both sides returned the same multiset of rows.
    Matched,
    /// The comparison ran and found divergent rows.
    Differs,
    /// The comparison could not be completed.
    Failed,
}

/// Per-spec summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecSummary {
    pub name: String,
    pub status: SpecStatus,

    /// Effective engines for each side, when they could be resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left_db_type: Option<DbType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right_db_type: Option<DbType>,

    /// Partition counts; absent when the comparison failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<PartitionCounts>,

    pub left_elapsed_ms: u64,
    pub right_elapsed_ms: u64,

    /// Right-vs-left timing verdict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<String>,

    /// Output file written for this spec.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SpecSummary {
    fn failed(name: &str, left: Option<DbType>, right: Option<DbType>, err: &CompareError) -> Self {
        Self {
            name: name.to_string(),
            status: SpecStatus::Failed,
            left_db_type: left,
            right_db_type: right,
            counts: None,
            left_elapsed_ms: 0,
            right_elapsed_ms: 0,
            performance: None,
            output_path: None,
            error: Some(err.to_string()),
        }
    }

    fn from_result(
        result: &ComparisonResult,
        left: DbType,
        right: DbType,
        output_path: Option<PathBuf>,
    ) -> Self {
        Self {
            name: result.spec.clone(),
            status: if result.is_equal() {
                SpecStatus::Matched
            } else {
                SpecStatus::Differs
            },
            left_db_type: Some(left),
            right_db_type: Some(right),
            counts: Some(result.counts()),
            left_elapsed_ms: result.left_elapsed.as_millis() as u64,
            right_elapsed_ms: result.right_elapsed.as_millis() as u64,
            performance: Some(result.performance().to_string()),
            output_path,
            error: None,
        }
    }

    /// A finished comparison whose output could not be written keeps its counts.
    fn with_render_error(mut self, err: &CompareError) -> Self {
        self.status = SpecStatus::Failed;
        self.error = Some(err.to_string());
        self
    }
}

/// Result of a comparison run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique run identifier.
    pub run_id: String,

    /// SHA256 of the effective configuration.
    pub config_hash: String,

    /// Final status: matched, differs, failed or cancelled.
    pub status: String,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,

    pub specs_total: usize,
    pub specs_matched: usize,
    pub specs_differ: usize,
    pub specs_failed: usize,

    /// Per-spec results, in run order.
    pub specs: Vec<SpecSummary>,
}

impl RunSummary {
    /// True when every spec ran and matched.
    pub fn all_matched(&self) -> bool {
        self.status == "matched"
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A spec that ran to completion.
struct SpecRun {
    result: ComparisonResult,
    left: DbType,
    right: DbType,
    output_path: Option<PathBuf>,
    /// Set when the comparison finished but its output file could not be written.
    render_error: Option<CompareError>,
}

impl Orchestrator {
    /// Create an orchestrator backed by the real database drivers.
    pub fn new(config: Config) -> Self {
        Self::with_factory(config, Arc::new(DriverFactory))
    }

    /// Create an orchestrator with a custom runner factory.
    pub fn with_factory(config: Config, factory: Arc<dyn RunnerFactory>) -> Self {
        Self {
            config,
            factory,
            only: Vec::new(),
        }
    }

    /// Restrict the run to the named specs. Empty means all.
    pub fn with_only(mut self, names: Vec<String>) -> Self {
        self.only = names;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Specs selected for this run, in config order.
    pub fn selected_specs(&self) -> Result<Vec<&ComparisonSpec>> {
        for name in &self.only {
            if !self.config.compare_list.iter().any(|s| &s.name == name) {
                return Err(CompareError::Config(format!(
                    "No comparison named '{}' in compare_list",
                    name
                )));
            }
        }

        Ok(self
            .config
            .compare_list
            .iter()
            .filter(|s| self.only.is_empty() || self.only.contains(&s.name))
            .collect())
    }

    /// Run the selected comparisons.
    ///
    /// Per-spec failures are recorded in the summary; only problems that affect
    /// the whole run (an unknown `--only` name, an unusable output directory) are
    /// returned as errors. Cancellation is checked between specs.
    pub async fn run(&self, cancel: CancellationToken) -> Result<RunSummary> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();

        let specs = self.selected_specs()?;
        let renderer = Renderer::from_config(&self.config)?;
        if let Some(ref renderer) = renderer {
            renderer.prepare_dir()?;
        }

        info!(
            "Starting comparison run {} ({} of {} specs)",
            run_id,
            specs.len(),
            self.config.compare_list.len()
        );

        let mut summaries = Vec::with_capacity(specs.len());
        let mut cancelled = false;

        for spec in specs {
            if cancel.is_cancelled() {
                warn!("Run cancelled before '{}'", spec.name);
                cancelled = true;
                break;
            }

            info!("Comparing '{}'", spec.name);
            match self.run_spec(spec, renderer.as_ref()).await {
                Ok(run) => {
                    log_result(&run.result);
                    let summary = SpecSummary::from_result(
                        &run.result,
                        run.left,
                        run.right,
                        run.output_path,
                    );
                    summaries.push(match run.render_error {
                        Some(e) => {
                            error!("Error in comparison {}: {}", spec.name, e);
                            summary.with_render_error(&e)
                        }
                        None => summary,
                    });
                }
                Err(e) => {
                    error!("Error in comparison {}: {}", spec.name, e);
                    let left = self.config.db_type_for(spec, Side::Left).ok();
                    let right = self.config.db_type_for(spec, Side::Right).ok();
                    summaries.push(SpecSummary::failed(&spec.name, left, right, &e));
                }
            }
        }

        let completed_at = Utc::now();
        let count = |status: SpecStatus| summaries.iter().filter(|s| s.status == status).count();
        let specs_matched = count(SpecStatus::Matched);
        let specs_differ = count(SpecStatus::Differs);
        let specs_failed = count(SpecStatus::Failed);

        let status = if cancelled {
            "cancelled"
        } else if specs_failed > 0 {
            "failed"
        } else if specs_differ > 0 {
            "differs"
        } else {
            "matched"
        };

        let summary = RunSummary {
            run_id,
            config_hash: self.config.hash(),
            status: status.to_string(),
            duration_seconds: (completed_at - started_at).num_milliseconds() as f64 / 1000.0,
            started_at,
            completed_at,
            specs_total: summaries.len(),
            specs_matched,
            specs_differ,
            specs_failed,
            specs: summaries,
        };

        if summary.all_matched() {
            info!("All comparisons successful ({} specs)", summary.specs_total);
        } else {
            warn!(
                "Comparison run {}: {} matched, {} differ, {} failed",
                summary.status, specs_matched, specs_differ, specs_failed
            );
        }

        Ok(summary)
    }

    /// Fetch both sides, compare and render one spec.
    async fn run_spec(&self, spec: &ComparisonSpec, renderer: Option<&Renderer>) -> Result<SpecRun> {
        let left_conn = self.config.connection_for(spec, Side::Left)?;
        let right_conn = self.config.connection_for(spec, Side::Right)?;
        let left_type = self.config.db_type_for(spec, Side::Left)?;
        let right_type = self.config.db_type_for(spec, Side::Right)?;

        info!("Left database type:  {} ({})", left_type, left_conn);
        info!("Right database type: {} ({})", right_type, right_conn);

        let left_sql = spec.query_source(Side::Left)?.load(&self.config.sql_dir)?;
        let right_sql = spec.query_source(Side::Right)?.load(&self.config.sql_dir)?;

        let left_runner = self.factory.create(&left_conn, left_type)?;
        let right_runner = self.factory.create(&right_conn, right_type)?;

        let timeout = match self.config.query_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let left_request = QueryRequest {
            spec: &spec.name,
            side: Side::Left,
            sql: &left_sql,
        };
        let right_request = QueryRequest {
            spec: &spec.name,
            side: Side::Right,
            sql: &right_sql,
        };

        // Both sides run to completion before either result is inspected
        let (left, right) = tokio::join!(
            execute_timed(left_runner.as_ref(), &left_request, timeout),
            execute_timed(right_runner.as_ref(), &right_request, timeout),
        );
        let (left, right) = (left?, right?);
        debug!(
            spec = %spec.name,
            left_rows = left.result_set.len(),
            right_rows = right.result_set.len(),
            "both sides fetched"
        );

        let result = compare_result_sets(
            &spec.name,
            left.result_set,
            right.result_set,
            &self.config.normalize,
            left.elapsed,
            right.elapsed,
        )?;

        let (output_path, render_error) = match renderer {
            Some(renderer) => {
                let target = SqlTarget {
                    table_name: spec.output_table_name.as_deref(),
                    left: left_type,
                    right: right_type,
                };
                match renderer.render(&result, &target) {
                    Ok(path) => (Some(path), None),
                    Err(e) => (None, Some(e)),
                }
            }
            None => (None, None),
        };

        Ok(SpecRun {
            result,
            left: left_type,
            right: right_type,
            output_path,
            render_error,
        })
    }
}

/// Log the per-spec report: timings, counts and a sample of divergent rows.
fn log_result(result: &ComparisonResult) {
    let counts = result.counts();
    info!(
        "Left query: {:.3}s, {} rows | Right query: {:.3}s, {} rows",
        result.left_elapsed.as_secs_f64(),
        counts.left_count,
        result.right_elapsed.as_secs_f64(),
        counts.right_count
    );
    info!("Performance: {}", result.performance());

    let pct = |n: usize, total: usize| {
        if total == 0 {
            0.0
        } else {
            n as f64 * 100.0 / total as f64
        }
    };
    info!(
        "Row count match: {} | Common: {} | Left only: {} ({:.1}%) | Right only: {} ({:.1}%)",
        if result.row_count_match() { "yes" } else { "no" },
        counts.common,
        counts.left_only,
        pct(counts.left_only, counts.left_count),
        counts.right_only,
        pct(counts.right_only, counts.right_count)
    );

    log_samples("left only", &result.columns, &result.left_only);
    log_samples("right only", &result.columns, &result.right_only);

    if result.is_equal() {
        info!("'{}': datasets are equal", result.spec);
    } else {
        warn!("'{}': datasets differ", result.spec);
    }
}

fn log_samples(label: &str, columns: &[String], rows: &[Row]) {
    if rows.is_empty() {
        return;
    }
    info!(
        "Sample {} rows ({} of {}): {}",
        label,
        rows.len().min(SAMPLE_ROWS),
        rows.len(),
        columns.join(" | ")
    );
    for row in rows.iter().take(SAMPLE_ROWS) {
        let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
        info!("  {}", cells.join(" | "));
    }
}
