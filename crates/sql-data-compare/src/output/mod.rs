//! Rendering of comparison results to files.
//!
//! An [`OutputType`] selects which partitions of a [`ComparisonResult`] are written;
//! the [`OutputFormat`] decides how:
//!
//! - [`csv`]: header plus one record per row
//! - [`json`]: JSON Lines, one object per row
//! - [`sql`]: regenerated `INSERT` and `SELECT ... IN (...)` statements, batched with
//!   [`BatchPredicateBuilder`]
//!
//! Each render writes exactly one file, through a temporary sibling that is renamed
//! into place once the content is complete.

pub mod batch;
pub mod csv;
pub mod json;
pub mod sql;

pub use batch::BatchPredicateBuilder;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::compare::ComparisonResult;
use crate::config::{Config, DbType, OutputFormat, OutputType};
use crate::core::Row;
use crate::error::{CompareError, Result};

/// Table name used in generated SQL when a comparison does not name one.
pub const DEFAULT_TABLE_NAME: &str = "table_name_not_provided";

/// Name of the leading column that tags each record with its partition.
pub const SIDE_COLUMN: &str = "_side";

/// One of the three reconciliation partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    LeftOnly,
    RightOnly,
    Common,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::LeftOnly => "left_only",
            Partition::RightOnly => "right_only",
            Partition::Common => "common",
        }
    }

    /// Partitions an output type selects, in rendering order.
    pub fn selected_by(output_type: OutputType) -> &'static [Partition] {
        match output_type {
            OutputType::LeftOnly => &[Partition::LeftOnly],
            OutputType::RightOnly => &[Partition::RightOnly],
            OutputType::Common => &[Partition::Common],
            OutputType::Differences => &[Partition::LeftOnly, Partition::RightOnly],
            OutputType::All => &[Partition::LeftOnly, Partition::RightOnly, Partition::Common],
        }
    }

    /// Rows of this partition. Matched pairs contribute their left row.
    pub fn rows<'a>(&self, result: &'a ComparisonResult) -> Vec<&'a Row> {
        match self {
            Partition::LeftOnly => result.left_only.iter().collect(),
            Partition::RightOnly => result.right_only.iter().collect(),
            Partition::Common => result.common.iter().map(|pair| &pair.left).collect(),
        }
    }
}

/// A row tagged with the partition it came from.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    pub partition: Partition,
    pub row: &'a Row,
}

/// The rows an output type selects, flattened in partition order.
pub fn select_records(result: &ComparisonResult, output_type: OutputType) -> Vec<Record<'_>> {
    Partition::selected_by(output_type)
        .iter()
        .flat_map(|partition| {
            partition
                .rows(result)
                .into_iter()
                .map(move |row| Record {
                    partition: *partition,
                    row,
                })
        })
        .collect()
}

/// Whether records carry the `_side` column.
pub fn tags_side(output_type: OutputType) -> bool {
    matches!(output_type, OutputType::Differences | OutputType::All)
}

/// Per-comparison inputs the SQL format needs.
#[derive(Debug, Clone, Copy)]
pub struct SqlTarget<'a> {
    pub table_name: Option<&'a str>,
    pub left: DbType,
    pub right: DbType,
}

impl SqlTarget<'_> {
    pub fn table_name(&self) -> &str {
        self.table_name
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TABLE_NAME)
    }

    /// Engine whose syntax a partition's rows are rendered in.
    pub fn db_type_for(&self, partition: Partition) -> DbType {
        match partition {
            Partition::RightOnly => self.right,
            Partition::LeftOnly | Partition::Common => self.left,
        }
    }
}

/// Writes comparison results according to the global output settings.
#[derive(Debug, Clone)]
pub struct Renderer {
    output_type: OutputType,
    format: OutputFormat,
    dir: PathBuf,
    timestamp_file: bool,
    batcher: BatchPredicateBuilder,
}

impl Renderer {
    pub fn new(
        output_type: OutputType,
        format: OutputFormat,
        dir: impl Into<PathBuf>,
        timestamp_file: bool,
        max_sql_in_values: usize,
    ) -> Result<Self> {
        Ok(Self {
            output_type,
            format,
            dir: dir.into(),
            timestamp_file,
            batcher: BatchPredicateBuilder::new(max_sql_in_values)?,
        })
    }

    /// Build the renderer for a config. `None` when no `output_type` is set.
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        config
            .output_type
            .map(|output_type| {
                Self::new(
                    output_type,
                    config.output_format,
                    &config.output_file_path,
                    config.timestamp_file,
                    config.max_sql_in_values,
                )
            })
            .transpose()
    }

    pub fn output_type(&self) -> OutputType {
        self.output_type
    }

    /// Create the output directory. Failure here affects every spec, so it is
    /// reported as a configuration problem rather than a per-spec render error.
    pub fn prepare_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            CompareError::Config(format!(
                "output directory {} is not usable: {}",
                self.dir.display(),
                e
            ))
        })
    }

    /// Render one comparison and return the path written.
    pub fn render(&self, result: &ComparisonResult, target: &SqlTarget<'_>) -> Result<PathBuf> {
        self.render_at(result, target, Local::now())
    }

    /// Render with an explicit clock, used for the file timestamp and SQL headers.
    pub fn render_at(
        &self,
        result: &ComparisonResult,
        target: &SqlTarget<'_>,
        now: DateTime<Local>,
    ) -> Result<PathBuf> {
        let spec = result.spec.as_str();
        let records = select_records(result, self.output_type);
        let with_side = tags_side(self.output_type);

        let content = match self.format {
            OutputFormat::Csv => csv::render(&result.columns, &records, with_side)
                .map_err(|e| CompareError::render(spec, e))?,
            OutputFormat::Json => json::render(&result.columns, &records, with_side)
                .map_err(|e| CompareError::render(spec, e))?,
            OutputFormat::Sql => sql::render(
                result,
                Partition::selected_by(self.output_type),
                target,
                &self.batcher,
                now,
            )
            .into_bytes(),
        };

        let timestamp = self.timestamp_file.then_some(now);
        let path = self
            .dir
            .join(file_name(spec, timestamp, self.format.extension()));
        write_atomic(&path, &content).map_err(|e| {
            CompareError::render(spec, format!("cannot write {}: {}", path.display(), e))
        })?;

        info!(
            spec,
            path = %path.display(),
            records = records.len(),
            format = self.format.extension(),
            "output saved"
        );
        Ok(path)
    }
}

/// Lower-case a comparison name into a file-name stem.
///
/// Spaces become `_` and anything outside `[a-z0-9_-]` is dropped. Runs of
/// `_` collapse across dropped characters, so `a_(_b` gives `a_b`.
pub fn clean_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        let c = if c == ' ' { '_' } else { c };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-' {
            out.push(c);
        }
    }
    out
}

/// `<clean name>[_<YYYYmmdd_HHMMSS>].<ext>`
pub fn file_name(spec: &str, timestamp: Option<DateTime<Local>>, extension: &str) -> String {
    match timestamp {
        Some(ts) => format!(
            "{}_{}.{}",
            clean_name(spec),
            ts.format("%Y%m%d_%H%M%S"),
            extension
        ),
        None => format!("{}.{}", clean_name(spec), extension),
    }
}

/// Write through a `.partial` sibling so readers never see a half-written file.
fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut partial = path.as_os_str().to_owned();
    partial.push(".partial");
    let partial = PathBuf::from(partial);

    if let Err(e) = fs::write(&partial, content).and_then(|_| fs::rename(&partial, path)) {
        let _ = fs::remove_file(&partial);
        return Err(e);
    }
    debug!(path = %path.display(), bytes = content.len(), "renamed output into place");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{MatchedPair, Reconciliation};
    use crate::core::SqlValue;
    use chrono::TimeZone;
    use std::time::Duration;

    fn row(id: i64, val: &str) -> Row {
        vec![SqlValue::Int(id), val.into()]
    }

    fn scenario() -> ComparisonResult {
        ComparisonResult::new(
            "Orders Daily",
            vec!["id".into(), "val".into()],
            Reconciliation {
                left_only: vec![row(2, "b")],
                right_only: vec![row(3, "c")],
                common: vec![MatchedPair {
                    left: row(1, "a"),
                    right: row(1, "a"),
                }],
            },
            Duration::from_millis(5),
            Duration::from_millis(5),
        )
    }

    fn target() -> SqlTarget<'static> {
        SqlTarget {
            table_name: None,
            left: DbType::Mssql,
            right: DbType::Postgres,
        }
    }

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name("Orders Daily"), "orders_daily");
        assert_eq!(clean_name("A  __ B"), "a_b");
        assert_eq!(clean_name("Sales (EU) v2-final!"), "sales_eu_v2-final");
        // Dropped characters never leave two underscores behind
        assert_eq!(clean_name("a_(_b"), "a_b");
    }

    #[test]
    fn test_file_name_with_timestamp() {
        assert_eq!(file_name("Orders Daily", None, "csv"), "orders_daily.csv");
        assert_eq!(
            file_name("Orders Daily", Some(fixed_now()), "json"),
            "orders_daily_20240309_140507.json"
        );
    }

    #[test]
    fn test_differences_selects_only_divergent_rows() {
        let result = scenario();
        let records = select_records(&result, OutputType::Differences);
        let tagged: Vec<(&str, &Row)> = records
            .iter()
            .map(|r| (r.partition.as_str(), r.row))
            .collect();
        assert_eq!(
            tagged,
            vec![("left_only", &row(2, "b")), ("right_only", &row(3, "c"))]
        );
        assert!(tags_side(OutputType::Differences));
        assert!(!tags_side(OutputType::LeftOnly));
    }

    #[test]
    fn test_common_honors_multiplicity() {
        let pair = || MatchedPair {
            left: row(1, "a"),
            right: row(1, "a"),
        };
        let result = ComparisonResult::new(
            "dups",
            vec!["id".into(), "val".into()],
            Reconciliation {
                common: vec![pair(), pair()],
                ..Default::default()
            },
            Duration::ZERO,
            Duration::ZERO,
        );
        assert_eq!(select_records(&result, OutputType::Common).len(), 2);
    }

    #[test]
    fn test_render_differences_csv() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("out");
        let renderer = Renderer::new(OutputType::Differences, OutputFormat::Csv, &out, false, 1000)
            .unwrap();

        let path = renderer.render_at(&scenario(), &target(), fixed_now()).unwrap();

        assert_eq!(path, out.join("orders_daily.csv"));
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "_side,id,val\nleft_only,2,b\nright_only,3,c\n");
        assert!(!out.join("orders_daily.csv.partial").exists());
    }

    #[test]
    fn test_render_empty_view_still_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let renderer =
            Renderer::new(OutputType::LeftOnly, OutputFormat::Json, dir.path(), false, 10).unwrap();
        let result = ComparisonResult::new(
            "empty",
            vec!["id".into()],
            Reconciliation::default(),
            Duration::ZERO,
            Duration::ZERO,
        );

        let path = renderer.render_at(&result, &target(), fixed_now()).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "");
    }

    #[test]
    fn test_render_into_file_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let renderer =
            Renderer::new(OutputType::All, OutputFormat::Csv, &blocker, false, 10).unwrap();
        let err = renderer
            .render_at(&scenario(), &target(), fixed_now())
            .unwrap_err();
        assert!(matches!(err, CompareError::Render { .. }));
    }

    #[test]
    fn test_renderer_from_config() {
        let mut config = Config::from_yaml(
            r#"
connections:
  db:
    type: postgres
    host: localhost
    database: app
    user: u
    password: p
compare_list:
  - name: Orders
    left_connection: db
    right_connection: db
    left_query: SELECT 1
    right_query: SELECT 1
"#,
        )
        .unwrap();
        assert!(Renderer::from_config(&config).unwrap().is_none());

        config.output_type = Some(OutputType::Common);
        let renderer = Renderer::from_config(&config).unwrap().unwrap();
        assert_eq!(renderer.output_type(), OutputType::Common);
    }

    #[test]
    fn test_sql_target_defaults_table_name() {
        assert_eq!(target().table_name(), DEFAULT_TABLE_NAME);
        let named = SqlTarget {
            table_name: Some("dbo.Orders"),
            ..target()
        };
        assert_eq!(named.table_name(), "dbo.Orders");
        assert_eq!(named.db_type_for(Partition::RightOnly), DbType::Postgres);
        assert_eq!(named.db_type_for(Partition::Common), DbType::Mssql);
    }
}
