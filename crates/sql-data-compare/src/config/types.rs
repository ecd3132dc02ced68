//! Configuration type definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CompareError, Result, Side};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Named database connections referenced by comparison specs.
    #[serde(default)]
    pub connections: BTreeMap<String, ConnectionConfig>,

    /// Which partitions to write out. No output files are written when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_type: Option<OutputType>,

    /// Directory for output files (default: "./output/").
    #[serde(default = "default_output_dir")]
    pub output_file_path: PathBuf,

    /// Output file format (default: csv).
    #[serde(default)]
    pub output_format: OutputFormat,

    /// Append a timestamp to output file names (default: false).
    #[serde(default)]
    pub timestamp_file: bool,

    /// Maximum values per generated IN list or VALUES statement (default: 1000).
    #[serde(default = "default_max_sql_in_values")]
    pub max_sql_in_values: usize,

    /// Directory that `*_query_file` paths are resolved against (default: "./sql").
    #[serde(default = "default_sql_dir")]
    pub sql_dir: PathBuf,

    /// Per-query timeout in seconds covering execution and fetch. 0 disables it.
    #[serde(default)]
    pub query_timeout_secs: u64,

    /// Value normalization settings.
    #[serde(default)]
    pub normalize: NormalizeConfig,

    /// Comparisons to run, in order.
    #[serde(default)]
    pub compare_list: Vec<ComparisonSpec>,
}

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    #[default]
    #[serde(alias = "sqlserver", alias = "sql_server")]
    Mssql,
    #[serde(alias = "postgresql", alias = "pg")]
    Postgres,
    #[serde(alias = "mariadb")]
    Mysql,
}

impl DbType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DbType::Mssql => "mssql",
            DbType::Postgres => "postgres",
            DbType::Mysql => "mysql",
        }
    }

    /// Default TCP port for the engine.
    pub fn default_port(&self) -> u16 {
        match self {
            DbType::Mssql => 1433,
            DbType::Postgres => 5432,
            DbType::Mysql => 3306,
        }
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Database connection settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database engine (default: mssql).
    #[serde(default)]
    pub r#type: DbType,

    /// Database host.
    pub host: String,

    /// Database port. Defaults to the engine's standard port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Database name.
    pub database: String,

    /// Username.
    #[serde(default)]
    pub user: String,

    /// Password. `${VAR}` is read from the environment at load time.
    #[serde(default)]
    pub password: String,

    /// Encrypt MSSQL connections (default: true).
    #[serde(default = "default_true")]
    pub encrypt: bool,

    /// Trust the MSSQL server certificate without validation (default: false).
    #[serde(default)]
    pub trust_server_cert: bool,

    /// PostgreSQL/MySQL SSL mode (default: "require").
    #[serde(default = "default_require")]
    pub ssl_mode: String,

    /// TCP connect and login timeout in seconds (default: 30).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl ConnectionConfig {
    /// Port to connect to, falling back to the engine default.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.r#type.default_port())
    }

    /// Copy of this connection pointed at another database on the same server.
    pub fn with_database(&self, database: &str) -> Self {
        let mut conn = self.clone();
        conn.database = database.to_string();
        conn
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("type", &self.r#type)
            .field("host", &self.host)
            .field("port", &self.port())
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("encrypt", &self.encrypt)
            .field("trust_server_cert", &self.trust_server_cert)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

impl fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Server: [{}] Database: [{}] Type: [{}]",
            self.host, self.database, self.r#type
        )
    }
}

/// Which partitions of a comparison result get rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputType {
    LeftOnly,
    RightOnly,
    Common,
    /// Left-only and right-only rows; common rows are omitted.
    Differences,
    All,
}

impl OutputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputType::LeftOnly => "left_only",
            OutputType::RightOnly => "right_only",
            OutputType::Common => "common",
            OutputType::Differences => "differences",
            OutputType::All => "all",
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
    Sql,
}

impl OutputFormat {
    /// File extension for the format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Sql => "sql",
        }
    }
}

/// Value normalization settings applied before rows are matched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizeConfig {
    /// Round every numeric column to this many decimal places. When unset, each
    /// column uses the coarser scale of the two sides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal_places: Option<u32>,

    /// Fractional-second digits kept for date/time columns. When unset, each
    /// column uses the coarser precision of the two sides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datetime_precision: Option<u32>,

    /// Compare text case-insensitively (default: false).
    #[serde(default)]
    pub ignore_case: bool,

    /// Strip leading and trailing whitespace from text (default: false).
    #[serde(default)]
    pub trim_text: bool,
}

/// One comparison: two queries whose results should be equivalent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonSpec {
    /// Unique name, also used for output file names.
    pub name: String,

    /// Name of the left connection in `connections`.
    pub left_connection: String,

    /// Name of the right connection in `connections`.
    pub right_connection: String,

    /// Left dialect. Defaults to the connection's type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_db_type: Option<DbType>,

    /// Right dialect. Defaults to the connection's type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_db_type: Option<DbType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_query: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_query_file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_query: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_query_file: Option<PathBuf>,

    /// Table targeted by generated SQL output.
    #[serde(default, alias = "table_name", skip_serializing_if = "Option::is_none")]
    pub output_table_name: Option<String>,

    /// Override the left connection's database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_database: Option<String>,

    /// Override the right connection's database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_database: Option<String>,
}

impl ComparisonSpec {
    /// Query source for one side. Inline text wins over a file when both are set.
    pub fn query_source(&self, side: Side) -> Result<QuerySource> {
        let (inline, file) = match side {
            Side::Left => (&self.left_query, &self.left_query_file),
            Side::Right => (&self.right_query, &self.right_query_file),
        };

        match (inline, file) {
            (Some(sql), _) if !sql.trim().is_empty() => Ok(QuerySource::Inline(sql.clone())),
            (_, Some(path)) => Ok(QuerySource::File(path.clone())),
            _ => Err(CompareError::Config(format!(
                "Comparison '{}' is missing a {} query",
                self.name, side
            ))),
        }
    }

    /// Connection name for one side.
    pub fn connection_name(&self, side: Side) -> &str {
        match side {
            Side::Left => &self.left_connection,
            Side::Right => &self.right_connection,
        }
    }

    /// Explicit dialect for one side, if configured.
    pub fn db_type(&self, side: Side) -> Option<DbType> {
        match side {
            Side::Left => self.left_db_type,
            Side::Right => self.right_db_type,
        }
    }

    /// Database override for one side, if configured.
    pub fn database_override(&self, side: Side) -> Option<&str> {
        match side {
            Side::Left => self.left_database.as_deref(),
            Side::Right => self.right_database.as_deref(),
        }
    }
}

/// Where a query's text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuerySource {
    Inline(String),
    File(PathBuf),
}

impl QuerySource {
    /// Resolve the query text. Relative file paths are resolved against `sql_dir`.
    pub fn load(&self, sql_dir: &Path) -> Result<String> {
        match self {
            QuerySource::Inline(sql) => Ok(sql.clone()),
            QuerySource::File(path) => {
                let full = if path.is_absolute() {
                    path.clone()
                } else {
                    sql_dir.join(path)
                };
                if !full.exists() {
                    return Err(CompareError::Config(format!(
                        "SQL file not found: {}",
                        full.display()
                    )));
                }
                Ok(std::fs::read_to_string(&full)?)
            }
        }
    }
}

// Default value functions for serde
fn default_output_dir() -> PathBuf {
    PathBuf::from("./output/")
}

fn default_sql_dir() -> PathBuf {
    PathBuf::from("./sql")
}

fn default_max_sql_in_values() -> usize {
    1000
}

fn default_require() -> String {
    "require".to_string()
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}
