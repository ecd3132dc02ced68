//! Database driver implementations.
//!
//! This module provides database-specific implementations of the core traits:
//!
//! - [`mssql`]: Microsoft SQL Server driver
//! - [`postgres`]: PostgreSQL driver
//! - [`mysql`]: MySQL/MariaDB driver (runner behind the `mysql` feature)
//! - [`common`]: Shared utilities (TLS)
//!
//! # Architecture
//!
//! Each driver module implements:
//! - `Dialect`: SQL syntax strategy, used when regenerating SQL output
//! - `QueryRunner`: executes one query over one dedicated connection
//!
//! [`DriverFactory`] is the production [`RunnerFactory`]; [`execute_timed`] wraps
//! any runner with the per-query timeout and wall-clock measurement.

pub mod common;
pub mod mssql;
pub mod mysql;
pub mod postgres;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

// Re-export common utilities
pub use common::{SslMode, TlsBuilder};

// Re-export driver types
pub use mssql::{MssqlDialect, MssqlRunner};
pub use mysql::MysqlDialect;
#[cfg(feature = "mysql")]
pub use mysql::MysqlRunner;
pub use postgres::{PostgresDialect, PostgresRunner};

use crate::config::{ConnectionConfig, DbType};
use crate::core::traits::{Dialect, QueryRequest, QueryRunner, RunnerFactory};
use crate::core::{ResultSet, SqlValue, Temporal};
use crate::error::{CompareError, Result};

/// Enum-based static dispatch for dialects.
///
/// The compiler generates a match statement instead of using vtable dispatch.
#[derive(Debug, Clone)]
pub enum DialectImpl {
    Mssql(MssqlDialect),
    Postgres(PostgresDialect),
    Mysql(MysqlDialect),
}

impl Dialect for DialectImpl {
    fn name(&self) -> &str {
        match self {
            DialectImpl::Mssql(d) => d.name(),
            DialectImpl::Postgres(d) => d.name(),
            DialectImpl::Mysql(d) => d.name(),
        }
    }

    fn quote_ident(&self, name: &str) -> String {
        match self {
            DialectImpl::Mssql(d) => d.quote_ident(name),
            DialectImpl::Postgres(d) => d.quote_ident(name),
            DialectImpl::Mysql(d) => d.quote_ident(name),
        }
    }

    fn bool_literal(&self, value: bool) -> String {
        match self {
            DialectImpl::Mssql(d) => d.bool_literal(value),
            DialectImpl::Postgres(d) => d.bool_literal(value),
            DialectImpl::Mysql(d) => d.bool_literal(value),
        }
    }

    fn text_literal(&self, value: &str) -> String {
        match self {
            DialectImpl::Mssql(d) => d.text_literal(value),
            DialectImpl::Postgres(d) => d.text_literal(value),
            DialectImpl::Mysql(d) => d.text_literal(value),
        }
    }

    fn datetime_literal(&self, value: &Temporal) -> String {
        match self {
            DialectImpl::Mssql(d) => d.datetime_literal(value),
            DialectImpl::Postgres(d) => d.datetime_literal(value),
            DialectImpl::Mysql(d) => d.datetime_literal(value),
        }
    }

    fn literal(&self, value: &SqlValue) -> String {
        match self {
            DialectImpl::Mssql(d) => d.literal(value),
            DialectImpl::Postgres(d) => d.literal(value),
            DialectImpl::Mysql(d) => d.literal(value),
        }
    }
}

impl DialectImpl {
    /// Create the dialect for a database type.
    pub fn from_db_type(db_type: DbType) -> Self {
        match db_type {
            DbType::Mssql => DialectImpl::Mssql(MssqlDialect::new()),
            DbType::Postgres => DialectImpl::Postgres(PostgresDialect::new()),
            DbType::Mysql => DialectImpl::Mysql(MysqlDialect::new()),
        }
    }
}

/// Opens real database runners.
#[derive(Debug, Clone, Default)]
pub struct DriverFactory;

impl RunnerFactory for DriverFactory {
    fn create(&self, conn: &ConnectionConfig, db_type: DbType) -> Result<Arc<dyn QueryRunner>> {
        match db_type {
            DbType::Mssql => Ok(Arc::new(MssqlRunner::new(conn.clone()))),
            DbType::Postgres => Ok(Arc::new(PostgresRunner::new(conn.clone()))),
            #[cfg(feature = "mysql")]
            DbType::Mysql => Ok(Arc::new(MysqlRunner::new(conn.clone()))),
            #[cfg(not(feature = "mysql"))]
            DbType::Mysql => Err(CompareError::Config(
                "MySQL support is not compiled in; rebuild with --features mysql".into(),
            )),
        }
    }
}

/// A fetched result set plus the wall time spent executing and fetching it.
#[derive(Debug)]
pub struct QueryOutcome {
    pub result_set: ResultSet,
    pub elapsed: Duration,
}

/// Run a query, timing execution through full fetch.
///
/// `timeout` bounds the same span; expiry is reported as a query failure and the
/// in-flight connection is dropped.
pub async fn execute_timed(
    runner: &dyn QueryRunner,
    request: &QueryRequest<'_>,
    timeout: Option<Duration>,
) -> Result<QueryOutcome> {
    let start = Instant::now();
    let result_set = match timeout {
        Some(limit) => tokio::time::timeout(limit, runner.fetch_all(request))
            .await
            .map_err(|_| {
                CompareError::query(
                    request.spec,
                    request.side,
                    format!("query timed out after {}s", limit.as_secs()),
                )
            })??,
        None => runner.fetch_all(request).await?,
    };
    let elapsed = start.elapsed();

    debug!(
        spec = request.spec,
        side = %request.side,
        engine = %runner.db_type(),
        rows = result_set.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "query complete"
    );

    Ok(QueryOutcome {
        result_set,
        elapsed,
    })
}
