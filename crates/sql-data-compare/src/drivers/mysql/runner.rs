//! MySQL/MariaDB query runner.
//!
//! Uses a single SQLx connection per query. The statement is prepared first so
//! column metadata is available even when the query returns no rows.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlColumn, MySqlConnectOptions, MySqlConnection, MySqlRow, MySqlSslMode};
use sqlx::{Column, Connection, Executor, Row as _, Statement, TypeInfo};
use tracing::{debug, info};

use crate::config::{ConnectionConfig, DbType};
use crate::core::value::{bytes_to_hex, float_to_value};
use crate::core::{ColumnMeta, QueryRequest, QueryRunner, ResultSet, Row, SqlValue, ValueKind};
use crate::drivers::common::SslMode;
use crate::error::{CompareError, Result};

/// Runs queries against MySQL or MariaDB.
pub struct MysqlRunner {
    conn: ConnectionConfig,
}

impl MysqlRunner {
    pub fn new(conn: ConnectionConfig) -> Self {
        Self { conn }
    }

    fn connect_options(&self) -> Result<MySqlConnectOptions> {
        let ssl_mode = match SslMode::parse(&self.conn.ssl_mode)? {
            SslMode::Disable => MySqlSslMode::Disabled,
            SslMode::Require => MySqlSslMode::Required,
            SslMode::VerifyCa => MySqlSslMode::VerifyCa,
            SslMode::VerifyFull => MySqlSslMode::VerifyIdentity,
        };

        Ok(MySqlConnectOptions::new()
            .host(&self.conn.host)
            .port(self.conn.port())
            .username(&self.conn.user)
            .password(&self.conn.password)
            .database(&self.conn.database)
            .ssl_mode(ssl_mode))
    }

    async fn connect(&self, request: &QueryRequest<'_>) -> Result<MySqlConnection> {
        let options = self.connect_options()?;
        let login = MySqlConnection::connect_with(&options);

        let limit = Duration::from_secs(self.conn.connect_timeout_secs);
        let result = if limit.is_zero() {
            login.await
        } else {
            tokio::time::timeout(limit, login).await.map_err(|_| {
                CompareError::connection(
                    request.spec,
                    request.side,
                    format!("timed out after {}s connecting to {}", limit.as_secs(), self.conn),
                )
            })?
        };
        result.map_err(|e| CompareError::connection(request.spec, request.side, e))
    }
}

#[async_trait]
impl QueryRunner for MysqlRunner {
    fn db_type(&self) -> DbType {
        DbType::Mysql
    }

    async fn fetch_all(&self, request: &QueryRequest<'_>) -> Result<ResultSet> {
        let mut conn = self.connect(request).await?;
        info!(spec = request.spec, side = %request.side, "Connected to {}", self.conn);

        let query_err = |e: sqlx::Error| CompareError::query(request.spec, request.side, e);

        let statement = conn.prepare(request.sql).await.map_err(query_err)?;
        let columns: Vec<ColumnMeta> = statement.columns().iter().map(column_meta).collect();
        let type_names: Vec<String> = statement
            .columns()
            .iter()
            .map(|c| c.type_info().name().to_uppercase())
            .collect();

        let mysql_rows = statement
            .query()
            .fetch_all(&mut conn)
            .await
            .map_err(query_err)?;

        let mut rows = Vec::with_capacity(mysql_rows.len());
        for mysql_row in &mysql_rows {
            let row: Row = type_names
                .iter()
                .enumerate()
                .map(|(idx, type_name)| convert_mysql_value(mysql_row, idx, type_name))
                .collect::<std::result::Result<_, _>>()
                .map_err(query_err)?;
            rows.push(row);
        }

        if let Err(e) = conn.close().await {
            debug!("closing MySQL connection: {}", e);
        }

        Ok(ResultSet::new(columns, rows))
    }
}

fn column_meta(column: &MySqlColumn) -> ColumnMeta {
    let type_name = column.type_info().name().to_uppercase();
    let base = type_name.trim_end_matches(" UNSIGNED");
    let kind = match base {
        "BOOLEAN" => ValueKind::Boolean,
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => ValueKind::Integer,
        "DECIMAL" => ValueKind::Decimal,
        "FLOAT" | "DOUBLE" => ValueKind::Float,
        "DATE" => ValueKind::Date,
        "TIME" => ValueKind::Time,
        "DATETIME" | "TIMESTAMP" => ValueKind::Timestamp,
        "CHAR" | "VARCHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM" | "SET"
        | "JSON" | "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            ValueKind::Text
        }
        _ => ValueKind::Other,
    };

    let meta = ColumnMeta::new(column.name(), type_name.to_lowercase(), kind);
    if kind.has_fraction() {
        // fsp is not exposed by the protocol metadata; 6 is the engine maximum
        meta.with_fractional_digits(6)
    } else {
        meta
    }
}

/// Convert one column of a MySQL row.
fn convert_mysql_value(
    row: &MySqlRow,
    idx: usize,
    type_name: &str,
) -> std::result::Result<SqlValue, sqlx::Error> {
    let value = match type_name {
        "BOOLEAN" => row.try_get::<Option<bool>, _>(idx)?.into(),
        "TINYINT" => row
            .try_get::<Option<i8>, _>(idx)?
            .map_or(SqlValue::Null, |v| SqlValue::Int(v.into())),
        "SMALLINT" => row.try_get::<Option<i16>, _>(idx)?.into(),
        "MEDIUMINT" | "INT" => row.try_get::<Option<i32>, _>(idx)?.into(),
        "BIGINT" => row.try_get::<Option<i64>, _>(idx)?.into(),
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => row
            .try_get::<Option<u64>, _>(idx)?
            .map_or(SqlValue::Null, |v| match i64::try_from(v) {
                Ok(i) => SqlValue::Int(i),
                Err(_) => SqlValue::Decimal(Decimal::from(v)),
            }),
        "YEAR" => row
            .try_get_unchecked::<Option<u16>, _>(idx)?
            .map_or(SqlValue::Null, |v| SqlValue::Int(v.into())),
        "FLOAT" => row
            .try_get::<Option<f32>, _>(idx)?
            .map_or(SqlValue::Null, |v| float_to_value(v.into())),
        "DOUBLE" => row
            .try_get::<Option<f64>, _>(idx)?
            .map_or(SqlValue::Null, float_to_value),
        "DECIMAL" => row.try_get::<Option<Decimal>, _>(idx)?.into(),
        "DATE" => row.try_get::<Option<NaiveDate>, _>(idx)?.into(),
        "TIME" => row.try_get::<Option<NaiveTime>, _>(idx)?.into(),
        "DATETIME" | "TIMESTAMP" => row.try_get::<Option<NaiveDateTime>, _>(idx)?.into(),
        "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => row
            .try_get::<Option<Vec<u8>>, _>(idx)?
            .map_or(SqlValue::Null, |b| SqlValue::Text(bytes_to_hex(&b))),
        _ => row.try_get_unchecked::<Option<String>, _>(idx)?.into(),
    };
    Ok(value)
}
