//! PostgreSQL query runner.
//!
//! Opens one tokio-postgres connection per query (plain or rustls), prepares the
//! statement to learn its column types, fetches every row and drops the client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use tokio_postgres::types::Type;
use tokio_postgres::{Client, Config as PgConfig, NoTls};
use tracing::{debug, error, info, warn};

use crate::config::{ConnectionConfig, DbType};
use crate::core::value::{bytes_to_hex, float_to_value};
use crate::core::{ColumnMeta, QueryRequest, QueryRunner, ResultSet, Row, SqlValue, ValueKind};
use crate::drivers::common::TlsBuilder;
use crate::error::{CompareError, Result};

/// Runs queries against PostgreSQL.
pub struct PostgresRunner {
    conn: ConnectionConfig,
}

impl PostgresRunner {
    pub fn new(conn: ConnectionConfig) -> Self {
        Self { conn }
    }

    fn pg_config(&self) -> PgConfig {
        let mut pg_config = PgConfig::new();
        pg_config.host(&self.conn.host);
        pg_config.port(self.conn.port());
        pg_config.dbname(&self.conn.database);
        pg_config.user(&self.conn.user);
        pg_config.password(&self.conn.password);
        pg_config.application_name("sql-data-compare");
        if self.conn.connect_timeout_secs > 0 {
            pg_config.connect_timeout(Duration::from_secs(self.conn.connect_timeout_secs));
        }
        pg_config
    }

    /// Connect and spawn the connection task. The task ends when the client drops.
    async fn connect(&self, request: &QueryRequest<'_>) -> Result<Client> {
        let pg_config = self.pg_config();
        let conn_err = |e: tokio_postgres::Error| {
            CompareError::connection(request.spec, request.side, e)
        };

        let tls = TlsBuilder::parse(&self.conn.ssl_mode)?.build()?;
        let client = match tls {
            None => {
                warn!("PostgreSQL TLS is disabled. Credentials will be transmitted in plaintext.");
                let (client, connection) = pg_config.connect(NoTls).await.map_err(conn_err)?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        error!("PostgreSQL connection error: {}", e);
                    }
                });
                client
            }
            Some(tls) => {
                let (client, connection) = pg_config.connect(tls).await.map_err(conn_err)?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        error!("PostgreSQL connection error: {}", e);
                    }
                });
                client
            }
        };
        Ok(client)
    }
}

#[async_trait]
impl QueryRunner for PostgresRunner {
    fn db_type(&self) -> DbType {
        DbType::Postgres
    }

    async fn fetch_all(&self, request: &QueryRequest<'_>) -> Result<ResultSet> {
        let client = self.connect(request).await?;
        info!(spec = request.spec, side = %request.side, "Connected to {}", self.conn);

        let query_err = |e: tokio_postgres::Error| CompareError::query(request.spec, request.side, e);

        let statement = client.prepare(request.sql).await.map_err(query_err)?;
        let types: Vec<Type> = statement.columns().iter().map(|c| c.type_().clone()).collect();
        let columns: Vec<ColumnMeta> = statement
            .columns()
            .iter()
            .map(|c| column_meta(c.name(), c.type_()))
            .collect();

        let pg_rows = client.query(&statement, &[]).await.map_err(query_err)?;
        let mut rows = Vec::with_capacity(pg_rows.len());
        for pg_row in &pg_rows {
            let row: Row = types
                .iter()
                .enumerate()
                .map(|(idx, ty)| convert_pg_value(pg_row, idx, ty))
                .collect::<std::result::Result<_, _>>()
                .map_err(query_err)?;
            rows.push(row);
        }

        drop(client);
        debug!(spec = request.spec, side = %request.side, "PostgreSQL connection released");

        Ok(ResultSet::new(columns, rows))
    }
}

/// Map a PostgreSQL type to metadata. timestamp, timestamptz and time carry
/// microsecond resolution.
fn column_meta(name: &str, ty: &Type) -> ColumnMeta {
    let kind = match *ty {
        Type::BOOL => ValueKind::Boolean,
        Type::INT2 | Type::INT4 | Type::INT8 | Type::OID => ValueKind::Integer,
        Type::NUMERIC => ValueKind::Decimal,
        Type::FLOAT4 | Type::FLOAT8 => ValueKind::Float,
        Type::DATE => ValueKind::Date,
        Type::TIME => ValueKind::Time,
        Type::TIMESTAMP => ValueKind::Timestamp,
        Type::TIMESTAMPTZ => ValueKind::TimestampTz,
        Type::TEXT
        | Type::VARCHAR
        | Type::BPCHAR
        | Type::NAME
        | Type::UUID
        | Type::BYTEA
        | Type::JSON
        | Type::JSONB => ValueKind::Text,
        _ => ValueKind::Other,
    };

    let meta = ColumnMeta::new(name, ty.name(), kind);
    if kind.has_fraction() {
        meta.with_fractional_digits(6)
    } else {
        meta
    }
}

/// Convert one column of a PostgreSQL row. Types without a dedicated mapping are
/// read as text; a type that cannot be read as text fails the query.
fn convert_pg_value(
    row: &tokio_postgres::Row,
    idx: usize,
    ty: &Type,
) -> std::result::Result<SqlValue, tokio_postgres::Error> {
    let value = match *ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.into(),
        Type::INT2 => row.try_get::<_, Option<i16>>(idx)?.into(),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx)?.into(),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.into(),
        Type::OID => row
            .try_get::<_, Option<u32>>(idx)?
            .map_or(SqlValue::Null, |v| SqlValue::Int(v.into())),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)?
            .map_or(SqlValue::Null, |v| float_to_value(v.into())),
        Type::FLOAT8 => row
            .try_get::<_, Option<f64>>(idx)?
            .map_or(SqlValue::Null, float_to_value),
        Type::NUMERIC => row.try_get::<_, Option<Decimal>>(idx)?.into(),
        Type::DATE => row.try_get::<_, Option<NaiveDate>>(idx)?.into(),
        Type::TIME => row.try_get::<_, Option<NaiveTime>>(idx)?.into(),
        Type::TIMESTAMP => row.try_get::<_, Option<NaiveDateTime>>(idx)?.into(),
        Type::TIMESTAMPTZ => row.try_get::<_, Option<DateTime<FixedOffset>>>(idx)?.into(),
        Type::UUID => row
            .try_get::<_, Option<uuid::Uuid>>(idx)?
            .map_or(SqlValue::Null, |u| SqlValue::Text(u.to_string())),
        Type::BYTEA => row
            .try_get::<_, Option<Vec<u8>>>(idx)?
            .map_or(SqlValue::Null, |b| SqlValue::Text(bytes_to_hex(&b))),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(idx)?
            .map_or(SqlValue::Null, |v| SqlValue::Text(v.to_string())),
        _ => row.try_get::<_, Option<String>>(idx)?.into(),
    };
    Ok(value)
}
