//! MSSQL query runner.
//!
//! Opens a single Tiberius connection per query, reads the full first result set
//! and closes the connection. Column data is decoded straight from the TDS
//! `ColumnData` variants, so the runner never has to guess a type from its name.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use tiberius::{AuthMethod, Client, ColumnData, ColumnType, Config, EncryptionLevel, FromSql};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};

use crate::config::{ConnectionConfig, DbType};
use crate::core::value::{bytes_to_hex, float_to_value};
use crate::core::{ColumnMeta, QueryRequest, QueryRunner, ResultSet, Row, SqlValue, ValueKind};
use crate::error::{CompareError, Result};

/// Runs queries against SQL Server.
pub struct MssqlRunner {
    conn: ConnectionConfig,
}

impl MssqlRunner {
    pub fn new(conn: ConnectionConfig) -> Self {
        Self { conn }
    }

    fn build_config(&self) -> Config {
        let mut config = Config::new();
        config.host(&self.conn.host);
        config.port(self.conn.port());
        config.database(&self.conn.database);
        config.authentication(AuthMethod::sql_server(&self.conn.user, &self.conn.password));
        config.application_name("sql-data-compare");

        if self.conn.encrypt {
            if self.conn.trust_server_cert {
                config.trust_cert();
            }
            config.encryption(EncryptionLevel::Required);
        } else {
            config.encryption(EncryptionLevel::NotSupported);
        }

        config
    }

    async fn connect(&self, request: &QueryRequest<'_>) -> Result<Client<Compat<TcpStream>>> {
        let config = self.build_config();
        let login = async {
            let tcp = TcpStream::connect(config.get_addr())
                .await
                .map_err(|e| CompareError::connection(request.spec, request.side, e))?;
            tcp.set_nodelay(true).ok();
            Client::connect(config, tcp.compat_write())
                .await
                .map_err(|e| CompareError::connection(request.spec, request.side, e))
        };

        let limit = Duration::from_secs(self.conn.connect_timeout_secs);
        if limit.is_zero() {
            return login.await;
        }
        tokio::time::timeout(limit, login).await.map_err(|_| {
            CompareError::connection(
                request.spec,
                request.side,
                format!("timed out after {}s connecting to {}", limit.as_secs(), self.conn),
            )
        })?
    }
}

#[async_trait]
impl QueryRunner for MssqlRunner {
    fn db_type(&self) -> DbType {
        DbType::Mssql
    }

    async fn fetch_all(&self, request: &QueryRequest<'_>) -> Result<ResultSet> {
        let mut client = self.connect(request).await?;
        info!(spec = request.spec, side = %request.side, "Connected to {}", self.conn);

        let query_err = |e: tiberius::error::Error| CompareError::query(request.spec, request.side, e);

        let mut stream = client.simple_query(request.sql).await.map_err(query_err)?;
        let columns: Vec<ColumnMeta> = stream
            .columns()
            .await
            .map_err(query_err)?
            .map(|cols| {
                cols.iter()
                    .map(|c| column_meta(c.name(), c.column_type()))
                    .collect()
            })
            .unwrap_or_default();
        let raw_rows = stream.into_first_result().await.map_err(query_err)?;

        let mut rows = Vec::with_capacity(raw_rows.len());
        for raw in raw_rows {
            let row: Row = raw
                .into_iter()
                .map(|data| convert_column_data(&data))
                .collect::<std::result::Result<_, _>>()
                .map_err(query_err)?;
            rows.push(row);
        }

        if let Err(e) = client.close().await {
            debug!("closing MSSQL connection: {}", e);
        }

        Ok(ResultSet::new(columns, rows))
    }
}

/// Map a TDS column type to metadata. Declared fractional-second digits are the
/// engine maximum for the type, since TDS metadata does not expose the scale here.
fn column_meta(name: &str, column_type: ColumnType) -> ColumnMeta {
    let (type_name, kind, digits) = match column_type {
        ColumnType::Bit | ColumnType::Bitn => ("bit", ValueKind::Boolean, None),
        ColumnType::Int1 => ("tinyint", ValueKind::Integer, None),
        ColumnType::Int2 => ("smallint", ValueKind::Integer, None),
        ColumnType::Int4 => ("int", ValueKind::Integer, None),
        ColumnType::Int8 | ColumnType::Intn => ("bigint", ValueKind::Integer, None),
        ColumnType::Float4 => ("real", ValueKind::Float, None),
        ColumnType::Float8 | ColumnType::Floatn => ("float", ValueKind::Float, None),
        ColumnType::Money | ColumnType::Money4 => ("money", ValueKind::Float, None),
        ColumnType::Decimaln => ("decimal", ValueKind::Decimal, None),
        ColumnType::Numericn => ("numeric", ValueKind::Decimal, None),
        ColumnType::Datetime4 => ("smalldatetime", ValueKind::Timestamp, Some(0)),
        ColumnType::Datetime | ColumnType::Datetimen => ("datetime", ValueKind::Timestamp, Some(3)),
        ColumnType::Datetime2 => ("datetime2", ValueKind::Timestamp, Some(7)),
        ColumnType::DatetimeOffsetn => ("datetimeoffset", ValueKind::TimestampTz, Some(7)),
        ColumnType::Daten => ("date", ValueKind::Date, None),
        ColumnType::Timen => ("time", ValueKind::Time, Some(7)),
        ColumnType::Guid => ("uniqueidentifier", ValueKind::Text, None),
        ColumnType::BigVarChar | ColumnType::BigChar | ColumnType::Text => {
            ("varchar", ValueKind::Text, None)
        }
        ColumnType::NVarchar | ColumnType::NChar | ColumnType::NText => {
            ("nvarchar", ValueKind::Text, None)
        }
        ColumnType::BigVarBin | ColumnType::BigBinary | ColumnType::Image => {
            ("varbinary", ValueKind::Text, None)
        }
        ColumnType::Xml => ("xml", ValueKind::Text, None),
        _ => ("sql_variant", ValueKind::Other, None),
    };

    let meta = ColumnMeta::new(name, type_name, kind);
    match digits {
        Some(d) => meta.with_fractional_digits(d),
        None => meta,
    }
}

/// Convert one TDS value into the shared value model.
fn convert_column_data(data: &ColumnData<'static>) -> tiberius::Result<SqlValue> {
    let value = match data {
        ColumnData::U8(v) => v.map_or(SqlValue::Null, |v| SqlValue::Int(v.into())),
        ColumnData::I16(v) => v.map_or(SqlValue::Null, |v| SqlValue::Int(v.into())),
        ColumnData::I32(v) => v.map_or(SqlValue::Null, |v| SqlValue::Int(v.into())),
        ColumnData::I64(v) => v.map_or(SqlValue::Null, SqlValue::Int),
        ColumnData::F32(v) => v.map_or(SqlValue::Null, |v| float_to_value(v.into())),
        ColumnData::F64(v) => v.map_or(SqlValue::Null, float_to_value),
        ColumnData::Bit(v) => v.map_or(SqlValue::Null, SqlValue::Bool),
        ColumnData::String(v) => v
            .as_ref()
            .map_or(SqlValue::Null, |s| SqlValue::Text(s.to_string())),
        ColumnData::Guid(v) => v.map_or(SqlValue::Null, |g| {
            SqlValue::Text(g.to_string().to_lowercase())
        }),
        ColumnData::Binary(v) => v
            .as_ref()
            .map_or(SqlValue::Null, |b| SqlValue::Text(bytes_to_hex(b))),
        ColumnData::Numeric(_) => Decimal::from_sql(data)?.into(),
        ColumnData::Xml(v) => v.as_ref().map_or(SqlValue::Null, |x| {
            SqlValue::Text(x.clone().into_owned().into_string())
        }),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(data)?.into()
        }
        ColumnData::Date(_) => NaiveDate::from_sql(data)?.into(),
        ColumnData::Time(_) => NaiveTime::from_sql(data)?.into(),
        ColumnData::DateTimeOffset(_) => DateTime::<FixedOffset>::from_sql(data)?.into(),
    };
    Ok(value)
}
