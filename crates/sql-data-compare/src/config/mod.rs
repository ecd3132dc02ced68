//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::{CompareError, Result, Side};
use sha2::{Digest, Sha256};
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut config: Config = serde_yaml::from_str(yaml)?;
        config.resolve_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Compute a SHA256 hash of the configuration, reported with each run.
    pub fn hash(&self) -> String {
        let yaml = serde_yaml::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(yaml.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Connection settings for one side of a spec, with any database override applied.
    pub fn connection_for(&self, spec: &ComparisonSpec, side: Side) -> Result<ConnectionConfig> {
        let name = spec.connection_name(side);
        let conn = self.connections.get(name).ok_or_else(|| {
            CompareError::Config(format!(
                "Comparison '{}' references unknown {} connection '{}'",
                spec.name, side, name
            ))
        })?;

        Ok(match spec.database_override(side) {
            Some(database) => conn.with_database(database),
            None => conn.clone(),
        })
    }

    /// Effective dialect for one side of a spec.
    pub fn db_type_for(&self, spec: &ComparisonSpec, side: Side) -> Result<DbType> {
        let conn = self.connection_for(spec, side)?;
        Ok(spec.db_type(side).unwrap_or(conn.r#type))
    }

    /// Expand `${VAR}` references in connection credentials.
    fn resolve_env(&mut self) -> Result<()> {
        for (name, conn) in self.connections.iter_mut() {
            conn.host = expand_env(&conn.host, name)?;
            conn.user = expand_env(&conn.user, name)?;
            conn.password = expand_env(&conn.password, name)?;
        }
        Ok(())
    }
}

/// Replace a whole-value `${VAR}` with the variable's contents.
fn expand_env(value: &str, connection: &str) -> Result<String> {
    let trimmed = value.trim();
    match trimmed
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
    {
        Some(var) => std::env::var(var).map_err(|_| {
            CompareError::Config(format!(
                "Environment variable '{}' for connection '{}' not found or empty",
                var, connection
            ))
        }),
        None => Ok(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
connections:
  legacy:
    type: mssql
    host: sql01
    database: Sales
    user: reader
    password: secret
  warehouse:
    type: postgresql
    host: pg01
    database: sales
    user: reader
    password: secret
    ssl_mode: disable
output_type: differences
output_format: sql
max_sql_in_values: 250
compare_list:
  - name: Orders
    left_connection: legacy
    right_connection: warehouse
    left_query: SELECT id, total FROM dbo.Orders
    right_query_file: orders.sql
    output_table_name: dbo.Orders
    left_database: Sales_Archive
"#;

    #[test]
    fn test_parse_sample_config() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.connections.len(), 2);
        assert_eq!(config.output_type, Some(OutputType::Differences));
        assert_eq!(config.output_format, OutputFormat::Sql);
        assert_eq!(config.max_sql_in_values, 250);
        assert!(!config.timestamp_file);

        let warehouse = &config.connections["warehouse"];
        assert_eq!(warehouse.r#type, DbType::Postgres);
        assert_eq!(warehouse.port(), 5432);
    }

    #[test]
    fn test_table_name_key_accepted() {
        let yaml = SAMPLE.replace("output_table_name: dbo.Orders", "table_name: dbo.Orders");
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(
            config.compare_list[0].output_table_name.as_deref(),
            Some("dbo.Orders")
        );
    }

    #[test]
    fn test_connection_for_applies_database_override() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        let spec = &config.compare_list[0];

        let left = config.connection_for(spec, Side::Left).unwrap();
        assert_eq!(left.database, "Sales_Archive");
        assert_eq!(left.port(), 1433);

        let right = config.connection_for(spec, Side::Right).unwrap();
        assert_eq!(right.database, "sales");
        assert_eq!(config.db_type_for(spec, Side::Right).unwrap(), DbType::Postgres);
    }

    #[test]
    fn test_query_source_prefers_inline() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        let spec = &config.compare_list[0];
        assert!(matches!(
            spec.query_source(Side::Left).unwrap(),
            QuerySource::Inline(_)
        ));
        assert_eq!(
            spec.query_source(Side::Right).unwrap(),
            QuerySource::File("orders.sql".into())
        );
    }

    #[test]
    fn test_query_file_resolved_against_sql_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("orders.sql"), "SELECT 1").unwrap();

        let source = QuerySource::File("orders.sql".into());
        assert_eq!(source.load(dir.path()).unwrap(), "SELECT 1");

        let missing = QuerySource::File("missing.sql".into());
        assert!(matches!(
            missing.load(dir.path()),
            Err(CompareError::Config(_))
        ));
    }

    #[test]
    fn test_env_password_expansion() {
        std::env::set_var("SQL_DATA_COMPARE_TEST_PW", "from-env");
        let yaml = SAMPLE.replacen("password: secret", "password: ${SQL_DATA_COMPARE_TEST_PW}", 1);
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(config.connections["legacy"].password, "from-env");

        let yaml = SAMPLE.replacen("password: secret", "password: ${SQL_DATA_COMPARE_UNSET_PW}", 1);
        assert!(Config::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_hash_is_stable() {
        let a = Config::from_yaml(SAMPLE).unwrap();
        let b = Config::from_yaml(SAMPLE).unwrap();
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.hash().len(), 64);
    }
}
