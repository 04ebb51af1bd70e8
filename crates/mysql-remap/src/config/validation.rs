//! Configuration validation.
//!
//! Catches structural mistakes before any connection is opened. Table and
//! column checks stay loose on purpose: source tables may be sub-queries and
//! mapped keys may be computed SELECT items, so only emptiness and embedded
//! NUL bytes are rejected here.

use super::{Config, EndpointConfig, TransferConfig};
use crate::error::{Result, TransferError};

const SSL_MODES: [&str; 3] = ["disabled", "preferred", "required"];

/// Validate the full configuration.
pub fn validate(config: &Config) -> Result<()> {
    validate_endpoint("source", &config.source)?;
    validate_endpoint("destination", &config.destination)?;

    if config.transfers.is_empty() {
        return Err(TransferError::config(
            "at least one transfer must be defined",
        ));
    }
    for transfer in &config.transfers {
        validate_transfer(config, transfer)?;
    }

    Ok(())
}

fn validate_endpoint(side: &str, endpoint: &EndpointConfig) -> Result<()> {
    if endpoint.host.is_empty() {
        return Err(TransferError::config(format!("{side}.host is required")));
    }
    if endpoint.port == 0 {
        return Err(TransferError::config(format!("{side}.port cannot be 0")));
    }
    if endpoint.database.is_empty() {
        return Err(TransferError::config(format!(
            "{side}.database is required"
        )));
    }
    if endpoint.user.is_empty() {
        return Err(TransferError::config(format!("{side}.user is required")));
    }
    if !SSL_MODES.contains(&endpoint.ssl_mode.as_str()) {
        return Err(TransferError::config(format!(
            "{side}.ssl_mode must be one of {}, got '{}'",
            SSL_MODES.join(", "),
            endpoint.ssl_mode
        )));
    }
    Ok(())
}

fn validate_transfer(config: &Config, transfer: &TransferConfig) -> Result<()> {
    let label = format!("{} -> {}", transfer.source_table, transfer.dest_table);

    non_empty_no_nul("source_table", &transfer.source_table)?;
    non_empty_no_nul("dest_table", &transfer.dest_table)?;

    if transfer.batch_size == 0 {
        return Err(TransferError::config(format!(
            "transfer {label}: batch_size must be at least 1"
        )));
    }

    for name in transfer.column_mapping.keys() {
        non_empty_no_nul("column_mapping key", name)?;
    }
    for name in transfer.extra_columns.keys() {
        non_empty_no_nul("extra_columns key", name)?;
    }

    if transfer.mapped_columns_after_skips() == 0 && transfer.extra_columns.is_empty() {
        return Err(TransferError::EmptyMapping(transfer.source_table.clone()));
    }

    if same_endpoint(&config.source, &config.destination)
        && transfer.source_table.trim() == transfer.dest_table.trim()
    {
        return Err(TransferError::config(format!(
            "transfer {label}: source and destination are the same table on the same database"
        )));
    }

    Ok(())
}

fn non_empty_no_nul(context: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TransferError::config(format!(
            "{context} cannot be empty"
        )));
    }
    if value.contains('\0') {
        return Err(TransferError::config(format!(
            "{context} contains a NUL byte: {value:?}"
        )));
    }
    Ok(())
}

fn same_endpoint(a: &EndpointConfig, b: &EndpointConfig) -> bool {
    a.host == b.host && a.port == b.port && a.database == b.database
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RawColumnRule, RawColumnRuleMap};
    use indexmap::IndexMap;

    fn endpoint(database: &str) -> EndpointConfig {
        EndpointConfig {
            host: "localhost".to_string(),
            port: 3306,
            database: database.to_string(),
            user: "transfer".to_string(),
            password: "secret".to_string(),
            ssl_mode: "preferred".to_string(),
        }
    }

    fn transfer() -> TransferConfig {
        TransferConfig {
            source_table: "users".to_string(),
            dest_table: "users_new".to_string(),
            where_condition: String::new(),
            batch_size: 1000,
            column_mapping: IndexMap::from([(
                "id".to_string(),
                RawColumnRule::Rename("id".to_string()),
            )]),
            extra_columns: IndexMap::new(),
        }
    }

    fn valid_config() -> Config {
        Config {
            source: endpoint("legacy_crm"),
            destination: endpoint("new_crm"),
            transfers: vec![transfer()],
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_empty_host_rejected() {
        let mut config = valid_config();
        config.source.host = String::new();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("source.host"));
    }

    #[test]
    fn test_zero_port_rejected() {
        let mut config = valid_config();
        config.destination.port = 0;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("destination.port"));
    }

    #[test]
    fn test_invalid_ssl_mode_rejected() {
        let mut config = valid_config();
        config.source.ssl_mode = "verify-full".to_string();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("ssl_mode"));
    }

    #[test]
    fn test_no_transfers_rejected() {
        let mut config = valid_config();
        config.transfers.clear();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("at least one transfer"));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config = valid_config();
        config.transfers[0].batch_size = 0;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn test_all_skip_mapping_rejected() {
        let mut config = valid_config();
        config.transfers[0].column_mapping = IndexMap::from([(
            "secret".to_string(),
            RawColumnRule::Rule(RawColumnRuleMap {
                skip: true,
                column: None,
                default_value: None,
                transform: None,
            }),
        )]);
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, TransferError::EmptyMapping(_)));
    }

    #[test]
    fn test_same_table_on_same_database_rejected() {
        let mut config = valid_config();
        config.destination = endpoint("legacy_crm");
        config.transfers[0].dest_table = "users".to_string();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("same table"));
    }

    #[test]
    fn test_same_database_different_table_allowed() {
        let mut config = valid_config();
        config.destination = endpoint("legacy_crm");
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_nul_byte_in_dest_table_rejected() {
        let mut config = valid_config();
        config.transfers[0].dest_table = "users\0new".to_string();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("NUL"));
    }

    #[test]
    fn test_empty_column_key_rejected() {
        let mut config = valid_config();
        config.transfers[0]
            .column_mapping
            .insert(String::new(), RawColumnRule::Rename("x".to_string()));
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("column_mapping key"));
    }
}
