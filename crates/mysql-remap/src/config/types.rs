//! Configuration types.
//!
//! These are the raw file-side shapes. Column rules in YAML are loose (a
//! bare string, or a map with any mix of `skip` / `column` / `default_value`
//! / `transform` keys); [`TransferConfig::resolve`] lowers them into the
//! strict tagged rules of a [`MappingSpec`], applying the fixed precedence
//! skip > default_value > transform > column > identity. Unknown keys in a
//! rule map are ignored so older binaries tolerate newer config files.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value as YamlValue;

use crate::error::{Result, TransferError};
use crate::mapping::{ColumnRule, ExtraRule, MappingSpec, TransformRegistry, DEFAULT_BATCH_SIZE};
use crate::value::SqlValue;

/// Top-level configuration: two endpoints and the transfers to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source database.
    pub source: EndpointConfig,

    /// Destination database.
    pub destination: EndpointConfig,

    /// Transfers, executed in order. The first failure stops the run.
    pub transfers: Vec<TransferConfig>,
}

/// MySQL endpoint configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 3306).
    #[serde(default = "default_mysql_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    pub password: String,

    /// SSL mode: "disabled", "preferred", or "required" (default: "preferred").
    #[serde(default = "default_ssl_mode")]
    pub ssl_mode: String,
}

// Passwords must never reach logs through Debug formatting.
impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// One transfer as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Table name or parenthesized sub-query with alias, used verbatim.
    pub source_table: String,

    /// Destination table name.
    pub dest_table: String,

    /// Raw SQL filter fragment; empty means all rows.
    #[serde(default)]
    pub where_condition: String,

    /// Rows per fetched/committed batch (default: 1000).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Ordered source-column rules; order defines SELECT and INSERT order.
    pub column_mapping: IndexMap<String, RawColumnRule>,

    /// Ordered destination-only columns, appended after mapped columns.
    #[serde(default)]
    pub extra_columns: IndexMap<String, RawExtraRule>,
}

/// Column rule as written in YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawColumnRule {
    /// Bare string: copy under this destination name.
    Rename(String),

    /// Structured rule map.
    Rule(RawColumnRuleMap),
}

/// Structured column rule; any mix of keys is accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawColumnRuleMap {
    /// Drop the column from both sides.
    #[serde(default)]
    pub skip: bool,

    /// Destination column name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,

    /// Constant written instead of the source value. A present-but-null
    /// value is meaningful (writes NULL), so presence is tracked.
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_value: Option<YamlValue>,

    /// Named cell transform applied to the source value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,
}

/// Extra-column rule as written in YAML: a map selects behavior by key,
/// anything else is a literal scalar.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawExtraRule {
    /// Structured rule map.
    Rule(RawExtraRuleMap),

    /// Plain scalar literal.
    Literal(YamlValue),
}

/// Structured extra-column rule. With neither key present the column is
/// filled with NULL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawExtraRuleMap {
    /// Constant for every row; presence tracked as above.
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_value: Option<YamlValue>,

    /// Named generator invoked once per row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,
}

impl TransferConfig {
    /// Lower the raw file form into an executable [`MappingSpec`], resolving
    /// transform names through the registry.
    pub fn resolve(&self, registry: &TransformRegistry) -> Result<MappingSpec> {
        let mut spec = MappingSpec::new(self.source_table.as_str(), self.dest_table.as_str())
            .with_batch_size(self.batch_size)
            .with_where_condition(self.where_condition.as_str());

        for (source, raw) in &self.column_mapping {
            let rule = lower_column_rule(raw, registry)?;
            spec = spec.with_column(source.as_str(), rule);
        }
        for (dest, raw) in &self.extra_columns {
            let rule = lower_extra_rule(raw, registry)?;
            spec = spec.with_extra(dest.as_str(), rule);
        }

        Ok(spec)
    }

    /// Count of mapped columns that survive skip rules.
    pub fn mapped_columns_after_skips(&self) -> usize {
        self.column_mapping
            .values()
            .filter(|rule| !matches!(rule, RawColumnRule::Rule(map) if map.skip))
            .count()
    }
}

fn lower_column_rule(raw: &RawColumnRule, registry: &TransformRegistry) -> Result<ColumnRule> {
    match raw {
        RawColumnRule::Rename(dest) => Ok(ColumnRule::rename(dest.as_str())),
        RawColumnRule::Rule(rule) => {
            if rule.skip {
                return Ok(ColumnRule::Skip);
            }
            // Fixed order: a rule carrying both keys resolves to the default.
            if let Some(value) = &rule.default_value {
                return Ok(ColumnRule::Default {
                    dest: rule.column.clone(),
                    value: yaml_scalar(value)?,
                });
            }
            if let Some(name) = &rule.transform {
                return Ok(ColumnRule::Transform {
                    dest: rule.column.clone(),
                    func: registry.cell(name)?,
                });
            }
            match &rule.column {
                Some(dest) => Ok(ColumnRule::rename(dest.as_str())),
                None => Ok(ColumnRule::Copy),
            }
        }
    }
}

fn lower_extra_rule(raw: &RawExtraRule, registry: &TransformRegistry) -> Result<ExtraRule> {
    match raw {
        RawExtraRule::Rule(rule) => {
            if let Some(value) = &rule.default_value {
                return Ok(ExtraRule::Default(yaml_scalar(value)?));
            }
            if let Some(name) = &rule.transform {
                return Ok(ExtraRule::Generate(registry.generator(name)?));
            }
            Ok(ExtraRule::Default(SqlValue::Null))
        }
        RawExtraRule::Literal(value) => Ok(ExtraRule::Literal(yaml_scalar(value)?)),
    }
}

/// Convert a YAML scalar into a [`SqlValue`]. Sequences and maps are not
/// valid defaults or literals.
fn yaml_scalar(value: &YamlValue) -> Result<SqlValue> {
    match value {
        YamlValue::Null => Ok(SqlValue::Null),
        YamlValue::Bool(b) => Ok(SqlValue::Bool(*b)),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(SqlValue::I64(i))
            } else if let Some(f) = n.as_f64() {
                Ok(SqlValue::F64(f))
            } else {
                Err(TransferError::config(format!(
                    "unsupported numeric literal: {:?}",
                    n
                )))
            }
        }
        YamlValue::String(s) => Ok(SqlValue::Text(s.clone())),
        other => Err(TransferError::config(format!(
            "default and literal values must be scalars, got: {:?}",
            other
        ))),
    }
}

/// Only invoked when the key is present, so `default_value: null` arrives
/// as `Some(Null)` while an absent key stays `None`.
fn present_value<'de, D>(deserializer: D) -> std::result::Result<Option<YamlValue>, D::Error>
where
    D: Deserializer<'de>,
{
    YamlValue::deserialize(deserializer).map(Some)
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_ssl_mode() -> String {
    "preferred".to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TransformRegistry {
        TransformRegistry::default()
    }

    fn transfer_from_yaml(yaml: &str) -> TransferConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_bare_string_rule_is_rename() {
        let transfer = transfer_from_yaml(
            r#"
source_table: users
dest_table: users_new
column_mapping:
  id: id
  name: full_name
"#,
        );
        let spec = transfer.resolve(&registry()).unwrap();
        assert!(matches!(
            &spec.column_mapping["name"],
            ColumnRule::Rename { dest } if dest == "full_name"
        ));
        assert_eq!(spec.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_rule_map_forms_lower_correctly() {
        let transfer = transfer_from_yaml(
            r#"
source_table: users
dest_table: users_new
batch_size: 250
where_condition: "status = 'active'"
column_mapping:
  secret: { skip: true }
  status: { column: account_status, transform: uppercase }
  role: { default_value: member }
  legacy_flag: { column: flag, default_value: 0 }
  note: {}
"#,
        );
        let spec = transfer.resolve(&registry()).unwrap();

        assert!(spec.column_mapping["secret"].is_skip());
        assert!(matches!(
            &spec.column_mapping["status"],
            ColumnRule::Transform { dest: Some(d), .. } if d == "account_status"
        ));
        assert!(matches!(
            &spec.column_mapping["role"],
            ColumnRule::Default { dest: None, value } if *value == SqlValue::Text("member".into())
        ));
        assert!(matches!(
            &spec.column_mapping["legacy_flag"],
            ColumnRule::Default { dest: Some(d), value } if d == "flag" && *value == SqlValue::I64(0)
        ));
        assert!(matches!(&spec.column_mapping["note"], ColumnRule::Copy));
        assert_eq!(spec.where_condition.as_deref(), Some("status = 'active'"));
        assert_eq!(spec.batch_size, 250);
    }

    #[test]
    fn test_default_value_wins_over_transform() {
        let transfer = transfer_from_yaml(
            r#"
source_table: t
dest_table: t2
column_mapping:
  both: { default_value: fixed, transform: uppercase }
"#,
        );
        let spec = transfer.resolve(&registry()).unwrap();
        assert!(matches!(
            &spec.column_mapping["both"],
            ColumnRule::Default { value, .. } if *value == SqlValue::Text("fixed".into())
        ));
    }

    #[test]
    fn test_explicit_null_default_is_preserved() {
        let transfer = transfer_from_yaml(
            r#"
source_table: t
dest_table: t2
column_mapping:
  id: id
extra_columns:
  modified_by: { default_value: null }
"#,
        );
        let spec = transfer.resolve(&registry()).unwrap();
        assert!(matches!(
            &spec.extra_columns["modified_by"],
            ExtraRule::Default(SqlValue::Null)
        ));
    }

    #[test]
    fn test_unknown_rule_keys_are_ignored() {
        let transfer = transfer_from_yaml(
            r#"
source_table: t
dest_table: t2
column_mapping:
  id: { column: id, comment: "kept for the next schema rev" }
"#,
        );
        let spec = transfer.resolve(&registry()).unwrap();
        assert!(matches!(
            &spec.column_mapping["id"],
            ColumnRule::Rename { dest } if dest == "id"
        ));
    }

    #[test]
    fn test_extra_rule_forms() {
        let transfer = transfer_from_yaml(
            r#"
source_table: t
dest_table: t2
column_mapping:
  id: id
extra_columns:
  created_by: { default_value: 1 }
  imported_at: { transform: current_timestamp }
  source_system: crm
  spare: {}
"#,
        );
        let spec = transfer.resolve(&registry()).unwrap();

        assert!(matches!(
            &spec.extra_columns["created_by"],
            ExtraRule::Default(SqlValue::I64(1))
        ));
        assert!(matches!(
            &spec.extra_columns["imported_at"],
            ExtraRule::Generate(g) if g.name() == "current_timestamp"
        ));
        assert!(matches!(
            &spec.extra_columns["source_system"],
            ExtraRule::Literal(SqlValue::Text(s)) if s == "crm"
        ));
        assert!(matches!(
            &spec.extra_columns["spare"],
            ExtraRule::Default(SqlValue::Null)
        ));

        // Extra order must survive YAML round-tripping.
        let keys: Vec<&str> = spec.extra_columns.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["created_by", "imported_at", "source_system", "spare"]
        );
    }

    #[test]
    fn test_unknown_transform_name_fails_at_lowering() {
        let transfer = transfer_from_yaml(
            r#"
source_table: t
dest_table: t2
column_mapping:
  name: { transform: reticulate }
"#,
        );
        let err = transfer.resolve(&registry()).unwrap_err();
        assert!(matches!(err, TransferError::Config(_)));
        assert!(err.to_string().contains("reticulate"));
    }

    #[test]
    fn test_non_scalar_literal_is_rejected() {
        let transfer = transfer_from_yaml(
            r#"
source_table: t
dest_table: t2
column_mapping:
  id: id
extra_columns:
  tags: [a, b]
"#,
        );
        let err = transfer.resolve(&registry()).unwrap_err();
        assert!(matches!(err, TransferError::Config(_)));
    }

    #[test]
    fn test_mapped_columns_after_skips() {
        let transfer = transfer_from_yaml(
            r#"
source_table: t
dest_table: t2
column_mapping:
  a: { skip: true }
  b: b
  c: { transform: trim }
"#,
        );
        assert_eq!(transfer.mapped_columns_after_skips(), 2);
    }

    #[test]
    fn test_endpoint_debug_redacts_password() {
        let endpoint = EndpointConfig {
            host: "localhost".into(),
            port: 3306,
            database: "db".into(),
            user: "root".into(),
            password: "super_secret_password_123".into(),
            ssl_mode: "preferred".into(),
        };
        let debug_output = format!("{:?}", endpoint);
        assert!(
            debug_output.contains("[REDACTED]"),
            "Debug output should contain [REDACTED]"
        );
        assert!(
            !debug_output.contains("super_secret_password_123"),
            "Debug output should not contain actual password value"
        );
    }
}
