//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use std::path::Path;

use crate::error::Result;
use crate::mapping::{MappingSpec, TransformRegistry};

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Lower every transfer into an executable [`MappingSpec`].
    pub fn resolve_transfers(&self, registry: &TransformRegistry) -> Result<Vec<MappingSpec>> {
        self.transfers
            .iter()
            .map(|transfer| transfer.resolve(registry))
            .collect()
    }
}

/// Commented sample configuration written by `mysql-remap init`.
pub const SAMPLE_CONFIG: &str = r#"# mysql-remap configuration
#
# Copies rows between MySQL databases in batches, applying declarative
# per-column rules along the way.

source:
  host: localhost
  port: 3306
  database: legacy_crm
  user: transfer
  password: change-me
  ssl_mode: preferred # disabled | preferred | required

destination:
  host: localhost
  port: 3306
  database: new_crm
  user: transfer
  password: change-me

# Transfers run in order; the first failure stops the run.
transfers:
  # Plain copy with a skipped column and injected audit columns.
  - source_table: users
    dest_table: users
    batch_size: 1000
    column_mapping:
      id: id # a bare string names the destination column
      username: login
      email: email
      password_hash: { skip: true }
      status: { column: account_status, transform: lowercase }
      role: { default_value: member }
    extra_columns:
      created_by: { default_value: 1 }
      imported_at: { transform: current_timestamp }

  # Sub-query source with a filter applied on top of it.
  - source_table: "(SELECT o.id, o.total, c.name AS customer FROM orders o JOIN customers c ON c.id = o.customer_id) AS src"
    dest_table: order_summaries
    where_condition: "total > 0"
    batch_size: 500
    column_mapping:
      id: id
      total: total
      customer: customer_name
"#;
