//! Named transform registry and the clock behind time-based generators.
//!
//! Configuration files refer to transforms by name; the registry resolves
//! those names into functions when a raw config is lowered into a
//! [`MappingSpec`](super::MappingSpec). Unknown names fail at lowering time,
//! never mid-transfer.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use uuid::Uuid;

use crate::error::{Result, TransferError};
use crate::value::SqlValue;

use super::{CellTransform, ValueGenerator};

/// Time source for the `current_timestamp` generator.
///
/// Injected instead of read ambiently so a run can be made deterministic.
pub trait Clock: Send + Sync {
    /// Current wall-clock time as naive UTC.
    fn now(&self) -> NaiveDateTime;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc()
    }
}

/// Resolves transform names into functions.
///
/// Cell transforms and generators live in separate namespaces: cell
/// transforms are legal in `column_mapping` rules (they receive the source
/// cell), generators in `extra_columns` rules (they receive nothing).
pub struct TransformRegistry {
    cells: HashMap<String, CellTransform>,
    generators: HashMap<String, ValueGenerator>,
}

impl TransformRegistry {
    /// Registry with no entries.
    pub fn empty() -> Self {
        Self {
            cells: HashMap::new(),
            generators: HashMap::new(),
        }
    }

    /// Registry pre-loaded with the built-in transforms, reading time from
    /// the given clock.
    ///
    /// Cells: `uppercase`, `lowercase`, `trim` (text in, text out; NULL
    /// passes through untouched). Generators: `current_timestamp`, `uuid`.
    pub fn builtin(clock: Arc<dyn Clock>) -> Self {
        let mut registry = Self::empty();

        registry.register_cell(text_builtin("uppercase", |s| s.to_uppercase()));
        registry.register_cell(text_builtin("lowercase", |s| s.to_lowercase()));
        registry.register_cell(text_builtin("trim", |s| s.trim().to_string()));

        registry.register_generator(ValueGenerator::new("current_timestamp", move || {
            Ok(SqlValue::DateTime(clock.now()))
        }));
        registry.register_generator(ValueGenerator::new("uuid", || {
            Ok(SqlValue::Uuid(Uuid::new_v4()))
        }));

        registry
    }

    /// Add or replace a cell transform, keyed by its name.
    pub fn register_cell(&mut self, transform: CellTransform) {
        self.cells.insert(transform.name().to_string(), transform);
    }

    /// Add or replace a generator, keyed by its name.
    pub fn register_generator(&mut self, generator: ValueGenerator) {
        self.generators
            .insert(generator.name().to_string(), generator);
    }

    /// Look up a cell transform for a `column_mapping` rule.
    pub fn cell(&self, name: &str) -> Result<CellTransform> {
        self.cells.get(name).cloned().ok_or_else(|| {
            TransferError::config(format!(
                "unknown column transform '{}' (available: {})",
                name,
                joined_names(self.cells.keys())
            ))
        })
    }

    /// Look up a generator for an `extra_columns` rule.
    pub fn generator(&self, name: &str) -> Result<ValueGenerator> {
        self.generators.get(name).cloned().ok_or_else(|| {
            TransferError::config(format!(
                "unknown extra-column transform '{}' (available: {})",
                name,
                joined_names(self.generators.keys())
            ))
        })
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::builtin(Arc::new(SystemClock))
    }
}

fn text_builtin(name: &'static str, apply: fn(&str) -> String) -> CellTransform {
    CellTransform::new(name, move |value| match value {
        SqlValue::Text(s) => Ok(SqlValue::Text(apply(&s))),
        SqlValue::Null => Ok(SqlValue::Null),
        other => Err(format!("expected text, got {}", other.type_name())),
    })
}

fn joined_names<'a>(names: impl Iterator<Item = &'a String>) -> String {
    let mut names: Vec<&str> = names.map(String::as_str).collect();
    names.sort_unstable();
    names.join(", ")
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    struct FixedClock(NaiveDateTime);

    impl Clock for FixedClock {
        fn now(&self) -> NaiveDateTime {
            self.0
        }
    }

    fn pinned() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_builtin_text_transforms() {
        let registry = TransformRegistry::default();

        let upper = registry.cell("uppercase").unwrap();
        assert_eq!(
            upper.apply(SqlValue::Text("ok".into())).unwrap(),
            SqlValue::Text("OK".into())
        );
        assert_eq!(upper.apply(SqlValue::Null).unwrap(), SqlValue::Null);
        assert!(upper.apply(SqlValue::I64(3)).is_err());

        let trim = registry.cell("trim").unwrap();
        assert_eq!(
            trim.apply(SqlValue::Text("  x ".into())).unwrap(),
            SqlValue::Text("x".into())
        );
    }

    #[test]
    fn test_current_timestamp_reads_injected_clock() {
        let registry = TransformRegistry::builtin(Arc::new(FixedClock(pinned())));
        let ts = registry.generator("current_timestamp").unwrap();

        assert_eq!(ts.generate().unwrap(), SqlValue::DateTime(pinned()));
        assert_eq!(ts.generate().unwrap(), SqlValue::DateTime(pinned()));
    }

    #[test]
    fn test_uuid_generator_produces_fresh_values() {
        let registry = TransformRegistry::default();
        let ids = registry.generator("uuid").unwrap();

        let a = ids.generate().unwrap();
        let b = ids.generate().unwrap();
        assert!(matches!(a, SqlValue::Uuid(_)));
        assert_ne!(a, b);
    }

    #[test]
    fn test_unknown_names_fail_with_config_error() {
        let registry = TransformRegistry::default();

        let err = registry.cell("reverse").unwrap_err();
        assert!(matches!(err, TransferError::Config(_)));
        assert!(err.to_string().contains("unknown column transform 'reverse'"));
        assert!(err.to_string().contains("lowercase"));

        // Generator names are a separate namespace from cell names.
        assert!(registry.cell("current_timestamp").is_err());
        assert!(registry.generator("uppercase").is_err());
    }

    #[test]
    fn test_custom_registration_overrides() {
        let mut registry = TransformRegistry::default();
        registry.register_cell(CellTransform::new("uppercase", |_| {
            Ok(SqlValue::Text("fixed".into()))
        }));

        let t = registry.cell("uppercase").unwrap();
        assert_eq!(
            t.apply(SqlValue::Text("anything".into())).unwrap(),
            SqlValue::Text("fixed".into())
        );
    }
}
