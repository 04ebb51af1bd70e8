//! SQL statement builders for the transfer engine.
//!
//! Table names, column names, and filter fragments come from trusted
//! configuration and are spliced verbatim: `source_table` may be a whole
//! parenthesized sub-query with an alias, and `where_condition` is raw SQL,
//! so identifier quoting cannot be applied uniformly. Config validation
//! rejects the obviously malformed (empty names, null bytes) up front.

/// SELECT statement streaming the mapped source columns.
pub fn build_select(
    source_columns: &[String],
    source_table: &str,
    where_condition: Option<&str>,
) -> String {
    let mut sql = format!(
        "SELECT {} FROM {}",
        source_columns.join(", "),
        source_table
    );
    if let Some(condition) = where_condition {
        sql.push_str(" WHERE ");
        sql.push_str(condition);
    }
    sql
}

/// COUNT(*) statement over the same table and filter as the SELECT,
/// ignoring the column projection.
pub fn build_count(source_table: &str, where_condition: Option<&str>) -> String {
    let mut sql = format!("SELECT COUNT(*) AS cnt FROM {}", source_table);
    if let Some(condition) = where_condition {
        sql.push_str(" WHERE ");
        sql.push_str(condition);
    }
    sql
}

/// Parameterized single-row INSERT with one positional placeholder per
/// destination column. Executed once per row by the bulk path.
pub fn build_insert(dest_columns: &[String], dest_table: &str) -> String {
    let placeholders = vec!["?"; dest_columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        dest_table,
        dest_columns.join(", "),
        placeholders
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_build_select_without_condition() {
        let sql = build_select(&cols(&["id", "name"]), "users", None);
        assert_eq!(sql, "SELECT id, name FROM users");
    }

    #[test]
    fn test_build_select_with_condition() {
        let sql = build_select(&cols(&["id"]), "users", Some("status = 'active'"));
        assert_eq!(sql, "SELECT id FROM users WHERE status = 'active'");
    }

    #[test]
    fn test_source_table_may_be_a_subquery() {
        let table = "(SELECT id, name FROM users WHERE created_at > '2024-01-01') AS recent";
        let sql = build_select(&cols(&["id", "name"]), table, None);
        assert_eq!(
            sql,
            "SELECT id, name FROM (SELECT id, name FROM users WHERE created_at > '2024-01-01') AS recent"
        );
    }

    #[test]
    fn test_build_count_ignores_projection() {
        let sql = build_count("users", Some("id > 100"));
        assert_eq!(sql, "SELECT COUNT(*) AS cnt FROM users WHERE id > 100");

        let sql = build_count("users", None);
        assert_eq!(sql, "SELECT COUNT(*) AS cnt FROM users");
    }

    #[test]
    fn test_build_insert_placeholder_arity() {
        let sql = build_insert(&cols(&["id", "full_name", "created_by"]), "users_new");
        assert_eq!(
            sql,
            "INSERT INTO users_new (id, full_name, created_by) VALUES (?, ?, ?)"
        );

        let sql = build_insert(&cols(&["only"]), "t");
        assert_eq!(sql, "INSERT INTO t (only) VALUES (?)");
    }
}
