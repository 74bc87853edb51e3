//! Statement text builders.
//!
//! Pure functions from (table, columns, row count) to SQL text with `?`
//! positional placeholders. No side effects, no database access; the
//! driver adapter rewrites placeholders to its native form (see
//! [`crate::driver::bind_placeholders`]). Argument ordering handed to the
//! driver must exactly match column/expression order.

/// `INSERT INTO <table> (<c1>,<c2>,...) VALUES (?,...)[,(?,...)...]`
/// with one row-group per row.
pub fn insert_sql(table: &str, columns: &[&str], rows: usize) -> String {
    let mut sql = String::with_capacity(128);
    sql.push_str("INSERT INTO ");
    sql.push_str(table);
    sql.push_str(" (");
    sql.push_str(&columns.join(","));
    sql.push_str(") VALUES ");
    let group = row_group(columns.len());
    for row in 0..rows {
        if row > 0 {
            sql.push(',');
        }
        sql.push_str(&group);
    }
    sql
}

/// `SELECT <e1>,<e2>,... FROM <table> WHERE <cond>[ LIMIT <n>]`.
/// The LIMIT clause is omitted when `limit <= 0`.
pub fn select_sql(table: &str, exprs: &[&str], cond: &str, limit: i64) -> String {
    let mut sql = String::with_capacity(128);
    sql.push_str("SELECT ");
    sql.push_str(&exprs.join(","));
    sql.push_str(" FROM ");
    sql.push_str(table);
    sql.push_str(" WHERE ");
    sql.push_str(cond);
    if limit > 0 {
        sql.push_str(" LIMIT ");
        sql.push_str(&limit.to_string());
    }
    sql
}

/// `SELECT COUNT(*) FROM <table> WHERE <cond>`.
pub fn count_sql(table: &str, cond: &str) -> String {
    format!("SELECT COUNT(*) FROM {table} WHERE {cond}")
}

/// One `(?,?,...)` row group sized to the column count.
fn row_group(n: usize) -> String {
    let mut group = String::with_capacity(2 * n + 2);
    group.push('(');
    for i in 0..n {
        if i > 0 {
            group.push(',');
        }
        group.push('?');
    }
    group.push(')');
    group
}

/// Number of positional placeholders an insert statement carries.
pub fn placeholder_count(columns: usize, rows: usize) -> usize {
    columns * rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_single_row() {
        let sql = insert_sql("users", &["id", "name"], 1);
        assert_eq!(sql, "INSERT INTO users (id,name) VALUES (?,?)");
    }

    #[test]
    fn test_insert_multi_row() {
        let sql = insert_sql("users", &["id", "name"], 3);
        assert_eq!(
            sql,
            "INSERT INTO users (id,name) VALUES (?,?),(?,?),(?,?)"
        );
        assert_eq!(placeholder_count(2, 3), 6);
    }

    #[test]
    fn test_select_without_limit() {
        let sql = select_sql("users", &["id", "name"], "id = ?", 0);
        assert_eq!(sql, "SELECT id,name FROM users WHERE id = ?");
    }

    #[test]
    fn test_select_with_limit() {
        let sql = select_sql("users", &["name"], "id = ?", 5);
        assert_eq!(sql, "SELECT name FROM users WHERE id = ? LIMIT 5");
    }

    #[test]
    fn test_negative_limit_is_unlimited() {
        let sql = select_sql("users", &["name"], "id = ?", -1);
        assert!(!sql.contains("LIMIT"));
    }

    #[test]
    fn test_count() {
        assert_eq!(
            count_sql("users", "age > ?"),
            "SELECT COUNT(*) FROM users WHERE age > ?"
        );
    }
}
