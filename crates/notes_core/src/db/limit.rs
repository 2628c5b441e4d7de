//! Row limit parameter for multi-row queries.

use rusqlite::types::{ToSql, ToSqlOutput, Value};
use serde::{Serialize, Serializer};

const ALL: &str = "all";

/// SQL fragment honoring a bound [`Limit`] at parameter `?{n}`.
///
/// SQLite has no `LIMIT ALL`; the literal is translated to `-1` in SQL.
pub(crate) fn limit_clause(param: usize) -> String {
    format!("LIMIT (CASE ?{param} WHEN '{ALL}' THEN -1 ELSE ?{param} END)")
}

/// Maximum number of rows to return. Values below 1 mean "all rows".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Limit(pub i64);

impl Limit {
    pub const ALL: Limit = Limit(0);

    /// Value bound for this limit: the literal `all` or the row count.
    pub fn value(self) -> Value {
        if self.0 < 1 {
            Value::Text(ALL.to_string())
        } else {
            Value::Integer(self.0)
        }
    }
}

impl From<i64> for Limit {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl ToSql for Limit {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Owned(self.value()))
    }
}

impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0 < 1 {
            serializer.serialize_str(ALL)
        } else {
            serializer.serialize_i64(self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{limit_clause, Limit};
    use rusqlite::types::Value;
    use rusqlite::Connection;

    #[test]
    fn non_positive_limit_binds_all() {
        assert_eq!(Limit(0).value(), Value::Text("all".to_string()));
        assert_eq!(Limit(-4).value(), Value::Text("all".to_string()));
        assert_eq!(Limit(5).value(), Value::Integer(5));

        assert_eq!(serde_json::to_value(Limit(0)).unwrap(), "all");
        assert_eq!(serde_json::to_value(Limit(5)).unwrap(), 5);
    }

    #[test]
    fn bound_limit_caps_rows_in_sqlite() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (n INTEGER);
             INSERT INTO t (n) VALUES (1), (2), (3), (4);",
        )
        .unwrap();

        let count = |limit: Limit| -> i64 {
            let sql = format!(
                "SELECT COUNT(*) FROM (SELECT n FROM t ORDER BY n {})",
                limit_clause(1)
            );
            conn.query_row(&sql, [limit], |row| row.get(0)).unwrap()
        };

        assert_eq!(count(Limit(2)), 2);
        assert_eq!(count(Limit::ALL), 4);
        assert_eq!(count(Limit(-1)), 4);
    }
}
