//! Origin-scoped, SQLite-backed long-term area.

use rusqlite::{params, OptionalExtension, TransactionBehavior};

use crate::area::KeyValueArea;
use crate::error::AreaError;
use crate::migrations::run_migrations;
use crate::pool::DbPool;

/// Long-term area storing entries in the `kv_entries` table.
///
/// Entries are keyed by `(origin, key)`, so several origins can share one
/// database file without seeing each other's values.
#[derive(Clone)]
pub struct LocalArea {
    pool: DbPool,
    origin: String,
    quota_bytes: Option<usize>,
}

impl LocalArea {
    /// Opens the area for `origin`, applying pending migrations first.
    ///
    /// # Errors
    ///
    /// Returns `AreaError::Pool` if no connection is available and
    /// `AreaError::Migration` if the schema cannot be brought up to date.
    pub fn open(pool: DbPool, origin: impl Into<String>) -> Result<Self, AreaError> {
        let conn = pool.get()?;
        let applied = run_migrations(&conn)?;
        if applied > 0 {
            tracing::info!(count = applied, "applied storage migrations");
        }

        Ok(Self {
            pool,
            origin: origin.into(),
            quota_bytes: None,
        })
    }

    /// Limits the bytes (keys plus values) this origin may hold.
    #[must_use]
    pub fn with_quota(mut self, quota_bytes: usize) -> Self {
        self.quota_bytes = Some(quota_bytes);
        self
    }

    /// The origin this area is scoped to.
    pub fn origin(&self) -> &str {
        &self.origin
    }
}

impl std::fmt::Debug for LocalArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalArea")
            .field("origin", &self.origin)
            .field("quota_bytes", &self.quota_bytes)
            .finish_non_exhaustive()
    }
}

impl KeyValueArea for LocalArea {
    fn get_item(&self, key: &str) -> Result<Option<String>, AreaError> {
        let conn = self.pool.get()?;
        let value = conn
            .query_row(
                "SELECT value FROM kv_entries WHERE origin = ?1 AND key = ?2",
                params![self.origin, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AreaError> {
        let mut conn = self.pool.get()?;
        // IMMEDIATE takes the write lock up front, so the quota check and
        // the write see the same totals as every other writer.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Some(quota) = self.quota_bytes {
            let others: i64 = tx.query_row(
                "SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))), 0)
                 FROM kv_entries WHERE origin = ?1 AND key != ?2",
                params![self.origin, key],
                |row| row.get(0),
            )?;
            let required = usize::try_from(others).unwrap_or(usize::MAX) + key.len() + value.len();
            if required > quota {
                return Err(AreaError::QuotaExceeded { required, quota });
            }
        }

        tx.execute(
            "INSERT INTO kv_entries (origin, key, value, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(origin, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            params![self.origin, key, value],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), AreaError> {
        let conn = self.pool.get()?;
        conn.execute(
            "DELETE FROM kv_entries WHERE origin = ?1 AND key = ?2",
            params![self.origin, key],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{create_pool, DbRuntimeSettings};

    fn open_area(dir: &tempfile::TempDir, origin: &str) -> LocalArea {
        let path = dir.path().join("local.db");
        let pool = create_pool(path.to_str().expect("utf-8 path"), DbRuntimeSettings::default())
            .expect("pool creation should succeed");
        LocalArea::open(pool, origin).expect("area should open")
    }

    #[test]
    fn set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let area = open_area(&dir, "https://shop.example");

        assert_eq!(area.get_item("k").unwrap(), None);
        area.set_item("k", "[]").unwrap();
        assert_eq!(area.get_item("k").unwrap(), Some("[]".to_string()));
        area.set_item("k", "[1]").unwrap();
        assert_eq!(area.get_item("k").unwrap(), Some("[1]".to_string()));
        area.remove_item("k").unwrap();
        assert_eq!(area.get_item("k").unwrap(), None);
    }

    #[test]
    fn origins_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let shop = open_area(&dir, "https://shop.example");
        let docs = open_area(&dir, "https://docs.example");

        shop.set_item("k", "shop").unwrap();
        assert_eq!(docs.get_item("k").unwrap(), None);
        docs.set_item("k", "docs").unwrap();
        assert_eq!(shop.get_item("k").unwrap(), Some("shop".to_string()));
    }

    #[test]
    fn quota_rejects_oversized_write() {
        let dir = tempfile::tempdir().unwrap();
        let area = open_area(&dir, "https://shop.example").with_quota(8);

        area.set_item("k", "1234567").expect("exactly at quota");
        let err = area.set_item("j", "x").unwrap_err();
        assert!(matches!(
            err,
            AreaError::QuotaExceeded {
                required: 10,
                quota: 8
            }
        ));
        assert_eq!(area.get_item("j").unwrap(), None);
    }

    #[test]
    fn concurrent_writers_cannot_overrun_quota() {
        let dir = tempfile::tempdir().unwrap();
        let area = open_area(&dir, "https://shop.example").with_quota(10);

        // Each write fits alone; both together would need 18 bytes.
        let results: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = ["a", "b"]
                .into_iter()
                .map(|key| {
                    let area = &area;
                    scope.spawn(move || area.set_item(key, "12345678"))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let stored = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(stored, 1, "results: {results:?}");
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AreaError::QuotaExceeded { quota: 10, .. }))));
    }
}
