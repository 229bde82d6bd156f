//! Well status record store
//!
//! One SQLite table, `wells`, keyed by the unique `well` column. Every call
//! checks a connection out of the pool and hands it back before returning;
//! nothing is buffered between calls. Mutations go through a process-wide
//! write lock so two writers in this process never interleave.

use rusqlite::{params, ErrorCode, OptionalExtension};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

use super::{create_pool, get_connection, DbPool};
use crate::core::error::AppResult;

/// Row id assigned by SQLite on insert
pub type RecordId = i64;

/// Timestamp format of `updated_at`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Sample wells inserted into an empty table when demo seeding is enabled.
const DEMO_RECORDS: [(&str, &str, &str, &str); 3] = [
    ("Северное", "С-101", "В работе", "Первичная гидроразработка"),
    ("Южное", "Ю-204", "Завершено", "РК проведён"),
    ("Восточное", "В-301", "Планируется", "Подготовка площадки"),
];

/// One well status entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub field: String,
    pub well: String,
    pub status: String,
    pub comment: String,
    pub updated_at: String,
}

#[derive(Error, Debug)]
pub enum StoreError {
    /// `create` with a well that is already stored
    #[error("well {0} already exists")]
    DuplicateKey(String),

    /// `update` of a well that is not stored
    #[error("well {0} not found")]
    NotFound(String),

    /// The database file or the pool could not be used
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<r2d2::Error> for StoreError {
    fn from(err: r2d2::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

pub struct WellStore {
    pool: DbPool,
    write_lock: Mutex<()>,
}

impl WellStore {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            write_lock: Mutex::new(()),
        }
    }

    /// Opens (creating if needed) the database at `database_path`.
    pub fn open(database_path: &str) -> AppResult<Self> {
        Ok(Self::new(create_pool(database_path)?))
    }

    /// Inserts a new record.
    ///
    /// # Errors
    /// [`StoreError::DuplicateKey`] when `well` is already stored; nothing is
    /// written in that case.
    pub fn create(&self, field: &str, well: &str, status: &str, comment: &str) -> Result<RecordId, StoreError> {
        let _guard = self.lock_writes();
        let conn = get_connection(&self.pool)?;

        let inserted = conn.execute(
            "INSERT INTO wells (field, well, status, comment, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![field, well, status, comment, now()],
        );

        match inserted {
            Ok(_) => {
                let id = conn.last_insert_rowid();
                log::info!("Created well {} in field {} (id {})", well, field, id);
                Ok(id)
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation
                    && err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Err(StoreError::DuplicateKey(well.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Overwrites status and comment of an existing record and refreshes
    /// `updated_at`. The field is left as it was.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] when no record has this `well`.
    pub fn update(&self, well: &str, status: &str, comment: &str) -> Result<(), StoreError> {
        let _guard = self.lock_writes();
        let conn = get_connection(&self.pool)?;

        let changed = conn.execute(
            "UPDATE wells SET status = ?1, comment = ?2, updated_at = ?3 WHERE well = ?4",
            params![status, comment, now(), well],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound(well.to_string()));
        }
        log::info!("Updated well {}", well);
        Ok(())
    }

    /// All records ordered by field, then well.
    pub fn list_all(&self) -> Result<Vec<Record>, StoreError> {
        let conn = get_connection(&self.pool)?;
        let mut stmt =
            conn.prepare("SELECT field, well, status, comment, updated_at FROM wells ORDER BY field, well")?;
        let rows = stmt.query_map([], map_record)?;
        let records = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Unique field names, sorted.
    pub fn distinct_fields(&self) -> Result<Vec<String>, StoreError> {
        let conn = get_connection(&self.pool)?;
        let mut stmt = conn.prepare("SELECT DISTINCT field FROM wells ORDER BY field")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let fields = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(fields)
    }

    pub fn find(&self, well: &str) -> Result<Option<Record>, StoreError> {
        let conn = get_connection(&self.pool)?;
        let record = conn
            .query_row(
                "SELECT field, well, status, comment, updated_at FROM wells WHERE well = ?1",
                params![well],
                map_record,
            )
            .optional()?;
        Ok(record)
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = get_connection(&self.pool)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM wells", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Inserts the sample wells if the table is empty.
    ///
    /// Returns the number of records inserted.
    pub fn seed_demo_records(&self) -> Result<usize, StoreError> {
        if self.count()? > 0 {
            return Ok(0);
        }

        let mut inserted = 0;
        for (field, well, status, comment) in DEMO_RECORDS {
            match self.create(field, well, status, comment) {
                Ok(_) => inserted += 1,
                // Another process may have seeded in between
                Err(StoreError::DuplicateKey(_)) => {}
                Err(e) => return Err(e),
            }
        }
        log::info!("Seeded {} demo wells", inserted);
        Ok(inserted)
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        match self.write_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Store write lock was poisoned, recovering...");
                poisoned.into_inner()
            }
        }
    }

    #[cfg(test)]
    fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn map_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        field: row.get(0)?,
        well: row.get(1)?,
        status: row.get(2)?,
        comment: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, WellStore) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wells.db");
        let store = WellStore::open(path.to_str().unwrap()).unwrap();
        (dir, store)
    }

    fn wells(records: &[Record]) -> Vec<(&str, &str)> {
        records.iter().map(|r| (r.field.as_str(), r.well.as_str())).collect()
    }

    #[test]
    fn test_list_all_orders_by_field_then_well() {
        let (_dir, store) = open_store();
        store.create("Южное", "Ю-204", "Завершено", "РК проведён").unwrap();
        store.create("Северное", "С-102", "В работе", "").unwrap();
        store.create("Северное", "С-101", "В работе", "Тест").unwrap();

        let records = store.list_all().unwrap();
        assert_eq!(
            wells(&records),
            vec![("Северное", "С-101"), ("Северное", "С-102"), ("Южное", "Ю-204")]
        );
        assert_eq!(records[0].status, "В работе");
        assert_eq!(records[0].comment, "Тест");
        assert_eq!(records[0].updated_at.len(), "2024-01-01 00:00:00".len());
    }

    #[test]
    fn test_list_all_matches_sorted_copy_for_scrambled_inserts() {
        let (_dir, store) = open_store();

        let fields = ["Южное", "Восточное", "Северное", "Западное", "Арктическое"];
        let mut rows: Vec<(String, String)> = Vec::new();
        for (i, field) in fields.iter().enumerate() {
            for j in 0..6 {
                rows.push((field.to_string(), format!("{}-{:02}", i * 7 + 3, 11 - j)));
            }
        }

        // 7 is coprime with 30, so this visits every row once in scrambled order
        let n = rows.len();
        for k in 0..n {
            let (field, well) = &rows[(k * 7) % n];
            store.create(field, well, "s", "c").unwrap();
        }

        let mut expected = rows.clone();
        expected.sort();
        let actual: Vec<(String, String)> = store
            .list_all()
            .unwrap()
            .into_iter()
            .map(|r| (r.field, r.well))
            .collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_create_returns_increasing_ids() {
        let (_dir, store) = open_store();
        let first = store.create("A", "1", "s", "c").unwrap();
        let second = store.create("A", "2", "s", "c").unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_duplicate_well_is_rejected_without_partial_write() {
        let (_dir, store) = open_store();
        store.create("Север", "С-101", "В работе", "Тест").unwrap();

        let err = store.create("Север", "С-101", "Иначе", "Тест2").unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(ref well) if well == "С-101"));

        let records = store.list_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, "В работе");
        assert_eq!(records[0].comment, "Тест");
    }

    #[test]
    fn test_update_missing_well_is_not_found() {
        let (_dir, store) = open_store();
        store.create("Север", "С-101", "В работе", "Тест").unwrap();
        let before = store.list_all().unwrap();

        let err = store.update("С-999", "Готово", "ок").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(ref well) if well == "С-999"));
        assert_eq!(store.list_all().unwrap(), before);
    }

    #[test]
    fn test_update_against_empty_store_is_not_found() {
        let (_dir, store) = open_store();
        assert!(matches!(
            store.update("С-999", "Готово", "ок"),
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_update_changes_status_comment_and_timestamp_only() {
        let (_dir, store) = open_store();
        store.create("Север", "С-101", "В работе", "Тест").unwrap();
        {
            let conn = store.pool().get().unwrap();
            conn.execute("UPDATE wells SET updated_at = '2000-01-01 00:00:00'", [])
                .unwrap();
        }

        store.update("С-101", "Готово", "ок").unwrap();

        let record = store.find("С-101").unwrap().unwrap();
        assert_eq!(record.field, "Север");
        assert_eq!(record.well, "С-101");
        assert_eq!(record.status, "Готово");
        assert_eq!(record.comment, "ок");
        assert_ne!(record.updated_at, "2000-01-01 00:00:00");
    }

    #[test]
    fn test_distinct_fields() {
        let (_dir, store) = open_store();
        assert!(store.distinct_fields().unwrap().is_empty());

        store.create("Южное", "Ю-1", "s", "").unwrap();
        store.create("Северное", "С-1", "s", "").unwrap();
        store.create("Южное", "Ю-2", "s", "").unwrap();

        assert_eq!(store.distinct_fields().unwrap(), vec!["Северное", "Южное"]);
    }

    #[test]
    fn test_seed_only_fills_empty_table() {
        let (_dir, store) = open_store();
        assert_eq!(store.seed_demo_records().unwrap(), 3);
        assert_eq!(store.seed_demo_records().unwrap(), 0);
        assert_eq!(store.count().unwrap(), 3);
        assert!(store.find("Ю-204").unwrap().is_some());
    }

    #[test]
    fn test_find_missing_is_none() {
        let (_dir, store) = open_store();
        assert!(store.find("nope").unwrap().is_none());
    }

    #[test]
    fn test_concurrent_creates_of_distinct_wells_all_persist() {
        let (_dir, store) = open_store();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.create("Поле", &format!("W-{}", i), "s", "c"))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        assert_eq!(store.count().unwrap(), 8);
    }

    #[test]
    fn test_racing_creates_of_same_well_keep_exactly_one() {
        let (_dir, store) = open_store();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.create("Поле", "W-1", &format!("status {}", i), "c"))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, StoreError::DuplicateKey(_))));
        assert_eq!(store.count().unwrap(), 1);
    }
}
