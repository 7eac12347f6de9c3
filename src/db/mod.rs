use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

pub const DB_FILE: &str = "knowledge-navigator.db";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage connection lock poisoned")]
    Poisoned,
}

/// Key/value store backing persisted settings.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new(data_dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(data_dir)?;
        let conn = Connection::open(data_dir.join(DB_FILE))?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let db = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        db.migrate()?;
        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    fn migrate(&self) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    // ── Settings ──

    pub fn get_setting(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Writes every pair in one transaction. Either all keys are updated or none are.
    pub fn set_settings(&self, entries: &[(&str, String)]) -> Result<(), StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt =
                tx.prepare("INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)")?;
            for (key, value) in entries {
                stmt.execute(params![key, value])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_setting_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.get_setting("apiKey").unwrap(), None);
    }

    #[test]
    fn test_set_and_replace_setting() {
        let db = Database::open_in_memory().unwrap();
        db.set_setting("theme", "dark").unwrap();
        db.set_setting("theme", "light").unwrap();
        assert_eq!(db.get_setting("theme").unwrap().as_deref(), Some("light"));
    }

    #[test]
    fn test_set_settings_writes_all_keys() {
        let db = Database::open_in_memory().unwrap();
        db.set_settings(&[("llmModel", "m".to_string()), ("maxTokens", "500".to_string())])
            .unwrap();
        assert_eq!(db.get_setting("llmModel").unwrap().as_deref(), Some("m"));
        assert_eq!(db.get_setting("maxTokens").unwrap().as_deref(), Some("500"));
    }

    #[test]
    fn test_set_settings_rolls_back_on_failure() {
        let db = Database::open_in_memory().unwrap();
        db.set_setting("llmModel", "before").unwrap();
        {
            let conn = db.lock().unwrap();
            conn.execute_batch(
                "CREATE TRIGGER reject_max_tokens BEFORE INSERT ON settings
                 WHEN NEW.key = 'maxTokens'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();
        }

        let result = db.set_settings(&[
            ("llmModel", "after".to_string()),
            ("maxTokens", "500".to_string()),
        ]);
        assert!(result.is_err());
        assert_eq!(db.get_setting("llmModel").unwrap().as_deref(), Some("before"));
        assert_eq!(db.get_setting("maxTokens").unwrap(), None);
    }

    #[test]
    fn test_new_creates_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("nested");
        let db = Database::new(&data_dir).unwrap();
        db.set_setting("theme", "dark").unwrap();
        drop(db);

        let reopened = Database::new(&data_dir).unwrap();
        assert_eq!(reopened.get_setting("theme").unwrap().as_deref(), Some("dark"));
    }
}
