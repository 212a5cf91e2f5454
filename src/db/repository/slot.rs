use rusqlite::{params, Connection};

use crate::db::DatabaseError;

/// Read a storage slot by key. Returns None if the slot was never written.
pub fn get_slot(conn: &Connection, key: &str) -> Result<Option<String>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT value FROM storage_slots WHERE key = ?1")?;
    match stmt.query_row([key], |row| row.get::<_, String>(0)) {
        Ok(val) => Ok(Some(val)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DatabaseError::from(e)),
    }
}

/// Overwrite a storage slot (upsert). A single statement, so readers see
/// either the previous value or the new one.
pub fn set_slot(conn: &Connection, key: &str, value: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO storage_slots (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
        params![key, value],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn missing_slot_reads_none() {
        let conn = open_memory_database().unwrap();
        assert_eq!(get_slot(&conn, "absent").unwrap(), None);
    }

    #[test]
    fn set_then_get() {
        let conn = open_memory_database().unwrap();
        set_slot(&conn, "book", "[]").unwrap();
        assert_eq!(get_slot(&conn, "book").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn set_overwrites_existing_value() {
        let conn = open_memory_database().unwrap();
        set_slot(&conn, "book", "[1]").unwrap();
        set_slot(&conn, "book", "[2]").unwrap();
        assert_eq!(get_slot(&conn, "book").unwrap().as_deref(), Some("[2]"));

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM storage_slots", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn slots_are_independent() {
        let conn = open_memory_database().unwrap();
        set_slot(&conn, "a", "first").unwrap();
        set_slot(&conn, "b", "second").unwrap();
        assert_eq!(get_slot(&conn, "a").unwrap().as_deref(), Some("first"));
        assert_eq!(get_slot(&conn, "b").unwrap().as_deref(), Some("second"));
    }
}
