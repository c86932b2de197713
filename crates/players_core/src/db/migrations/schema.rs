//! Schema inspection and erasure helpers for the migrator.

use super::HISTORY_TABLE;
use crate::db::DbResult;
use rusqlite::Connection;

/// One `sqlite_master` entry, as compared for drift detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SchemaObject {
    kind: String,
    name: String,
    table: String,
    sql: Option<String>,
}

/// Returns user schema objects sorted by kind and name.
///
/// SQLite internals and the migration history table are excluded.
pub(super) fn snapshot(conn: &Connection) -> DbResult<Vec<SchemaObject>> {
    let mut stmt = conn.prepare(
        "SELECT type, name, tbl_name, sql
         FROM sqlite_master
         WHERE name NOT LIKE 'sqlite\\_%' ESCAPE '\\'
           AND name <> ?1
           AND tbl_name <> ?1
         ORDER BY type ASC, name ASC;",
    )?;
    let mut rows = stmt.query([HISTORY_TABLE])?;
    let mut objects = Vec::new();
    while let Some(row) = rows.next()? {
        objects.push(SchemaObject {
            kind: row.get(0)?,
            name: row.get(1)?,
            table: row.get(2)?,
            sql: row.get(3)?,
        });
    }
    Ok(objects)
}

/// Drops every view, trigger and table, including migration history.
pub(super) fn erase(conn: &mut Connection, restore_foreign_keys: bool) -> DbResult<()> {
    // foreign_keys cannot change inside a transaction.
    conn.execute_batch("PRAGMA foreign_keys = OFF;")?;

    let tx = conn.transaction()?;
    let objects = {
        let mut stmt = tx.prepare(
            "SELECT type, name
             FROM sqlite_master
             WHERE type IN ('view', 'trigger', 'table')
               AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'
             ORDER BY CASE type WHEN 'view' THEN 0 WHEN 'trigger' THEN 1 ELSE 2 END, name;",
        )?;
        let mut rows = stmt.query([])?;
        let mut objects: Vec<(String, String)> = Vec::new();
        while let Some(row) = rows.next()? {
            objects.push((row.get(0)?, row.get(1)?));
        }
        objects
    };

    for (kind, name) in &objects {
        let keyword = match kind.as_str() {
            "view" => "VIEW",
            "trigger" => "TRIGGER",
            _ => "TABLE",
        };
        tx.execute_batch(&format!(
            "DROP {keyword} IF EXISTS {};",
            quote_identifier(name)
        ))?;
    }
    tx.commit()?;

    if restore_foreign_keys {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    }
    Ok(())
}

pub(super) fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
