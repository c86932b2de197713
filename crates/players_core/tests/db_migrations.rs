use players_core::db::migrations::{player_migrator, Migrator, PLAYER_V1};
use players_core::{
    AppDatabase, Configuration, DatabaseQueue, DatabaseReader, DatabaseWriter, DbError, DbResult,
};
use rusqlite::Connection;

#[test]
fn migrate_applies_player_schema_and_history() {
    let queue = DatabaseQueue::new().unwrap();
    let migrator = player_migrator();
    migrator.migrate(&queue).unwrap();

    queue
        .read(|conn| -> DbResult<()> {
            assert_table_exists(conn, "player");
            assert_table_exists(conn, "schema_migrations");
            assert_eq!(
                migrator.applied_migrations(conn)?,
                vec![PLAYER_V1.to_string()]
            );
            Ok(())
        })
        .unwrap();
}

#[test]
fn migrating_twice_applies_each_step_once() {
    let queue = DatabaseQueue::new().unwrap();
    let migrator = player_migrator();
    migrator.migrate(&queue).unwrap();
    migrator.migrate(&queue).unwrap();

    assert_eq!(history_rows(&queue), 1);
}

#[test]
fn opening_same_file_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("players.db");

    let first = AppDatabase::new(DatabaseQueue::open(Configuration::file(&path)).unwrap()).unwrap();
    drop(first);

    let queue = DatabaseQueue::open(Configuration::file(&path)).unwrap();
    let second = AppDatabase::new(queue).unwrap();
    let applied = second
        .reader()
        .read(|conn| player_migrator().applied_migrations(conn))
        .unwrap();
    assert_eq!(applied, vec![PLAYER_V1.to_string()]);
}

#[test]
fn steps_run_in_registration_order_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ordered.db");

    let v1_only = Migrator::new().register_sql_migration("create", "CREATE TABLE t (a INTEGER);");
    v1_only
        .migrate(&DatabaseQueue::open(Configuration::file(&path)).unwrap())
        .unwrap();

    let extended = Migrator::new()
        .register_sql_migration("create", "CREATE TABLE t (a INTEGER);")
        .register_sql_migration("add_b", "ALTER TABLE t ADD COLUMN b INTEGER;")
        .register_sql_migration("add_c", "ALTER TABLE t ADD COLUMN c INTEGER;");
    let queue = DatabaseQueue::open(Configuration::file(&path)).unwrap();
    extended.migrate(&queue).unwrap();

    let applied = queue.read(|conn| extended.applied_migrations(conn)).unwrap();
    assert_eq!(applied, vec!["create", "add_b", "add_c"]);
    assert!(queue
        .read(|conn| extended.has_completed_migrations(conn))
        .unwrap());
}

#[test]
fn failing_step_rolls_back_and_keeps_earlier_steps() {
    let queue = DatabaseQueue::new().unwrap();
    let migrator = Migrator::new()
        .register_sql_migration("good", "CREATE TABLE good (v INTEGER);")
        .register_sql_migration(
            "bad",
            "CREATE TABLE half_done (v INTEGER); INSERT INTO missing_table VALUES (1);",
        );

    let err = migrator.migrate(&queue).unwrap_err();
    match err {
        DbError::Migration { name, .. } => assert_eq!(name, "bad"),
        other => panic!("unexpected error: {other}"),
    }

    queue
        .read(|conn| -> DbResult<()> {
            assert_table_exists(conn, "good");
            assert_table_missing(conn, "half_done");
            assert_eq!(migrator.applied_migrations(conn)?, vec!["good"]);
            assert!(!migrator.has_completed_migrations(conn)?);
            Ok(())
        })
        .unwrap();
}

#[test]
fn closure_steps_can_migrate_data() {
    let queue = DatabaseQueue::new().unwrap();
    let migrator = player_migrator().register_migration("seed", |tx| {
        tx.execute(
            "INSERT INTO player (name, score) VALUES (?1, ?2);",
            rusqlite::params!["Zaphod", 42],
        )?;
        Ok(())
    });
    migrator.migrate(&queue).unwrap();
    migrator.migrate(&queue).unwrap();

    let count: i64 = queue
        .read(|conn| -> DbResult<i64> {
            Ok(conn.query_row("SELECT COUNT(*) FROM player;", [], |row| row.get(0))?)
        })
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn unknown_applied_migration_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let newer = player_migrator().register_sql_migration("v2", "CREATE TABLE extra (v INTEGER);");
    newer
        .migrate(&DatabaseQueue::open(Configuration::file(&path)).unwrap())
        .unwrap();

    let err = player_migrator()
        .migrate(&DatabaseQueue::open(Configuration::file(&path)).unwrap())
        .unwrap_err();
    match err {
        DbError::UnknownAppliedMigrations(names) => assert_eq!(names, vec!["v2"]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn erase_on_schema_change_rebuilds_drifted_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("drift.db");

    let original = Migrator::new().register_sql_migration("v1", "CREATE TABLE t (a INTEGER);");
    let queue = DatabaseQueue::open(Configuration::file(&path)).unwrap();
    original.migrate(&queue).unwrap();
    queue
        .write(|tx| -> DbResult<()> {
            tx.execute("INSERT INTO t (a) VALUES (1);", [])?;
            Ok(())
        })
        .unwrap();
    drop(queue);

    // Same step name, edited definition.
    let edited = Migrator::new()
        .register_sql_migration("v1", "CREATE TABLE t (a INTEGER, b TEXT);")
        .erase_database_on_schema_change(true);
    let queue = DatabaseQueue::open(Configuration::file(&path)).unwrap();
    edited.migrate(&queue).unwrap();

    let (columns, rows) = queue
        .read(|conn| -> DbResult<(i64, i64)> {
            let columns = conn.query_row(
                "SELECT COUNT(*) FROM pragma_table_info('t');",
                [],
                |row| row.get(0),
            )?;
            let rows = conn.query_row("SELECT COUNT(*) FROM t;", [], |row| row.get(0))?;
            Ok((columns, rows))
        })
        .unwrap();

    if cfg!(debug_assertions) {
        assert_eq!(columns, 2);
        assert_eq!(rows, 0);
    } else {
        assert_eq!(columns, 1);
        assert_eq!(rows, 1);
    }
}

#[test]
fn erase_on_schema_change_keeps_matching_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stable.db");
    let migrator = || {
        Migrator::new()
            .register_sql_migration("v1", "CREATE TABLE t (a INTEGER);")
            .erase_database_on_schema_change(true)
    };

    let queue = DatabaseQueue::open(Configuration::file(&path)).unwrap();
    migrator().migrate(&queue).unwrap();
    queue
        .write(|tx| -> DbResult<()> {
            tx.execute("INSERT INTO t (a) VALUES (1);", [])?;
            Ok(())
        })
        .unwrap();
    drop(queue);

    let queue = DatabaseQueue::open(Configuration::file(&path)).unwrap();
    migrator().migrate(&queue).unwrap();
    let rows: i64 = queue
        .read(|conn| -> DbResult<i64> {
            Ok(conn.query_row("SELECT COUNT(*) FROM t;", [], |row| row.get(0))?)
        })
        .unwrap();
    assert_eq!(rows, 1);
}

fn history_rows(queue: &DatabaseQueue) -> i64 {
    queue
        .read(|conn| -> DbResult<i64> {
            Ok(conn.query_row("SELECT COUNT(*) FROM schema_migrations;", [], |row| {
                row.get(0)
            })?)
        })
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    assert!(table_exists(conn, table_name), "table {table_name} does not exist");
}

fn assert_table_missing(conn: &Connection, table_name: &str) {
    assert!(!table_exists(conn, table_name), "table {table_name} exists");
}

fn table_exists(conn: &Connection, table_name: &str) -> bool {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    exists == 1
}
