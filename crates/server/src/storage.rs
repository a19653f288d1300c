use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

use remotesync_api::{EntryResponse, TeamResponse};
use remotesync_core::TeamSettings;

/// Shared database state
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

/// Column list used by every team SELECT; keep in sync with `team_from_row`.
pub const TEAM_COLUMNS: &str =
    "id, name, owner_id, settings, report_recipients, invite_token, created_at";

/// Column list used by every entry SELECT; keep in sync with `entry_from_row`.
pub const ENTRY_COLUMNS: &str = "id, team_id, user_id, text, summary, audio_url, created_at";

impl Db {
    pub fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Delete a team and everything that belongs to it.
    ///
    /// The schema's `ON DELETE CASCADE` would cover members, invites, and
    /// entries, but the rule is enforced here explicitly so it holds
    /// regardless of the connection's `foreign_keys` pragma. Runs in one
    /// transaction. Returns false when the team did not exist.
    pub fn delete_team(&self, team_id: &str) -> Result<bool> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM standup_entries WHERE team_id = ?1", [team_id])?;
        tx.execute("DELETE FROM invites WHERE team_id = ?1", [team_id])?;
        tx.execute("DELETE FROM team_members WHERE team_id = ?1", [team_id])?;
        let affected = tx.execute("DELETE FROM teams WHERE id = ?1", [team_id])?;
        tx.commit()?;
        Ok(affected > 0)
    }
}

/// Map a `TEAM_COLUMNS` row.
pub fn team_from_row(row: &rusqlite::Row) -> rusqlite::Result<TeamResponse> {
    let settings: String = row.get(3)?;
    let recipients: String = row.get(4)?;
    Ok(TeamResponse {
        id: row.get(0)?,
        name: row.get(1)?,
        owner_id: row.get(2)?,
        settings: TeamSettings::from_json(&settings),
        report_recipients: serde_json::from_str(&recipients).unwrap_or_default(),
        invite_token: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Map an `ENTRY_COLUMNS` row.
pub fn entry_from_row(row: &rusqlite::Row) -> rusqlite::Result<EntryResponse> {
    Ok(EntryResponse {
        id: row.get(0)?,
        team_id: row.get(1)?,
        user_id: row.get(2)?,
        text: row.get(3)?,
        summary: row.get(4)?,
        audio_url: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Initialize the database: open connection, enable WAL, run migrations
pub fn init_db(data_dir: &Path) -> Result<Db> {
    std::fs::create_dir_all(data_dir)?;
    let db_path = data_dir.join("remotesync.db");
    let conn = Connection::open(&db_path).context("opening SQLite database")?;

    // Enable WAL mode for better concurrent read performance
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;

    run_migrations(&conn)?;

    Ok(Db {
        conn: Arc::new(Mutex::new(conn)),
    })
}

fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let migrations = vec![("0001_init", include_str!("../../../migrations/0001_init.sql"))];

    for (name, sql) in migrations {
        let already_applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .unwrap_or(false);

        if !already_applied {
            conn.execute_batch(sql)
                .with_context(|| format!("running migration {name}"))?;
            conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])?;
            tracing::info!("Applied migration: {name}");
        }
    }

    Ok(())
}
