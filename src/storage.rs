use crate::api::models::{Message, User, UserId};
use crate::error::Result;
use directories::ProjectDirs;
use rusqlite::{Connection, params};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

fn db_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("com", "example", "DuoChat")?;
    Some(proj.data_dir().join("cache.sqlite"))
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

// Last-known roster and transcript per signed-in user, used when the backend is unreachable at startup
pub struct Cache {
    conn: Connection,
}

impl Cache {
    pub fn open_default() -> Result<Self> {
        let path = db_path().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "no data dir")
        })?;
        Self::open(&path)
    }

    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        // reports the resulting mode ("memory" for in-memory databases)
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                owner_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                raw_json TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (owner_id, position)
            );
            CREATE TABLE IF NOT EXISTS messages (
                owner_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                id TEXT NOT NULL,
                raw_json TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (owner_id, position)
            );
            "#,
        )?;
        Ok(Self { conn })
    }

    pub fn store_roster(&mut self, owner: &UserId, users: &[User]) -> Result<()> {
        let now = now_secs();
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM users WHERE owner_id = ?1", params![owner.as_str()])?;
        for (idx, u) in users.iter().enumerate() {
            let raw = serde_json::to_string(u).unwrap_or_default();
            tx.execute(
                "INSERT INTO users (owner_id, position, raw_json, updated_at) VALUES (?1, ?2, ?3, ?4)",
                params![owner.as_str(), idx as i64, raw, now],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn roster(&self, owner: &UserId) -> Result<Vec<User>> {
        self.load_rows("SELECT raw_json FROM users WHERE owner_id = ?1 ORDER BY position", owner)
    }

    pub fn store_transcript(&mut self, owner: &UserId, messages: &[Message]) -> Result<()> {
        let now = now_secs();
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM messages WHERE owner_id = ?1", params![owner.as_str()])?;
        for (idx, m) in messages.iter().enumerate() {
            let raw = serde_json::to_string(m).unwrap_or_default();
            tx.execute(
                r#"
                INSERT INTO messages (owner_id, position, id, raw_json, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![owner.as_str(), idx as i64, m.id.as_str(), raw, now],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn transcript(&self, owner: &UserId) -> Result<Vec<Message>> {
        self.load_rows("SELECT raw_json FROM messages WHERE owner_id = ?1 ORDER BY position", owner)
    }

    fn load_rows<T: serde::de::DeserializeOwned>(&self, sql: &str, owner: &UserId) -> Result<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params![owner.as_str()], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for r in rows {
            let raw = r?;
            // rows written by an older build may not decode; skip them
            match serde_json::from_str(&raw) {
                Ok(item) => out.push(item),
                Err(e) => log::warn!("dropping unreadable cache row: {e}"),
            }
        }
        Ok(out)
    }
}
