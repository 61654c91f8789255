//! SQLite-backed room snapshots and user preferences.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use chibibot_domain::OperatorState;

use crate::infrastructure::ports::{
    ClockPort, PreferencesStore, RepoError, RoomSnapshot, SnapshotStore,
};

/// Both persistence ports over one pool.
pub struct SqliteStateStore {
    pool: SqlitePool,
    clock: Arc<dyn ClockPort>,
}

impl SqliteStateStore {
    /// Open (creating if needed) the database at `url`.
    ///
    /// Accepts either a bare path or a `sqlite:` URL.
    pub async fn new(url: &str, clock: Arc<dyn ClockPort>) -> Result<Self, RepoError> {
        let path = url.strip_prefix("sqlite:").unwrap_or(url);
        let pool = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", path))
            .await
            .map_err(|e| RepoError::database("connect", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS room_snapshots (
                channel_name TEXT PRIMARY KEY,
                snapshot_json TEXT NOT NULL,
                saved_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| RepoError::database("migrate", e))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_preferences (
                username TEXT PRIMARY KEY,
                state_json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| RepoError::database("migrate", e))?;

        Ok(Self { pool, clock })
    }
}

#[async_trait]
impl SnapshotStore for SqliteStateStore {
    async fn save_room(&self, snapshot: &RoomSnapshot) -> Result<(), RepoError> {
        let json = serde_json::to_string(snapshot).map_err(RepoError::serialization)?;

        sqlx::query(
            r#"
            INSERT INTO room_snapshots (channel_name, snapshot_json, saved_at)
            VALUES (?, ?, ?)
            ON CONFLICT(channel_name) DO UPDATE SET
                snapshot_json = excluded.snapshot_json,
                saved_at = excluded.saved_at
            "#,
        )
        .bind(&snapshot.channel_name)
        .bind(json)
        .bind(snapshot.saved_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("save_room", e))?;

        Ok(())
    }

    async fn take_room(&self, channel: &str) -> Result<Option<RoomSnapshot>, RepoError> {
        let row = sqlx::query("DELETE FROM room_snapshots WHERE channel_name = ? RETURNING snapshot_json")
            .bind(channel)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("take_room", e))?;

        match row {
            Some(row) => {
                let json: String = row.get("snapshot_json");
                let snapshot = serde_json::from_str(&json).map_err(RepoError::serialization)?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl PreferencesStore for SqliteStateStore {
    async fn get(&self, username: &str) -> Result<Option<OperatorState>, RepoError> {
        let row = sqlx::query("SELECT state_json FROM user_preferences WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("get_preferences", e))?;

        match row {
            Some(row) => {
                let json: String = row.get("state_json");
                let state = serde_json::from_str(&json).map_err(RepoError::serialization)?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, username: &str, state: &OperatorState) -> Result<(), RepoError> {
        let json = serde_json::to_string(state).map_err(RepoError::serialization)?;
        let now = self.clock.now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO user_preferences (username, state_json, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(username) DO UPDATE SET
                state_json = excluded.state_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(username)
        .bind(json)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("save_preferences", e))?;

        Ok(())
    }

    async fn clear(&self, username: &str) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM user_preferences WHERE username = ?")
            .bind(username)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::database("clear_preferences", e))?;
        Ok(())
    }
}
