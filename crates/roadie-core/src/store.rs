//! Durable conversation log: one SQLite database file per user identity.

use std::path::Path;

use roadie_types::{Interaction, InteractionStatus, InteractionSummary, Message, Role};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use uuid::Uuid;

use crate::error::{Result, RoadieError};

/// Append-only message log plus interaction metadata. The owning actor is
/// the only writer; every call is awaited to completion before the actor
/// picks up its next unit of work.
pub struct InteractionStore {
    pool: SqlitePool,
}

impl InteractionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens the database file at `path`, creating it if missing.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// Creates tables and the message index. Idempotent; called on every
    /// actor startup.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS interactions (
                interactionId TEXT PRIMARY KEY,
                createdAt INTEGER NOT NULL,
                updatedAt INTEGER NOT NULL,
                status TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS messages (
                messageId TEXT PRIMARY KEY,
                interactionId TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                FOREIGN KEY (interactionId) REFERENCES interactions(interactionId)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_messages_interaction ON messages (interactionId)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a fresh interaction with status `created` and returns its id.
    pub async fn create_interaction(&self) -> Result<String> {
        let interaction_id = Uuid::new_v4().to_string();
        let now = now_ms();
        sqlx::query(
            "INSERT INTO interactions (interactionId, createdAt, updatedAt, status)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&interaction_id)
        .bind(now)
        .bind(now)
        .bind(InteractionStatus::Created.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| RoadieError::database(format!("failed to create interaction: {e}")))?;

        tracing::debug!(interaction_id, "interaction created");
        Ok(interaction_id)
    }

    /// All interactions, newest first, without their messages.
    pub async fn list_interactions(&self) -> Result<Vec<InteractionSummary>> {
        let rows = sqlx::query(
            "SELECT interactionId, createdAt, updatedAt, status
             FROM interactions
             ORDER BY createdAt DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(parse_summary_row).collect()
    }

    /// One interaction with its full history. Message order is part of the
    /// contract and is enforced here, never left to storage order.
    pub async fn get_interaction(&self, interaction_id: &str) -> Result<Option<Interaction>> {
        let row = sqlx::query(
            "SELECT interactionId, createdAt, updatedAt, status
             FROM interactions
             WHERE interactionId = ?",
        )
        .bind(interaction_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let summary = parse_summary_row(&row)?;

        let message_rows = sqlx::query(
            "SELECT messageId, interactionId, role, content, timestamp
             FROM messages
             WHERE interactionId = ?
             ORDER BY timestamp ASC, rowid ASC",
        )
        .bind(interaction_id)
        .fetch_all(&self.pool)
        .await?;
        let messages = message_rows
            .iter()
            .map(parse_message_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(Interaction {
            interaction_id: summary.interaction_id,
            status: summary.status,
            created_at: summary.created_at,
            updated_at: summary.updated_at,
            messages,
        }))
    }

    /// Appends one message under a caller-supplied id. Fails if the
    /// interaction does not exist or the id is already taken.
    pub async fn append_message(
        &self,
        interaction_id: &str,
        role: Role,
        content: &str,
        message_id: &str,
    ) -> Result<Message> {
        let timestamp = now_ms();
        sqlx::query(
            "INSERT INTO messages (messageId, interactionId, role, content, timestamp)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(message_id)
        .bind(interaction_id)
        .bind(role.as_str())
        .bind(content)
        .bind(timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| RoadieError::database(format!("failed to append message: {e}")))?;

        Ok(Message {
            message_id: message_id.to_string(),
            interaction_id: interaction_id.to_string(),
            role,
            content: content.to_string(),
            timestamp,
        })
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn parse_summary_row(row: &SqliteRow) -> Result<InteractionSummary> {
    let status_raw: String = row.try_get("status")?;
    let status = InteractionStatus::parse(&status_raw).ok_or_else(|| {
        RoadieError::database(format!("unknown interaction status '{status_raw}'"))
    })?;
    Ok(InteractionSummary {
        interaction_id: row.try_get("interactionId")?,
        status,
        created_at: row.try_get("createdAt")?,
        updated_at: row.try_get("updatedAt")?,
    })
}

fn parse_message_row(row: &SqliteRow) -> Result<Message> {
    let role_raw: String = row.try_get("role")?;
    let role = Role::parse(&role_raw)
        .ok_or_else(|| RoadieError::database(format!("unknown message role '{role_raw}'")))?;
    Ok(Message {
        message_id: row.try_get("messageId")?,
        interaction_id: row.try_get("interactionId")?,
        role,
        content: row.try_get("content")?,
        timestamp: row.try_get("timestamp")?,
    })
}
