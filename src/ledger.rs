use std::{future::Future, str::FromStr, time::Duration};

use chrono::{SecondsFormat, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Row, SqlitePool,
};
use uuid::Uuid;

use crate::{
    error::LedgerError,
    types::{
        ConversationTurn, Speaker, SupportTicket, TicketPriority, TicketStatus, UploadedFileRecord,
    },
};

pub const DEFAULT_CONVERSATION_LIMIT: u32 = 100;

fn now_iso() -> String {
    // fixed width so text ordering matches time ordering
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Append-only record of chat turns, tickets and uploads.
///
/// Every operation is best-effort. `Disabled` turns writes into no-ops and
/// reads into empty lists; `Active` logs and swallows storage failures the
/// same way, so callers never see an error.
#[derive(Debug, Clone)]
pub enum SessionLedger {
    Active(SqlLedger),
    Disabled,
}

#[derive(Debug, Clone)]
pub struct SqlLedger {
    pool: SqlitePool,
    timeout: Duration,
}

impl SessionLedger {
    /// Opens (creating if needed) the SQLite database and applies migrations.
    pub async fn connect(database_url: &str, timeout: Duration) -> Result<Self, LedgerError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let in_memory = database_url.contains(":memory:");
        // each in-memory connection would be its own database
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options.connect_with(options).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self::Active(SqlLedger { pool, timeout }))
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Self::Active(_) => "active",
            Self::Disabled => "disabled",
        }
    }

    pub async fn close(&self) {
        if let Self::Active(sql) = self {
            sql.pool.close().await;
        }
    }

    pub async fn record_turn(
        &self,
        session_id: &str,
        message: &str,
        response: &str,
        speaker: Speaker,
    ) {
        let Self::Active(sql) = self else {
            return;
        };
        if let Err(err) = sql
            .guard(sql.insert_turn(session_id, message, response, speaker))
            .await
        {
            tracing::warn!(session_id, error = %err, "failed to record conversation turn");
        }
    }

    /// Returns the new ticket id, or `None` when the ticket could not be stored.
    pub async fn open_ticket(&self, session_id: &str, priority: TicketPriority) -> Option<String> {
        let Self::Active(sql) = self else {
            return None;
        };
        match sql.guard(sql.insert_ticket(session_id, priority)).await {
            Ok(ticket_id) => {
                tracing::info!(session_id, ticket_id = %ticket_id, %priority, "support ticket opened");
                Some(ticket_id)
            }
            Err(err) => {
                tracing::warn!(session_id, error = %err, "failed to open support ticket");
                None
            }
        }
    }

    pub async fn record_upload(
        &self,
        session_id: &str,
        stored_filename: &str,
        original_filename: &str,
    ) -> Option<String> {
        let Self::Active(sql) = self else {
            return None;
        };
        match sql
            .guard(sql.insert_upload(session_id, stored_filename, original_filename))
            .await
        {
            Ok(id) => Some(id),
            Err(err) => {
                tracing::warn!(session_id, error = %err, "failed to record uploaded file");
                None
            }
        }
    }

    /// Most recent first.
    pub async fn list_conversations(&self, limit: u32) -> Vec<ConversationTurn> {
        let Self::Active(sql) = self else {
            return Vec::new();
        };
        sql.guard(sql.select_turns(limit))
            .await
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "failed to list conversations");
                Vec::new()
            })
    }

    /// Most recent first.
    pub async fn list_tickets(&self) -> Vec<SupportTicket> {
        let Self::Active(sql) = self else {
            return Vec::new();
        };
        sql.guard(sql.select_tickets(None))
            .await
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "failed to list tickets");
                Vec::new()
            })
    }

    pub async fn list_tickets_for_session(&self, session_id: &str) -> Vec<SupportTicket> {
        let Self::Active(sql) = self else {
            return Vec::new();
        };
        sql.guard(sql.select_tickets(Some(session_id)))
            .await
            .unwrap_or_else(|err| {
                tracing::warn!(session_id, error = %err, "failed to list session tickets");
                Vec::new()
            })
    }

    /// Most recent first.
    pub async fn list_uploads(&self) -> Vec<UploadedFileRecord> {
        let Self::Active(sql) = self else {
            return Vec::new();
        };
        sql.guard(sql.select_uploads())
            .await
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "failed to list uploads");
                Vec::new()
            })
    }
}

impl SqlLedger {
    async fn guard<T, F>(&self, call: F) -> Result<T, LedgerError>
    where
        F: Future<Output = Result<T, LedgerError>>,
    {
        // a statement already handed to the sqlite worker may still commit
        // after the deadline; the caller reports it as not stored
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| LedgerError::Timeout(self.timeout))?
    }

    async fn insert_turn(
        &self,
        session_id: &str,
        message: &str,
        response: &str,
        speaker: Speaker,
    ) -> Result<(), LedgerError> {
        sqlx::query(
            "INSERT INTO conversation_turns (id, session_id, message, response, speaker, timestamp) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(session_id)
        .bind(message)
        .bind(response)
        .bind(speaker.as_str())
        .bind(now_iso())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_ticket(
        &self,
        session_id: &str,
        priority: TicketPriority,
    ) -> Result<String, LedgerError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO support_tickets (id, session_id, status, priority, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(session_id)
        .bind(TicketStatus::Open.as_str())
        .bind(priority.as_str())
        .bind(now_iso())
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn insert_upload(
        &self,
        session_id: &str,
        stored_filename: &str,
        original_filename: &str,
    ) -> Result<String, LedgerError> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO uploaded_files (id, session_id, stored_filename, original_filename, upload_time) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(session_id)
        .bind(stored_filename)
        .bind(original_filename)
        .bind(now_iso())
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn select_turns(&self, limit: u32) -> Result<Vec<ConversationTurn>, LedgerError> {
        let rows = sqlx::query(
            "SELECT id, session_id, message, response, speaker, timestamp \
             FROM conversation_turns ORDER BY timestamp DESC, rowid DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(turn_from_row).collect()
    }

    async fn select_tickets(
        &self,
        session_id: Option<&str>,
    ) -> Result<Vec<SupportTicket>, LedgerError> {
        let rows = match session_id {
            Some(session_id) => {
                sqlx::query(
                    "SELECT id, session_id, status, priority, created_at, assigned_agent \
                     FROM support_tickets WHERE session_id = ? \
                     ORDER BY created_at DESC, rowid DESC",
                )
                .bind(session_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, session_id, status, priority, created_at, assigned_agent \
                     FROM support_tickets ORDER BY created_at DESC, rowid DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.iter().map(ticket_from_row).collect()
    }

    async fn select_uploads(&self) -> Result<Vec<UploadedFileRecord>, LedgerError> {
        let rows = sqlx::query(
            "SELECT id, session_id, stored_filename, original_filename, upload_time \
             FROM uploaded_files ORDER BY upload_time DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(upload_from_row).collect()
    }
}

fn turn_from_row(row: &SqliteRow) -> Result<ConversationTurn, LedgerError> {
    Ok(ConversationTurn {
        id: row.try_get("id")?,
        session_id: row.try_get("session_id")?,
        message: row.try_get("message")?,
        response: row.try_get("response")?,
        timestamp: row.try_get("timestamp")?,
        speaker: row
            .try_get::<String, _>("speaker")?
            .parse()
            .unwrap_or_default(),
    })
}

fn ticket_from_row(row: &SqliteRow) -> Result<SupportTicket, LedgerError> {
    Ok(SupportTicket {
        id: row.try_get("id")?,
        session_id: row.try_get("session_id")?,
        status: row
            .try_get::<String, _>("status")?
            .parse()
            .unwrap_or_default(),
        priority: row
            .try_get::<String, _>("priority")?
            .parse()
            .unwrap_or_default(),
        created_at: row.try_get("created_at")?,
        assigned_agent: row.try_get("assigned_agent")?,
    })
}

fn upload_from_row(row: &SqliteRow) -> Result<UploadedFileRecord, LedgerError> {
    Ok(UploadedFileRecord {
        id: row.try_get("id")?,
        session_id: row.try_get("session_id")?,
        stored_filename: row.try_get("stored_filename")?,
        original_filename: row.try_get("original_filename")?,
        upload_time: row.try_get("upload_time")?,
    })
}
