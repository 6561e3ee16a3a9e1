//! LibSQL feedback store
//!
//! Persists feedback records and per-agent conversation turns in libSQL
//! (local file, in-memory, or a remote Turso database). One connection is
//! opened when the store is created and reused until the store is dropped.

use crate::config::StoreCredentials;
use crate::error::{Result, TutorError};
use crate::storage::{FeedbackQuery, FeedbackStore, MessageWindow};
use crate::types::{AgentType, FeedbackContext, FeedbackId, FeedbackRecord, MessageRecord, Role};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use libsql::params::Params;
use libsql::{params, Builder, Connection, Database, Value};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Embedded migrations, applied in order
const MIGRATIONS: &[(&str, &str)] = &[(
    "001_feedback_schema.sql",
    include_str!("../../migrations/libsql/001_feedback_schema.sql"),
)];

/// SQLite caps bound parameters per statement; stay well below it
const MAX_IDS_PER_UPDATE: usize = 500;

const FEEDBACK_COLUMNS: &str = "id, agent_type, session_id, message_id, rating, rating_value, \
     context, processed, created_at, processed_at";

/// Split a migration file into statements, skipping comment-only lines
fn parse_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("--") {
            continue;
        }

        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);

        if trimmed.ends_with(';') {
            statements.push(std::mem::take(&mut current));
        }
    }

    if !current.trim().is_empty() {
        statements.push(current);
    }

    statements
}

/// Database connection mode
#[derive(Debug, Clone)]
pub enum ConnectionMode {
    /// Local file-based database
    Local(String),
    /// In-memory database (for testing)
    InMemory,
    /// Remote database (Turso Cloud)
    Remote { url: String, token: String },
}

impl ConnectionMode {
    /// Pick a mode from resolved credentials
    ///
    /// - ":memory:" -> InMemory
    /// - "libsql://..." / "https://..." -> Remote (token required)
    /// - anything else -> local file path
    pub fn from_credentials(creds: &StoreCredentials) -> Result<Self> {
        let url = creds.url.as_str();
        if url == ":memory:" {
            return Ok(ConnectionMode::InMemory);
        }

        if url.starts_with("libsql://") || url.starts_with("https://") {
            let token = creds.token.clone().ok_or_else(|| {
                TutorError::Config(format!("Auth token required for remote store {}", url))
            })?;
            return Ok(ConnectionMode::Remote {
                url: url.to_string(),
                token,
            });
        }

        Ok(ConnectionMode::Local(url.to_string()))
    }
}

/// LibSQL-backed [`FeedbackStore`]
pub struct LibsqlFeedbackStore {
    // Kept alive for the lifetime of `conn`
    _db: Database,
    conn: Connection,
}

impl LibsqlFeedbackStore {
    /// Open the database and apply migrations
    pub async fn new(mode: ConnectionMode) -> Result<Self> {
        info!("Opening feedback store: {}", describe(&mode));

        let db = match &mode {
            ConnectionMode::Local(path) => {
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                Builder::new_local(path).build().await
            }
            ConnectionMode::InMemory => Builder::new_local(":memory:").build().await,
            ConnectionMode::Remote { url, token } => {
                Builder::new_remote(url.clone(), token.clone()).build().await
            }
        }
        .map_err(|e| TutorError::Database(format!("Failed to open database: {}", e)))?;

        let conn = db
            .connect()
            .map_err(|e| TutorError::Database(format!("Failed to get connection: {}", e)))?;

        let store = Self { _db: db, conn };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Open the store described by configuration credentials
    pub async fn from_credentials(creds: &StoreCredentials) -> Result<Self> {
        Self::new(ConnectionMode::from_credentials(creds)?).await
    }

    /// Apply embedded migrations not yet recorded in `_migrations_applied`
    pub async fn run_migrations(&self) -> Result<()> {
        debug!("Running feedback store migrations...");

        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS _migrations_applied (
                    migration_name TEXT PRIMARY KEY,
                    applied_at INTEGER NOT NULL
                )",
                params![],
            )
            .await
            .map_err(|e| {
                TutorError::Migration(format!("Failed to create migrations table: {}", e))
            })?;

        for (name, sql) in MIGRATIONS {
            let mut rows = self
                .conn
                .query(
                    "SELECT COUNT(*) FROM _migrations_applied WHERE migration_name = ?",
                    params![*name],
                )
                .await?;

            let already_applied = match rows.next().await? {
                Some(row) => row.get::<i64>(0).unwrap_or(0),
                None => 0,
            };
            if already_applied > 0 {
                debug!("Skipping already applied migration: {}", name);
                continue;
            }

            let statements = parse_sql_statements(sql);
            for (i, statement) in statements.iter().enumerate() {
                self.conn
                    .execute(statement.as_str(), params![])
                    .await
                    .map_err(|e| {
                        TutorError::Migration(format!(
                            "Failed to execute statement #{} in {}: {}",
                            i + 1,
                            name,
                            e
                        ))
                    })?;
            }

            self.conn
                .execute(
                    "INSERT INTO _migrations_applied (migration_name, applied_at) VALUES (?, ?)",
                    params![*name, Utc::now().timestamp()],
                )
                .await
                .map_err(|e| TutorError::Migration(format!("Failed to record migration: {}", e)))?;

            info!("Applied migration: {}", name);
        }

        Ok(())
    }

    /// Check the connection answers a trivial query
    pub async fn check_health(&self) -> Result<()> {
        self.conn
            .query("SELECT 1", params![])
            .await
            .map_err(|e| TutorError::Database(format!("Health check failed: {}", e)))?;
        Ok(())
    }

    fn row_to_feedback(row: &libsql::Row) -> Result<FeedbackRecord> {
        let id: String = row.get(0)?;
        let id = FeedbackId::from_string(&id)
            .map_err(|e| TutorError::Database(format!("Invalid feedback id {}: {}", id, e)))?;

        let agent_type: String = row.get(1)?;
        let rating: String = row.get(4)?;
        let rating_value: Option<i64> = row.get(5)?;
        let context: String = row.get(6)?;
        let processed: i64 = row.get(7)?;
        let created_at: i64 = row.get(8)?;
        let processed_at: Option<i64> = row.get(9)?;

        let context: FeedbackContext = serde_json::from_str(&context).unwrap_or_else(|e| {
            warn!("Unreadable context on feedback {}: {}", id, e);
            FeedbackContext::default()
        });

        Ok(FeedbackRecord {
            id,
            agent_type: agent_type.parse()?,
            session_id: row.get(2)?,
            message_id: row.get(3)?,
            rating: rating.parse()?,
            rating_value: rating_value.map(|v| v.clamp(1, 5) as u8),
            context,
            processed: processed != 0,
            created_at: from_millis(created_at)?,
            processed_at: processed_at.map(from_millis).transpose()?,
        })
    }
}

#[async_trait]
impl FeedbackStore for LibsqlFeedbackStore {
    async fn load_feedback(&self, query: &FeedbackQuery) -> Result<Vec<FeedbackRecord>> {
        let cutoff = Utc::now() - Duration::days(query.since_days);

        let mut sql = format!(
            "SELECT {} FROM ai_feedback WHERE agent_type = ? AND created_at >= ?",
            FEEDBACK_COLUMNS
        );
        let mut values = vec![
            Value::Text(query.agent_type.as_str().to_string()),
            Value::Integer(cutoff.timestamp_millis()),
        ];

        if let Some(rating) = query.rating {
            sql.push_str(" AND rating = ?");
            values.push(Value::Text(rating.as_str().to_string()));
        }
        if let Some(processed) = query.processed {
            sql.push_str(" AND processed = ?");
            values.push(Value::Integer(processed as i64));
        }

        sql.push_str(" ORDER BY created_at DESC, id ASC LIMIT ?");
        values.push(Value::Integer(query.limit as i64));

        let mut rows = self
            .conn
            .query(&sql, Params::Positional(values))
            .await
            .map_err(|e| TutorError::Database(format!("Failed to load feedback: {}", e)))?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(Self::row_to_feedback(&row)?);
        }

        debug!(
            "Loaded {} {} feedback records (rating={:?}, processed={:?}, {} days)",
            records.len(),
            query.agent_type,
            query.rating.map(|r| r.as_str()),
            query.processed,
            query.since_days
        );
        Ok(records)
    }

    async fn session_messages(
        &self,
        agent_type: AgentType,
        session_id: &str,
        window: MessageWindow,
    ) -> Result<Vec<MessageRecord>> {
        let (order, limit) = match window {
            MessageWindow::Earliest(n) => ("ASC", n),
            MessageWindow::Latest(n) => ("DESC", n),
        };

        let sql = format!(
            "SELECT id, session_id, role, content, timestamp FROM {} \
             WHERE session_id = ? ORDER BY timestamp {} LIMIT ?",
            agent_type.message_table(),
            order
        );

        let mut rows = self
            .conn
            .query(&sql, params![session_id, limit as i64])
            .await
            .map_err(|e| TutorError::Database(format!("Failed to load messages: {}", e)))?;

        let mut messages = Vec::new();
        while let Some(row) = rows.next().await? {
            let role: String = row.get(2)?;
            let role = match role.parse::<Role>() {
                Ok(role) => role,
                Err(_) => {
                    warn!("Skipping message with unknown role '{}'", role);
                    continue;
                }
            };
            let timestamp: i64 = row.get(4)?;

            messages.push(MessageRecord {
                id: row.get(0)?,
                session_id: row.get(1)?,
                role,
                content: row.get(3)?,
                timestamp: from_millis(timestamp)?,
            });
        }

        if matches!(window, MessageWindow::Latest(_)) {
            messages.reverse();
        }

        Ok(messages)
    }

    async fn mark_processed(&self, ids: &[FeedbackId]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let unique: Vec<String> = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let now = Utc::now().timestamp_millis();
        let mut updated = 0usize;

        for chunk in unique.chunks(MAX_IDS_PER_UPDATE) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "UPDATE ai_feedback SET processed = 1, processed_at = COALESCE(processed_at, ?) \
                 WHERE id IN ({})",
                placeholders
            );

            let mut values = Vec::with_capacity(chunk.len() + 1);
            values.push(Value::Integer(now));
            values.extend(chunk.iter().cloned().map(Value::Text));

            let changed = self
                .conn
                .execute(&sql, Params::Positional(values))
                .await
                .map_err(|e| {
                    TutorError::Database(format!("Failed to mark feedback processed: {}", e))
                })?;
            updated += changed as usize;
        }

        info!("Marked {} feedback records as processed", updated);
        Ok(updated)
    }

    async fn record_feedback(&self, record: &FeedbackRecord) -> Result<()> {
        let context = serde_json::to_string(&record.context)?;

        self.conn
            .execute(
                "INSERT INTO ai_feedback (id, agent_type, session_id, message_id, rating, \
                 rating_value, context, processed, created_at, processed_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    record.id.to_string(),
                    record.agent_type.as_str(),
                    record.session_id.clone(),
                    record.message_id.clone(),
                    record.rating.as_str(),
                    record.rating_value.map(i64::from),
                    context,
                    record.processed as i64,
                    record.created_at.timestamp_millis(),
                    record.processed_at.map(|t| t.timestamp_millis()),
                ],
            )
            .await
            .map_err(|e| TutorError::Database(format!("Failed to record feedback: {}", e)))?;

        debug!("Recorded {} feedback {}", record.rating, record.id);
        Ok(())
    }

    async fn append_message(&self, agent_type: AgentType, message: &MessageRecord) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (id, session_id, role, content, timestamp) VALUES (?, ?, ?, ?, ?)",
            agent_type.message_table()
        );

        self.conn
            .execute(
                &sql,
                params![
                    message.id.clone(),
                    message.session_id.clone(),
                    message.role.as_str(),
                    message.content.clone(),
                    message.timestamp.timestamp_millis(),
                ],
            )
            .await
            .map_err(|e| TutorError::Database(format!("Failed to append message: {}", e)))?;

        Ok(())
    }

    async fn count_unprocessed(&self, agent_type: AgentType) -> Result<usize> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM ai_feedback WHERE agent_type = ? AND processed = 0",
                params![agent_type.as_str()],
            )
            .await?;

        let count = match rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        };
        Ok(count as usize)
    }
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| TutorError::Database(format!("Invalid timestamp: {}", ms)))
}

fn describe(mode: &ConnectionMode) -> String {
    match mode {
        ConnectionMode::Local(path) => format!("local:{}", path),
        ConnectionMode::InMemory => "in-memory".to_string(),
        ConnectionMode::Remote { url, .. } => format!("remote:{}", url),
    }
}
