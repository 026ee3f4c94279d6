use std::{
    convert::TryFrom,
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::oneshot;

mod migrations;

use migrations::run_migrations;

use crate::models::{Account, UploadedVideo, VerificationRecord, WatchSession};

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

fn to_u64(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("value {value} is negative"))
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| anyhow!("invalid datetime '{value}': {err}"))
}

fn upsert_account_row(conn: &Connection, account: &Account) -> Result<()> {
    conn.execute(
        "INSERT INTO accounts (id, coin_balance, free_upload_used, initialized, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
             coin_balance = excluded.coin_balance,
             free_upload_used = excluded.free_upload_used,
             initialized = excluded.initialized,
             updated_at = excluded.updated_at",
        params![
            account.id,
            to_i64(account.coin_balance)?,
            account.free_upload_used as i64,
            account.initialized as i64,
            account.created_at.to_rfc3339(),
            account.updated_at.to_rfc3339(),
        ],
    )
    .with_context(|| "failed to upsert account")?;
    Ok(())
}

fn insert_verification_row(
    conn: &Connection,
    account_id: &str,
    record: &VerificationRecord,
) -> Result<()> {
    conn.execute(
        "INSERT INTO verifications
             (id, account_id, video_id, file_fingerprint, liked, subscribed, coins_awarded, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            record.id,
            account_id,
            record.video_id,
            record.file_fingerprint,
            record.liked as i64,
            record.subscribed as i64,
            to_i64(record.coins_awarded)?,
            record.created_at.to_rfc3339(),
        ],
    )
    .with_context(|| "failed to insert verification record")?;
    Ok(())
}

fn insert_video_row(conn: &Connection, video: &UploadedVideo) -> Result<()> {
    conn.execute(
        "INSERT INTO videos (id, owner_id, title, source_url, thumbnail_url, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            video.id,
            video.owner_id,
            video.title,
            video.source_url,
            video.thumbnail_url,
            video.created_at.to_rfc3339(),
        ],
    )
    .with_context(|| "failed to insert uploaded video")?;
    Ok(())
}

fn mark_claimed_row(conn: &Connection, session_id: &str) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE watch_sessions SET claimed = 1 WHERE id = ?1",
            params![session_id],
        )
        .with_context(|| "failed to mark session claimed")?;
    if updated == 0 {
        return Err(anyhow!("no watch session with id {session_id}"));
    }
    Ok(())
}

/// SQLite-backed ledger store. All access funnels through a dedicated
/// worker thread owning the single connection; callers submit closures
/// and await the reply.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("boosthub-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(
                            Err(anyhow::Error::new(err).context("failed to open SQLite database")),
                        );
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }
                if let Err(err) = conn.pragma_update(None, "foreign_keys", "ON") {
                    error!("Failed to enable foreign keys: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run database migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .with_context(|| "failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Database initialized at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    /// Private per-handle database, used by tests.
    pub fn in_memory() -> Result<Self> {
        Self::new(PathBuf::from(":memory:"))
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    pub async fn read_account(&self, account_id: &str) -> Result<Option<Account>> {
        let account_id = account_id.to_string();
        self.execute(move |conn| {
            conn.query_row(
                "SELECT id, coin_balance, free_upload_used, initialized, created_at, updated_at
                 FROM accounts WHERE id = ?1",
                params![account_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()
            .with_context(|| "failed to read account")?
            .map(|(id, balance, free_used, initialized, created_at, updated_at)| {
                Ok(Account {
                    id,
                    coin_balance: to_u64(balance)?,
                    free_upload_used: free_used != 0,
                    initialized: initialized != 0,
                    created_at: parse_datetime(&created_at)?,
                    updated_at: parse_datetime(&updated_at)?,
                })
            })
            .transpose()
        })
        .await
    }

    pub async fn upsert_account(&self, account: &Account) -> Result<()> {
        let record = account.clone();
        self.execute(move |conn| upsert_account_row(conn, &record)).await
    }

    pub async fn insert_watch_session(
        &self,
        account_id: &str,
        session: &WatchSession,
    ) -> Result<()> {
        let account_id = account_id.to_string();
        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO watch_sessions
                     (id, account_id, video_id, started_at, ended_at, watch_duration_ms, eligible, claimed)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)",
                params![
                    record.id,
                    account_id,
                    record.video_id,
                    record.started_at.to_rfc3339(),
                    record.ended_at.as_ref().map(|dt| dt.to_rfc3339()),
                    to_i64(record.watch_duration_ms)?,
                    record.eligible as i64,
                ],
            )
            .with_context(|| "failed to insert watch session")?;
            Ok(())
        })
        .await
    }

    /// Sessions for one account in insertion order.
    pub async fn list_watch_sessions(&self, account_id: &str) -> Result<Vec<WatchSession>> {
        let account_id = account_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, video_id, started_at, ended_at, watch_duration_ms, eligible
                 FROM watch_sessions
                 WHERE account_id = ?1
                 ORDER BY rowid ASC",
            )?;

            let mut rows = stmt.query(params![account_id])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(WatchSession {
                    id: row.get(0)?,
                    video_id: row.get(1)?,
                    started_at: parse_datetime(&row.get::<_, String>(2)?)?,
                    ended_at: row
                        .get::<_, Option<String>>(3)?
                        .map(|s| parse_datetime(&s))
                        .transpose()?,
                    watch_duration_ms: to_u64(row.get::<_, i64>(4)?)?,
                    eligible: row.get::<_, i64>(5)? != 0,
                });
            }

            Ok(sessions)
        })
        .await
    }

    pub async fn mark_session_claimed(&self, session_id: &str) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| mark_claimed_row(conn, &session_id)).await
    }

    /// Whether this account already claimed watch coins for this video,
    /// on any of its sessions. Backs the once-per-video earning rule;
    /// other accounts' claims are their own business.
    pub async fn video_claimed(&self, account_id: &str, video_id: &str) -> Result<bool> {
        let account_id = account_id.to_string();
        let video_id = video_id.to_string();
        self.execute(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM watch_sessions
                 WHERE account_id = ?1 AND video_id = ?2 AND claimed = 1",
                params![account_id, video_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
    }

    /// Credits a watch claim: the updated account and the session's
    /// claimed flag land in one transaction, so a failure leaves neither
    /// behind.
    pub async fn record_claim(&self, account: &Account, session_id: &str) -> Result<()> {
        let account = account.clone();
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .with_context(|| "failed to record watch claim")?;
            upsert_account_row(&tx, &account)?;
            mark_claimed_row(&tx, &session_id)?;
            tx.commit().with_context(|| "failed to record watch claim")
        })
        .await
    }

    pub async fn insert_verification(
        &self,
        account_id: &str,
        record: &VerificationRecord,
    ) -> Result<()> {
        let account_id = account_id.to_string();
        let record = record.clone();
        self.execute(move |conn| insert_verification_row(conn, &account_id, &record))
            .await
    }

    /// Stores a verification record and the credited account together.
    /// Rolls both back on failure so a rejected write never strands a
    /// fingerprint that would block the retry as a duplicate.
    pub async fn record_verification(
        &self,
        account: &Account,
        record: &VerificationRecord,
    ) -> Result<()> {
        let account = account.clone();
        let record = record.clone();
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .with_context(|| "failed to record verification")?;
            insert_verification_row(&tx, &account.id, &record)?;
            upsert_account_row(&tx, &account)?;
            tx.commit().with_context(|| "failed to record verification")
        })
        .await
    }

    pub async fn verification_exists(&self, video_id: &str, fingerprint: &str) -> Result<bool> {
        let video_id = video_id.to_string();
        let fingerprint = fingerprint.to_string();
        self.execute(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM verifications
                 WHERE video_id = ?1 AND file_fingerprint = ?2",
                params![video_id, fingerprint],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
    }

    pub async fn insert_video(&self, video: &UploadedVideo) -> Result<()> {
        let record = video.clone();
        self.execute(move |conn| insert_video_row(conn, &record)).await
    }

    /// Stores an uploaded video and the charged account together, so a
    /// failed charge never leaves an unpaid video in the promotion queue.
    pub async fn record_upload(&self, account: &Account, video: &UploadedVideo) -> Result<()> {
        let account = account.clone();
        let video = video.clone();
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .with_context(|| "failed to record upload")?;
            insert_video_row(&tx, &video)?;
            upsert_account_row(&tx, &account)?;
            tx.commit().with_context(|| "failed to record upload")
        })
        .await
    }

    pub async fn list_videos(&self, owner_id: Option<&str>) -> Result<Vec<UploadedVideo>> {
        let owner_id = owner_id.map(|s| s.to_string());
        self.execute(move |conn| {
            let mut videos = Vec::new();
            let mut push_row = |row: &rusqlite::Row<'_>| -> Result<()> {
                videos.push(UploadedVideo {
                    id: row.get(0)?,
                    owner_id: row.get(1)?,
                    title: row.get(2)?,
                    source_url: row.get(3)?,
                    thumbnail_url: row.get(4)?,
                    created_at: parse_datetime(&row.get::<_, String>(5)?)?,
                });
                Ok(())
            };

            match owner_id {
                Some(owner) => {
                    let mut stmt = conn.prepare(
                        "SELECT id, owner_id, title, source_url, thumbnail_url, created_at
                         FROM videos WHERE owner_id = ?1 ORDER BY rowid ASC",
                    )?;
                    let mut rows = stmt.query(params![owner])?;
                    while let Some(row) = rows.next()? {
                        push_row(row)?;
                    }
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, owner_id, title, source_url, thumbnail_url, created_at
                         FROM videos ORDER BY rowid ASC",
                    )?;
                    let mut rows = stmt.query([])?;
                    while let Some(row) = rows.next()? {
                        push_row(row)?;
                    }
                }
            }

            Ok(videos)
        })
        .await
    }
}
