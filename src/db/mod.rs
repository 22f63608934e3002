use std::{
    collections::HashMap,
    convert::TryFrom,
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, Utc};
use log::{error, info};
use rusqlite::{params, Connection};
use tokio::sync::oneshot;

mod migrations;

use migrations::run_migrations;

const DATE_FORMAT: &str = "%Y-%m-%d";

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
    i64::try_from(value)
        .map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

fn to_u64(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("value {value} is negative"))
}

fn date_to_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|err| anyhow!("invalid date '{value}': {err}"))
}

/// SQLite access behind a dedicated worker thread. All statements run on
/// that thread; callers submit closures over a command channel and await
/// the reply, so the async runtime never blocks on database I/O.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("lernzeit-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite database")));
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

    /// Add `seconds` to the total recorded for `date`. The row sums on
    /// conflict so concurrent flushes for one day never overwrite each
    /// other.
    pub async fn add_daily_usage(&self, date: NaiveDate, seconds: u64) -> Result<()> {
        let key = date_to_key(date);
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO daily_usage (date, seconds, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(date) DO UPDATE SET
                     seconds = seconds + excluded.seconds,
                     updated_at = excluded.updated_at",
                params![key, to_i64(seconds)?, Utc::now().to_rfc3339()],
            )
            .with_context(|| "failed to record daily usage")?;
            Ok(())
        })
        .await
    }

    pub async fn get_daily_totals(&self) -> Result<HashMap<NaiveDate, u64>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare("SELECT date, seconds FROM daily_usage")?;

            let mut rows = stmt.query([])?;
            let mut totals = HashMap::new();
            while let Some(row) = rows.next()? {
                let date = parse_date(&row.get::<_, String>(0)?)?;
                let seconds = to_u64(row.get::<_, i64>(1)?)?;
                totals.insert(date, seconds);
            }

            Ok(totals)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[tokio::test]
    async fn usage_rows_sum_on_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("usage.sqlite3")).unwrap();

        db.add_daily_usage(date("2026-03-14"), 10).await.unwrap();
        db.add_daily_usage(date("2026-03-14"), 25).await.unwrap();
        db.add_daily_usage(date("2026-03-15"), 7).await.unwrap();

        let totals = db.get_daily_totals().await.unwrap();
        assert_eq!(totals.get(&date("2026-03-14")), Some(&35));
        assert_eq!(totals.get(&date("2026-03-15")), Some(&7));
    }

    #[tokio::test]
    async fn totals_survive_reopen_and_remigration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.sqlite3");

        {
            let db = Database::new(path.clone()).unwrap();
            db.add_daily_usage(date("2026-03-14"), 90).await.unwrap();
        }

        let db = Database::new(path).unwrap();
        let totals = db.get_daily_totals().await.unwrap();
        assert_eq!(totals.get(&date("2026-03-14")), Some(&90));
    }

    #[tokio::test]
    async fn empty_database_reads_back_empty() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("usage.sqlite3")).unwrap();
        assert!(db.get_daily_totals().await.unwrap().is_empty());
    }
}
