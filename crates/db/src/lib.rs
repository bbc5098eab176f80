use std::{fmt, str::FromStr};

use gha_stats_core::{
    config::DbConfig,
    models::{JobRecord, RunRecord, StepRecord, WorkflowRecord},
};
use sqlx::{
    Executor, Pool, QueryBuilder, Sqlite,
    query_builder::Separated,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use thiserror::Error;

/// Store of observed Actions history. Rows are written once and never updated or deleted.
pub struct Database {
    pub pool: Pool<Sqlite>,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Table {
    Workflows,
    Runs,
    Jobs,
    Steps,
}

impl Table {
    pub const ALL: [Self; 4] = [Self::Workflows, Self::Runs, Self::Jobs, Self::Steps];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Workflows => "workflows",
            Self::Runs => "runs",
            Self::Jobs => "jobs",
            Self::Steps => "steps",
        }
    }

    fn schema(&self) -> &'static str {
        match self {
            Self::Workflows => {
                r#"
                CREATE TABLE IF NOT EXISTS workflows (
                    id INTEGER PRIMARY KEY,
                    name TEXT,
                    path TEXT,
                    state TEXT,
                    created_at TEXT,
                    updated_at TEXT
                )
                "#
            }
            Self::Runs => {
                r#"
                CREATE TABLE IF NOT EXISTS runs (
                    id INTEGER PRIMARY KEY,
                    name TEXT,
                    head_branch TEXT,
                    head_sha TEXT,
                    display_title TEXT,
                    run_number INTEGER,
                    event TEXT,
                    status TEXT,
                    conclusion TEXT,
                    workflow_id INTEGER,
                    created_at TEXT,
                    updated_at TEXT,
                    run_attempt INTEGER,
                    run_started_at TEXT
                )
                "#
            }
            Self::Jobs => {
                r#"
                CREATE TABLE IF NOT EXISTS jobs (
                    id INTEGER PRIMARY KEY,
                    run_id INTEGER,
                    run_attempt INTEGER,
                    status TEXT,
                    conclusion TEXT,
                    created_at TEXT,
                    started_at TEXT,
                    completed_at TEXT,
                    name TEXT
                )
                "#
            }
            Self::Steps => {
                r#"
                CREATE TABLE IF NOT EXISTS steps (
                    id TEXT PRIMARY KEY,
                    job_id INTEGER,
                    name TEXT,
                    status TEXT,
                    conclusion TEXT,
                    number INTEGER,
                    started_at TEXT,
                    completed_at TEXT
                )
                "#
            }
        }
    }

    fn columns(&self) -> &'static str {
        match self {
            Self::Workflows => "id, name, path, state, created_at, updated_at",
            Self::Runs => {
                "id, name, head_branch, head_sha, display_title, run_number, event, status, \
                 conclusion, workflow_id, created_at, updated_at, run_attempt, run_started_at"
            }
            Self::Jobs => {
                "id, run_id, run_attempt, status, conclusion, created_at, started_at, completed_at, name"
            }
            Self::Steps => "id, job_id, name, status, conclusion, number, started_at, completed_at",
        }
    }

    fn column_count(&self) -> usize {
        match self {
            Self::Workflows => 6,
            Self::Runs => 14,
            Self::Jobs => 9,
            Self::Steps => 8,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Failed to open database {url}")]
    Open {
        url: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("Failed to create table {table}")]
    Schema {
        table: Table,
        #[source]
        source: sqlx::Error,
    },
    #[error("Failed to insert into {table}")]
    Insert {
        table: Table,
        #[source]
        source: sqlx::Error,
    },
    #[error("Failed to query {table}")]
    Query {
        table: Table,
        #[source]
        source: sqlx::Error,
    },
}

// Maximum number of bind parameters in a single query (SQLite limit)
const BIND_LIMIT: usize = 32766;

/// Converts an API id for an SQLite INTEGER column.
#[inline]
fn db_id(id: u64) -> i64 { id as i64 }

impl Database {
    pub async fn new(config: &DbConfig) -> Result<Self, DbError> {
        tracing::info!(url = %config.url, "Opening database");
        let open_err = |source| DbError::Open { url: config.url.clone(), source };
        let options =
            SqliteConnectOptions::from_str(&config.url).map_err(open_err)?.create_if_missing(true);
        // One connection, kept for the whole run. This also keeps `sqlite::memory:` alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(open_err)?;
        let db = Self { pool };
        db.create_schema().await?;
        Ok(db)
    }

    pub async fn close(&self) { self.pool.close().await }

    async fn create_schema(&self) -> Result<(), DbError> {
        for table in Table::ALL {
            self.pool
                .execute(table.schema())
                .await
                .map_err(|source| DbError::Schema { table, source })?;
        }
        Ok(())
    }

    /// Inserts workflows not already present. Returns the number of new rows.
    pub async fn insert_workflows(&self, workflows: &[WorkflowRecord]) -> Result<u64, DbError> {
        self.insert_if_absent(Table::Workflows, workflows, |b, w| {
            b.push_bind(db_id(w.id))
                .push_bind(&w.name)
                .push_bind(&w.path)
                .push_bind(&w.state)
                .push_bind(&w.created_at)
                .push_bind(&w.updated_at);
        })
        .await
    }

    /// Inserts runs not already present. Returns the number of new rows.
    pub async fn insert_runs(&self, runs: &[RunRecord]) -> Result<u64, DbError> {
        self.insert_if_absent(Table::Runs, runs, |b, r| {
            b.push_bind(db_id(r.id))
                .push_bind(&r.name)
                .push_bind(&r.head_branch)
                .push_bind(&r.head_sha)
                .push_bind(&r.display_title)
                .push_bind(r.run_number)
                .push_bind(&r.event)
                .push_bind(&r.status)
                .push_bind(&r.conclusion)
                .push_bind(db_id(r.workflow_id))
                .push_bind(&r.created_at)
                .push_bind(&r.updated_at)
                .push_bind(r.run_attempt)
                .push_bind(&r.run_started_at);
        })
        .await
    }

    /// Inserts jobs not already present. Returns the number of new rows.
    pub async fn insert_jobs(&self, jobs: &[JobRecord]) -> Result<u64, DbError> {
        self.insert_if_absent(Table::Jobs, jobs, |b, j| {
            b.push_bind(db_id(j.id))
                .push_bind(db_id(j.run_id))
                .push_bind(j.run_attempt)
                .push_bind(&j.status)
                .push_bind(&j.conclusion)
                .push_bind(&j.created_at)
                .push_bind(&j.started_at)
                .push_bind(&j.completed_at)
                .push_bind(&j.name);
        })
        .await
    }

    /// Inserts steps whose `{job_id}-{number}` key is not already present. Returns the number
    /// of new rows.
    pub async fn insert_steps(&self, steps: &[StepRecord]) -> Result<u64, DbError> {
        self.insert_if_absent(Table::Steps, steps, |b, s| {
            b.push_bind(s.id.to_string())
                .push_bind(db_id(s.job_id))
                .push_bind(&s.name)
                .push_bind(&s.status)
                .push_bind(&s.conclusion)
                .push_bind(s.number)
                .push_bind(&s.started_at)
                .push_bind(&s.completed_at);
        })
        .await
    }

    async fn insert_if_absent<'r, T>(
        &self,
        table: Table,
        records: &'r [T],
        mut push_row: impl FnMut(&mut Separated<'_, 'r, Sqlite, &'static str>, &'r T),
    ) -> Result<u64, DbError> {
        let mut inserted = 0;
        for chunk in records.chunks(BIND_LIMIT / table.column_count()) {
            let mut builder = QueryBuilder::<Sqlite>::new(format!(
                "INSERT INTO {} ({}) ",
                table.as_str(),
                table.columns()
            ));
            builder.push_values(chunk, |mut b, record| push_row(&mut b, record));
            builder.push(" ON CONFLICT (id) DO NOTHING");
            let result = self
                .pool
                .execute(builder.build())
                .await
                .map_err(|source| DbError::Insert { table, source })?;
            inserted += result.rows_affected();
        }
        tracing::debug!(%table, total = records.len(), inserted, "Inserted rows");
        Ok(inserted)
    }

    pub async fn count_rows(&self, table: Table) -> Result<u64, DbError> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table.as_str()))
            .fetch_one(&self.pool)
            .await
            .map_err(|source| DbError::Query { table, source })?;
        Ok(count as u64)
    }
}
