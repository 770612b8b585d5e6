use crate::error::PipelineResult;
use crate::models::metric_record::MetricRecord;
use crate::models::project::Project;
use crate::models::source_file::SourceFile;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const DB_SCHEMA_VERSION: i64 = 2;

// Stays well below SQLite's bound-parameter limit.
const FILE_ID_CHUNK: usize = 500;

/// Persistence boundary of the pipeline.
///
/// Files and metric records are append-only; projects are only ever
/// soft-deleted.
pub trait MetricsStore: Send + Sync {
    fn insert_file(&self, file: &SourceFile) -> PipelineResult<()>;
    fn get_files(&self, owner: &str, project: &str) -> PipelineResult<Vec<SourceFile>>;
    fn get_metrics(&self, file_ids: &[String]) -> PipelineResult<Vec<MetricRecord>>;
    fn write_metrics(&self, record: &MetricRecord) -> PipelineResult<()>;
    fn check_duplicate_project(&self, owner: &str, github_username: &str, github_repo: &str) -> PipelineResult<bool>;
    fn insert_project(&self, project: &Project) -> PipelineResult<()>;
    /// Returns false when no active project matched.
    fn mark_project_inactive(&self, owner: &str, github_username: &str, github_repo: &str) -> PipelineResult<bool>;
}

pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;",
    )?;

    let mut version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version < 1 {
        apply_migration_1(conn)?;
        version = 1;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version < 2 {
        apply_migration_2(conn)?;
        version = 2;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version > DB_SCHEMA_VERSION {
        log::warn!("state.db schema version {version} is newer than {DB_SCHEMA_VERSION}; continuing");
    }

    Ok(())
}

fn apply_migration_1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS projects (
            project_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            owner TEXT NOT NULL,
            github_username TEXT NOT NULL,
            created_at TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS files (
            file_id TEXT PRIMARY KEY,
            path TEXT NOT NULL,
            project TEXT NOT NULL,
            owner TEXT NOT NULL,
            session_id TEXT NOT NULL,
            loc INTEGER NOT NULL DEFAULT 0,
            file_size INTEGER NOT NULL DEFAULT 0,
            extension TEXT NOT NULL DEFAULT '',
            timestamp TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS metrics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_id TEXT NOT NULL,
            metric_name TEXT NOT NULL,
            quantity INTEGER NOT NULL,
            reasoning_text TEXT NOT NULL DEFAULT '',
            timestamp TEXT NOT NULL
        );
        ",
    )
}

fn apply_migration_2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_files_owner_project ON files(owner, project);
        CREATE INDEX IF NOT EXISTS idx_metrics_file_id ON metrics(file_id);
        CREATE INDEX IF NOT EXISTS idx_projects_lookup ON projects(owner, github_username, name);
        ",
    )
}

pub fn get_db_connection(workspace_path: &str) -> Result<Connection> {
    let db_path = Path::new(workspace_path).join(".maintainability").join("state.db");
    let conn = Connection::open(db_path)?;
    initialize_schema(&conn)?;
    Ok(conn)
}

/// SQLite-backed store. One connection, serialized behind a mutex.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens `<workspace>/.maintainability/state.db`, creating the directory.
    pub fn open(workspace_path: &str) -> PipelineResult<Self> {
        std::fs::create_dir_all(Path::new(workspace_path).join(".maintainability"))?;
        Ok(Self::from_connection(get_db_connection(workspace_path)?))
    }

    pub fn open_in_memory() -> PipelineResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        SqliteStore {
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // Statements either complete or fail as a unit, so a poisoned lock
        // still guards a consistent connection.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn list_projects(&self, owner: &str) -> PipelineResult<Vec<Project>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT project_id, name, owner, github_username, created_at, is_active FROM projects WHERE owner = ?1 ORDER BY created_at ASC",
        )?;
        let projects = stmt
            .query_map(params![owner], project_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(projects)
    }

    pub fn get_project(&self, owner: &str, github_username: &str, github_repo: &str) -> PipelineResult<Option<Project>> {
        let conn = self.conn();
        let project = conn
            .query_row(
                "SELECT project_id, name, owner, github_username, created_at, is_active FROM projects WHERE owner = ?1 AND github_username = ?2 AND name = ?3 ORDER BY is_active DESC, created_at DESC LIMIT 1",
                params![owner, github_username, github_repo],
                project_from_row,
            )
            .optional()?;
        Ok(project)
    }
}

impl MetricsStore for SqliteStore {
    fn insert_file(&self, file: &SourceFile) -> PipelineResult<()> {
        self.conn().execute(
            "INSERT INTO files (file_id, path, project, owner, session_id, loc, file_size, extension, timestamp) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                file.file_id,
                file.path,
                file.project,
                file.owner,
                file.session_id,
                file.loc as i64,
                file.file_size as i64,
                file.extension,
                file.timestamp,
            ],
        )?;
        Ok(())
    }

    fn get_files(&self, owner: &str, project: &str) -> PipelineResult<Vec<SourceFile>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT file_id, path, project, owner, session_id, loc, file_size, extension, timestamp FROM files WHERE owner = ?1 AND project = ?2 ORDER BY rowid ASC",
        )?;
        let files = stmt
            .query_map(params![owner, project], file_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(files)
    }

    fn get_metrics(&self, file_ids: &[String]) -> PipelineResult<Vec<MetricRecord>> {
        let conn = self.conn();
        let mut records = Vec::new();

        for chunk in file_ids.chunks(FILE_ID_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT file_id, metric_name, quantity, reasoning_text, timestamp FROM metrics WHERE file_id IN ({placeholders}) ORDER BY id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(chunk.iter()), metric_from_row)?
                .collect::<Result<Vec<_>>>()?;
            records.extend(rows);
        }

        Ok(records)
    }

    fn write_metrics(&self, record: &MetricRecord) -> PipelineResult<()> {
        self.conn().execute(
            "INSERT INTO metrics (file_id, metric_name, quantity, reasoning_text, timestamp) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.file_id,
                record.metric_name,
                record.quantity,
                record.reasoning_text,
                record.timestamp,
            ],
        )?;
        Ok(())
    }

    fn check_duplicate_project(&self, owner: &str, github_username: &str, github_repo: &str) -> PipelineResult<bool> {
        let exists: bool = self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM projects WHERE owner = ?1 AND github_username = ?2 AND name = ?3 AND is_active = 1)",
            params![owner, github_username, github_repo],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn insert_project(&self, project: &Project) -> PipelineResult<()> {
        self.conn().execute(
            "INSERT INTO projects (project_id, name, owner, github_username, created_at, is_active) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                project.project_id,
                project.name,
                project.owner,
                project.github_username,
                project.created_at,
                project.is_active as i32,
            ],
        )?;
        Ok(())
    }

    fn mark_project_inactive(&self, owner: &str, github_username: &str, github_repo: &str) -> PipelineResult<bool> {
        let updated = self.conn().execute(
            "UPDATE projects SET is_active = 0 WHERE owner = ?1 AND github_username = ?2 AND name = ?3 AND is_active = 1",
            params![owner, github_username, github_repo],
        )?;
        Ok(updated > 0)
    }
}

fn file_from_row(row: &Row<'_>) -> Result<SourceFile> {
    Ok(SourceFile {
        file_id: row.get(0)?,
        path: row.get(1)?,
        project: row.get(2)?,
        owner: row.get(3)?,
        session_id: row.get(4)?,
        loc: row.get::<_, i64>(5)? as usize,
        file_size: row.get::<_, i64>(6)? as usize,
        extension: row.get(7)?,
        timestamp: row.get(8)?,
    })
}

fn metric_from_row(row: &Row<'_>) -> Result<MetricRecord> {
    Ok(MetricRecord {
        file_id: row.get(0)?,
        metric_name: row.get(1)?,
        quantity: row.get(2)?,
        reasoning_text: row.get(3)?,
        timestamp: row.get(4)?,
    })
}

fn project_from_row(row: &Row<'_>) -> Result<Project> {
    Ok(Project {
        project_id: row.get(0)?,
        name: row.get(1)?,
        owner: row.get(2)?,
        github_username: row.get(3)?,
        created_at: row.get(4)?,
        is_active: row.get::<_, i32>(5)? != 0,
    })
}
