use std::fs;
use std::path::{Component, Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::Value;

use crate::domain::Row;
use crate::error::AppError;

/// Read-only access to a set of structured-data containers and their relations.
pub trait StructuredSource: Send + Sync {
    fn list_containers(&self) -> Result<Vec<String>, AppError>;
    fn list_relations(&self, container: &str) -> Result<Vec<String>, AppError>;
    fn read_rows(&self, container: &str, relation: &str, limit: usize) -> Result<Vec<Row>, AppError>;
}

/// Every `*.db` file in one directory is a container; every table is a relation.
///
/// Connections are opened read-only per call and dropped before returning, so no
/// handle outlives a single read.
#[derive(Debug, Clone)]
pub struct SqliteDirectory {
    dir: PathBuf,
}

impl SqliteDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        self.dir.as_path()
    }

    fn container_path(&self, container: &str) -> Result<PathBuf, AppError> {
        let mut components = Path::new(container).components();
        let single = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !single {
            return Err(AppError::new(
                "DB_CONTAINER_INVALID",
                "Container name must be a plain file name",
            )
            .with_details(format!("container={container}")));
        }
        let path = self.dir.join(container);
        if !path.is_file() {
            return Err(AppError::new("DB_CONTAINER_NOT_FOUND", "Container file not found")
                .with_details(format!("path={}", path.display())));
        }
        Ok(path)
    }

    fn open_read_only(&self, container: &str) -> Result<Connection, AppError> {
        let path = self.container_path(container)?;
        Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            AppError::new("DB_OPEN_FAILED", "Failed to open SQLite container read-only")
                .with_details(format!("path={}; err={}", path.display(), e))
        })
    }
}

impl StructuredSource for SqliteDirectory {
    fn list_containers(&self) -> Result<Vec<String>, AppError> {
        if !self.dir.is_dir() {
            tracing::warn!(dir = %self.dir.display(), "sqlite directory missing; no containers");
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            AppError::new("DB_DIR_READ_FAILED", "Failed to list SQLite directory")
                .with_details(format!("path={}; err={}", self.dir.display(), e))
        })?;

        let mut names = Vec::new();
        for ent in entries.flatten() {
            let path = ent.path();
            if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("db") {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn list_relations(&self, container: &str) -> Result<Vec<String>, AppError> {
        let conn = self.open_read_only(container)?;
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .map_err(|e| {
                AppError::new("DB_RELATIONS_QUERY_FAILED", "Failed to enumerate tables")
                    .with_details(format!("container={container}; err={e}"))
            })?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| {
                AppError::new("DB_RELATIONS_QUERY_FAILED", "Failed to enumerate tables")
                    .with_details(format!("container={container}; err={e}"))
            })?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r.map_err(|e| {
                AppError::new("DB_RELATIONS_QUERY_FAILED", "Failed to read table name")
                    .with_details(format!("container={container}; err={e}"))
            })?);
        }
        Ok(out)
    }

    fn read_rows(&self, container: &str, relation: &str, limit: usize) -> Result<Vec<Row>, AppError> {
        let conn = self.open_read_only(container)?;
        let sql = format!("SELECT * FROM {} LIMIT ?1", quote_identifier(relation));
        let mut stmt = conn.prepare(&sql).map_err(|e| {
            AppError::new("DB_READ_FAILED", "Failed to prepare relation read")
                .with_details(format!("container={container}; relation={relation}; err={e}"))
        })?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut rows = stmt.query([limit]).map_err(|e| {
            AppError::new("DB_READ_FAILED", "Failed to read relation rows")
                .with_details(format!("container={container}; relation={relation}; err={e}"))
        })?;

        let mut out = Vec::new();
        loop {
            let next = rows.next().map_err(|e| {
                AppError::new("DB_READ_FAILED", "Failed to step relation rows")
                    .with_details(format!("container={container}; relation={relation}; err={e}"))
            })?;
            let Some(row) = next else { break };

            let mut obj = Row::new();
            for (idx, name) in columns.iter().enumerate() {
                let value = row.get_ref(idx).map_err(|e| {
                    AppError::new("DB_READ_FAILED", "Failed to read column value")
                        .with_details(format!("relation={relation}; column={name}; err={e}"))
                })?;
                obj.insert(name.clone(), json_value(value));
            }
            out.push(obj);
        }
        Ok(out)
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(hex::encode(bytes)),
    }
}
