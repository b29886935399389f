//! Purpose: Durable note table behind the HTTP API.
//! Exports: `NoteStore`, `SqliteStore`.
//! Role: Persistence boundary; the server only talks to `NoteStore`.
//! Invariants: Every write is committed before the call returns.
//! Invariants: Update/delete of an absent id is `ErrorKind::NotFound`, never a silent no-op.
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};

use crate::core::error::{Error, ErrorKind};
use crate::core::note::{Note, NoteDraft, NoteId};

type StoreResult<T> = Result<T, Error>;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    content TEXT NOT NULL
);
"#;

pub trait NoteStore: Send + Sync {
    fn list(&self) -> StoreResult<Vec<Note>>;
    fn create(&self, draft: &NoteDraft) -> StoreResult<Note>;
    fn update_by_id(&self, id: NoteId, draft: &NoteDraft) -> StoreResult<Note>;
    fn delete_by_id(&self, id: NoteId) -> StoreResult<()>;
}

#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to create database directory")
                    .with_source(err)
            })?;
        }
        let conn = Connection::open(path).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to open database")
                .with_source(err)
        })?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to open in-memory database")
                .with_source(err)
        })?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|err| sql_error("failed to apply schema", err))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::new(ErrorKind::Internal).with_message("database mutex poisoned"))
    }
}

impl NoteStore for SqliteStore {
    fn list(&self) -> StoreResult<Vec<Note>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, title, content FROM notes ORDER BY id ASC")
            .map_err(|err| sql_error("failed to prepare note query", err))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Note {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    content: row.get(2)?,
                })
            })
            .map_err(|err| sql_error("failed to query notes", err))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|err| sql_error("failed to read note row", err))
    }

    fn create(&self, draft: &NoteDraft) -> StoreResult<Note> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO notes (title, content) VALUES (?1, ?2)",
            params![draft.title, draft.content],
        )
        .map_err(|err| sql_error("failed to insert note", err))?;
        Ok(Note {
            id: conn.last_insert_rowid(),
            title: draft.title.clone(),
            content: draft.content.clone(),
        })
    }

    fn update_by_id(&self, id: NoteId, draft: &NoteDraft) -> StoreResult<Note> {
        let conn = self.lock()?;
        let note = conn
            .query_row(
                "UPDATE notes SET title = ?1, content = ?2 WHERE id = ?3
                 RETURNING id, title, content",
                params![draft.title, draft.content, id],
                |row| {
                    Ok(Note {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        content: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(|err| sql_error("failed to update note", err))?;
        note.ok_or_else(|| not_found(id))
    }

    fn delete_by_id(&self, id: NoteId) -> StoreResult<()> {
        let conn = self.lock()?;
        let deleted = conn
            .execute("DELETE FROM notes WHERE id = ?1", params![id])
            .map_err(|err| sql_error("failed to delete note", err))?;
        if deleted == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }
}

fn sql_error(message: &str, err: rusqlite::Error) -> Error {
    Error::new(ErrorKind::Internal)
        .with_message(message)
        .with_source(err)
}

fn not_found(id: NoteId) -> Error {
    Error::new(ErrorKind::NotFound).with_message(format!("note {id} not found"))
}
