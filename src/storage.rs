//! Durable persistence for sessions and their timelines.
//!
//! Each agent session lives in its own directory under the storage root:
//!
//! ```text
//! <root>/<uuid>/
//!   session.json     # Session metadata
//!   timeline.jsonl   # Append-only timeline events, one JSON object per line
//! ```
//!
//! Rotation and retention belong to the caller's logging infrastructure;
//! this module only ever appends.

use std::{fs, io, path::PathBuf};

// Traits must be in scope for `.lines()` on BufReader and `.write_all()` on File.
use io::{BufRead, Write};

use uuid::Uuid;

use crate::model::{Session, TimelineEvent};

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("session already exists: {0}")]
    SessionAlreadyExists(Uuid),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, StorageError>;

/// Local file-based storage for sessions and timelines.
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Creates a new storage instance rooted at the given directory.
    ///
    /// The directory is created if it doesn't exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Returns the default storage root: `~/.unstuck/sessions/`.
    pub fn default_root() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".unstuck").join("sessions"))
    }

    // ── Sessions ──

    /// Creates a new session, writing its metadata to disk.
    pub fn create_session(&self, session: &Session) -> Result<()> {
        let dir = self.session_dir(session.id);
        if dir.exists() {
            return Err(StorageError::SessionAlreadyExists(session.id));
        }
        fs::create_dir_all(&dir)?;
        let json = serde_json::to_string_pretty(session)?;
        fs::write(dir.join("session.json"), json)?;
        Ok(())
    }

    /// Loads a single session's metadata.
    pub fn load_session(&self, id: Uuid) -> Result<Session> {
        let path = self.session_dir(id).join("session.json");
        if !path.exists() {
            return Err(StorageError::SessionNotFound(id));
        }
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Lists all sessions by reading each session directory's metadata.
    pub fn list_sessions(&self) -> Result<Vec<Session>> {
        let mut sessions = Vec::new();
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(sessions),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let entry = entry?;
            let path = entry.path().join("session.json");
            if path.is_file() {
                let json = fs::read_to_string(&path)?;
                sessions.push(serde_json::from_str(&json)?);
            }
        }
        sessions.sort_by(|a: &Session, b: &Session| a.started_at.cmp(&b.started_at));
        Ok(sessions)
    }

    // ── Timeline ──

    /// Opens an append handle to a session's timeline file.
    pub fn open_log(&self, session_id: Uuid) -> Result<EventLog> {
        let dir = self.session_dir(session_id);
        if !dir.exists() {
            return Err(StorageError::SessionNotFound(session_id));
        }
        Ok(EventLog {
            path: dir.join("timeline.jsonl"),
        })
    }

    /// Appends a timeline event to a session's durable log.
    pub fn append_event(&self, session_id: Uuid, event: &TimelineEvent) -> Result<()> {
        self.open_log(session_id)?.append(event)
    }

    /// Loads all timeline events for a session.
    pub fn load_events(&self, session_id: Uuid) -> Result<Vec<TimelineEvent>> {
        let dir = self.session_dir(session_id);
        if !dir.exists() {
            return Err(StorageError::SessionNotFound(session_id));
        }
        let path = dir.join("timeline.jsonl");
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(path)?;
        let reader = io::BufReader::new(file);
        let mut events = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if !line.is_empty() {
                events.push(serde_json::from_str(&line)?);
            }
        }
        Ok(events)
    }

    fn session_dir(&self, id: Uuid) -> PathBuf {
        self.root.join(id.to_string())
    }
}

/// An append handle bound to one session's timeline file.
///
/// Handed to the engine so every recorded event also lands on disk.
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    /// Appends one event as a single JSONL line.
    pub fn append(&mut self, event: &TimelineEvent) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut line = serde_json::to_string(event)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}
