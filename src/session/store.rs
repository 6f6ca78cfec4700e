use super::status::FlowStatus;
use super::writer::{FileStatusWriter, STATUS_FILE};
use crate::error::{ErrorCode, FlowError, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;
use uuid::Uuid;

/// Session directories under one root, one per top-level run
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fresh session id, sortable by creation time
    pub fn new_session_id() -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}-{}", Utc::now().format("%Y%m%d-%H%M%S"), &suffix[..8])
    }

    pub fn session_dir(&self, session_id: &str) -> PathBuf {
        self.root.join(session_id)
    }

    /// Writer for a new session
    pub fn create_writer(&self, session_id: &str) -> FileStatusWriter {
        FileStatusWriter::new(self.session_dir(session_id), session_id)
    }

    pub async fn load(&self, session_id: &str) -> Result<FlowStatus> {
        let path = self.session_dir(session_id).join(STATUS_FILE);
        let content = fs::read_to_string(&path).await.map_err(|e| {
            FlowError::session_with_code(
                ErrorCode::SESSION_NOT_FOUND,
                format!("no status at {}", path.display()),
                Some(session_id.to_string()),
            )
            .with_source(e)
        })?;
        serde_json::from_str(&content).map_err(|e| {
            FlowError::session_with_code(
                ErrorCode::SESSION_CORRUPTED,
                "cannot parse session status",
                Some(session_id.to_string()),
            )
            .with_source(e)
        })
    }

    /// Every readable session, newest first
    pub async fn list(&self) -> Result<Vec<FlowStatus>> {
        let mut sessions = Vec::new();
        if !self.root.exists() {
            return Ok(sessions);
        }

        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().to_string();
            match self.load(&id).await {
                Ok(status) => sessions.push(status),
                Err(e) => warn!("Skipping session {}: {}", id, e),
            }
        }
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(sessions)
    }

    pub async fn latest(&self) -> Result<Option<FlowStatus>> {
        Ok(self.list().await?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{parse_flow_str, CmdRegistry};
    use crate::env::Env;
    use crate::session::writer::StatusWriter;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_list_newest_first() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path());
        let registry = CmdRegistry::with_builtins();
        let flow = parse_flow_str(&registry, "echo").unwrap();

        for id in ["first", "second"] {
            store
                .create_writer(id)
                .on_flow_start(&flow, &Env::new())
                .await
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        std::fs::create_dir_all(temp.path().join("garbage")).unwrap();

        let sessions = store.list().await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].session_id, "second");
        assert_eq!(store.latest().await.unwrap().unwrap().session_id, "second");
    }

    #[tokio::test]
    async fn test_load_errors() {
        let temp = TempDir::new().unwrap();
        let store = SessionStore::new(temp.path());
        let err = store.load("missing").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::SESSION_NOT_FOUND);

        std::fs::create_dir_all(temp.path().join("broken")).unwrap();
        std::fs::write(temp.path().join("broken").join(STATUS_FILE), "{").unwrap();
        let err = store.load("broken").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::SESSION_CORRUPTED);
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(SessionStore::new_session_id(), SessionStore::new_session_id());
    }
}
