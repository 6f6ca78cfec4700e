//! Status writers
//!
//! The executor reports progress of its top-level flow to a
//! [`StatusWriter`]; [`FileStatusWriter`] keeps `status.json` current so a
//! crashed or aborted run can be retried.

use super::status::{CmdState, FlowOutcome, FlowStatus};
use crate::command::{ParsedCmd, ParsedFlow};
use crate::env::Env;
use crate::error::{ErrorCode, FlowError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

pub const STATUS_FILE: &str = "status.json";

#[async_trait]
pub trait StatusWriter: Send + Sync {
    async fn on_flow_start(&self, flow: &ParsedFlow, env: &Env) -> Result<()>;

    async fn on_cmd_start(&self, index: usize, cmd: &ParsedCmd) -> Result<()>;

    async fn on_cmd_finish(
        &self,
        index: usize,
        state: CmdState,
        error: Option<&FlowError>,
    ) -> Result<()>;

    async fn on_flow_finish(&self, env: &Env, outcome: &FlowOutcome) -> Result<()>;

    /// Writer for a background task about to be spawned
    async fn on_async_task_schedule(
        &self,
        flow: &ParsedFlow,
        index: usize,
        env: &Env,
        thread_id: &str,
    ) -> Result<Arc<dyn StatusWriter>>;
}

/// Writer that records nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStatusWriter;

#[async_trait]
impl StatusWriter for NoopStatusWriter {
    async fn on_flow_start(&self, _flow: &ParsedFlow, _env: &Env) -> Result<()> {
        Ok(())
    }

    async fn on_cmd_start(&self, _index: usize, _cmd: &ParsedCmd) -> Result<()> {
        Ok(())
    }

    async fn on_cmd_finish(
        &self,
        _index: usize,
        _state: CmdState,
        _error: Option<&FlowError>,
    ) -> Result<()> {
        Ok(())
    }

    async fn on_flow_finish(&self, _env: &Env, _outcome: &FlowOutcome) -> Result<()> {
        Ok(())
    }

    async fn on_async_task_schedule(
        &self,
        _flow: &ParsedFlow,
        _index: usize,
        _env: &Env,
        _thread_id: &str,
    ) -> Result<Arc<dyn StatusWriter>> {
        Ok(Arc::new(NoopStatusWriter))
    }
}

/// Writes `<dir>/status.json`; background tasks write to `<dir>/<thread-id>/`
pub struct FileStatusWriter {
    dir: PathBuf,
    session_id: String,
    commands_file: Option<PathBuf>,
    retry_of: Option<String>,
    status: Mutex<Option<FlowStatus>>,
}

impl FileStatusWriter {
    pub fn new(dir: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            session_id: session_id.into(),
            commands_file: None,
            retry_of: None,
            status: Mutex::new(None),
        }
    }

    pub fn with_commands_file(mut self, path: Option<PathBuf>) -> Self {
        self.commands_file = path;
        self
    }

    pub fn with_retry_of(mut self, session_id: Option<String>) -> Self {
        self.retry_of = session_id;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn write(&self, status: &FlowStatus) -> Result<()> {
        fs::create_dir_all(&self.dir).await.map_err(|e| {
            FlowError::storage_with_code(
                ErrorCode::STORAGE_IO_ERROR,
                "cannot create session directory",
                Some(self.dir.clone()),
            )
            .with_source(e)
        })?;
        let path = self.dir.join(STATUS_FILE);
        let json = serde_json::to_string_pretty(status)?;
        fs::write(&path, json).await.map_err(|e| {
            FlowError::storage_with_code(
                ErrorCode::STORAGE_IO_ERROR,
                "cannot write session status",
                Some(path.clone()),
            )
            .with_source(e)
        })?;
        debug!("Wrote session status to {}", path.display());
        Ok(())
    }

    /// Apply `update` to the current status and write it out
    async fn update<F>(&self, update: F) -> Result<()>
    where
        F: FnOnce(&mut FlowStatus) + Send,
    {
        let mut guard = self.status.lock().await;
        match guard.as_mut() {
            Some(status) => {
                update(status);
                self.write(status).await
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StatusWriter for FileStatusWriter {
    async fn on_flow_start(&self, flow: &ParsedFlow, _env: &Env) -> Result<()> {
        let mut status = FlowStatus::new(self.session_id.clone(), flow);
        status.commands_file = self.commands_file.clone();
        status.retry_of = self.retry_of.clone();
        self.write(&status).await?;
        *self.status.lock().await = Some(status);
        Ok(())
    }

    async fn on_cmd_start(&self, index: usize, _cmd: &ParsedCmd) -> Result<()> {
        self.update(|status| status.mark_started(index)).await
    }

    async fn on_cmd_finish(
        &self,
        index: usize,
        state: CmdState,
        error: Option<&FlowError>,
    ) -> Result<()> {
        let error = error.map(|e| e.to_string());
        self.update(move |status| status.mark_finished(index, state, error))
            .await
    }

    async fn on_flow_finish(&self, env: &Env, outcome: &FlowOutcome) -> Result<()> {
        let snapshot = env.session_snapshot();
        self.update(move |status| status.finish(outcome, snapshot))
            .await
    }

    async fn on_async_task_schedule(
        &self,
        _flow: &ParsedFlow,
        _index: usize,
        _env: &Env,
        thread_id: &str,
    ) -> Result<Arc<dyn StatusWriter>> {
        let thread_id = thread_id.to_string();
        let recorded = thread_id.clone();
        self.update(move |status| status.bg_tasks.push(recorded))
            .await?;
        Ok(Arc::new(FileStatusWriter::new(
            self.dir.join(&thread_id),
            format!("{}/{}", self.session_id, thread_id),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{parse_flow_str, CmdRegistry};
    use crate::session::status::FlowResult;
    use tempfile::TempDir;

    async fn read_status(dir: &Path) -> FlowStatus {
        let content = fs::read_to_string(dir.join(STATUS_FILE)).await.unwrap();
        serde_json::from_str(&content).unwrap()
    }

    #[tokio::test]
    async fn test_file_writer_tracks_progress() {
        let temp = TempDir::new().unwrap();
        let registry = CmdRegistry::with_builtins();
        let flow = parse_flow_str(&registry, "echo msg=a : dummy.fail").unwrap();
        let writer = FileStatusWriter::new(temp.path().join("s-1"), "s-1");
        let mut env = Env::new();
        env.set("user.key", "v");

        writer.on_flow_start(&flow, &env).await.unwrap();
        assert_eq!(
            read_status(writer.dir()).await.result,
            FlowResult::Running
        );

        writer.on_cmd_start(0, &flow.cmds[0]).await.unwrap();
        writer
            .on_cmd_finish(0, CmdState::Succeeded, None)
            .await
            .unwrap();
        writer.on_cmd_start(1, &flow.cmds[1]).await.unwrap();
        let err = FlowError::execution("boom");
        writer
            .on_cmd_finish(1, CmdState::Failed, Some(&err))
            .await
            .unwrap();
        writer
            .on_flow_finish(&env, &FlowOutcome::Failed(err.to_string()))
            .await
            .unwrap();

        let status = read_status(writer.dir()).await;
        assert_eq!(status.result, FlowResult::Failed);
        assert_eq!(status.commands[0].state, CmdState::Succeeded);
        assert_eq!(status.commands[1].state, CmdState::Failed);
        assert!(status.commands[1].error.as_deref().unwrap().contains("boom"));
        assert_eq!(status.env.get("user.key").map(String::as_str), Some("v"));
    }

    #[tokio::test]
    async fn test_background_writer_uses_sub_directory() {
        let temp = TempDir::new().unwrap();
        let registry = CmdRegistry::with_builtins();
        let flow = parse_flow_str(&registry, "echo %delay=1s").unwrap();
        let writer = FileStatusWriter::new(temp.path().join("s-1"), "s-1");
        let env = Env::new();
        writer.on_flow_start(&flow, &env).await.unwrap();

        let child = writer
            .on_async_task_schedule(&flow, 0, &env, "bg-1")
            .await
            .unwrap();
        child
            .on_flow_start(&ParsedFlow::single(flow.cmds[0].without_delay()), &env)
            .await
            .unwrap();

        let parent = read_status(writer.dir()).await;
        assert_eq!(parent.bg_tasks, vec!["bg-1".to_string()]);
        let child_status = read_status(&writer.dir().join("bg-1")).await;
        assert_eq!(child_status.session_id, "s-1/bg-1");
    }
}
