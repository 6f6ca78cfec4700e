//! Background tasks for delayed commands
//!
//! `cmd %delay=5s` runs `cmd` on its own tokio task after the delay. The
//! task gets a copy of the env flagged with `sys.in-bg-task` and no
//! breakpoint status, and a child status writer. Breakpoints fire inside the
//! task against that copy. Its failure is reported when someone waits for
//! it, never to the flow that scheduled it.

use super::Executor;
use crate::command::{ParsedCmd, ParsedFlow};
use crate::env::Env;
use crate::error::{ErrorCode, FlowError, Result};
use crate::session::{NoopStatusWriter, StatusWriter};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

tokio::task_local! {
    static BG_THREAD: String;
}

/// Id of the background task the caller runs on, `None` on the main task
pub fn current_bg_thread() -> Option<String> {
    BG_THREAD.try_with(|id| id.clone()).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BgTaskState {
    Scheduled,
    Running,
    Succeeded,
    Failed,
}

impl fmt::Display for BgTaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BgTaskState::Scheduled => "scheduled",
            BgTaskState::Running => "running",
            BgTaskState::Succeeded => "succeeded",
            BgTaskState::Failed => "failed",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BgTaskInfo {
    pub id: String,
    pub cmd_display: String,
    pub delay: Duration,
    pub scheduled_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl BgTaskInfo {
    fn new(id: String, cmd_display: String, delay: Duration) -> Self {
        Self {
            id,
            cmd_display,
            delay,
            scheduled_at: Utc::now(),
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    pub fn state(&self) -> BgTaskState {
        match (self.started_at, self.finished_at, &self.error) {
            (None, _, _) => BgTaskState::Scheduled,
            (Some(_), None, _) => BgTaskState::Running,
            (Some(_), Some(_), None) => BgTaskState::Succeeded,
            (Some(_), Some(_), Some(_)) => BgTaskState::Failed,
        }
    }
}

struct BgTask {
    info: Arc<Mutex<BgTaskInfo>>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct BgTable {
    next_seq: u64,
    tasks: HashMap<String, BgTask>,
    /// Ids in scheduling order
    order: Vec<String>,
}

/// Tasks scheduled and not waited for yet
#[derive(Default)]
pub struct BgTasks {
    table: Mutex<BgTable>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl BgTasks {
    fn allocate_id(&self) -> String {
        let mut table = lock(&self.table);
        table.next_seq += 1;
        format!("bg-{}", table.next_seq)
    }

    fn insert(&self, id: String, task: BgTask) {
        let mut table = lock(&self.table);
        table.order.push(id.clone());
        table.tasks.insert(id, task);
    }

    fn take(&self, id: &str) -> Option<BgTask> {
        let mut table = lock(&self.table);
        let task = table.tasks.remove(id)?;
        table.order.retain(|other| other != id);
        Some(task)
    }

    fn take_latest(&self) -> Option<BgTask> {
        let id = lock(&self.table).order.last().cloned()?;
        self.take(&id)
    }

    fn take_oldest(&self) -> Option<BgTask> {
        let id = lock(&self.table).order.first().cloned()?;
        self.take(&id)
    }

    pub fn list(&self) -> Vec<BgTaskInfo> {
        let table = lock(&self.table);
        table
            .order
            .iter()
            .filter_map(|id| table.tasks.get(id))
            .map(|task| lock(&task.info).clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.table).tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl Executor {
    /// Spawn `parsed` on a background task and return its id once the
    /// task is running
    pub(crate) async fn schedule_background(
        &self,
        flow: &ParsedFlow,
        index: usize,
        parsed: &ParsedCmd,
        env: &Env,
    ) -> Result<String> {
        if let Some(thread) = current_bg_thread() {
            return Err(FlowError::invariant(
                ErrorCode::INVARIANT_NESTED_DELAY,
                format!(
                    "{} cannot be delayed from background task {}",
                    parsed.display_path, thread
                ),
            ));
        }

        let delay = parsed.delay.unwrap_or_default();
        let id = self.bg_tasks.allocate_id();
        let mut bg_env = env.clone_for_background(&id);
        let cmd = parsed.without_delay();
        let cmd_display = cmd.display();
        let bg_flow = ParsedFlow::single(cmd);

        let status = match self
            .status
            .on_async_task_schedule(flow, index, &bg_env, &id)
            .await
        {
            Ok(status) => status,
            Err(e) => {
                warn!("Failed to create status writer for {}: {}", id, e);
                Arc::new(NoopStatusWriter) as Arc<dyn StatusWriter>
            }
        };
        let executor = self.with_status(status);

        let info = Arc::new(Mutex::new(BgTaskInfo::new(id.clone(), cmd_display, delay)));
        let task_info = info.clone();
        let (ready_tx, ready_rx) = oneshot::channel();

        let handle = tokio::spawn(BG_THREAD.scope(id.clone(), async move {
            let _ = ready_tx.send(());
            tokio::time::sleep(delay).await;
            lock(&task_info).started_at = Some(Utc::now());

            let result = AssertUnwindSafe(executor.run_detached(bg_flow, &mut bg_env))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(FlowError::execution_with_code(
                        ErrorCode::EXEC_TASK_PANICKED,
                        panic_message(panic),
                        None,
                    ))
                });

            let mut info = lock(&task_info);
            info.finished_at = Some(Utc::now());
            if let Err(e) = result {
                debug!("Background task {} failed: {}", info.id, e);
                info.error = Some(e.to_string());
            }
        }));

        self.bg_tasks.insert(
            id.clone(),
            BgTask {
                info,
                handle,
            },
        );
        let _ = ready_rx.await;
        Ok(id)
    }

    fn ensure_main_task(&self, what: &str) -> Result<()> {
        match current_bg_thread() {
            Some(thread) => Err(FlowError::invariant(
                ErrorCode::INVARIANT_WAIT_OFF_MAIN,
                format!("{} called from background task {}", what, thread),
            )),
            None => Ok(()),
        }
    }

    /// Wait for one task and report how it ended
    async fn join_bg_task(&self, task: BgTask) {
        if let Err(e) = task.handle.await {
            let mut info = lock(&task.info);
            info.finished_at.get_or_insert_with(Utc::now);
            info.error
                .get_or_insert_with(|| FlowError::from(e).to_string());
        }
        let info = lock(&task.info).clone();
        match info.error {
            Some(error) => self
                .screen
                .print(&format!("[{}] {} failed: {}\n", info.id, info.cmd_display, error)),
            None => self
                .screen
                .print(&format!("[{}] {} done\n", info.id, info.cmd_display)),
        }
    }

    /// Wait for every task, oldest first
    pub async fn wait_all_bg_tasks(&self) -> Result<()> {
        self.ensure_main_task("bg.wait")?;
        while let Some(task) = self.bg_tasks.take_oldest() {
            self.join_bg_task(task).await;
        }
        Ok(())
    }

    /// Wait for the most recently scheduled task
    pub async fn wait_latest_bg_task(&self) -> Result<()> {
        self.ensure_main_task("bg.wait.latest")?;
        match self.bg_tasks.take_latest() {
            Some(task) => self.join_bg_task(task).await,
            None => self.screen.print("no background tasks\n"),
        }
        Ok(())
    }

    pub async fn wait_bg_task(&self, id: &str) -> Result<()> {
        self.ensure_main_task("bg.wait.task")?;
        let task = self.bg_tasks.take(id).ok_or_else(|| {
            FlowError::flow_with_code(
                ErrorCode::FLOW_BG_TASK_NOT_FOUND,
                format!("no background task '{}'", id),
            )
        })?;
        self.join_bg_task(task).await;
        Ok(())
    }

    pub fn list_bg_tasks(&self) -> Vec<BgTaskInfo> {
        self.bg_tasks.list()
    }
}
