// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor: owns the task set, the worker registry, and the scheduler.
//!
//! Everything that mutates tasks runs on the single owner of the
//! supervisor (`&mut self`): API calls, scheduler ticks, and worker events
//! delivered through the event channel. That serialization is what keeps a
//! task from being dispatched or reconciled twice.

mod tick;

use crate::error::SupervisorError;
use crate::reconcile::{reconcile, unsupervised_output};
use crate::registry::HandleRegistry;
use crate::scheduler::Scheduler;
use fm_adapters::{Backend, ChangeSink, Recovery, SessionAdapter, WorkerHandle, WorkerLauncher};
use fm_core::{
    sanitize, truncate_tail, Clock, Config, ConfigUpdate, IdGen, Task, TaskId, TaskStatus,
    TransitionError, MAX_OUTPUT_CHARS,
};
use fm_storage::TaskStore;

/// Adapter dependencies of a supervisor
pub struct SupervisorDeps<S: SessionAdapter, T, N, I> {
    pub launcher: WorkerLauncher<S>,
    pub store: T,
    pub sink: N,
    pub ids: I,
}

/// Snapshot of the scheduler for the API layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStatus {
    pub running: bool,
    pub poll_interval_secs: u64,
    pub backend: Backend,
}

pub struct Supervisor<S, T, N, C, I>
where
    S: SessionAdapter,
    T: TaskStore,
    N: ChangeSink,
    C: Clock,
    I: IdGen,
{
    launcher: WorkerLauncher<S>,
    store: T,
    sink: N,
    ids: I,
    clock: C,
    registry: HandleRegistry<S>,
    scheduler: Scheduler,
    config: Config,
}

impl<S, T, N, C, I> Supervisor<S, T, N, C, I>
where
    S: SessionAdapter,
    T: TaskStore,
    N: ChangeSink,
    C: Clock,
    I: IdGen,
{
    /// Create a supervisor with the persisted config.
    ///
    /// An invalid persisted config is replaced by the default.
    pub fn new(deps: SupervisorDeps<S, T, N, I>, clock: C) -> Result<Self, SupervisorError> {
        let SupervisorDeps {
            launcher,
            mut store,
            sink,
            ids,
        } = deps;

        let mut config = store.load_config()?;
        if let Err(e) = config.validate() {
            tracing::warn!(error = %e, "persisted config is invalid, using defaults");
            config = Config::default();
        }

        Ok(Self {
            launcher,
            store,
            sink,
            ids,
            clock,
            registry: HandleRegistry::new(),
            scheduler: Scheduler::new(config.poll_interval()),
            config,
        })
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backend(&self) -> Backend {
        self.launcher.backend()
    }

    /// Number of workers currently registered
    pub fn live_workers(&self) -> usize {
        self.registry.len()
    }

    pub async fn create_task(&mut self, title: &str, description: &str) -> Result<Task, SupervisorError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(SupervisorError::EmptyTitle);
        }

        let mut tasks = self.store.load_all()?;
        let task = Task::new(
            self.ids.next(),
            title,
            description.trim(),
            self.clock.epoch_ms(),
        );
        tasks.push(task.clone());
        self.commit(&tasks).await?;

        tracing::info!(task_id = %task.id, title = %task.title, "task created");
        Ok(task)
    }

    pub fn get_task(&mut self, id: &TaskId) -> Result<Task, SupervisorError> {
        self.store
            .load_all()?
            .into_iter()
            .find(|t| &t.id == id)
            .ok_or_else(|| SupervisorError::TaskNotFound(id.clone()))
    }

    pub fn list_tasks(&mut self) -> Result<Vec<Task>, SupervisorError> {
        Ok(self.store.load_all()?)
    }

    /// Apply a user decision: approve, reject with feedback, or answer.
    pub async fn request_transition(
        &mut self,
        id: &TaskId,
        to: TaskStatus,
        feedback: Option<&str>,
    ) -> Result<Task, SupervisorError> {
        let mut tasks = self.store.load_all()?;
        let task = find_mut(&mut tasks, id)?;
        let from = task.status;
        task.apply_user_transition(to, feedback, self.clock.epoch_ms())?;
        let updated = task.clone();
        self.commit(&tasks).await?;

        tracing::info!(task_id = %id, %from, %to, "task transitioned");
        Ok(updated)
    }

    /// Remove a task, terminating its worker first.
    pub async fn delete_task(&mut self, id: &TaskId) -> Result<(), SupervisorError> {
        let mut tasks = self.store.load_all()?;
        let Some(pos) = tasks.iter().position(|t| &t.id == id) else {
            return Err(SupervisorError::TaskNotFound(id.clone()));
        };

        match self.registry.remove(id) {
            Some(handle) => {
                tracing::info!(task_id = %id, run = handle.run(), "terminating worker of deleted task");
                handle.terminate().await;
            }
            // Left by an earlier supervisor and not picked up by a tick yet
            None if tasks[pos].status == TaskStatus::Running => {
                if let Recovery::Reattached(handle) = self.launcher.recover(id).await {
                    tracing::info!(task_id = %id, "terminating orphaned worker of deleted task");
                    handle.terminate().await;
                }
            }
            None => {}
        }
        tasks.remove(pos);
        self.commit(&tasks).await?;

        tracing::info!(task_id = %id, "task deleted");
        Ok(())
    }

    /// Terminate a running task's worker and reconcile what it produced.
    pub async fn stop_task(&mut self, id: &TaskId) -> Result<Task, SupervisorError> {
        let mut tasks = self.store.load_all()?;
        let now = self.clock.epoch_ms();
        let task = find_mut(&mut tasks, id)?;
        if task.status != TaskStatus::Running {
            return Err(TransitionError::InvalidTransition {
                from: task.status,
                to: TaskStatus::Review,
            }
            .into());
        }

        let output = match self.registry.remove(id) {
            Some(handle) => Some(capture_and_terminate(handle).await),
            None => match self.launcher.recover(id).await {
                Recovery::Reattached(handle) => Some(capture_and_terminate(handle).await),
                Recovery::Ended { log } => Some(unsupervised_output(log)),
                Recovery::Unsupported => None,
            },
        };
        reconcile(task, output.as_deref(), now);
        let updated = task.clone();
        self.commit(&tasks).await?;

        tracing::info!(task_id = %id, status = %updated.status, "task stopped");
        Ok(updated)
    }

    /// Start ticking; runs one tick immediately unless already running.
    pub async fn start_scheduler(&mut self) -> bool {
        if !self.scheduler.start(self.clock.now()) {
            return false;
        }
        tracing::info!(interval_secs = self.config.poll_interval_secs, "scheduler started");
        self.run_tick().await;
        true
    }

    pub fn stop_scheduler(&mut self) {
        if self.scheduler.is_running() {
            tracing::info!("scheduler stopped");
        }
        self.scheduler.stop();
    }

    pub fn scheduler_status(&self) -> SchedulerStatus {
        SchedulerStatus {
            running: self.scheduler.is_running(),
            poll_interval_secs: self.config.poll_interval_secs,
            backend: self.launcher.backend(),
        }
    }

    /// Merge, validate, and persist a config change.
    ///
    /// A new interval restarts a running scheduler.
    pub async fn update_config(&mut self, update: ConfigUpdate) -> Result<Config, SupervisorError> {
        let next = self.config.merged(update)?;
        self.store.save_config(&next)?;

        let interval_changed = next.poll_interval_secs != self.config.poll_interval_secs;
        self.config = next;
        tracing::info!(
            poll_interval_secs = self.config.poll_interval_secs,
            work_dir = %self.config.work_dir.display(),
            "config updated"
        );

        if interval_changed {
            self.scheduler.set_interval(self.config.poll_interval());
            if self.scheduler.is_running() {
                self.scheduler.stop();
                self.start_scheduler().await;
            }
        }
        Ok(self.config.clone())
    }

    /// Live view of a task's output.
    ///
    /// A running session-backed task shows its current log, cleaned up the
    /// same way the reconciler will; anything else shows the stored output.
    pub async fn peek_output(&mut self, id: &TaskId) -> Result<String, SupervisorError> {
        let task = self.get_task(id)?;
        if task.status == TaskStatus::Running {
            if let Some(WorkerHandle::Session(handle)) = self.registry.get(id) {
                let raw = handle.capture_output().await;
                return Ok(truncate_tail(sanitize(&raw).trim(), MAX_OUTPUT_CHARS));
            }
        }
        Ok(task.output.unwrap_or_default())
    }

    /// Release all workers for shutdown.
    ///
    /// Direct children are killed; sessions keep running so the next
    /// supervisor can reattach.
    pub fn shutdown(&mut self) {
        for (task_id, handle) in self.registry.drain() {
            match handle {
                WorkerHandle::Process(handle) => {
                    tracing::info!(%task_id, run = handle.run(), "killing worker on shutdown");
                    handle.terminate();
                }
                WorkerHandle::Session(handle) => {
                    tracing::info!(%task_id, session_id = handle.session(), "leaving session running");
                }
            }
        }
        self.scheduler.stop();
    }

    /// Save and publish the task list.
    async fn commit(&mut self, tasks: &[Task]) -> Result<(), SupervisorError> {
        self.store.save_all(tasks)?;
        if let Err(e) = self.sink.tasks_changed(tasks).await {
            tracing::warn!(error = %e, "change notification failed");
        }
        Ok(())
    }
}

async fn capture_and_terminate<S: SessionAdapter>(handle: WorkerHandle<S>) -> String {
    let output = handle.capture_output().await;
    handle.terminate().await;
    output
}

fn find_mut<'a>(tasks: &'a mut [Task], id: &TaskId) -> Result<&'a mut Task, SupervisorError> {
    tasks
        .iter_mut()
        .find(|t| &t.id == id)
        .ok_or_else(|| SupervisorError::TaskNotFound(id.clone()))
}

#[cfg(test)]
#[path = "../supervisor_tests/mod.rs"]
mod tests;
