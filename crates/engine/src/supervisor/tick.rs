// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler ticks and worker completion events

use super::Supervisor;
use crate::error::SupervisorError;
use crate::prompt::build_prompt;
use crate::reconcile::{reconcile, unsupervised_output};
use fm_adapters::{ChangeSink, Recovery, SessionAdapter};
use fm_core::{Clock, Event, IdGen, Task, TaskStatus};
use fm_storage::TaskStore;
use std::path::Path;

impl<S, T, N, C, I> Supervisor<S, T, N, C, I>
where
    S: SessionAdapter,
    T: TaskStore,
    N: ChangeSink,
    C: Clock,
    I: IdGen,
{
    /// Run a tick if the scheduler deadline has passed.
    ///
    /// Called by the daemon loop on every timer check.
    pub async fn check_timers(&mut self) {
        if self.scheduler.poll(self.clock.now()) {
            self.run_tick().await;
        }
    }

    /// Tick, logging instead of propagating failure.
    pub(crate) async fn run_tick(&mut self) {
        let start = std::time::Instant::now();
        match self.tick().await {
            Ok(changed) => {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                tracing::debug!(changed, elapsed_ms, "tick complete");
            }
            Err(e) => tracing::error!(error = %e, "tick failed"),
        }
    }

    /// One pass over the task set: dispatch pending tasks, then check
    /// running ones. Persists and notifies once if anything changed.
    ///
    /// Returns the number of tasks changed.
    pub async fn tick(&mut self) -> Result<usize, SupervisorError> {
        let mut tasks = self.store.load_all()?;
        let statuses: Vec<TaskStatus> = tasks.iter().map(|t| t.status).collect();
        let work_dir = self.config.resolved_work_dir();
        let mut changed = 0;

        for (task, status) in tasks.iter_mut().zip(&statuses) {
            if *status == TaskStatus::Pending {
                self.dispatch(task, &work_dir).await;
                changed += 1;
            }
        }

        for (task, status) in tasks.iter_mut().zip(&statuses) {
            if *status == TaskStatus::Running && self.check_running(task).await {
                changed += 1;
            }
        }

        if changed > 0 {
            self.commit(&tasks).await?;
        }
        Ok(changed)
    }

    /// `pending → running`; a worker that fails to start finishes the task
    /// at once with the error as its output.
    async fn dispatch(&mut self, task: &mut Task, work_dir: &Path) {
        let prompt = build_prompt(task);
        let now = self.clock.epoch_ms();

        match self
            .launcher
            .start(&task.id, &prompt, work_dir, &self.config.worker)
            .await
        {
            Ok(handle) => {
                let run = handle.run();
                if let Err(e) = task.mark_running(Some(handle.worker_ref()), now) {
                    tracing::warn!(task_id = %task.id, error = %e, "dispatch rejected");
                    handle.terminate().await;
                    return;
                }
                tracing::info!(task_id = %task.id, run, work_dir = %work_dir.display(), "task dispatched");
                if let Some(previous) = self.registry.register(task.id.clone(), handle) {
                    previous.terminate().await;
                }
            }
            Err(e) => {
                tracing::warn!(task_id = %task.id, error = %e, "worker failed to start");
                if task.mark_running(None, now).is_ok() {
                    reconcile(task, Some(&e.to_string()), now);
                }
            }
        }
    }

    /// Check one running task. Returns true if the task record changed.
    async fn check_running(&mut self, task: &mut Task) -> bool {
        let now = self.clock.epoch_ms();

        match self.registry.get(&task.id).map(|h| h.is_alive()) {
            Some(true) => false,
            Some(false) => {
                let Some(handle) = self.registry.remove(&task.id) else {
                    return false;
                };
                tracing::info!(task_id = %task.id, run = handle.run(), "worker found finished");
                let output = handle.capture_output().await;
                handle.terminate().await;
                reconcile(task, Some(&output), now)
            }
            None => match self.launcher.recover(&task.id).await {
                Recovery::Reattached(handle) => {
                    task.worker = Some(handle.worker_ref());
                    self.registry.register(task.id.clone(), handle);
                    false
                }
                Recovery::Ended { log } => reconcile(task, Some(&unsupervised_output(log)), now),
                Recovery::Unsupported => {
                    tracing::info!(task_id = %task.id, "worker lost with previous supervisor, requeueing");
                    task.requeue(now);
                    true
                }
            },
        }
    }

    /// Apply a worker completion event.
    ///
    /// Events whose run no longer matches the registered handle are stale
    /// (the task was stopped, deleted, or re-dispatched) and are ignored.
    pub async fn handle_event(&mut self, event: Event) -> Result<(), SupervisorError> {
        tracing::info!(event = %event.log_summary(), "worker event");
        let task_id = event.task_id().clone();

        let Some(handle) = self.registry.remove_run(&task_id, event.run()) else {
            tracing::debug!(%task_id, run = event.run(), "stale worker event ignored");
            return Ok(());
        };

        let output = match event {
            Event::WorkerExited { output, .. } => output,
            Event::SessionEnded { .. } => handle.capture_output().await,
        };
        handle.terminate().await;

        let mut tasks = self.store.load_all()?;
        let Some(task) = tasks.iter_mut().find(|t| t.id == task_id) else {
            tracing::warn!(%task_id, "worker finished for unknown task");
            return Ok(());
        };
        if reconcile(task, Some(&output), self.clock.epoch_ms()) {
            self.commit(&tasks).await?;
        }
        Ok(())
    }
}
