// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory [`SessionAdapter`] for tests.
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{SessionAdapter, SessionError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One call made through the adapter, in order of arrival
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCall {
    Spawn {
        name: String,
        cwd: PathBuf,
        cmd: String,
        log: Option<PathBuf>,
    },
    Kill {
        id: String,
    },
    IsAlive {
        id: String,
    },
}

/// A session the fake believes exists
#[derive(Debug, Clone)]
pub struct FakeSession {
    pub name: String,
    pub cwd: PathBuf,
    pub cmd: String,
    pub log: Option<PathBuf>,
    pub alive: bool,
}

impl FakeSession {
    fn orphan(name: &str, alive: bool) -> Self {
        Self {
            name: name.to_string(),
            cwd: PathBuf::new(),
            cmd: String::new(),
            log: None,
            alive,
        }
    }
}

/// Scripted failures
#[derive(Default)]
struct Faults {
    unavailable: bool,
    spawn: Option<String>,
    query: Option<String>,
}

#[derive(Default)]
struct World {
    sessions: HashMap<String, FakeSession>,
    calls: Vec<SessionCall>,
    faults: Faults,
}

/// Records every call and keeps sessions in a map. Clones share state.
#[derive(Clone, Default)]
pub struct FakeSessionAdapter {
    world: Arc<Mutex<World>>,
}

impl FakeSessionAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<SessionCall> {
        self.world.lock().calls.clone()
    }

    pub fn get_session(&self, id: &str) -> Option<FakeSession> {
        self.world.lock().sessions.get(id).cloned()
    }

    /// Simulate the worker inside `id` finishing.
    pub fn set_exited(&self, id: &str) {
        self.world
            .lock()
            .sessions
            .entry(id.to_string())
            .and_modify(|s| s.alive = false);
    }

    /// Seed a session left behind by an earlier supervisor.
    pub fn add_session(&self, id: &str, alive: bool) {
        self.world
            .lock()
            .sessions
            .insert(id.to_string(), FakeSession::orphan(id, alive));
    }

    pub fn set_available(&self, available: bool) {
        self.world.lock().faults.unavailable = !available;
    }

    pub fn fail_spawn(&self, message: &str) {
        self.world.lock().faults.spawn = Some(message.to_string());
    }

    pub fn fail_queries(&self, message: &str) {
        self.world.lock().faults.query = Some(message.to_string());
    }
}

#[async_trait]
impl SessionAdapter for FakeSessionAdapter {
    async fn is_available(&self) -> bool {
        !self.world.lock().faults.unavailable
    }

    async fn spawn(
        &self,
        name: &str,
        cwd: &Path,
        cmd: &str,
        log: Option<&Path>,
    ) -> Result<String, SessionError> {
        let session = FakeSession {
            name: name.to_string(),
            cwd: cwd.to_path_buf(),
            cmd: cmd.to_string(),
            log: log.map(Path::to_path_buf),
            alive: true,
        };

        let mut world = self.world.lock();
        world.calls.push(SessionCall::Spawn {
            name: session.name.clone(),
            cwd: session.cwd.clone(),
            cmd: session.cmd.clone(),
            log: session.log.clone(),
        });
        if let Some(message) = world.faults.spawn.clone() {
            return Err(SessionError::SpawnFailed(message));
        }
        world.sessions.insert(name.to_string(), session);
        Ok(name.to_string())
    }

    async fn kill(&self, id: &str) -> Result<(), SessionError> {
        let mut world = self.world.lock();
        world.calls.push(SessionCall::Kill { id: id.to_string() });
        if let Some(session) = world.sessions.get_mut(id) {
            session.alive = false;
        }
        Ok(())
    }

    async fn is_alive(&self, id: &str) -> Result<bool, SessionError> {
        let mut world = self.world.lock();
        world.calls.push(SessionCall::IsAlive { id: id.to_string() });
        if let Some(message) = world.faults.query.clone() {
            return Err(SessionError::CommandFailed(message));
        }
        Ok(world.sessions.get(id).is_some_and(|s| s.alive))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
