// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::error::{Error, Result};
use crate::manifest::ManifestEntry;
use crate::process::{self, Service};
use crate::protocol::PsEntry;
use crate::state::ServiceState;
use log::{info, warn};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::task::TaskTracker;

/// The set of supervised services.
///
/// Every read or mutation of a service's state or handle goes through one
/// table-wide lock, including the final commit made by a supervisory task
/// after it reaps its child. The lock is never held across an `.await`.
///
/// Cloning is cheap; clones share the same services.
#[derive(Clone)]
pub struct ProcessTable {
    inner: Arc<Inner>,
}

struct Inner {
    logs_dir: PathBuf,
    services: Mutex<Services>,
    tracker: TaskTracker,
}

struct Services {
    list: Vec<Service>,
    closed: bool,
}

impl Services {
    fn position(&self, name: &str) -> Result<usize> {
        self.list
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| Error::ServiceNotFound(name.to_string()))
    }
}

impl ProcessTable {
    pub fn new(logs_dir: impl Into<PathBuf>, entries: Vec<ManifestEntry>) -> Self {
        let list = entries
            .into_iter()
            .map(|e| Service::new(e.name, e.command))
            .collect();
        Self {
            inner: Arc::new(Inner {
                logs_dir: logs_dir.into(),
                services: Mutex::new(Services {
                    list,
                    closed: false,
                }),
                tracker: TaskTracker::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Services> {
        // A panic while holding the lock cannot leave a service half-updated:
        // every commit is a plain field assignment.
        self.inner
            .services
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Start every service in manifest order.
    ///
    /// On the first failure, every service launched by this call is sent a
    /// graceful stop (in start order) and the error is returned. Services
    /// after the failing one are left untouched.
    pub fn start_all(&self) -> Result<()> {
        let mut services = self.lock();
        let mut launched = Vec::new();
        for idx in 0..services.list.len() {
            match self.start_at(&mut services, idx) {
                Ok(true) => launched.push(idx),
                Ok(false) => {}
                Err(e) => {
                    let name = services.list[idx].name.clone();
                    warn!("[{name}] start failed, rolling back {} service(s)", launched.len());
                    for &started in &launched {
                        services.list[started].stop(false);
                    }
                    return Err(Error::StartAll {
                        name,
                        source: Box::new(e),
                    });
                }
            }
        }
        Ok(())
    }

    /// Start one service by name. Starting a running service is a no-op.
    pub fn start(&self, name: &str) -> Result<()> {
        let mut services = self.lock();
        let idx = services.position(name)?;
        self.start_at(&mut services, idx).map(|_| ())
    }

    /// Returns whether a new OS process was launched.
    fn start_at(&self, services: &mut Services, idx: usize) -> Result<bool> {
        if services.closed {
            return Err(Error::ShuttingDown);
        }
        let svc = &mut services.list[idx];
        if svc.is_running() {
            info!("[{}] already running", svc.name);
            return Ok(false);
        }
        info!("[{}] starting with command '{}'", svc.name, svc.command());
        let mut launched = svc.launch(&self.inner.logs_dir)?;

        let table = self.clone();
        let name = svc.name.clone();
        self.inner.tracker.spawn(async move {
            let status =
                process::supervise(&name, &mut launched.child, &mut launched.signals).await;
            drop(launched.log);
            match &status {
                Ok(s) => info!("[{name}] exited with {s}"),
                Err(e) => warn!("[{name}] wait error: {e}"),
            }
            let mut services = table.lock();
            let state = services.list[idx].mark_exited(status);
            info!("[{name}] {state}");
        });
        Ok(true)
    }

    /// Request termination of every running service.
    ///
    /// Returns immediately; see [`Service::stop`].
    pub fn stop_all(&self, force: bool) {
        let mut services = self.lock();
        for svc in &mut services.list {
            svc.stop(force);
        }
    }

    /// Request termination of one service. Does not wait for it to exit, so a
    /// `ps` issued right after may still report it as running.
    pub fn stop(&self, name: &str, force: bool) -> Result<()> {
        let mut services = self.lock();
        let idx = services.position(name)?;
        services.list[idx].stop(force);
        Ok(())
    }

    /// Snapshot of every service, taken under the lock.
    pub fn ps(&self) -> Vec<PsEntry> {
        let services = self.lock();
        services
            .list
            .iter()
            .map(|svc| PsEntry {
                name: svc.name.clone(),
                status: svc.state().to_string(),
                pid: svc
                    .pid()
                    .and_then(|pid| i32::try_from(pid).ok())
                    .unwrap_or(-1),
            })
            .collect()
    }

    pub fn state_of(&self, name: &str) -> Option<ServiceState> {
        let services = self.lock();
        services.position(name).ok().map(|i| services.list[i].state())
    }

    /// Refuse further starts and gracefully stop everything that is running.
    pub fn shutdown(&self) {
        let mut services = self.lock();
        services.closed = true;
        for svc in &mut services.list {
            svc.stop(false);
        }
        drop(services);
        self.inner.tracker.close();
    }

    /// Wait until every supervisory task has reaped its child.
    ///
    /// Closes the task tracker first, so this only returns once no child
    /// launched through this table is left unreaped.
    pub async fn wait(&self) {
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
    }
}
